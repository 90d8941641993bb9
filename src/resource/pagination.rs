//! Pagination state
//!
//! Invariant: `1 <= page <= max(1, pages)` with `pages = ceil(total / limit)`.
//! Every mutator re-clamps, so a stale page number can never point past the
//! end of a shrunken result set.

use crate::api::http::PageMeta;

/// Default page size when neither the resource nor the config sets one
pub const DEFAULT_LIMIT: u32 = 20;

/// Page/limit/total for a list view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationState {
    page: u32,
    limit: u32,
    total: u64,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self::new(DEFAULT_LIMIT)
    }
}

impl PaginationState {
    pub fn new(limit: u32) -> Self {
        Self {
            page: 1,
            limit: limit.max(1),
            total: 0,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// `ceil(total / limit)`, zero for an empty set
    pub fn pages(&self) -> u32 {
        let pages = self.total.div_ceil(u64::from(self.limit));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }

    pub fn last_page(&self) -> u32 {
        self.pages().max(1)
    }

    /// Index of the first item of the current page
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    fn clamp(&mut self) {
        self.page = self.page.clamp(1, self.last_page());
    }

    /// Move to `page`, clamped into range
    pub fn set_page(&mut self, page: u32) {
        self.page = page;
        self.clamp();
    }

    /// Move to `page` without knowing the total yet (before the first load)
    pub fn request_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn next_page(&mut self) {
        if self.has_next() {
            self.page += 1;
        }
    }

    pub fn prev_page(&mut self) {
        if self.has_prev() {
            self.page -= 1;
        }
    }

    pub fn reset_page(&mut self) {
        self.page = 1;
    }

    /// Change page size; returns to the first page
    pub fn set_limit(&mut self, limit: u32) {
        self.limit = limit.max(1);
        self.page = 1;
    }

    pub fn set_total(&mut self, total: u64) {
        self.total = total;
        self.clamp();
    }

    /// Adopt the server's pagination block, falling back to the item count
    pub fn apply_meta(&mut self, meta: Option<&PageMeta>, item_count: usize) {
        let total = meta.and_then(|m| m.total).unwrap_or(item_count as u64);
        if let Some(limit) = meta.and_then(|m| m.limit).filter(|l| *l > 0) {
            self.limit = limit;
        }
        if let Some(page) = meta.and_then(|m| m.page).filter(|p| *p > 0) {
            self.page = page;
        }
        self.set_total(total);
    }

    /// Range of indices for the current page within a locally held list
    pub fn slice_range(&self, len: usize) -> std::ops::Range<usize> {
        let start = usize::try_from(self.offset()).unwrap_or(usize::MAX).min(len);
        let end = start.saturating_add(self.limit as usize).min(len);
        start..end
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        vec![
            ("page".to_string(), self.page.to_string()),
            ("limit".to_string(), self.limit.to_string()),
        ]
    }
}
