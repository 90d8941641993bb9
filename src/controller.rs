//! Resource List Controller
//!
//! One controller per admin page. It owns the page's list state (items,
//! filters, pagination, request lifecycle, notices) and every operation that
//! touches the backend for that resource.
//!
//! State is published on a `tokio::sync::watch` channel so a view can either
//! take a [`ListState`] snapshot or subscribe to changes.
//!
//! # Ordering
//!
//! Each `load` takes a ticket from a monotonic counter. A response is only
//! applied if its ticket is still the newest when it arrives, so a slow early
//! request can never overwrite the result of a later one. Superseded network
//! calls are not cancelled.

use crate::api::{ApiClient, ApiError, Payload};
use crate::notice::{NoticeBoard, Operation};
use crate::resource::export::{export_items, ExportBlob, ExportFormat};
use crate::resource::fetcher::{fetch_page, normalize_item};
use crate::resource::filter::{filter_items, FilterState, FilterValue};
use crate::resource::pagination::{PaginationState, DEFAULT_LIMIT};
use crate::resource::registry::{ExportMode, FilterMode, ResourceDef, SEARCH_FILTER};
use crate::resource::validate::{validate_create, validate_update};
use crate::resource::Resource;
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

/// Quiet period before a search keystroke triggers a load
pub const DEFAULT_SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// State of the controller's most recent request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestLifecycle {
    #[default]
    Idle,
    Loading,
    Success,
    Error,
}

/// Everything a view renders from
#[derive(Debug, Clone, PartialEq)]
pub struct ListState {
    /// Resources from the last applied load, server order
    pub items: Vec<Resource>,
    /// Current view: `items` in server mode, filtered and paged in client mode
    pub visible: Vec<Resource>,
    pub lifecycle: RequestLifecycle,
    /// Inline error notice
    pub error: Option<String>,
    pub filters: FilterState,
    pub pagination: PaginationState,
    pub notices: NoticeBoard,
}

impl ListState {
    fn new(limit: u32) -> Self {
        Self {
            items: Vec::new(),
            visible: Vec::new(),
            lifecycle: RequestLifecycle::Idle,
            error: None,
            filters: FilterState::new(),
            pagination: PaginationState::new(limit),
            notices: NoticeBoard::new(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.lifecycle == RequestLifecycle::Loading
    }

    pub fn find(&self, id_field: &str, id: &str) -> Option<&Resource> {
        self.items.iter().find(|r| r.has_id(id_field, id))
    }
}

/// Whether a finished load was applied to state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer load was issued while this one was in flight
    Superseded,
}

/// Result of [`ResourceListController::remove_many`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkRemoval {
    pub removed: Vec<String>,
    pub failed: Vec<(String, ApiError)>,
}

/// Recompute `visible` (and, in client mode, the total) from items + filters
fn refresh_view(state: &mut ListState, def: &ResourceDef) {
    match def.filter_mode {
        FilterMode::Server => state.visible = state.items.clone(),
        FilterMode::Client => {
            let filtered = filter_items(&state.items, &state.filters, def);
            state.pagination.set_total(filtered.len() as u64);
            let range = state.pagination.slice_range(filtered.len());
            state.visible = filtered[range].to_vec();
        }
    }
}

/// Drop confirmed-deleted ids from local state
///
/// Returns true when the held server page no longer matches the pagination
/// (page moved back, or the page emptied while rows remain) and must be
/// refetched.
fn remove_local(state: &mut ListState, def: &ResourceDef, ids: &[String]) -> bool {
    let before = state.items.len();
    state
        .items
        .retain(|r| !ids.iter().any(|id| r.has_id(&def.id_field, id)));
    let removed = (before - state.items.len()) as u64;

    let mut stale = false;
    if def.filter_mode == FilterMode::Server {
        let page = state.pagination.page();
        let total = state.pagination.total().saturating_sub(removed);
        state.pagination.set_total(total);
        stale = state.pagination.page() != page || (state.items.is_empty() && total > 0);
    }
    refresh_view(state, def);
    stale
}

/// List + filter + paginate + CRUD for one resource type
#[derive(Clone)]
pub struct ResourceListController {
    client: ApiClient,
    def: Arc<ResourceDef>,
    state: Arc<watch::Sender<ListState>>,
    load_seq: Arc<AtomicU64>,
    search_seq: Arc<AtomicU64>,
    debounce: Duration,
}

impl ResourceListController {
    pub fn new(client: ApiClient, def: ResourceDef) -> Self {
        let limit = def.default_limit.unwrap_or(DEFAULT_LIMIT);
        Self {
            client,
            def: Arc::new(def),
            state: Arc::new(watch::Sender::new(ListState::new(limit))),
            load_seq: Arc::new(AtomicU64::new(0)),
            search_seq: Arc::new(AtomicU64::new(0)),
            debounce: DEFAULT_SEARCH_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_page_size(self, limit: u32) -> Self {
        self.state.send_modify(|s| s.pagination.set_limit(limit));
        self
    }

    // =========================================================================
    // State access
    // =========================================================================

    pub fn definition(&self) -> &ResourceDef {
        &self.def
    }

    /// Clone of the current state
    pub fn snapshot(&self) -> ListState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<ListState> {
        self.state.subscribe()
    }

    pub fn items(&self) -> Vec<Resource> {
        self.state.borrow().items.clone()
    }

    pub fn visible(&self) -> Vec<Resource> {
        self.state.borrow().visible.clone()
    }

    pub fn lifecycle(&self) -> RequestLifecycle {
        self.state.borrow().lifecycle
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    pub fn pagination(&self) -> PaginationState {
        self.state.borrow().pagination
    }

    pub fn filters(&self) -> FilterState {
        self.state.borrow().filters.clone()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Fetch the current page with the current filters
    pub async fn load(&self) -> Result<LoadOutcome, ApiError> {
        let ticket = self.load_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let (filters, pagination) = {
            let state = self.state.borrow();
            (state.filters.clone(), state.pagination)
        };

        self.state.send_modify(|s| {
            s.lifecycle = RequestLifecycle::Loading;
            s.error = None;
        });

        let result = fetch_page(&self.client, &self.def, &filters, &pagination).await;

        let def = &self.def;
        let load_seq = &self.load_seq;
        let mut outcome: Option<Result<(), ApiError>> = None;

        // Ticket check happens under the channel lock so no newer load can
        // apply in between
        self.state.send_if_modified(|s| {
            if load_seq.load(Ordering::SeqCst) != ticket {
                return false;
            }

            outcome = Some(match result {
                Ok(page) => {
                    let count = page.items.len();
                    s.items = page.items;
                    if def.filter_mode == FilterMode::Server {
                        s.pagination.apply_meta(page.meta.as_ref(), count);
                    }
                    refresh_view(s, def);
                    s.lifecycle = RequestLifecycle::Success;
                    s.error = None;
                    Ok(())
                }
                Err(e) => {
                    // Stale items stay visible
                    s.lifecycle = RequestLifecycle::Error;
                    s.error = Some(e.user_message());
                    s.notices.error(Operation::Load, &def.display_name, e.user_message());
                    Err(e)
                }
            });
            true
        });

        match outcome {
            None => {
                tracing::debug!("Discarding superseded load #{} of {}", ticket, self.def.key);
                Ok(LoadOutcome::Superseded)
            }
            Some(Ok(())) => Ok(LoadOutcome::Applied),
            Some(Err(e)) => {
                tracing::warn!("Loading {} failed: {}", self.def.key, e);
                Err(e)
            }
        }
    }

    /// Replace filters and pagination, then load
    pub async fn load_with(
        &self,
        filters: FilterState,
        pagination: PaginationState,
    ) -> Result<LoadOutcome, ApiError> {
        self.state.send_modify(|s| {
            s.filters = filters;
            s.pagination = pagination;
        });
        self.load().await
    }

    /// Alias used by "Refresh" affordances
    pub async fn refresh(&self) -> Result<LoadOutcome, ApiError> {
        self.load().await
    }

    // =========================================================================
    // Filters & pagination
    // =========================================================================

    /// Set one filter; a changed filter sends the view back to page 1
    pub fn set_filter(&self, name: &str, value: FilterValue) {
        let def = &self.def;
        self.state.send_modify(|s| {
            if s.filters.set(name, value) {
                s.pagination.reset_page();
            }
            if def.filter_mode == FilterMode::Client {
                refresh_view(s, def);
            }
        });
    }

    pub fn clear_filters(&self) {
        let def = &self.def;
        self.state.send_modify(|s| {
            if !s.filters.is_empty() {
                s.filters.clear();
                s.pagination.reset_page();
            }
            if def.filter_mode == FilterMode::Client {
                refresh_view(s, def);
            }
        });
    }

    pub fn set_page(&self, page: u32) {
        let def = &self.def;
        self.state.send_modify(|s| {
            s.pagination.set_page(page);
            if def.filter_mode == FilterMode::Client {
                refresh_view(s, def);
            }
        });
    }

    pub fn set_limit(&self, limit: u32) {
        let def = &self.def;
        self.state.send_modify(|s| {
            s.pagination.set_limit(limit);
            if def.filter_mode == FilterMode::Client {
                refresh_view(s, def);
            }
        });
    }

    /// Update the search filter and load once typing settles
    ///
    /// Only the last of a burst of calls within the debounce window issues a
    /// request; earlier ones return [`LoadOutcome::Superseded`].
    pub async fn search(&self, text: &str) -> Result<LoadOutcome, ApiError> {
        let ticket = self.search_seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_filter(SEARCH_FILTER, FilterValue::from_input(text));

        if self.def.filter_mode == FilterMode::Client {
            return Ok(LoadOutcome::Applied);
        }

        tokio::time::sleep(self.debounce).await;
        if self.search_seq.load(Ordering::SeqCst) != ticket {
            return Ok(LoadOutcome::Superseded);
        }
        self.load().await
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    fn record_failure(&self, operation: Operation, error: &ApiError) {
        tracing::warn!("{} {} failed: {}", operation.display_name(), self.def.key, error);
        let message = error.user_message();
        self.state.send_modify(|s| {
            s.lifecycle = RequestLifecycle::Error;
            s.error = Some(message.clone());
            s.notices.error(operation, &self.def.display_name, message);
        });
    }

    /// Refetch after a confirmed mutation; a failure is already recorded by `load`
    async fn reload_after(&self, operation: Operation) {
        if let Err(e) = self.load().await {
            tracing::warn!(
                "Refetch after {} of {} failed: {}",
                operation.display_name().to_lowercase(),
                self.def.key,
                e
            );
        }
    }

    /// Record returned by a create/update, if the response carries one
    fn returned_record(&self, data: serde_json::Value) -> Option<Resource> {
        if !data.is_object() {
            tracing::debug!("{} response carried no record", self.def.key);
            return None;
        }
        normalize_item(data, &self.def, chrono::Local::now().date_naive())
    }

    /// Body encoding the resource's endpoints accept
    fn encode(&self, payload: Payload) -> Payload {
        if self.def.multipart {
            payload.into_multipart()
        } else {
            payload
        }
    }

    fn mark_mutated(state: &mut ListState) {
        state.error = None;
        if state.lifecycle == RequestLifecycle::Error {
            state.lifecycle = RequestLifecycle::Success;
        }
    }

    /// Create a resource, then refetch so server-computed fields are current
    pub async fn create(&self, payload: Payload) -> Result<Resource, ApiError> {
        if let Err(e) = validate_create(&self.def, &payload) {
            self.record_failure(Operation::Create, &e);
            return Err(e);
        }
        let payload = self.encode(payload);

        let response = match self.client.create(&self.def.path, &payload).await {
            Ok(response) => response,
            Err(e) => {
                self.record_failure(Operation::Create, &e);
                return Err(e);
            }
        };

        let created = self
            .returned_record(response.data)
            .or_else(|| payload.fields().map(Resource))
            .unwrap_or_default();

        tracing::info!("Created {} {:?}", self.def.key, created.id(&self.def.id_field));
        self.state.send_modify(|s| {
            Self::mark_mutated(s);
            s.notices
                .success(Operation::Create, &self.def.display_name, response.message);
        });

        self.reload_after(Operation::Create).await;

        Ok(created)
    }

    /// Update a resource and replace it in place by identifier
    ///
    /// When the backend's answer carries no usable record the list is
    /// refetched instead.
    pub async fn update(&self, id: &str, payload: Payload) -> Result<Resource, ApiError> {
        if let Err(e) = validate_update(&self.def, &payload) {
            self.record_failure(Operation::Update, &e);
            return Err(e);
        }
        let payload = self.encode(payload);

        let response = match self.client.update(&self.def.path, id, &payload).await {
            Ok(response) => response,
            Err(e) => {
                self.record_failure(Operation::Update, &e);
                return Err(e);
            }
        };

        let id_field = &self.def.id_field;
        let updated = self
            .returned_record(response.data)
            .filter(|r| r.id(id_field).is_some());

        match updated {
            Some(resource) => {
                let def = &self.def;
                self.state.send_modify(|s| {
                    match s.items.iter_mut().find(|r| r.has_id(id_field, id)) {
                        Some(slot) => *slot = resource.clone(),
                        None => tracing::debug!("Updated {} {} is not in the current page", def.key, id),
                    }
                    refresh_view(s, def);
                    Self::mark_mutated(s);
                    s.notices
                        .success(Operation::Update, &def.display_name, response.message);
                });
                Ok(resource)
            }
            None => {
                self.state.send_modify(|s| {
                    Self::mark_mutated(s);
                    s.notices
                        .success(Operation::Update, &self.def.display_name, response.message);
                });
                self.reload_after(Operation::Update).await;

                let refreshed = self.state.borrow().find(id_field, id).cloned();
                Ok(refreshed.unwrap_or_else(|| {
                    let mut merged = payload.fields().map(Resource).unwrap_or_default();
                    merged.insert(id_field.clone(), serde_json::Value::String(id.to_string()));
                    merged
                }))
            }
        }
    }

    /// Delete a resource; local state changes only after the backend confirms
    pub async fn remove(&self, id: &str) -> Result<(), ApiError> {
        match self.client.delete(&self.def.path, id).await {
            Ok(response) => {
                let def = &self.def;
                let ids = [id.to_string()];
                let mut stale = false;
                self.state.send_modify(|s| {
                    stale = remove_local(s, def, &ids);
                    Self::mark_mutated(s);
                    s.notices
                        .success(Operation::Delete, &def.display_name, response.message);
                });
                tracing::info!("Deleted {} {}", self.def.key, id);
                if stale {
                    self.reload_after(Operation::Delete).await;
                }
                Ok(())
            }
            Err(e) => {
                self.record_failure(Operation::Delete, &e);
                Err(e)
            }
        }
    }

    /// Delete several resources concurrently; only confirmed ones leave the list
    pub async fn remove_many(&self, ids: &[String]) -> BulkRemoval {
        let results = join_all(ids.iter().map(|id| async move {
            (id.clone(), self.client.delete(&self.def.path, id).await)
        }))
        .await;

        let mut outcome = BulkRemoval::default();
        for (id, result) in results {
            match result {
                Ok(_) => outcome.removed.push(id),
                Err(e) => outcome.failed.push((id, e)),
            }
        }

        let def = &self.def;
        let mut stale = false;
        self.state.send_modify(|s| {
            if !outcome.removed.is_empty() {
                stale = remove_local(s, def, &outcome.removed);
                Self::mark_mutated(s);
                s.notices.success(
                    Operation::Delete,
                    &def.display_name,
                    Some(format!("Deleted {} {}", outcome.removed.len(), def.display_name)),
                );
            }
            if let Some((_, first)) = outcome.failed.first() {
                let message = format!(
                    "{} of {} deletions failed: {}",
                    outcome.failed.len(),
                    ids.len(),
                    first.user_message()
                );
                s.lifecycle = RequestLifecycle::Error;
                s.error = Some(message.clone());
                s.notices.error(Operation::Delete, &def.display_name, message);
            }
        });

        if !outcome.failed.is_empty() {
            tracing::warn!(
                "Bulk delete of {}: {} removed, {} failed",
                self.def.key,
                outcome.removed.len(),
                outcome.failed.len()
            );
        }

        if stale {
            self.reload_after(Operation::Delete).await;
        }

        outcome
    }

    // =========================================================================
    // Export & notices
    // =========================================================================

    /// Export the current view, locally or through the backend export endpoint
    pub async fn export(&self, format: ExportFormat) -> Result<ExportBlob, ApiError> {
        match self.def.export.mode {
            ExportMode::Client => {
                let visible = self.state.borrow().visible.clone();
                Ok(export_items(&visible, &self.def, format))
            }
            ExportMode::Server => {
                let mut query = self.state.borrow().filters.to_query();
                query.push(("format".to_string(), format.as_str().to_string()));

                match self.client.export(&self.def.export_path(), &query).await {
                    Ok(download) => Ok(ExportBlob::from_download(&self.def, format, download)),
                    Err(e) => {
                        self.record_failure(Operation::Export, &e);
                        Err(e)
                    }
                }
            }
        }
    }

    /// Hide the inline error notice
    pub fn dismiss_error(&self) {
        self.state.send_modify(|s| {
            s.error = None;
            if s.lifecycle == RequestLifecycle::Error {
                s.lifecycle = RequestLifecycle::Idle;
            }
        });
    }

    pub fn dismiss_notice(&self, id: Uuid) -> bool {
        self.state.send_if_modified(|s| s.notices.dismiss(id))
    }
}
