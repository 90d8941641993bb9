//! Notice board
//!
//! Dismissible inline notices for mutation outcomes and request failures.
//! Kept as a bounded, most-recent-first history.

use std::collections::VecDeque;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Operation a notice reports on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Create,
    Update,
    Delete,
    Export,
}

impl Operation {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Load => "Load",
            Self::Create => "Create",
            Self::Update => "Update",
            Self::Delete => "Delete",
            Self::Export => "Export",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            Self::Load => "Loaded",
            Self::Create => "Created",
            Self::Update => "Updated",
            Self::Delete => "Deleted",
            Self::Export => "Exported",
        }
    }
}

/// Severity of a notice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

impl NoticeLevel {
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Info => "ℹ",
            Self::Success => "✓",
            Self::Error => "✗",
        }
    }
}

/// A single notice
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub id: Uuid,
    pub level: NoticeLevel,
    pub operation: Operation,
    pub resource_type: String,
    pub message: String,
    pub created_at: Instant,
}

impl Notice {
    pub fn new(level: NoticeLevel, operation: Operation, resource_type: &str, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            operation,
            resource_type: resource_type.to_string(),
            message,
            created_at: Instant::now(),
        }
    }

    /// One-line form for toasts
    pub fn display(&self) -> String {
        format!("{} {}", self.level.icon(), self.message)
    }
}

/// Bounded notice history
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    notices: VecDeque<Notice>,
    pub max_history: usize,
    /// How long a notice stays before [`NoticeBoard::prune_expired`] drops it
    pub ttl: Duration,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for NoticeBoard {
    fn eq(&self, other: &Self) -> bool {
        self.notices == other.notices
    }
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self {
            notices: VecDeque::new(),
            max_history: 50,
            ttl: Duration::from_secs(10),
        }
    }

    /// Add a notice and return its id
    pub fn push(&mut self, notice: Notice) -> Uuid {
        let id = notice.id;
        self.notices.push_front(notice);
        self.trim_history();
        id
    }

    pub fn success(&mut self, operation: Operation, resource_type: &str, message: Option<String>) -> Uuid {
        let message = message
            .unwrap_or_else(|| format!("{} {}", operation.past_tense(), resource_type));
        self.push(Notice::new(NoticeLevel::Success, operation, resource_type, message))
    }

    pub fn error(&mut self, operation: Operation, resource_type: &str, message: String) -> Uuid {
        self.push(Notice::new(NoticeLevel::Error, operation, resource_type, message))
    }

    /// Dismiss by id; returns whether anything was removed
    pub fn dismiss(&mut self, id: Uuid) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    pub fn get(&self, id: Uuid) -> Option<&Notice> {
        self.notices.iter().find(|n| n.id == id)
    }

    /// Most recent notice
    pub fn latest(&self) -> Option<&Notice> {
        self.notices.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.notices
            .iter()
            .filter(|n| n.level == NoticeLevel::Error)
            .count()
    }

    /// Drop notices older than the TTL
    pub fn prune_expired(&mut self) {
        let ttl = self.ttl;
        self.notices.retain(|n| n.created_at.elapsed() < ttl);
    }

    pub fn clear(&mut self) {
        self.notices.clear();
    }

    fn trim_history(&mut self) {
        while self.notices.len() > self.max_history {
            // Drop the oldest non-error notice first
            if let Some(pos) = self.notices.iter().rposition(|n| n.level != NoticeLevel::Error) {
                self.notices.remove(pos);
            } else {
                self.notices.pop_back();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_dismiss() {
        let mut board = NoticeBoard::new();
        let id = board.success(Operation::Delete, "products", None);
        assert_eq!(board.latest().unwrap().message, "Deleted products");
        assert!(board.dismiss(id));
        assert!(!board.dismiss(id));
        assert!(board.is_empty());
    }

    #[test]
    fn test_backend_message_preferred() {
        let mut board = NoticeBoard::new();
        board.success(Operation::Create, "promotions", Some("Promotion scheduled".into()));
        assert_eq!(board.latest().unwrap().display(), "✓ Promotion scheduled");
    }

    #[test]
    fn test_history_keeps_errors_longest() {
        let mut board = NoticeBoard::new();
        board.max_history = 2;
        board.error(Operation::Update, "refunds", "Refund already processed".into());
        board.success(Operation::Update, "refunds", None);
        board.success(Operation::Update, "refunds", None);
        assert_eq!(board.len(), 2);
        assert_eq!(board.error_count(), 1);
    }

    #[test]
    fn test_prune_expired() {
        let mut board = NoticeBoard::new();
        board.ttl = Duration::ZERO;
        board.success(Operation::Export, "orders", None);
        board.prune_expired();
        assert!(board.is_empty());
    }
}
