use chrono::{DateTime, Utc};
use dashmap::DashMap;

/// Telegram user ids are 64-bit.
pub type UserId = u64;

// ============================================================================
// Pending Request
// ============================================================================

/// What the next text message from a user is expected to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedInput {
    /// A `<size_range> <format>` command.
    SizeAndFormat,
}

/// An image received from a user, waiting for its conversion command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    /// Transport-specific handle used to download the file later.
    pub file_id: String,
    pub expected: ExpectedInput,
    /// Size reported by the transport, in bytes.
    pub original_size: u64,
    pub received_at: DateTime<Utc>,
}

impl PendingRequest {
    pub fn new(file_id: impl Into<String>, original_size: u64) -> Self {
        Self {
            file_id: file_id.into(),
            expected: ExpectedInput::SizeAndFormat,
            original_size,
            received_at: Utc::now(),
        }
    }
}

// ============================================================================
// Session Store
// ============================================================================

/// Per-user conversation state.
///
/// Entries live from the moment an image arrives until the follow-up text is
/// handled. [`SessionStore::consume`] removes atomically, so when two
/// messages from the same user race, only one of them obtains the entry.
#[derive(Debug, Default)]
pub struct SessionStore {
    pending: DashMap<UserId, PendingRequest>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an image for `user`, replacing any earlier one.
    pub fn record(&self, user: UserId, request: PendingRequest) {
        if let Some(previous) = self.pending.insert(user, request) {
            tracing::debug!(user, file_id = %previous.file_id, "Replaced pending image");
        }
    }

    /// Whether the next text from `user` should be parsed as a conversion command.
    pub fn is_awaiting_spec(&self, user: UserId) -> bool {
        self.pending
            .get(&user)
            .map(|entry| entry.expected == ExpectedInput::SizeAndFormat)
            .unwrap_or(false)
    }

    /// Removes and returns the pending request of `user`.
    pub fn consume(&self, user: UserId) -> Option<PendingRequest> {
        self.pending.remove(&user).map(|(_, request)| request)
    }

    /// Number of users with a pending image.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_record_then_consume_twice() {
        let store = SessionStore::new();
        store.record(7, PendingRequest::new("file-a", 51_200));
        assert!(store.is_awaiting_spec(7));

        let first = store.consume(7).unwrap();
        assert_eq!(first.file_id, "file-a");
        assert_eq!(first.original_size, 51_200);
        assert!(store.consume(7).is_none());
        assert!(!store.is_awaiting_spec(7));
    }

    #[test]
    fn test_latest_image_wins() {
        let store = SessionStore::new();
        store.record(1, PendingRequest::new("old", 1));
        store.record(1, PendingRequest::new("new", 2));
        assert_eq!(store.len(), 1);
        assert_eq!(store.consume(1).unwrap().file_id, "new");
    }

    #[test]
    fn test_users_are_isolated() {
        let store = SessionStore::new();
        store.record(1, PendingRequest::new("one", 1));
        assert!(!store.is_awaiting_spec(2));
        assert!(store.consume(2).is_none());
        assert!(store.is_awaiting_spec(1));
    }

    #[test]
    fn test_racing_consumers_get_one_entry() {
        let store = Arc::new(SessionStore::new());
        store.record(9, PendingRequest::new("only", 1));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.consume(9).is_some())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert!(store.is_empty());
    }
}
