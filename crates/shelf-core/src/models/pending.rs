//! Pending write model

use serde::{Deserialize, Serialize};

use super::book::{Book, BookId};
use crate::util::unix_timestamp_ms;

/// A locally queued update that could not reach the server while offline.
///
/// Keyed uniquely per record id in the local cache; a later write for the
/// same id overwrites the earlier entry (last-write-wins at the queue level).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingWrite {
    /// Id of the record this write targets
    pub book_id: BookId,
    /// Payload captured at failure time
    pub snapshot: Book,
    /// When the write was queued (Unix ms)
    pub queued_at: i64,
    /// Replay attempts spent on this entry so far
    #[serde(default)]
    pub attempts: u32,
}

impl PendingWrite {
    /// Queue a snapshot for the given record id.
    #[must_use]
    pub fn new(book_id: BookId, snapshot: Book) -> Self {
        Self {
            book_id,
            snapshot,
            queued_at: unix_timestamp_ms(),
            attempts: 0,
        }
    }

    /// The entry after one more failed replay attempt.
    #[must_use]
    pub fn retried(mut self) -> Self {
        self.attempts += 1;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn retried_counts_attempts() {
        let book = Book::new("Dune", "Frank Herbert", true, Utc::now(), 412);
        let write = PendingWrite::new(BookId::new("42"), book);
        assert_eq!(write.attempts, 0);

        let write = write.retried().retried();
        assert_eq!(write.attempts, 2);
        assert_eq!(write.book_id, BookId::new("42"));
    }
}
