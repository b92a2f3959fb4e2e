//! In-memory book store: a reducer-style state machine.
//!
//! All mutations to the authoritative collection go through [`BookStore::dispatch`],
//! which applies a pure [`reduce`] function to the current snapshot and
//! publishes the result. Snapshots are immutable `Arc`s; previous snapshots
//! are never mutated, so holders can compare states across dispatches.

use std::sync::Arc;

use tokio::sync::watch;

use crate::models::{Book, BookId, ConflictPair};

/// Snapshot of the book collection plus operation status flags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BooksState {
    /// The authoritative collection; insertion order is display order
    pub books: Vec<Book>,
    /// A fetch is in flight
    pub fetching: bool,
    /// Last fetch failure, if any
    pub fetch_error: Option<String>,
    /// A save is in flight
    pub saving: bool,
    /// Last save failure, if any
    pub save_error: Option<String>,
    /// How many brand-new books have failed to reach the server
    pub fail_count: u64,
    /// Version conflicts awaiting a user decision
    pub conflicts: Vec<ConflictPair>,
}

impl BooksState {
    /// Find a book by id.
    #[must_use]
    pub fn find(&self, id: &BookId) -> Option<&Book> {
        self.books.iter().find(|book| book.has_id(id))
    }

    /// Find a surfaced conflict by its origin id.
    #[must_use]
    pub fn conflict(&self, origin_id: &BookId) -> Option<&ConflictPair> {
        self.conflicts
            .iter()
            .find(|pair| &pair.origin_id == origin_id)
    }

    /// Books that exist only on this device.
    #[must_use]
    pub fn local_only(&self) -> Vec<Book> {
        self.books
            .iter()
            .filter(|book| book.failed)
            .cloned()
            .collect()
    }
}

/// A discrete state transition of the book store.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A collection fetch started
    FetchStarted,
    /// A fetch completed; replaces the whole collection
    FetchSucceeded { books: Vec<Book> },
    /// A fetch failed; the current collection is preserved
    FetchFailed { error: String },
    /// A save started
    SaveStarted,
    /// A save (or push-channel merge) completed; upserts by id
    SaveSucceeded { book: Book },
    /// A save failed; upserts the failing snapshot so it stays visible
    SaveFailed { book: Book, error: String },
    /// A version conflict was surfaced
    ConflictDetected { pair: ConflictPair },
    /// A conflict was resolved by the user; removes the pair
    ConflictResolved { origin_id: BookId },
    /// Remove a book by id (a confirmed placeholder must not appear twice)
    RemoveDuplicate { id: BookId },
}

/// Apply an action to a snapshot, producing the next snapshot.
///
/// Pure: the input state is never modified.
#[must_use]
pub fn reduce(state: &BooksState, action: Action) -> BooksState {
    let mut next = state.clone();
    match action {
        Action::FetchStarted => {
            next.fetching = true;
            next.fetch_error = None;
        }
        Action::FetchSucceeded { books } => {
            next.books = books;
            next.fetching = false;
            next.fetch_error = None;
        }
        Action::FetchFailed { error } => {
            next.fetching = false;
            next.fetch_error = Some(error);
        }
        Action::SaveStarted => {
            next.saving = true;
            next.save_error = None;
        }
        Action::SaveSucceeded { book } => {
            upsert(&mut next.books, book);
            next.saving = false;
            next.save_error = None;
        }
        Action::SaveFailed { book, error } => {
            if book.failed {
                next.fail_count += 1;
            }
            upsert(&mut next.books, book);
            next.saving = false;
            next.save_error = Some(error);
        }
        Action::ConflictDetected { pair } => {
            match next
                .conflicts
                .iter()
                .position(|existing| existing.origin_id == pair.origin_id)
            {
                Some(index) => next.conflicts[index] = pair,
                None => next.conflicts.push(pair),
            }
        }
        Action::ConflictResolved { origin_id } => {
            next.conflicts.retain(|pair| pair.origin_id != origin_id);
        }
        Action::RemoveDuplicate { id } => {
            next.books.retain(|book| !book.has_id(&id));
        }
    }
    next
}

/// Replace the entry with the same id, or insert at the front.
fn upsert(books: &mut Vec<Book>, book: Book) {
    let position = book
        .id
        .as_ref()
        .and_then(|id| books.iter().position(|existing| existing.has_id(id)));
    match position {
        Some(index) => books[index] = book,
        None => books.insert(0, book),
    }
}

/// Handle on the reducer: dispatch actions, read and await snapshots.
///
/// Dispatch is the single serialization point for the collection; concurrent
/// dispatchers are applied one at a time.
#[derive(Debug)]
pub struct BookStore {
    snapshots: watch::Sender<Arc<BooksState>>,
}

impl BookStore {
    /// Create a store holding an empty collection.
    #[must_use]
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(Arc::new(BooksState::default()));
        Self { snapshots }
    }

    /// Apply an action and publish the new snapshot.
    pub fn dispatch(&self, action: Action) {
        self.snapshots.send_modify(|current| {
            *current = Arc::new(reduce(current.as_ref(), action));
        });
    }

    /// The current snapshot.
    #[must_use]
    pub fn state(&self) -> Arc<BooksState> {
        self.snapshots.borrow().clone()
    }

    /// Subscribe to snapshot changes.
    ///
    /// The receiver sees only snapshots published after subscription.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Arc<BooksState>> {
        self.snapshots.subscribe()
    }
}

impl Default for BookStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn book(id: Option<&str>, name: &str, version: u64) -> Book {
        let mut book = Book::new(name, "Frank Herbert", true, Utc::now(), 412);
        book.id = id.map(BookId::from);
        book.version = version;
        book
    }

    #[test]
    fn fetch_success_replaces_collection() {
        let state = reduce(&BooksState::default(), Action::FetchStarted);
        assert!(state.fetching);

        let state = reduce(
            &state,
            Action::FetchSucceeded {
                books: vec![book(Some("1"), "Dune", 0), book(Some("2"), "Hyperion", 2)],
            },
        );
        assert!(!state.fetching);
        assert_eq!(state.books.len(), 2);
    }

    #[test]
    fn fetch_failure_preserves_collection() {
        let seeded = reduce(
            &BooksState::default(),
            Action::FetchSucceeded {
                books: vec![book(Some("1"), "Dune", 0)],
            },
        );

        let state = reduce(
            &seeded,
            Action::FetchFailed {
                error: "server unreachable".to_string(),
            },
        );
        assert_eq!(state.books, seeded.books);
        assert_eq!(state.fetch_error.as_deref(), Some("server unreachable"));
    }

    #[test]
    fn save_success_inserts_new_books_at_the_front() {
        let state = reduce(
            &BooksState::default(),
            Action::FetchSucceeded {
                books: vec![book(Some("1"), "Dune", 0)],
            },
        );
        let state = reduce(
            &state,
            Action::SaveSucceeded {
                book: book(Some("2"), "Hyperion", 0),
            },
        );

        assert_eq!(state.books[0].name, "Hyperion");
        assert_eq!(state.books[1].name, "Dune");
    }

    #[test]
    fn save_success_replaces_in_place() {
        let state = reduce(
            &BooksState::default(),
            Action::FetchSucceeded {
                books: vec![book(Some("1"), "Dune", 0), book(Some("2"), "Hyperion", 0)],
            },
        );
        let state = reduce(
            &state,
            Action::SaveSucceeded {
                book: book(Some("2"), "Hyperion (revised)", 1),
            },
        );

        assert_eq!(state.books.len(), 2);
        assert_eq!(state.books[1].name, "Hyperion (revised)");
        assert_eq!(state.books[1].version, 1);
    }

    #[test]
    fn save_success_never_duplicates_an_id() {
        let mut state = BooksState::default();
        for _ in 0..3 {
            state = reduce(
                &state,
                Action::SaveSucceeded {
                    book: book(Some("1"), "Dune", 0),
                },
            );
        }
        assert_eq!(state.books.len(), 1);
    }

    #[test]
    fn save_failure_keeps_snapshot_and_counts_failed_creations() {
        let mut failed = book(None, "Dune", 0);
        failed.id = Some(BookId::local());
        failed.failed = true;

        let state = reduce(
            &BooksState::default(),
            Action::SaveFailed {
                book: failed.clone(),
                error: "server unreachable".to_string(),
            },
        );
        assert_eq!(state.fail_count, 1);
        assert_eq!(state.books.len(), 1);
        assert!(state.books[0].failed);
        assert_eq!(state.save_error.as_deref(), Some("server unreachable"));

        // an existing book failing does not count as a failed creation
        let state = reduce(
            &state,
            Action::SaveFailed {
                book: book(Some("2"), "Hyperion", 1),
                error: "server unreachable".to_string(),
            },
        );
        assert_eq!(state.fail_count, 1);
        assert_eq!(state.books[0].name, "Hyperion");
    }

    #[test]
    fn remove_duplicate_drops_by_id() {
        let placeholder = BookId::local();
        let mut local = book(None, "Dune", 0);
        local.id = Some(placeholder.clone());

        let state = reduce(
            &BooksState::default(),
            Action::SaveSucceeded { book: local },
        );
        let state = reduce(&state, Action::RemoveDuplicate { id: placeholder });
        assert!(state.books.is_empty());
    }

    #[test]
    fn conflicts_replace_by_origin_and_resolve_removes() {
        let pair = ConflictPair::new(
            BookId::new("42"),
            book(Some("42"), "Dune (local)", 3),
            book(Some("42"), "Dune (server)", 5),
        );
        let state = reduce(
            &BooksState::default(),
            Action::ConflictDetected { pair: pair.clone() },
        );
        let newer = ConflictPair::new(
            BookId::new("42"),
            book(Some("42"), "Dune (local)", 3),
            book(Some("42"), "Dune (server)", 6),
        );
        let state = reduce(&state, Action::ConflictDetected { pair: newer });
        assert_eq!(state.conflicts.len(), 1);
        assert_eq!(state.conflicts[0].server_version(), 6);

        let state = reduce(
            &state,
            Action::ConflictResolved {
                origin_id: BookId::new("42"),
            },
        );
        assert!(state.conflicts.is_empty());
    }

    #[test]
    fn reduce_leaves_the_previous_snapshot_untouched() {
        let seeded = reduce(
            &BooksState::default(),
            Action::FetchSucceeded {
                books: vec![book(Some("1"), "Dune", 0)],
            },
        );
        let before = seeded.clone();

        let _next = reduce(
            &seeded,
            Action::SaveSucceeded {
                book: book(Some("1"), "Dune (revised)", 1),
            },
        );
        assert_eq!(seeded, before);
    }

    #[test]
    fn dispatch_publishes_snapshots_to_subscribers() {
        let store = BookStore::new();
        let mut changes = store.subscribe();
        assert!(!changes.has_changed().unwrap());

        store.dispatch(Action::FetchStarted);
        assert!(changes.has_changed().unwrap());
        assert!(changes.borrow_and_update().fetching);
        assert!(store.state().fetching);
    }
}
