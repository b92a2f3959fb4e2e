//! shelf-core - Core library for Shelf
//!
//! This crate contains the shared models, the local cache, and the sync
//! engine used by all Shelf interfaces. The engine keeps an authoritative
//! in-memory book collection, mirrors it into a local cache so the app keeps
//! working offline, queues writes that fail without connectivity, and replays
//! them (through conflict detection) when the network returns.

pub mod cache;
pub mod error;
pub mod models;
pub mod net;
pub mod push;
pub mod store;
pub mod sync;
pub mod transport;
pub mod util;

pub use error::{Error, Result};
pub use models::{Book, BookId, ConflictPair, ConflictSide, PendingWrite};
pub use store::{Action, BookStore, BooksState};
pub use sync::{SaveOutcome, SyncEngine};
