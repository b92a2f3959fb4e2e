//! Local persistent store: a small key-value cache over `SQLite`.
//!
//! Survives process restarts and backs two concerns: the last known book
//! collection under a fixed key, and one entry per pending write under a key
//! prefix. Everything is stored as JSON text through the shared serde models.

use std::path::Path;

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::models::{Book, BookId, ConflictPair, PendingWrite};

/// Fixed key holding the whole-collection cache.
const COLLECTION_KEY: &str = "books/collection";
/// Key prefix for pending writes; the record id follows the prefix.
const PENDING_PREFIX: &str = "pending/";
/// Key prefix for surfaced conflicts; the origin id follows the prefix.
const CONFLICT_PREFIX: &str = "conflicts/";

/// `SQLite`-backed key-value cache.
pub struct CacheStore {
    conn: Connection,
}

impl CacheStore {
    /// Open the cache at the given path, creating it if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let cache = Self { conn };
        cache.configure()?;
        cache.migrate()?;
        Ok(cache)
    }

    /// Open an in-memory cache (useful for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let cache = Self { conn };
        cache.configure()?;
        cache.migrate()?;
        Ok(cache)
    }

    /// Configure `SQLite` for local-cache use.
    fn configure(&self) -> Result<()> {
        // WAL keeps readers unblocked during mirror writes; pragmas may be
        // unsupported in-memory, so failures are ignored
        self.conn.pragma_update(None, "journal_mode", "WAL").ok();
        self.conn.pragma_update(None, "synchronous", "NORMAL").ok();
        Ok(())
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Get a raw value by key.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        let result = self.conn.query_row(
            "SELECT value FROM kv WHERE key = ?",
            params![key],
            |row| row.get(0),
        );
        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Set a raw value, replacing any previous value under the key.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a key; missing keys are not an error.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?", params![key])?;
        Ok(())
    }

    /// List keys starting with the given prefix, sorted.
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM kv WHERE key >= ? AND key < ? ORDER BY key")?;
        // range scan instead of LIKE, which would need wildcard escaping
        let upper = prefix_upper_bound(prefix);
        let keys = stmt
            .query_map(params![prefix, upper], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(keys)
    }

    /// Cache the whole collection, order-preserved.
    pub fn store_collection(&self, books: &[Book]) -> Result<()> {
        let payload = serde_json::to_string(books)?;
        self.set(COLLECTION_KEY, &payload)
    }

    /// Load the cached collection; `None` when nothing was ever cached.
    pub fn load_collection(&self) -> Result<Option<Vec<Book>>> {
        let Some(payload) = self.get(COLLECTION_KEY)? else {
            return Ok(None);
        };
        Ok(Some(serde_json::from_str(&payload)?))
    }

    /// Queue a pending write; a later write for the same id overwrites the
    /// earlier entry.
    pub fn put_pending(&self, write: &PendingWrite) -> Result<()> {
        let payload = serde_json::to_string(write)?;
        self.set(&pending_key(&write.book_id), &payload)
    }

    /// All queued writes, in key order.
    pub fn pending_writes(&self) -> Result<Vec<PendingWrite>> {
        let mut writes = Vec::new();
        for key in self.keys_with_prefix(PENDING_PREFIX)? {
            if let Some(payload) = self.get(&key)? {
                writes.push(serde_json::from_str(&payload)?);
            }
        }
        Ok(writes)
    }

    /// Remove the queued write for a record id, if any.
    pub fn remove_pending(&self, id: &BookId) -> Result<()> {
        self.remove(&pending_key(id))
    }

    /// Persist a surfaced conflict so it survives a restart; a conflict is
    /// converted from a pending write, never lost.
    pub fn put_conflict(&self, pair: &ConflictPair) -> Result<()> {
        let payload = serde_json::to_string(pair)?;
        self.set(&conflict_key(&pair.origin_id), &payload)
    }

    /// All persisted conflicts, in key order.
    pub fn conflicts(&self) -> Result<Vec<ConflictPair>> {
        let mut pairs = Vec::new();
        for key in self.keys_with_prefix(CONFLICT_PREFIX)? {
            if let Some(payload) = self.get(&key)? {
                pairs.push(serde_json::from_str(&payload)?);
            }
        }
        Ok(pairs)
    }

    /// Remove the persisted conflict for an origin id, if any.
    pub fn remove_conflict(&self, origin_id: &BookId) -> Result<()> {
        self.remove(&conflict_key(origin_id))
    }
}

fn pending_key(id: &BookId) -> String {
    format!("{PENDING_PREFIX}{id}")
}

fn conflict_key(origin_id: &BookId) -> String {
    format!("{CONFLICT_PREFIX}{origin_id}")
}

/// Smallest string greater than every key with the given prefix.
fn prefix_upper_bound(prefix: &str) -> String {
    let mut bytes = prefix.as_bytes().to_vec();
    while let Some(last) = bytes.last_mut() {
        if *last < u8::MAX {
            *last += 1;
            return String::from_utf8_lossy(&bytes).into_owned();
        }
        bytes.pop();
    }
    // unreachable for our fixed prefixes; scan everything as a fallback
    "\u{10ffff}".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn book(id: &str, name: &str, version: u64) -> Book {
        let mut book = Book::new(name, "Frank Herbert", true, Utc::now(), 412);
        book.id = Some(BookId::new(id));
        book.version = version;
        book
    }

    #[test]
    fn get_set_remove_round_trip() {
        let cache = CacheStore::open_in_memory().unwrap();
        assert_eq!(cache.get("missing").unwrap(), None);

        cache.set("a", "1").unwrap();
        cache.set("a", "2").unwrap();
        assert_eq!(cache.get("a").unwrap().as_deref(), Some("2"));

        cache.remove("a").unwrap();
        cache.remove("a").unwrap();
        assert_eq!(cache.get("a").unwrap(), None);
    }

    #[test]
    fn keys_with_prefix_filters_and_sorts() {
        let cache = CacheStore::open_in_memory().unwrap();
        cache.set("pending/2", "x").unwrap();
        cache.set("pending/1", "x").unwrap();
        cache.set("books/collection", "x").unwrap();
        cache.set("pendingx", "x").unwrap();

        assert_eq!(
            cache.keys_with_prefix("pending/").unwrap(),
            vec!["pending/1".to_string(), "pending/2".to_string()]
        );
    }

    #[test]
    fn collection_round_trip_preserves_content_and_order() {
        let cache = CacheStore::open_in_memory().unwrap();
        assert_eq!(cache.load_collection().unwrap(), None);

        let books = vec![book("2", "Hyperion", 1), book("1", "Dune", 3)];
        cache.store_collection(&books).unwrap();

        assert_eq!(cache.load_collection().unwrap(), Some(books));
    }

    #[test]
    fn an_empty_collection_is_still_a_cache_hit() {
        let cache = CacheStore::open_in_memory().unwrap();
        cache.store_collection(&[]).unwrap();
        assert_eq!(cache.load_collection().unwrap(), Some(Vec::new()));
    }

    #[test]
    fn pending_writes_are_keyed_per_record() {
        let cache = CacheStore::open_in_memory().unwrap();

        cache
            .put_pending(&PendingWrite::new(BookId::new("42"), book("42", "Dune", 3)))
            .unwrap();
        cache
            .put_pending(&PendingWrite::new(
                BookId::new("7"),
                book("7", "Hyperion", 1),
            ))
            .unwrap();

        let writes = cache.pending_writes().unwrap();
        assert_eq!(writes.len(), 2);

        cache.remove_pending(&BookId::new("42")).unwrap();
        let writes = cache.pending_writes().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].book_id, BookId::new("7"));
    }

    #[test]
    fn a_later_pending_write_overwrites_the_earlier_one() {
        let cache = CacheStore::open_in_memory().unwrap();

        cache
            .put_pending(&PendingWrite::new(BookId::new("42"), book("42", "Dune", 3)))
            .unwrap();
        cache
            .put_pending(&PendingWrite::new(
                BookId::new("42"),
                book("42", "Dune (second edit)", 3),
            ))
            .unwrap();

        let writes = cache.pending_writes().unwrap();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].snapshot.name, "Dune (second edit)");
    }

    #[test]
    fn conflicts_are_keyed_per_origin() {
        let cache = CacheStore::open_in_memory().unwrap();
        let pair = ConflictPair::new(
            BookId::new("42"),
            book("42", "Dune (local)", 3),
            book("42", "Dune (server)", 5),
        );

        cache.put_conflict(&pair).unwrap();
        cache.put_conflict(&pair).unwrap();
        assert_eq!(cache.conflicts().unwrap(), vec![pair]);

        cache.remove_conflict(&BookId::new("42")).unwrap();
        assert!(cache.conflicts().unwrap().is_empty());
    }

    #[test]
    fn cache_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shelf.db");

        {
            let cache = CacheStore::open(&path).unwrap();
            cache.store_collection(&[book("1", "Dune", 3)]).unwrap();
            cache
                .put_pending(&PendingWrite::new(BookId::new("1"), book("1", "Dune", 3)))
                .unwrap();
        }

        let cache = CacheStore::open(&path).unwrap();
        assert_eq!(cache.load_collection().unwrap().unwrap().len(), 1);
        assert_eq!(cache.pending_writes().unwrap().len(), 1);
    }
}
