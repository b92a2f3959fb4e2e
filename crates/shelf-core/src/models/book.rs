//! Book model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Prefix for ids synthesized on this device for books the server has never
/// acknowledged. Server-assigned ids never carry it.
const LOCAL_ID_PREFIX: &str = "local-";

/// Identifier of a book.
///
/// Either a server-assigned id, or a locally generated placeholder id
/// (UUID v7 behind [`LOCAL_ID_PREFIX`]) for a book created while offline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BookId(String);

impl BookId {
    /// Wrap a server-assigned id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a placeholder id for a book that only exists on this device.
    ///
    /// UUID v7 keeps placeholders unique across process restarts, unlike a
    /// plain fail counter.
    #[must_use]
    pub fn local() -> Self {
        Self(format!("{LOCAL_ID_PREFIX}{}", Uuid::now_v7()))
    }

    /// Whether this id was synthesized locally and never confirmed.
    #[must_use]
    pub fn is_local(&self) -> bool {
        self.0.starts_with(LOCAL_ID_PREFIX)
    }

    /// Get the string representation of this id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BookId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A book in the synchronized collection.
///
/// Field names mirror the server's wire format so the same struct serves the
/// REST calls, the push channel, and the local cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Server-assigned identifier; absent until the first confirmed create
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<BookId>,
    /// Title
    pub name: String,
    /// Author
    pub author: String,
    /// Availability flag
    pub available: bool,
    /// Publish date
    pub publish_date: DateTime<Utc>,
    /// Page count
    pub pages: u32,
    /// Optimistic-concurrency version; bumped by the server on each update
    #[serde(default)]
    pub version: u64,
    /// Set when the book exists only locally, never acknowledged by the server
    #[serde(rename = "_failed", default, skip_serializing_if = "is_false")]
    pub failed: bool,
    /// Optional photo, base64-encoded
    #[serde(rename = "photoBase64", default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl Book {
    /// Create a new, not-yet-saved book with the given payload.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        author: impl Into<String>,
        available: bool,
        publish_date: DateTime<Utc>,
        pages: u32,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            author: author.into(),
            available,
            publish_date,
            pages,
            version: 0,
            failed: false,
            photo: None,
            latitude: None,
            longitude: None,
        }
    }

    /// Whether this book has been acknowledged by the server.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        !self.failed && self.id.as_ref().is_some_and(|id| !id.is_local())
    }

    /// Check this book against an id, treating id-less books as never matching.
    #[must_use]
    pub fn has_id(&self, id: &BookId) -> bool {
        self.id.as_ref() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn dune() -> Book {
        Book::new(
            "Dune",
            "Frank Herbert",
            true,
            Utc.with_ymd_and_hms(1965, 8, 1, 0, 0, 0).unwrap(),
            412,
        )
    }

    #[test]
    fn local_ids_are_unique_and_tagged() {
        let a = BookId::local();
        let b = BookId::local();
        assert_ne!(a, b);
        assert!(a.is_local());
        assert!(!BookId::new("42").is_local());
    }

    #[test]
    fn new_book_is_unsaved() {
        let book = dune();
        assert_eq!(book.id, None);
        assert_eq!(book.version, 0);
        assert!(!book.failed);
        assert!(!book.is_synced());
    }

    #[test]
    fn synced_requires_server_id() {
        let mut book = dune();
        book.id = Some(BookId::local());
        assert!(!book.is_synced());

        book.id = Some(BookId::new("42"));
        assert!(book.is_synced());

        book.failed = true;
        assert!(!book.is_synced());
    }

    #[test]
    fn serializes_with_server_field_names() {
        let mut book = dune();
        book.id = Some(BookId::new("42"));
        book.version = 3;

        let json = serde_json::to_value(&book).unwrap();
        assert_eq!(json["_id"], "42");
        assert_eq!(json["pages"], 412);
        assert_eq!(json["version"], 3);
        // local-only markers and absent optionals stay off the wire
        assert!(json.get("_failed").is_none());
        assert!(json.get("photoBase64").is_none());
        assert!(json.get("latitude").is_none());
    }

    #[test]
    fn deserializes_without_id_or_version() {
        let book: Book = serde_json::from_str(
            r#"{"name":"Dune","author":"Frank Herbert","available":true,
                "publish_date":"1965-08-01T00:00:00Z","pages":412}"#,
        )
        .unwrap();
        assert_eq!(book.id, None);
        assert_eq!(book.version, 0);
        assert!(!book.failed);
    }

    #[test]
    fn wire_round_trip_preserves_payload() {
        let mut book = dune();
        book.id = Some(BookId::new("42"));
        book.photo = Some("aGVsbG8=".to_string());
        book.latitude = Some(46.77);
        book.longitude = Some(23.59);

        let json = serde_json::to_string(&book).unwrap();
        let parsed: Book = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, book);
    }
}
