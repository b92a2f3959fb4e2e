//! Conflict pair model

use serde::{Deserialize, Serialize};

use super::book::{Book, BookId};

/// Suffix tagging the locally queued snapshot of a conflict.
pub const LOCAL_SUFFIX: &str = "_1";
/// Suffix tagging the server's current snapshot of a conflict.
pub const SERVER_SUFFIX: &str = "_2";

/// Which side of a conflict pair the user keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConflictSide {
    /// The locally queued write
    Local,
    /// The server's current state
    Server,
}

/// Two divergent snapshots of the same origin record, surfaced for manual
/// resolution.
///
/// Both sides are re-tagged with suffixed ids (`<id>_1` for the pending local
/// write, `<id>_2` for the server's state) so a presentation layer can show
/// and select them individually. Neither side is ever dropped automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictPair {
    /// The unsuffixed record id both snapshots derive from
    pub origin_id: BookId,
    /// The pending local write, id re-tagged `<id>_1`
    pub local: Book,
    /// The server's current state, id re-tagged `<id>_2`
    pub server: Book,
}

impl ConflictPair {
    /// Build a pair from a pending local write and the server's current
    /// record for the same origin id.
    #[must_use]
    pub fn new(origin_id: BookId, mut local: Book, mut server: Book) -> Self {
        local.id = Some(BookId::new(format!("{origin_id}{LOCAL_SUFFIX}")));
        server.id = Some(BookId::new(format!("{origin_id}{SERVER_SUFFIX}")));
        Self {
            origin_id,
            local,
            server,
        }
    }

    /// The server-side version this conflict was detected against.
    #[must_use]
    pub fn server_version(&self) -> u64 {
        self.server.version
    }

    /// Materialize the chosen side for resubmission: the suffix is stripped
    /// back to the origin id and the version moves one past the server's.
    #[must_use]
    pub fn choose(&self, side: ConflictSide) -> Book {
        let mut chosen = match side {
            ConflictSide::Local => self.local.clone(),
            ConflictSide::Server => self.server.clone(),
        };
        chosen.id = Some(self.origin_id.clone());
        chosen.version = self.server.version + 1;
        chosen.failed = false;
        chosen
    }
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
    fn new_tags_both_sides() {
        let pair = ConflictPair::new(
            BookId::new("42"),
            book("42", "Dune (local)", 3),
            book("42", "Dune (server)", 5),
        );

        assert_eq!(pair.local.id, Some(BookId::new("42_1")));
        assert_eq!(pair.server.id, Some(BookId::new("42_2")));
        assert_eq!(pair.origin_id, BookId::new("42"));
    }

    #[test]
    fn choose_restores_origin_id_and_bumps_past_server() {
        let pair = ConflictPair::new(
            BookId::new("42"),
            book("42", "Dune (local)", 3),
            book("42", "Dune (server)", 5),
        );

        let local = pair.choose(ConflictSide::Local);
        assert_eq!(local.id, Some(BookId::new("42")));
        assert_eq!(local.version, 6);
        assert_eq!(local.name, "Dune (local)");

        let server = pair.choose(ConflictSide::Server);
        assert_eq!(server.id, Some(BookId::new("42")));
        assert_eq!(server.version, 6);
        assert_eq!(server.name, "Dune (server)");
    }

    #[test]
    fn choose_clears_the_failed_marker() {
        let mut local = book("42", "Dune", 3);
        local.failed = true;
        let pair = ConflictPair::new(BookId::new("42"), local, book("42", "Dune", 5));

        assert!(!pair.choose(ConflictSide::Local).failed);
    }
}
