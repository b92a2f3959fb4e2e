use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use shelf_core::cache::CacheStore;
use shelf_core::net::{NetworkMonitor, NetworkStatus};
use shelf_core::transport::HttpTransport;
use shelf_core::{Book, ConflictPair, PendingWrite, SaveOutcome, SyncEngine};

use crate::config::CliConfig;
use crate::error::CliError;

/// Open the engine against the configured server and local cache.
///
/// The CLI process is short-lived and assumes connectivity; transport
/// failures still degrade into the offline paths (cached reads, queued
/// writes) instead of aborting the command.
pub fn open_engine(config: &CliConfig) -> Result<SyncEngine<HttpTransport>, CliError> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::debug!(path = %config.db_path.display(), "opening local cache");
    let cache = CacheStore::open(&config.db_path)?;
    let transport = HttpTransport::new(config.server_url.as_str())?;
    let network = NetworkMonitor::new(NetworkStatus::Connected);
    Ok(SyncEngine::new(
        transport,
        cache,
        network,
        config.token.as_str(),
    ))
}

#[derive(Debug, Serialize)]
pub struct BookListItem {
    pub id: Option<String>,
    pub name: String,
    pub author: String,
    pub available: bool,
    pub publish_date: String,
    pub pages: u32,
    pub version: u64,
    pub synced: bool,
}

pub fn book_to_list_item(book: &Book) -> BookListItem {
    BookListItem {
        id: book.id.as_ref().map(ToString::to_string),
        name: book.name.clone(),
        author: book.author.clone(),
        available: book.available,
        publish_date: format_date(book.publish_date),
        pages: book.pages,
        version: book.version,
        synced: book.is_synced(),
    }
}

pub fn format_book_lines(books: &[Book]) -> Vec<String> {
    books
        .iter()
        .map(|book| {
            let id = book
                .id
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string);
            let short_id = id.chars().take(13).collect::<String>();
            let marker = if book.is_synced() { "" } else { "  [unsynced]" };
            format!(
                "{short_id:<13}  {:<28}  {:<20}  {:>5}p  v{}{marker}",
                truncate(&book.name, 28),
                truncate(&book.author, 20),
                book.pages,
                book.version,
            )
        })
        .collect()
}

pub fn format_pending_lines(writes: &[PendingWrite]) -> Vec<String> {
    writes
        .iter()
        .map(|write| {
            format!(
                "{:<13}  {:<28}  queued v{}  attempts={}",
                write.book_id,
                truncate(&write.snapshot.name, 28),
                write.snapshot.version,
                write.attempts,
            )
        })
        .collect()
}

pub fn format_conflict_lines(conflicts: &[ConflictPair]) -> Vec<String> {
    conflicts
        .iter()
        .flat_map(|pair| {
            vec![
                format!(
                    "{}  local  v{}  {}",
                    pair.origin_id,
                    pair.local.version,
                    truncate(&pair.local.name, 40)
                ),
                format!(
                    "{}  server v{}  {}",
                    pair.origin_id,
                    pair.server.version,
                    truncate(&pair.server.name, 40)
                ),
            ]
        })
        .collect()
}

pub fn print_outcome(outcome: &SaveOutcome) {
    match outcome {
        SaveOutcome::Saved(book) => {
            let id = book
                .id
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string);
            println!("Saved {id} (v{})", book.version);
        }
        SaveOutcome::Queued(id) => {
            println!("Server unreachable; update for {id} queued for the next sync");
        }
        SaveOutcome::KeptLocal(book) => {
            let id = book
                .id
                .as_ref()
                .map_or_else(|| "-".to_string(), ToString::to_string);
            println!("Server unreachable; book kept locally as {id}");
        }
        SaveOutcome::Rejected(message) => {
            println!("Save rejected: {message}");
        }
    }
}

/// Parse a YYYY-MM-DD publish date into a UTC timestamp at midnight.
pub fn parse_publish_date(raw: &str) -> Result<DateTime<Utc>, CliError> {
    let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| CliError::InvalidDate(raw.to_string()))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| CliError::InvalidDate(raw.to_string()))?;
    Ok(DateTime::from_naive_utc_and_offset(midnight, Utc))
}

pub fn format_date(date: DateTime<Utc>) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = text.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use shelf_core::BookId;

    fn book(id: Option<&str>, name: &str) -> Book {
        let mut book = Book::new(
            name,
            "Frank Herbert",
            true,
            parse_publish_date("1965-08-01").unwrap(),
            412,
        );
        book.id = id.map(BookId::from);
        book
    }

    #[test]
    fn parse_publish_date_round_trips() {
        let date = parse_publish_date("1965-08-01").unwrap();
        assert_eq!(format_date(date), "1965-08-01");
        assert_eq!(format_date(parse_publish_date(" 2024-02-29 ").unwrap()), "2024-02-29");
    }

    #[test]
    fn parse_publish_date_rejects_garbage() {
        assert!(matches!(
            parse_publish_date("August 1965"),
            Err(CliError::InvalidDate(_))
        ));
        assert!(matches!(
            parse_publish_date("2024-13-01"),
            Err(CliError::InvalidDate(_))
        ));
    }

    #[test]
    fn unsynced_books_are_marked() {
        let mut kept = book(None, "Dune");
        kept.id = Some(BookId::local());
        kept.failed = true;

        let lines = format_book_lines(&[book(Some("42"), "Dune"), kept]);
        assert!(!lines[0].contains("[unsynced]"));
        assert!(lines[1].contains("[unsynced]"));
    }

    #[test]
    fn long_names_are_truncated_with_ellipsis() {
        let lines = format_book_lines(&[book(
            Some("42"),
            "A very long book title that should be shortened for display",
        )]);
        assert!(lines[0].contains("..."));
    }
}
