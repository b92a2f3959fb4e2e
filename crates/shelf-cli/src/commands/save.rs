use chrono::Utc;
use shelf_core::{Book, BookId};

use crate::commands::common::{open_engine, parse_publish_date, print_outcome};
use crate::config::CliConfig;
use crate::error::CliError;

pub async fn run_add(
    name: &str,
    author: &str,
    pages: u32,
    published: Option<&str>,
    unavailable: bool,
    config: &CliConfig,
) -> Result<(), CliError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::EmptyName);
    }

    let publish_date = match published {
        Some(raw) => parse_publish_date(raw)?,
        None => Utc::now(),
    };

    let engine = open_engine(config)?;
    engine.bootstrap().await?;

    let book = Book::new(name, author.trim(), !unavailable, publish_date, pages);
    let outcome = engine.save(book).await?;
    print_outcome(&outcome);
    Ok(())
}

pub async fn run_edit(
    id: &str,
    name: Option<&str>,
    author: Option<&str>,
    pages: Option<u32>,
    published: Option<&str>,
    available: Option<bool>,
    config: &CliConfig,
) -> Result<(), CliError> {
    let engine = open_engine(config)?;
    engine.bootstrap().await?;

    let book_id = BookId::new(id.trim());
    let mut book = engine
        .state()
        .find(&book_id)
        .cloned()
        .ok_or_else(|| CliError::BookNotFound(id.to_string()))?;

    if let Some(name) = name {
        book.name = name.trim().to_string();
    }
    if let Some(author) = author {
        book.author = author.trim().to_string();
    }
    if let Some(pages) = pages {
        book.pages = pages;
    }
    if let Some(raw) = published {
        book.publish_date = parse_publish_date(raw)?;
    }
    if let Some(available) = available {
        book.available = available;
    }

    let outcome = engine.save(book).await?;
    print_outcome(&outcome);
    Ok(())
}
