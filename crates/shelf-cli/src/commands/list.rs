use crate::commands::common::{book_to_list_item, format_book_lines, open_engine, BookListItem};
use crate::config::CliConfig;
use crate::error::CliError;

pub async fn run_list(refresh: bool, as_json: bool, config: &CliConfig) -> Result<(), CliError> {
    let engine = open_engine(config)?;
    if refresh {
        engine.refresh().await?;
    } else {
        engine.bootstrap().await?;
    }

    let state = engine.state();
    if let Some(error) = &state.fetch_error {
        eprintln!("warning: fetch failed ({error}); showing cached books");
    }

    if as_json {
        let items = state
            .books
            .iter()
            .map(book_to_list_item)
            .collect::<Vec<BookListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for line in format_book_lines(&state.books) {
            println!("{line}");
        }
        if !state.conflicts.is_empty() {
            println!(
                "{} conflict(s) awaiting a decision; run `shelf conflicts`",
                state.conflicts.len()
            );
        }
    }

    Ok(())
}
