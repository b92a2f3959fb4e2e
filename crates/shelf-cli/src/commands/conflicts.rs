use shelf_core::{BookId, ConflictSide};

use crate::commands::common::{format_conflict_lines, open_engine, print_outcome};
use crate::config::CliConfig;
use crate::error::CliError;

pub async fn run_conflicts(as_json: bool, config: &CliConfig) -> Result<(), CliError> {
    let engine = open_engine(config)?;
    engine.bootstrap().await?;

    let state = engine.state();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&state.conflicts)?);
    } else if state.conflicts.is_empty() {
        println!("No conflicts awaiting a decision");
    } else {
        for line in format_conflict_lines(&state.conflicts) {
            println!("{line}");
        }
        println!("Resolve with `shelf resolve <id> --keep local|server`");
    }

    Ok(())
}

pub async fn run_resolve(
    id: &str,
    side: ConflictSide,
    config: &CliConfig,
) -> Result<(), CliError> {
    let engine = open_engine(config)?;
    engine.bootstrap().await?;

    let origin_id = BookId::new(id.trim());
    if engine.state().conflict(&origin_id).is_none() {
        return Err(CliError::ConflictNotFound(id.to_string()));
    }

    let outcome = engine.resolve_conflict(&origin_id, side).await?;
    print_outcome(&outcome);
    Ok(())
}
