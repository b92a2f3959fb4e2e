use crate::commands::common::{format_conflict_lines, open_engine};
use crate::config::CliConfig;
use crate::error::CliError;

pub async fn run_sync(config: &CliConfig) -> Result<(), CliError> {
    let engine = open_engine(config)?;
    engine.bootstrap().await?;

    let queued_before = engine.pending_writes()?.len();
    engine.replay().await?;

    let remaining = engine.pending_writes()?.len();
    let state = engine.state();

    println!("Replayed {} of {queued_before} queued write(s)", queued_before - remaining);
    if remaining > 0 {
        println!("{remaining} write(s) still queued (server unreachable)");
    }
    if !state.conflicts.is_empty() {
        println!("{} conflict(s) need a decision:", state.conflicts.len());
        for line in format_conflict_lines(&state.conflicts) {
            println!("  {line}");
        }
        println!("Resolve with `shelf resolve <id> --keep local|server`");
    }

    Ok(())
}
