use crate::commands::common::{format_pending_lines, open_engine};
use crate::config::CliConfig;
use crate::error::CliError;

pub fn run_pending(as_json: bool, config: &CliConfig) -> Result<(), CliError> {
    let engine = open_engine(config)?;
    let writes = engine.pending_writes()?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&writes)?);
    } else if writes.is_empty() {
        println!("No writes queued");
    } else {
        for line in format_pending_lines(&writes) {
            println!("{line}");
        }
    }

    Ok(())
}
