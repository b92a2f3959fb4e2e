use shelf_core::push::{websocket_url, PushChannel, PushKind};

use crate::commands::common::open_engine;
use crate::config::CliConfig;
use crate::error::CliError;

/// Follow the collection live: replay anything queued, then merge push
/// frames until Ctrl-C.
pub async fn run_watch(config: &CliConfig) -> Result<(), CliError> {
    let engine = open_engine(config)?;
    engine.bootstrap().await?;
    engine.replay().await?;

    let url = websocket_url(&config.server_url);
    let mut channel = PushChannel::connect(&url, &config.token).await?;
    println!("Watching for changes (Ctrl-C to stop)");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            message = channel.next_message() => {
                let Some(message) = message else {
                    println!("Push channel closed");
                    break;
                };
                let verb = match &message.kind {
                    PushKind::Created => "created",
                    PushKind::Updated => "updated",
                    PushKind::Other(_) => continue,
                };
                println!("{verb}: {} (v{})", message.book.name, message.book.version);
                engine.apply_push(message)?;
            }
        }
    }

    engine.shutdown();
    channel.close().await;
    Ok(())
}
