//! Watch a directory and report coalesced change batches

use crate::util;
use anyhow::{Context, Result};
use owo_colors::OwoColorize;
use settle_core::DebounceConfig;
use settle_watcher::{EventKind, WatchConfig, WatchEvent, Watcher};
use std::path::Path;
use tracing::{info, warn};

pub async fn run(
    path: &Path,
    config: WatchConfig,
    debounce: DebounceConfig,
    json: bool,
    exec: Option<String>,
) -> Result<()> {
    let mut watcher = Watcher::new(path, config, debounce)?;
    let mut batches = watcher.start()?;

    if !json {
        eprintln!(
            "{} {} {}",
            "Watching".bold(),
            watcher.root().display(),
            format!("(delay {:?}, Ctrl-C to stop)", debounce.delay()).dimmed()
        );
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            batch = batches.recv() => match batch {
                Some(batch) => handle_batch(&batch, json, exec.as_deref()).await?,
                None => break,
            },
            _ = &mut ctrl_c => {
                info!("Interrupted, stopping watcher");
                break;
            }
        }
    }

    // Stopping flushes the open window; print that last batch before leaving
    watcher.stop()?;
    while let Some(batch) = batches.recv().await {
        handle_batch(&batch, json, exec.as_deref()).await?;
    }
    Ok(())
}

async fn handle_batch(batch: &[WatchEvent], json: bool, exec: Option<&str>) -> Result<()> {
    if json {
        let line = serde_json::to_string(batch).context("Failed to serialize batch")?;
        println!("{}", line);
    } else {
        print_batch(batch);
    }

    if let Some(command) = exec {
        let paths = batch
            .iter()
            .map(|event| event.path.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("\n");
        let count = batch.len().to_string();

        // A failing hook should not end the watch session
        if let Err(e) = util::run_hook(
            command,
            &[("SETTLE_PATHS", paths.as_str()), ("SETTLE_EVENT_COUNT", count.as_str())],
        )
        .await
        {
            warn!("{:#}", e);
        }
    }

    Ok(())
}

fn print_batch(batch: &[WatchEvent]) {
    println!("{}", format!("── {} change(s)", batch.len()).dimmed());
    for event in batch {
        let label = match event.kind {
            EventKind::Create => format!("{:>8}", "created").green().to_string(),
            EventKind::Modify => format!("{:>8}", "modified").yellow().to_string(),
            EventKind::Delete => format!("{:>8}", "deleted").red().to_string(),
            EventKind::Rename => format!("{:>8}", "renamed").cyan().to_string(),
        };
        println!("  {} {}", label, event.path.display());
    }
}
