//! Debounce lines read from stdin
//!
//! Every line is a submission; once input has been quiet for the delay the
//! last line of the burst is printed, or handed to `--exec` as `$SETTLE_LINE`.
//! On EOF the open burst fires immediately.

use crate::util;
use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use settle_core::{DebounceConfig, DebounceError, Debounced, Debouncer};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

/// Outcome of one settled line; errors are rendered hook failures
type Settled = Result<(), String>;

pub async fn run(debounce: DebounceConfig, exec: Option<String>) -> Result<()> {
    let debouncer: Debouncer<Settled> = Debouncer::from_config(&debounce);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut windows: FuturesUnordered<Debounced<Settled>> = FuturesUnordered::new();
    let mut current_window = None;
    let mut submitted = 0usize;
    let mut failures = 0usize;

    info!("Debouncing stdin (delay: {:?})", debounce.delay());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read stdin")? else {
                    break;
                };
                submitted += 1;

                let exec = exec.clone();
                let pending = debouncer.submit(move || settle(line, exec));
                if pending.window_id() != current_window {
                    current_window = pending.window_id();
                    windows.push(pending);
                }
            }
            Some(outcome) = windows.next(), if !windows.is_empty() => {
                failures += report(outcome);
            }
        }
    }

    // EOF: no more input can extend the burst
    debouncer.flush();
    while let Some(outcome) = windows.next().await {
        failures += report(outcome);
    }

    debug!("Read {} lines, {} failed hooks", submitted, failures);
    if failures > 0 {
        anyhow::bail!("{} hook run(s) failed", failures);
    }
    Ok(())
}

/// Emit a settled line
async fn settle(line: String, exec: Option<String>) -> Settled {
    match exec {
        Some(command) => util::run_hook(&command, &[("SETTLE_LINE", line.as_str())])
            .await
            .map_err(|e| format!("{:#}", e)),
        None => {
            println!("{}", line);
            Ok(())
        }
    }
}

/// Log a window's outcome, returning 1 for a failed hook
fn report(outcome: Result<Settled, DebounceError>) -> usize {
    match outcome {
        Ok(Ok(())) => 0,
        Ok(Err(e)) => {
            warn!("{}", e);
            1
        }
        Err(e) => {
            debug!("Window ended without running: {}", e);
            0
        }
    }
}
