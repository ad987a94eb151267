//! File system watching with debounced batches
//!
//! This crate provides:
//! - A `notify`-backed watcher for a directory tree
//! - Ignore rules (built-ins, .gitignore, .settleignore, config patterns)
//! - Per-window event coalescing into one batch per quiet period

pub mod coalesce;
pub mod ignore;

pub use coalesce::coalesce_events;
pub use ignore::{IgnoreConfig, IgnoreRules};

use anyhow::{Context, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use notify::event::ModifyKind;
use notify::{RecommendedWatcher, RecursiveMode, Watcher as _};
use serde::{Deserialize, Serialize};
use settle_core::{Batch, Coalescer, DebounceConfig, DebounceError, Debounced};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Capacity of the outgoing batch channel
const BATCH_CHANNEL_CAPACITY: usize = 64;

/// File system watcher
///
/// Raw notify events are filtered through [`IgnoreRules`], collected per
/// debounce window and delivered as one coalesced batch once the tree has
/// been quiet for the configured delay.
pub struct Watcher {
    root: PathBuf,
    config: WatchConfig,
    debounce: DebounceConfig,
    inner: Option<RecommendedWatcher>,
    pump: Option<JoinHandle<()>>,
}

impl Watcher {
    /// Create a new watcher for the given path
    pub fn new(root: &Path, config: WatchConfig, debounce: DebounceConfig) -> Result<Self> {
        debounce.validate()?;

        let root = root
            .canonicalize()
            .with_context(|| format!("Failed to resolve watch root {}", root.display()))?;

        Ok(Self {
            root,
            config,
            debounce,
            inner: None,
            pump: None,
        })
    }

    /// Start watching; batches arrive on the returned channel
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&mut self) -> Result<mpsc::Receiver<Vec<WatchEvent>>> {
        if self.is_running() {
            anyhow::bail!("Watcher already running for {}", self.root.display());
        }

        let rules = IgnoreRules::load(&self.root, self.config.ignore.clone())?;

        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<RawEvent>();
        let mut watcher = notify::recommended_watcher(move |res: RawEvent| {
            // Receiver gone means the pump stopped; nothing left to do
            let _ = raw_tx.send(res);
        })
        .context("Failed to create file watcher")?;

        let mode = if self.config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(&self.root, mode)
            .with_context(|| format!("Failed to watch {}", self.root.display()))?;

        let (batch_tx, batch_rx) = mpsc::channel(BATCH_CHANNEL_CAPACITY);
        let pump = Pump {
            root: self.root.clone(),
            rules,
            coalescer: Coalescer::new(&self.debounce),
            batch_tx,
        };

        self.pump = Some(tokio::spawn(pump.run(raw_rx)));
        self.inner = Some(watcher);

        info!(
            "Watching {} (delay: {:?}, recursive: {})",
            self.root.display(),
            self.debounce.delay(),
            self.config.recursive
        );

        Ok(batch_rx)
    }

    /// Stop watching
    ///
    /// Events already collected are still delivered as a final batch, after
    /// which the batch channel closes.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(watcher) = self.inner.take() {
            // Dropping the notify watcher closes the raw channel; the pump
            // flushes its open window and exits on its own.
            drop(watcher);
            self.pump.take();
            info!("Stopped watching {}", self.root.display());
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_some()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Moves raw notify events through ignore filtering and debouncing
struct Pump {
    root: PathBuf,
    rules: IgnoreRules,
    coalescer: Coalescer<WatchEvent>,
    batch_tx: mpsc::Sender<Vec<WatchEvent>>,
}

type RawEvent = notify::Result<notify::Event>;

impl Pump {
    async fn run(self, mut raw_rx: mpsc::UnboundedReceiver<RawEvent>) {
        // One pending handle per window; all handles of a window share a batch
        let mut windows: FuturesUnordered<Debounced<Batch<WatchEvent>>> = FuturesUnordered::new();
        let mut current_window = None;

        loop {
            tokio::select! {
                raw = raw_rx.recv() => match raw {
                    Some(Ok(event)) => {
                        for event in self.translate(&event) {
                            trace!(path = %event.path.display(), kind = ?event.kind, "fs event");
                            let pending = self.coalescer.push(event);
                            if pending.window_id() != current_window {
                                current_window = pending.window_id();
                                windows.push(pending);
                            }
                        }
                    }
                    Some(Err(e)) => warn!("File watcher error: {}", e),
                    None => break,
                },
                Some(batch) = windows.next(), if !windows.is_empty() => {
                    if !self.deliver(batch).await {
                        return;
                    }
                }
            }
        }

        // Watcher dropped: deliver what was collected so far
        self.coalescer.flush();
        while let Some(batch) = windows.next().await {
            if !self.deliver(batch).await {
                return;
            }
        }
        debug!("Watch pump for {} finished", self.root.display());
    }

    /// Send a window's coalesced batch downstream; `false` once nobody listens
    async fn deliver(&self, batch: Result<Batch<WatchEvent>, DebounceError>) -> bool {
        let batch = match batch {
            Ok(batch) => batch,
            Err(e) => {
                debug!("Dropped watch window: {}", e);
                return true;
            }
        };

        let events = coalesce_events(&batch);
        if events.is_empty() {
            return true;
        }

        debug!("Delivering batch of {} events ({} raw)", events.len(), batch.len());
        if self.batch_tx.send(events).await.is_err() {
            debug!("Batch receiver dropped, stopping watch pump");
            return false;
        }
        true
    }

    /// Map a notify event to root-relative watch events, minus ignored paths
    fn translate(&self, event: &notify::Event) -> Vec<WatchEvent> {
        let kind = match event_kind(&event.kind) {
            Some(kind) => kind,
            None => return Vec::new(),
        };

        event
            .paths
            .iter()
            .filter_map(|path| {
                let relative = path.strip_prefix(&self.root).unwrap_or(path);
                if relative.as_os_str().is_empty() || self.rules.should_ignore(relative) {
                    return None;
                }
                Some(WatchEvent {
                    path: relative.to_path_buf(),
                    kind,
                })
            })
            .collect()
    }
}

fn event_kind(kind: &notify::EventKind) -> Option<EventKind> {
    match kind {
        notify::EventKind::Create(_) => Some(EventKind::Create),
        notify::EventKind::Modify(ModifyKind::Name(_)) => Some(EventKind::Rename),
        notify::EventKind::Modify(_) => Some(EventKind::Modify),
        notify::EventKind::Remove(_) => Some(EventKind::Delete),
        notify::EventKind::Access(_) | notify::EventKind::Any | notify::EventKind::Other => None,
    }
}

/// Watch configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Watch subdirectories too (default: true)
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Ignore rules
    #[serde(default)]
    pub ignore: IgnoreConfig,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            recursive: true,
            ignore: IgnoreConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

/// File system event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchEvent {
    /// Path that changed, relative to the watch root
    pub path: PathBuf,
    /// Type of change
    pub kind: EventKind,
}

/// Type of file system event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// File created
    Create,
    /// File modified
    Modify,
    /// File deleted
    Delete,
    /// File renamed
    Rename,
}
