//! Batch every item pushed during a debounce window
//!
//! Where a [`Debouncer`] keeps only the latest task, a [`Coalescer`] keeps
//! every item and hands the whole batch to all pushers of the window.

use crate::config::DebounceConfig;
use crate::debouncer::{Debounced, Debouncer};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Items collected during one window, in push order
pub type Batch<I> = Arc<Vec<I>>;

/// Collects items into per-window batches
///
/// Items are filed under the window they joined, so an item pushed while an
/// earlier window is being drained lands in the next batch.
pub struct Coalescer<I> {
    debouncer: Debouncer<Batch<I>>,
    buffers: Arc<Mutex<BTreeMap<u64, Vec<I>>>>,
}

impl<I> Coalescer<I>
where
    I: Send + Sync + 'static,
{
    pub fn new(config: &DebounceConfig) -> Self {
        Self {
            debouncer: Debouncer::from_config(config),
            buffers: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Add an item to the open window (opening one if needed)
    ///
    /// Resolves to the window's full batch once it fires.
    pub fn push(&self, item: I) -> Debounced<Batch<I>> {
        let buffers = Arc::clone(&self.buffers);

        self.debouncer.submit_windowed(move |window| {
            buffers.lock().entry(window).or_default().push(item);
            move || {
                let batch = buffers.lock().remove(&window).unwrap_or_default();
                std::future::ready(Arc::new(batch))
            }
        })
    }

    /// Fire the open window now
    pub fn flush(&self) -> bool {
        self.debouncer.flush()
    }

    /// Discard the open window and everything buffered in it
    pub fn cancel(&self) -> bool {
        match self.debouncer.cancel_window() {
            Some(window) => {
                self.buffers.lock().remove(&window);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Items waiting in windows that have not been drained yet
    pub fn buffered(&self) -> usize {
        self.buffers.lock().values().map(Vec::len).sum()
    }

    /// Cancel the open window and refuse further pushes
    ///
    /// Batches of windows that already fired are still delivered.
    pub fn dispose(&self) {
        if let Some(window) = self.debouncer.dispose_window() {
            self.buffers.lock().remove(&window);
        }
    }

    pub fn config(&self) -> &DebounceConfig {
        self.debouncer.config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DebounceError;
    use std::time::Duration;

    fn coalescer() -> Coalescer<&'static str> {
        Coalescer::new(&DebounceConfig::new(Duration::from_millis(100)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_batch_keeps_every_item_in_order() {
        let coalescer = coalescer();

        let first = coalescer.push("a");
        tokio::time::sleep(Duration::from_millis(40)).await;
        let second = coalescer.push("b");
        let third = coalescer.push("c");
        assert_eq!(coalescer.buffered(), 3);

        let batch = first.await.unwrap();
        assert_eq!(*batch, vec!["a", "b", "c"]);
        assert!(Arc::ptr_eq(&batch, &second.await.unwrap()));
        assert!(Arc::ptr_eq(&batch, &third.await.unwrap()));
        assert_eq!(coalescer.buffered(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_windows_produce_separate_batches() {
        let coalescer = coalescer();

        let first = coalescer.push("a");
        assert_eq!(*first.await.unwrap(), vec!["a"]);

        let second = coalescer.push("b");
        assert_eq!(*second.await.unwrap(), vec!["b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_discards_buffered_items() {
        let coalescer = coalescer();

        let dropped = coalescer.push("a");
        assert!(coalescer.cancel());
        assert!(!coalescer.cancel());
        assert_eq!(coalescer.buffered(), 0);
        assert_eq!(dropped.await, Err(DebounceError::Cancelled));

        let kept = coalescer.push("b");
        assert_eq!(*kept.await.unwrap(), vec!["b"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_and_dispose() {
        let coalescer = coalescer();

        let flushed = coalescer.push("a");
        assert!(coalescer.flush());
        assert_eq!(*flushed.await.unwrap(), vec!["a"]);

        let pending = coalescer.push("b");
        coalescer.dispose();
        assert_eq!(pending.await, Err(DebounceError::Cancelled));
        assert_eq!(coalescer.push("c").await, Err(DebounceError::Disposed));
        assert_eq!(coalescer.buffered(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_keeps_flushed_batch() {
        let coalescer = coalescer();

        let a = coalescer.push("a");
        let b = coalescer.push("b");
        assert!(coalescer.flush());
        coalescer.dispose();

        let batch = a.await.unwrap();
        assert_eq!(*batch, vec!["a", "b"]);
        assert!(Arc::ptr_eq(&batch, &b.await.unwrap()));
        assert_eq!(coalescer.buffered(), 0);
        assert_eq!(coalescer.push("c").await, Err(DebounceError::Disposed));
    }
}
