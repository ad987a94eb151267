//! Per-key debouncing
//!
//! Each key (typically a path) gets its own independent window, so a burst
//! on one key never delays or replaces work queued for another.

use crate::config::DebounceConfig;
use crate::debouncer::{Debounced, Debouncer};
use dashmap::DashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// A set of debouncers sharing one config, one per key
pub struct KeyedDebouncer<K, T>
where
    K: Eq + Hash,
{
    config: DebounceConfig,
    debouncers: DashMap<K, Debouncer<T>>,
    disposed: AtomicBool,
}

impl<K, T> KeyedDebouncer<K, T>
where
    K: Eq + Hash + Clone,
    T: Clone + Send + 'static,
{
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            debouncers: DashMap::new(),
            disposed: AtomicBool::new(false),
        }
    }

    /// Submit an async task to the window of `key`
    pub fn submit<F, Fut>(&self, key: K, task: F) -> Debounced<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
    {
        if self.is_disposed() {
            // A throwaway disposed debouncer yields the same Disposed outcome
            let rejected = Debouncer::from_config(&self.config);
            rejected.dispose();
            return rejected.submit(task);
        }

        let debouncer = self
            .debouncers
            .entry(key)
            .or_insert_with(|| Debouncer::from_config(&self.config));

        // dispose() may have swept the map before this entry was inserted;
        // it cannot sweep past it while the entry guard is held
        if self.is_disposed() {
            debouncer.dispose();
        }
        debouncer.submit(task)
    }

    /// Submit a synchronous task to the window of `key`
    pub fn submit_sync<F>(&self, key: K, task: F) -> Debounced<T>
    where
        F: FnOnce() -> T + Send + 'static,
    {
        self.submit(key, move || std::future::ready(task()))
    }

    /// Fire the window of `key` now
    pub fn flush(&self, key: &K) -> bool {
        self.debouncers.get(key).map(|d| d.flush()).unwrap_or(false)
    }

    /// Fire every pending window now, returning how many fired
    pub fn flush_all(&self) -> usize {
        self.debouncers.iter().filter(|d| d.flush()).count()
    }

    /// Keys with an armed window
    pub fn pending_keys(&self) -> Vec<K> {
        self.debouncers
            .iter()
            .filter(|entry| entry.value().is_pending())
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Drop debouncers whose window is not armed, returning how many went
    pub fn prune(&self) -> usize {
        let before = self.debouncers.len();
        self.debouncers.retain(|_, debouncer| debouncer.is_pending());
        let pruned = before.saturating_sub(self.debouncers.len());
        if pruned > 0 {
            debug!(pruned, remaining = self.debouncers.len(), "pruned idle debouncers");
        }
        pruned
    }
}

impl<K, T> KeyedDebouncer<K, T>
where
    K: Eq + Hash,
{
    /// Cancel the window of `key`
    pub fn cancel(&self, key: &K) -> bool {
        self.debouncers.get(key).map(|d| d.cancel()).unwrap_or(false)
    }

    /// Cancel every pending window, returning how many were cancelled
    pub fn cancel_all(&self) -> usize {
        self.debouncers.iter().filter(|d| d.cancel()).count()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.debouncers
            .get(key)
            .map(|d| d.is_pending())
            .unwrap_or(false)
    }

    /// Number of tracked keys, armed or idle
    pub fn len(&self) -> usize {
        self.debouncers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.debouncers.is_empty()
    }

    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Dispose every per-key debouncer and refuse later submissions
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        for entry in self.debouncers.iter() {
            entry.value().dispose();
        }
        self.debouncers.clear();
    }
}

impl<K, T> Drop for KeyedDebouncer<K, T>
where
    K: Eq + Hash,
{
    fn drop(&mut self) {
        self.dispose();
    }
}
