//! Event coalescing
//!
//! Folds a window's raw events into at most one event per path.

use crate::{EventKind, WatchEvent};
use std::collections::HashMap;
use std::path::PathBuf;

/// Merge a batch of events into one net event per path
///
/// Paths keep the order they were first seen in. A path created and then
/// deleted within the batch disappears entirely.
pub fn coalesce_events(events: &[WatchEvent]) -> Vec<WatchEvent> {
    let mut order: Vec<(PathBuf, Option<EventKind>)> = Vec::new();
    let mut index: HashMap<PathBuf, usize> = HashMap::new();

    for event in events {
        match index.get(&event.path) {
            Some(&i) => {
                let slot = &mut order[i].1;
                *slot = merge(*slot, event.kind);
            }
            None => {
                index.insert(event.path.clone(), order.len());
                order.push((event.path.clone(), Some(event.kind)));
            }
        }
    }

    order
        .into_iter()
        .filter_map(|(path, kind)| kind.map(|kind| WatchEvent { path, kind }))
        .collect()
}

/// Net effect of `prev` followed by `next`; `None` means "no net change"
fn merge(prev: Option<EventKind>, next: EventKind) -> Option<EventKind> {
    use EventKind::*;

    match (prev, next) {
        (Some(Create), Delete) => None,
        (Some(Create), Modify | Rename) => Some(Create),
        (Some(Delete), Create) => Some(Modify),
        (_, next) => Some(next),
    }
}
