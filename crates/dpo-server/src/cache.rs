//! Age and size bounds for in-memory plan storage.

use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

pub trait Expiring {
    fn stored_at(&self) -> Instant;
}

/// Drop entries older than `max_age`, then the oldest until at most
/// `max_entries` remain. Returns how many entries were removed.
pub fn prune_expiring<K, V>(store: &DashMap<K, V>, max_entries: usize, max_age: Duration) -> usize
where
    K: Clone + Eq + Hash,
    V: Expiring,
{
    let now = Instant::now();
    let before = store.len();
    store.retain(|_, value| now.duration_since(value.stored_at()) <= max_age);

    if store.len() > max_entries {
        let mut entries: Vec<(K, Instant)> = store
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().stored_at()))
            .collect();
        entries.sort_by_key(|(_, stored_at)| *stored_at);
        let excess = entries.len().saturating_sub(max_entries);
        for (key, _) in entries.into_iter().take(excess) {
            store.remove(&key);
        }
    }
    before.saturating_sub(store.len())
}
