//! Cached view payloads with path-based invalidation.
//!
//! Every path carries a generation that each revalidation bumps, whether or
//! not a payload is cached yet. A payload is fresh only while its generation
//! matches the path's, and a computation started before a revalidation can
//! never be stored as fresh.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::Value;

/// View path of the overview page.
pub const OVERVIEW_PATH: &str = "/admin";

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    generation: u64,
    computed_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct PathSlot {
    generation: u64,
    entry: Option<CacheEntry>,
}

impl PathSlot {
    fn fresh(&self) -> Option<&CacheEntry> {
        self.entry
            .as_ref()
            .filter(|entry| entry.generation == self.generation)
    }
}

#[derive(Debug, Default)]
pub struct ViewCache {
    slots: RwLock<HashMap<String, PathSlot>>,
}

impl ViewCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the cached output for `path` stale, including any computation of
    /// it still in flight.
    pub fn revalidate_path(&self, path: &str) {
        let mut slots = self.slots.write();
        let slot = slots.entry(path.to_string()).or_default();
        slot.generation += 1;
        match &slot.entry {
            Some(entry) => tracing::debug!(
                "Revalidating {} (computed at {})",
                path,
                entry.computed_at.to_rfc3339()
            ),
            None => tracing::debug!("Revalidating {} (nothing cached)", path),
        }
    }

    /// Cached payload for `path`, if present and fresh.
    pub fn get_fresh(&self, path: &str) -> Option<Value> {
        self.slots
            .read()
            .get(path)
            .and_then(PathSlot::fresh)
            .map(|entry| entry.value.clone())
    }

    /// Current generation of `path`. Read it before computing a payload and
    /// hand it back to [`ViewCache::store`].
    pub fn generation(&self, path: &str) -> u64 {
        self.slots
            .read()
            .get(path)
            .map(|slot| slot.generation)
            .unwrap_or(0)
    }

    /// Store `value` as computed at `generation`. Returns `false`, leaving the
    /// path stale, when a revalidation landed since that generation was read.
    pub fn store(&self, path: &str, generation: u64, value: Value) -> bool {
        let mut slots = self.slots.write();
        let slot = slots.entry(path.to_string()).or_default();
        if slot.generation != generation {
            tracing::debug!(
                "Discarding {} computed at generation {} (now {})",
                path,
                generation,
                slot.generation
            );
            return false;
        }
        slot.entry = Some(CacheEntry {
            value,
            generation,
            computed_at: Utc::now(),
        });
        true
    }

    #[cfg(test)]
    pub fn is_stale(&self, path: &str) -> bool {
        self.get_fresh(path).is_none()
    }
}
