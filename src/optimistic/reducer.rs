//! Pure optimistic-state reducer.
//!
//! `apply` maps (visible state, intent) to the next visible state. It never
//! fails and never reads anything but its arguments, so a recorded sequence of
//! intents replays to the same state.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A row-like record shown and mutated through the dashboard.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Immutable identifier, unique within a view.
    fn id(&self) -> &str;

    /// Mark the entity approved. Entities without an approval flag ignore this.
    fn approve(&mut self) {}
}

/// Entities in server order plus the ids with an unresolved mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisibleState<E> {
    pub entities: Vec<E>,
    pub pending: BTreeSet<String>,
}

/// A desired state change, consumed by the reducer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationIntent<E> {
    /// Swap in `entity` for the entity with the same id and mark `pending`.
    Replace { entity: E, pending: String },
    /// The mutation on `id` resolved.
    ClearPending { id: String },
    /// The entity is gone for good.
    Remove { id: String },
    /// Approve every entity whose id is listed.
    BulkApprove { ids: BTreeSet<String> },
    /// Restore the pre-mutation snapshot after a failed backend call.
    Rollback { snapshot: E },
}

impl<E: Entity> VisibleState<E> {
    pub fn new(entities: Vec<E>) -> Self {
        Self {
            entities,
            pending: BTreeSet::new(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.entities.iter().find(|e| e.id() == id)
    }

    #[cfg(test)]
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Whether `id` is locked by an outstanding mutation.
    pub fn is_pending(&self, id: &str) -> bool {
        self.pending.contains(id)
    }

    /// Apply one intent. Unknown ids leave the sequence untouched while
    /// pending-set edits still take effect.
    pub fn apply(mut self, intent: MutationIntent<E>) -> Self {
        match intent {
            MutationIntent::Replace { entity, pending } => {
                replace(&mut self.entities, entity);
                self.pending.insert(pending);
            }
            MutationIntent::ClearPending { id } => {
                self.pending.remove(&id);
            }
            MutationIntent::Remove { id } => {
                self.entities.retain(|e| e.id() != id);
                self.pending.remove(&id);
            }
            MutationIntent::BulkApprove { ids } => {
                for entity in self.entities.iter_mut() {
                    if ids.contains(entity.id()) {
                        entity.approve();
                    }
                }
            }
            MutationIntent::Rollback { snapshot } => {
                let id = snapshot.id().to_string();
                replace(&mut self.entities, snapshot);
                self.pending.remove(&id);
            }
        }
        self
    }
}

impl<E> Default for VisibleState<E> {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            pending: BTreeSet::new(),
        }
    }
}

fn replace<E: Entity>(entities: &mut [E], entity: E) {
    if let Some(slot) = entities.iter_mut().find(|e| e.id() == entity.id()) {
        *slot = entity;
    }
}
