//! Delayed, cancellable deletes.
//!
//! Every requested delete gets its own slot keyed by entity id, so undo
//! windows on different rows run independently. A slot is claimed exactly
//! once under the slot mutex: either `cancel` removes it or the expiring
//! timer does, and only the timer's claim issues the backend delete.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

use super::{Entity, MutationIntent, Notice, ViewHandle};
use crate::cache::{ViewCache, OVERVIEW_PATH};
use crate::db::{DataStore, Query, Table};
use crate::errors::AppError;

/// An armed delete as reported to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArmedDelete {
    pub id: String,
    pub expires_at: DateTime<Utc>,
    pub remaining_ms: u64,
}

struct Slot {
    /// Distinguishes re-armed slots for the same id
    ticket: Uuid,
    deadline: Instant,
    expires_at: DateTime<Utc>,
    timer: JoinHandle<()>,
}

struct Inner<E> {
    table: Table,
    store: Arc<dyn DataStore>,
    view: ViewHandle<E>,
    cache: Arc<ViewCache>,
    window: Duration,
    slots: Mutex<HashMap<String, Slot>>,
}

pub struct DeleteController<E> {
    inner: Arc<Inner<E>>,
}

impl<E> Clone for DeleteController<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E: Entity> DeleteController<E> {
    pub fn new(
        table: Table,
        store: Arc<dyn DataStore>,
        view: ViewHandle<E>,
        cache: Arc<ViewCache>,
        window: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                table,
                store,
                view,
                cache,
                window,
                slots: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Arm a delete for `id`: the row is marked deleting and pending now and
    /// removed for real once the undo window passes without a cancel.
    pub async fn request_delete(&self, id: &str) -> Result<ArmedDelete, AppError> {
        let inner = &self.inner;
        // Marks the id pending; fails if it already is.
        inner.view.claim(id).await?;
        inner.view.mark_deleting(id)?;

        let armed = {
            let mut slots = inner.slots.lock();

            let ticket = Uuid::new_v4();
            let deadline = Instant::now() + inner.window;
            let expires_at = Utc::now()
                + chrono::Duration::from_std(inner.window)
                    .unwrap_or_else(|_| chrono::Duration::zero());
            let timer = tokio::spawn(expire(
                Arc::clone(inner),
                id.to_string(),
                ticket,
                deadline,
            ));
            slots.insert(
                id.to_string(),
                Slot {
                    ticket,
                    deadline,
                    expires_at,
                    timer,
                },
            );

            ArmedDelete {
                id: id.to_string(),
                expires_at,
                remaining_ms: inner.window.as_millis() as u64,
            }
        };

        tracing::info!(
            "Delete of {} {} armed, undo window {:?}",
            inner.table,
            id,
            inner.window
        );
        Ok(armed)
    }

    /// Disarm the slot for `id`. Returns `false` when nothing was armed for it,
    /// including when the window already passed.
    pub fn cancel(&self, id: &str) -> Result<bool, AppError> {
        let Some(slot) = self.inner.slots.lock().remove(id) else {
            return Ok(false);
        };
        slot.timer.abort();

        self.inner.view.unmark_deleting(id)?;
        self.inner.view.dispatch(MutationIntent::ClearPending { id: id.to_string() })?;
        tracing::info!("Delete of {} {} cancelled", self.inner.table, id);
        Ok(true)
    }

    #[cfg(test)]
    pub fn is_armed(&self, id: &str) -> bool {
        self.inner.slots.lock().contains_key(id)
    }

    /// Outstanding slots, soonest first.
    pub fn armed(&self) -> Vec<ArmedDelete> {
        let now = Instant::now();
        let slots = self.inner.slots.lock();
        let mut armed: Vec<(Instant, ArmedDelete)> = slots
            .iter()
            .map(|(id, slot)| {
                (
                    slot.deadline,
                    ArmedDelete {
                        id: id.clone(),
                        expires_at: slot.expires_at,
                        remaining_ms: slot.deadline.saturating_duration_since(now).as_millis()
                            as u64,
                    },
                )
            })
            .collect();
        armed.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        armed.into_iter().map(|(_, delete)| delete).collect()
    }
}

async fn expire<E: Entity>(inner: Arc<Inner<E>>, id: String, ticket: Uuid, deadline: Instant) {
    tokio::time::sleep_until(deadline).await;

    let claimed = {
        let mut slots = inner.slots.lock();
        let current = slots.get(&id).is_some_and(|slot| slot.ticket == ticket);
        if current {
            slots.remove(&id);
        }
        current
    };
    if claimed {
        inner.commit(&id).await;
    }
}

impl<E: Entity> Inner<E> {
    async fn commit(&self, id: &str) {
        let outcome = match self.store.delete(self.table, &Query::by_id(id)).await {
            Ok(affected) => {
                tracing::info!("Deleted {} {} ({} row(s))", self.table, id, affected);
                self.cache.revalidate_path(OVERVIEW_PATH);
                self.view
                    .dispatch(MutationIntent::Remove { id: id.to_string() })
                    .and_then(|_| self.view.unmark_deleting(id))
                    .and_then(|_| self.view.notify(Notice::success(format!("Deleted {}", id))))
            }
            Err(e) => {
                tracing::error!("Error deleting {} {}: {}", self.table, id, e);
                self.view
                    .unmark_deleting(id)
                    .and_then(|_| {
                        self.view
                            .dispatch(MutationIntent::ClearPending { id: id.to_string() })
                    })
                    .and_then(|_| {
                        self.view
                            .notify(Notice::error(format!("Could not delete {}: {}", id, e)))
                    })
            }
        };

        if let Err(e) = outcome {
            tracing::warn!("Could not update {} view after delete: {}", self.view.name(), e);
        }
    }
}
