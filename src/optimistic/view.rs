//! Single-writer view actor.
//!
//! The actor task owns a [`VisibleState`] and is the only place it changes.
//! Handles send commands over an unbounded channel, so intents apply in the
//! order they were dispatched.

use std::collections::{BTreeSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use super::{Entity, MutationIntent, VisibleState};
use crate::errors::AppError;

/// Number of notices kept per view.
const MAX_NOTICES: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient success/failure notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
            at: Utc::now(),
        }
    }
}

/// Consistent copy of everything a view renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot<E> {
    pub state: VisibleState<E>,
    /// UI-only highlight for rows counting down to deletion
    pub deleting: BTreeSet<String>,
    /// Newest last
    pub notices: Vec<Notice>,
}

enum Command<E> {
    Dispatch(MutationIntent<E>),
    SetDeleting { id: String, deleting: bool },
    Notify(Notice),
    Claim {
        id: String,
        reply: oneshot::Sender<Result<E, AppError>>,
    },
    Snapshot(oneshot::Sender<ViewSnapshot<E>>),
}

/// Cloneable handle to a view actor.
pub struct ViewHandle<E> {
    name: &'static str,
    tx: mpsc::UnboundedSender<Command<E>>,
}

impl<E> Clone for ViewHandle<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            tx: self.tx.clone(),
        }
    }
}

impl<E: Entity> ViewHandle<E> {
    /// Spawn the actor with the entities loaded at mount time.
    pub fn mount(name: &'static str, entities: Vec<E>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tracing::debug!("Mounting {} view with {} entities", name, entities.len());
        tokio::spawn(run(name, VisibleState::new(entities), rx));
        Self { name, tx }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn dispatch(&self, intent: MutationIntent<E>) -> Result<(), AppError> {
        self.send(Command::Dispatch(intent))
    }

    pub fn mark_deleting(&self, id: &str) -> Result<(), AppError> {
        self.send(Command::SetDeleting {
            id: id.to_string(),
            deleting: true,
        })
    }

    pub fn unmark_deleting(&self, id: &str) -> Result<(), AppError> {
        self.send(Command::SetDeleting {
            id: id.to_string(),
            deleting: false,
        })
    }

    pub fn notify(&self, notice: Notice) -> Result<(), AppError> {
        self.send(Command::Notify(notice))
    }

    /// Lock `id` for a mutation and return its current value.
    ///
    /// The pending check and the pending mark happen in one actor step, so two
    /// callers can never both claim the same id.
    pub async fn claim(&self, id: &str) -> Result<E, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Claim {
            id: id.to_string(),
            reply,
        })?;
        rx.await.map_err(|_| self.closed())?
    }

    /// Snapshot reflecting every command sent before this call.
    pub async fn snapshot(&self) -> Result<ViewSnapshot<E>, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        rx.await.map_err(|_| self.closed())
    }

    fn send(&self, command: Command<E>) -> Result<(), AppError> {
        self.tx.send(command).map_err(|_| self.closed())
    }

    fn closed(&self) -> AppError {
        AppError::Internal(format!("{} view is no longer running", self.name))
    }
}

async fn run<E: Entity>(
    name: &'static str,
    mut state: VisibleState<E>,
    mut rx: mpsc::UnboundedReceiver<Command<E>>,
) {
    let mut deleting = BTreeSet::new();
    let mut notices = VecDeque::with_capacity(MAX_NOTICES);

    while let Some(command) = rx.recv().await {
        match command {
            Command::Dispatch(intent) => {
                state = state.apply(intent);
            }
            Command::SetDeleting { id, deleting: true } => {
                deleting.insert(id);
            }
            Command::SetDeleting {
                id,
                deleting: false,
            } => {
                deleting.remove(&id);
            }
            Command::Notify(notice) => {
                if notices.len() == MAX_NOTICES {
                    notices.pop_front();
                }
                notices.push_back(notice);
            }
            Command::Claim { id, reply } => {
                let claimed = match state.get(&id).cloned() {
                    None => Err(AppError::NotFound(format!("{} {} not found", name, id))),
                    Some(_) if state.is_pending(&id) => Err(AppError::Conflict(format!(
                        "{} {} has a pending mutation",
                        name, id
                    ))),
                    Some(entity) => {
                        state = state.apply(MutationIntent::Replace {
                            entity: entity.clone(),
                            pending: id,
                        });
                        Ok(entity)
                    }
                };
                let _ = reply.send(claimed);
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(ViewSnapshot {
                    state: state.clone(),
                    deleting: deleting.clone(),
                    notices: notices.iter().cloned().collect(),
                });
            }
        }
    }

    tracing::debug!("{} view stopped", name);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaxonomyItem;

    fn item(id: &str, name: &str) -> TaxonomyItem {
        TaxonomyItem {
            id: id.to_string(),
            name: name.to_string(),
            icon: None,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn test_commands_apply_in_dispatch_order() {
        let view = ViewHandle::mount("tags", vec![item("t1", "rust"), item("t2", "go")]);

        view.dispatch(MutationIntent::Replace {
            entity: item("t1", "rustlang"),
            pending: "t1".to_string(),
        })
        .unwrap();
        view.dispatch(MutationIntent::ClearPending {
            id: "t1".to_string(),
        })
        .unwrap();
        view.dispatch(MutationIntent::Remove {
            id: "t2".to_string(),
        })
        .unwrap();

        let snapshot = view.snapshot().await.unwrap();
        assert_eq!(snapshot.state.entities, vec![item("t1", "rustlang")]);
        assert!(snapshot.state.pending.is_empty());
    }

    #[tokio::test]
    async fn test_deleting_set_is_separate_from_pending() {
        let view = ViewHandle::mount("tags", vec![item("t1", "rust")]);

        view.mark_deleting("t1").unwrap();
        let snapshot = view.snapshot().await.unwrap();
        assert!(snapshot.deleting.contains("t1"));
        assert!(!snapshot.state.is_pending("t1"));

        view.unmark_deleting("t1").unwrap();
        assert!(view.snapshot().await.unwrap().deleting.is_empty());
    }

    #[tokio::test]
    async fn test_claim_locks_until_cleared() {
        let view = ViewHandle::mount("tags", vec![item("t1", "rust")]);

        assert_eq!(view.claim("t1").await.unwrap(), item("t1", "rust"));
        assert!(view.snapshot().await.unwrap().state.is_pending("t1"));
        assert!(matches!(
            view.claim("t1").await.unwrap_err(),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            view.claim("t9").await.unwrap_err(),
            AppError::NotFound(_)
        ));

        view.dispatch(MutationIntent::ClearPending {
            id: "t1".to_string(),
        })
        .unwrap();
        assert!(view.claim("t1").await.is_ok());
    }

    #[tokio::test]
    async fn test_notices_are_bounded() {
        let view = ViewHandle::<TaxonomyItem>::mount("tags", Vec::new());
        for i in 0..(MAX_NOTICES + 5) {
            view.notify(Notice::success(format!("saved {}", i))).unwrap();
        }

        let notices = view.snapshot().await.unwrap().notices;
        assert_eq!(notices.len(), MAX_NOTICES);
        assert_eq!(notices[0].message, "saved 5");
        assert_eq!(notices.last().unwrap().message, format!("saved {}", MAX_NOTICES + 4));
    }
}
