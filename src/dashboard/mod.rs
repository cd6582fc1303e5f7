//! Dashboard boards: each owns a view actor and turns admin actions into
//! optimistic intents plus store writes.

mod overview;
mod products;
mod taxonomy;
mod users;

pub use overview::*;
pub use products::*;
pub use taxonomy::*;
pub use users::*;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::cache::{ViewCache, OVERVIEW_PATH};
use crate::db::DataStore;
use crate::errors::AppError;
use crate::models::Overview;
use crate::optimistic::{Entity, MutationIntent, Notice, ViewHandle, ViewSnapshot};

/// Every board of the admin dashboard, mounted once per process.
pub struct Dashboard {
    store: Arc<dyn DataStore>,
    cache: Arc<ViewCache>,
    pub products: ProductBoard,
    pub taxonomy: TaxonomyBoard,
    pub users: UserBoard,
}

impl Dashboard {
    /// Load every view from the store and start its actor.
    pub async fn mount(
        store: Arc<dyn DataStore>,
        cache: Arc<ViewCache>,
        undo_window: Duration,
    ) -> Result<Self, AppError> {
        let products = ProductBoard::load(store.clone(), cache.clone(), undo_window).await?;
        let taxonomy = TaxonomyBoard::load(store.clone(), cache.clone()).await?;
        let users = UserBoard::load(store.clone(), cache.clone()).await?;

        Ok(Self {
            store,
            cache,
            products,
            taxonomy,
            users,
        })
    }

    pub async fn overview(&self) -> Result<Overview, AppError> {
        load_overview(self.store.as_ref(), &self.cache).await
    }
}

/// An entity together with its lock state, as listed to clients.
#[derive(Debug, Clone, Serialize)]
pub struct Row<E> {
    #[serde(flatten)]
    pub entity: E,
    pub pending: bool,
}

/// Entities of one view in server order, plus its recent notices.
#[derive(Debug, Clone, Serialize)]
pub struct Listing<E> {
    pub rows: Vec<Row<E>>,
    pub notices: Vec<Notice>,
}

impl<E: Entity> From<ViewSnapshot<E>> for Listing<E> {
    fn from(snapshot: ViewSnapshot<E>) -> Self {
        let pending = snapshot.state.pending;
        Self {
            rows: snapshot
                .state
                .entities
                .into_iter()
                .map(|entity| Row {
                    pending: pending.contains(entity.id()),
                    entity,
                })
                .collect(),
            notices: snapshot.notices,
        }
    }
}

/// Resolve a claimed mutation: swap in `after`, run the store write, then
/// confirm or roll back to `before`.
///
/// The caller must have claimed `before`'s id on `view`.
async fn commit<E, W>(
    view: &ViewHandle<E>,
    cache: &ViewCache,
    before: E,
    after: E,
    action: &str,
    write: W,
) -> Result<E, AppError>
where
    E: Entity,
    W: Future<Output = Result<u64, AppError>>,
{
    let id = before.id().to_string();
    view.dispatch(MutationIntent::Replace {
        entity: after.clone(),
        pending: id.clone(),
    })?;

    match write.await {
        Ok(affected) => {
            tracing::info!("{} {} {} ({} row(s))", action, view.name(), id, affected);
            view.dispatch(MutationIntent::ClearPending { id: id.clone() })?;
            cache.revalidate_path(OVERVIEW_PATH);
            view.notify(Notice::success(format!("{} {}", action, id)))?;
            Ok(after)
        }
        Err(e) => {
            tracing::error!("{} {} {} failed: {}", action, view.name(), id, e);
            view.dispatch(MutationIntent::Rollback { snapshot: before })?;
            view.notify(Notice::error(format!("Could not update {}: {}", id, e.message())))?;
            Err(e)
        }
    }
}

/// Release a claim that ended before anything was written.
fn release<E: Entity>(view: &ViewHandle<E>, id: &str) -> Result<(), AppError> {
    view.dispatch(MutationIntent::ClearPending { id: id.to_string() })
}
