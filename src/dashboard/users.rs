//! User management board.

use std::sync::Arc;

use super::{commit, Listing};
use crate::cache::ViewCache;
use crate::db::{fetch_typed, DataStore, Query, Table};
use crate::errors::AppError;
use crate::models::{UserEdit, UserRecord};
use crate::optimistic::ViewHandle;

pub struct UserBoard {
    store: Arc<dyn DataStore>,
    cache: Arc<ViewCache>,
    view: ViewHandle<UserRecord>,
}

impl UserBoard {
    pub async fn load(store: Arc<dyn DataStore>, cache: Arc<ViewCache>) -> Result<Self, AppError> {
        let users: Vec<UserRecord> = fetch_typed(
            store.as_ref(),
            Table::Users,
            &Query::new().order("created_at", false),
        )
        .await?;
        tracing::info!("Loaded {} users", users.len());

        Ok(Self {
            store,
            cache,
            view: ViewHandle::mount("users", users),
        })
    }

    /// Validate and save a user edit. Malformed input is rejected before the
    /// user is locked or anything is dispatched.
    pub async fn edit_user(&self, id: &str, edit: &UserEdit) -> Result<UserRecord, AppError> {
        let patch = edit.validate()?;
        let before = self.view.claim(id).await?;
        let after = patch.apply_to(&before);
        let record = patch.to_record();
        let query = Query::by_id(id);

        commit(
            &self.view,
            &self.cache,
            before,
            after,
            "Updated",
            self.store.update(Table::Users, &query, &record),
        )
        .await
    }

    pub async fn listing(&self) -> Result<Listing<UserRecord>, AppError> {
        Ok(self.view.snapshot().await?.into())
    }
}
