//! Product moderation board.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::commit;
use crate::cache::{ViewCache, OVERVIEW_PATH};
use crate::db::{fetch_typed, DataStore, Query, Record, Table};
use crate::errors::AppError;
use crate::models::{Product, ProductTab};
use crate::optimistic::{ArmedDelete, DeleteController, MutationIntent, Notice, ViewHandle};

/// A product row with its moderation flags.
#[derive(Debug, Clone, Serialize)]
pub struct ProductRow {
    #[serde(flatten)]
    pub product: Product,
    pub pending: bool,
    pub deleting: bool,
    pub is_new: bool,
}

/// Number of products under each tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TabCounts {
    pub all: usize,
    pub approved: usize,
    pub pending: usize,
    pub new: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductListing {
    pub tab: ProductTab,
    pub counts: TabCounts,
    pub rows: Vec<ProductRow>,
    /// Deletes that can still be undone
    pub undo: Vec<ArmedDelete>,
    pub notices: Vec<Notice>,
}

pub struct ProductBoard {
    store: Arc<dyn DataStore>,
    cache: Arc<ViewCache>,
    view: ViewHandle<Product>,
    deletes: DeleteController<Product>,
}

impl ProductBoard {
    pub async fn load(
        store: Arc<dyn DataStore>,
        cache: Arc<ViewCache>,
        undo_window: Duration,
    ) -> Result<Self, AppError> {
        let products: Vec<Product> = fetch_typed(
            store.as_ref(),
            Table::Products,
            &Query::new().order("created_at", false),
        )
        .await?;
        tracing::info!("Loaded {} products", products.len());

        let view = ViewHandle::mount("products", products);
        let deletes = DeleteController::new(
            Table::Products,
            store.clone(),
            view.clone(),
            cache.clone(),
            undo_window,
        );

        Ok(Self {
            store,
            cache,
            view,
            deletes,
        })
    }

    #[cfg(test)]
    pub fn view(&self) -> &ViewHandle<Product> {
        &self.view
    }

    pub async fn toggle_approval(&self, id: &str, approved: bool) -> Result<Product, AppError> {
        let before = self.view.claim(id).await?;
        let after = Product {
            approved,
            ..before.clone()
        };

        let mut patch = Record::new();
        patch.insert("approved".into(), Value::Bool(approved));
        let query = Query::by_id(id);
        let action = if approved { "Approved" } else { "Unapproved" };

        commit(
            &self.view,
            &self.cache,
            before,
            after,
            action,
            self.store.update(Table::Products, &query, &patch),
        )
        .await
    }

    /// Approve every product the store still lists as unapproved.
    pub async fn approve_all_pending(&self) -> Result<Vec<String>, AppError> {
        let rows = self
            .store
            .fetch(Table::Products, &Query::new().eq("approved", false))
            .await?;
        let ids: BTreeSet<String> = rows
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut patch = Record::new();
        patch.insert("approved".into(), Value::Bool(true));
        let query = Query::new().is_in("id", ids.iter().cloned());

        match self.store.update(Table::Products, &query, &patch).await {
            Ok(affected) => {
                tracing::info!("Approved {} pending product(s)", affected);
                self.view.dispatch(MutationIntent::BulkApprove { ids: ids.clone() })?;
                self.cache.revalidate_path(OVERVIEW_PATH);
                self.view
                    .notify(Notice::success(format!("Approved {} products", ids.len())))?;
                Ok(ids.into_iter().collect())
            }
            Err(e) => {
                tracing::error!("Bulk approval failed: {}", e);
                self.view
                    .notify(Notice::error(format!("Could not approve products: {}", e.message())))?;
                Err(e)
            }
        }
    }

    pub async fn request_delete(&self, id: &str) -> Result<ArmedDelete, AppError> {
        self.deletes.request_delete(id).await
    }

    /// Undo an armed delete. Returns `false` if none was armed for `id`.
    pub fn cancel_delete(&self, id: &str) -> Result<bool, AppError> {
        self.deletes.cancel(id)
    }

    pub async fn listing(
        &self,
        tab: ProductTab,
        now: DateTime<Utc>,
    ) -> Result<ProductListing, AppError> {
        let snapshot = self.view.snapshot().await?;

        let mut counts = TabCounts::default();
        let mut rows = Vec::new();
        for product in snapshot.state.entities {
            let is_new = product.is_new(now);
            counts.all += 1;
            if product.approved {
                counts.approved += 1;
            } else {
                counts.pending += 1;
            }
            if is_new {
                counts.new += 1;
            }

            if tab.includes(&product, now) {
                rows.push(ProductRow {
                    pending: snapshot.state.pending.contains(&product.id),
                    deleting: snapshot.deleting.contains(&product.id),
                    is_new,
                    product,
                });
            }
        }

        Ok(ProductListing {
            tab,
            counts,
            rows,
            undo: self.deletes.armed(),
            notices: snapshot.notices,
        })
    }
}
