//! Filter board: categories, labels and tags.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::{commit, release, Listing};
use crate::cache::ViewCache;
use crate::db::{fetch_typed, DataStore, Query, Record};
use crate::errors::AppError;
use crate::models::{TaxonomyEditRequest, TaxonomyItem, TaxonomyKind};
use crate::optimistic::ViewHandle;

#[derive(Debug, Clone, Serialize)]
pub struct TaxonomyListing {
    pub categories: Listing<TaxonomyItem>,
    pub labels: Listing<TaxonomyItem>,
    pub tags: Listing<TaxonomyItem>,
}

pub struct TaxonomyBoard {
    store: Arc<dyn DataStore>,
    cache: Arc<ViewCache>,
    categories: ViewHandle<TaxonomyItem>,
    labels: ViewHandle<TaxonomyItem>,
    tags: ViewHandle<TaxonomyItem>,
}

impl TaxonomyBoard {
    pub async fn load(store: Arc<dyn DataStore>, cache: Arc<ViewCache>) -> Result<Self, AppError> {
        let categories = mount(store.as_ref(), TaxonomyKind::Category, "categories").await?;
        let labels = mount(store.as_ref(), TaxonomyKind::Label, "labels").await?;
        let tags = mount(store.as_ref(), TaxonomyKind::Tag, "tags").await?;

        Ok(Self {
            store,
            cache,
            categories,
            labels,
            tags,
        })
    }

    pub fn view(&self, kind: TaxonomyKind) -> &ViewHandle<TaxonomyItem> {
        match kind {
            TaxonomyKind::Category => &self.categories,
            TaxonomyKind::Label => &self.labels,
            TaxonomyKind::Tag => &self.tags,
        }
    }

    /// Rename an item (and set a category's icon).
    pub async fn update_item(
        &self,
        kind: TaxonomyKind,
        id: &str,
        edit: &TaxonomyEditRequest,
    ) -> Result<TaxonomyItem, AppError> {
        let view = self.view(kind);
        let before = view.claim(id).await?;
        let after = match edit.apply_to(kind, &before) {
            Ok(item) => item,
            Err(e) => {
                release(view, id)?;
                return Err(e.into());
            }
        };

        let mut patch = Record::new();
        patch.insert("name".into(), Value::String(after.name.clone()));
        if kind.has_icon() {
            patch.insert(
                "icon".into(),
                after.icon.clone().map(Value::String).unwrap_or(Value::Null),
            );
        }
        let query = Query::by_id(id);

        commit(
            view,
            &self.cache,
            before,
            after,
            "Updated",
            self.store.update(kind.table(), &query, &patch),
        )
        .await
    }

    pub async fn listing(&self) -> Result<TaxonomyListing, AppError> {
        Ok(TaxonomyListing {
            categories: self.categories.snapshot().await?.into(),
            labels: self.labels.snapshot().await?.into(),
            tags: self.tags.snapshot().await?.into(),
        })
    }
}

async fn mount(
    store: &dyn DataStore,
    kind: TaxonomyKind,
    name: &'static str,
) -> Result<ViewHandle<TaxonomyItem>, AppError> {
    let items: Vec<TaxonomyItem> =
        fetch_typed(store, kind.table(), &Query::new().order("name", true)).await?;
    tracing::info!("Loaded {} {}", items.len(), name);
    Ok(ViewHandle::mount(name, items))
}
