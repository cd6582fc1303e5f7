//! Overview metrics, cached at the overview view path.

use crate::cache::{ViewCache, OVERVIEW_PATH};
use crate::db::DataStore;
use crate::errors::AppError;
use crate::models::{MetricPoint, Overview};

/// Fetch the five metric series concurrently. A failed series is logged and
/// left empty; the result is cached only when every series loaded and no
/// mutation revalidated the overview while it was being computed.
pub async fn load_overview(store: &dyn DataStore, cache: &ViewCache) -> Result<Overview, AppError> {
    if let Some(cached) = cache.get_fresh(OVERVIEW_PATH) {
        return Ok(serde_json::from_value(cached)?);
    }
    let generation = cache.generation(OVERVIEW_PATH);

    let (users, products, categories, labels, tags) = tokio::join!(
        series(store, "get_user_metrics"),
        series(store, "get_product_metrics"),
        series(store, "get_category_metrics"),
        series(store, "get_label_metrics"),
        series(store, "get_tag_metrics"),
    );
    let complete = [&users, &products, &categories, &labels, &tags]
        .iter()
        .all(|s| s.is_some());

    let overview = Overview {
        users: users.unwrap_or_default(),
        products: products.unwrap_or_default(),
        categories: categories.unwrap_or_default(),
        labels: labels.unwrap_or_default(),
        tags: tags.unwrap_or_default(),
    };
    if complete {
        cache.store(OVERVIEW_PATH, generation, serde_json::to_value(&overview)?);
    }
    Ok(overview)
}

async fn series(store: &dyn DataStore, procedure: &str) -> Option<Vec<MetricPoint>> {
    match store.rpc(procedure).await {
        Ok(points) => Some(points),
        Err(e) => {
            tracing::warn!("Metric procedure {} failed: {}", procedure, e);
            None
        }
    }
}
