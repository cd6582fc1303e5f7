//! Filter (taxonomy) API endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{success, ApiResult};
use crate::dashboard::TaxonomyListing;
use crate::models::{TaxonomyEditRequest, TaxonomyItem, TaxonomyKind};
use crate::auth::Identity;
use crate::AppState;

/// GET /api/admin/filters - Categories, labels and tags.
pub async fn list_filters(State(state): State<AppState>) -> ApiResult<TaxonomyListing> {
    success(state.dashboard.taxonomy.listing().await?)
}

/// PUT /api/admin/filters/:kind/:id - Rename a filter item.
pub async fn update_filter(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path((kind, id)): Path<(String, String)>,
    Json(request): Json<TaxonomyEditRequest>,
) -> ApiResult<TaxonomyItem> {
    let kind: TaxonomyKind = kind.parse()?;
    tracing::info!("{} editing {} {}", admin.user_id, kind.as_str(), id);
    success(
        state
            .dashboard
            .taxonomy
            .update_item(kind, &id, &request)
            .await?,
    )
}
