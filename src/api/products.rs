//! Product moderation API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{success, ApiResponse, ApiResult};
use crate::dashboard::ProductListing;
use crate::errors::AppError;
use crate::models::{ApprovalRequest, Product, ProductTab};
use crate::optimistic::ArmedDelete;
use crate::auth::Identity;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListingParams {
    pub tab: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkApproval {
    pub approved: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct UndoOutcome {
    pub id: String,
    pub cancelled: bool,
}

/// GET /api/admin/products?tab= - List products under a tab.
pub async fn list_products(
    State(state): State<AppState>,
    Query(params): Query<ListingParams>,
) -> ApiResult<ProductListing> {
    let tab = match params.tab.as_deref() {
        Some(raw) => raw.parse::<ProductTab>()?,
        None => ProductTab::default(),
    };
    success(state.dashboard.products.listing(tab, Utc::now()).await?)
}

/// POST /api/admin/products/approve-pending - Approve every pending product.
pub async fn approve_pending(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
) -> ApiResult<BulkApproval> {
    tracing::info!("{} approving all pending products", admin.user_id);
    let approved = state.dashboard.products.approve_all_pending().await?;
    success(BulkApproval { approved })
}

/// PUT /api/admin/products/:id/approval - Approve or revoke one product.
pub async fn set_approval(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
    Json(request): Json<ApprovalRequest>,
) -> ApiResult<Product> {
    tracing::info!(
        "{} setting approval of product {} to {}",
        admin.user_id,
        id,
        request.approved
    );
    success(
        state
            .dashboard
            .products
            .toggle_approval(&id, request.approved)
            .await?,
    )
}

/// DELETE /api/admin/products/:id - Arm a delete that can be undone until it expires.
pub async fn delete_product(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
) -> Result<(StatusCode, ApiResponse<ArmedDelete>), AppError> {
    tracing::info!("{} deleting product {}", admin.user_id, id);
    let armed = state.dashboard.products.request_delete(&id).await?;
    Ok((StatusCode::ACCEPTED, ApiResponse::new(armed)))
}

/// POST /api/admin/products/:id/undo - Cancel an armed delete.
pub async fn undo_delete(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
) -> ApiResult<UndoOutcome> {
    tracing::info!("{} undoing delete of product {}", admin.user_id, id);
    if !state.dashboard.products.cancel_delete(&id)? {
        return Err(AppError::NotFound(format!(
            "No delete of product {} can be undone",
            id
        )));
    }
    success(UndoOutcome {
        id,
        cancelled: true,
    })
}
