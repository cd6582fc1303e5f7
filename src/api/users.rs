//! User management API endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{success, ApiResult};
use crate::dashboard::Listing;
use crate::models::{UserEdit, UserRecord};
use crate::auth::Identity;
use crate::AppState;

/// GET /api/admin/users - List users.
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Listing<UserRecord>> {
    success(state.dashboard.users.listing().await?)
}

/// PUT /api/admin/users/:id - Edit a user's name, billing address and payment method.
pub async fn update_user(
    State(state): State<AppState>,
    Extension(admin): Extension<Identity>,
    Path(id): Path<String>,
    Json(request): Json<UserEdit>,
) -> ApiResult<UserRecord> {
    tracing::info!("{} editing user {}", admin.user_id, id);
    success(state.dashboard.users.edit_user(&id, &request).await?)
}
