//! Overview API endpoint.

use axum::extract::State;

use super::{success, ApiResult};
use crate::models::Overview;
use crate::AppState;

/// GET /api/admin/overview - Monthly series for every entity table.
pub async fn get_overview(State(state): State<AppState>) -> ApiResult<Overview> {
    success(state.dashboard.overview().await?)
}
