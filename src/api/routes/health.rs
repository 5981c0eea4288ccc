use axum::{extract::State, http::StatusCode, Json};
use log::error;

use super::state::AppState;
use super::{api_error, store_failure, ApiError};
use crate::watchlist::Health;

/// GET /health
/// Confirms the database answers and reports watched/cached counts
pub async fn health_check(State(state): State<AppState>) -> Result<Json<Health>, ApiError> {
    state.watchlist.health().map(Json).map_err(|e| {
        error!("{}", store_failure("Health check failed", &e));
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("db error: {}", e.category()),
        )
    })
}
