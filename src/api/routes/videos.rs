use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use log::error;
use serde::{Deserialize, Serialize};

use super::state::AppState;
use super::{api_error, store_failure, ApiError};
use crate::watchlist::{VideoItem, WatchlistError};

/// Request structure for adding a video to the watchlist
#[derive(Debug, Deserialize)]
pub struct CreateVideoRequest {
    /// Bare id or watch URL
    pub watch_url: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RemovedResponse {
    pub removed: String,
}

fn map_watchlist_error(e: WatchlistError) -> ApiError {
    match e {
        WatchlistError::Unparseable(input) => api_error(
            StatusCode::BAD_REQUEST,
            format!("'{}' cannot be parsed into an 11-character video id", input.trim()),
        ),
        WatchlistError::NotFound(_) => api_error(StatusCode::NOT_FOUND, "not found"),
        WatchlistError::Store(db_err) => {
            error!("{}", store_failure("Watchlist store error", &db_err));
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred")
        }
    }
}

/// GET /api/videos
/// Lists watched videos by canonical id
pub async fn list_videos(State(state): State<AppState>) -> Result<Json<Vec<VideoItem>>, ApiError> {
    state
        .watchlist
        .list_watched()
        .map(Json)
        .map_err(map_watchlist_error)
}

/// POST /api/videos
/// Starts watching a video given as an id or URL
pub async fn add_video(
    State(state): State<AppState>,
    Json(req): Json<CreateVideoRequest>,
) -> Result<(StatusCode, Json<VideoItem>), ApiError> {
    let item = state
        .watchlist
        .add_watched(&req.watch_url, req.name)
        .map_err(map_watchlist_error)?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// DELETE /api/videos/{video_id}
pub async fn delete_video(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Result<Json<RemovedResponse>, ApiError> {
    state
        .watchlist
        .remove_watched(&video_id)
        .map_err(map_watchlist_error)?;

    Ok(Json(RemovedResponse { removed: video_id }))
}
