use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::state::AppState;
use crate::status_cache::StatusSnapshot;

/// Response for a single status lookup. A key that hasn't been polled yet is
/// not an error.
#[derive(Debug, Serialize)]
pub struct StatusLookup {
    pub video_id: String,
    pub polled: bool,
    pub snapshot: Option<StatusSnapshot>,
}

/// GET /api/status
/// Returns everything in the status cache, including stale and failed entries
pub async fn list_status(State(state): State<AppState>) -> Json<Vec<StatusSnapshot>> {
    Json(state.watchlist.current_statuses())
}

/// GET /api/status/{video_id}
pub async fn get_status(
    State(state): State<AppState>,
    Path(video_id): Path<String>,
) -> Json<StatusLookup> {
    let snapshot = state.watchlist.status_of(&video_id);

    Json(StatusLookup {
        video_id,
        polled: snapshot.is_some(),
        snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status_cache::StatusCache;
    use crate::store::memory::MemoryWatchStore;
    use crate::watchlist::Watchlist;
    use chrono::Utc;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_status_reads_cache() {
        let cache = StatusCache::new();
        let state = AppState::new(Watchlist::new(Arc::new(MemoryWatchStore::default()), cache.clone()));

        let Json(empty) = list_status(State(state.clone())).await;
        assert!(empty.is_empty());

        cache.put(StatusSnapshot::unparseable("junk", Utc::now()));
        let Json(all) = list_status(State(state.clone())).await;
        assert_eq!(all.len(), 1);

        let Json(found) = get_status(State(state.clone()), Path("junk".into())).await;
        assert!(found.polled);

        let Json(missing) = get_status(State(state), Path("dQw4w9WgXcQ".into())).await;
        assert!(!missing.polled);
        assert!(missing.snapshot.is_none());
    }
}
