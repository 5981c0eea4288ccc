use crate::watchlist::Watchlist;

/// Shared application state passed to all Axum handlers via `.with_state()`.
#[derive(Clone)]
pub struct AppState {
    pub watchlist: Watchlist,
}

impl AppState {
    pub fn new(watchlist: Watchlist) -> Self {
        Self { watchlist }
    }
}
