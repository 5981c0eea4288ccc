use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::info;
use serde::Serialize;
use thiserror::Error;

use crate::error::LivePulseError;
use crate::status_cache::{StatusCache, StatusSnapshot};
use crate::store::WatchStore;
use crate::video_id::{short_url_for, watch_url_for, VideoId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoItem {
    pub video_id: String,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub ok: bool,
    pub watching: usize,
    pub cached: usize,
}

#[derive(Error, Debug)]
pub enum WatchlistError {
    #[error("'{0}' cannot be parsed into an 11-character video id")]
    Unparseable(String),

    #[error("video '{0}' is not being watched")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] LivePulseError),
}

/// Operations the request layer performs on the set of watched videos.
///
/// Shares the durable store and the status cache with the poller. Display
/// names live only in memory and are lost on restart.
#[derive(Clone)]
pub struct Watchlist {
    store: Arc<dyn WatchStore>,
    cache: StatusCache,
    names: Arc<RwLock<HashMap<String, Option<String>>>>,
}

impl Watchlist {
    pub fn new(store: Arc<dyn WatchStore>, cache: StatusCache) -> Self {
        Self {
            store,
            cache,
            names: Arc::default(),
        }
    }

    /// One item per stored entry: the canonical id when the raw key parses,
    /// otherwise the trimmed raw key.
    pub fn list_watched(&self) -> Result<Vec<VideoItem>, WatchlistError> {
        let entries = self.store.list()?;
        let names = self.names.read().unwrap_or_else(PoisonError::into_inner);

        Ok(entries
            .iter()
            .map(|entry| {
                let raw = entry.live_id.trim();
                let video_id = VideoId::parse(raw)
                    .map(|id| id.to_string())
                    .unwrap_or_else(|_| raw.to_owned());
                let name = names.get(&video_id).cloned().flatten();
                VideoItem { video_id, name }
            })
            .collect())
    }

    /// Starts watching `raw`. The trimmed input, not the canonical id, becomes
    /// the durable key.
    pub fn add_watched(&self, raw: &str, name: Option<String>) -> Result<VideoItem, WatchlistError> {
        let id = VideoId::parse(raw).map_err(|e| WatchlistError::Unparseable(e.input))?;

        self.store.insert_if_missing(raw.trim())?;
        self.names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string(), name.clone());

        info!("Watching {} (key '{}')", id, raw.trim());
        Ok(VideoItem {
            video_id: id.to_string(),
            name,
        })
    }

    /// Stops watching `video_id`.
    ///
    /// The durable key may be the bare id or either canonical URL, so each
    /// form is tried in turn until one delete succeeds.
    pub fn remove_watched(&self, video_id: &str) -> Result<(), WatchlistError> {
        let candidates = [
            video_id.to_owned(),
            watch_url_for(video_id),
            short_url_for(video_id),
        ];

        let mut removed = false;
        for key in &candidates {
            if self.store.delete(key)? {
                removed = true;
                break;
            }
        }

        if !removed {
            return Err(WatchlistError::NotFound(video_id.to_owned()));
        }

        self.names
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(video_id);
        self.cache.remove(video_id);

        info!("Stopped watching {}", video_id);
        Ok(())
    }

    pub fn current_statuses(&self) -> Vec<StatusSnapshot> {
        self.cache.values()
    }

    /// `None` means the key has not been polled yet.
    pub fn status_of(&self, video_id: &str) -> Option<StatusSnapshot> {
        self.cache.get(video_id)
    }

    pub fn health(&self) -> Result<Health, LivePulseError> {
        let watching = self.store.list()?.len();
        Ok(Health {
            ok: true,
            watching,
            cached: self.cache.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryWatchStore;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn watchlist(keys: &[&str]) -> (Arc<MemoryWatchStore>, StatusCache, Watchlist) {
        let store = Arc::new(MemoryWatchStore::with_keys(keys));
        let cache = StatusCache::new();
        let list = Watchlist::new(store.clone(), cache.clone());
        (store, cache, list)
    }

    #[test]
    fn test_add_keeps_raw_key_and_returns_id() {
        let (store, _cache, list) = watchlist(&[]);

        let item = list
            .add_watched("  https://youtu.be/dQw4w9WgXcQ ", Some("Rick".into()))
            .unwrap();
        assert_eq!(item, VideoItem { video_id: "dQw4w9WgXcQ".into(), name: Some("Rick".into()) });

        let entries = store.list().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].live_id, "https://youtu.be/dQw4w9WgXcQ");
    }

    #[test]
    fn test_add_rejects_unparseable() {
        let (store, _cache, list) = watchlist(&[]);

        let err = list.add_watched("https://example.com/watch?v=short", None).unwrap_err();
        assert!(matches!(err, WatchlistError::Unparseable(_)));
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_list_normalizes_and_attaches_names() {
        let (_store, _cache, list) = watchlist(&["https://www.youtube.com/watch?v=aaaaaaaaaaa", "garbage "]);
        list.add_watched("bbbbbbbbbbb", Some("B".into())).unwrap();

        let items = list.list_watched().unwrap();
        assert_eq!(
            items,
            vec![
                VideoItem { video_id: "aaaaaaaaaaa".into(), name: None },
                VideoItem { video_id: "garbage".into(), name: None },
                VideoItem { video_id: "bbbbbbbbbbb".into(), name: Some("B".into()) },
            ]
        );
    }

    #[test]
    fn test_remove_tries_every_key_form() {
        let (store, _cache, list) = watchlist(&[
            "aaaaaaaaaaa",
            "https://www.youtube.com/watch?v=bbbbbbbbbbb",
            "https://youtu.be/ccccccccccc",
        ]);

        for id in ["aaaaaaaaaaa", "bbbbbbbbbbb", "ccccccccccc"] {
            list.remove_watched(id).unwrap();
        }
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_remove_missing_is_not_found() {
        let (_store, _cache, list) = watchlist(&["aaaaaaaaaaa"]);
        let err = list.remove_watched("zzzzzzzzzzz").unwrap_err();
        assert!(matches!(err, WatchlistError::NotFound(id) if id == "zzzzzzzzzzz"));
    }

    #[test]
    fn test_remove_clears_cache_and_name() {
        let (_store, cache, list) = watchlist(&[]);
        list.add_watched("aaaaaaaaaaa", Some("A".into())).unwrap();
        cache.put(StatusSnapshot {
            video_id: "aaaaaaaaaaa".into(),
            is_live_now: true,
            live_status: None,
            checked_at: Utc::now(),
            note: None,
        });

        list.remove_watched("aaaaaaaaaaa").unwrap();
        assert!(list.current_statuses().is_empty());
        assert_eq!(list.status_of("aaaaaaaaaaa"), None);

        // Re-adding without a name must not resurrect the old one
        list.add_watched("aaaaaaaaaaa", None).unwrap();
        assert_eq!(list.list_watched().unwrap()[0].name, None);
    }

    #[test]
    fn test_health_counts() {
        let (store, cache, list) = watchlist(&["aaaaaaaaaaa", "bbbbbbbbbbb"]);
        cache.put(StatusSnapshot::unparseable("x", Utc::now()));

        assert_eq!(list.health().unwrap(), Health { ok: true, watching: 2, cached: 1 });

        store.set_unavailable(true);
        assert!(list.health().is_err());
    }
}
