use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::probe::{LiveStatus, ProbeError, ProbeOutcome};
use crate::video_id::VideoId;

pub const UNPARSEABLE_NOTE: &str = "unparseable identifier";

/// Most recent result for one watched key.
///
/// `video_id` is the canonical id, or the trimmed raw key when the entry
/// could not be parsed. It is also the cache key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub video_id: String,
    pub is_live_now: bool,
    pub live_status: Option<LiveStatus>,
    pub checked_at: DateTime<Utc>,
    pub note: Option<String>,
}

impl StatusSnapshot {
    pub fn probed(id: &VideoId, outcome: &ProbeOutcome, checked_at: DateTime<Utc>) -> Self {
        StatusSnapshot {
            video_id: id.to_string(),
            is_live_now: outcome.is_live,
            live_status: outcome.live_status,
            checked_at,
            note: outcome.note.clone(),
        }
    }

    pub fn probe_failed(id: &VideoId, err: &ProbeError, checked_at: DateTime<Utc>) -> Self {
        StatusSnapshot {
            video_id: id.to_string(),
            is_live_now: false,
            live_status: None,
            checked_at,
            note: Some(err.category().to_owned()),
        }
    }

    pub fn unparseable(raw: &str, checked_at: DateTime<Utc>) -> Self {
        StatusSnapshot {
            video_id: raw.to_owned(),
            is_live_now: false,
            live_status: None,
            checked_at,
            note: Some(UNPARSEABLE_NOTE.to_owned()),
        }
    }
}

/// Volatile map of the latest snapshot per key.
///
/// Empty at process start and rewritten by every poll cycle. Clones share the
/// same map; readers see the last completed write for each key.
#[derive(Clone, Default)]
pub struct StatusCache {
    inner: Arc<RwLock<BTreeMap<String, StatusSnapshot>>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `snapshot` under its `video_id`, replacing any previous value.
    pub fn put(&self, snapshot: StatusSnapshot) {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(snapshot.video_id.clone(), snapshot);
    }

    pub fn get(&self, key: &str) -> Option<StatusSnapshot> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<StatusSnapshot> {
        let mut map = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        map.remove(key)
    }

    /// Copy of every snapshot, ordered by key.
    pub fn values(&self) -> Vec<StatusSnapshot> {
        let map = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        map.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }
}
