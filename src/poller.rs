use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use log::{debug, info, warn, Level};
use logging_timer::timer;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::config::PollingSource;
use crate::error::LivePulseError;
use crate::probe::{LiveProber, LiveStatus, ProbeOutcome};
use crate::status_cache::{StatusCache, StatusSnapshot};
use crate::store::{WatchStore, WatchedEntry};
use crate::video_id::VideoId;

/// Durable error for entries whose key can't be parsed.
pub const INVALID_ID_ERROR: &str = "invalid video_id/url";

/// Tally of one cycle, for logging.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub checked: usize,
    pub live: usize,
    pub upcoming: usize,
    pub off: usize,
    /// Page fetched but not 200
    pub unavailable: usize,
    /// Transport failures (timeout, connect, ...)
    pub failed: usize,
    pub invalid: usize,
}

impl CycleSummary {
    fn record(&mut self, outcome: &ProbeOutcome) {
        match outcome.live_status {
            Some(LiveStatus::Live) => self.live += 1,
            Some(LiveStatus::Upcoming) => self.upcoming += 1,
            Some(LiveStatus::Off) => self.off += 1,
            None => self.unavailable += 1,
        }
    }
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} checked ({} live, {} upcoming, {} off, {} unavailable, {} failed, {} invalid)",
            self.checked, self.live, self.upcoming, self.off, self.unavailable, self.failed, self.invalid
        )
    }
}

/// The reconciliation loop.
///
/// Each cycle lists every watched entry, normalizes and probes it, writes the
/// snapshot to the cache and the result back to the store under the entry's
/// raw key. Entries are handled one at a time; a cycle always finishes (or
/// aborts) before the next sleep starts.
pub struct Poller<P> {
    store: Arc<dyn WatchStore>,
    cache: StatusCache,
    prober: P,
    polling: Arc<dyn PollingSource>,
}

impl<P: LiveProber> Poller<P> {
    pub fn new(
        store: Arc<dyn WatchStore>,
        cache: StatusCache,
        prober: P,
        polling: Arc<dyn PollingSource>,
    ) -> Self {
        Self {
            store,
            cache,
            prober,
            polling,
        }
    }

    /// Runs until `shutdown` fires. Failures inside a cycle are logged and
    /// never end the loop.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let interval = self.polling.polling().intervals();
        info!(
            "Polling every {} (plus up to {}s jitter)",
            interval, interval.jitter_seconds
        );

        loop {
            // Re-read each cycle so config edits apply without a restart
            let interval = self.polling.polling().intervals();

            match self.run_cycle().await {
                Ok(summary) => info!("Poll cycle complete: {}", summary),
                Err(e) => warn!("Poll cycle aborted: {} error", e.category()),
            }

            let sleep_for = interval.sample_sleep();
            debug!("Next poll cycle in {}s", sleep_for.as_secs());

            tokio::select! {
                _ = tokio::time::sleep(sleep_for) => {}
                _ = shutdown.recv() => {
                    info!("Poller shutting down");
                    break;
                }
            }
        }
    }

    /// One full pass over the store.
    ///
    /// A failure to list leaves the cache untouched. A store failure while
    /// writing back aborts the remaining entries of this cycle only.
    pub async fn run_cycle(&self) -> Result<CycleSummary, LivePulseError> {
        let _tmr = timer!(Level::Trace; "Poller::run_cycle");

        let entries = self.store.list()?;
        let mut summary = CycleSummary::default();

        for entry in &entries {
            self.reconcile_entry(entry, &mut summary).await?;
            summary.checked += 1;
        }

        Ok(summary)
    }

    async fn reconcile_entry(
        &self,
        entry: &WatchedEntry,
        summary: &mut CycleSummary,
    ) -> Result<(), LivePulseError> {
        let raw = entry.live_id.trim();

        let id = match VideoId::parse(raw) {
            Ok(id) => id,
            Err(_) => {
                debug!("Watched entry '{}' is not a video id or watch URL", raw);
                self.cache.put(StatusSnapshot::unparseable(raw, Utc::now()));
                self.store
                    .upsert(&entry.live_id, false, Some(INVALID_ID_ERROR))?;
                summary.invalid += 1;
                return Ok(());
            }
        };

        let checked_at = Utc::now();
        let snapshot = match self.prober.probe(&id).await {
            Ok(outcome) => {
                summary.record(&outcome);
                StatusSnapshot::probed(&id, &outcome, checked_at)
            }
            Err(e) => {
                warn!("Probe of {} failed: {}", id, e.category());
                summary.failed += 1;
                StatusSnapshot::probe_failed(&id, &e, checked_at)
            }
        };

        let is_live = snapshot.is_live_now;
        let note = snapshot.note.clone();
        self.cache.put(snapshot);

        // Durable rows stay keyed by what the user entered
        self.store.upsert(&entry.live_id, is_live, note.as_deref())?;

        Ok(())
    }
}
