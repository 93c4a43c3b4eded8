//! Scheduled refresh of the counter cache.
//!
//! The first fetch happens synchronously at start-up and must succeed. After
//! that a tokio interval triggers [`Refresher::refresh_once`]; a failed
//! refresh logs and leaves the previous snapshot in place. Only one refresh
//! runs at a time: a trigger that arrives while one is in flight is skipped.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::counters::{CounterCache, CounterSnapshot};
use crate::error::{Error, Result};
use crate::tracker::TrackerClient;

/// Pause between attempts within one refresh
const RETRY_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A new snapshot replaced the old one
    Refreshed { records: usize },
    /// Another refresh was already running
    Skipped,
    /// Every attempt failed; the previous snapshot is still served
    Failed { attempts: u32, error: String },
}

#[derive(Debug)]
pub struct Refresher {
    client: TrackerClient,
    cache: CounterCache,
    retries: u32,
}

impl Refresher {
    pub fn new(client: TrackerClient, cache: CounterCache, retries: u32) -> Self {
        Self {
            client,
            cache,
            retries,
        }
    }

    pub fn cache(&self) -> &CounterCache {
        &self.cache
    }

    /// Initial fetch. Errors are returned so start-up can abort.
    pub async fn prime(&self) -> Result<Arc<CounterSnapshot>> {
        let _guard = self
            .cache
            .begin_refresh()
            .ok_or_else(|| Error::OperationFailed("counter refresh already running".to_string()))?;

        let snapshot = self.client.fetch_counters().await?;
        info!(records = snapshot.records, "fetched initial bug counters");
        self.cache.replace(snapshot);
        self.cache.snapshot()
    }

    /// One scheduled refresh, with up to `retries` extra attempts
    pub async fn refresh_once(&self) -> RefreshOutcome {
        let Some(_guard) = self.cache.begin_refresh() else {
            debug!("counter refresh already running; skipping tick");
            return RefreshOutcome::Skipped;
        };

        let attempts = self.retries.saturating_add(1);
        let mut last_error = String::new();
        for attempt in 1..=attempts {
            match self.client.fetch_counters().await {
                Ok(snapshot) => {
                    let records = snapshot.records;
                    self.cache.replace(snapshot);
                    info!(records, attempt, "refreshed bug counters");
                    return RefreshOutcome::Refreshed { records };
                }
                Err(err) => {
                    warn!(attempt, attempts, "bug counter refresh failed: {err}");
                    last_error = err.to_string();
                    if attempt < attempts {
                        tokio::time::sleep(RETRY_DELAY).await;
                    }
                }
            }
        }

        RefreshOutcome::Failed {
            attempts,
            error: last_error,
        }
    }

    /// Run [`Self::refresh_once`] every `period`, starting one period from now.
    ///
    /// Missed ticks are skipped rather than bunched up.
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(period_secs = period.as_secs(), "counter refresh scheduled");
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                self.refresh_once().await;
            }
        })
    }
}
