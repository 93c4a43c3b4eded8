//! Cached bug counters from the remote tracker.
//!
//! The cache holds one immutable [`CounterSnapshot`] behind an `Arc`. Readers
//! clone the `Arc` under a read lock; a refresh builds the next snapshot
//! without holding any lock and swaps the pointer in one step. Both mappings
//! always come from the same fetch.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::tracker::BugRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CounterSnapshot {
    /// Bugs per resolver display name
    pub resolved: BTreeMap<String, u64>,
    /// Bugs per assignee display name
    pub unresolved: BTreeMap<String, u64>,
    pub fetched_at: DateTime<Utc>,
    /// Number of records aggregated
    pub records: usize,
}

impl CounterSnapshot {
    /// Count every record once under its resolver and once under its assignee.
    ///
    /// Records are not filtered by state: the fetch covers all statuses, so
    /// open bugs count toward `resolved` (under the empty name when nobody
    /// resolved them) and closed bugs count toward `unresolved`.
    pub fn aggregate(records: &[BugRecord], fetched_at: DateTime<Utc>) -> Self {
        let mut resolved = BTreeMap::new();
        let mut unresolved = BTreeMap::new();
        for record in records {
            *resolved.entry(record.resolver_name().to_string()).or_insert(0) += 1;
            *unresolved
                .entry(record.assignee_name().to_string())
                .or_insert(0) += 1;
        }
        Self {
            resolved,
            unresolved,
            fetched_at,
            records: records.len(),
        }
    }
}

#[derive(Debug, Default)]
struct CacheInner {
    snapshot: RwLock<Option<Arc<CounterSnapshot>>>,
    refreshing: AtomicBool,
}

/// Shared handle to the counter snapshot; clones see the same cache
#[derive(Debug, Clone, Default)]
pub struct CounterCache {
    inner: Arc<CacheInner>,
}

impl CounterCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Latest snapshot, if any fetch has succeeded
    pub fn current(&self) -> Option<Arc<CounterSnapshot>> {
        // Critical sections only clone or assign an Arc, so a poisoned lock
        // still holds a whole value.
        self.inner
            .snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Latest snapshot, or [`Error::CountersUnavailable`] before the first fetch
    pub fn snapshot(&self) -> Result<Arc<CounterSnapshot>> {
        self.current().ok_or(Error::CountersUnavailable)
    }

    pub fn is_populated(&self) -> bool {
        self.current().is_some()
    }

    /// Replace the whole snapshot
    pub fn replace(&self, snapshot: CounterSnapshot) {
        let next = Arc::new(snapshot);
        let mut slot = self
            .inner
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *slot = Some(next);
    }

    /// Claim the single refresh slot.
    ///
    /// Returns `None` while another refresh holds it; the slot frees itself
    /// when the guard drops.
    pub fn begin_refresh(&self) -> Option<RefreshGuard> {
        self.inner
            .refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RefreshGuard {
                inner: Arc::clone(&self.inner),
            })
    }

    pub fn is_refreshing(&self) -> bool {
        self.inner.refreshing.load(Ordering::Acquire)
    }
}

/// Marks a refresh in progress
#[derive(Debug)]
pub struct RefreshGuard {
    inner: Arc<CacheInner>,
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.inner.refreshing.store(false, Ordering::Release);
    }
}
