//! Concurrent population of a [`GatedCache`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, info, warn};

use crate::cache::GatedCache;
use crate::entry::Entry;
use crate::error::{GateError, GateResult};
use crate::filter::MembershipFilter;
use crate::store::BackingStore;

/// In-flight write ceiling used by the benchmark harness.
pub const DEFAULT_CONCURRENCY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadReport {
    pub written: usize,
    pub elapsed: Duration,
}

/// Writes a batch of entries with at most `concurrency` calls in flight.
#[derive(Debug, Clone, Copy)]
pub struct BulkLoader {
    concurrency: usize,
}

impl Default for BulkLoader {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl BulkLoader {
    pub fn new(concurrency: usize) -> GateResult<Self> {
        if concurrency == 0 {
            return Err(GateError::Config("load concurrency must be at least 1".into()));
        }
        Ok(Self { concurrency })
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Set every entry through `cache` and wait for all writes to finish.
    ///
    /// Only the first failure is kept; it is returned wrapped in
    /// [`GateError::Load`] once every outstanding write has completed.
    pub async fn load<S, F>(
        &self,
        cache: Arc<GatedCache<S, F>>,
        entries: Arc<[Entry]>,
    ) -> GateResult<LoadReport>
    where
        S: BackingStore + 'static,
        F: MembershipFilter + 'static,
    {
        let total = entries.len();
        info!(entries = total, concurrency = self.concurrency, "loading entries");

        let started = Instant::now();
        let sem = Arc::new(Semaphore::new(self.concurrency));
        let first_error: Arc<OnceLock<GateError>> = Arc::new(OnceLock::new());
        let failed = Arc::new(AtomicUsize::new(0));
        let mut join_set = JoinSet::new();

        for idx in 0..total {
            let permit = sem
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| GateError::Task(format!("admission closed: {e}")))?;
            let cache = Arc::clone(&cache);
            let entries = Arc::clone(&entries);
            let task_first_error = Arc::clone(&first_error);
            let task_failed = Arc::clone(&failed);

            join_set.spawn(async move {
                let _permit = permit;
                let entry = &entries[idx];
                if let Err(e) = cache.set(&entry.key, &entry.value, entry.ttl).await {
                    debug!(key = %entry.key, error = %e, "write failed");
                    record_failure(&task_first_error, &task_failed, e);
                }
            });

            // Reap finished tasks so the set does not hold one handle per entry.
            while let Some(res) = join_set.try_join_next() {
                record_join(&first_error, &failed, res);
            }
        }

        while let Some(res) = join_set.join_next().await {
            record_join(&first_error, &failed, res);
        }

        let elapsed = started.elapsed();
        if let Some(source) = first_error.get() {
            return Err(GateError::Load {
                total,
                failed: failed.load(Ordering::Relaxed),
                source: Box::new(source.clone()),
            });
        }

        info!(written = total, elapsed_ms = elapsed.as_millis() as u64, "load complete");
        Ok(LoadReport {
            written: total,
            elapsed,
        })
    }
}

fn record_failure(first_error: &OnceLock<GateError>, failed: &AtomicUsize, err: GateError) {
    failed.fetch_add(1, Ordering::Relaxed);
    if first_error.set(err).is_ok() {
        warn!("first load error captured");
    }
}

/// A write task that panicked or was cancelled counts as a failed write. The
/// remaining tasks are still awaited.
fn record_join(
    first_error: &OnceLock<GateError>,
    failed: &AtomicUsize,
    res: Result<(), JoinError>,
) {
    if let Err(e) = res {
        warn!(error = %e, "write task did not complete");
        record_failure(first_error, failed, GateError::Task(e.to_string()));
    }
}
