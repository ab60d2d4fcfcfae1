//! Benchmark driver: populate, run both filter modes, summarize.
//!
//! The run is strictly linear. Population must finish before the first lookup,
//! the filter-enabled trials run before the filter-disabled ones, and any store
//! error aborts the whole run without a summary.
//!
//! Lookups inside a trial are issued one at a time, so a trial's elapsed time is
//! pure per-request latency with no concurrent contention.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info};

use crate::cache::GatedCache;
use crate::entry::Entry;
use crate::error::{GateError, GateResult};
use crate::filter::MembershipFilter;
use crate::loader::{BulkLoader, LoadReport};
use crate::store::BackingStore;
use crate::workload::key_for;

pub const DEFAULT_RUNS: usize = 10;
pub const DEFAULT_REQUESTS: usize = 200_000;
pub const DEFAULT_HIT_RATIO: f64 = 0.8;
pub const DEFAULT_MISS_SPAN: usize = 1000;

/// Shape of the lookup phase.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchPlan {
    pub runs: usize,
    pub requests: usize,
    /// Probability that a request targets a populated key.
    pub hit_ratio: f64,
    /// First ordinal of the miss key range. Must not overlap the population.
    pub miss_start: usize,
    pub miss_span: usize,
}

impl BenchPlan {
    /// Default mix for a population of `populated` keys: 80% hits, misses drawn
    /// from the 1000 ordinals right after the population.
    pub fn new(runs: usize, requests: usize, populated: usize) -> Self {
        Self {
            runs,
            requests,
            hit_ratio: DEFAULT_HIT_RATIO,
            miss_start: populated,
            miss_span: DEFAULT_MISS_SPAN,
        }
    }

    pub fn validate(&self, populated: usize) -> GateResult<()> {
        if self.runs == 0 || self.requests == 0 {
            return Err(GateError::Config(
                "runs and requests must both be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.hit_ratio) {
            return Err(GateError::Config(format!(
                "hit ratio must be within [0, 1], got {}",
                self.hit_ratio
            )));
        }
        if self.hit_ratio > 0.0 && populated == 0 {
            return Err(GateError::Config("cannot draw hits from an empty population".into()));
        }
        if self.hit_ratio < 1.0 && self.miss_span == 0 {
            return Err(GateError::Config("miss span must be at least 1".into()));
        }
        if self.miss_start < populated {
            return Err(GateError::Config(format!(
                "miss range starts at {} inside the populated range 0..{populated}",
                self.miss_start
            )));
        }
        Ok(())
    }
}

/// Draws lookup keys: populated keys with probability `hit_ratio`, otherwise
/// keys that were never written.
pub struct KeySampler<'a, R> {
    rng: &'a mut R,
    populated: usize,
    plan: &'a BenchPlan,
}

impl<'a, R: Rng> KeySampler<'a, R> {
    /// Fails with [`GateError::Config`] if `plan` is invalid for `populated`.
    pub fn new(rng: &'a mut R, populated: usize, plan: &'a BenchPlan) -> GateResult<Self> {
        plan.validate(populated)?;
        Ok(Self {
            rng,
            populated,
            plan,
        })
    }

    pub fn next_index(&mut self) -> usize {
        if self.rng.gen_bool(self.plan.hit_ratio) {
            self.rng.gen_range(0..self.populated)
        } else {
            self.plan.miss_start + self.rng.gen_range(0..self.plan.miss_span)
        }
    }

    pub fn next_key(&mut self) -> String {
        key_for(self.next_index())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrialResult {
    pub elapsed: Duration,
    pub hits: usize,
    pub misses: usize,
}

impl TrialResult {
    pub fn requests(&self) -> usize {
        self.hits + self.misses
    }

    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits, self.requests())
    }
}

/// All trials of one filter mode.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSummary {
    pub filter_enabled: bool,
    pub trials: Vec<TrialResult>,
}

impl ModeSummary {
    pub fn new(filter_enabled: bool) -> Self {
        Self {
            filter_enabled,
            trials: Vec::new(),
        }
    }

    pub fn total_elapsed(&self) -> Duration {
        self.trials.iter().map(|t| t.elapsed).sum()
    }

    pub fn avg_elapsed(&self) -> Duration {
        match u32::try_from(self.trials.len()) {
            Ok(0) => Duration::ZERO,
            Ok(n) => self.total_elapsed() / n,
            Err(_) => Duration::from_secs_f64(
                self.total_elapsed().as_secs_f64() / self.trials.len() as f64,
            ),
        }
    }

    pub fn hits(&self) -> usize {
        self.trials.iter().map(|t| t.hits).sum()
    }

    pub fn misses(&self) -> usize {
        self.trials.iter().map(|t| t.misses).sum()
    }

    /// Aggregate hit rate over every request of every trial.
    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits(), self.hits() + self.misses())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BenchReport {
    pub load: LoadReport,
    pub enabled: ModeSummary,
    pub disabled: ModeSummary,
}

impl BenchReport {
    /// Average time with the filter off over average time with it on.
    ///
    /// Taken from the two mode averages only; `None` if the filtered average
    /// is zero.
    pub fn speedup(&self) -> Option<f64> {
        speedup(&self.enabled, &self.disabled)
    }
}

pub fn speedup(enabled: &ModeSummary, disabled: &ModeSummary) -> Option<f64> {
    let on = enabled.avg_elapsed().as_secs_f64();
    let off = disabled.avg_elapsed().as_secs_f64();
    (on > 0.0).then(|| off / on)
}

fn ratio(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

/// Progress hooks. Every method has a no-op default.
pub trait BenchObserver {
    fn on_loaded(&mut self, _report: &LoadReport) {}
    fn on_mode_start(&mut self, _filter_enabled: bool) {}
    fn on_trial(&mut self, _filter_enabled: bool, _run: usize, _result: &TrialResult) {}
}

impl BenchObserver for () {}

pub struct BenchDriver<'a, S, F> {
    cache: &'a GatedCache<S, F>,
    populated: usize,
    plan: BenchPlan,
}

impl<'a, S: BackingStore, F: MembershipFilter> BenchDriver<'a, S, F> {
    pub fn new(cache: &'a GatedCache<S, F>, populated: usize, plan: BenchPlan) -> GateResult<Self> {
        plan.validate(populated)?;
        Ok(Self {
            cache,
            populated,
            plan,
        })
    }

    /// One trial: `requests` sequential lookups.
    pub async fn run_trial<R: Rng>(
        &self,
        filter_enabled: bool,
        rng: &mut R,
    ) -> GateResult<TrialResult> {
        let mut sampler = KeySampler::new(rng, self.populated, &self.plan)?;
        let mut hits = 0;
        let mut misses = 0;

        let start = Instant::now();
        for _ in 0..self.plan.requests {
            let key = sampler.next_key();
            if self.cache.get(&key, filter_enabled).await?.found() {
                hits += 1;
            } else {
                misses += 1;
            }
        }
        let elapsed = start.elapsed();

        Ok(TrialResult {
            elapsed,
            hits,
            misses,
        })
    }

    /// All trials for one filter mode.
    pub async fn run_mode<R: Rng, O: BenchObserver + ?Sized>(
        &self,
        filter_enabled: bool,
        rng: &mut R,
        observer: &mut O,
    ) -> GateResult<ModeSummary> {
        info!(filter_enabled, runs = self.plan.runs, requests = self.plan.requests, "starting mode");
        observer.on_mode_start(filter_enabled);

        let mut summary = ModeSummary::new(filter_enabled);
        for run in 0..self.plan.runs {
            let result = self.run_trial(filter_enabled, rng).await?;
            debug!(
                filter_enabled,
                run = run + 1,
                elapsed_us = result.elapsed.as_micros() as u64,
                hits = result.hits,
                misses = result.misses,
                "trial complete"
            );
            observer.on_trial(filter_enabled, run + 1, &result);
            summary.trials.push(result);
        }

        info!(
            filter_enabled,
            avg_ms = summary.avg_elapsed().as_secs_f64() * 1000.0,
            hit_rate = summary.hit_rate(),
            "mode complete"
        );
        Ok(summary)
    }
}

/// Populate, run with the filter on, run with it off, summarize.
///
/// Fails before any lookup if the plan is invalid or population fails.
pub async fn run_benchmark<S, F, R, O>(
    cache: Arc<GatedCache<S, F>>,
    entries: Arc<[Entry]>,
    loader: &BulkLoader,
    plan: BenchPlan,
    rng: &mut R,
    observer: &mut O,
) -> GateResult<BenchReport>
where
    S: BackingStore + 'static,
    F: MembershipFilter + 'static,
    R: Rng,
    O: BenchObserver + ?Sized,
{
    let populated = entries.len();
    plan.validate(populated)?;

    let load = loader.load(Arc::clone(&cache), entries).await?;
    observer.on_loaded(&load);

    let driver = BenchDriver::new(&*cache, populated, plan)?;
    let enabled = driver.run_mode(true, rng, observer).await?;
    let disabled = driver.run_mode(false, rng, observer).await?;

    Ok(BenchReport {
        load,
        enabled,
        disabled,
    })
}
