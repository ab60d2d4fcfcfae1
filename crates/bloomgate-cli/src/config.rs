//! Configuration loading from TOML files.
//!
//! Lookup order:
//! 1. `--config <path>` on the command line
//! 2. `$BLOOMGATE_CONFIG` environment variable
//! 3. `~/.config/bloomgate/config.toml`
//! 4. Built-in defaults (everything is optional)
//!
//! Command-line flags are applied on top of whatever was loaded.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use bloomgate_core::bench::{DEFAULT_HIT_RATIO, DEFAULT_MISS_SPAN, DEFAULT_REQUESTS, DEFAULT_RUNS};
use bloomgate_core::{BenchPlan, PayloadPolicy, TtlPolicy, WorkloadSpec, DEFAULT_CONCURRENCY};

/// Top-level configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub store: StoreConfig,
    pub filter: FilterConfig,
    pub workload: WorkloadConfig,
    pub bench: BenchConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PayloadKind {
    Fixed,
    Indexed,
}

/// Backing store settings.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// `host:port` or a `redis://` URL.
    pub endpoint: String,
    /// Simulated round trip per call, memory store only.
    pub latency_us: u64,
}

/// Membership filter sizing.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct FilterConfig {
    pub expected_entries: usize,
    pub false_positive_rate: f64,
}

/// Synthetic entries written before the lookup phase.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub entries: usize,
    pub value_size: usize,
    pub payload: PayloadKind,
    pub ttl_secs: u64,
    /// 0 gives every entry the same TTL.
    pub ttl_spread_secs: u64,
}

/// Lookup phase settings.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct BenchConfig {
    pub runs: usize,
    pub requests: usize,
    pub hit_ratio: f64,
    pub miss_span: usize,
    /// In-flight write ceiling while populating.
    pub concurrency: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

// --- Defaults ---

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Redis,
            endpoint: "localhost:6379".into(),
            latency_us: 0,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            expected_entries: 1_000_000,
            false_positive_rate: 0.01,
        }
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            entries: 400_000,
            value_size: 1024,
            payload: PayloadKind::Fixed,
            ttl_secs: 100_000,
            ttl_spread_secs: 0,
        }
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            runs: DEFAULT_RUNS,
            requests: DEFAULT_REQUESTS,
            hit_ratio: DEFAULT_HIT_RATIO,
            miss_span: DEFAULT_MISS_SPAN,
            concurrency: DEFAULT_CONCURRENCY,
            seed: None,
        }
    }
}

impl Config {
    /// Reject settings that would make the comparison meaningless. Runs
    /// before any connection is opened.
    pub fn validate(&self) -> Result<()> {
        let w = &self.workload;
        let b = &self.bench;
        let f = &self.filter;

        if w.entries == 0 {
            bail!("workload.entries must be at least 1");
        }
        if w.ttl_secs == 0 {
            bail!("workload.ttl_secs must be at least 1");
        }
        self.workload_spec()
            .validate()
            .context("workload.ttl_secs / workload.ttl_spread_secs")?;
        if b.runs == 0 || b.requests == 0 {
            bail!("bench.runs and bench.requests must be at least 1");
        }
        if b.concurrency == 0 {
            bail!("bench.concurrency must be at least 1");
        }
        if !(0.0..=1.0).contains(&b.hit_ratio) {
            bail!("bench.hit_ratio must be within [0, 1], got {}", b.hit_ratio);
        }
        if b.miss_span == 0 {
            bail!("bench.miss_span must be at least 1");
        }
        if !(f.false_positive_rate > 0.0 && f.false_positive_rate < 1.0) {
            bail!(
                "filter.false_positive_rate must be within (0, 1), got {}",
                f.false_positive_rate
            );
        }
        // A filter sized below the population saturates and its real
        // false-positive rate drifts far above the configured one.
        if f.expected_entries < w.entries {
            bail!(
                "filter.expected_entries ({}) is smaller than workload.entries ({}); \
                 the filter would saturate",
                f.expected_entries,
                w.entries
            );
        }
        Ok(())
    }

    pub fn workload_spec(&self) -> WorkloadSpec {
        let w = &self.workload;
        let payload = match w.payload {
            PayloadKind::Fixed => PayloadPolicy::Fixed { size: w.value_size },
            PayloadKind::Indexed => PayloadPolicy::Indexed { size: w.value_size },
        };
        let base = Duration::from_secs(w.ttl_secs);
        let ttl = if w.ttl_spread_secs == 0 {
            TtlPolicy::Uniform(base)
        } else {
            TtlPolicy::PerEntry {
                base,
                spread_secs: w.ttl_spread_secs,
            }
        };
        WorkloadSpec {
            entries: w.entries,
            payload,
            ttl,
        }
    }

    pub fn bench_plan(&self) -> BenchPlan {
        let mut plan = BenchPlan::new(self.bench.runs, self.bench.requests, self.workload.entries);
        plan.hit_ratio = self.bench.hit_ratio;
        plan.miss_span = self.bench.miss_span;
        plan
    }
}

/// Load config from disk. Returns defaults if no config file exists.
///
/// An explicitly given path must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    if let Some(p) = explicit {
        return read_config(p);
    }

    if let Some(p) = config_path() {
        if p.exists() {
            return read_config(&p);
        }
    }

    Ok(Config::default())
}

fn read_config(p: &Path) -> Result<Config> {
    let content =
        std::fs::read_to_string(p).with_context(|| format!("reading {}", p.display()))?;
    let config: Config =
        toml::from_str(&content).with_context(|| format!("parsing {}", p.display()))?;
    Ok(config)
}

/// Resolve the config file path.
fn config_path() -> Option<PathBuf> {
    // 1. Environment variable
    if let Ok(p) = std::env::var("BLOOMGATE_CONFIG") {
        return Some(PathBuf::from(p));
    }

    // 2. ~/.config/bloomgate/config.toml
    if let Some(home) = dirs_home() {
        let p = home.join(".config").join("bloomgate").join("config.toml");
        return Some(p);
    }

    None
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var("HOME").ok().map(PathBuf::from)
}

/// Show the active config path (for `bloomgate config show`).
pub fn show_config_path(explicit: Option<&Path>) -> String {
    if let Some(p) = explicit {
        return format!("{} (from --config)", p.display());
    }
    match config_path() {
        Some(p) if p.exists() => format!("{} (loaded)", p.display()),
        Some(p) => format!("{} (not found, using defaults)", p.display()),
        None => "no config path resolved (using defaults)".into(),
    }
}
