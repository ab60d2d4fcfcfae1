//! Deterministic synthetic workload.
//!
//! Keys form a dense ordinal sequence `key0..key{N-1}`. Anything at or beyond
//! `key{N}` is guaranteed absent, which is how the benchmark injects misses.

use std::sync::Arc;
use std::time::Duration;

use crate::entry::Entry;
use crate::error::{GateError, GateResult};

pub const KEY_PREFIX: &str = "key";

/// Longest TTL any entry may carry (ten years).
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Key for ordinal `index`.
pub fn key_for(index: usize) -> String {
    format!("{KEY_PREFIX}{index}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadPolicy {
    /// Every entry shares the same `size`-byte payload of `X`.
    Fixed { size: usize },
    /// Payload is `value{i}` padded with `X` up to `size` bytes.
    Indexed { size: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlPolicy {
    Uniform(Duration),
    /// `base + (i % spread)` seconds.
    PerEntry { base: Duration, spread_secs: u64 },
}

impl TtlPolicy {
    pub fn ttl_for(&self, index: usize) -> Duration {
        match self {
            Self::Uniform(ttl) => *ttl,
            Self::PerEntry { base, spread_secs } if *spread_secs > 0 => {
                base.saturating_add(Duration::from_secs(index as u64 % spread_secs))
            }
            Self::PerEntry { base, .. } => *base,
        }
    }

    fn min_ttl(&self) -> Duration {
        match self {
            Self::Uniform(ttl) => *ttl,
            Self::PerEntry { base, .. } => *base,
        }
    }

    fn max_ttl(&self) -> Option<Duration> {
        match self {
            Self::Uniform(ttl) => Some(*ttl),
            Self::PerEntry { base, spread_secs } => {
                base.checked_add(Duration::from_secs(spread_secs.saturating_sub(1)))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadSpec {
    pub entries: usize,
    pub payload: PayloadPolicy,
    pub ttl: TtlPolicy,
}

impl WorkloadSpec {
    pub fn validate(&self) -> GateResult<()> {
        if self.entries == 0 {
            return Err(GateError::Config("workload needs at least one entry".into()));
        }
        // A zero TTL expires every key before the first lookup.
        if self.ttl.min_ttl() < Duration::from_secs(1) {
            return Err(GateError::Config("entry ttl must be at least 1s".into()));
        }
        match self.ttl.max_ttl() {
            Some(max) if max <= MAX_TTL => Ok(()),
            _ => Err(GateError::Config(format!(
                "entry ttl must not exceed {}s",
                MAX_TTL.as_secs()
            ))),
        }
    }
}

/// Generate the batch described by `spec`. Same input, same output.
pub fn generate(spec: &WorkloadSpec) -> GateResult<Vec<Entry>> {
    spec.validate()?;

    let entries: Vec<Entry> = match spec.payload {
        PayloadPolicy::Fixed { size } => {
            let shared: Arc<[u8]> = vec![b'X'; size].into();
            (0..spec.entries)
                .map(|i| Entry::new(key_for(i), Arc::clone(&shared), spec.ttl.ttl_for(i)))
                .collect()
        }
        PayloadPolicy::Indexed { size } => (0..spec.entries)
            .map(|i| Entry::new(key_for(i), indexed_payload(i, size), spec.ttl.ttl_for(i)))
            .collect(),
    };

    Ok(entries)
}

fn indexed_payload(index: usize, size: usize) -> Arc<[u8]> {
    let mut buf = format!("value{index}").into_bytes();
    if buf.len() < size {
        buf.resize(size, b'X');
    }
    buf.into()
}
