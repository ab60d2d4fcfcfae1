use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use bloomfilter::Bloom;
use tracing::debug;

use bloomgate_core::{GateError, GateResult, MembershipFilter};

/// Bloom filter sized for `expected_entries` keys at a target false-positive
/// rate. Writers take a short exclusive lock; readers share.
pub struct BloomMembership {
    bloom: RwLock<Bloom<str>>,
    expected_entries: usize,
    false_positive_rate: f64,
    added: AtomicUsize,
}

impl BloomMembership {
    pub fn new(expected_entries: usize, false_positive_rate: f64) -> GateResult<Self> {
        if expected_entries == 0 {
            return Err(GateError::Config("filter expected entries must be at least 1".into()));
        }
        if !(false_positive_rate > 0.0 && false_positive_rate < 1.0) {
            return Err(GateError::Config(format!(
                "false positive rate must be within (0, 1), got {false_positive_rate}"
            )));
        }
        let bloom: Bloom<str> = Bloom::new_for_fp_rate(expected_entries, false_positive_rate)
            .map_err(|e| GateError::Config(format!("cannot size bloom filter: {e}")))?;
        debug!(
            expected_entries,
            false_positive_rate,
            bits = bloom.len(),
            hashes = bloom.number_of_hash_functions(),
            "bloom filter sized"
        );
        Ok(Self {
            bloom: RwLock::new(bloom),
            expected_entries,
            false_positive_rate,
            added: AtomicUsize::new(0),
        })
    }

    pub fn expected_entries(&self) -> usize {
        self.expected_entries
    }

    pub fn false_positive_rate(&self) -> f64 {
        self.false_positive_rate
    }

    /// Number of `add` calls so far, duplicates included.
    pub fn added(&self) -> usize {
        self.added.load(Ordering::Relaxed)
    }

    pub fn bits(&self) -> u64 {
        self.bloom
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl MembershipFilter for BloomMembership {
    fn add(&self, key: &str) {
        self.bloom
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set(key);
        self.added.fetch_add(1, Ordering::Relaxed);
    }

    fn test(&self, key: &str) -> bool {
        self.bloom
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .check(key)
    }
}

impl fmt::Debug for BloomMembership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BloomMembership")
            .field("expected_entries", &self.expected_entries)
            .field("false_positive_rate", &self.false_positive_rate)
            .field("added", &self.added())
            .finish()
    }
}
