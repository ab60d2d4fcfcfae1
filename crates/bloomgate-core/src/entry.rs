use std::sync::Arc;
use std::time::Duration;

/// One synthetic cache entry.
///
/// The payload is reference-counted so a fixed payload can be shared by every
/// entry of a batch instead of being copied per key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub value: Arc<[u8]>,
    pub ttl: Duration,
}

impl Entry {
    pub fn new(key: String, value: Arc<[u8]>, ttl: Duration) -> Self {
        Self { key, value, ttl }
    }
}

/// Outcome of a gated lookup. A miss is a normal result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Hit(Vec<u8>),
    Miss,
}

impl Lookup {
    pub fn found(&self) -> bool {
        matches!(self, Self::Hit(_))
    }
}
