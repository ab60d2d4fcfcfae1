use std::time::Duration;

use async_trait::async_trait;

use crate::error::GateResult;

/// Authoritative key-value store behind the gate.
///
/// Implementations must be safe to call from many tasks at once; the bulk
/// loader shares a single handle across all of its workers.
#[async_trait]
pub trait BackingStore: Send + Sync {
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> GateResult<()>;

    /// `Ok(None)` is a miss, not an error.
    async fn get(&self, key: &str) -> GateResult<Option<Vec<u8>>>;
}
