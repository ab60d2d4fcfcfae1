use std::time::Duration;

use tracing::trace;

use crate::entry::Lookup;
use crate::error::GateResult;
use crate::filter::MembershipFilter;
use crate::store::BackingStore;

/// Key-value cache whose lookups can be gated by a membership filter.
///
/// The cache owns its filter outright; two caches never share one. Every key
/// that `set` reports as written is already in the filter, so the filter can
/// only err towards "maybe present".
pub struct GatedCache<S, F> {
    store: S,
    filter: F,
}

impl<S: BackingStore, F: MembershipFilter> GatedCache<S, F> {
    pub fn new(store: S, filter: F) -> Self {
        Self { store, filter }
    }

    /// Write to the store, then record the key in the filter.
    ///
    /// A failed store write leaves the filter untouched.
    pub async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> GateResult<()> {
        self.store.set(key, value, ttl).await?;
        self.filter.add(key);
        Ok(())
    }

    /// Look `key` up, consulting the filter first when `filter_enabled`.
    ///
    /// A definite negative from the filter returns [`Lookup::Miss`] without
    /// touching the store. Store errors are returned as-is and never turned
    /// into misses.
    pub async fn get(&self, key: &str, filter_enabled: bool) -> GateResult<Lookup> {
        if filter_enabled && !self.filter.test(key) {
            trace!(key, "filter negative");
            return Ok(Lookup::Miss);
        }

        match self.store.get(key).await? {
            Some(value) => Ok(Lookup::Hit(value)),
            None => Ok(Lookup::Miss),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }
}
