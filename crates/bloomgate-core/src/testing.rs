//! Instrumented collaborators for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{GateError, GateResult};
use crate::filter::MembershipFilter;
use crate::store::BackingStore;

/// Store double that counts calls and tracks the peak number of concurrent
/// `set` calls.
#[derive(Default)]
pub struct CountingStore {
    data: Mutex<HashMap<String, Vec<u8>>>,
    sets: AtomicUsize,
    gets: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    fail_sets: AtomicBool,
    fail_gets: AtomicBool,
    set_delay: Option<Duration>,
    panic_on: Option<String>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Each `set` sleeps for `delay`, so concurrent writers overlap.
    pub fn with_set_delay(delay: Duration) -> Self {
        Self {
            set_delay: Some(delay),
            ..Self::default()
        }
    }

    /// `set` of `key` panics after its delay.
    pub fn panicking_on(mut self, key: &str) -> Self {
        self.panic_on = Some(key.to_string());
        self
    }

    pub fn failing_sets() -> Self {
        let store = Self::default();
        store.fail_sets.store(true, Ordering::SeqCst);
        store
    }

    pub fn fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn fail_sets(&self, fail: bool) {
        self.fail_sets.store(fail, Ordering::SeqCst);
    }

    pub fn insert_raw(&self, key: &str, value: &[u8]) {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
    }

    pub fn len(&self) -> usize {
        self.data.lock().unwrap().len()
    }

    pub fn set_calls(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackingStore for CountingStore {
    async fn set(&self, key: &str, value: &[u8], _ttl: Duration) -> GateResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.set_delay {
            tokio::time::sleep(delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        if self.panic_on.as_deref() == Some(key) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            panic!("store crashed writing {key}");
        }

        let result = if self.fail_sets.load(Ordering::SeqCst) {
            Err(GateError::Store(format!("connection refused writing {key}")))
        } else {
            self.insert_raw(key, value);
            Ok(())
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn get(&self, key: &str) -> GateResult<Option<Vec<u8>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(GateError::Store(format!("timeout reading {key}")));
        }
        Ok(self.data.lock().unwrap().get(key).cloned())
    }
}

/// Filter with no false positives, so tests can reason about exact membership.
#[derive(Default)]
pub struct ExactFilter {
    keys: Mutex<HashSet<String>>,
}

impl ExactFilter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MembershipFilter for ExactFilter {
    fn add(&self, key: &str) {
        self.keys.lock().unwrap().insert(key.to_string());
    }

    fn test(&self, key: &str) -> bool {
        self.keys.lock().unwrap().contains(key)
    }
}

/// Filter that answers "maybe present" for everything.
pub struct SaturatedFilter;

impl MembershipFilter for SaturatedFilter {
    fn add(&self, _key: &str) {}

    fn test(&self, _key: &str) -> bool {
        true
    }
}
