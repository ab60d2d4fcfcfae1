pub mod bench;
pub mod cache;
pub mod entry;
pub mod error;
pub mod filter;
pub mod loader;
pub mod store;
#[cfg(test)]
pub(crate) mod testing;
pub mod workload;

pub use bench::{
    run_benchmark, BenchDriver, BenchObserver, BenchPlan, BenchReport, KeySampler, ModeSummary,
    TrialResult,
};
pub use cache::GatedCache;
pub use entry::{Entry, Lookup};
pub use error::{GateError, GateResult};
pub use filter::MembershipFilter;
pub use loader::{BulkLoader, LoadReport, DEFAULT_CONCURRENCY};
pub use store::BackingStore;
pub use workload::{generate, key_for, PayloadPolicy, TtlPolicy, WorkloadSpec, MAX_TTL};
