pub mod bloom;
pub mod memory;
pub mod redis_store;

pub use bloom::BloomMembership;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use bloomgate_core::{
        generate, run_benchmark, BenchPlan, BulkLoader, GatedCache, PayloadPolicy, TtlPolicy,
        WorkloadSpec,
    };

    use super::*;

    fn workload(n: usize) -> WorkloadSpec {
        WorkloadSpec {
            entries: n,
            payload: PayloadPolicy::Fixed { size: 64 },
            ttl: TtlPolicy::Uniform(Duration::from_secs(60)),
        }
    }

    #[tokio::test]
    async fn test_bloom_gated_memory_store_end_to_end() {
        let filter = BloomMembership::new(1000, 0.01).unwrap();
        let cache = Arc::new(GatedCache::new(MemoryStore::new(), filter));
        let entries: Arc<[_]> = generate(&workload(500)).unwrap().into();

        let report = run_benchmark(
            Arc::clone(&cache),
            Arc::clone(&entries),
            &BulkLoader::default(),
            BenchPlan::new(2, 250, 500),
            &mut StdRng::seed_from_u64(11),
            &mut (),
        )
        .await
        .unwrap();

        assert_eq!(cache.store().len(), 500);
        assert_eq!(cache.filter().added(), 500);
        // Misses are guaranteed absent, so filter state never changes hit counts.
        for mode in [&report.enabled, &report.disabled] {
            assert_eq!(mode.hits() + mode.misses(), 500);
            assert!(mode.hit_rate() > 0.6 && mode.hit_rate() < 0.95);
        }
    }

    #[tokio::test]
    async fn test_out_of_range_lookups_with_real_filter() {
        let filter = BloomMembership::new(100, 0.01).unwrap();
        let cache = Arc::new(GatedCache::new(MemoryStore::new(), filter));
        let entries: Arc<[_]> = generate(&workload(10)).unwrap().into();

        let mut plan = BenchPlan::new(1, 20, 10);
        plan.hit_ratio = 0.0;
        plan.miss_start = 100;
        plan.miss_span = 10;

        let report = run_benchmark(
            Arc::clone(&cache),
            entries,
            &BulkLoader::default(),
            plan,
            &mut StdRng::seed_from_u64(12),
            &mut (),
        )
        .await
        .unwrap();

        assert_eq!((report.enabled.hits(), report.enabled.misses()), (0, 20));
        assert_eq!((report.disabled.hits(), report.disabled.misses()), (0, 20));
    }
}
