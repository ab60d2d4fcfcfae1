/// Probabilistic set used to skip store probes for keys that were never written.
///
/// `test` may return false positives but never false negatives. `add` takes
/// `&self` so one instance can be fed by concurrent writers.
pub trait MembershipFilter: Send + Sync {
    fn add(&self, key: &str);
    fn test(&self, key: &str) -> bool;
}
