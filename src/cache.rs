//! Cross-table value pool used to satisfy `foreign` generators.

use crate::value::Value;
use ahash::{AHashMap, AHashSet};
use rand::Rng;

/// Values seen for one `table.column` key.
///
/// The vector keeps insertion order so sampling is reproducible for a given
/// seed; the set deduplicates.
#[derive(Debug, Default)]
struct Pool {
    seen: AHashSet<Value>,
    ordered: Vec<Value>,
}

/// Store of previously committed values, keyed by `table.column`.
///
/// Lives for one generation run. Entries are only ever added.
#[derive(Debug, Default)]
pub struct ValueCache {
    pools: AHashMap<String, Pool>,
}

/// Build the cache key for a table column
pub fn cache_key(table: &str, column: &str) -> String {
    format!("{}.{}", table, column)
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value for `table.column`. Duplicates are ignored.
    pub fn publish(&mut self, table: &str, column: &str, value: Value) {
        self.publish_key(cache_key(table, column), value);
    }

    pub fn publish_key(&mut self, key: String, value: Value) {
        let pool = self.pools.entry(key).or_default();
        if pool.seen.insert(value.clone()) {
            pool.ordered.push(value);
        }
    }

    /// Draw a uniformly random value published for `table.column`
    pub fn sample<R: Rng + ?Sized>(&self, table: &str, column: &str, rng: &mut R) -> Option<Value> {
        self.sample_key(&cache_key(table, column), rng)
    }

    pub fn sample_key<R: Rng + ?Sized>(&self, key: &str, rng: &mut R) -> Option<Value> {
        let pool = self.pools.get(key)?;
        if pool.ordered.is_empty() {
            return None;
        }
        let idx = rng.random_range(0..pool.ordered.len());
        Some(pool.ordered[idx].clone())
    }

    /// Number of distinct values held for a key
    pub fn len_of(&self, key: &str) -> usize {
        self.pools.get(key).map(|p| p.ordered.len()).unwrap_or(0)
    }

    /// Whether `value` was published for `key`
    pub fn contains(&self, key: &str, value: &Value) -> bool {
        self.pools
            .get(key)
            .map(|p| p.seen.contains(value))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_publish_deduplicates() {
        let mut cache = ValueCache::new();
        cache.publish("users", "id", Value::Int(1));
        cache.publish("users", "id", Value::Int(1));
        cache.publish("users", "id", Value::Int(2));
        assert_eq!(cache.len_of("users.id"), 2);
    }

    #[test]
    fn test_sample_unknown_or_empty_key() {
        let cache = ValueCache::new();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(cache.sample("users", "id", &mut rng), None);
    }

    #[test]
    fn test_sample_returns_published_values_only() {
        let mut cache = ValueCache::new();
        for i in 0..5 {
            cache.publish("users", "id", Value::Int(i));
        }
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..100 {
            let v = cache.sample("users", "id", &mut rng).unwrap();
            assert!(cache.contains("users.id", &v));
        }
    }

    #[test]
    fn test_sampling_is_deterministic_for_seed() {
        let mut cache = ValueCache::new();
        for i in 0..50 {
            cache.publish("t", "c", Value::Int(i));
        }
        let mut a = ChaCha8Rng::seed_from_u64(9);
        let mut b = ChaCha8Rng::seed_from_u64(9);
        let xs: Vec<_> = (0..10).map(|_| cache.sample("t", "c", &mut a)).collect();
        let ys: Vec<_> = (0..10).map(|_| cache.sample("t", "c", &mut b)).collect();
        assert_eq!(xs, ys);
    }
}
