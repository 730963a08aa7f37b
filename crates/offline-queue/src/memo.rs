//! Time-bounded data cache over the key-value store.

use std::sync::Arc;

use offline_core::{Clock, QueueSettings, SystemClock};
use offline_store::{store_key, JsonStore, KeyValueStore};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Serialize)]
struct MemoRef<'a, T: ?Sized> {
    data: &'a T,
    timestamp: u64,
}

#[derive(Deserialize)]
struct Memo<T> {
    data: T,
    timestamp: u64,
}

/// Memoizes fetched data under a key namespace, separate from the action queue.
pub struct DataCache<S> {
    store: JsonStore<S>,
    namespace: String,
    default_max_age: u64,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore> DataCache<S> {
    /// Create a data cache over a store.
    pub fn new(store: S, settings: &QueueSettings) -> Self {
        Self::with_clock(store, settings, SystemClock)
    }

    /// Create a data cache with a specific clock.
    pub fn with_clock(store: S, settings: &QueueSettings, clock: impl Clock + 'static) -> Self {
        Self {
            store: JsonStore::new(store),
            namespace: settings.cache_namespace.clone(),
            default_max_age: settings.default_max_age_ms,
            clock: Arc::new(clock),
        }
    }

    fn key(&self, key: &str) -> String {
        store_key!(self.namespace.as_str(), key)
    }

    /// Store a value stamped with the current time. Failures are logged.
    pub fn cache_data<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let memo = MemoRef {
            data: value,
            timestamp: self.clock.now_millis(),
        };
        if let Err(e) = self.store.set(&self.key(key), &memo) {
            error!(key = %key, error = %e, "Failed to cache data");
        }
    }

    /// The stored value if it is younger than `max_age_ms`.
    ///
    /// Missing, stale and unreadable entries all yield `None`.
    pub fn get_cached_data<T: DeserializeOwned>(&self, key: &str, max_age_ms: u64) -> Option<T> {
        let memo = match self.store.get::<Memo<T>>(&self.key(key)) {
            Ok(memo) => memo?,
            Err(e) => {
                error!(key = %key, error = %e, "Failed to get cached data");
                return None;
            }
        };

        let age = self.clock.now_millis().saturating_sub(memo.timestamp);
        if age < max_age_ms {
            Some(memo.data)
        } else {
            debug!(key = %key, age, "Cached data is stale");
            None
        }
    }

    /// [`get_cached_data`](Self::get_cached_data) with the configured default age.
    pub fn get_cached_data_default<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_cached_data(key, self.default_max_age)
    }

    /// Remove every entry in the namespace. Returns how many were removed.
    pub fn clear_cache(&self) -> usize {
        let keys = match self.store.keys_with_prefix(&self.namespace) {
            Ok(keys) => keys,
            Err(e) => {
                error!(error = %e, "Failed to clear cache");
                return 0;
            }
        };

        let mut removed = 0;
        for key in keys {
            match self.store.delete(&key) {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => error!(key = %key, error = %e, "Failed to remove cached data"),
            }
        }
        removed
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        self.store.inner()
    }
}

#[cfg(test)]
mod tests {
    use offline_core::ManualClock;
    use offline_store::MemoryStore;
    use serde_json::{json, Value};

    use super::*;

    fn cache(clock: &ManualClock) -> DataCache<MemoryStore> {
        DataCache::with_clock(MemoryStore::new(), &QueueSettings::default(), clock.clone())
    }

    #[test]
    fn test_freshness_is_strict() {
        let clock = ManualClock::new(10_000);
        let cache = cache(&clock);
        cache.cache_data("products", &json!([{"id": 1}]));

        clock.advance(999);
        assert_eq!(cache.get_cached_data::<Value>("products", 1_000), Some(json!([{"id": 1}])));

        clock.advance(1);
        assert_eq!(cache.get_cached_data::<Value>("products", 1_000), None);

        clock.advance(1);
        assert_eq!(cache.get_cached_data::<Value>("products", 1_000), None);
    }

    #[test]
    fn test_stored_under_namespace() {
        let clock = ManualClock::new(5);
        let cache = cache(&clock);
        cache.cache_data("products", &vec![1, 2]);

        let raw = cache.store().get("cache-products").unwrap().unwrap();
        let value: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, json!({"data": [1, 2], "timestamp": 5}));
    }

    #[test]
    fn test_default_max_age() {
        let clock = ManualClock::new(0);
        let cache = cache(&clock);
        cache.cache_data("banner", "sale");

        clock.advance(3_599_999);
        assert_eq!(cache.get_cached_data_default::<String>("banner").as_deref(), Some("sale"));
        clock.advance(1);
        assert_eq!(cache.get_cached_data_default::<String>("banner"), None);
    }

    #[test]
    fn test_corrupt_entry_is_a_miss() {
        let clock = ManualClock::new(0);
        let cache = cache(&clock);
        cache.store().set("cache-products", "not json").unwrap();
        assert_eq!(cache.get_cached_data::<Value>("products", 1_000), None);
    }

    #[test]
    fn test_clear_cache_leaves_queue_alone() {
        let clock = ManualClock::new(0);
        let cache = cache(&clock);
        cache.cache_data("a", &1);
        cache.cache_data("b", &2);
        cache.store().set("offline-actions", "[]").unwrap();

        assert_eq!(cache.clear_cache(), 2);
        assert_eq!(cache.store().keys().unwrap(), vec!["offline-actions"]);
    }
}
