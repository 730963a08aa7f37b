//! Typed JSON access over a key-value store.

use serde::{de::DeserializeOwned, Serialize};

use crate::{KeyValueStore, StoreError};

/// Store wrapper with automatic JSON serialization.
///
/// Works with any type that implements `Serialize` and `DeserializeOwned`.
pub struct JsonStore<S> {
    store: S,
}

impl<S: KeyValueStore> JsonStore<S> {
    /// Wrap a store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Get a value.
    ///
    /// Returns `None` if the key doesn't exist.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let actions: Option<Vec<RawAction>> = store.get("offline-actions")?;
    /// ```
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    /// Set a value.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let raw = serde_json::to_string(value)?;
        self.store.set(key, &raw)
    }

    /// Delete a value. Returns whether it existed.
    pub fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.store.remove(key)
    }

    /// Check if a key exists.
    pub fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.store.get(key)?.is_some())
    }

    /// Keys starting with `prefix`.
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store
            .keys()?
            .into_iter()
            .filter(|key| key.starts_with(prefix))
            .collect())
    }

    /// The wrapped store.
    pub fn inner(&self) -> &S {
        &self.store
    }
}

/// Helper to build namespaced store keys.
///
/// The prefix is used as-is; further parts are joined with `:`.
///
/// # Example
///
/// ```rust,ignore
/// let key = store_key!("cache-", "product", 42);
/// // Returns "cache-product:42"
/// ```
#[macro_export]
macro_rules! store_key {
    ($prefix:expr, $first:expr $(, $part:expr)*) => {{
        let mut key = String::from($prefix);
        key.push_str(&$first.to_string());
        $(
            key.push(':');
            key.push_str(&$part.to_string());
        )*
        key
    }};
}
