//! Durable key-value storage for offline state.
//!
//! Provides a synchronous string store (the page's local storage) with
//! in-memory and SQLite backends, plus a typed JSON wrapper.
//!
//! # Example
//!
//! ```rust,ignore
//! use offline_store::{JsonStore, SqliteStore};
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Wishlist {
//!     products: Vec<String>,
//! }
//!
//! let store = JsonStore::new(SqliteStore::open("netlistore/store.db".as_ref())?);
//!
//! // Store a value
//! store.set("wishlist", &wishlist)?;
//!
//! // Retrieve a value
//! let wishlist: Option<Wishlist> = store.get("wishlist")?;
//!
//! // Delete a value
//! store.delete("wishlist")?;
//! ```

mod error;
mod json;
mod memory;
mod sqlite;
mod store;

pub use error::StoreError;
pub use json::JsonStore;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::KeyValueStore;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{JsonStore, KeyValueStore, MemoryStore, SqliteStore, StoreError};
}
