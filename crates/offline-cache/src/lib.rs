//! Request cache manager for the storefront.
//!
//! This crate provides:
//! - `CacheStorage` - Named caches keyed by request identity (memory and SQLite)
//! - `Classifier` - Maps a request to its resource class and strategy
//! - `CacheManager` - Install/activate lifecycle and per-request interception
//! - Synthesized offline fallbacks and auxiliary sync/push/message events
//!
//! # Example
//!
//! ```ignore
//! use offline_cache::{CacheManager, Intercept, MemoryCacheStorage};
//! use offline_core::OfflineConfig;
//! use offline_fetch::{HttpFetcher, Request, TimeoutConfig};
//!
//! let config = OfflineConfig::default();
//! let fetcher = HttpFetcher::new(TimeoutConfig::default())?;
//! let manager = CacheManager::new(&config, MemoryCacheStorage::new(), fetcher);
//! manager.install().await;
//!
//! let request = Request::get("http://localhost:8080/api/cart")?;
//! if let Intercept::Respond(response) = manager.handle(&request).await {
//!     println!("{}", response.status);
//! }
//! ```

mod entry;
mod error;
mod events;
mod fallback;
mod key;
mod lifecycle;
mod manager;
mod policy;
mod sqlite;
mod storage;

pub use entry::*;
pub use error::*;
pub use events::*;
pub use fallback::*;
pub use key::*;
pub use lifecycle::*;
pub use manager::*;
pub use policy::*;
pub use sqlite::*;
pub use storage::*;
