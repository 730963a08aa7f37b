//! Shared primitives for the storefront offline resilience layer.
//!
//! This crate provides the fundamental types and traits:
//! - `OfflineConfig` - Configuration for every offline component
//! - `CacheNames` - Versioned cache partition names
//! - `ConnectivityMonitor` - Online/offline signal with transition detection
//! - `Clock` - Millisecond time source (real or manual)
//! - `RequestId` - Correlation id for intercepted requests
//! - `SyncHandler` - Hook invoked when deferred work should be replayed

mod clock;
mod config;
mod connectivity;
mod context;
mod sync;

pub use clock::*;
pub use config::*;
pub use connectivity::*;
pub use context::*;
pub use sync::*;
