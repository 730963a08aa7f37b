//! Offline action queue for the storefront.
//!
//! User actions taken while offline are recorded, persisted through a
//! [`offline_store::KeyValueStore`], and replayed in order once connectivity
//! returns. A separate namespace of the same store memoizes fetched data with
//! a maximum age.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use offline_core::{Connectivity, ConnectivityMonitor, QueueSettings};
//! use offline_queue::{ActionKind, CartAddPayload, LoggingSink, OfflineQueue, OfflineSync};
//! use offline_store::MemoryStore;
//!
//! let queue = Arc::new(OfflineQueue::new(MemoryStore::new(), &QueueSettings::default()));
//! let connectivity = ConnectivityMonitor::new(Connectivity::Offline);
//! let sync = Arc::new(OfflineSync::new(queue, Arc::new(LoggingSink), connectivity.clone()));
//!
//! sync.submit(ActionKind::CartAdd(CartAddPayload::new("42", 1))).await;
//! tokio::spawn({ let sync = sync.clone(); async move { sync.run().await } });
//! connectivity.set(Connectivity::Online); // drains the queue
//! ```

mod action;
mod error;
mod ids;
mod memo;
mod queue;
mod replay;
mod status;
mod sync;

pub use action::*;
pub use error::*;
pub use ids::*;
pub use memo::*;
pub use queue::*;
pub use replay::*;
pub use status::*;
pub use sync::*;
