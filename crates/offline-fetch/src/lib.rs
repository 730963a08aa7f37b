//! Network fetch seam with explicit timeout and retry policy.
//!
//! This crate provides:
//! - `Request` / `Response` - The request model intercepted by the cache manager
//! - `Fetcher` - The network seam (real, offline, or scripted)
//! - `FetchClient` - Wraps a fetcher with timeout and retry
//! - `TimeoutConfig` - Per-attempt timeouts
//! - `RetryPolicy` - Retry strategies
//! - `HttpFetcher` - `reqwest`-backed fetcher
//! - `ScriptedFetcher` - Canned responses for tests and demos

mod client;
mod error;
mod http_fetcher;
mod request;
mod response;
mod retry;
mod scripted;
mod timeout;

pub use client::*;
pub use error::*;
pub use http_fetcher::*;
pub use request::*;
pub use response::*;
pub use retry::*;
pub use scripted::*;
pub use timeout::*;
