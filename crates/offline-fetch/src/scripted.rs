//! Scripted fetcher with canned responses (for development/testing).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use http::StatusCode;

use crate::client::Fetcher;
use crate::request::Request;
use crate::response::Response;
use crate::FetchError;

/// Answers requests from a route table and records every call.
///
/// Unrouted URLs resolve with a 404. While offline every call fails with
/// `FetchError::Offline` (still recorded).
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    routes: Mutex<HashMap<String, Response>>,
    failures: Mutex<VecDeque<FetchError>>,
    calls: Mutex<Vec<String>>,
    offline: AtomicBool,
    delay: Option<Duration>,
}

impl ScriptedFetcher {
    /// Create an empty fetcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `url` with `response`.
    pub fn with_route(self, url: impl Into<String>, response: Response) -> Self {
        self.route(url, response);
        self
    }

    /// Delay every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Add or replace a route.
    pub fn route(&self, url: impl Into<String>, response: Response) {
        lock(&self.routes).insert(url.into(), response);
    }

    /// Fail the next call with `error`, ahead of any routing.
    pub fn fail_next(&self, error: FetchError) {
        lock(&self.failures).push_back(error);
    }

    /// Toggle network reachability.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Total calls made.
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// Calls made for one URL.
    pub fn calls_for(&self, url: &str) -> usize {
        lock(&self.calls).iter().filter(|u| u.as_str() == url).count()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let url = request.url.to_string();
        lock(&self.calls).push(url.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = lock(&self.failures).pop_front() {
            return Err(error);
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(FetchError::Offline);
        }

        Ok(lock(&self.routes)
            .get(&url)
            .cloned()
            .unwrap_or_else(|| Response::new(StatusCode::NOT_FOUND)))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
