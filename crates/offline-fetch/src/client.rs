//! Fetcher seam and the policy-enforcing fetch client.

use std::sync::Arc;

use async_trait::async_trait;
use offline_core::FetchSettings;

use crate::request::Request;
use crate::response::Response;
use crate::retry::RetryPolicy;
use crate::timeout::TimeoutConfig;
use crate::FetchError;

/// Performs network requests.
///
/// Resolves with any response the server produced, including error statuses;
/// rejects only when no response could be obtained.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch a request from the network.
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError>;
}

#[async_trait]
impl<F: Fetcher + ?Sized> Fetcher for Arc<F> {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        (**self).fetch(request).await
    }
}

/// Fetch policy combining timeout and retry configuration.
#[derive(Debug, Clone, Default)]
pub struct FetchPolicy {
    /// Timeout configuration.
    pub timeout: TimeoutConfig,
    /// Retry policy.
    pub retry: RetryPolicy,
}

impl FetchPolicy {
    /// Create a new fetch policy.
    pub fn new(timeout: TimeoutConfig, retry: RetryPolicy) -> Self {
        Self { timeout, retry }
    }

    /// Build from fetch settings.
    pub fn from_settings(settings: &FetchSettings) -> Self {
        Self {
            timeout: TimeoutConfig::from_settings(settings),
            retry: RetryPolicy::from_settings(settings),
        }
    }
}

/// Wraps a fetcher with an explicit per-attempt timeout and bounded retries.
pub struct FetchClient<F> {
    inner: F,
    policy: FetchPolicy,
}

impl<F: Fetcher> FetchClient<F> {
    /// Create a client with the default policy.
    pub fn new(inner: F) -> Self {
        Self {
            inner,
            policy: FetchPolicy::default(),
        }
    }

    /// Set the policy.
    pub fn with_policy(mut self, policy: FetchPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Get the policy.
    pub fn policy(&self) -> &FetchPolicy {
        &self.policy
    }

    /// Get the wrapped fetcher.
    pub fn inner(&self) -> &F {
        &self.inner
    }

    async fn attempt(&self, request: &Request) -> Result<Response, FetchError> {
        let total = self.policy.timeout.total;
        match tokio::time::timeout(total, self.inner.fetch(request)).await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(total)),
        }
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for FetchClient<F> {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let retry = &self.policy.retry;
        let may_retry = request.is_idempotent() || retry.retry_non_idempotent;
        let mut attempt = 0;

        loop {
            match self.attempt(request).await {
                Ok(response)
                    if may_retry && retry.should_retry_status(response.status.as_u16(), attempt) =>
                {
                    tracing::debug!(
                        url = %request.url,
                        status = response.status.as_u16(),
                        attempt,
                        "retrying after server error"
                    );
                }
                Ok(response) => return Ok(response),
                Err(e) if may_retry && retry.should_retry_error(&e, attempt) => {
                    tracing::debug!(url = %request.url, error = %e, attempt, "retrying after fetch failure");
                }
                Err(e) => return Err(e),
            }

            let delay = retry.delay_for_attempt(attempt);
            attempt += 1;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// A fetcher for which the network is always unreachable.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineFetcher;

#[async_trait]
impl Fetcher for OfflineFetcher {
    async fn fetch(&self, _request: &Request) -> Result<Response, FetchError> {
        Err(FetchError::Offline)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use http::StatusCode;

    use super::*;
    use crate::retry::BackoffStrategy;
    use crate::ScriptedFetcher;

    fn fast_policy(retries: u32) -> FetchPolicy {
        FetchPolicy::new(
            TimeoutConfig::from_total(Duration::from_millis(50)),
            RetryPolicy::new(retries).with_backoff(BackoffStrategy::None),
        )
    }

    #[tokio::test]
    async fn test_retries_transient_failure_then_succeeds() {
        let fetcher = ScriptedFetcher::new()
            .with_route("https://shop.example.com/api/cart", Response::ok("{}"));
        fetcher.fail_next(FetchError::Connection("reset".into()));

        let client = FetchClient::new(fetcher).with_policy(fast_policy(1));
        let request = Request::get("https://shop.example.com/api/cart").unwrap();

        let response = client.fetch(&request).await.unwrap();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(client.inner().call_count(), 2);
    }

    #[tokio::test]
    async fn test_offline_is_not_retried() {
        let fetcher = ScriptedFetcher::new();
        fetcher.set_offline(true);
        let client = FetchClient::new(fetcher).with_policy(fast_policy(3));
        let request = Request::get("https://shop.example.com/").unwrap();

        assert!(matches!(client.fetch(&request).await, Err(FetchError::Offline)));
        assert_eq!(client.inner().call_count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_reported() {
        let fetcher = ScriptedFetcher::new()
            .with_route("https://shop.example.com/slow", Response::ok("late"))
            .with_delay(Duration::from_millis(500));
        let client = FetchClient::new(fetcher).with_policy(fast_policy(0));
        let request = Request::get("https://shop.example.com/slow").unwrap();

        assert!(matches!(client.fetch(&request).await, Err(FetchError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_server_error_returned_after_retries() {
        let fetcher = ScriptedFetcher::new().with_route(
            "https://shop.example.com/api/products",
            Response::new(StatusCode::BAD_GATEWAY),
        );
        let client = FetchClient::new(fetcher).with_policy(fast_policy(2));
        let request = Request::get("https://shop.example.com/api/products").unwrap();

        let response = client.fetch(&request).await.unwrap();
        assert_eq!(response.status, StatusCode::BAD_GATEWAY);
        assert_eq!(client.inner().call_count(), 3);
    }

    #[tokio::test]
    async fn test_post_not_retried() {
        let fetcher = ScriptedFetcher::new();
        fetcher.fail_next(FetchError::Connection("reset".into()));
        let client = FetchClient::new(fetcher).with_policy(fast_policy(2));
        let request = Request::get("https://shop.example.com/api/orders")
            .unwrap()
            .with_method(http::Method::POST);

        assert!(client.fetch(&request).await.is_err());
        assert_eq!(client.inner().call_count(), 1);
    }

    #[tokio::test]
    async fn test_offline_fetcher_always_fails() {
        let request = Request::get("https://shop.example.com/").unwrap();
        assert!(matches!(OfflineFetcher.fetch(&request).await, Err(FetchError::Offline)));
    }
}
