//! `reqwest`-backed fetcher.

use async_trait::async_trait;

use crate::client::Fetcher;
use crate::request::Request;
use crate::response::Response;
use crate::timeout::TimeoutConfig;
use crate::FetchError;

/// Fetches over real HTTP.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeouts: TimeoutConfig,
}

impl HttpFetcher {
    /// Create a fetcher honoring the given timeouts.
    pub fn new(timeouts: TimeoutConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.connect)
            .timeout(timeouts.total)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;
        Ok(Self { client, timeouts })
    }

    fn map_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeouts.total)
        } else if e.is_connect() {
            FetchError::Connection(e.to_string())
        } else {
            FetchError::Request(e.to_string())
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &Request) -> Result<Response, FetchError> {
        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(request.headers.clone());
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let resp = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.bytes().await.map_err(|e| self.map_error(e))?;

        tracing::debug!(url = %request.url, status = status.as_u16(), bytes = body.len(), "network response");

        Ok(Response {
            status,
            status_text: None,
            headers,
            body: body.to_vec(),
        })
    }
}
