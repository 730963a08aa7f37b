//! Outgoing request model.

use std::fmt;

use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use http::Method;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::FetchError;

/// The kind of resource a request is for, as declared by the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Document,
    Image,
    Script,
    Style,
    Font,
    Manifest,
    /// No declared destination (fetch/XHR).
    #[default]
    Empty,
    Other,
}

impl Destination {
    /// Parse a destination name; unknown names map to `Other`.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "document" => Self::Document,
            "image" => Self::Image,
            "script" => Self::Script,
            "style" => Self::Style,
            "font" => Self::Font,
            "manifest" => Self::Manifest,
            "" | "empty" => Self::Empty,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Document => "document",
            Self::Image => "image",
            Self::Script => "script",
            Self::Style => "style",
            Self::Font => "font",
            Self::Manifest => "manifest",
            Self::Empty => "empty",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// How the request was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestMode {
    /// Top-level document load.
    Navigate,
    SameOrigin,
    #[default]
    Cors,
    NoCors,
}

/// A request issued by the page.
#[derive(Debug, Clone)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL.
    pub url: Url,
    /// Request headers.
    pub headers: HeaderMap,
    /// Declared resource type.
    pub destination: Destination,
    /// Request mode.
    pub mode: RequestMode,
    /// Optional body.
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Create a request.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            destination: Destination::Empty,
            mode: RequestMode::Cors,
            body: None,
        }
    }

    /// Create a GET request from a URL string.
    pub fn get(url: &str) -> Result<Self, FetchError> {
        Ok(Self::new(Method::GET, Url::parse(url)?))
    }

    /// Create a top-level navigation request.
    pub fn navigate(url: &str) -> Result<Self, FetchError> {
        Ok(Self::get(url)?
            .with_mode(RequestMode::Navigate)
            .with_destination(Destination::Document)
            .with_header(header::ACCEPT, HeaderValue::from_static("text/html")))
    }

    /// Create an image request.
    pub fn image(url: &str) -> Result<Self, FetchError> {
        Ok(Self::get(url)?
            .with_mode(RequestMode::NoCors)
            .with_destination(Destination::Image))
    }

    /// Resolve a path against an origin.
    pub fn for_path(origin: &Url, path: &str) -> Result<Self, FetchError> {
        Ok(Self::new(Method::GET, origin.join(path)?))
    }

    /// Set the destination.
    pub fn with_destination(mut self, destination: Destination) -> Self {
        self.destination = destination;
        self
    }

    /// Set the request mode.
    pub fn with_mode(mut self, mode: RequestMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the method.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Add a typed header.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Add a header from strings.
    pub fn try_header(self, name: &str, value: &str) -> Result<Self, FetchError> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FetchError::InvalidHeader(e.to_string()))?;
        let value =
            HeaderValue::from_str(value).map_err(|e| FetchError::InvalidHeader(e.to_string()))?;
        Ok(self.with_header(name, value))
    }

    /// Set the body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Whether the URL uses a network-addressable scheme.
    pub fn is_http(&self) -> bool {
        matches!(self.url.scheme(), "http" | "https")
    }

    /// Whether the `Accept` header admits HTML. A missing header does not.
    pub fn accepts_html(&self) -> bool {
        self.headers
            .get_all(header::ACCEPT)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.contains("text/html"))
    }

    /// Whether the method is safe to repeat.
    pub fn is_idempotent(&self) -> bool {
        matches!(
            self.method,
            Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE
        )
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigate_accepts_html() {
        let request = Request::navigate("https://shop.example.com/product/42").unwrap();
        assert_eq!(request.mode, RequestMode::Navigate);
        assert!(request.accepts_html());
    }

    #[test]
    fn test_missing_accept_header_is_not_html() {
        let request = Request::get("https://shop.example.com/app.js").unwrap();
        assert!(!request.accepts_html());
    }

    #[test]
    fn test_non_http_scheme() {
        let request = Request::get("chrome-extension://abc/script.js").unwrap();
        assert!(!request.is_http());
    }

    #[test]
    fn test_for_path_joins_origin() {
        let origin = Url::parse("http://localhost:8080").unwrap();
        let request = Request::for_path(&origin, "/manifest.json").unwrap();
        assert_eq!(request.url.as_str(), "http://localhost:8080/manifest.json");
    }

    #[test]
    fn test_invalid_header_rejected() {
        let result = Request::get("https://shop.example.com/")
            .unwrap()
            .try_header("bad header", "x");
        assert!(matches!(result, Err(FetchError::InvalidHeader(_))));
    }

    #[test]
    fn test_destination_parse() {
        assert_eq!(Destination::parse("IMAGE"), Destination::Image);
        assert_eq!(Destination::parse(""), Destination::Empty);
        assert_eq!(Destination::parse("audio"), Destination::Other);
    }
}
