//! Request classification and per-class caching strategy.

use http::Method;
use offline_core::CacheSettings;
use offline_fetch::{Destination, Request, RequestMode};
use serde::{Deserialize, Serialize};
use url::Url;

/// How a class of request is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Not intercepted; the request goes straight to the network.
    Passthrough,
    /// Serve from cache if present; only consult the network on a miss.
    CacheFirst,
    /// Attempt the network first; fall back to the cache on failure.
    NetworkFirst,
    /// Network first, falling back to the app shell document.
    NetworkFirstShell,
}

/// Resource class of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestClass {
    /// Non-network scheme; left untouched.
    Passthrough,
    /// Images, by destination or extension.
    Image,
    /// API paths and cross-origin requests.
    Api,
    /// Top-level document loads.
    Navigation,
    /// Stylesheets, scripts, fonts and everything else.
    Asset,
}

impl RequestClass {
    /// Strategy applied to this class.
    pub fn strategy(&self) -> Strategy {
        match self {
            Self::Passthrough => Strategy::Passthrough,
            Self::Image | Self::Asset => Strategy::CacheFirst,
            Self::Api => Strategy::NetworkFirst,
            Self::Navigation => Strategy::NetworkFirstShell,
        }
    }
}

impl std::fmt::Display for RequestClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Passthrough => "passthrough",
            Self::Image => "image",
            Self::Api => "api",
            Self::Navigation => "navigation",
            Self::Asset => "asset",
        };
        f.write_str(name)
    }
}

/// Classifies requests. Classification is stateless and checked in a fixed order:
/// scheme, image, API/cross-origin, navigation, asset.
#[derive(Debug, Clone)]
pub struct Classifier {
    origin: Url,
    api_prefix: String,
    image_extensions: Vec<String>,
}

impl Classifier {
    /// Create a classifier for an origin.
    pub fn new(origin: Url, settings: &CacheSettings) -> Self {
        Self {
            origin,
            api_prefix: settings.api_prefix.clone(),
            image_extensions: settings
                .image_extensions
                .iter()
                .map(|ext| format!(".{}", ext.trim_start_matches('.').to_ascii_lowercase()))
                .collect(),
        }
    }

    /// Classify a request.
    pub fn classify(&self, request: &Request) -> RequestClass {
        if !request.is_http() {
            return RequestClass::Passthrough;
        }
        if request.destination == Destination::Image || self.has_image_extension(&request.url) {
            return RequestClass::Image;
        }
        if request.url.path().starts_with(&self.api_prefix) || self.is_cross_origin(&request.url) {
            return RequestClass::Api;
        }
        if request.mode == RequestMode::Navigate
            || (request.method == Method::GET && request.accepts_html())
        {
            return RequestClass::Navigation;
        }
        RequestClass::Asset
    }

    /// Whether the URL contains a known image extension anywhere.
    ///
    /// Matches on the whole URL, so `/img.png?size=2` and `/cdn/photo.jpg/raw` count.
    pub fn has_image_extension(&self, url: &Url) -> bool {
        let url = url.as_str().to_ascii_lowercase();
        self.image_extensions.iter().any(|ext| url.contains(ext.as_str()))
    }

    /// Whether the URL's host differs from the storefront's.
    pub fn is_cross_origin(&self, url: &Url) -> bool {
        url.host_str() != self.origin.host_str()
    }

    /// The storefront origin.
    pub fn origin(&self) -> &Url {
        &self.origin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(
            Url::parse("https://shop.example.com").unwrap(),
            &CacheSettings::default(),
        )
    }

    #[test]
    fn test_image_by_extension() {
        let request = Request::get("https://shop.example.com/product/42.jpg").unwrap();
        assert_eq!(classifier().classify(&request), RequestClass::Image);
    }

    #[test]
    fn test_image_by_destination() {
        let request = Request::image("https://shop.example.com/thumb?id=4").unwrap();
        assert_eq!(classifier().classify(&request), RequestClass::Image);
    }

    #[test]
    fn test_cross_origin_image_is_still_image() {
        let request = Request::get("https://cdn.example.net/hero.webp").unwrap();
        assert_eq!(classifier().classify(&request), RequestClass::Image);
    }

    #[test]
    fn test_api_prefix_and_cross_origin() {
        let c = classifier();
        let api = Request::get("https://shop.example.com/api/cart").unwrap();
        let form = Request::get("https://forms.example.org/checkout").unwrap();
        assert_eq!(c.classify(&api), RequestClass::Api);
        assert_eq!(c.classify(&form), RequestClass::Api);
    }

    #[test]
    fn test_navigation() {
        let c = classifier();
        let nav = Request::navigate("https://shop.example.com/product/42").unwrap();
        let html_get = Request::get("https://shop.example.com/about")
            .unwrap()
            .try_header("accept", "text/html,application/xhtml+xml")
            .unwrap();
        assert_eq!(c.classify(&nav), RequestClass::Navigation);
        assert_eq!(c.classify(&html_get), RequestClass::Navigation);
    }

    #[test]
    fn test_assets_and_passthrough() {
        let c = classifier();
        let css = Request::get("https://shop.example.com/assets/index.css").unwrap();
        let ext = Request::get("chrome-extension://abc/inject.js").unwrap();
        assert_eq!(c.classify(&css), RequestClass::Asset);
        assert_eq!(c.classify(&ext), RequestClass::Passthrough);
    }

    #[test]
    fn test_strategies() {
        assert_eq!(RequestClass::Image.strategy(), Strategy::CacheFirst);
        assert_eq!(RequestClass::Api.strategy(), Strategy::NetworkFirst);
        assert_eq!(RequestClass::Navigation.strategy(), Strategy::NetworkFirstShell);
        assert_eq!(RequestClass::Asset.strategy(), Strategy::CacheFirst);
    }
}
