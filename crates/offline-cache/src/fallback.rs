//! Responses synthesized when neither network nor cache can answer.

use http::header::{self, HeaderValue};
use http::StatusCode;
use offline_fetch::Response;

/// Placeholder image: 400x600, neutral fill, "Image Unavailable" caption.
pub const PLACEHOLDER_SVG: &str = r##"<svg width="400" height="600" xmlns="http://www.w3.org/2000/svg"><rect width="100%" height="100%" fill="#f3f4f6"/><text x="50%" y="50%" text-anchor="middle" dy=".3em" fill="#9ca3af" font-family="Arial, sans-serif" font-size="16">Image Unavailable</text></svg>"##;

/// Body of the offline API response.
pub const OFFLINE_API_BODY: &str =
    r#"{"error":"Offline","message":"This feature is not available offline"}"#;

/// Body of the generic offline response.
pub const OFFLINE_RESOURCE_BODY: &str = "Offline - Resource not available";

/// Placeholder image served with a one-day cache lifetime and status 200.
pub fn placeholder_image() -> Response {
    Response::ok(PLACEHOLDER_SVG)
        .with_header(header::CONTENT_TYPE, HeaderValue::from_static("image/svg+xml"))
        .with_header(header::CACHE_CONTROL, HeaderValue::from_static("max-age=86400"))
}

/// Structured JSON error for API requests made while offline.
pub fn offline_api() -> Response {
    Response::new(StatusCode::SERVICE_UNAVAILABLE)
        .with_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
        .with_body(OFFLINE_API_BODY)
}

/// Generic plain-text 503.
pub fn service_unavailable() -> Response {
    Response::new(StatusCode::SERVICE_UNAVAILABLE)
        .with_status_text("Service Unavailable")
        .with_header(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))
        .with_body(OFFLINE_RESOURCE_BODY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_image() {
        let response = placeholder_image();
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type(), Some("image/svg+xml"));
        assert_eq!(response.headers[header::CACHE_CONTROL], "max-age=86400");
        let svg = response.text();
        assert!(svg.contains(r#"width="400""#));
        assert!(svg.contains(r#"height="600""#));
        assert!(svg.contains("Image Unavailable"));
    }

    #[test]
    fn test_offline_api_body() {
        let response = offline_api();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = response.json().unwrap();
        assert_eq!(
            body,
            serde_json::json!({"error": "Offline", "message": "This feature is not available offline"})
        );
    }

    #[test]
    fn test_service_unavailable() {
        let response = service_unavailable();
        assert_eq!(response.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.status_text(), "Service Unavailable");
        assert_eq!(response.text(), OFFLINE_RESOURCE_BODY);
    }
}
