//! Cached response snapshots.

use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::StatusCode;
use offline_fetch::Response;
use serde::{Deserialize, Serialize};

/// An immutable snapshot of a response taken when it was stored.
///
/// Replaced wholesale when the same key is written again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    /// Status code.
    pub status: u16,
    /// Status text, if the original carried a custom one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_text: Option<String>,
    /// Headers in original order.
    pub headers: Vec<(String, String)>,
    /// Body bytes (base64 in serialized form).
    #[serde(with = "body_base64")]
    pub body: Vec<u8>,
    /// When the entry was stored (Unix millis).
    pub stored_at: u64,
}

impl CachedResponse {
    /// Snapshot a response.
    pub fn from_response(response: &Response, stored_at: u64) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        Self {
            status: response.status.as_u16(),
            status_text: response.status_text.clone(),
            headers,
            body: response.body.clone(),
            stored_at,
        }
    }

    /// Rebuild a response from the snapshot, unmodified.
    pub fn to_response(&self) -> Response {
        let mut headers = HeaderMap::with_capacity(self.headers.len());
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }

        Response {
            status: StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            status_text: self.status_text.clone(),
            headers,
            body: self.body.clone(),
        }
    }

    /// Age relative to `now` in millis.
    pub fn age(&self, now: u64) -> u64 {
        now.saturating_sub(self.stored_at)
    }
}

mod body_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(body: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(body))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use http::header;

    use super::*;

    #[test]
    fn test_snapshot_preserves_response() {
        let response = Response::ok(r#"{"items":[]}"#)
            .with_header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let snapshot = CachedResponse::from_response(&response, 1_000);
        assert_eq!(snapshot.to_response(), response);
        assert_eq!(snapshot.age(1_250), 250);
    }

    #[test]
    fn test_body_serialized_as_base64() {
        let snapshot = CachedResponse::from_response(&Response::ok(vec![0u8, 159, 146, 150]), 0);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["body"], "AJ+Slg==");

        let back: CachedResponse = serde_json::from_value(json).unwrap();
        assert_eq!(back.body, vec![0u8, 159, 146, 150]);
    }
}
