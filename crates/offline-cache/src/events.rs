//! Auxiliary events: background sync, push notifications, control messages.

use offline_core::BACKGROUND_SYNC_TAG;
use serde::{Deserialize, Serialize};

/// Title used when a push payload carries none.
pub const DEFAULT_NOTIFICATION_TITLE: &str = "Netlistore";
/// Body used when a push payload carries none.
pub const DEFAULT_NOTIFICATION_BODY: &str = "New update available!";
/// Icon and badge for notifications.
pub const NOTIFICATION_ICON: &str = "/favicon.ico";
/// Page opened by the `explore` action.
pub const EXPLORE_TARGET: &str = "/";

/// A deferred-work notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncEvent {
    pub tag: String,
}

impl SyncEvent {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    /// The event that replays queued actions.
    pub fn background() -> Self {
        Self::new(BACKGROUND_SYNC_TAG)
    }

    pub fn is_background_sync(&self) -> bool {
        self.tag == BACKGROUND_SYNC_TAG
    }
}

/// Push message payload. Both fields are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl PushPayload {
    /// Parse a push message. Empty or malformed data yields the default payload.
    pub fn parse(data: &[u8]) -> Self {
        if data.is_empty() {
            return Self::default();
        }
        serde_json::from_slice(data).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Ignoring malformed push payload");
            Self::default()
        })
    }
}

/// A button on a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

/// A notification to display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub actions: Vec<NotificationAction>,
    /// The payload the notification was built from.
    pub data: PushPayload,
}

impl Notification {
    /// Build the notification for a push payload.
    pub fn from_push(payload: PushPayload) -> Self {
        Self {
            title: payload
                .title
                .clone()
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_TITLE.to_string()),
            body: payload
                .body
                .clone()
                .unwrap_or_else(|| DEFAULT_NOTIFICATION_BODY.to_string()),
            icon: NOTIFICATION_ICON.to_string(),
            badge: NOTIFICATION_ICON.to_string(),
            actions: vec![
                NotificationAction {
                    action: "explore".to_string(),
                    title: "Explore".to_string(),
                },
                NotificationAction {
                    action: "close".to_string(),
                    title: "Close".to_string(),
                },
            ],
            data: payload,
        }
    }
}

/// Page to open after a notification click, if any.
pub fn notification_click(action: &str) -> Option<&'static str> {
    (action == "explore").then_some(EXPLORE_TARGET)
}

/// Control message sent from a page to the cache manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlMessage {
    /// Promote the waiting version immediately.
    SkipWaiting,
}

impl ControlMessage {
    /// Parse a message; unrecognized messages yield `None`.
    pub fn parse(data: &str) -> Option<Self> {
        serde_json::from_str(data).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_defaults() {
        let notification = Notification::from_push(PushPayload::parse(b""));
        assert_eq!(notification.title, "Netlistore");
        assert_eq!(notification.body, "New update available!");
        assert_eq!(notification.icon, "/favicon.ico");
        assert_eq!(notification.actions.len(), 2);
        assert_eq!(notification.actions[0].action, "explore");
    }

    #[test]
    fn test_notification_from_payload() {
        let payload = PushPayload::parse(br#"{"title":"Sale","body":"20% off"}"#);
        let notification = Notification::from_push(payload.clone());
        assert_eq!(notification.title, "Sale");
        assert_eq!(notification.body, "20% off");
        assert_eq!(notification.data, payload);
    }

    #[test]
    fn test_notification_click() {
        assert_eq!(notification_click("explore"), Some("/"));
        assert_eq!(notification_click("close"), None);
        assert_eq!(notification_click(""), None);
    }

    #[test]
    fn test_control_message() {
        assert_eq!(
            ControlMessage::parse(r#"{"type":"SKIP_WAITING"}"#),
            Some(ControlMessage::SkipWaiting)
        );
        assert_eq!(ControlMessage::parse(r#"{"type":"RELOAD"}"#), None);
        assert_eq!(ControlMessage::parse("not json"), None);
    }

    #[test]
    fn test_sync_event_tag() {
        assert!(SyncEvent::background().is_background_sync());
        assert!(!SyncEvent::new("periodic").is_background_sync());
    }
}
