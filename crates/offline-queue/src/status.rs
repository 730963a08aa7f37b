//! Offline indicator state.

use offline_core::Connectivity;
use serde::Serialize;

/// What the offline indicator shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OfflineStatus {
    pub connectivity: Connectivity,
    pub pending: usize,
}

impl OfflineStatus {
    /// Create an indicator state.
    pub fn new(connectivity: Connectivity, pending: usize) -> Self {
        Self { connectivity, pending }
    }

    /// Banner text, or `None` while online.
    pub fn banner(&self) -> Option<String> {
        if self.connectivity.is_online() {
            return None;
        }
        let mut text = String::from("You are offline.");
        if self.pending > 0 {
            text.push_str(&format!(" {} actions will sync when online.", self.pending));
        }
        Some(text)
    }
}
