//! Deferred-work hook shared by the cache manager and the action queue.

use async_trait::async_trait;

/// Tag carried by background sync events that replay queued actions.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Error reported by a sync handler.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("{failed} queued action(s) could not be replayed")]
    Incomplete { failed: usize },

    #[error("Sync failed: {0}")]
    Failed(String),
}

/// Replays deferred work when the environment signals it is a good time to.
///
/// The request cache manager forwards `background-sync` events here and the
/// offline action queue implements it, so both paths drain the same queue.
#[async_trait]
pub trait SyncHandler: Send + Sync {
    /// Handle a sync event with the given tag.
    async fn on_sync(&self, tag: &str) -> Result<(), SyncError>;
}
