//! Binding the queue to connectivity and the background sync hook.

use std::sync::Arc;

use async_trait::async_trait;
use offline_core::{
    Clock, ConnectivityMonitor, SyncError, SyncHandler, SystemClock, Transition,
    BACKGROUND_SYNC_TAG,
};
use offline_store::KeyValueStore;
use tracing::{debug, info, warn};

use crate::action::{ActionKind, QueuedAction};
use crate::ids::ActionId;
use crate::queue::{DrainReport, OfflineQueue};
use crate::replay::{dispatch, ActionSink, ReplayOutcome};
use crate::status::OfflineStatus;

/// What happened to a submitted action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    /// Delivered immediately.
    Dispatched(ActionId),
    /// Unknown kind; dropped with a diagnostic.
    Skipped(ActionId),
    /// Recorded for replay.
    Queued(ActionId),
}

/// Routes user actions to the sink when online and to the queue when not,
/// and drains the queue whenever connectivity returns.
pub struct OfflineSync<S, K: ?Sized> {
    queue: Arc<OfflineQueue<S>>,
    sink: Arc<K>,
    connectivity: ConnectivityMonitor,
    clock: Arc<dyn Clock>,
}

impl<S, K> OfflineSync<S, K>
where
    S: KeyValueStore,
    K: ActionSink + ?Sized,
{
    /// Bind a queue and sink to a connectivity signal.
    pub fn new(queue: Arc<OfflineQueue<S>>, sink: Arc<K>, connectivity: ConnectivityMonitor) -> Self {
        Self {
            queue,
            sink,
            connectivity,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a different clock for immediate dispatches.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// The underlying queue.
    pub fn queue(&self) -> &OfflineQueue<S> {
        &self.queue
    }

    /// The connectivity signal being watched.
    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    /// Submit a user action.
    ///
    /// Online, the action is dispatched straight away and queued only if that
    /// fails. Offline, it is queued.
    pub async fn submit(&self, kind: ActionKind) -> Submitted {
        if !self.connectivity.is_online() {
            return Submitted::Queued(self.queue.record_action(kind));
        }

        let now = self.clock.now_millis();
        let action = QueuedAction::new(ActionId::next(now), kind, now);
        match dispatch(self.sink.as_ref(), &action).await {
            Ok(ReplayOutcome::Synced) => Submitted::Dispatched(action.id),
            Ok(ReplayOutcome::Skipped) => Submitted::Skipped(action.id),
            Err(e) => {
                warn!(action_id = %action.id, error = %e, "Dispatch failed, queueing action");
                Submitted::Queued(self.queue.record_action(action.kind))
            }
        }
    }

    /// Drain the queue now.
    pub async fn drain(&self) -> DrainReport {
        self.queue.drain(self.sink.as_ref()).await
    }

    /// React to a connectivity change: only coming online drains.
    pub async fn on_transition(&self, transition: Transition) -> Option<DrainReport> {
        match transition {
            Transition::WentOffline => {
                info!("App is offline");
                None
            }
            Transition::CameOnline => {
                info!("App is back online");
                Some(self.drain().await)
            }
        }
    }

    /// Watch connectivity and drain on every offline-to-online transition.
    ///
    /// Runs until the connectivity signal is dropped.
    pub async fn run(&self) {
        let mut watcher = self.connectivity.subscribe();
        while let Some(transition) = watcher.next_transition().await {
            self.on_transition(transition).await;
        }
        debug!("Connectivity watch ended");
    }

    /// Current indicator state.
    pub fn status(&self) -> OfflineStatus {
        OfflineStatus::new(self.connectivity.current(), self.queue.pending_count())
    }
}

#[async_trait]
impl<S, K> SyncHandler for OfflineSync<S, K>
where
    S: KeyValueStore,
    K: ActionSink + ?Sized,
{
    async fn on_sync(&self, tag: &str) -> Result<(), SyncError> {
        if tag != BACKGROUND_SYNC_TAG {
            return Ok(());
        }
        let report = self.drain().await;
        match report.failed() {
            0 => Ok(()),
            failed => Err(SyncError::Incomplete { failed }),
        }
    }
}

#[cfg(test)]
mod tests {
    use offline_core::Connectivity;
    use offline_store::MemoryStore;

    use super::*;
    use crate::action::{CartAddPayload, WishlistPayload};
    use crate::replay::LoggingSink;

    fn sync(initial: Connectivity) -> OfflineSync<MemoryStore, LoggingSink> {
        let queue = Arc::new(OfflineQueue::new(MemoryStore::new(), &Default::default()));
        OfflineSync::new(queue, Arc::new(LoggingSink), ConnectivityMonitor::new(initial))
    }

    #[tokio::test]
    async fn test_submit_online_dispatches() {
        let sync = sync(Connectivity::Online);
        let result = sync.submit(ActionKind::CartAdd(CartAddPayload::new("1", 1))).await;
        assert!(matches!(result, Submitted::Dispatched(_)));
        assert_eq!(sync.queue().pending_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_offline_queues() {
        let sync = sync(Connectivity::Offline);
        let result = sync.submit(ActionKind::WishlistAdd(WishlistPayload::new("1"))).await;
        assert!(matches!(result, Submitted::Queued(_)));
        assert_eq!(
            sync.status().banner().as_deref(),
            Some("You are offline. 1 actions will sync when online.")
        );
    }

    #[tokio::test]
    async fn test_going_offline_does_not_drain() {
        let sync = sync(Connectivity::Offline);
        sync.submit(ActionKind::WishlistAdd(WishlistPayload::new("1"))).await;
        assert_eq!(sync.on_transition(Transition::WentOffline).await, None);
        assert_eq!(sync.queue().pending_count(), 1);
    }

    #[tokio::test]
    async fn test_background_sync_drains() {
        let sync = sync(Connectivity::Offline);
        sync.submit(ActionKind::WishlistAdd(WishlistPayload::new("1"))).await;

        sync.on_sync("periodic").await.unwrap();
        assert_eq!(sync.queue().pending_count(), 1);

        sync.on_sync(BACKGROUND_SYNC_TAG).await.unwrap();
        assert_eq!(sync.queue().pending_count(), 0);
    }
}
