//! The offline action queue.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use offline_core::{Clock, QueueSettings, SystemClock};
use offline_store::{JsonStore, KeyValueStore};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::action::{ActionKind, QueuedAction};
use crate::ids::ActionId;
use crate::replay::{dispatch, ActionSink, ReplayOutcome};

/// What a drain did with each action it saw.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Delivered.
    pub synced: Vec<ActionId>,
    /// Unknown kinds, dropped with a diagnostic.
    pub skipped: Vec<ActionId>,
    /// Failed and kept for the next drain.
    pub retained: Vec<ActionId>,
    /// Failed for the last allowed time and dropped.
    pub dropped: Vec<ActionId>,
    /// Another drain was already running; nothing was done.
    pub already_running: bool,
}

impl DrainReport {
    /// Actions dispatched in this drain.
    pub fn processed(&self) -> usize {
        self.synced.len() + self.skipped.len() + self.retained.len() + self.dropped.len()
    }

    /// Actions that failed to replay.
    pub fn failed(&self) -> usize {
        self.retained.len() + self.dropped.len()
    }
}

/// Resets the draining flag when a drain ends, however it ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Persistent queue of actions recorded while offline.
///
/// The in-memory queue is authoritative for the session; every change is
/// written through to the store, and write failures are logged only.
pub struct OfflineQueue<S> {
    store: JsonStore<S>,
    storage_key: String,
    max_attempts: u32,
    clock: Arc<dyn Clock>,
    actions: Mutex<Vec<QueuedAction>>,
    draining: AtomicBool,
    pending: watch::Sender<usize>,
}

impl<S: KeyValueStore> OfflineQueue<S> {
    /// Open the queue, loading any persisted actions.
    pub fn new(store: S, settings: &QueueSettings) -> Self {
        Self::with_clock(store, settings, SystemClock)
    }

    /// Open the queue with a specific clock.
    pub fn with_clock(store: S, settings: &QueueSettings, clock: impl Clock + 'static) -> Self {
        let store = JsonStore::new(store);
        let actions = match store.get::<Vec<QueuedAction>>(&settings.storage_key) {
            Ok(Some(actions)) => {
                debug!(count = actions.len(), "Loaded offline actions");
                actions
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                error!(error = %e, "Failed to load offline actions");
                Vec::new()
            }
        };
        for action in &actions {
            action.id.observe();
        }

        let (pending, _) = watch::channel(actions.len());
        Self {
            store,
            storage_key: settings.storage_key.clone(),
            max_attempts: settings.max_attempts.max(1),
            clock: Arc::new(clock),
            actions: Mutex::new(actions),
            draining: AtomicBool::new(false),
            pending,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<QueuedAction>> {
        self.actions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Write the queue through to the store and publish the new count.
    fn commit(&self, actions: &[QueuedAction]) {
        let result = if actions.is_empty() {
            self.store.delete(&self.storage_key).map(|_| ())
        } else {
            self.store.set(&self.storage_key, actions)
        };
        if let Err(e) = result {
            error!(error = %e, count = actions.len(), "Failed to save offline actions");
        }
        self.pending.send_replace(actions.len());
    }

    /// Append an action. Never fails; persistence errors are logged.
    pub fn record_action(&self, kind: ActionKind) -> ActionId {
        let now = self.clock.now_millis();
        let id = ActionId::next(now);
        info!(action_id = %id, kind = %kind.name(), "Recording offline action");

        let mut actions = self.lock();
        actions.push(QueuedAction::new(id.clone(), kind, now));
        self.commit(&actions);
        id
    }

    /// Number of actions waiting.
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    /// Snapshot of the waiting actions in replay order.
    pub fn pending(&self) -> Vec<QueuedAction> {
        self.lock().clone()
    }

    /// Live pending count for the UI.
    pub fn subscribe_pending(&self) -> watch::Receiver<usize> {
        self.pending.subscribe()
    }

    /// Whether a drain is running.
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Replay every waiting action in insertion order.
    ///
    /// Each action is dispatched at most once. Actions stay in the queue (and
    /// in storage) until their dispatch settles, so a drain that is cancelled
    /// or overlaps new recordings loses nothing. Failed actions keep their
    /// place ahead of anything recorded during the drain until they reach the
    /// attempt limit. A drain started while another runs does nothing.
    pub async fn drain<K: ActionSink + ?Sized>(&self, sink: &K) -> DrainReport {
        let mut report = DrainReport::default();
        if self.draining.swap(true, Ordering::SeqCst) {
            debug!("Drain already in progress");
            report.already_running = true;
            return report;
        }
        let _guard = DrainGuard(&self.draining);

        let batch = self.pending();
        if batch.is_empty() {
            return report;
        }
        info!(count = batch.len(), "Processing offline actions");

        for action in batch {
            let outcome = dispatch(sink, &action).await;

            let mut actions = self.lock();
            let Some(index) = actions.iter().position(|a| a.id == action.id) else {
                continue;
            };
            match outcome {
                Ok(ReplayOutcome::Synced) => {
                    actions.remove(index);
                    report.synced.push(action.id);
                }
                Ok(ReplayOutcome::Skipped) => {
                    actions.remove(index);
                    report.skipped.push(action.id);
                }
                Err(e) => {
                    let stored = &mut actions[index];
                    stored.attempts += 1;
                    let attempt = stored.attempts;
                    if attempt >= self.max_attempts {
                        error!(
                            action_id = %action.id,
                            kind = %action.kind.name(),
                            attempt,
                            error = %e,
                            "Dropping offline action after final attempt"
                        );
                        actions.remove(index);
                        report.dropped.push(action.id);
                    } else {
                        warn!(
                            action_id = %action.id,
                            kind = %action.kind.name(),
                            attempt,
                            error = %e,
                            "Failed to process offline action"
                        );
                        report.retained.push(action.id);
                    }
                }
            }
            self.commit(&actions);
        }

        info!(
            synced = report.synced.len(),
            failed = report.failed(),
            remaining = self.pending_count(),
            "Offline actions processed"
        );
        report
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        self.store.inner()
    }
}
