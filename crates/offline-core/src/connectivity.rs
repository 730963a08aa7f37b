//! Connectivity signal with transition detection.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Whether the network is currently reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Connectivity {
    Online,
    Offline,
}

impl Connectivity {
    /// Check if online.
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for Connectivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}

/// A change in connectivity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// online -> offline
    WentOffline,
    /// offline -> online
    CameOnline,
}

impl Transition {
    /// Derive the transition between two states, if any.
    pub fn between(from: Connectivity, to: Connectivity) -> Option<Self> {
        match (from, to) {
            (Connectivity::Online, Connectivity::Offline) => Some(Self::WentOffline),
            (Connectivity::Offline, Connectivity::Online) => Some(Self::CameOnline),
            _ => None,
        }
    }
}

/// Process-wide connectivity state fed by the environment's online/offline signal.
///
/// Components subscribe instead of reading an ambient flag.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<Connectivity>>,
}

impl ConnectivityMonitor {
    /// Create a monitor with an initial state.
    pub fn new(initial: Connectivity) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Current state.
    pub fn current(&self) -> Connectivity {
        *self.tx.borrow()
    }

    /// Check if online.
    pub fn is_online(&self) -> bool {
        self.current().is_online()
    }

    /// Report a new state. Returns the transition when the state actually changed.
    pub fn set(&self, state: Connectivity) -> Option<Transition> {
        let mut previous = state;
        self.tx.send_if_modified(|current| {
            previous = *current;
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        Transition::between(previous, state)
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> ConnectivityWatcher {
        let rx = self.tx.subscribe();
        let last = *rx.borrow();
        ConnectivityWatcher { rx, last }
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(Connectivity::Online)
    }
}

/// Receives connectivity transitions.
#[derive(Debug)]
pub struct ConnectivityWatcher {
    rx: watch::Receiver<Connectivity>,
    last: Connectivity,
}

impl ConnectivityWatcher {
    /// Wait for the next transition. Returns `None` once the monitor is gone.
    ///
    /// Intermediate states that flip back before being observed are collapsed.
    pub async fn next_transition(&mut self) -> Option<Transition> {
        loop {
            self.rx.changed().await.ok()?;
            let state = *self.rx.borrow_and_update();
            if let Some(transition) = Transition::between(self.last, state) {
                self.last = state;
                return Some(transition);
            }
        }
    }

    /// Last state this watcher observed.
    pub fn last(&self) -> Connectivity {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_reports_transitions() {
        let monitor = ConnectivityMonitor::new(Connectivity::Online);

        assert_eq!(monitor.set(Connectivity::Online), None);
        assert_eq!(monitor.set(Connectivity::Offline), Some(Transition::WentOffline));
        assert!(!monitor.is_online());
        assert_eq!(monitor.set(Connectivity::Offline), None);
        assert_eq!(monitor.set(Connectivity::Online), Some(Transition::CameOnline));
    }

    #[tokio::test]
    async fn test_watcher_sees_transition() {
        let monitor = ConnectivityMonitor::new(Connectivity::Online);
        let mut watcher = monitor.subscribe();

        monitor.set(Connectivity::Offline);
        assert_eq!(watcher.next_transition().await, Some(Transition::WentOffline));

        monitor.set(Connectivity::Online);
        assert_eq!(watcher.next_transition().await, Some(Transition::CameOnline));
        assert_eq!(watcher.last(), Connectivity::Online);
    }

    #[tokio::test]
    async fn test_watcher_ends_with_monitor() {
        let monitor = ConnectivityMonitor::new(Connectivity::Offline);
        let mut watcher = monitor.subscribe();
        drop(monitor);
        assert_eq!(watcher.next_transition().await, None);
    }
}
