//! Cache manager lifecycle.

use serde::{Deserialize, Serialize};

/// Lifecycle states of a cache manager version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    /// Constructed, not yet installing.
    Parsed,
    /// Provisioning the static cache.
    Installing,
    /// Provisioned and waiting to take over.
    Installed,
    /// Removing obsolete caches.
    Activating,
    /// In control of every client.
    Activated,
    /// Superseded by a newer version.
    Redundant,
}

impl WorkerState {
    /// Whether `next` is a legal successor of this state.
    ///
    /// Any state may become redundant; otherwise states only move forward one step.
    pub fn can_transition_to(self, next: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, next),
            (Parsed, Installing)
                | (Installing, Installed)
                | (Installed, Activating)
                | (Activating, Activated)
                | (_, Redundant)
        )
    }

    /// Whether this version controls clients.
    pub fn is_active(self) -> bool {
        self == WorkerState::Activated
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        };
        f.write_str(name)
    }
}

/// Outcome of provisioning the static cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallReport {
    /// Shell assets stored.
    pub cached: Vec<String>,
    /// Shell assets that could not be fetched or stored.
    pub failed: Vec<String>,
}

impl InstallReport {
    /// Whether every shell asset was stored.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Outcome of promotion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// Obsolete caches removed.
    pub deleted: Vec<String>,
    /// Whether clients were claimed.
    pub claimed: bool,
}
