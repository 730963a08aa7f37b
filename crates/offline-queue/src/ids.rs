//! Newtype IDs for type-safe identifiers.
//!
//! Using newtypes prevents accidentally mixing up different ID types,
//! e.g., passing a ProductId where a VariantId is expected.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Macro to generate newtype ID structs.
macro_rules! define_id {
    ($name:ident) => {
        /// A unique identifier.
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from a string.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume and return the inner string.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ActionId);
define_id!(ProductId);
define_id!(VariantId);

/// Highest action id handed out or observed in this process.
static LAST_ACTION_ID: AtomicU64 = AtomicU64::new(0);

impl ActionId {
    /// Next action id for a recording made at `now_millis`.
    ///
    /// Ids are the recording time in milliseconds, bumped past the last id so
    /// they stay strictly increasing when several actions share a millisecond.
    pub fn next(now_millis: u64) -> Self {
        let mut last = LAST_ACTION_ID.load(Ordering::SeqCst);
        loop {
            let candidate = next_after(last, now_millis);
            match LAST_ACTION_ID.compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return Self(candidate.to_string()),
                Err(current) => last = current,
            }
        }
    }

    /// Record an id loaded from storage so later ids sort after it.
    pub fn observe(&self) {
        if let Some(value) = self.as_millis() {
            LAST_ACTION_ID.fetch_max(value, Ordering::SeqCst);
        }
    }

    /// The numeric value, for ids minted by [`ActionId::next`].
    pub fn as_millis(&self) -> Option<u64> {
        self.0.parse().ok()
    }
}

/// The id following `last` at `now_millis`; saturates at `u64::MAX`.
fn next_after(last: u64, now_millis: u64) -> u64 {
    now_millis.max(last.saturating_add(1))
}
