//! Coordinator State Machine
//!
//! One state per (type, destination):
//!
//! ```text
//! Disabled -> Starting -> Running <-> BackingOff
//!                 |          |            |
//!                 +------> Stopped <------+
//! ```
//!
//! `Stopped -> Starting` restarts a coordinator after a reload;
//! `Stopped|Running|BackingOff -> Disabled` is taken by the manager when the
//! type is switched off. Every other transition is illegal.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{ReplicationError, ReplicationResult};

/// Lifecycle state of one coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinatorState {
    /// Type is not configured to replicate.
    #[default]
    Disabled,
    /// Loop spawned, first fetch not yet answered.
    Starting,
    /// Fetching and applying.
    Running,
    /// Waiting after a failed round.
    BackingOff,
    /// Loop exited.
    Stopped,
}

impl CoordinatorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinatorState::Disabled => "Disabled",
            CoordinatorState::Starting => "Starting",
            CoordinatorState::Running => "Running",
            CoordinatorState::BackingOff => "BackingOff",
            CoordinatorState::Stopped => "Stopped",
        }
    }

    /// Whether a loop is alive in this state.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            CoordinatorState::Starting | CoordinatorState::Running | CoordinatorState::BackingOff
        )
    }

    pub fn can_transition_to(&self, next: CoordinatorState) -> bool {
        use CoordinatorState::*;

        if *self == next {
            return true;
        }
        matches!(
            (*self, next),
            (Disabled, Starting)
                | (Starting, Running)
                | (Starting, BackingOff)
                | (Starting, Stopped)
                | (Running, BackingOff)
                | (BackingOff, Running)
                | (Running, Stopped)
                | (BackingOff, Stopped)
                | (Stopped, Starting)
                | (Stopped, Disabled)
                | (Running, Disabled)
                | (BackingOff, Disabled)
        )
    }

    /// Move to `next`, or fail with `IllegalTransition`. Same-state is a no-op.
    pub fn transition_to(self, next: CoordinatorState) -> ReplicationResult<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(ReplicationError::illegal_transition(format!(
                "cannot transition from {} to {}",
                self, next
            )))
        }
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
