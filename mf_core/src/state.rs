use errors::StateError;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle of one provisioned resource, per test run.
///
/// `Starting -> Ready` occurs only on a successful readiness probe.
/// `Failed` is terminal except for cleanup-on-failure teardown.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "camelCase")]
#[strum(serialize_all = "camelCase")]
pub enum LifecycleState {
    Unstarted,
    Starting,
    Ready,
    Running,
    Stopping,
    Stopped,
    Failed,
}

impl LifecycleState {
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Unstarted, Self::Starting)
                | (Self::Starting, Self::Ready)
                | (Self::Starting, Self::Failed)
                | (Self::Ready, Self::Running)
                | (Self::Ready, Self::Stopping)
                | (Self::Running, Self::Stopping)
                | (Self::Stopping, Self::Stopped)
                | (Self::Failed, Self::Stopped)
        )
    }

    /// Transition or fail loudly with the offending pair.
    pub fn transition_to(self, next: Self) -> Result<Self, StateError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(StateError::InvalidTransition {
                from: self.to_string(),
                to: next.to_string()
            })
        }
    }

    /// Connection facts may be read in these states.
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Ready | Self::Running)
    }

    /// No further transitions except teardown bookkeeping.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped)
    }
}
