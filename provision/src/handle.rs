use std::sync::OnceLock;

use errors::{NotReadyError, StateError};
use mf_core::state::LifecycleState;
use mf_core::types::{ConnectionFacts, ResourceId, ResourceSpec};
use parking_lot::Mutex;

/// Live handle to one provisioned resource.
///
/// Owns the instance identity, the lifecycle state cell, and the resolved
/// connection facts. Facts are readable only once the resource reported
/// healthy; reading earlier is an ordering bug and fails loudly rather
/// than returning a stale or default value.
pub struct ResourceHandle {
    id: ResourceId,
    spec: ResourceSpec,
    state: Mutex<LifecycleState>,
    facts: OnceLock<ConnectionFacts>
}

impl ResourceHandle {
    pub(crate) fn new(spec: ResourceSpec) -> Self {
        Self {
            id: ResourceId::new(),
            spec,
            state: Mutex::new(LifecycleState::Unstarted),
            facts: OnceLock::new()
        }
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn spec(&self) -> &ResourceSpec {
        &self.spec
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    /// Connection parameters of the healthy resource.
    ///
    /// The first successful read marks the resource as consumed
    /// (`Ready -> Running`). Facts are stable for the lifetime of the
    /// handle; once teardown begins they are no longer served.
    pub fn connection_facts(&self) -> Result<ConnectionFacts, NotReadyError> {
        let mut state = self.state.lock();
        if !state.is_ready() {
            return Err(self.not_ready(*state));
        }
        if *state == LifecycleState::Ready {
            *state = LifecycleState::Running;
        }
        // Ready implies the facts slot was populated by the provisioner.
        self.facts
            .get()
            .cloned()
            .ok_or_else(|| self.not_ready(*state))
    }

    /// Fail-fast check for readiness-gated configuration accessors.
    pub fn ensure_ready(&self) -> Result<(), NotReadyError> {
        let state = self.state();
        if state.is_ready() {
            Ok(())
        } else {
            Err(self.not_ready(state))
        }
    }

    fn not_ready(&self, state: LifecycleState) -> NotReadyError {
        NotReadyError {
            resource: format!("{} ({})", self.spec.image_ref(), self.id),
            state: state.to_string()
        }
    }

    pub(crate) fn set_facts(&self, facts: ConnectionFacts) {
        if self.facts.set(facts).is_err() {
            tracing::error!(resource = %self.id, "connection facts set twice");
            debug_assert!(false, "connection facts set twice");
        }
    }

    /// Checked transition; an invalid pair is a provisioner bug.
    pub(crate) fn transition(&self, next: LifecycleState) -> Result<(), StateError> {
        let mut state = self.state.lock();
        match state.transition_to(next) {
            Ok(new_state) => {
                tracing::debug!(resource = %self.id, from = %*state, to = %new_state, "lifecycle transition");
                *state = new_state;
                Ok(())
            }
            Err(e) => {
                tracing::error!(resource = %self.id, error = %e, "invalid lifecycle transition");
                debug_assert!(false, "invalid lifecycle transition: {e}");
                Err(e)
            }
        }
    }

    /// Atomically claim the teardown of this handle. Exactly one caller
    /// gets `Proceed` (or `CleanupFailure` for a failed start); everyone
    /// else learns teardown is already done or was never needed.
    pub(crate) fn begin_teardown(&self) -> TeardownDecision {
        let mut state = self.state.lock();
        match *state {
            LifecycleState::Ready | LifecycleState::Running => {
                *state = LifecycleState::Stopping;
                TeardownDecision::Proceed
            }
            LifecycleState::Failed => TeardownDecision::CleanupFailure,
            LifecycleState::Stopping | LifecycleState::Stopped => TeardownDecision::AlreadyDone,
            LifecycleState::Unstarted | LifecycleState::Starting => TeardownDecision::NotStarted
        }
    }

    /// Record that teardown finished. Tolerates repeats so a second
    /// release can never escalate over the first.
    pub(crate) fn settle_stopped(&self) {
        let mut state = self.state.lock();
        if matches!(*state, LifecycleState::Stopping | LifecycleState::Failed) {
            *state = LifecycleState::Stopped;
        }
    }

    pub(crate) fn force_state(&self, state: LifecycleState) {
        *self.state.lock() = state;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TeardownDecision {
    Proceed,
    CleanupFailure,
    AlreadyDone,
    NotStarted
}

impl std::fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceHandle")
            .field("id", &self.id)
            .field("image", &self.spec.image_ref())
            .field("state", &self.state())
            .finish()
    }
}
