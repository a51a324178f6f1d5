//! In-memory runtime and probes for exercising provisioning and binding
//! logic without a container engine.

use std::sync::atomic::{AtomicU16, Ordering};

use async_trait::async_trait;
use errors::{ProbeError, ProvisionError};
use mf_core::traits::{ReadinessProbe, ResourceRuntime};
use mf_core::types::{ConnectionFacts, ResourceId, ResourceSpec};
use parking_lot::Mutex;

/// Resource runtime that hands out localhost facts with fresh fake ports
/// instead of starting real containers. Records every start and stop for
/// assertions.
#[derive(Default)]
pub struct FakeRuntime {
    next_port: AtomicU16,
    started: Mutex<Vec<ResourceId>>,
    stopped: Mutex<Vec<ResourceId>>,
    fail_start: bool
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime whose every start fails, as if the image were unpullable.
    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    pub fn start_count(&self) -> usize {
        self.started.lock().len()
    }

    pub fn stop_count(&self) -> usize {
        self.stopped.lock().len()
    }

    pub fn stopped_ids(&self) -> Vec<ResourceId> {
        self.stopped.lock().clone()
    }
}

#[async_trait]
impl ResourceRuntime for FakeRuntime {
    async fn start(
        &self,
        id: &ResourceId,
        spec: &ResourceSpec
    ) -> Result<ConnectionFacts, ProvisionError> {
        if self.fail_start {
            return Err(ProvisionError::StartFailed {
                image: spec.image_ref(),
                reason: "image pull failed".to_string()
            });
        }
        self.started.lock().push(id.clone());

        let mut facts = ConnectionFacts::new("localhost");
        for port in &spec.exposed_ports {
            facts = facts.with_port(*port, 49000 + self.next_port.fetch_add(1, Ordering::SeqCst));
        }
        if let Some(creds) = &spec.credentials {
            facts = facts.with_credentials(creds.username.clone(), creds.password.clone());
        }
        if let Some(db) = &spec.database {
            facts = facts.with_database(db.clone());
        }
        Ok(facts)
    }

    async fn stop(&self, id: &ResourceId) -> Result<(), ProvisionError> {
        self.stopped.lock().push(id.clone());
        Ok(())
    }
}

/// Probe that reports healthy immediately.
pub struct AlwaysReadyProbe;

#[async_trait]
impl ReadinessProbe for AlwaysReadyProbe {
    async fn probe(&self, _facts: &ConnectionFacts) -> Result<(), ProbeError> {
        Ok(())
    }
}

/// Probe that never reports healthy, for timeout-path tests.
pub struct NeverReadyProbe;

#[async_trait]
impl ReadinessProbe for NeverReadyProbe {
    async fn probe(&self, _facts: &ConnectionFacts) -> Result<(), ProbeError> {
        Err(ProbeError::Io {
            reason: "connection refused".to_string()
        })
    }
}
