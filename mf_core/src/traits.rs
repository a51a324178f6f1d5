//! Core traits for the provisioning system

use async_trait::async_trait;
use errors::{ProbeError, ProvisionError};

use crate::types::{ConnectionFacts, ResourceId, ResourceSpec};

/// Backend that can create and destroy resource instances.
///
/// Instances are keyed by the caller-supplied [`ResourceId`] so teardown
/// can be requested long after start. The production implementation drives
/// a container runtime; tests may substitute an in-memory fake.
#[async_trait]
pub trait ResourceRuntime: Send + Sync {
    /// Create and start an instance of `spec`, returning the dynamically
    /// resolved connection parameters. Blocks until the runtime considers
    /// the process started; readiness beyond that is the provisioner's
    /// concern.
    async fn start(
        &self,
        id: &ResourceId,
        spec: &ResourceSpec
    ) -> Result<ConnectionFacts, ProvisionError>;

    /// Tear an instance down. Must be idempotent: stopping an instance
    /// that is unknown or already exited externally is not an error.
    async fn stop(&self, id: &ResourceId) -> Result<(), ProvisionError>;
}

/// A check that determines when a started resource can accept real
/// traffic: a connection attempt for databases, a health endpoint for
/// other services.
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    async fn probe(&self, facts: &ConnectionFacts) -> Result<(), ProbeError>;
}
