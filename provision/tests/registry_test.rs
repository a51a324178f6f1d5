//! Registry semantics tests over an in-memory runtime: reuse keying,
//! teardown idempotence, and failure paths, with no container engine
//! involved.

use std::sync::Arc;
use std::sync::atomic::{AtomicU16, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use errors::{ProbeError, ProvisionError};
use mf_core::state::LifecycleState;
use mf_core::traits::{ReadinessProbe, ResourceRuntime};
use mf_core::types::{ConnectionFacts, ResourceId, ResourceSpec};
use parking_lot::Mutex;
use provision::ResourceRegistry;

#[derive(Default)]
struct FakeRuntime {
    next_port: AtomicU16,
    started: Mutex<Vec<ResourceId>>,
    stopped: Mutex<Vec<ResourceId>>,
    fail_start: bool
}

impl FakeRuntime {
    fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    fn start_count(&self) -> usize {
        self.started.lock().len()
    }

    fn stop_count(&self) -> usize {
        self.stopped.lock().len()
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

struct AlwaysReadyProbe;

#[async_trait]
impl ReadinessProbe for AlwaysReadyProbe {
    async fn probe(&self, _facts: &ConnectionFacts) -> Result<(), ProbeError> {
        Ok(())
    }
}

struct NeverReadyProbe;

#[async_trait]
impl ReadinessProbe for NeverReadyProbe {
    async fn probe(&self, _facts: &ConnectionFacts) -> Result<(), ProbeError> {
        Err(ProbeError::Io {
            reason: "connection refused".to_string()
        })
    }
}

fn spec() -> ResourceSpec {
    ResourceSpec::new("postgres", "16-alpine")
        .with_exposed_port(5432)
        .with_credentials("testuser", "testpass")
        .with_database("testdb")
}

fn registry() -> (Arc<FakeRuntime>, ResourceRegistry) {
    let runtime = Arc::new(FakeRuntime::default());
    let registry = ResourceRegistry::new(runtime.clone());
    (runtime, registry)
}

#[tokio::test]
async fn test_fresh_spec_gets_distinct_instances() {
    let (runtime, registry) = registry();

    let first = registry.acquire_with(spec(), &AlwaysReadyProbe).await.unwrap();
    let second = registry.acquire_with(spec(), &AlwaysReadyProbe).await.unwrap();

    assert_eq!(runtime.start_count(), 2);
    assert_ne!(first.id(), second.id());
    assert_ne!(
        first.connection_facts().unwrap().port(),
        second.connection_facts().unwrap().port()
    );
}

#[tokio::test]
async fn test_reusable_spec_shares_one_instance() {
    let (runtime, registry) = registry();
    let reusable = spec().with_reuse(true);

    let first = registry
        .acquire_with(reusable.clone(), &AlwaysReadyProbe)
        .await
        .unwrap();
    let second = registry
        .acquire_with(reusable, &AlwaysReadyProbe)
        .await
        .unwrap();

    assert_eq!(runtime.start_count(), 1);
    assert_eq!(first.id(), second.id());
    assert_eq!(
        first.connection_facts().unwrap(),
        second.connection_facts().unwrap()
    );
    assert_eq!(registry.reusable_count(), 1);
}

#[tokio::test]
async fn test_non_equivalent_specs_never_share() {
    let (runtime, registry) = registry();

    let a = registry
        .acquire_with(spec().with_reuse(true), &AlwaysReadyProbe)
        .await
        .unwrap();
    let b = registry
        .acquire_with(
            spec().with_reuse(true).with_database("otherdb"),
            &AlwaysReadyProbe
        )
        .await
        .unwrap();

    assert_eq!(runtime.start_count(), 2);
    assert_ne!(a.id(), b.id());
    assert_eq!(registry.reusable_count(), 2);
}

#[tokio::test]
async fn test_concurrent_acquires_of_equivalent_spec_start_once() {
    let (runtime, registry) = registry();
    let registry = Arc::new(registry);
    let reusable = spec().with_reuse(true);

    let (a, b) = tokio::join!(
        registry.acquire_with(reusable.clone(), &AlwaysReadyProbe),
        registry.acquire_with(reusable.clone(), &AlwaysReadyProbe)
    );

    assert_eq!(runtime.start_count(), 1);
    assert_eq!(a.unwrap().id(), b.unwrap().id());
}

#[tokio::test]
async fn test_release_is_idempotent() {
    let (runtime, registry) = registry();
    let handle = registry.acquire_with(spec(), &AlwaysReadyProbe).await.unwrap();

    registry.release(&handle).await;
    registry.release(&handle).await;

    assert_eq!(handle.state(), LifecycleState::Stopped);
    assert_eq!(runtime.stop_count(), 1);
}

#[tokio::test]
async fn test_released_handle_no_longer_serves_facts() {
    let (_runtime, registry) = registry();
    let handle = registry.acquire_with(spec(), &AlwaysReadyProbe).await.unwrap();
    assert!(handle.connection_facts().is_ok());

    registry.release(&handle).await;

    let err = handle.connection_facts().unwrap_err();
    assert_eq!(err.state, "stopped");
}

#[tokio::test]
async fn test_released_reusable_instance_is_not_handed_out_again() {
    let (runtime, registry) = registry();
    let reusable = spec().with_reuse(true);

    let first = registry
        .acquire_with(reusable.clone(), &AlwaysReadyProbe)
        .await
        .unwrap();
    registry.release(&first).await;
    assert_eq!(registry.reusable_count(), 0);

    let second = registry
        .acquire_with(reusable, &AlwaysReadyProbe)
        .await
        .unwrap();

    assert_eq!(runtime.start_count(), 2);
    assert_ne!(first.id(), second.id());
    assert!(second.connection_facts().is_ok());
}

#[tokio::test]
async fn test_readiness_timeout_tears_down_the_partial_instance() {
    let (runtime, registry) = registry();
    let short = spec().with_startup_timeout(Duration::from_millis(200));

    let err = registry
        .acquire_with(short, &NeverReadyProbe)
        .await
        .unwrap_err();

    match err {
        ProvisionError::Timeout { image, waited_ms } => {
            assert_eq!(image, "postgres:16-alpine");
            assert_eq!(waited_ms, 200);
        }
        other => panic!("expected Timeout, got {other}")
    }
    // No orphan: the partially started instance was stopped
    assert_eq!(runtime.start_count(), 1);
    assert_eq!(runtime.stop_count(), 1);
}

#[tokio::test]
async fn test_start_failure_surfaces_immediately() {
    let runtime = Arc::new(FakeRuntime::failing());
    let registry = ResourceRegistry::new(runtime.clone());

    let err = registry
        .acquire_with(spec(), &AlwaysReadyProbe)
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::StartFailed { .. }));
    assert_eq!(runtime.stop_count(), 0);
}

#[tokio::test]
async fn test_invalid_spec_is_rejected_before_the_runtime_is_touched() {
    let (runtime, registry) = registry();

    let err = registry
        .acquire_with(ResourceSpec::new("", "latest"), &AlwaysReadyProbe)
        .await
        .unwrap_err();

    assert!(matches!(err, ProvisionError::InvalidSpec { .. }));
    assert_eq!(runtime.start_count(), 0);
}
