use std::sync::Arc;

use dashmap::DashMap;
use errors::ProvisionError;
use mf_core::state::LifecycleState;
use mf_core::traits::{ReadinessProbe, ResourceRuntime};
use mf_core::types::ResourceSpec;
use tokio::sync::Mutex;

use crate::handle::{ResourceHandle, TeardownDecision};
use crate::probe::{TcpProbe, wait_until_ready};

/// Explicit, injectable registry of provisioned resources.
///
/// Replaces ambient process-global container state with acquire/release
/// lifecycle calls. Reusable specs are deduplicated to at most one live
/// instance per equivalent spec; non-equivalent specs never share an
/// instance; specs without reuse get a fresh instance per `acquire`.
pub struct ResourceRegistry {
    runtime: Arc<dyn ResourceRuntime>,
    reusable: DashMap<ResourceSpec, Arc<ResourceHandle>>,
    // Serializes reuse-path starts so concurrent acquires of an equivalent
    // spec cannot race two instances into existence.
    reuse_start: Mutex<()>
}

impl ResourceRegistry {
    pub fn new(runtime: Arc<dyn ResourceRuntime>) -> Self {
        Self {
            runtime,
            reusable: DashMap::new(),
            reuse_start: Mutex::new(())
        }
    }

    /// Provision an instance of `spec` and block until it is healthy.
    ///
    /// Readiness is checked with a TCP connect against the first mapped
    /// port; use [`acquire_with`](Self::acquire_with) for a protocol-aware
    /// probe. Returns only a `Ready` handle or an error; on timeout the
    /// partially started instance has already been torn down.
    pub async fn acquire(
        &self,
        spec: ResourceSpec
    ) -> Result<Arc<ResourceHandle>, ProvisionError> {
        self.acquire_with(spec, &TcpProbe).await
    }

    /// [`acquire`](Self::acquire) with a caller-selected readiness probe.
    pub async fn acquire_with(
        &self,
        spec: ResourceSpec,
        probe: &dyn ReadinessProbe
    ) -> Result<Arc<ResourceHandle>, ProvisionError> {
        spec.check()?;

        if !spec.reuse {
            return self.start_instance(spec, probe).await;
        }

        let _guard = self.reuse_start.lock().await;
        if let Some(existing) = self.reusable.get(&spec) {
            let handle = existing.value().clone();
            drop(existing);
            if handle.state().is_ready() {
                tracing::debug!(
                    resource = %handle.id(),
                    image = %spec.image_ref(),
                    "reusing live instance for equivalent spec"
                );
                return Ok(handle);
            }
            // Released or failed since registration; start fresh below.
            self.reusable.remove(&spec);
        }

        let handle = self.start_instance(spec.clone(), probe).await?;
        self.reusable.insert(spec, handle.clone());
        Ok(handle)
    }

    async fn start_instance(
        &self,
        spec: ResourceSpec,
        probe: &dyn ReadinessProbe
    ) -> Result<Arc<ResourceHandle>, ProvisionError> {
        let handle = Arc::new(ResourceHandle::new(spec));
        let spec = handle.spec();

        handle
            .transition(LifecycleState::Starting)
            .map_err(|e| ProvisionError::Runtime {
                reason: e.to_string()
            })?;

        let facts = match self.runtime.start(handle.id(), spec).await {
            Ok(facts) => facts,
            Err(e) => {
                handle.force_state(LifecycleState::Failed);
                return Err(e);
            }
        };

        if let Err(probe_err) =
            wait_until_ready(probe, &facts, spec.startup_timeout).await
        {
            // Timeout forces teardown of whatever partially started, so no
            // orphaned instance outlives the failed acquire.
            tracing::warn!(
                resource = %handle.id(),
                image = %spec.image_ref(),
                error = %probe_err,
                "resource never became healthy; tearing down"
            );
            let waited_ms = u64::try_from(spec.startup_timeout.as_millis()).unwrap_or(u64::MAX);
            let image = spec.image_ref();
            handle.force_state(LifecycleState::Failed);
            self.stop_quietly(&handle).await;
            return Err(ProvisionError::Timeout { image, waited_ms });
        }

        handle.set_facts(facts);
        handle
            .transition(LifecycleState::Ready)
            .map_err(|e| ProvisionError::Runtime {
                reason: e.to_string()
            })?;
        tracing::info!(
            resource = %handle.id(),
            image = %handle.spec().image_ref(),
            "resource ready"
        );
        Ok(handle)
    }

    /// Tear a resource down. Idempotent: releasing a handle twice, or a
    /// handle whose instance already exited externally, never errors.
    /// Secondary teardown failures are logged and swallowed so they cannot
    /// mask the primary test result.
    pub async fn release(&self, handle: &Arc<ResourceHandle>) {
        match handle.begin_teardown() {
            TeardownDecision::AlreadyDone => {
                tracing::debug!(resource = %handle.id(), "release on already-stopped handle");
            }
            TeardownDecision::NotStarted => {
                tracing::debug!(
                    resource = %handle.id(),
                    "release on handle not yet started; nothing to do"
                );
            }
            TeardownDecision::CleanupFailure | TeardownDecision::Proceed => {
                self.stop_quietly(handle).await;
            }
        }
    }

    /// Best-effort teardown; settles the handle at `Stopped`.
    async fn stop_quietly(&self, handle: &Arc<ResourceHandle>) {
        self.drop_reusable_entry(handle);
        if let Err(e) = self.runtime.stop(handle.id()).await {
            tracing::warn!(
                resource = %handle.id(),
                error = %e,
                "teardown error ignored"
            );
        }
        handle.settle_stopped();
    }

    fn drop_reusable_entry(&self, handle: &Arc<ResourceHandle>) {
        if handle.spec().reuse {
            self.reusable
                .remove_if(handle.spec(), |_, registered| {
                    Arc::ptr_eq(registered, handle)
                });
        }
    }

    /// Number of live reusable instances currently registered.
    pub fn reusable_count(&self) -> usize {
        self.reusable.len()
    }
}
