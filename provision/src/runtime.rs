//! Container-backed resource runtime.

use async_trait::async_trait;
use dashmap::DashMap;
use errors::ProvisionError;
use futures_util::future::BoxFuture;
use mf_core::traits::ResourceRuntime;
use mf_core::types::{ConnectionFacts, ResourceId, ResourceSpec};
use testcontainers::core::logs::LogFrame;
use testcontainers::core::logs::consumer::LogConsumer;
use testcontainers::core::ContainerPort;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

/// Forwards container stdout/stderr into the host `tracing` pipeline so
/// resource logs land next to test logs.
struct TracingLogConsumer {
    image: String
}

impl TracingLogConsumer {
    fn new(image: String) -> Self {
        Self { image }
    }
}

impl LogConsumer for TracingLogConsumer {
    fn accept<'a>(&'a self, record: &'a LogFrame) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            match record {
                LogFrame::StdOut(bytes) => {
                    tracing::debug!(
                        target: "mayfly::container",
                        image = %self.image,
                        "{}",
                        String::from_utf8_lossy(bytes).trim_end()
                    );
                }
                LogFrame::StdErr(bytes) => {
                    tracing::debug!(
                        target: "mayfly::container",
                        image = %self.image,
                        stream = "stderr",
                        "{}",
                        String::from_utf8_lossy(bytes).trim_end()
                    );
                }
            }
        })
    }
}

/// [`ResourceRuntime`] over a local container engine, via testcontainers.
///
/// Host ports are assigned dynamically by the engine at start time, which
/// keeps concurrent test runs from colliding and keeps connection details
/// out of source.
pub struct ContainerRuntime {
    containers: DashMap<ResourceId, ContainerAsync<GenericImage>>
}

impl ContainerRuntime {
    pub fn new() -> Self {
        Self {
            containers: DashMap::new()
        }
    }

    /// Number of instances this runtime currently tracks.
    pub fn live_count(&self) -> usize {
        self.containers.len()
    }
}

impl Default for ContainerRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceRuntime for ContainerRuntime {
    async fn start(
        &self,
        id: &ResourceId,
        spec: &ResourceSpec
    ) -> Result<ConnectionFacts, ProvisionError> {
        let mut image = GenericImage::new(spec.image.clone(), spec.tag.clone());
        for port in &spec.exposed_ports {
            image = image.with_exposed_port(ContainerPort::Tcp(*port));
        }

        let mut request = image
            .with_log_consumer(TracingLogConsumer::new(spec.image_ref()))
            .with_startup_timeout(spec.startup_timeout);
        for (key, value) in &spec.env {
            request = request.with_env_var(key, value);
        }
        if !spec.cmd.is_empty() {
            request = request.with_cmd(spec.cmd.clone());
        }

        let container =
            request
                .start()
                .await
                .map_err(|e| ProvisionError::StartFailed {
                    image: spec.image_ref(),
                    reason: e.to_string()
                })?;

        let host = container
            .get_host()
            .await
            .map_err(|e| ProvisionError::Runtime {
                reason: e.to_string()
            })?
            .to_string();

        let mut facts = ConnectionFacts::new(host);
        for port in &spec.exposed_ports {
            let mapped =
                container
                    .get_host_port_ipv4(*port)
                    .await
                    .map_err(|e| ProvisionError::Runtime {
                        reason: e.to_string()
                    })?;
            facts = facts.with_port(*port, mapped);
        }
        if let Some(creds) = &spec.credentials {
            facts = facts.with_credentials(creds.username.clone(), creds.password.clone());
        }
        if let Some(database) = &spec.database {
            facts = facts.with_database(database.clone());
        }

        tracing::info!(
            resource = %id,
            image = %spec.image_ref(),
            host = %facts.host,
            port = ?facts.port(),
            "container started"
        );
        self.containers.insert(id.clone(), container);
        Ok(facts)
    }

    async fn stop(&self, id: &ResourceId) -> Result<(), ProvisionError> {
        // Unknown id means the instance already exited or was never ours;
        // teardown stays idempotent.
        let Some((_, container)) = self.containers.remove(id) else {
            tracing::debug!(resource = %id, "stop requested for untracked instance");
            return Ok(());
        };

        container.stop().await.map_err(|e| ProvisionError::Runtime {
            reason: e.to_string()
        })?;
        container.rm().await.map_err(|e| ProvisionError::Runtime {
            reason: e.to_string()
        })?;
        tracing::info!(resource = %id, "container stopped");
        Ok(())
    }
}
