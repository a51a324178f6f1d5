use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicU32, Ordering};

use provision::{ContainerRuntime, ResourceHandle, ResourceRegistry, SqlPingProbe, specs};
use tokio::sync::OnceCell;

static TEST_COUNTER: AtomicU32 = AtomicU32::new(0);

pub fn unique_id(prefix: &str) -> String {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}", prefix, id)
}

pub fn unique_email(prefix: &str) -> String {
    let id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
    format!("{}-{}@example.com", prefix, id)
}

static INIT: Once = Once::new();

/// Initialize test logging (idempotent)
pub fn init_test_logging() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::from_default_env()
                    .add_directive("provision=debug".parse().unwrap())
                    .add_directive("config=debug".parse().unwrap())
            )
            .with_test_writer()
            .try_init()
            .ok();
    });
}

static REGISTRY: OnceCell<ResourceRegistry> = OnceCell::const_new();

/// The process-wide resource registry every fixture provisions through.
pub async fn registry() -> &'static ResourceRegistry {
    REGISTRY
        .get_or_init(|| async { ResourceRegistry::new(Arc::new(ContainerRuntime::new())) })
        .await
}

pub struct PostgresFixture {
    handle: Arc<ResourceHandle>,
    url: String
}

impl PostgresFixture {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn handle(&self) -> &Arc<ResourceHandle> {
        &self.handle
    }
}

static POSTGRES: OnceCell<Option<PostgresFixture>> = OnceCell::const_new();

pub async fn postgres() -> Option<&'static PostgresFixture> {
    POSTGRES
        .get_or_init(|| async {
            init_test_logging();
            let registry = registry().await;
            let spec = specs::postgres().with_reuse(true);

            match registry.acquire_with(spec, &SqlPingProbe).await {
                Ok(handle) => {
                    let facts = match handle.connection_facts() {
                        Ok(facts) => facts,
                        Err(e) => {
                            tracing::warn!("PostgreSQL fixture facts unavailable: {e}");
                            return None;
                        }
                    };
                    let Some(url) = facts.postgres_url() else {
                        tracing::warn!("PostgreSQL fixture facts carry no url");
                        return None;
                    };
                    tracing::info!("PostgreSQL fixture started on port {:?}", facts.port());
                    Some(PostgresFixture { handle, url })
                }
                Err(e) => {
                    tracing::warn!("Failed to start PostgreSQL container: {e}");
                    None
                }
            }
        })
        .await
        .as_ref()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_id_generation() {
        let id1 = unique_id("test");
        let id2 = unique_id("test");
        assert_ne!(id1, id2);
        assert!(id1.starts_with("test-"));
        assert!(id2.starts_with("test-"));
    }

    #[test]
    fn test_unique_email_shape() {
        let email = unique_email("customer");
        assert!(email.starts_with("customer-"));
        assert!(email.ends_with("@example.com"));
    }
}
