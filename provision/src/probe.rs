//! Readiness probes: connection-level checks run after the runtime
//! reports a resource started.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use errors::ProbeError;
use mf_core::traits::ReadinessProbe;
use mf_core::types::ConnectionFacts;
use sqlx::Connection;
use tokio_retry::Retry;
use tokio_retry::strategy::ExponentialBackoff;

/// Probe that attempts a raw TCP connect against the first mapped port.
/// Suitable for any service that accepts connections once healthy.
pub struct TcpProbe;

#[async_trait]
impl ReadinessProbe for TcpProbe {
    async fn probe(&self, facts: &ConnectionFacts) -> Result<(), ProbeError> {
        let port = facts.port().ok_or_else(|| ProbeError::Io {
            reason: "no mapped port to probe".to_string()
        })?;
        tokio::net::TcpStream::connect((facts.host.as_str(), port))
            .await
            .map(|_| ())
            .map_err(|e| ProbeError::Io {
                reason: e.to_string()
            })
    }
}

/// Probe that opens a real PostgreSQL connection and runs `SELECT 1`.
/// Connection-accepting is not the same as query-ready during database
/// bootstrap, so databases get this instead of [`TcpProbe`].
pub struct SqlPingProbe;

#[async_trait]
impl ReadinessProbe for SqlPingProbe {
    async fn probe(&self, facts: &ConnectionFacts) -> Result<(), ProbeError> {
        let url = facts.postgres_url().ok_or_else(|| ProbeError::Sql {
            reason: "facts carry no database url".to_string()
        })?;
        let mut conn = sqlx::postgres::PgConnection::connect(&url)
            .await
            .map_err(|e| ProbeError::Io {
                reason: e.to_string()
            })?;
        sqlx::query("SELECT 1")
            .execute(&mut conn)
            .await
            .map_err(|e| ProbeError::Sql {
                reason: e.to_string()
            })?;
        conn.close().await.ok();
        Ok(())
    }
}

/// Run `probe` under exponential backoff until it succeeds or `timeout`
/// elapses. Returns `ProbeError::Exhausted` with the attempt count when
/// the window closes without a healthy result.
pub async fn wait_until_ready(
    probe: &dyn ReadinessProbe,
    facts: &ConnectionFacts,
    timeout: Duration
) -> Result<(), ProbeError> {
    let strategy = ExponentialBackoff::from_millis(100).max_delay(Duration::from_secs(2));
    let attempts = AtomicU32::new(0);

    let outcome = tokio::time::timeout(
        timeout,
        Retry::spawn(strategy, || {
            attempts.fetch_add(1, Ordering::Relaxed);
            probe.probe(facts)
        })
    )
    .await;

    match outcome {
        Ok(result) => result,
        Err(_elapsed) => Err(ProbeError::Exhausted {
            attempts: attempts.load(Ordering::Relaxed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FlakyProbe {
        failures_left: AtomicU32
    }

    #[async_trait]
    impl ReadinessProbe for FlakyProbe {
        async fn probe(&self, _facts: &ConnectionFacts) -> Result<(), ProbeError> {
            if self.failures_left.fetch_sub(1, Ordering::SeqCst) > 0 {
                Err(ProbeError::Io {
                    reason: "not yet".to_string()
                })
            } else {
                Ok(())
            }
        }
    }

    struct NeverReadyProbe;

    #[async_trait]
    impl ReadinessProbe for NeverReadyProbe {
        async fn probe(&self, _facts: &ConnectionFacts) -> Result<(), ProbeError> {
            Err(ProbeError::Io {
                reason: "never".to_string()
            })
        }
    }

    fn facts() -> ConnectionFacts {
        ConnectionFacts::new("localhost").with_port(5432, 49153)
    }

    #[tokio::test]
    async fn test_probe_retries_until_success() {
        let probe = FlakyProbe {
            failures_left: AtomicU32::new(3)
        };
        wait_until_ready(&probe, &facts(), Duration::from_secs(10))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_probe_window_closes_with_exhausted() {
        let err = wait_until_ready(&NeverReadyProbe, &facts(), Duration::from_millis(300))
            .await
            .unwrap_err();
        match err {
            ProbeError::Exhausted { attempts } => assert!(attempts >= 1),
            other => panic!("expected Exhausted, got {other:?}")
        }
    }

    #[tokio::test]
    async fn test_tcp_probe_requires_a_mapped_port() {
        let err = TcpProbe
            .probe(&ConnectionFacts::new("localhost"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProbeError::Io { .. }));
    }
}
