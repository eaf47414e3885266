//! Database readiness probing.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use shared::shell::quote;

use crate::container::{ContainerRuntime, ExecRequest};

pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(3);
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(120);

/// Lower bound on how long a single attempt may take before it is
/// abandoned. Short intervals still leave the client time to connect.
const MIN_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(5);

/// Database the probe connects to.
#[derive(Debug, Clone)]
pub struct ProbeTarget {
    pub container: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ProbeTarget {
    fn command(&self) -> String {
        format!(
            "mysql -u{} -p{} -e {}",
            quote(&self.user),
            quote(&self.password),
            quote(&format!("USE {};", self.database))
        )
    }
}

/// Polls the database container until it accepts a connection or the
/// timeout elapses.
#[derive(Debug, Clone, Copy)]
pub struct ReadinessProber {
    interval: Duration,
    timeout: Duration,
}

impl Default for ReadinessProber {
    fn default() -> Self {
        Self::new(DEFAULT_PROBE_INTERVAL, DEFAULT_PROBE_TIMEOUT)
    }
}

impl ReadinessProber {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }

    /// Returns `true` once a probe succeeds. Runtime errors, non-zero exits
    /// and attempts that hang past their bound all count as "not ready yet".
    pub async fn wait_until_ready(&self, runtime: &dyn ContainerRuntime, target: &ProbeTarget) -> bool {
        let request = ExecRequest::new(target.command());
        let deadline = Instant::now() + self.timeout;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let remaining = deadline.saturating_duration_since(Instant::now());
            let bound = remaining.min(self.interval.max(MIN_ATTEMPT_TIMEOUT));

            match tokio::time::timeout(bound, runtime.exec(&target.container, &request)).await {
                Err(_) => {
                    debug!(
                        container = %target.container,
                        attempt,
                        bound_ms = bound.as_millis() as u64,
                        "Database probe timed out"
                    );
                }
                Ok(Ok(output)) if output.success() => {
                    info!(container = %target.container, attempt, "Database is ready");
                    return true;
                }
                Ok(Ok(output)) => {
                    debug!(
                        container = %target.container,
                        attempt,
                        exit_code = output.exit_code,
                        "Database not ready"
                    );
                }
                Ok(Err(e)) => {
                    debug!(container = %target.container, attempt, error = %e, "Database probe failed");
                }
            }

            if Instant::now() + self.interval > deadline {
                warn!(
                    container = %target.container,
                    attempts = attempt,
                    timeout_secs = self.timeout.as_secs(),
                    "Database did not become ready"
                );
                return false;
            }
            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerSpec, ExecOutput};
    use crate::error::RuntimeError;
    use crate::mock::MockContainerRuntime;
    use async_trait::async_trait;

    /// Runtime whose exec never returns, like a client stuck connecting.
    struct HangingRuntime;

    #[async_trait]
    impl ContainerRuntime for HangingRuntime {
        async fn version(&self) -> Result<String, RuntimeError> {
            Ok("hanging".to_string())
        }
        async fn network_exists(&self, _name: &str) -> Result<bool, RuntimeError> {
            Ok(true)
        }
        async fn create_network(&self, _name: &str) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn container_exists(&self, _name: &str) -> Result<bool, RuntimeError> {
            Ok(true)
        }
        async fn run_container(&self, _spec: &ContainerSpec) -> Result<(), RuntimeError> {
            Ok(())
        }
        async fn exec(&self, _container: &str, _request: &ExecRequest) -> Result<ExecOutput, RuntimeError> {
            std::future::pending().await
        }
        async fn copy_archive(
            &self,
            _container: &str,
            _dest_dir: &str,
            _archive: Vec<u8>,
        ) -> Result<(), RuntimeError> {
            Ok(())
        }
    }

    fn target() -> ProbeTarget {
        ProbeTarget {
            container: "db".to_string(),
            user: "wpuser".to_string(),
            password: "secret".to_string(),
            database: "wordpress".to_string(),
        }
    }

    fn fast() -> ReadinessProber {
        ReadinessProber::new(Duration::from_millis(5), Duration::from_millis(40))
    }

    #[test]
    fn test_probe_command() {
        assert_eq!(target().command(), "mysql -uwpuser -psecret -e 'USE wordpress;'");
    }

    #[tokio::test]
    async fn test_ready_on_first_attempt() {
        let mock = MockContainerRuntime::new();
        assert!(fast().wait_until_ready(&mock, &target()).await);
        assert_eq!(mock.execs().len(), 1);
    }

    #[tokio::test]
    async fn test_never_ready_times_out() {
        let mock = MockContainerRuntime::new();
        mock.respond("mysql", 1, "ERROR 2002 (HY000): Can't connect");
        assert!(!fast().wait_until_ready(&mock, &target()).await);
        assert!(mock.execs().len() > 1);
    }

    #[tokio::test]
    async fn test_unreachable_runtime_is_not_ready() {
        let mock = MockContainerRuntime::unreachable();
        assert!(!fast().wait_until_ready(&mock, &target()).await);
    }

    #[tokio::test]
    async fn test_hanging_attempt_respects_deadline() {
        let prober = ReadinessProber::new(Duration::from_millis(5), Duration::from_millis(100));
        let started = std::time::Instant::now();

        let ready = tokio::time::timeout(
            Duration::from_secs(5),
            prober.wait_until_ready(&HangingRuntime, &target()),
        )
        .await
        .expect("prober must give up on its own");

        assert!(!ready);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
