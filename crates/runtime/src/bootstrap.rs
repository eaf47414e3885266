//! Prepares the application container for the control-plane tool.

use tracing::{info, warn};

use crate::error::RuntimeError;
use crate::runner::CommandRunner;

pub const DEFAULT_WP_CLI_URL: &str =
    "https://raw.githubusercontent.com/wp-cli/builds/gh-pages/phar/wp-cli.phar";
pub const DEFAULT_MEMORY_LIMIT: &str = "512M";

const WP_CLI_PATH: &str = "/usr/local/bin/wp";
const PHP_CONF_PATH: &str = "/usr/local/etc/php/conf.d/memory-limit.ini";

/// Installs WP-CLI and the packages the provisioning steps rely on.
///
/// Each step is idempotent; failures are logged and reported back as a
/// list of human-readable lines, never raised.
#[derive(Debug, Clone)]
pub struct EnvironmentBootstrapper {
    wp_cli_url: String,
    memory_limit: String,
}

impl Default for EnvironmentBootstrapper {
    fn default() -> Self {
        Self::new(DEFAULT_WP_CLI_URL, DEFAULT_MEMORY_LIMIT)
    }
}

impl EnvironmentBootstrapper {
    pub fn new(wp_cli_url: impl Into<String>, memory_limit: impl Into<String>) -> Self {
        Self {
            wp_cli_url: wp_cli_url.into(),
            memory_limit: memory_limit.into(),
        }
    }

    /// Runs the bootstrap sequence and returns one line per step.
    pub async fn bootstrap(&self, runner: &CommandRunner) -> Result<Vec<String>, RuntimeError> {
        let mut notes = Vec::new();

        let info = runner.run("wp --info --allow-root").await?;
        if info.success() {
            notes.push("wp-cli already installed".to_string());
        } else {
            info!(container = %runner.container(), "Installing wp-cli");
            let packages = runner
                .run("apt-get update && apt-get install -y less mariadb-client curl ca-certificates")
                .await?;
            self.note(&mut notes, "system packages", packages.success());

            let install = runner
                .run(&format!(
                    "curl -sSL -o {path} {url} && chmod +x {path}",
                    path = WP_CLI_PATH,
                    url = shared::shell::quote(&self.wp_cli_url)
                ))
                .await?;
            self.note(&mut notes, "wp-cli", install.success());
        }

        let unzip = runner
            .run("apt-get update && apt-get install -y unzip libxml2-dev")
            .await?;
        self.note(&mut notes, "unzip", unzip.success());

        // Images that ship the extension already are left alone.
        let xml = runner
            .run("php -m | grep -qix xml || docker-php-ext-install xml")
            .await?;
        self.note(&mut notes, "php-xml", xml.success());

        let memory = runner
            .run(&format!(
                "echo {} > {}",
                shared::shell::quote(&format!("memory_limit={}", self.memory_limit)),
                PHP_CONF_PATH
            ))
            .await?;
        self.note(&mut notes, "php memory limit", memory.success());

        Ok(notes)
    }

    fn note(&self, notes: &mut Vec<String>, what: &str, ok: bool) {
        if ok {
            notes.push(format!("{} installed", what));
        } else {
            warn!(step = what, "Bootstrap step failed");
            notes.push(format!("{} failed", what));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::mock::MockContainerRuntime;

    #[tokio::test]
    async fn test_skips_install_when_wp_cli_present() {
        let mock = MockContainerRuntime::new();
        let runner = CommandRunner::new(Arc::new(mock.clone()), "wp");
        let notes = EnvironmentBootstrapper::default().bootstrap(&runner).await.unwrap();

        assert_eq!(notes[0], "wp-cli already installed");
        assert!(mock.commands_matching("wp-cli.phar").is_empty());
        assert_eq!(mock.commands_matching("memory_limit=512M").len(), 1);
    }

    #[tokio::test]
    async fn test_installs_wp_cli_when_missing() {
        let mock = MockContainerRuntime::new();
        mock.respond("wp --info", 127, "sh: wp: not found");
        let runner = CommandRunner::new(Arc::new(mock.clone()), "wp");
        let notes = EnvironmentBootstrapper::default().bootstrap(&runner).await.unwrap();

        assert!(notes.contains(&"wp-cli installed".to_string()));
        assert_eq!(mock.commands_matching("mariadb-client").len(), 1);
        assert_eq!(mock.commands_matching("chmod +x /usr/local/bin/wp").len(), 1);
    }

    #[tokio::test]
    async fn test_failed_step_is_reported_not_raised() {
        let mock = MockContainerRuntime::new();
        mock.respond("memory_limit", 1, "permission denied");
        let runner = CommandRunner::new(Arc::new(mock), "wp");
        let notes = EnvironmentBootstrapper::default().bootstrap(&runner).await.unwrap();
        assert!(notes.contains(&"php memory limit failed".to_string()));
    }

    #[tokio::test]
    async fn test_package_failures_are_not_masked() {
        let mock = MockContainerRuntime::new();
        mock.respond("install -y unzip", 100, "E: Unable to locate package unzip");
        mock.respond("docker-php-ext-install xml", 1, "configure: error: libxml2 not found");
        let runner = CommandRunner::new(Arc::new(mock), "wp");
        let notes = EnvironmentBootstrapper::default().bootstrap(&runner).await.unwrap();

        assert!(notes.contains(&"unzip failed".to_string()));
        assert!(notes.contains(&"php-xml failed".to_string()));
        assert!(notes.contains(&"php memory limit installed".to_string()));
    }

    #[tokio::test]
    async fn test_package_steps_succeed_independently() {
        let mock = MockContainerRuntime::new();
        mock.respond("docker-php-ext-install xml", 1, "build failed");
        let runner = CommandRunner::new(Arc::new(mock), "wp");
        let notes = EnvironmentBootstrapper::default().bootstrap(&runner).await.unwrap();

        assert!(notes.contains(&"unzip installed".to_string()));
        assert!(notes.contains(&"php-xml failed".to_string()));
    }
}
