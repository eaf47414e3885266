//! Container runtime boundary.

use async_trait::async_trait;

use crate::error::RuntimeError;

/// Restart policy applied to long-lived shared containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartPolicy {
    No,
    Always,
}

impl RestartPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RestartPolicy::No => "no",
            RestartPolicy::Always => "always",
        }
    }
}

/// Everything needed to create and start a detached container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub network: String,
    pub env: Vec<(String, String)>,
    /// `(container port spec, host port)`, e.g. `("80/tcp", 8080)`.
    pub ports: Vec<(String, u16)>,
    pub restart: RestartPolicy,
}

impl ContainerSpec {
    pub fn new(name: impl Into<String>, image: impl Into<String>, network: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            network: network.into(),
            env: Vec::new(),
            ports: Vec::new(),
            restart: RestartPolicy::No,
        }
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn port(mut self, container_port: impl Into<String>, host_port: u16) -> Self {
        self.ports.push((container_port.into(), host_port));
        self
    }

    pub fn restart(mut self, policy: RestartPolicy) -> Self {
        self.restart = policy;
        self
    }
}

/// A shell command to execute inside a running container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRequest {
    pub command: String,
    pub user: Option<String>,
    pub workdir: Option<String>,
}

impl ExecRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            user: None,
            workdir: None,
        }
    }

    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn workdir(mut self, workdir: impl Into<String>) -> Self {
        self.workdir = Some(workdir.into());
        self
    }
}

/// Exit status and combined output of an executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub output: String,
}

impl ExecOutput {
    pub fn new(exit_code: i32, output: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: output.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Output with surrounding whitespace removed.
    pub fn trimmed(&self) -> &str {
        self.output.trim()
    }
}

/// Operations the provisioner needs from a container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Runtime version string; used as a reachability check.
    async fn version(&self) -> Result<String, RuntimeError>;

    async fn network_exists(&self, name: &str) -> Result<bool, RuntimeError>;

    /// Creates a bridge network.
    async fn create_network(&self, name: &str) -> Result<(), RuntimeError>;

    async fn container_exists(&self, name: &str) -> Result<bool, RuntimeError>;

    /// Creates and starts a detached container.
    async fn run_container(&self, spec: &ContainerSpec) -> Result<(), RuntimeError>;

    /// Executes a shell command and waits for it. A non-zero exit is
    /// reported through [`ExecOutput::exit_code`], not as an error.
    async fn exec(&self, container: &str, request: &ExecRequest) -> Result<ExecOutput, RuntimeError>;

    /// Extracts a tar archive into a directory inside the container.
    async fn copy_archive(
        &self,
        container: &str,
        dest_dir: &str,
        archive: Vec<u8>,
    ) -> Result<(), RuntimeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_container_spec_builder() {
        let spec = ContainerSpec::new("db", "mysql:5.7", "net")
            .env("MYSQL_DATABASE", "wordpress")
            .port("80/tcp", 8080)
            .restart(RestartPolicy::Always);
        assert_eq!(spec.env, vec![("MYSQL_DATABASE".to_string(), "wordpress".to_string())]);
        assert_eq!(spec.ports, vec![("80/tcp".to_string(), 8080)]);
        assert_eq!(spec.restart.as_str(), "always");
    }

    #[test]
    fn test_exec_output_helpers() {
        let out = ExecOutput::new(0, "  42\n");
        assert!(out.success());
        assert_eq!(out.trimmed(), "42");
        assert!(!ExecOutput::new(1, "").success());
    }
}
