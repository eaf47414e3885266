//! Docker CLI implementation of the container runtime.
//!
//! Every operation shells out to the `docker` binary, so the service only
//! needs the CLI and access to the daemon socket.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::container::{ContainerRuntime, ContainerSpec, ExecOutput, ExecRequest};
use crate::error::RuntimeError;
use crate::wp_cli::REDACTED;

/// Container runtime backed by the Docker command-line client.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args).kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, source: std::io::Error) -> RuntimeError {
        RuntimeError::Spawn {
            binary: self.binary.clone(),
            source,
        }
    }

    /// Runs a docker subcommand that must succeed and returns its stdout.
    async fn run_checked(&self, args: Vec<String>) -> Result<String, RuntimeError> {
        debug!(binary = %self.binary, args = ?loggable_args(&args), "Running docker command");
        let output = self
            .command(&args)
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                command: format!("{} {}", self.binary, loggable_args(&args).join(" ")),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn list_names(&self, args: Vec<String>, name: &str) -> Result<bool, RuntimeError> {
        let stdout = self.run_checked(args).await?;
        Ok(stdout.lines().any(|line| line.trim() == name))
    }
}

/// Arguments for `docker run` from a container spec.
pub fn run_args(spec: &ContainerSpec) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "-d".to_string(),
        "--name".to_string(),
        spec.name.clone(),
        "--network".to_string(),
        spec.network.clone(),
        "--restart".to_string(),
        spec.restart.as_str().to_string(),
    ];
    for (key, value) in &spec.env {
        args.push("-e".to_string());
        args.push(format!("{}={}", key, value));
    }
    for (container_port, host_port) in &spec.ports {
        args.push("-p".to_string());
        args.push(format!("{}:{}", host_port, container_port));
    }
    args.push(spec.image.clone());
    args
}

/// Copy of `args` with the values of `-e` variables whose name mentions a
/// password or secret replaced, for logs and error messages.
pub fn loggable_args(args: &[String]) -> Vec<String> {
    let mut shown = Vec::with_capacity(args.len());
    let mut env_value_next = false;
    for arg in args {
        let is_env = env_value_next;
        env_value_next = arg == "-e";
        match arg.split_once('=') {
            Some((key, _)) if is_env && is_secret_name(key) => {
                shown.push(format!("{}={}", key, REDACTED));
            }
            _ => shown.push(arg.clone()),
        }
    }
    shown
}

fn is_secret_name(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    key.contains("PASSWORD") || key.contains("SECRET")
}

/// Arguments for `docker exec` running the command through `sh -c`.
pub fn exec_args(container: &str, request: &ExecRequest) -> Vec<String> {
    let mut args = vec!["exec".to_string()];
    if let Some(user) = &request.user {
        args.push("-u".to_string());
        args.push(user.clone());
    }
    if let Some(workdir) = &request.workdir {
        args.push("-w".to_string());
        args.push(workdir.clone());
    }
    args.push(container.to_string());
    args.push("sh".to_string());
    args.push("-c".to_string());
    args.push(request.command.clone());
    args
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn version(&self) -> Result<String, RuntimeError> {
        let out = self
            .run_checked(vec![
                "version".to_string(),
                "--format".to_string(),
                "{{.Server.Version}}".to_string(),
            ])
            .await?;
        Ok(out.trim().to_string())
    }

    async fn network_exists(&self, name: &str) -> Result<bool, RuntimeError> {
        self.list_names(
            vec![
                "network".to_string(),
                "ls".to_string(),
                "--filter".to_string(),
                format!("name=^{}$", name),
                "--format".to_string(),
                "{{.Name}}".to_string(),
            ],
            name,
        )
        .await
    }

    async fn create_network(&self, name: &str) -> Result<(), RuntimeError> {
        info!(network = %name, "Creating bridge network");
        self.run_checked(vec![
            "network".to_string(),
            "create".to_string(),
            "--driver".to_string(),
            "bridge".to_string(),
            name.to_string(),
        ])
        .await?;
        Ok(())
    }

    async fn container_exists(&self, name: &str) -> Result<bool, RuntimeError> {
        self.list_names(
            vec![
                "ps".to_string(),
                "-a".to_string(),
                "--filter".to_string(),
                format!("name=^/{}$", name),
                "--format".to_string(),
                "{{.Names}}".to_string(),
            ],
            name,
        )
        .await
    }

    async fn run_container(&self, spec: &ContainerSpec) -> Result<(), RuntimeError> {
        info!(container = %spec.name, image = %spec.image, "Starting container");
        self.run_checked(run_args(spec)).await?;
        Ok(())
    }

    async fn exec(&self, container: &str, request: &ExecRequest) -> Result<ExecOutput, RuntimeError> {
        let output = self
            .command(&exec_args(container, request))
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(ExecOutput::new(output.status.code().unwrap_or(-1), combined))
    }

    async fn copy_archive(
        &self,
        container: &str,
        dest_dir: &str,
        archive: Vec<u8>,
    ) -> Result<(), RuntimeError> {
        let args = vec![
            "cp".to_string(),
            "-".to_string(),
            format!("{}:{}", container, dest_dir),
        ];
        debug!(container = %container, dest = %dest_dir, bytes = archive.len(), "Copying archive");

        let mut child = self
            .command(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&archive).await.map_err(|e| self.spawn_error(e))?;
            // Closing stdin lets docker finish reading the stream.
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| self.spawn_error(e))?;
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                command: format!("{} {}", self.binary, args.join(" ")),
                status: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}
