//! Container runtime layer for the shop provisioner.
//!
//! This crate contains:
//! - The container runtime boundary (Docker CLI and an in-memory mock)
//! - The command runner used to drive the control-plane tool
//! - Database readiness probing
//! - Control-plane environment bootstrapping

pub mod bootstrap;
pub mod container;
pub mod docker;
pub mod error;
pub mod metrics;
pub mod mock;
pub mod probe;
pub mod runner;
pub mod wp_cli;

pub use bootstrap::EnvironmentBootstrapper;
pub use container::{ContainerRuntime, ContainerSpec, ExecOutput, ExecRequest};
pub use docker::DockerCli;
pub use error::RuntimeError;
pub use mock::MockContainerRuntime;
pub use probe::{ProbeTarget, ReadinessProber};
pub use runner::CommandRunner;
pub use wp_cli::WpCommand;
