//! Runtime error types.

use thiserror::Error;

/// Failures talking to the container runtime itself.
///
/// A command that runs inside a container and exits non-zero is not an
/// error at this layer; see [`crate::ExecOutput`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Failed to launch {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Runtime command `{command}` failed with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("Failed to build archive: {0}")]
    Archive(#[from] std::io::Error),
}
