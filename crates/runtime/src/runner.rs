//! Command runner for one target container.

use std::borrow::Cow;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::container::{ContainerRuntime, ExecOutput, ExecRequest};
use crate::error::RuntimeError;
use crate::metrics::CommandTimer;
use crate::wp_cli::WpCommand;

/// Default user commands run as.
pub const DEFAULT_USER: &str = "root";

/// Default working directory, the WordPress document root.
pub const DEFAULT_WORKDIR: &str = "/var/www/html";

/// Characters of command output kept in info and warn lines. The full
/// output is logged at debug.
const OUTPUT_PREVIEW_CHARS: usize = 512;

/// Executes commands in a fixed container as a fixed user and directory.
///
/// A non-zero exit is returned to the caller, never raised; only failures
/// of the runtime itself become errors.
#[derive(Clone)]
pub struct CommandRunner {
    runtime: Arc<dyn ContainerRuntime>,
    container: String,
    user: String,
    workdir: String,
}

impl CommandRunner {
    pub fn new(runtime: Arc<dyn ContainerRuntime>, container: impl Into<String>) -> Self {
        Self {
            runtime,
            container: container.into(),
            user: DEFAULT_USER.to_string(),
            workdir: DEFAULT_WORKDIR.to_string(),
        }
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub async fn run(&self, command: &str) -> Result<ExecOutput, RuntimeError> {
        self.exec_logged(command, command).await
    }

    /// Runs a control-plane command, logging it with secrets masked.
    pub async fn wp(&self, command: &WpCommand) -> Result<ExecOutput, RuntimeError> {
        self.exec_logged(&command.render(), &command.loggable()).await
    }

    async fn exec_logged(&self, command: &str, shown: &str) -> Result<ExecOutput, RuntimeError> {
        debug!(container = %self.container, command = %shown, "Executing command");
        let request = ExecRequest::new(command)
            .user(self.user.as_str())
            .workdir(self.workdir.as_str());

        let timer = CommandTimer::new(self.container.as_str());
        let output = self.runtime.exec(&self.container, &request).await?;
        timer.record(output.exit_code);

        let preview = preview(output.trimmed());
        if output.success() {
            info!(
                container = %self.container,
                command = %shown,
                exit_code = output.exit_code,
                output = %preview,
                "Command completed"
            );
        } else {
            warn!(
                container = %self.container,
                command = %shown,
                exit_code = output.exit_code,
                output = %preview,
                "Command exited non-zero"
            );
        }
        debug!(container = %self.container, output = %output.trimmed(), "Full command output");
        Ok(output)
    }

    /// Archives `(file name, contents)` pairs and extracts them into
    /// `dest_dir` inside the container.
    pub async fn copy_files(
        &self,
        dest_dir: &str,
        files: &[(String, Vec<u8>)],
    ) -> Result<(), RuntimeError> {
        let archive = build_archive(files)?;
        info!(
            container = %self.container,
            dest = %dest_dir,
            files = files.len(),
            "Injecting files"
        );
        self.runtime
            .copy_archive(&self.container, dest_dir, archive)
            .await
    }
}

/// Cuts long output to [`OUTPUT_PREVIEW_CHARS`] characters and notes how
/// many bytes the whole output had.
fn preview(output: &str) -> Cow<'_, str> {
    match output.char_indices().nth(OUTPUT_PREVIEW_CHARS) {
        None => Cow::Borrowed(output),
        Some((cut, _)) => Cow::Owned(format!("{}… ({} bytes total)", &output[..cut], output.len())),
    }
}

/// Builds an uncompressed tar archive of regular files.
pub fn build_archive(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>, RuntimeError> {
    let mtime = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut builder = tar::Builder::new(Vec::new());
    for (name, contents) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(mtime);
        header.set_cksum();
        builder.append_data(&mut header, name, contents.as_slice())?;
    }
    Ok(builder.into_inner()?)
}
