//! Container command metrics.
//!
//! Provides functions for recording runtime-related metrics.

use metrics::{counter, histogram};
use std::time::Instant;

/// Record a command executed inside a container.
pub fn record_command(container: &str, exit_code: i32, duration_secs: f64) {
    let exit = if exit_code == 0 { "success" } else { "failure" };
    counter!(
        "container_commands_total",
        "container" => container.to_string(),
        "exit" => exit
    )
    .increment(1);
    histogram!(
        "container_command_duration_seconds",
        "container" => container.to_string()
    )
    .record(duration_secs);
}

/// Times one command execution.
///
/// Usage:
/// ```ignore
/// let timer = CommandTimer::new("shared_wp_shop");
/// let output = runtime.exec("shared_wp_shop", &request).await?;
/// timer.record(output.exit_code);
/// ```
pub struct CommandTimer {
    container: String,
    start: Instant,
}

impl CommandTimer {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            start: Instant::now(),
        }
    }

    /// Record the elapsed duration and exit status.
    pub fn record(self, exit_code: i32) {
        record_command(&self.container, exit_code, self.start.elapsed().as_secs_f64());
    }
}
