//! Control-plane (WP-CLI) command builder.
//!
//! Every value passed through [`WpCommand::arg`] or [`WpCommand::opt`] is
//! shell-quoted; subcommand words and flag names are trusted literals.
//!
//! Values added with [`WpCommand::opt_secret`] appear in [`WpCommand::render`]
//! only. [`WpCommand::loggable`], `Display` and `Debug` mask them.

use shared::shell::quote;

/// Placeholder shown in place of secret option values.
pub const REDACTED: &str = "***";

#[derive(Clone, PartialEq, Eq)]
struct Part {
    text: String,
    masked: Option<String>,
}

impl Part {
    fn plain(text: String) -> Self {
        Self { text, masked: None }
    }

    fn shown(&self) -> &str {
        self.masked.as_deref().unwrap_or(&self.text)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct WpCommand {
    parts: Vec<Part>,
}

impl WpCommand {
    /// Starts a command such as `WpCommand::new("plugin install")`.
    pub fn new(subcommand: &str) -> Self {
        let mut parts = vec![Part::plain("wp".to_string())];
        parts.extend(subcommand.split_whitespace().map(|w| Part::plain(w.to_string())));
        Self { parts }
    }

    /// Positional argument.
    pub fn arg(mut self, value: &str) -> Self {
        self.parts.push(Part::plain(quote(value)));
        self
    }

    /// Boolean flag, `--name`.
    pub fn flag(mut self, name: &str) -> Self {
        self.parts.push(Part::plain(format!("--{}", name)));
        self
    }

    /// Valued option, `--name=value`.
    pub fn opt(mut self, name: &str, value: &str) -> Self {
        self.parts
            .push(Part::plain(format!("--{}={}", name, quote(value))));
        self
    }

    /// Valued option whose value never reaches the logs.
    pub fn opt_secret(mut self, name: &str, value: &str) -> Self {
        self.parts.push(Part {
            text: format!("--{}={}", name, quote(value)),
            masked: Some(format!("--{}={}", name, REDACTED)),
        });
        self
    }

    /// Targets one site of the network.
    pub fn url(self, url: &str) -> Self {
        self.opt("url", url)
    }

    /// Acts as a named WordPress user (needed by the WooCommerce REST commands).
    pub fn user(self, user: &str) -> Self {
        self.opt("user", user)
    }

    /// Renders the shell command; always runs with `--allow-root`.
    pub fn render(&self) -> String {
        Self::join(self.parts.iter().map(|p| p.text.as_str()))
    }

    /// The command as it may appear in logs, secrets masked.
    pub fn loggable(&self) -> String {
        Self::join(self.parts.iter().map(Part::shown))
    }

    fn join<'a>(parts: impl Iterator<Item = &'a str>) -> String {
        let mut rendered = parts.collect::<Vec<_>>().join(" ");
        rendered.push_str(" --allow-root");
        rendered
    }
}

impl std::fmt::Display for WpCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.loggable())
    }
}

impl std::fmt::Debug for WpCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WpCommand").field(&self.loggable()).finish()
    }
}
