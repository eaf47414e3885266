//! In-memory container runtime for development and testing.
//!
//! Tracks networks and containers, records every executed command and
//! copied archive, and answers commands from scripted responses.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::container::{ContainerRuntime, ContainerSpec, ExecOutput, ExecRequest};
use crate::error::RuntimeError;

/// A command executed against the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecRecord {
    pub container: String,
    pub command: String,
    pub user: Option<String>,
}

/// An archive copied into a container.
#[derive(Debug, Clone)]
pub struct CopyRecord {
    pub container: String,
    pub dest_dir: String,
    pub archive: Vec<u8>,
}

impl CopyRecord {
    /// Unpacks the archive into `(path, contents)` pairs.
    pub fn files(&self) -> Vec<(String, Vec<u8>)> {
        let mut files = Vec::new();
        let mut archive = tar::Archive::new(self.archive.as_slice());
        if let Ok(entries) = archive.entries() {
            for mut entry in entries.flatten() {
                let path = entry
                    .path()
                    .map(|p| p.to_string_lossy().into_owned())
                    .unwrap_or_default();
                let mut contents = Vec::new();
                if entry.read_to_end(&mut contents).is_ok() {
                    files.push((path, contents));
                }
            }
        }
        files
    }
}

#[derive(Debug, Clone)]
struct Rule {
    container: Option<String>,
    pattern: String,
    output: ExecOutput,
}

#[derive(Debug, Default)]
struct MockState {
    networks: BTreeSet<String>,
    containers: BTreeMap<String, ContainerSpec>,
    network_creates: usize,
    container_runs: Vec<String>,
    execs: Vec<ExecRecord>,
    copies: Vec<CopyRecord>,
    rules: Vec<Rule>,
    /// Files extracted by `copy_archive`, keyed by (container, absolute path).
    files: BTreeMap<(String, String), Vec<u8>>,
    /// Site slugs known to `wp site list`, when site tracking is on.
    sites: Option<BTreeSet<String>>,
    unreachable: bool,
}

impl MockState {
    /// Answers `wp site create` and `wp site list` from the tracked sites.
    fn site_command(&mut self, command: &str) -> Option<ExecOutput> {
        let sites = self.sites.as_mut()?;
        if command.starts_with("wp site create") {
            let slug = command
                .split_whitespace()
                .find_map(|part| part.strip_prefix("--slug="))?
                .trim_matches('\'')
                .to_string();
            if !sites.insert(slug.clone()) {
                return Some(ExecOutput::new(1, format!("Error: The site /{}/ already exists.", slug)));
            }
            return Some(ExecOutput::new(0, format!("Success: Site {} created.", sites.len())));
        }
        if command.starts_with("wp site list") {
            let mut paths = String::from("/\n");
            for slug in sites.iter() {
                paths.push_str(&format!("/{}/\n", slug));
            }
            return Some(ExecOutput::new(0, paths));
        }
        None
    }
}

/// Mock container runtime.
///
/// Commands with no matching rule succeed with empty output. Rules added
/// later take precedence over earlier ones. `cat <path>` of a file placed
/// by `copy_archive` returns its contents. With [`Self::track_sites`],
/// unmatched `wp site create` and `wp site list` share a site registry.
#[derive(Debug, Clone, Default)]
pub struct MockContainerRuntime {
    state: Arc<Mutex<MockState>>,
}

impl MockContainerRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock whose runtime binary cannot be reached.
    pub fn unreachable() -> Self {
        let mock = Self::new();
        mock.lock().unreachable = true;
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // A test that panicked while holding the lock already failed.
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn check_reachable(&self) -> Result<(), RuntimeError> {
        if self.lock().unreachable {
            return Err(RuntimeError::Spawn {
                binary: "mock".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "runtime unreachable"),
            });
        }
        Ok(())
    }

    /// Answer any command containing `pattern`.
    pub fn respond(&self, pattern: &str, exit_code: i32, output: &str) -> &Self {
        self.lock().rules.push(Rule {
            container: None,
            pattern: pattern.to_string(),
            output: ExecOutput::new(exit_code, output),
        });
        self
    }

    /// Answer commands containing `pattern` executed in one container.
    pub fn respond_in(&self, container: &str, pattern: &str, exit_code: i32, output: &str) -> &Self {
        self.lock().rules.push(Rule {
            container: Some(container.to_string()),
            pattern: pattern.to_string(),
            output: ExecOutput::new(exit_code, output),
        });
        self
    }

    /// Remember sites created with `wp site create` and list them.
    pub fn track_sites(&self) -> &Self {
        self.lock().sites.get_or_insert_with(BTreeSet::new);
        self
    }

    /// Pretend a network already exists.
    pub fn with_network(&self, name: &str) -> &Self {
        self.lock().networks.insert(name.to_string());
        self
    }

    /// Pretend a container already exists.
    pub fn with_container(&self, name: &str, image: &str) -> &Self {
        self.lock()
            .containers
            .insert(name.to_string(), ContainerSpec::new(name, image, ""));
        self
    }

    pub fn network_creates(&self) -> usize {
        self.lock().network_creates
    }

    /// Names of containers created through `run_container`, in order.
    pub fn container_runs(&self) -> Vec<String> {
        self.lock().container_runs.clone()
    }

    pub fn container(&self, name: &str) -> Option<ContainerSpec> {
        self.lock().containers.get(name).cloned()
    }

    pub fn execs(&self) -> Vec<ExecRecord> {
        self.lock().execs.clone()
    }

    /// Commands executed in one container, in order.
    pub fn commands_in(&self, container: &str) -> Vec<String> {
        self.lock()
            .execs
            .iter()
            .filter(|e| e.container == container)
            .map(|e| e.command.clone())
            .collect()
    }

    /// Commands containing `pattern`, across all containers.
    pub fn commands_matching(&self, pattern: &str) -> Vec<String> {
        self.lock()
            .execs
            .iter()
            .filter(|e| e.command.contains(pattern))
            .map(|e| e.command.clone())
            .collect()
    }

    pub fn copies(&self) -> Vec<CopyRecord> {
        self.lock().copies.clone()
    }
}

#[async_trait]
impl ContainerRuntime for MockContainerRuntime {
    async fn version(&self) -> Result<String, RuntimeError> {
        self.check_reachable()?;
        Ok("mock".to_string())
    }

    async fn network_exists(&self, name: &str) -> Result<bool, RuntimeError> {
        self.check_reachable()?;
        Ok(self.lock().networks.contains(name))
    }

    async fn create_network(&self, name: &str) -> Result<(), RuntimeError> {
        self.check_reachable()?;
        let mut state = self.lock();
        if !state.networks.insert(name.to_string()) {
            return Err(RuntimeError::CommandFailed {
                command: format!("network create {}", name),
                status: 1,
                stderr: format!("network with name {} already exists", name),
            });
        }
        state.network_creates += 1;
        Ok(())
    }

    async fn container_exists(&self, name: &str) -> Result<bool, RuntimeError> {
        self.check_reachable()?;
        Ok(self.lock().containers.contains_key(name))
    }

    async fn run_container(&self, spec: &ContainerSpec) -> Result<(), RuntimeError> {
        self.check_reachable()?;
        let mut state = self.lock();
        if state.containers.contains_key(&spec.name) {
            return Err(RuntimeError::CommandFailed {
                command: format!("run --name {}", spec.name),
                status: 125,
                stderr: format!("Conflict. The container name \"/{}\" is already in use", spec.name),
            });
        }
        state.container_runs.push(spec.name.clone());
        state.containers.insert(spec.name.clone(), spec.clone());
        Ok(())
    }

    async fn exec(&self, container: &str, request: &ExecRequest) -> Result<ExecOutput, RuntimeError> {
        self.check_reachable()?;
        let mut state = self.lock();
        state.execs.push(ExecRecord {
            container: container.to_string(),
            command: request.command.clone(),
            user: request.user.clone(),
        });

        if let Some(path) = request.command.strip_prefix("cat ") {
            let key = (container.to_string(), path.trim().to_string());
            if let Some(contents) = state.files.get(&key) {
                return Ok(ExecOutput::new(0, String::from_utf8_lossy(contents)));
            }
        }

        let rule = state
            .rules
            .iter()
            .rev()
            .find(|rule| {
                rule.container.as_deref().map_or(true, |c| c == container)
                    && request.command.contains(&rule.pattern)
            })
            .map(|rule| rule.output.clone());
        let output = match rule {
            Some(output) => output,
            None => state
                .site_command(&request.command)
                .unwrap_or_else(|| ExecOutput::new(0, "")),
        };
        Ok(output)
    }

    async fn copy_archive(
        &self,
        container: &str,
        dest_dir: &str,
        archive: Vec<u8>,
    ) -> Result<(), RuntimeError> {
        self.check_reachable()?;
        let record = CopyRecord {
            container: container.to_string(),
            dest_dir: dest_dir.to_string(),
            archive,
        };
        let mut state = self.lock();
        for (name, contents) in record.files() {
            let path = format!("{}/{}", dest_dir.trim_end_matches('/'), name);
            state.files.insert((container.to_string(), path), contents);
        }
        state.copies.push(record);
        Ok(())
    }
}
