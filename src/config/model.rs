// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::warn;

/// Top-level compose document.
///
/// This is a direct mapping of the YAML files users already have:
///
/// ```yaml
/// log_level: "debug"
/// log_location: "/tmp/fleet.log"
/// environment:
///   - "ONE=1"
/// processes:
///   api:
///     command: "./api --port 8080"
///     depends_on:
///       db:
///         condition: process_completed_successfully
/// ```
///
/// All top-level sections except `processes` are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Project-wide log level: "debug", "info", "warn" or "error".
    #[serde(default)]
    pub log_level: Option<String>,

    /// Project-wide default log file for process output.
    #[serde(default)]
    pub log_location: Option<String>,

    /// Extra KEY=VALUE entries applied to every process.
    #[serde(default)]
    pub environment: Vec<String>,

    /// All processes from `processes.<name>`.
    ///
    /// Keys are the *process names*; a `BTreeMap` keeps iteration (and the
    /// walker's top-level visit order) lexicographic and stable.
    #[serde(default)]
    pub processes: BTreeMap<String, ProcessConfig>,
}

/// One `processes.<name>` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessConfig {
    /// The process name. Not part of the YAML body; filled from the map key
    /// by the loader after parsing.
    #[serde(skip)]
    pub name: String,

    /// The shell line to execute.
    pub command: String,

    /// Optional working directory for the child.
    #[serde(default)]
    pub working_dir: Option<String>,

    /// Per-process KEY=VALUE entries, applied on top of the project-wide
    /// `environment`.
    #[serde(default)]
    pub environment: Vec<String>,

    /// Optional per-process log file; overrides the project-wide
    /// `log_location`.
    #[serde(default)]
    pub log_location: Option<String>,

    /// A disabled process is never scheduled and stays in the `Disabled`
    /// state for the whole run.
    #[serde(default)]
    pub disabled: bool,

    /// Dependencies this process waits on before starting.
    #[serde(default)]
    pub depends_on: BTreeMap<String, DependsOnConfig>,

    /// Restart policy.
    #[serde(default)]
    pub availability: AvailabilityConfig,
}

impl ProcessConfig {
    /// Names of the declared dependencies, in lexicographic order.
    pub fn dependency_names(&self) -> impl Iterator<Item = &str> {
        self.depends_on.keys().map(|s| s.as_str())
    }
}

/// One `depends_on.<name>` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct DependsOnConfig {
    pub condition: DependencyCondition,
}

/// The rule under which a dependent may start given a dependency's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyCondition {
    /// Wait for the dependency to reach a terminal state, any exit code.
    ProcessCompleted,
    /// Wait for the dependency to reach a terminal state with exit code 0;
    /// otherwise the dependent must not run.
    ProcessCompletedSuccessfully,
}

/// `availability` section: restart policy consumed by the process handle.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AvailabilityConfig {
    #[serde(default)]
    pub restart: RestartMode,

    /// Seconds to sleep between restart attempts.
    #[serde(default)]
    pub backoff_seconds: u64,

    /// Upper bound on restarts; 0 means unlimited.
    #[serde(default)]
    pub max_restarts: u32,
}

impl AvailabilityConfig {
    /// Whether the handle should re-enter the spawn loop after an exit with
    /// `exit_code`, given how many restarts this handle has already done.
    pub fn should_restart(&self, exit_code: i32, restarts_done: u32) -> bool {
        let within_budget = self.max_restarts == 0 || restarts_done < self.max_restarts;
        match self.restart {
            RestartMode::No => false,
            RestartMode::OnFailure => exit_code != 0 && within_budget,
            RestartMode::Always => within_budget,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RestartMode {
    #[default]
    No,
    OnFailure,
    Always,
}

/// Split KEY=VALUE entries into pairs for `Command::envs`.
///
/// Entries without a `=` are skipped with a warning.
pub fn env_pairs(entries: &[String]) -> Vec<(String, String)> {
    entries
        .iter()
        .filter_map(|entry| match entry.split_once('=') {
            Some((key, value)) => Some((key.to_string(), value.to_string())),
            None => {
                warn!(entry = %entry, "ignoring malformed environment entry (expected KEY=VALUE)");
                None
            }
        })
        .collect()
}
