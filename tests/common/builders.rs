#![allow(dead_code)]

use std::collections::BTreeMap;

use procdag::config::{
    AvailabilityConfig, DependencyCondition, DependsOnConfig, ProcessConfig, ProjectConfig,
    RestartMode,
};

/// Builder for `ProjectConfig` to simplify test setup.
pub struct ProjectBuilder {
    config: ProjectConfig,
}

impl ProjectBuilder {
    pub fn new() -> Self {
        Self {
            config: ProjectConfig {
                log_level: None,
                log_location: None,
                environment: Vec::new(),
                processes: BTreeMap::new(),
            },
        }
    }

    pub fn with_process(mut self, name: &str, mut process: ProcessConfig) -> Self {
        process.name = name.to_string();
        self.config.processes.insert(name.to_string(), process);
        self
    }

    pub fn with_environment(mut self, entry: &str) -> Self {
        self.config.environment.push(entry.to_string());
        self
    }

    pub fn with_log_location(mut self, path: &str) -> Self {
        self.config.log_location = Some(path.to_string());
        self
    }

    pub fn build(self) -> ProjectConfig {
        self.config
    }
}

impl Default for ProjectBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `ProcessConfig`.
pub struct ProcessBuilder {
    process: ProcessConfig,
}

impl ProcessBuilder {
    pub fn new(command: &str) -> Self {
        Self {
            process: ProcessConfig {
                name: String::new(),
                command: command.to_string(),
                working_dir: None,
                environment: Vec::new(),
                log_location: None,
                disabled: false,
                depends_on: BTreeMap::new(),
                availability: AvailabilityConfig::default(),
            },
        }
    }

    pub fn named(mut self, name: &str) -> Self {
        self.process.name = name.to_string();
        self
    }

    pub fn depends_on(mut self, dep: &str, condition: DependencyCondition) -> Self {
        self.process
            .depends_on
            .insert(dep.to_string(), DependsOnConfig { condition });
        self
    }

    pub fn disabled(mut self) -> Self {
        self.process.disabled = true;
        self
    }

    pub fn working_dir(mut self, dir: &str) -> Self {
        self.process.working_dir = Some(dir.to_string());
        self
    }

    pub fn environment(mut self, entry: &str) -> Self {
        self.process.environment.push(entry.to_string());
        self
    }

    pub fn log_location(mut self, path: &str) -> Self {
        self.process.log_location = Some(path.to_string());
        self
    }

    pub fn restart(mut self, restart: RestartMode, backoff_seconds: u64, max_restarts: u32) -> Self {
        self.process.availability = AvailabilityConfig {
            restart,
            backoff_seconds,
            max_restarts,
        };
        self
    }

    pub fn build(self) -> ProcessConfig {
        self.process
    }
}
