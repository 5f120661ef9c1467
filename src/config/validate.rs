// src/config/validate.rs

use crate::config::model::ProjectConfig;
use crate::errors::{ProcdagError, Result};

/// Run semantic validation against a loaded compose document.
///
/// This checks:
/// - every process has a non-empty `command`
/// - no process depends on itself
///
/// It does **not** reject `depends_on` names that are absent from the
/// declared set: an absent dependency is soft ordering against an optional
/// sibling and is skipped at walk time and at wait time. Cycles are reported
/// by the dependency walker.
pub fn validate_project(config: &ProjectConfig) -> Result<()> {
    validate_commands(config)?;
    validate_self_dependencies(config)?;
    Ok(())
}

fn validate_commands(config: &ProjectConfig) -> Result<()> {
    for (name, process) in config.processes.iter() {
        if process.command.trim().is_empty() {
            return Err(ProcdagError::Config(format!(
                "process '{}' has an empty command",
                name
            )));
        }
    }
    Ok(())
}

fn validate_self_dependencies(config: &ProjectConfig) -> Result<()> {
    for (name, process) in config.processes.iter() {
        if process.depends_on.contains_key(name) {
            return Err(ProcdagError::Config(format!(
                "process '{}' cannot depend on itself",
                name
            )));
        }
    }
    Ok(())
}
