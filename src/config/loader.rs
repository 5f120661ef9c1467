// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use regex::{Captures, Regex};
use tracing::warn;

use crate::config::model::ProjectConfig;
use crate::config::validate::validate_project;
use crate::errors::{ProcdagError, Result};

/// Compose file names tried during auto-discovery, in order of preference.
pub const DEFAULT_FILE_NAMES: [&str; 4] = [
    "compose.yml",
    "compose.yaml",
    "process-compose.yml",
    "process-compose.yaml",
];

/// Outcome of compose-file discovery.
///
/// The winner is `path`; `candidates` holds every matching file so the
/// ambiguity warning can be emitted once logging is up.
#[derive(Debug, Clone)]
pub struct DiscoveredConfig {
    pub path: PathBuf,
    pub candidates: Vec<PathBuf>,
}

impl DiscoveredConfig {
    /// Wrap an explicitly provided path; no discovery took place.
    pub fn explicit(path: PathBuf) -> Self {
        Self {
            path,
            candidates: Vec::new(),
        }
    }

    /// Warn when more than one supported file name was present.
    pub fn warn_if_ambiguous(&self) {
        if self.candidates.len() > 1 {
            let found: Vec<String> = self
                .candidates
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            warn!(
                found = %found.join(", "),
                "found multiple config files with supported names"
            );
            warn!(using = %self.path.display(), "using the first candidate");
        }
    }
}

/// Look for a compose file in `pwd`, trying [`DEFAULT_FILE_NAMES`] in order.
///
/// The first existing file wins. Fails when none exists.
pub fn auto_discover(pwd: &Path) -> Result<DiscoveredConfig> {
    let candidates: Vec<PathBuf> = DEFAULT_FILE_NAMES
        .iter()
        .map(|name| pwd.join(name))
        .filter(|path| path.exists())
        .collect();

    match candidates.first() {
        Some(winner) => Ok(DiscoveredConfig {
            path: winner.clone(),
            candidates,
        }),
        None => Err(ProcdagError::NoConfigFound(pwd.display().to_string())),
    }
}

/// Load and validate a compose file.
///
/// - Loads a sibling `.env` of the current working directory into the
///   process environment if present; its absence is not an error.
/// - Expands `${VAR}` tokens over the raw document text before parsing.
/// - Parses the YAML, fills each process's `name` from its map key, and runs
///   semantic validation.
pub fn load_project(path: impl AsRef<Path>) -> Result<ProjectConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading compose file at {:?}", path))?;

    let _ = dotenvy::dotenv();

    let expanded = expand_env_vars(&raw);

    let mut config: ProjectConfig = serde_yaml_bw::from_str(&expanded)?;
    for (name, process) in config.processes.iter_mut() {
        process.name = name.clone();
    }

    validate_project(&config)?;
    Ok(config)
}

/// Replace `${VAR}` tokens with the value of the environment variable `VAR`,
/// or the empty string when unset.
pub fn expand_env_vars(input: &str) -> String {
    let re = match Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}") {
        Ok(re) => re,
        Err(err) => {
            warn!(error = %err, "failed to compile env-expansion pattern; skipping expansion");
            return input.to_string();
        }
    };

    re.replace_all(input, |caps: &Captures<'_>| {
        std::env::var(&caps[1]).unwrap_or_default()
    })
    .into_owned()
}
