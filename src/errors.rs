// src/errors.rs

//! Crate-wide error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcdagError {
    #[error("no such process: {0}")]
    NoSuchProcess(String),

    #[error("process {0} is already running")]
    AlreadyRunning(String),

    #[error("process {0} is not running")]
    NotRunning(String),

    #[error("process {name} depended on {dependency} to complete successfully, but it exited with status {exit_code}")]
    UnmetDependency {
        name: String,
        dependency: String,
        exit_code: i32,
    },

    #[error("cyclic dependency detected involving process '{0}'")]
    CyclicDependency(String),

    #[error("no config files found in {0}")]
    NoConfigFound(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml_bw::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ProcdagError>;
