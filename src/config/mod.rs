// src/config/mod.rs

//! Compose document loading and validation.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{auto_discover, load_project, DiscoveredConfig, DEFAULT_FILE_NAMES};
pub use model::{
    env_pairs, AvailabilityConfig, DependencyCondition, DependsOnConfig, ProcessConfig,
    ProjectConfig, RestartMode,
};
pub use validate::validate_project;
