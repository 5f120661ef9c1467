// src/process/mod.rs

//! Per-process supervision: the state store, the live registry, and the
//! handle that owns one OS child.

pub mod handle;
pub mod registry;
pub mod state;

pub use handle::ProcessHandle;
pub use registry::RunningRegistry;
pub use state::{ProcessState, ProcessStatus, SharedProcessState, StateStore};
