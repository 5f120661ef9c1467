// src/process/state.rs

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::config::model::ProcessConfig;

/// Observable status of one supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Pending,
    Disabled,
    Running,
    Completed,
    Error,
    Skipped,
}

impl ProcessStatus {
    /// Terminal statuses are never left again by the same process handle.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ProcessStatus::Completed
                | ProcessStatus::Error
                | ProcessStatus::Skipped
                | ProcessStatus::Disabled
        )
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessStatus::Pending => "Pending",
            ProcessStatus::Disabled => "Disabled",
            ProcessStatus::Running => "Running",
            ProcessStatus::Completed => "Completed",
            ProcessStatus::Error => "Error",
            ProcessStatus::Skipped => "Skipped",
        };
        f.write_str(name)
    }
}

/// The observable record for one declared process.
///
/// Exactly one record exists per declared name for the lifetime of the run;
/// it is reused across restarts and re-launches.
#[derive(Debug, Clone)]
pub struct ProcessState {
    pub name: String,
    pub status: ProcessStatus,
    pub restarts: u32,
    pub exit_code: i32,
}

/// Shared handle to a process's state record.
///
/// Written only by the owning process handle; read concurrently by
/// dependents and the control surface, so every access goes through the
/// mutex.
pub type SharedProcessState = Arc<Mutex<ProcessState>>;

/// Mapping from process name to its state record.
///
/// Built once up front from the compose document; the map itself is never
/// mutated afterwards, only the records behind it.
#[derive(Debug)]
pub struct StateStore {
    states: HashMap<String, SharedProcessState>,
}

impl StateStore {
    /// Allocate one record per declared process: `Pending`, or `Disabled`
    /// when configured, with zero restarts and exit code 0.
    pub fn init(processes: &BTreeMap<String, ProcessConfig>) -> Self {
        let states = processes
            .iter()
            .map(|(name, process)| {
                let status = if process.disabled {
                    ProcessStatus::Disabled
                } else {
                    ProcessStatus::Pending
                };
                let state = ProcessState {
                    name: name.clone(),
                    status,
                    restarts: 0,
                    exit_code: 0,
                };
                (name.clone(), Arc::new(Mutex::new(state)))
            })
            .collect();
        Self { states }
    }

    /// Shared handle to the record for `name`, if declared.
    pub fn get(&self, name: &str) -> Option<SharedProcessState> {
        self.states.get(name).cloned()
    }

    /// Point-in-time copy of the record for `name`, if declared.
    pub fn snapshot(&self, name: &str) -> Option<ProcessState> {
        self.states
            .get(name)
            .map(|state| state.lock().unwrap_or_else(PoisonError::into_inner).clone())
    }
}
