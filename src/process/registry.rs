// src/process/registry.rs

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::process::handle::ProcessHandle;

/// Live map of currently-supervised processes.
///
/// The only authority on "is X currently up?". An entry exists for exactly
/// the interval between a handle's registration (before its task starts) and
/// the task's exit cleanup, on every exit path.
#[derive(Debug, Default)]
pub struct RunningRegistry {
    inner: Mutex<HashMap<String, Arc<ProcessHandle>>>,
}

impl RunningRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, handle: Arc<ProcessHandle>) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.insert(handle.name().to_string(), handle);
    }

    pub fn remove(&self, name: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.remove(name);
    }

    pub fn get(&self, name: &str) -> Option<Arc<ProcessHandle>> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every live handle, for stop-all style sweeps.
    pub fn handles(&self) -> Vec<Arc<ProcessHandle>> {
        let inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.values().cloned().collect()
    }
}
