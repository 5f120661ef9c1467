// src/logfile.rs

//! Append-only log sink for process output.
//!
//! One sink may be shared by several processes (the project-wide
//! `log_location`), so writes are serialized behind a mutex.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

#[derive(Debug)]
pub struct ProcessLogFile {
    path: PathBuf,
    file: Mutex<File>,
}

impl ProcessLogFile {
    /// Open `path` for appending, creating it (and its parent directory) if
    /// needed.
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line. Write failures are reported at debug level rather
    /// than propagated; losing a log line must not take the process down.
    pub fn write_line(&self, line: &str) {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = writeln!(file, "{line}") {
            debug!(path = %self.path.display(), error = %err, "failed to write log line");
        }
    }

    /// Flush buffered output. Called on the supervisor's exit path.
    pub fn close(&self) {
        let mut file = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = file.flush() {
            debug!(path = %self.path.display(), error = %err, "failed to flush log file");
        }
    }
}
