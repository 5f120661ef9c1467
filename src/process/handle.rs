// src/process/handle.rs

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::model::{env_pairs, ProcessConfig};
use crate::errors::Result;
use crate::logfile::ProcessLogFile;
use crate::process::state::{ProcessStatus, SharedProcessState};

/// Owns one OS child and drives it through its lifecycle: spawn, stream
/// output, wait, classify the exit, update the shared state record, and
/// release everyone blocked on this process's completion.
///
/// The completion rendezvous is a latched `watch` channel carrying the final
/// exit code: the terminal transition stores `Some(code)` exactly once, so
/// any number of waiters observe the same code and waiters arriving after
/// termination return immediately.
#[derive(Debug)]
pub struct ProcessHandle {
    conf: ProcessConfig,
    state: SharedProcessState,
    logger: Option<Arc<ProcessLogFile>>,
    global_env: Vec<(String, String)>,
    first_attempt: u32,
    child_pid: Mutex<Option<i32>>,
    stop_requested: AtomicBool,
    done: watch::Sender<Option<i32>>,
}

impl ProcessHandle {
    pub fn new(
        global_env: Vec<(String, String)>,
        logger: Option<Arc<ProcessLogFile>>,
        conf: ProcessConfig,
        state: SharedProcessState,
        first_attempt: u32,
    ) -> Self {
        let (done, _) = watch::channel(None);
        Self {
            conf,
            state,
            logger,
            global_env,
            first_attempt,
            child_pid: Mutex::new(None),
            stop_requested: AtomicBool::new(false),
            done,
        }
    }

    pub fn name(&self) -> &str {
        &self.conf.name
    }

    /// Spawn the child and block until it reaches a terminal state,
    /// consulting the restart policy before declaring one.
    ///
    /// Restarts keep the status `Running` and increment `restarts` on the
    /// shared record; only the final exit is published to waiters. Spawn
    /// failures are classified like an exit with code -1, so the restart
    /// policy applies to them uniformly.
    pub async fn run(&self) {
        let mut attempt = self.first_attempt;
        self.note_relaunch();

        loop {
            // A stop that arrives before the first spawn is delivered by the
            // pid/flag handshake in spawn_and_wait; only restart iterations
            // may bail out here, so the first attempt always spawns.
            if attempt > self.first_attempt && self.stop_requested.load(Ordering::SeqCst) {
                self.finish(-1);
                return;
            }

            self.set_status(ProcessStatus::Running);
            info!(process = %self.name(), attempt, cmd = %self.conf.command, "starting process");

            let code = match self.spawn_and_wait().await {
                Ok(code) => code,
                Err(err) => {
                    error!(process = %self.name(), error = %err, "process execution error");
                    -1
                }
            };

            let restarts_done = attempt - self.first_attempt;
            if !self.stop_requested.load(Ordering::SeqCst)
                && self.conf.availability.should_restart(code, restarts_done)
            {
                attempt += 1;
                self.increment_restarts();
                warn!(
                    process = %self.name(),
                    exit_code = code,
                    attempt,
                    "restarting process"
                );
                let backoff = Duration::from_secs(self.conf.availability.backoff_seconds);
                if !backoff.is_zero() {
                    sleep(backoff).await;
                }
                continue;
            }

            self.finish(code);
            return;
        }
    }

    /// Mark the process `Skipped` without ever spawning it, releasing all
    /// waiters with a synthetic non-zero exit code. Used when a dependency
    /// condition was not met.
    pub fn wont_run(&self) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.status = ProcessStatus::Skipped;
            state.exit_code = -1;
        }
        info!(process = %self.name(), status = %ProcessStatus::Skipped, "process skipped");
        self.done.send_replace(Some(-1));
    }

    /// Request graceful termination: send the platform's termination signal
    /// to the child and latch a stop flag so the restart policy does not
    /// resurrect it. Idempotent; a no-op once the child has exited.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        let pid = *self.child_pid.lock().unwrap_or_else(PoisonError::into_inner);
        match pid {
            Some(pid) => send_term_signal(self.name(), pid),
            None => debug!(process = %self.name(), "stop requested but no child is running"),
        }
    }

    /// Block until this process reaches a terminal status and return its
    /// final exit code. Safe to call from many waiters concurrently; all
    /// observe the same code, and calls after termination return
    /// immediately.
    pub async fn wait_for_completion(&self, waiter: &str) -> i32 {
        debug!(process = %self.name(), waiter = %waiter, "waiting for completion");
        let mut done = self.done.subscribe();
        let result = match done.wait_for(Option::is_some).await {
            Ok(code) => (*code).unwrap_or(-1),
            // The sender lives in this handle, so the channel can only close
            // if the handle is dropped mid-wait; report failure to the waiter.
            Err(_) => -1,
        };
        result
    }

    async fn spawn_and_wait(&self) -> Result<i32> {
        let mut cmd = shell_command(&self.conf.command);

        if let Some(dir) = &self.conf.working_dir {
            cmd.current_dir(dir);
        }
        cmd.envs(self.global_env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .envs(env_pairs(&self.conf.environment))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning process '{}'", self.name()))?;

        self.set_child_pid(child.id().map(|id| id as i32));

        // A stop request can land between the Running transition and the pid
        // registration above; it latches the flag first and reads the pid
        // second, we store the pid first and read the flag second, so one
        // side always delivers the signal.
        if self.stop_requested.load(Ordering::SeqCst) {
            if let Some(pid) = child.id() {
                send_term_signal(self.name(), pid as i32);
            }
        }

        if let Some(stdout) = child.stdout.take() {
            self.stream_output(stdout, "stdout");
        }
        if let Some(stderr) = child.stderr.take() {
            self.stream_output(stderr, "stderr");
        }

        let status = child
            .wait()
            .await
            .with_context(|| format!("waiting for process '{}'", self.name()))?;

        self.set_child_pid(None);

        let code = status.code().unwrap_or(-1);
        info!(
            process = %self.name(),
            exit_code = code,
            success = status.success(),
            "process exited"
        );
        Ok(code)
    }

    /// Forward one output stream line-wise to the log sink and to debug
    /// logging, consuming it so OS pipe buffers don't fill.
    fn stream_output(&self, stream: impl AsyncRead + Unpin + Send + 'static, kind: &'static str) {
        let name = self.conf.name.clone();
        let logger = self.logger.clone();
        tokio::spawn(async move {
            let reader = BufReader::new(stream);
            let mut lines = reader.lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if let Some(logger) = &logger {
                    logger.write_line(&line);
                }
                debug!(process = %name, "{kind}: {line}");
            }
        });
    }

    /// A `StartProcess` on a record that already reached a terminal state is
    /// a re-launch of the same record: count it as a restart.
    fn note_relaunch(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.status.is_terminal() {
            state.restarts += 1;
        }
    }

    fn finish(&self, code: i32) {
        let status = if code == 0 {
            ProcessStatus::Completed
        } else {
            ProcessStatus::Error
        };
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            state.exit_code = code;
            state.status = status;
        }
        info!(
            process = %self.name(),
            status = %status,
            exit_code = code,
            "process reached terminal state"
        );
        self.done.send_replace(Some(code));
    }

    fn set_status(&self, status: ProcessStatus) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.status = status;
    }

    fn increment_restarts(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.restarts += 1;
    }

    fn set_child_pid(&self, pid: Option<i32>) {
        let mut child_pid = self.child_pid.lock().unwrap_or_else(PoisonError::into_inner);
        *child_pid = pid;
    }
}

/// Build a shell command appropriate for the platform.
fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.arg("/C").arg(command);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command);
        cmd
    }
}

#[cfg(unix)]
fn send_term_signal(name: &str, pid: i32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    match kill(Pid::from_raw(pid), Signal::SIGTERM) {
        Ok(()) => info!(process = %name, pid, "sent SIGTERM"),
        // The child exited between our pid read and the signal.
        Err(nix::errno::Errno::ESRCH) => {
            debug!(process = %name, pid, "process already gone; nothing to signal")
        }
        Err(err) => warn!(process = %name, pid, error = %err, "failed to signal process"),
    }
}

#[cfg(not(unix))]
fn send_term_signal(name: &str, pid: i32) {
    warn!(
        process = %name,
        pid,
        "graceful termination signals are not supported on this platform"
    );
}
