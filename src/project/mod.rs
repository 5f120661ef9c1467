// src/project/mod.rs

//! The project supervisor: ties the state store, running registry, walker
//! and process handles together, and exposes the in-process control API.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::config::model::{env_pairs, ProcessConfig, ProjectConfig};
use crate::config::DependencyCondition;
use crate::dag;
use crate::errors::{ProcdagError, Result};
use crate::logfile::ProcessLogFile;
use crate::process::state::{ProcessState, ProcessStatus};
use crate::process::{ProcessHandle, RunningRegistry, StateStore};

/// Supervisor for one compose document.
///
/// Owns the state store and the running registry for its run. Cloning is
/// cheap (shared inner); clones are handed to process tasks and to control
/// surfaces so start/stop can be called concurrently while `run` is in
/// flight.
#[derive(Debug, Clone)]
pub struct Project {
    inner: Arc<ProjectInner>,
}

#[derive(Debug)]
struct ProjectInner {
    config: ProjectConfig,
    global_env: Vec<(String, String)>,
    states: StateStore,
    running: RunningRegistry,
    logger: Option<Arc<ProcessLogFile>>,
    /// Count of live process tasks; `run` blocks until it drops to zero.
    live: watch::Sender<usize>,
}

impl Project {
    pub fn new(config: ProjectConfig) -> Result<Self> {
        let states = StateStore::init(&config.processes);
        let logger = match &config.log_location {
            Some(path) => Some(Arc::new(ProcessLogFile::open(path)?)),
            None => None,
        };
        let global_env = env_pairs(&config.environment);
        let (live, _) = watch::channel(0usize);

        Ok(Self {
            inner: Arc::new(ProjectInner {
                config,
                global_env,
                states,
                running: RunningRegistry::new(),
                logger,
                live,
            }),
        })
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.inner.config
    }

    /// Bring up the whole fleet in dependency order and block until every
    /// process task has finished.
    pub async fn run(&self) -> Result<()> {
        let order = self.dependency_order()?;
        let names: Vec<&str> = order.iter().map(|p| p.name.as_str()).collect();
        debug!(count = order.len(), order = ?names, "spinning up processes");

        for conf in order {
            self.launch(conf, 1);
        }

        self.wait_until_done().await;

        if let Some(logger) = &self.inner.logger {
            logger.close();
        }
        Ok(())
    }

    /// Start a declared process by name.
    ///
    /// Fails with `AlreadyRunning` when a handle for it is live, and with
    /// `NoSuchProcess` when the name is not declared. A re-launch reuses the
    /// existing state record and counts as a restart.
    pub fn start_process(&self, name: &str) -> Result<()> {
        if self.inner.running.get(name).is_some() {
            error!(process = %name, "process is already running");
            return Err(ProcdagError::AlreadyRunning(name.to_string()));
        }
        match self.inner.config.processes.get(name) {
            Some(conf) => {
                info!(process = %name, "start requested");
                self.launch(conf.clone(), 1);
                Ok(())
            }
            None => Err(ProcdagError::NoSuchProcess(name.to_string())),
        }
    }

    /// Request graceful termination of a running process.
    pub fn stop_process(&self, name: &str) -> Result<()> {
        match self.inner.running.get(name) {
            Some(handle) => {
                info!(process = %name, "stop requested");
                handle.stop();
                Ok(())
            }
            None => {
                error!(process = %name, "process is not running");
                Err(ProcdagError::NotRunning(name.to_string()))
            }
        }
    }

    /// Request graceful termination of every currently-running process.
    pub fn stop_running(&self) {
        for handle in self.inner.running.handles() {
            info!(process = %handle.name(), "stop requested");
            handle.stop();
        }
    }

    /// Point-in-time copy of a process's observable state.
    pub fn get_process_state(&self, name: &str) -> Option<ProcessState> {
        let state = self.inner.states.snapshot(name);
        if state.is_none() {
            error!(process = %name, "process doesn't exist");
        }
        state
    }

    /// Declared process names in dependency order.
    pub fn dependency_order_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        dag::with_processes(&self.inner.config.processes, &[], |process| {
            names.push(process.name.clone());
            Ok(())
        })?;
        Ok(names)
    }

    /// Declared process names in ascending lexicographic order.
    pub fn lexicographic_process_names(&self) -> Vec<String> {
        self.inner.config.processes.keys().cloned().collect()
    }

    /// True while at least one process handle is live.
    pub fn has_running_processes(&self) -> bool {
        !self.inner.running.is_empty()
    }

    fn dependency_order(&self) -> Result<Vec<ProcessConfig>> {
        let mut order = Vec::new();
        dag::with_processes(&self.inner.config.processes, &[], |process| {
            order.push(process.clone());
            Ok(())
        })?;
        Ok(order)
    }

    /// Launch one process in its own task: register the handle, then await
    /// dependency conditions before handing off to the handle's run loop.
    /// The registry entry and the live counter are cleaned up on every exit
    /// path.
    fn launch(&self, conf: ProcessConfig, first_attempt: u32) {
        let Some(state) = self.inner.states.get(&conf.name) else {
            // Launch is only called with names drawn from the declared set.
            error!(process = %conf.name, "no state record for process");
            return;
        };

        let logger = self.process_logger(&conf);
        let handle = Arc::new(ProcessHandle::new(
            self.inner.global_env.clone(),
            logger,
            conf.clone(),
            state,
            first_attempt,
        ));

        self.inner.running.add(Arc::clone(&handle));
        self.inner.live.send_modify(|n| *n += 1);

        let project = self.clone();
        tokio::spawn(async move {
            // Deregistration and the counter decrement must happen on every
            // exit path, including a panicking handle.
            let _cleanup = TaskCleanup {
                project: project.clone(),
                name: handle.name().to_string(),
            };
            match project.await_dependencies(&conf).await {
                Ok(()) => handle.run().await,
                Err(err) => {
                    error!(error = %err, "dependency condition failed");
                    error!(process = %handle.name(), "process won't run");
                    handle.wont_run();
                }
            }
        });
    }

    /// Evaluate `depends_on` against the running registry.
    ///
    /// A live dependency is awaited through its handle's rendezvous. When
    /// the registry misses, the state store decides: a dependency that
    /// already reached a terminal state contributes its recorded exit code
    /// (it may have finished before we looked), while a disabled, undeclared
    /// or never-launched dependency is skipped — deliberate soft ordering
    /// against an optional sibling.
    async fn await_dependencies(&self, conf: &ProcessConfig) -> Result<()> {
        for (dep_name, dep) in &conf.depends_on {
            let exit_code = match self.inner.running.get(dep_name) {
                Some(dep_handle) => {
                    if dep.condition == DependencyCondition::ProcessCompletedSuccessfully {
                        info!(
                            process = %conf.name,
                            dependency = %dep_name,
                            "waiting for dependency to complete successfully"
                        );
                    }
                    Some(dep_handle.wait_for_completion(&conf.name).await)
                }
                None => match self.inner.states.snapshot(dep_name) {
                    Some(state)
                        if state.status.is_terminal()
                            && state.status != ProcessStatus::Disabled =>
                    {
                        Some(state.exit_code)
                    }
                    _ => {
                        debug!(
                            process = %conf.name,
                            dependency = %dep_name,
                            "dependency is not running; skipping wait"
                        );
                        None
                    }
                },
            };

            if dep.condition == DependencyCondition::ProcessCompletedSuccessfully {
                if let Some(exit_code) = exit_code {
                    if exit_code != 0 {
                        return Err(ProcdagError::UnmetDependency {
                            name: conf.name.clone(),
                            dependency: dep_name.clone(),
                            exit_code,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn process_logger(&self, conf: &ProcessConfig) -> Option<Arc<ProcessLogFile>> {
        match &conf.log_location {
            Some(path) => match ProcessLogFile::open(path) {
                Ok(logger) => Some(Arc::new(logger)),
                Err(err) => {
                    error!(
                        process = %conf.name,
                        path = %path,
                        error = %err,
                        "failed to open process log file; falling back to project log"
                    );
                    self.inner.logger.clone()
                }
            },
            None => self.inner.logger.clone(),
        }
    }

    async fn wait_until_done(&self) {
        let mut live = self.inner.live.subscribe();
        // The sender lives in the inner project, so the channel cannot close
        // mid-wait.
        let _ = live.wait_for(|n| *n == 0).await;
    }
}

/// Removes the registry entry and releases the live-task slot when the
/// process task ends, whichever way it ends.
struct TaskCleanup {
    project: Project,
    name: String,
}

impl Drop for TaskCleanup {
    fn drop(&mut self) {
        self.project.inner.running.remove(&self.name);
        self.project.inner.live.send_modify(|n| *n -= 1);
    }
}
