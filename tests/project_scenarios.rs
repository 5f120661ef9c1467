// tests/project_scenarios.rs

//! End-to-end supervisor scenarios driving real `sh -c` children.

mod common;
use crate::common::builders::{ProcessBuilder, ProjectBuilder};
use crate::common::init_tracing;

use std::error::Error;
use std::fs;

use tokio::time::{sleep, timeout, Duration};

use procdag::config::{DependencyCondition, RestartMode};
use procdag::errors::ProcdagError;
use procdag::process::ProcessStatus;
use procdag::project::Project;

type TestResult = Result<(), Box<dyn Error>>;

/// Poll until the named process reaches `status`, bounded by `secs`.
async fn wait_for_status(project: &Project, name: &str, status: ProcessStatus, secs: u64) {
    let deadline = timeout(Duration::from_secs(secs), async {
        loop {
            if let Some(state) = project.get_process_state(name) {
                if state.status == status {
                    return;
                }
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(
        deadline.is_ok(),
        "process '{name}' did not reach {status} within {secs}s"
    );
}

#[tokio::test]
async fn linear_chain_completes_in_order() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let order_file = dir.path().join("order.txt");
    let append = |name: &str| format!("echo {} >> {}", name, order_file.display());

    let config = ProjectBuilder::new()
        .with_process("a", ProcessBuilder::new(&append("a")).build())
        .with_process(
            "b",
            ProcessBuilder::new(&append("b"))
                .depends_on("a", DependencyCondition::ProcessCompletedSuccessfully)
                .build(),
        )
        .with_process(
            "c",
            ProcessBuilder::new(&append("c"))
                .depends_on("b", DependencyCondition::ProcessCompletedSuccessfully)
                .build(),
        )
        .build();

    let project = Project::new(config)?;
    timeout(Duration::from_secs(10), project.run()).await??;

    for name in ["a", "b", "c"] {
        let state = project.get_process_state(name).ok_or("missing state")?;
        assert_eq!(state.status, ProcessStatus::Completed, "state of {name}");
        assert_eq!(state.exit_code, 0, "exit code of {name}");
    }

    let contents = fs::read_to_string(&order_file)?;
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines, vec!["a", "b", "c"]);

    Ok(())
}

#[tokio::test]
async fn failed_precondition_skips_dependents() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let marker_b = dir.path().join("b.ran");
    let marker_c = dir.path().join("c.ran");

    let config = ProjectBuilder::new()
        .with_process("a", ProcessBuilder::new("exit 5").build())
        .with_process(
            "b",
            ProcessBuilder::new(&format!("touch {}", marker_b.display()))
                .depends_on("a", DependencyCondition::ProcessCompletedSuccessfully)
                .build(),
        )
        .with_process(
            "c",
            ProcessBuilder::new(&format!("touch {}", marker_c.display()))
                .depends_on("b", DependencyCondition::ProcessCompletedSuccessfully)
                .build(),
        )
        .build();

    let project = Project::new(config)?;
    timeout(Duration::from_secs(10), project.run()).await??;

    let a = project.get_process_state("a").ok_or("missing state")?;
    assert_eq!(a.status, ProcessStatus::Error);
    assert_eq!(a.exit_code, 5);

    for name in ["b", "c"] {
        let state = project.get_process_state(name).ok_or("missing state")?;
        assert_eq!(state.status, ProcessStatus::Skipped, "state of {name}");
        assert_eq!(state.exit_code, -1, "exit code of {name}");
    }

    // Neither dependent was ever spawned.
    assert!(!marker_b.exists());
    assert!(!marker_c.exists());

    Ok(())
}

#[tokio::test]
async fn absent_and_disabled_dependencies_are_tolerated() -> TestResult {
    init_tracing();

    let config = ProjectBuilder::new()
        .with_process(
            "a",
            ProcessBuilder::new("true")
                .depends_on("missing_sibling", DependencyCondition::ProcessCompleted)
                .build(),
        )
        .with_process(
            "b",
            ProcessBuilder::new("true")
                .depends_on("d", DependencyCondition::ProcessCompletedSuccessfully)
                .build(),
        )
        .with_process("d", ProcessBuilder::new("true").disabled().build())
        .build();

    let project = Project::new(config)?;
    timeout(Duration::from_secs(10), project.run()).await??;

    for name in ["a", "b"] {
        let state = project.get_process_state(name).ok_or("missing state")?;
        assert_eq!(state.status, ProcessStatus::Completed, "state of {name}");
        assert_eq!(state.exit_code, 0, "exit code of {name}");
    }

    let disabled = project.get_process_state("d").ok_or("missing state")?;
    assert_eq!(disabled.status, ProcessStatus::Disabled);

    Ok(())
}

#[tokio::test]
async fn stop_terminates_a_long_running_process() -> TestResult {
    init_tracing();

    let config = ProjectBuilder::new()
        .with_process("srv", ProcessBuilder::new("sleep 30").build())
        .build();

    let project = Project::new(config)?;
    let runner = tokio::spawn({
        let project = project.clone();
        async move { project.run().await }
    });

    wait_for_status(&project, "srv", ProcessStatus::Running, 5).await;
    project.stop_process("srv")?;

    timeout(Duration::from_secs(10), runner).await???;

    let state = project.get_process_state("srv").ok_or("missing state")?;
    assert!(
        state.status == ProcessStatus::Completed || state.status == ProcessStatus::Error,
        "unexpected terminal status {}",
        state.status
    );
    assert!(!project.has_running_processes());

    // Stop after termination is NotRunning.
    match project.stop_process("srv") {
        Err(ProcdagError::NotRunning(name)) => assert_eq!(name, "srv"),
        other => panic!("expected NotRunning, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn start_while_running_is_rejected() -> TestResult {
    init_tracing();

    let config = ProjectBuilder::new()
        .with_process("srv", ProcessBuilder::new("sleep 30").build())
        .build();

    let project = Project::new(config)?;
    let runner = tokio::spawn({
        let project = project.clone();
        async move { project.run().await }
    });

    wait_for_status(&project, "srv", ProcessStatus::Running, 5).await;

    match project.start_process("srv") {
        Err(ProcdagError::AlreadyRunning(name)) => assert_eq!(name, "srv"),
        other => panic!("expected AlreadyRunning, got {other:?}"),
    }

    // No second handle was created: the record saw no restart.
    let state = project.get_process_state("srv").ok_or("missing state")?;
    assert_eq!(state.restarts, 0);

    project.stop_process("srv")?;
    timeout(Duration::from_secs(10), runner).await???;

    Ok(())
}

#[tokio::test]
async fn start_of_unknown_process_is_rejected() -> TestResult {
    init_tracing();

    let config = ProjectBuilder::new()
        .with_process("a", ProcessBuilder::new("true").build())
        .build();

    let project = Project::new(config)?;
    match project.start_process("nope") {
        Err(ProcdagError::NoSuchProcess(name)) => assert_eq!(name, "nope"),
        other => panic!("expected NoSuchProcess, got {other:?}"),
    }

    Ok(())
}

#[tokio::test]
async fn restart_on_failure_respects_budget() -> TestResult {
    init_tracing();

    let config = ProjectBuilder::new()
        .with_process(
            "flaky",
            ProcessBuilder::new("exit 1")
                .restart(RestartMode::OnFailure, 0, 2)
                .build(),
        )
        .build();

    let project = Project::new(config)?;
    timeout(Duration::from_secs(10), project.run()).await??;

    let state = project.get_process_state("flaky").ok_or("missing state")?;
    assert_eq!(state.status, ProcessStatus::Error);
    assert_eq!(state.exit_code, 1);
    assert_eq!(state.restarts, 2);

    Ok(())
}

#[tokio::test]
async fn relaunch_after_completion_counts_as_restart() -> TestResult {
    init_tracing();

    let config = ProjectBuilder::new()
        .with_process("a", ProcessBuilder::new("true").build())
        .build();

    let project = Project::new(config)?;
    timeout(Duration::from_secs(10), project.run()).await??;

    let first = project.get_process_state("a").ok_or("missing state")?;
    assert_eq!(first.status, ProcessStatus::Completed);
    assert_eq!(first.restarts, 0);

    project.start_process("a")?;

    let settled = timeout(Duration::from_secs(10), async {
        loop {
            if let Some(state) = project.get_process_state("a") {
                if state.restarts == 1
                    && state.status == ProcessStatus::Completed
                    && !project.has_running_processes()
                {
                    return state;
                }
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;

    assert_eq!(settled.exit_code, 0);

    Ok(())
}

#[tokio::test]
async fn global_environment_reaches_children() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let out = dir.path().join("env.txt");

    let config = ProjectBuilder::new()
        .with_environment("FLEET_GREETING=hello")
        .with_process(
            "envy",
            ProcessBuilder::new(&format!("echo $FLEET_GREETING-$LOCAL_ONE > {}", out.display()))
                .environment("LOCAL_ONE=world")
                .build(),
        )
        .build();

    let project = Project::new(config)?;
    timeout(Duration::from_secs(10), project.run()).await??;

    let contents = fs::read_to_string(&out)?;
    assert_eq!(contents.trim(), "hello-world");

    Ok(())
}

#[tokio::test]
async fn process_output_is_routed_to_its_log_file() -> TestResult {
    init_tracing();

    let dir = tempfile::tempdir()?;
    let log = dir.path().join("logs").join("chatty.log");

    let config = ProjectBuilder::new()
        .with_process(
            "chatty",
            ProcessBuilder::new("echo one; echo two")
                .log_location(&log.display().to_string())
                .build(),
        )
        .build();

    let project = Project::new(config)?;
    timeout(Duration::from_secs(10), project.run()).await??;

    // Output streaming runs in detached tasks; give them a moment to drain.
    let drained = timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(contents) = fs::read_to_string(&log) {
                if contents.contains("one") && contents.contains("two") {
                    return;
                }
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(drained.is_ok(), "log file was not written in time");

    Ok(())
}
