// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod logfile;
pub mod logging;
pub mod process;
pub mod project;

use std::path::PathBuf;

use anyhow::Result;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::loader::{auto_discover, load_project, DiscoveredConfig};
use crate::project::Project;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - compose file discovery and loading
/// - logging
/// - the project supervisor
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let discovered = match &args.config {
        Some(path) => DiscoveredConfig::explicit(PathBuf::from(path)),
        None => auto_discover(&std::env::current_dir()?)?,
    };

    let project_config = load_project(&discovered.path)?;

    // Logging is initialised only now so the compose file's log_level can
    // participate; discovery warnings are replayed after init.
    logging::init_logging(args.log_level, project_config.log_level.as_deref())?;
    discovered.warn_if_ambiguous();
    info!(config = %discovered.path.display(), "loaded compose file");

    let project = Project::new(project_config)?;

    if args.dry_run {
        print_dry_run(&project)?;
        return Ok(());
    }

    // Ctrl-C → graceful stop of every running process; the supervisor then
    // observes the exits in the normal path and returns.
    {
        let project = project.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("interrupt received; stopping all running processes");
            project.stop_running();
        });
    }

    project.run().await?;
    Ok(())
}

/// Simple dry-run output: print the startup order and each process's deps.
fn print_dry_run(project: &Project) -> Result<()> {
    let order = project.dependency_order_names()?;

    println!("procdag dry-run");
    println!("startup order ({}):", order.len());
    for name in &order {
        println!("  - {name}");
        if let Some(process) = project.config().processes.get(name) {
            println!("      command: {}", process.command);
            if let Some(ref dir) = process.working_dir {
                println!("      working_dir: {dir}");
            }
            for (dep, on) in &process.depends_on {
                println!("      depends_on: {dep} ({:?})", on.condition);
            }
        }
    }
    Ok(())
}
