// src/dag/walker.rs

use std::collections::{BTreeMap, HashSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::model::ProcessConfig;
use crate::errors::{ProcdagError, Result};

/// Invoke `visit` on every process reachable from `names`, in an order such
/// that every process is visited after all of its `depends_on` dependencies
/// (post-order depth-first traversal).
///
/// - An empty `names` starts from all non-disabled processes; the config map
///   is a `BTreeMap`, so the top-level visit set is lexicographic and the
///   output is stable for a given graph.
/// - A provided name that is not declared fails with `NoSuchProcess`.
/// - Disabled processes are omitted entirely, both as starting points and as
///   dependencies.
/// - Dependency names absent from the declared set are skipped: a process
///   may declare soft ordering against an optional sibling.
/// - A cyclic `depends_on` chain is reported as `CyclicDependency` before
///   any process is visited.
pub fn with_processes<F>(
    processes: &BTreeMap<String, ProcessConfig>,
    names: &[String],
    mut visit: F,
) -> Result<()>
where
    F: FnMut(&ProcessConfig) -> Result<()>,
{
    ensure_acyclic(processes)?;

    let start: Vec<&ProcessConfig> = if names.is_empty() {
        processes.values().filter(|p| !p.disabled).collect()
    } else {
        let mut start = Vec::with_capacity(names.len());
        for name in names {
            match processes.get(name) {
                Some(process) if process.disabled => continue,
                Some(process) => start.push(process),
                None => return Err(ProcdagError::NoSuchProcess(name.clone())),
            }
        }
        start
    };

    let mut visited: HashSet<String> = HashSet::new();
    for process in start {
        visit_process(processes, process, &mut visited, &mut visit)?;
    }
    Ok(())
}

/// Reject cyclic `depends_on` chains up front, so the traversal below can
/// rely on the graph being a DAG.
///
/// Edge direction: dependency -> dependent. Disabled and undeclared
/// dependency names contribute no edges, mirroring how the traversal skips
/// them.
fn ensure_acyclic(processes: &BTreeMap<String, ProcessConfig>) -> Result<()> {
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for (name, process) in processes.iter() {
        if process.disabled {
            continue;
        }
        graph.add_node(name.as_str());
    }

    for (name, process) in processes.iter() {
        if process.disabled {
            continue;
        }
        for dep in process.dependency_names() {
            match processes.get(dep) {
                Some(dep_process) if !dep_process.disabled => {
                    graph.add_edge(dep, name.as_str(), ());
                }
                _ => {}
            }
        }
    }

    // A topological sort fails iff there is a cycle.
    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(ProcdagError::CyclicDependency(cycle.node_id().to_string())),
    }
}

fn visit_process<F>(
    processes: &BTreeMap<String, ProcessConfig>,
    process: &ProcessConfig,
    visited: &mut HashSet<String>,
    visit: &mut F,
) -> Result<()>
where
    F: FnMut(&ProcessConfig) -> Result<()>,
{
    if !visited.insert(process.name.clone()) {
        return Ok(());
    }

    for dep_name in process.dependency_names() {
        match processes.get(dep_name) {
            Some(dep) if dep.disabled => continue,
            Some(dep) => visit_process(processes, dep, visited, visit)?,
            None => {
                debug!(
                    process = %process.name,
                    dependency = %dep_name,
                    "dependency is not declared; treating as soft ordering"
                );
            }
        }
    }

    visit(process)
}
