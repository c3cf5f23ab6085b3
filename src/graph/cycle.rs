//! Cycle detection and topological ordering via depth-first traversal
//! with visiting/visited marker sets.

use std::collections::{HashMap, HashSet};

use crate::error::CycleError;

use super::DependencyIndex;

/// Produce a dependency-first ordering of all stage ids.
///
/// A dependency chain that loops back on itself is a hard failure, not a
/// warning: callers must handle the cycle case instead of silently
/// dropping nodes. Dependencies referencing missing stages are skipped
/// here; [`super::validate`] reports them.
pub fn topological_sort(index: &DependencyIndex<'_>) -> Result<Vec<String>, CycleError> {
    let mut visited = HashSet::new();
    let mut visiting = HashSet::new();
    let mut path = Vec::new();
    let mut order = Vec::new();

    for stage in index.stages() {
        visit(
            &stage.id,
            index,
            &mut visiting,
            &mut visited,
            &mut path,
            &mut order,
        )?;
    }

    Ok(order)
}

/// DFS helper; pushes a node after all of its dependencies.
fn visit(
    stage_id: &str,
    index: &DependencyIndex<'_>,
    visiting: &mut HashSet<String>,
    visited: &mut HashSet<String>,
    path: &mut Vec<String>,
    order: &mut Vec<String>,
) -> Result<(), CycleError> {
    if visited.contains(stage_id) {
        return Ok(());
    }

    if visiting.contains(stage_id) {
        // Found a cycle - reconstruct its path
        let mut cycle = vec![stage_id.to_string()];
        for p in path.iter().rev() {
            cycle.push(p.clone());
            if p == stage_id {
                break;
            }
        }
        cycle.reverse();
        return Err(CycleError { path: cycle });
    }

    visiting.insert(stage_id.to_string());
    path.push(stage_id.to_string());

    let node = index.get(stage_id);
    if let Some(stage) = node {
        for dep in &stage.dependencies {
            visit(dep, index, visiting, visited, path, order)?;
        }
    }

    path.pop();
    visiting.remove(stage_id);
    visited.insert(stage_id.to_string());

    if node.is_some() {
        order.push(stage_id.to_string());
    }

    Ok(())
}

/// Check the graph for circular dependencies.
pub fn detect_cycles(index: &DependencyIndex<'_>) -> Result<(), CycleError> {
    topological_sort(index).map(|_| ())
}

/// Topological depth of each stage: 0 for stages with no dependencies,
/// otherwise one more than the deepest dependency.
///
/// Used for ordered presentation (e.g. depth-prefixed file names), not
/// for scheduling correctness.
pub fn topological_depths(
    index: &DependencyIndex<'_>,
) -> Result<HashMap<String, usize>, CycleError> {
    let order = topological_sort(index)?;
    let mut depths: HashMap<String, usize> = HashMap::new();

    for id in &order {
        let depth = index
            .get(id)
            .map(|stage| {
                stage
                    .dependencies
                    .iter()
                    .filter_map(|dep| depths.get(dep))
                    .map(|d| d + 1)
                    .max()
                    .unwrap_or(0)
            })
            .unwrap_or(0);
        depths.insert(id.clone(), depth);
    }

    Ok(depths)
}
