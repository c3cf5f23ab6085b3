//! Dependency graph over a project's stages: derived-status resolution,
//! dependent traversal, validation, and topological ordering.

mod cycle;
mod resolver;
mod validate;


use std::collections::HashMap;

use crate::models::stage::Stage;

pub use cycle::{detect_cycles, topological_depths, topological_sort};
pub use resolver::{dependencies_met, dependents, derived_status, DerivedStatus};
pub use validate::{validate, GraphIssue};

/// Index over one project's stages: id lookup plus reverse dependency
/// edges, built in two passes over the stage slice.
///
/// The index borrows the stages it was built from; rebuild it after any
/// mutation of the underlying set.
pub struct DependencyIndex<'a> {
    stages: &'a [Stage],
    by_id: HashMap<&'a str, &'a Stage>,
    /// Reverse adjacency: stage id -> stages that list it as a dependency.
    dependents: HashMap<&'a str, Vec<&'a str>>,
}

impl<'a> DependencyIndex<'a> {
    /// Build an index from a project's stages.
    pub fn build(stages: &'a [Stage]) -> Self {
        let mut by_id = HashMap::new();
        let mut dependents: HashMap<&'a str, Vec<&'a str>> = HashMap::new();

        // First pass: register all nodes
        for stage in stages {
            by_id.insert(stage.id.as_str(), stage);
            dependents.entry(stage.id.as_str()).or_default();
        }

        // Second pass: build reverse edges
        for stage in stages {
            for dep in &stage.dependencies {
                dependents
                    .entry(dep.as_str())
                    .or_default()
                    .push(stage.id.as_str());
            }
        }

        Self {
            stages,
            by_id,
            dependents,
        }
    }

    pub fn get(&self, stage_id: &str) -> Option<&'a Stage> {
        self.by_id.get(stage_id).copied()
    }

    /// All stages, in the order they were supplied.
    pub fn stages(&self) -> &'a [Stage] {
        self.stages
    }

    /// Ids of stages directly depending on `stage_id`.
    pub(crate) fn direct_dependents(&self, stage_id: &str) -> &[&'a str] {
        self.dependents
            .get(stage_id)
            .map(|ids| ids.as_slice())
            .unwrap_or_default()
    }
}
