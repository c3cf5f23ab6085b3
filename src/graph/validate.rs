//! Graph integrity checks. Issues are flagged for operators, never
//! auto-fixed.

use super::{cycle, DependencyIndex};

/// A data-integrity problem found in the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphIssue {
    /// A dependency references a stage id that does not exist.
    MissingDependency {
        stage_id: String,
        dependency_id: String,
    },
    /// A dependency references a stage belonging to another project.
    CrossProjectDependency {
        stage_id: String,
        dependency_id: String,
    },
    /// A dependency chain loops back on itself. The path repeats its
    /// first node at the end.
    Cycle { path: Vec<String> },
}

impl std::fmt::Display for GraphIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphIssue::MissingDependency {
                stage_id,
                dependency_id,
            } => write!(
                f,
                "stage '{stage_id}' depends on missing stage '{dependency_id}'"
            ),
            GraphIssue::CrossProjectDependency {
                stage_id,
                dependency_id,
            } => write!(
                f,
                "stage '{stage_id}' depends on stage '{dependency_id}' from another project"
            ),
            GraphIssue::Cycle { path } => {
                write!(f, "circular dependency detected: {}", path.join(" -> "))
            }
        }
    }
}

/// Validate the dependency graph, flagging missing references,
/// cross-project edges, and cycles.
///
/// Cycles are found by the same depth-first detector the scheduler uses,
/// so validation and ordering cannot disagree about what constitutes a
/// cycle.
pub fn validate(index: &DependencyIndex<'_>) -> Vec<GraphIssue> {
    let mut issues = Vec::new();

    for stage in index.stages() {
        for dep in &stage.dependencies {
            match index.get(dep) {
                None => issues.push(GraphIssue::MissingDependency {
                    stage_id: stage.id.clone(),
                    dependency_id: dep.clone(),
                }),
                Some(dep_stage) if dep_stage.project_id != stage.project_id => {
                    issues.push(GraphIssue::CrossProjectDependency {
                        stage_id: stage.id.clone(),
                        dependency_id: dep.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    if let Err(cycle) = cycle::detect_cycles(index) {
        issues.push(GraphIssue::Cycle { path: cycle.path });
    }

    issues
}
