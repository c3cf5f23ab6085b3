//! File-backed collaborator implementations.
//!
//! Stage files are markdown with YAML frontmatter, named with a
//! topological depth prefix for human readability:
//! - `01-brand-brief.md` (depth 0, no dependencies)
//! - `02-visual-direction.md` (depth 1, depends on depth-0 stages)
//! - `03-homepage-draft.md` (depth 2)
//!
//! Existing files are updated in place regardless of prefix, so a
//! renumbered template does not orphan records.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::warn;

use crate::error::EngineError;
use crate::graph::{topological_depths, DependencyIndex};
use crate::models::audit::AuditEntry;
use crate::models::project::ProjectPatch;
use crate::models::stage::Stage;

use super::{AuditStore, ProjectStore, StagePatch, StageStore};

/// Stage store persisting each stage as a frontmatter markdown file
/// under `<root>/stages/`.
pub struct FileStageStore {
    root: PathBuf,
}

impl FileStageStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn stages_dir(&self) -> PathBuf {
        self.root.join("stages")
    }

    fn load(&self, stage_id: &str) -> Result<Stage> {
        let path = find_stage_file(&self.stages_dir(), stage_id)?
            .ok_or_else(|| EngineError::StageNotFound(stage_id.to_string()))?;
        load_stage_from_path(&path)
    }

    fn save(&self, stage: &Stage, depth: usize) -> Result<()> {
        let stages_dir = self.stages_dir();
        fs::create_dir_all(&stages_dir).with_context(|| {
            format!("Failed to create stages directory: {}", stages_dir.display())
        })?;

        // Update an existing file in place (any prefix); new stages get
        // a depth-prefixed filename.
        let path = match find_stage_file(&stages_dir, &stage.id)? {
            Some(existing) => existing,
            None => stages_dir.join(stage_filename(depth, &stage.id)),
        };

        let content = serialize_stage_to_markdown(stage)?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write stage file: {}", path.display()))
    }
}

impl StageStore for FileStageStore {
    fn list(&self, project_id: &str) -> Result<Vec<Stage>> {
        let stages_dir = self.stages_dir();
        if !stages_dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&stages_dir).with_context(|| {
            format!("Failed to read stages directory: {}", stages_dir.display())
        })?;

        let mut stages = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();

            if path.extension().and_then(|s| s.to_str()) != Some("md") {
                continue;
            }

            match load_stage_from_path(&path) {
                Ok(stage) if stage.project_id == project_id => stages.push(stage),
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unparseable stage file");
                }
            }
        }

        stages.sort_by(|a, b| a.number_index.cmp(&b.number_index).then(a.id.cmp(&b.id)));
        Ok(stages)
    }

    fn get(&self, stage_id: &str) -> Result<Option<Stage>> {
        match find_stage_file(&self.stages_dir(), stage_id)? {
            Some(path) => Ok(Some(load_stage_from_path(&path)?)),
            None => Ok(None),
        }
    }

    fn update(&self, stage_id: &str, patch: StagePatch) -> Result<Stage> {
        let mut stage = self.load(stage_id)?;
        patch.apply(&mut stage);
        self.save(&stage, 0)?;
        Ok(stage)
    }

    fn bulk_create(&self, stages: Vec<Stage>) -> Result<()> {
        let index = DependencyIndex::build(&stages);
        let depths = topological_depths(&index)?;

        for stage in &stages {
            let depth = depths.get(&stage.id).copied().unwrap_or(0);
            self.save(stage, depth)?;
        }
        Ok(())
    }
}

/// Append-only audit store writing one JSON record per line.
pub struct FileAuditStore {
    path: PathBuf,
}

impl FileAuditStore {
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join("history.jsonl"),
        }
    }
}

impl AuditStore for FileAuditStore {
    fn create(&self, entry: AuditEntry) -> Result<()> {
        let line =
            serde_json::to_string(&entry).context("Failed to serialize audit entry")?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open audit log: {}", self.path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("Failed to append audit log: {}", self.path.display()))
    }
}

/// Project rollup store writing `<root>/projects/<id>.json`.
pub struct FileProjectStore {
    root: PathBuf,
}

impl FileProjectStore {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }
}

impl ProjectStore for FileProjectStore {
    fn update(&self, project_id: &str, patch: ProjectPatch) -> Result<()> {
        let dir = self.root.join("projects");
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create projects directory: {}", dir.display()))?;
        let path = dir.join(format!("{project_id}.json"));
        let content = serde_json::to_string_pretty(&patch)
            .context("Failed to serialize project rollup")?;
        fs::write(&path, content)
            .with_context(|| format!("Failed to write project rollup: {}", path.display()))
    }
}

/// Generate a stage filename with depth prefix, `{depth+1:02}-{id}.md`.
fn stage_filename(depth: usize, stage_id: &str) -> String {
    format!("{:02}-{}.md", depth + 1, stage_id)
}

/// Find a stage file by stage id, regardless of its depth prefix.
///
/// Matches `{stage_id}.md` exactly or `XX-{stage_id}.md` where XX is
/// digits.
fn find_stage_file(stages_dir: &Path, stage_id: &str) -> Result<Option<PathBuf>> {
    if !stages_dir.exists() {
        return Ok(None);
    }

    let entries = fs::read_dir(stages_dir)
        .with_context(|| format!("Failed to read stages directory: {}", stages_dir.display()))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        if path.extension().and_then(|s| s.to_str()) != Some("md") {
            continue;
        }

        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            if stem == stage_id {
                return Ok(Some(path));
            }

            if let Some(suffix) = stem.strip_prefix(|c: char| c.is_ascii_digit()) {
                if let Some(suffix) = suffix.strip_prefix(|c: char| c.is_ascii_digit()) {
                    if let Some(id) = suffix.strip_prefix('-') {
                        if id == stage_id {
                            return Ok(Some(path));
                        }
                    }
                }
            }
        }
    }

    Ok(None)
}

fn load_stage_from_path(path: &Path) -> Result<Stage> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read stage file: {}", path.display()))?;
    parse_stage_from_markdown(&content)
        .with_context(|| format!("Failed to parse stage from: {}", path.display()))
}

/// Parse a Stage from markdown with YAML frontmatter.
fn parse_stage_from_markdown(content: &str) -> Result<Stage> {
    let frontmatter = extract_yaml_frontmatter(content)?;
    let stage: Stage = serde_yaml::from_value(frontmatter)
        .context("Failed to deserialize Stage from YAML frontmatter")?;
    Ok(stage)
}

/// Serialize a Stage to markdown with YAML frontmatter and a short
/// human-readable body.
fn serialize_stage_to_markdown(stage: &Stage) -> Result<String> {
    let yaml = serde_yaml::to_string(stage).context("Failed to serialize Stage to YAML")?;

    let mut content = String::new();
    content.push_str("---\n");
    content.push_str(&yaml);
    content.push_str("---\n\n");

    content.push_str(&format!("# Stage: {}\n\n", stage.name));
    content.push_str(&format!("**Phase**: {}\n\n", stage.category));
    content.push_str(&format!("**Status**: {}\n\n", stage.status));

    if !stage.dependencies.is_empty() {
        content.push_str("## Dependencies\n\n");
        for dep in &stage.dependencies {
            content.push_str(&format!("- {dep}\n"));
        }
        content.push('\n');
    }

    if let Some(owner) = &stage.assigned_to {
        content.push_str(&format!("**Assigned to**: {owner}\n"));
    }

    Ok(content)
}

/// Extract YAML frontmatter delimited by `---` lines.
fn extract_yaml_frontmatter(content: &str) -> Result<serde_yaml::Value> {
    let lines: Vec<&str> = content.lines().collect();

    if lines.is_empty() || !lines[0].trim().starts_with("---") {
        bail!("No frontmatter delimiter found at start of content");
    }

    let mut end_idx = None;
    for (idx, line) in lines.iter().enumerate().skip(1) {
        if line.trim().starts_with("---") {
            end_idx = Some(idx);
            break;
        }
    }

    let end_idx =
        end_idx.ok_or_else(|| anyhow::anyhow!("Frontmatter not properly closed with ---"))?;

    let yaml_content = lines[1..end_idx].join("\n");
    serde_yaml::from_str(&yaml_content).context("Failed to parse YAML frontmatter")
}
