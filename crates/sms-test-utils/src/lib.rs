//! Testing utilities for the stake math workspace service
//!
//! Shared fixtures and an in-process stand-in for the math SDK.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use sms_pipeline::{FailureKind, PipelineBackend, PipelineFailure, PipelineJob, Stage};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Text that makes a fake project's configuration "raise" on construction
pub const RAISE_MARKER: &str = "raise ValueError";

pub const TEMPLATE_CONFIG: &str = "\
class GameConfig:
    def __init__(self):
        self.game_id = \"\"
        self.reels = {\"BR0\": \"BR0.csv\", \"FR0\": \"FR0.csv\"}
";

pub const TEMPLATE_STATE: &str = "\
class GameState:
    def __init__(self, config):
        self.config = config
";

pub fn write_tree(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, body).unwrap();
}

/// A throwaway template project
#[derive(Debug)]
pub struct TemplateFixture {
    dir: TempDir,
}

impl TemplateFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        write_tree(dir.path(), "game_config.py", TEMPLATE_CONFIG);
        write_tree(dir.path(), "gamestate.py", TEMPLATE_STATE);
        write_tree(dir.path(), "game_calculations.py", "# calculations\n");
        write_tree(dir.path(), "library/configs/.keep", "");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

impl Default for TemplateFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a fake load was asked to look versus where it actually looked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRecord {
    pub requested: PathBuf,
    pub used: PathBuf,
}

/// In-process imitation of the math SDK, including its hazard
///
/// Like the real library it keeps the games root in one shared mutable
/// slot: `execute` redirects the slot, yields for `delay`, then loads from
/// whatever the slot holds *now*. Overlapping invocations therefore leak
/// into each other unless something serializes them.
///
/// Projects "raise" during instantiation when their `game_config.py`
/// contains [`RAISE_MARKER`]. Each stage writes `library/<stage>.txt`
/// holding the games root it ran against.
#[derive(Debug, Default)]
pub struct FakeLibrary {
    games_root: Mutex<Option<PathBuf>>,
    delay: Duration,
    loads: Mutex<Vec<LoadRecord>>,
}

impl FakeLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn loads(&self) -> Vec<LoadRecord> {
        self.loads.lock().clone()
    }

    fn load_failure(job: &PipelineJob, what: &str) -> PipelineFailure {
        PipelineFailure::new(
            FailureKind::Load,
            format!("No module named '{}'", job.context.module_name(what)),
        )
        .with_traceback(format!(
            "Traceback (most recent call last):\nModuleNotFoundError: No module named '{}'\n",
            job.context.module_name(what)
        ))
    }
}

fn stage_name(stage: &Stage) -> &'static str {
    match stage {
        Stage::CreateBooks { .. } => "create_books",
        Stage::GenerateConfigs => "generate_configs",
        Stage::Optimize { .. } => "optimize",
        Stage::Analyze => "analyze",
    }
}

#[async_trait]
impl PipelineBackend for FakeLibrary {
    async fn execute(&self, job: &PipelineJob) -> Result<(), PipelineFailure> {
        *self.games_root.lock() = Some(job.context.games_root.clone());
        tokio::time::sleep(self.delay).await;

        let used = self
            .games_root
            .lock()
            .clone()
            .unwrap_or_else(|| job.context.games_root.clone());
        self.loads.lock().push(LoadRecord {
            requested: job.context.games_root.clone(),
            used: used.clone(),
        });

        let project = used.join(job.context.game_id.as_str());
        let config = fs::read_to_string(project.join("game_config.py"))
            .map_err(|_| Self::load_failure(job, "game_config"))?;
        if !project.join("gamestate.py").is_file() {
            return Err(Self::load_failure(job, "gamestate"));
        }

        if config.contains(RAISE_MARKER) {
            return Err(PipelineFailure::new(FailureKind::Instantiate, "config construction failed")
                .with_traceback("Traceback (most recent call last):\n  File \"game_config.py\"\nValueError: config construction failed\n"));
        }

        let library = project.join("library");
        fs::create_dir_all(&library)
            .map_err(|e| PipelineFailure::new(FailureKind::Stage, e.to_string()))?;
        for stage in &job.stages {
            let out = library.join(format!("{}.txt", stage_name(stage)));
            fs::write(&out, used.display().to_string())
                .map_err(|e| PipelineFailure::new(FailureKind::Stage, e.to_string()))?;
        }
        Ok(())
    }
}
