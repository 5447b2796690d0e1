//! Pipeline jobs
//!
//! A job is the complete, ordered description of one invocation. It is a
//! plain value so the ordering rules can be checked without any external
//! library present, and so it can be handed across a process boundary.

use crate::result::{FailureKind, PipelineFailure};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sms_workspace::GameId;
use std::path::{Path, PathBuf};

/// Explicit replacement for the library's process-wide games root
///
/// Every load receives one of these instead of relying on whatever the
/// global happens to point at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadContext {
    /// Directory prepended to the module search path (parent of `games_root`)
    pub workspace_root: PathBuf,
    /// Value the library's games root is redirected to
    pub games_root: PathBuf,
    /// Project to load as `games.<game_id>`
    pub game_id: GameId,
}

impl LoadContext {
    /// Build the context for `game_id` inside `games_root`
    ///
    /// # Errors
    /// [`FailureKind::Load`] if `games_root` has no parent directory
    pub fn new(games_root: impl Into<PathBuf>, game_id: GameId) -> Result<Self, PipelineFailure> {
        let games_root = games_root.into();
        let workspace_root = games_root
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                PipelineFailure::new(
                    FailureKind::Load,
                    format!("games root {} has no parent", games_root.display()),
                )
            })?;
        Ok(Self {
            workspace_root,
            games_root,
            game_id,
        })
    }

    /// Dotted module name of `module` inside the project
    #[must_use]
    pub fn module_name(&self, module: &str) -> String {
        format!("games.{}.{module}", self.game_id)
    }
}

/// One external library call, executed after the project is instantiated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Stage {
    /// Simulate books for each mode
    CreateBooks {
        /// Simulation counts per mode name
        num_sim_args: IndexMap<String, u64>,
        /// Simulations per batch
        batch_size: u32,
        /// Worker threads
        threads: u32,
        /// Compress book output
        compress: bool,
        /// Profile the simulation
        profiling: bool,
    },
    /// (Re)write publish-ready configuration files
    GenerateConfigs,
    /// Run the optimizer over the given modes
    Optimize {
        /// Mode names, in request order
        modes: Vec<String>,
        /// Optimizer threads
        rust_threads: u32,
    },
    /// Produce the statistics sheet for the configured game id
    Analyze,
}

/// Caller options for a full run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunOptions {
    /// Simulate books before generating configs
    pub run_sims: bool,
    /// Run the optimizer afterwards
    pub run_optimization: bool,
    /// Produce analytics afterwards
    pub run_analysis: bool,
    /// Simulation counts per mode name
    pub num_sim_args: IndexMap<String, u64>,
    /// Simulation threads
    pub threads: u32,
    /// Simulations per batch
    pub batch_size: u32,
    /// Compress book output
    pub compress: bool,
    /// Profile the simulation
    pub profiling: bool,
    /// Optimizer threads
    pub rust_threads: u32,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            run_sims: true,
            run_optimization: false,
            run_analysis: false,
            num_sim_args: IndexMap::from([("base".to_owned(), 100)]),
            threads: 1,
            batch_size: 1000,
            compress: true,
            profiling: false,
            rust_threads: 4,
        }
    }
}

/// What an invocation is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    /// Load and instantiate only
    Validate,
    /// Load, instantiate and execute stages
    Run,
}

/// A complete invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineJob {
    /// Validate or run
    pub mode: JobMode,
    /// Where the project lives
    pub context: LoadContext,
    /// Stages executed in order after instantiation
    pub stages: Vec<Stage>,
}

impl PipelineJob {
    /// Load-and-instantiate job; success of instantiation is the verdict
    #[must_use]
    pub fn validate(context: LoadContext) -> Self {
        Self {
            mode: JobMode::Validate,
            context,
            stages: Vec::new(),
        }
    }

    /// Full run job
    ///
    /// Order: books (optional), configs (always), optimizer followed by a
    /// second configs pass (optional), analytics (optional).
    #[must_use]
    pub fn run(context: LoadContext, options: &RunOptions) -> Self {
        let mut stages = Vec::with_capacity(5);

        if options.run_sims {
            stages.push(Stage::CreateBooks {
                num_sim_args: options.num_sim_args.clone(),
                batch_size: options.batch_size,
                threads: options.threads,
                compress: options.compress,
                profiling: options.profiling,
            });
        }

        stages.push(Stage::GenerateConfigs);

        if options.run_optimization {
            stages.push(Stage::Optimize {
                modes: options.num_sim_args.keys().cloned().collect(),
                rust_threads: options.rust_threads,
            });
            stages.push(Stage::GenerateConfigs);
        }

        if options.run_analysis {
            stages.push(Stage::Analyze);
        }

        Self {
            mode: JobMode::Run,
            context,
            stages,
        }
    }

    /// Check if any stage may call into the optimizer's native code
    #[must_use]
    pub fn wants_native_backtrace(&self) -> bool {
        self.stages
            .iter()
            .any(|s| matches!(s, Stage::Optimize { .. } | Stage::Analyze))
    }
}
