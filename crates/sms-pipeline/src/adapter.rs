//! External pipeline adapter
//!
//! Entry point for validate and run requests. Each invocation:
//!
//! 1. waits for the process-wide [`PipelineGate`]
//! 2. builds the explicit [`LoadContext`] for the request's workspace
//! 3. hands the ordered [`PipelineJob`] to the backend under a time limit
//! 4. folds every failure (including the time limit) into a [`RunResult`]
//!
//! Nothing here returns an error: a broken project yields `ok: false`, never
//! a fault in the service.

use crate::backend::PipelineBackend;
use crate::gate::PipelineGate;
use crate::job::{JobMode, LoadContext, PipelineJob, RunOptions};
use crate::result::{FailureKind, PipelineFailure, RunResult, ValidateResult};
use sms_workspace::GameId;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default per-invocation time limit
pub const DEFAULT_MAX_RUN: Duration = Duration::from_secs(120);

/// Drives the external library for one workspace at a time
#[derive(Clone)]
pub struct ExternalPipelineAdapter {
    backend: Arc<dyn PipelineBackend>,
    gate: Arc<PipelineGate>,
    max_run: Duration,
}

impl std::fmt::Debug for ExternalPipelineAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalPipelineAdapter")
            .field("max_run", &self.max_run)
            .finish_non_exhaustive()
    }
}

impl ExternalPipelineAdapter {
    /// Create an adapter admitted through the process-wide gate
    #[must_use]
    pub fn new(backend: Arc<dyn PipelineBackend>) -> Self {
        Self::with_gate(backend, PipelineGate::global())
    }

    /// Create an adapter admitted through a specific gate
    #[must_use]
    pub fn with_gate(backend: Arc<dyn PipelineBackend>, gate: Arc<PipelineGate>) -> Self {
        Self {
            backend,
            gate,
            max_run: DEFAULT_MAX_RUN,
        }
    }

    /// Set the per-invocation time limit (gate waiting time is not counted)
    #[must_use]
    pub fn with_max_run(mut self, max_run: Duration) -> Self {
        self.max_run = max_run;
        self
    }

    /// Per-invocation time limit
    #[inline]
    #[must_use]
    pub fn max_run(&self) -> Duration {
        self.max_run
    }

    /// Check that `game` loads and instantiates; no simulation is run
    pub async fn validate(&self, games_root: &Path, game: &GameId) -> ValidateResult {
        match LoadContext::new(games_root, game.clone()) {
            Ok(context) => self.invoke(PipelineJob::validate(context)).await,
            Err(failure) => RunResult::failure(failure),
        }
    }

    /// Load `game` and execute the stages selected by `options`
    pub async fn run(&self, games_root: &Path, game: &GameId, options: &RunOptions) -> RunResult {
        match LoadContext::new(games_root, game.clone()) {
            Ok(context) => self.invoke(PipelineJob::run(context, options)).await,
            Err(failure) => RunResult::failure(failure),
        }
    }

    async fn invoke(&self, job: PipelineJob) -> RunResult {
        let _pass = self.gate.enter().await;
        let started = Instant::now();
        let game = job.context.game_id.clone();
        let games_root = job.context.games_root.display().to_string();

        tracing::info!(
            game = %game,
            games_root = %games_root,
            mode = ?job.mode,
            stages = job.stages.len(),
            "pipeline invocation started"
        );

        let outcome = match tokio::time::timeout(self.max_run, self.backend.execute(&job)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(PipelineFailure::new(
                FailureKind::Timeout,
                format!("pipeline exceeded {}s", self.max_run.as_secs_f64()),
            )),
        };

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match &outcome {
            Ok(()) => tracing::info!(game = %game, elapsed_ms, "pipeline invocation succeeded"),
            Err(failure) if job.mode == JobMode::Validate => {
                tracing::info!(game = %game, elapsed_ms, kind = %failure.kind, error = %failure.message, "validation failed");
            }
            Err(failure) => {
                tracing::warn!(game = %game, elapsed_ms, kind = %failure.kind, error = %failure.message, "pipeline run failed");
            }
        }

        RunResult::from(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockPipelineBackend;
    use crate::job::Stage;
    use mockall::predicate::function;

    fn game() -> GameId {
        GameId::parse("lines").unwrap()
    }

    fn adapter(mock: MockPipelineBackend) -> ExternalPipelineAdapter {
        ExternalPipelineAdapter::with_gate(Arc::new(mock), Arc::new(PipelineGate::new()))
    }

    #[tokio::test]
    async fn validate_passes_explicit_context() {
        let mut mock = MockPipelineBackend::new();
        mock.expect_execute()
            .with(function(|job: &PipelineJob| {
                job.mode == JobMode::Validate
                    && job.stages.is_empty()
                    && job.context.games_root == Path::new("/ws/a/games")
                    && job.context.workspace_root == Path::new("/ws/a")
            }))
            .times(1)
            .returning(|_| Ok(()));

        let result = adapter(mock).validate(Path::new("/ws/a/games"), &game()).await;
        assert!(result.is_ok());
        assert_eq!(result.error(), None);
    }

    #[tokio::test]
    async fn backend_failure_becomes_result() {
        let mut mock = MockPipelineBackend::new();
        mock.expect_execute().times(1).returning(|_| {
            Err(PipelineFailure::new(FailureKind::Instantiate, "reel file missing")
                .with_traceback("Traceback (most recent call last): ..."))
        });

        let result = adapter(mock).validate(Path::new("/ws/a/games"), &game()).await;
        assert!(!result.is_ok());
        assert_eq!(result.error(), Some("reel file missing"));
        assert_eq!(result.kind(), Some(FailureKind::Instantiate));
        assert!(result.traceback().unwrap().starts_with("Traceback"));
    }

    #[tokio::test]
    async fn run_sends_planned_stages() {
        let mut mock = MockPipelineBackend::new();
        mock.expect_execute()
            .with(function(|job: &PipelineJob| {
                job.mode == JobMode::Run
                    && matches!(job.stages.as_slice(), [Stage::GenerateConfigs, Stage::Analyze])
            }))
            .times(1)
            .returning(|_| Ok(()));

        let options = RunOptions {
            run_sims: false,
            run_analysis: true,
            ..RunOptions::default()
        };
        let result = adapter(mock).run(Path::new("/ws/a/games"), &game(), &options).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn games_root_without_parent_is_load_failure() {
        let mut mock = MockPipelineBackend::new();
        mock.expect_execute().never();

        let result = adapter(mock).validate(Path::new("/"), &game()).await;
        assert_eq!(result.kind(), Some(FailureKind::Load));
    }

    #[tokio::test(start_paused = true)]
    async fn slow_backend_times_out() {
        struct Slow;

        #[async_trait::async_trait]
        impl PipelineBackend for Slow {
            async fn execute(&self, _job: &PipelineJob) -> Result<(), PipelineFailure> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }

        let adapter = ExternalPipelineAdapter::with_gate(Arc::new(Slow), Arc::new(PipelineGate::new()))
            .with_max_run(Duration::from_secs(5));
        let result = adapter
            .run(Path::new("/ws/a/games"), &game(), &RunOptions::default())
            .await;
        assert!(result.timed_out());
        assert!(result.error().unwrap().contains("exceeded"));
    }
}
