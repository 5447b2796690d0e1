//! Shared handler state

use crate::config::Settings;
use sms_pipeline::{ExternalPipelineAdapter, PipelineBackend, SubprocessBackend};
use sms_workspace::{TemplateMaterializer, WorkspaceStore};
use std::sync::Arc;

/// Everything a request handler needs
#[derive(Debug, Clone)]
pub struct AppState {
    /// Workspace storage
    pub store: WorkspaceStore,
    /// Template copier
    pub materializer: TemplateMaterializer,
    /// Pipeline driver
    pub pipeline: ExternalPipelineAdapter,
}

impl AppState {
    /// Assemble state from parts
    #[must_use]
    pub fn new(store: WorkspaceStore, materializer: TemplateMaterializer, pipeline: ExternalPipelineAdapter) -> Self {
        Self {
            store,
            materializer,
            pipeline,
        }
    }

    /// Production wiring: interpreter workers against the configured SDK
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        let backend: Arc<dyn PipelineBackend> =
            Arc::new(SubprocessBackend::python(&settings.python, settings.sdk_dir()));
        Self::new(
            WorkspaceStore::new(&settings.workspaces_dir),
            TemplateMaterializer::new(settings.template_dir()),
            ExternalPipelineAdapter::new(backend).with_max_run(settings.max_run()),
        )
    }
}
