//! Isolated driver for the external math SDK pipeline
//!
//! The SDK keeps "where games live" in a process-wide global and caches
//! project modules by name. This crate makes it safe to point it at many
//! workspaces:
//!
//! - [`PipelineJob`] / [`LoadContext`]: the explicit, ordered description of
//!   one invocation
//! - [`PipelineBackend`]: loader capability (mockable)
//! - [`SubprocessBackend`]: fresh worker process per job
//! - [`PipelineGate`]: at most one invocation at a time, process-wide
//! - [`ExternalPipelineAdapter`]: ties it together with a time limit and
//!   folds every failure into a [`RunResult`]
//!
//! # Example
//!
//! ```rust,ignore
//! use sms_pipeline::{ExternalPipelineAdapter, RunOptions, SubprocessBackend};
//! use std::sync::Arc;
//!
//! let backend = SubprocessBackend::python("python3", "/opt/math-sdk");
//! let adapter = ExternalPipelineAdapter::new(Arc::new(backend));
//! let result = adapter.run(&games_root, &game, &RunOptions::default()).await;
//! assert!(result.is_ok(), "{:?}", result.error());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod adapter;
mod backend;
mod gate;
mod job;
mod result;
mod subprocess;

pub use adapter::{ExternalPipelineAdapter, DEFAULT_MAX_RUN};
pub use backend::PipelineBackend;
pub use gate::{GatePass, PipelineGate};
pub use job::{JobMode, LoadContext, PipelineJob, RunOptions, Stage};
pub use result::{FailureKind, PipelineFailure, RunResult, ValidateResult};
pub use subprocess::{SearchPath, SubprocessBackend, DRIVER_SOURCE, SEARCH_PATH_VAR};
