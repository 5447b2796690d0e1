//! Pipeline backend trait
//!
//! The backend is the loader capability: given a job it loads the project
//! described by the job's [`crate::LoadContext`], instantiates it, and runs
//! the stages. The production implementation is
//! [`crate::SubprocessBackend`]; tests substitute in-process fakes.

use crate::job::PipelineJob;
use crate::result::PipelineFailure;

/// Executes one pipeline job against the external library
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PipelineBackend: Send + Sync {
    /// Load, instantiate and run `job`
    ///
    /// Must not leave any library state behind that a later job for a
    /// different workspace could observe.
    async fn execute(&self, job: &PipelineJob) -> Result<(), PipelineFailure>;
}
