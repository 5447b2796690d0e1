//! Uniform pipeline outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where in an invocation a failure happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Importing the project modules or the library failed
    Load,
    /// Constructing the configuration or state failed
    Instantiate,
    /// A pipeline stage raised
    Stage,
    /// The invocation exceeded its time limit
    Timeout,
    /// The isolated worker could not be started
    Spawn,
    /// The worker answered with something unreadable
    Protocol,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::Instantiate => "instantiate",
            Self::Stage => "stage",
            Self::Timeout => "timeout",
            Self::Spawn => "spawn",
            Self::Protocol => "protocol",
        };
        f.write_str(name)
    }
}

/// A captured pipeline failure with its trace text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} failure: {message}")]
pub struct PipelineFailure {
    /// Failure category
    pub kind: FailureKind,
    /// Short message
    pub message: String,
    /// Full stack trace text, when the failing side produced one
    pub traceback: Option<String>,
}

impl PipelineFailure {
    /// Create a failure without trace text
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            traceback: None,
        }
    }

    /// Attach trace text
    #[must_use]
    pub fn with_traceback(mut self, traceback: impl Into<String>) -> Self {
        self.traceback = Some(traceback.into());
        self
    }
}

/// Outcome of a validate or run invocation
///
/// Immutable once built; `ok == false` always comes with an error message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunResult {
    ok: bool,
    error: Option<String>,
    traceback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<FailureKind>,
}

/// Validation shares the run result shape
pub type ValidateResult = RunResult;

impl RunResult {
    /// Successful outcome
    #[inline]
    #[must_use]
    pub fn success() -> Self {
        Self {
            ok: true,
            error: None,
            traceback: None,
            kind: None,
        }
    }

    /// Failed outcome
    #[must_use]
    pub fn failure(failure: PipelineFailure) -> Self {
        let error = if failure.message.trim().is_empty() {
            format!("{} failure", failure.kind)
        } else {
            failure.message
        };
        Self {
            ok: false,
            error: Some(error),
            traceback: failure.traceback,
            kind: Some(failure.kind),
        }
    }

    /// Check if the invocation succeeded
    #[inline]
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.ok
    }

    /// Error message of a failed invocation
    #[inline]
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Trace text of a failed invocation
    #[inline]
    #[must_use]
    pub fn traceback(&self) -> Option<&str> {
        self.traceback.as_deref()
    }

    /// Failure category of a failed invocation
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<FailureKind> {
        self.kind
    }

    /// Check if the invocation was cut off by the time limit
    #[inline]
    #[must_use]
    pub fn timed_out(&self) -> bool {
        self.kind == Some(FailureKind::Timeout)
    }
}

impl From<Result<(), PipelineFailure>> for RunResult {
    fn from(value: Result<(), PipelineFailure>) -> Self {
        match value {
            Ok(()) => Self::success(),
            Err(failure) => Self::failure(failure),
        }
    }
}
