//! Error types for the grading engine
//!
//! Faults fall into three disjoint classes:
//! - Submission faults (wrong output, compile error, timeout) are graded
//!   results, reported as [`FailureRecord`](crate::report::FailureRecord)s
//!   inside a normal `EvaluationResult` and never as errors.
//! - Adapter faults are configuration/programmer bugs surfaced as
//!   [`AdapterError`]; they fail fast and are not retryable.
//! - Infrastructure faults are environment problems surfaced as
//!   [`InfraError`]; the orchestrator folds them into
//!   `EvaluationResult { infra_error: true, .. }` so the caller may retry.

use thiserror::Error;

/// Configuration or programmer faults. Not the submitter's fault, not retryable.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// No exercise with this id exists in the catalog.
    #[error("unknown exercise: {0}")]
    UnknownExercise(String),

    /// The language string is not one the engine has an adapter for.
    #[error("unsupported language: {0}")]
    UnknownLanguage(String),

    /// The exercise exists but has no definition for this language.
    #[error("exercise {exercise_id} has no {language} definition")]
    MissingLanguage {
        exercise_id: String,
        language: String,
    },

    /// Two plan entries resolve to the same path inside the workspace.
    #[error("duplicate file in workspace plan: {0}")]
    DuplicateFile(String),

    /// A plan entry tries to escape the workspace directory.
    #[error("invalid path in workspace plan: {0}")]
    InvalidPath(String),

    /// The harness template does not fit the exercise definition.
    #[error("malformed harness template: {0}")]
    MalformedHarness(String),
}

/// Environment faults: the isolation substrate, the artifact store or the
/// local filesystem misbehaved. Retryable by the caller.
#[derive(Debug, Error)]
pub enum InfraError {
    /// The isolation substrate could not be reached or rejected a request.
    #[error("isolation substrate error: {0}")]
    Substrate(String),

    /// Fetching a build artifact (e.g. the test-framework jar) failed.
    #[error("failed to fetch artifact {name}: {reason}")]
    Artifact { name: String, reason: String },

    #[error("workspace I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Fault raised while staging a workspace, which can be either class:
/// a bad plan (adapter fault) or a filesystem/artifact problem (infra).
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error(transparent)]
    Infra(#[from] InfraError),
}

impl From<std::io::Error> for StageError {
    fn from(e: std::io::Error) -> Self {
        StageError::Infra(InfraError::Io(e))
    }
}
