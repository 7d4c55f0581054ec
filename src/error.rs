//! Error taxonomy for the pipeline core.
//!
//! Command-layer code uses `anyhow::Result` throughout; these typed errors
//! exist for the failure classes callers need to distinguish (startup
//! configuration problems, missing sessions, invalid stage transitions,
//! external-program failures). Manifest parse failures are deliberately
//! absent: they are recovered internally by falling back to discovery and
//! never surface to callers.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or invalid configuration, or an external program that cannot
    /// be located. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No stored state exists for the requested session id.
    #[error("session '{session_id}' not found")]
    SessionNotFound { session_id: String },

    /// A stage transition was requested out of order. Already-past
    /// transitions are handled as no-op successes before this is raised;
    /// this error is only for forward-only violations.
    #[error("session '{session_id}' is at stage '{actual}', expected '{expected}': {detail}")]
    StagePrecondition {
        session_id: String,
        expected: String,
        actual: String,
        detail: String,
    },

    /// An external invocation exited non-zero and failure tolerance is
    /// disabled.
    #[error("{stage} failed: {detail}")]
    StageExecution { stage: String, detail: String },

    /// An external invocation exceeded its configured budget.
    #[error("{stage} timed out after {seconds}s")]
    StageTimeout { stage: String, seconds: u64 },
}
