use crewlink_core::CoreError;
use crewlink_store::StoreError;

/// Workflow-level error type.
///
/// Wraps [`CoreError`] for domain failures and [`StoreError`] for remote
/// store failures on the primary write path. Secondary-write failures
/// never surface here; the dispatcher logs and drops them.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Remote store error: {0}")]
    Store(#[from] StoreError),
}

/// Convenience type alias for workflow operation return values.
pub type WorkflowResult<T> = Result<T, WorkflowError>;
