use thiserror::Error;

#[derive(Debug, Error)]
#[error("Invalid monitor status: {0:?}")]
pub struct ParseStatusError(pub String);

/// Failures of the target store or the event log
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    Database(#[from] libsql::Error),

    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error(transparent)]
    InvalidStatus(#[from] ParseStatusError),

    #[error("Stored timestamp out of range: {0}")]
    Timestamp(i64),

    #[error("Target not found: {0}")]
    NotFound(String),

    #[error("Target already exists: {0}")]
    AlreadyExists(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Failure that aborts a single target's pipeline for the current tick
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Persistence failed: {0}")]
    Store(#[from] StoreError),

    #[error("Target {0} was removed while it was being checked")]
    TargetRemoved(String),

    #[error("Target {0} was modified concurrently")]
    Conflict(String),
}

/// Webhook delivery failure
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Webhook returned non-success status: {0}")]
    Status(u16),

    #[error("Webhook request timed out")]
    Timeout,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("A tick is already in progress")]
    TickInProgress,

    #[error("Failed to snapshot targets: {0}")]
    Store(#[from] StoreError),
}
