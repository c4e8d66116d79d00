//! Worker-specific error types.

use std::io;
use thiserror::Error;

/// Result type for worker operations.
pub type WorkerResult<T> = Result<T, WorkerError>;

/// Errors that can occur during worker communication.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Failed to spawn the worker process.
    #[error("failed to spawn worker process: {0}")]
    SpawnFailed(#[source] io::Error),

    /// Failed to write to worker stdin.
    #[error("failed to write to worker: {0}")]
    WriteFailed(#[source] io::Error),

    /// Failed to stop the worker process.
    #[error("failed to stop worker process: {0}")]
    ShutdownFailed(#[source] io::Error),

    /// Failed to serialize request to JSON.
    #[error("failed to serialize request: {0}")]
    SerializeFailed(#[source] serde_json::Error),

    /// Failed to deserialize response from JSON.
    #[error("failed to deserialize response: {0}")]
    DeserializeFailed(#[source] serde_json::Error),

    /// Request timed out waiting for response.
    #[error("request timed out after {0} seconds")]
    Timeout(u64),

    /// Worker process exited unexpectedly.
    #[error("worker process exited unexpectedly")]
    WorkerExited,

    /// Response channel was closed (internal error).
    #[error("response channel closed unexpectedly")]
    ChannelClosed,

    /// Worker returned an error response.
    #[error("worker error: {message} (code: {code})")]
    Remote { code: String, message: String },

    /// Warehouse connection failed.
    #[error("warehouse connection failed: {0}")]
    ConnectionFailed(String),

    /// The warehouse rejected the query.
    #[error("{0}")]
    QueryFailed(String),

    /// Invalid request parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Method not found.
    #[error("method not found: {0}")]
    MethodNotFound(String),
}

impl WorkerError {
    /// Create a remote error from an error response.
    pub fn remote(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Remote {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Classify a worker error code into a more specific error type.
    pub fn classify(code: &str, message: &str) -> Self {
        match code {
            "CONNECTION_FAILED" => Self::ConnectionFailed(message.to_string()),
            "QUERY_FAILED" => Self::QueryFailed(message.to_string()),
            "INVALID_REQUEST" => Self::InvalidRequest(message.to_string()),
            "METHOD_NOT_FOUND" => Self::MethodNotFound(message.to_string()),
            "WORKER_EXITED" => Self::WorkerExited,
            _ => Self::remote(code, message),
        }
    }

    /// Check if this error indicates the worker has exited.
    pub fn is_worker_exited(&self) -> bool {
        matches!(self, Self::WorkerExited | Self::ChannelClosed)
    }
}

impl From<tokio::sync::oneshot::error::RecvError> for WorkerError {
    fn from(_: tokio::sync::oneshot::error::RecvError) -> Self {
        Self::ChannelClosed
    }
}
