//! Domain errors for the meshward convergence engine.

use thiserror::Error;

use crate::domain::models::QueueKind;

/// Errors produced while executing an external configuration command.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("command has no arguments")]
    EmptyArguments,

    #[error("failed to launch {program}: {message}")]
    Spawn { program: String, message: String },

    /// Non-zero exit. Carries the captured combined output verbatim.
    #[error("{0}")]
    Failed(String),

    #[error("output transform failed: {0}")]
    Modify(String),
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        Self::Modify(err.to_string())
    }
}

/// Errors returned when handing a command to a tenant queue.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("{queue} queue for mesh {mesh} is closed")]
    Closed { mesh: String, queue: QueueKind },
}

/// Errors raised while constructing a command client.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("mesh name cannot be empty")]
    EmptyMeshName,

    #[error("command client must be created inside a tokio runtime")]
    NoRuntime,
}

/// Errors surfaced by the live-object API.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("{kind} {key} not found")]
    NotFound { kind: String, key: String },

    #[error("{kind} {key} already exists")]
    AlreadyExists { kind: String, key: String },

    #[error("{kind} {key} was modified: expected resource version {expected}, found {actual}")]
    Conflict {
        kind: String,
        key: String,
        expected: String,
        actual: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Errors raised by the templating collaborator.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no rendered objects for workload {0}")]
    UnknownWorkload(String),

    #[error("failed to read bundle {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid bundle {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
