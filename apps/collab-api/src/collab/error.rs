//! Errors raised by the collaboration coordinator.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollabError {
    /// Malformed inbound event (missing or empty required field).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Edit or cursor event for a project the connection has not joined.
    #[error("not joined to project {project_id}")]
    NotJoined { project_id: String },

    /// Hand-off of an outbound event to a single connection failed.
    #[error("delivery to {connection_id} failed: {reason}")]
    TransportFailure {
        connection_id: String,
        reason: String,
    },
}

impl CollabError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn not_joined(project_id: impl Into<String>) -> Self {
        Self::NotJoined {
            project_id: project_id.into(),
        }
    }

    /// Machine-readable code sent in `error` events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::NotJoined { .. } => "NOT_JOINED",
            Self::TransportFailure { .. } => "TRANSPORT_FAILURE",
        }
    }
}
