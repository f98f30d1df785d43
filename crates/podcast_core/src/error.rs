use thiserror::Error;

use crate::JobId;

/// Failures surfaced by backends and by local validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JobError {
    /// The request was rejected before reaching a backend, or the backend
    /// refused it as malformed.
    #[error("invalid request: {0}")]
    Validation(String),
    /// Network failure or a non-2xx response.
    #[error("transport error: {message}")]
    Transport { status: Option<u16>, message: String },
    /// A single request exceeded its deadline.
    #[error("{0}")]
    Timeout(String),
    #[error("job not found: {0}")]
    NotFound(JobId),
    /// The backend reported the job itself as failed.
    #[error("{0}")]
    RemoteJob(String),
    /// The response did not have the agreed shape.
    #[error("unexpected response: {0}")]
    Contract(String),
}

impl JobError {
    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    /// HTTP status carried by a transport failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { status, .. } => *status,
            _ => None,
        }
    }
}
