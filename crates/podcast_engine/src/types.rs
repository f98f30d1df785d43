use std::fmt;

use chrono::{DateTime, Utc};
use podcast_core::{JobId, JobStatus};

/// Identity and lifecycle anchor of a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
}

/// Acknowledgement of a cancel request.
///
/// `ok` is false when the backend had nothing to cancel; callers are not
/// expected to act on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelAck {
    pub ok: bool,
}

impl CancelAck {
    pub fn accepted() -> Self {
        Self { ok: true }
    }

    pub fn ignored() -> Self {
        Self { ok: false }
    }
}

/// Which backend the controller talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Remote,
    Simulated,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Remote => write!(f, "remote"),
            BackendKind::Simulated => write!(f, "simulated"),
        }
    }
}
