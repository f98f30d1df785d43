use podcast_core::{GenerateSpec, JobError, JobId, Progress, ResultStatus};

use crate::{BackendKind, CancelAck};

/// Contract shared by the remote service adapter and the simulator.
#[async_trait::async_trait]
pub trait JobBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Creates a job and returns its id.
    async fn generate(&self, spec: &GenerateSpec) -> Result<JobId, JobError>;

    /// Best-effort progress snapshot; failures are transient for callers.
    async fn get_progress(&self, job_id: &str) -> Result<Progress, JobError>;

    /// Authoritative outcome of the job.
    async fn get_result(&self, job_id: &str) -> Result<ResultStatus, JobError>;

    /// Best-effort cancel, safe for finished and unknown jobs.
    async fn cancel(&self, job_id: &str) -> Result<CancelAck, JobError>;
}
