use std::time::Duration;

use crate::{GenerateSpec, JobId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Hand the validated spec to the backend.
    SubmitJob { submission: u64, spec: GenerateSpec },
    /// Start the periodic tick, replacing any active one.
    StartPolling { interval: Duration },
    /// Fetch progress and result for the job once.
    PollJob { job_id: JobId },
    StopPolling,
    /// Best-effort cancel; the outcome is never reported back.
    CancelJob { job_id: JobId },
}
