use crate::{GenerateSpec, JobError, JobId, Progress, ResultStatus};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User asked for a new podcast.
    GenerateRequested(GenerateSpec),
    /// Backend accepted submission `submission` under `job_id`.
    JobAccepted { submission: u64, job_id: JobId },
    /// Backend refused or could not be reached for submission `submission`.
    SubmitFailed { submission: u64, error: JobError },
    /// Periodic poll timer fired.
    PollTick,
    /// Both calls issued for one poll have resolved.
    PollCompleted {
        job_id: JobId,
        progress: Result<Progress, JobError>,
        result: Result<ResultStatus, JobError>,
    },
    /// User clicked Cancel; asks for confirmation.
    CancelRequested,
    /// User confirmed the cancel prompt.
    CancelConfirmed,
    /// User backed out of the cancel prompt.
    CancelDismissed,
    /// User asked for a fresh form. An unfinished job is canceled.
    ResetRequested,
}

impl Msg {
    pub fn poll_completed(
        job_id: impl Into<JobId>,
        progress: Result<Progress, JobError>,
        result: Result<ResultStatus, JobError>,
    ) -> Self {
        Msg::PollCompleted {
            job_id: job_id.into(),
            progress,
            result,
        }
    }
}
