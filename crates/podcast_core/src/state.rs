use crate::view_model::AppViewModel;
use crate::{
    stage_label, truncate_log, CancelGate, JobId, PodcastResult, PollSettings, Progress, STAGES,
};

/// Shown when a backend reports failure without saying why.
pub const FAILURE_FALLBACK: &str = "Podcast generation failed";

/// Client-visible lifecycle of the tracked job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Running,
    Success,
    Error,
}

impl Phase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Success | Phase::Error)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TickAction {
    /// Nothing is being polled.
    Ignore,
    /// Previous poll still in flight; the tick only counts toward the budget.
    Skip,
    Poll(JobId),
    TimedOut,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    settings: PollSettings,
    phase: Phase,
    submission: u64,
    job_id: Option<JobId>,
    progress: Option<Progress>,
    result: Option<PodcastResult>,
    error: Option<String>,
    notice: Option<String>,
    validation_error: Option<String>,
    attempts: u32,
    poll_in_flight: bool,
    gate: CancelGate,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: PollSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> PollSettings {
        self.settings
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn view(&self) -> AppViewModel {
        let (stage, percent, message, log) = match &self.progress {
            Some(progress) => (
                progress.stage,
                progress.percent,
                progress.message.clone(),
                progress.log.clone(),
            ),
            None => (0, 0, String::new(), Vec::new()),
        };
        AppViewModel {
            phase: self.phase,
            submission: self.submission,
            job_id: self.job_id.clone(),
            stage,
            stage_label: stage_label(stage),
            stage_count: STAGES.len(),
            percent,
            message,
            log,
            result: self.result.clone(),
            error: self.error.clone(),
            notice: self.notice.clone(),
            validation_error: self.validation_error.clone(),
            cancel_prompt_open: self.gate.is_open(),
            attempts: self.attempts,
            max_attempts: self.settings.max_attempts(),
            can_submit: self.phase != Phase::Running,
            dirty: self.dirty,
        }
    }

    /// Returns whether the view changed since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn reject_submission(&mut self, reason: String) {
        self.validation_error = Some(reason);
        self.dirty = true;
    }

    /// Clears everything left from the previous job and enters `Running`
    /// without a job id. Returns the new submission number.
    pub(crate) fn begin_submission(&mut self) -> u64 {
        self.clear_job();
        self.validation_error = None;
        self.submission += 1;
        self.phase = Phase::Running;
        self.dirty = true;
        self.submission
    }

    /// Records the backend's id for the current submission. Returns `false`
    /// when the submission is stale (reset or superseded meanwhile).
    pub(crate) fn accept_job(&mut self, submission: u64, job_id: &str) -> bool {
        if !self.awaiting_job(submission) {
            return false;
        }
        self.job_id = Some(job_id.to_string());
        self.dirty = true;
        true
    }

    pub(crate) fn fail_submission(&mut self, submission: u64, message: String) -> bool {
        if !self.awaiting_job(submission) {
            return false;
        }
        self.finish_with_error(message);
        true
    }

    fn awaiting_job(&self, submission: u64) -> bool {
        self.phase == Phase::Running && self.submission == submission && self.job_id.is_none()
    }

    pub(crate) fn register_tick(&mut self) -> TickAction {
        let job_id = match (&self.job_id, self.phase) {
            (Some(job_id), Phase::Running) => job_id.clone(),
            _ => return TickAction::Ignore,
        };
        let budget = self.settings.max_attempts();
        if self.attempts >= budget {
            self.finish_with_error(timeout_message(budget));
            return TickAction::TimedOut;
        }
        self.attempts += 1;
        self.dirty = true;
        if self.poll_in_flight {
            return TickAction::Skip;
        }
        self.poll_in_flight = true;
        TickAction::Poll(job_id)
    }

    /// Whether a poll answer for `job_id` may still change this state.
    pub(crate) fn accepts_poll_for(&self, job_id: &str) -> bool {
        self.phase == Phase::Running && self.job_id.as_deref() == Some(job_id)
    }

    pub(crate) fn finish_poll(&mut self) {
        self.poll_in_flight = false;
    }

    /// Stores a fresh snapshot. Percent and stage never move backwards for
    /// the same job.
    pub(crate) fn apply_progress(&mut self, mut progress: Progress) {
        if let Some(previous) = &self.progress {
            progress.percent = progress.percent.max(previous.percent);
            progress.stage = progress.stage.max(previous.stage);
        }
        truncate_log(&mut progress.log);
        self.progress = Some(progress);
        self.notice = None;
        self.dirty = true;
    }

    pub(crate) fn set_notice(&mut self, notice: String) {
        self.notice = Some(notice);
        self.dirty = true;
    }

    pub(crate) fn complete(&mut self, result: PodcastResult) {
        let progress = self.progress.get_or_insert_with(Progress::default);
        progress.percent = 100;
        progress.stage = STAGES.len() - 1;
        self.result = Some(result);
        self.phase = Phase::Success;
        self.notice = None;
        self.poll_in_flight = false;
        self.gate.close();
        self.dirty = true;
    }

    pub(crate) fn finish_with_error(&mut self, message: String) {
        self.error = Some(message);
        self.phase = Phase::Error;
        self.poll_in_flight = false;
        self.gate.close();
        self.dirty = true;
    }

    pub(crate) fn open_cancel_gate(&mut self) {
        if self.phase == Phase::Running && self.gate.open() {
            self.dirty = true;
        }
    }

    pub(crate) fn dismiss_cancel_gate(&mut self) {
        if self.gate.close() {
            self.dirty = true;
        }
    }

    /// Returns to a fresh idle form. Returns the job id that was tracked.
    pub(crate) fn reset(&mut self) -> Option<JobId> {
        let job_id = self.job_id.take();
        self.clear_job();
        self.validation_error = None;
        self.gate.close();
        self.phase = Phase::Idle;
        self.dirty = true;
        job_id
    }

    fn clear_job(&mut self) {
        self.job_id = None;
        self.progress = None;
        self.result = None;
        self.error = None;
        self.notice = None;
        self.attempts = 0;
        self.poll_in_flight = false;
    }
}

pub fn timeout_message(attempts: u32) -> String {
    format!("Generation timed out after {attempts} checks. Please try again.")
}
