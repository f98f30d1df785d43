use crate::{JobId, Phase, PodcastResult};

/// Everything a front end needs to draw the current job.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub phase: Phase,
    /// Number of submissions accepted for processing so far.
    pub submission: u64,
    pub job_id: Option<JobId>,
    pub stage: usize,
    pub stage_label: &'static str,
    pub stage_count: usize,
    pub percent: u8,
    pub message: String,
    pub log: Vec<String>,
    pub result: Option<PodcastResult>,
    pub error: Option<String>,
    /// Transient problem with the latest poll; cleared by the next good one.
    pub notice: Option<String>,
    /// Why the last submission was refused locally.
    pub validation_error: Option<String>,
    pub cancel_prompt_open: bool,
    pub attempts: u32,
    pub max_attempts: u32,
    pub can_submit: bool,
    pub dirty: bool,
}
