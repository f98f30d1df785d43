use std::fmt;
use std::str::FromStr;

use crate::JobError;

pub type JobId = String;

/// Maximum number of log lines kept for a job; older lines are dropped first.
pub const LOG_LIMIT: usize = 120;

pub const TOPIC_MAX_CHARS: usize = 500;
pub const DESCRIPTION_MAX_CHARS: usize = 2000;

/// Ordered production phases reported through `Progress::stage`.
pub const STAGES: [&str; 6] = [
    "Researching sources",
    "Extracting content",
    "Writing script",
    "Synthesizing speech",
    "Mixing audio",
    "Publishing show notes",
];

pub fn clamp_stage(stage: usize) -> usize {
    stage.min(STAGES.len() - 1)
}

pub fn stage_label(stage: usize) -> &'static str {
    STAGES[clamp_stage(stage)]
}

/// Drops the oldest entries so that at most `LOG_LIMIT` remain.
pub fn truncate_log(log: &mut Vec<String>) {
    if log.len() > LOG_LIMIT {
        let excess = log.len() - LOG_LIMIT;
        log.drain(..excess);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tone {
    Funny,
    Factual,
    Serious,
    Humorous,
    #[default]
    Neutral,
}

impl Tone {
    pub const ALL: [Tone; 5] = [
        Tone::Funny,
        Tone::Factual,
        Tone::Serious,
        Tone::Humorous,
        Tone::Neutral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tone::Funny => "funny",
            Tone::Factual => "factual",
            Tone::Serious => "serious",
            Tone::Humorous => "humorous",
            Tone::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tone {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Tone::ALL
            .into_iter()
            .find(|tone| tone.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| JobError::Validation(format!("unknown tone {wanted:?}")))
    }
}

/// Target episode length in minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PodcastLength {
    Short,
    #[default]
    Standard,
    Long,
}

impl PodcastLength {
    pub fn minutes(self) -> u32 {
        match self {
            PodcastLength::Short => 5,
            PodcastLength::Standard => 10,
            PodcastLength::Long => 15,
        }
    }

    pub fn from_minutes(minutes: u32) -> Result<Self, JobError> {
        match minutes {
            5 => Ok(PodcastLength::Short),
            10 => Ok(PodcastLength::Standard),
            15 => Ok(PodcastLength::Long),
            other => Err(JobError::Validation(format!(
                "length must be 5, 10 or 15 minutes, got {other}"
            ))),
        }
    }
}

/// Client-submitted input for a new podcast.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerateSpec {
    pub topic: String,
    pub description: String,
    pub tone: Tone,
    pub length: PodcastLength,
}

impl GenerateSpec {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tone(mut self, tone: Tone) -> Self {
        self.tone = tone;
        self
    }

    pub fn with_length(mut self, length: PodcastLength) -> Self {
        self.length = length;
        self
    }

    /// Trims free-text fields and checks them; the topic must be non-empty.
    pub fn validated(mut self) -> Result<Self, JobError> {
        self.topic = self.topic.trim().to_string();
        self.description = self.description.trim().to_string();
        if self.topic.is_empty() {
            return Err(JobError::Validation("topic must not be empty".into()));
        }
        if self.topic.chars().count() > TOPIC_MAX_CHARS {
            return Err(JobError::Validation(format!(
                "topic must be at most {TOPIC_MAX_CHARS} characters"
            )));
        }
        if self.description.chars().count() > DESCRIPTION_MAX_CHARS {
            return Err(JobError::Validation(format!(
                "description must be at most {DESCRIPTION_MAX_CHARS} characters"
            )));
        }
        Ok(self)
    }
}

/// Authoritative job status as reported by a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Ready,
    Error,
    Canceled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Ready | JobStatus::Error | JobStatus::Canceled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Ready => "ready",
            JobStatus::Error => "error",
            JobStatus::Canceled => "canceled",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = JobError;

    /// Accepts the canonical names plus the `processing/completed/failed`
    /// vocabulary used by older backends.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" | "queued" => Ok(JobStatus::Pending),
            "running" | "processing" => Ok(JobStatus::Running),
            "ready" | "completed" => Ok(JobStatus::Ready),
            "error" | "failed" => Ok(JobStatus::Error),
            "canceled" | "cancelled" => Ok(JobStatus::Canceled),
            other => Err(JobError::Contract(format!("unknown job status {other:?}"))),
        }
    }
}

/// Snapshot of a running job. Overwritten on every poll.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Progress {
    pub stage: usize,
    pub percent: u8,
    pub message: String,
    pub log: Vec<String>,
    pub estimated_remaining_secs: Option<u32>,
}

impl Progress {
    /// Builds a progress snapshot, clamping `stage` and `percent` and bounding
    /// the log. An empty message is replaced by the stage label.
    pub fn new(stage: usize, percent: u8, message: impl Into<String>, mut log: Vec<String>) -> Self {
        let stage = clamp_stage(stage);
        let mut message = message.into();
        if message.trim().is_empty() {
            message = stage_label(stage).to_string();
        }
        truncate_log(&mut log);
        Self {
            stage,
            percent: percent.min(100),
            message,
            log,
            estimated_remaining_secs: None,
        }
    }

    pub fn stage_label(&self) -> &'static str {
        stage_label(self.stage)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metrics {
    pub duration_secs: u32,
    pub sources_kept: u32,
    pub word_count: Option<u32>,
    pub tts_secs: f64,
    pub processing_secs: f64,
    pub lufs: Option<f64>,
}

/// Successful outcome of a generation job.
#[derive(Debug, Clone, PartialEq)]
pub struct PodcastResult {
    pub title: String,
    pub audio_url: String,
    pub notes_url: Option<String>,
    pub script_url: Option<String>,
    pub metrics: Option<Metrics>,
}

/// What `get_result` reports for a job.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultStatus {
    Running,
    Ready(PodcastResult),
    Failed(String),
}

impl ResultStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResultStatus::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_keeps_most_recent_entries() {
        let mut log: Vec<String> = (0..130).map(|i| format!("line {i}")).collect();
        truncate_log(&mut log);
        assert_eq!(log.len(), LOG_LIMIT);
        assert_eq!(log.first().map(String::as_str), Some("line 10"));
        assert_eq!(log.last().map(String::as_str), Some("line 129"));
    }

    #[test]
    fn progress_clamps_and_derives_message() {
        let progress = Progress::new(42, 250, "  ", Vec::new());
        assert_eq!(progress.stage, STAGES.len() - 1);
        assert_eq!(progress.percent, 100);
        assert_eq!(progress.message, "Publishing show notes");
    }

    #[test]
    fn explicit_message_is_kept() {
        let progress = Progress::new(2, 40, "Drafting intro", vec!["a".into()]);
        assert_eq!(progress.message, "Drafting intro");
        assert_eq!(progress.stage_label(), "Writing script");
    }

    #[test]
    fn blank_topic_is_rejected() {
        let err = GenerateSpec::new("   ").validated().unwrap_err();
        assert!(matches!(err, JobError::Validation(_)));
    }

    #[test]
    fn validated_trims_text_fields() {
        let spec = GenerateSpec::new("  AI safety ")
            .with_description(" why it matters ")
            .validated()
            .unwrap();
        assert_eq!(spec.topic, "AI safety");
        assert_eq!(spec.description, "why it matters");
    }

    #[test]
    fn overlong_topic_is_rejected() {
        let spec = GenerateSpec::new("x".repeat(TOPIC_MAX_CHARS + 1));
        assert!(spec.validated().is_err());
    }

    #[test]
    fn tone_and_length_parse() {
        assert_eq!("Humorous".parse::<Tone>().unwrap(), Tone::Humorous);
        assert!("sarcastic".parse::<Tone>().is_err());
        assert_eq!(PodcastLength::from_minutes(15).unwrap(), PodcastLength::Long);
        assert!(PodcastLength::from_minutes(7).is_err());
    }

    #[test]
    fn legacy_status_names_map_to_canonical() {
        assert_eq!("processing".parse::<JobStatus>().unwrap(), JobStatus::Running);
        assert_eq!("completed".parse::<JobStatus>().unwrap(), JobStatus::Ready);
        assert_eq!("failed".parse::<JobStatus>().unwrap(), JobStatus::Error);
        assert_eq!("cancelled".parse::<JobStatus>().unwrap(), JobStatus::Canceled);
        assert!("exploded".parse::<JobStatus>().is_err());
        assert!(JobStatus::Canceled.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
    }
}
