//! JSON shapes exchanged with the generation service.
//!
//! The service has shipped more than one field vocabulary over time, so the
//! response types accept camelCase, snake_case and a few legacy names, then
//! normalize into the core model.

use podcast_core::{GenerateSpec, JobError, JobStatus, Metrics, PodcastResult, Progress, ResultStatus};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::simulator::CANCELED_MESSAGE;

#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest<'a> {
    topic: &'a str,
    description: &'a str,
    tone: &'static str,
    length: u32,
}

impl<'a> GenerateRequest<'a> {
    pub(crate) fn from_spec(spec: &'a GenerateSpec) -> Self {
        Self {
            topic: &spec.topic,
            description: &spec.description,
            tone: spec.tone.as_str(),
            length: spec.length.minutes(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default, rename = "jobId", alias = "id", alias = "job_id")]
    job_id: Option<String>,
}

impl GenerateResponse {
    pub(crate) fn into_job_id(self) -> Result<String, JobError> {
        self.job_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| JobError::Contract("generate response carried no jobId".into()))
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ProgressWire {
    #[serde(default)]
    stage: Option<f64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, alias = "progress")]
    percent: Option<f64>,
    #[serde(default)]
    log: Option<Vec<String>>,
    #[serde(
        default,
        rename = "estimatedRemaining",
        alias = "estimated_remaining",
        alias = "estimated_remaining_secs"
    )]
    estimated_remaining: Option<f64>,
}

impl ProgressWire {
    pub(crate) fn into_progress(self) -> Progress {
        let stage = self.stage.map(|stage| clamp_to_u32(stage) as usize).unwrap_or(0);
        let percent = self
            .percent
            .map(|percent| clamp_to_u32(percent).min(100) as u8)
            .unwrap_or(0);
        let mut progress = Progress::new(
            stage,
            percent,
            self.message.unwrap_or_default(),
            self.log.unwrap_or_default(),
        );
        progress.estimated_remaining_secs = self.estimated_remaining.map(clamp_to_u32);
        progress
    }
}

/// Body of `jobs/{id}/status`. Only the nested progress is read; status and
/// result come from the result route.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct JobStatusWire {
    #[serde(default)]
    progress: Option<ProgressWire>,
}

impl JobStatusWire {
    /// A job that has not reported yet reads as zero progress.
    pub(crate) fn into_progress(self) -> Progress {
        self.progress.unwrap_or_default().into_progress()
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MetricsWire {
    #[serde(
        default,
        rename = "durationSecs",
        alias = "duration_secs",
        alias = "duration_seconds",
        alias = "durationSeconds"
    )]
    duration_secs: Option<f64>,
    #[serde(
        default,
        rename = "sourcesKept",
        alias = "sources_kept",
        alias = "sources_used",
        alias = "sourcesUsed"
    )]
    sources_kept: Option<f64>,
    #[serde(default, rename = "wordCount", alias = "word_count")]
    word_count: Option<f64>,
    #[serde(default, rename = "ttsSecs", alias = "tts_secs", alias = "tts_seconds")]
    tts_secs: Option<f64>,
    #[serde(
        default,
        rename = "processingSecs",
        alias = "processing_secs",
        alias = "processing_seconds"
    )]
    processing_secs: Option<f64>,
    #[serde(default)]
    lufs: Option<f64>,
}

impl MetricsWire {
    fn into_metrics(self) -> Metrics {
        Metrics {
            duration_secs: self.duration_secs.map(clamp_to_u32).unwrap_or(0),
            sources_kept: self.sources_kept.map(clamp_to_u32).unwrap_or(0),
            word_count: self.word_count.map(clamp_to_u32),
            tts_secs: self.tts_secs.unwrap_or(0.0).max(0.0),
            processing_secs: self.processing_secs.unwrap_or(0.0).max(0.0),
            lufs: self.lufs,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ResultWire {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, rename = "audioUrl", alias = "audio_url", alias = "mp3_url")]
    audio_url: Option<String>,
    #[serde(default, rename = "notesUrl", alias = "notes_url")]
    notes_url: Option<String>,
    #[serde(default, rename = "scriptUrl", alias = "script_url")]
    script_url: Option<String>,
    #[serde(default)]
    metrics: Option<MetricsWire>,
    #[serde(default)]
    error: Option<String>,
}

impl ResultWire {
    /// Normalizes a result body. `base` resolves relative media links and
    /// supplies the static paths used when a finished job omits them.
    pub(crate) fn into_status(self, job_id: &str, base: &Url) -> Result<ResultStatus, JobError> {
        let status = self
            .status
            .as_deref()
            .ok_or_else(|| JobError::Contract("result response carried no status".into()))?
            .parse::<JobStatus>()?;

        match status {
            JobStatus::Pending | JobStatus::Running => Ok(ResultStatus::Running),
            JobStatus::Error => Ok(ResultStatus::Failed(
                non_blank(self.error).unwrap_or_default(),
            )),
            JobStatus::Canceled => Ok(ResultStatus::Failed(
                non_blank(self.error).unwrap_or_else(|| CANCELED_MESSAGE.to_string()),
            )),
            JobStatus::Ready => {
                let audio_url = match non_blank(self.audio_url) {
                    Some(url) => resolve(base, &url),
                    None => resolve(base, &format!("static/podcasts/podcast_{job_id}.mp3")),
                };
                let notes_url = match non_blank(self.notes_url) {
                    Some(url) => resolve(base, &url),
                    None => resolve(base, &format!("static/notes/notes_{job_id}.md")),
                };
                Ok(ResultStatus::Ready(PodcastResult {
                    title: non_blank(self.title).unwrap_or_else(|| format!("Podcast {job_id}")),
                    audio_url,
                    notes_url: Some(notes_url),
                    script_url: non_blank(self.script_url).map(|url| resolve(base, &url)),
                    metrics: self.metrics.map(MetricsWire::into_metrics),
                }))
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct CancelResponse {
    #[serde(default)]
    pub(crate) ok: Option<bool>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

/// Absolute URLs pass through; anything else is joined onto `base`.
fn resolve(base: &Url, link: &str) -> String {
    match Url::parse(link) {
        Ok(url) => url.to_string(),
        Err(_) => base
            .join(link)
            .map(|url| url.to_string())
            .unwrap_or_else(|_| link.to_string()),
    }
}

fn clamp_to_u32(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        value.round() as u32
    }
}
