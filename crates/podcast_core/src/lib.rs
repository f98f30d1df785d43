//! Podcast studio core: pure job-lifecycle state machine and view-model helpers.
mod effect;
mod error;
mod gate;
mod model;
mod msg;
mod settings;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use error::JobError;
pub use gate::CancelGate;
pub use model::{
    clamp_stage, stage_label, truncate_log, GenerateSpec, JobId, JobStatus, Metrics,
    PodcastLength, PodcastResult, Progress, ResultStatus, Tone, DESCRIPTION_MAX_CHARS, LOG_LIMIT,
    STAGES, TOPIC_MAX_CHARS,
};
pub use msg::Msg;
pub use settings::PollSettings;
pub use state::{timeout_message, AppState, Phase, FAILURE_FALLBACK};
pub use update::update;
pub use view_model::AppViewModel;
