//! In-memory stand-in for the generation service.
//!
//! Jobs live in a table owned by a [`SimulatedBackend`]. A single shared
//! scheduler advances every unfinished job once per tick: percent creeps up in
//! random steps, log lines appear now and then, and after a minimum runtime
//! each tick has a fixed chance of finishing the job. Completion latency is
//! therefore variable; tests that need exact timing inject a scripted
//! [`RandomSource`] or step the table by hand with
//! [`SimulatedBackend::advance_once`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use engine_logging::{engine_debug, engine_info};
use podcast_core::{
    truncate_log, GenerateSpec, JobError, JobId, JobStatus, Metrics, PodcastResult, Progress,
    ResultStatus, STAGES,
};
use tokio::time::Instant;
use uuid::Uuid;

use crate::periodic::PeriodicTask;
use crate::random::{RandomSource, SeededRandom};
use crate::{BackendKind, CancelAck, Job, JobBackend};

/// Highest percent a job reaches before it is explicitly completed.
pub const RUNNING_CEILING: u8 = 98;
pub const CANCELED_MESSAGE: &str = "Job was canceled";
pub const SIMULATED_SOURCES_KEPT: u32 = 7;

const WORDS_PER_MINUTE: u32 = 150;
const TARGET_LUFS: f64 = -16.0;

const LOG_LINES: [&str; 12] = [
    "Querying search providers for recent coverage",
    "Ranking sources by relevance",
    "Dropped a near-duplicate article",
    "Extracted text from an interview transcript",
    "Outlining segments",
    "Drafting the cold open",
    "Balancing host and guest lines",
    "Rendering voice for host A",
    "Rendering voice for host B",
    "Normalizing loudness",
    "Laying in the music bed",
    "Writing show notes and source list",
];

#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorSettings {
    pub tick: Duration,
    pub baseline_percent: u8,
    pub min_step: u8,
    pub max_step: u8,
    pub log_chance: f64,
    /// No job completes before it has run this long.
    pub min_runtime: Duration,
    pub completion_chance: f64,
    /// Prefix for the synthesized media URLs.
    pub media_root: String,
    /// Start the background scheduler on the first submission.
    pub auto_advance: bool,
    /// Finished jobs older than this are dropped by the scheduler.
    /// `None` keeps them until [`SimulatedBackend::remove_job`] or a reset.
    pub retain_finished: Option<Duration>,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            baseline_percent: 2,
            min_step: 8,
            max_step: 12,
            log_chance: 0.6,
            min_runtime: Duration::from_secs(12),
            completion_chance: 0.3,
            media_root: "/static".to_string(),
            auto_advance: true,
            retain_finished: Some(Duration::from_secs(24 * 60 * 60)),
        }
    }
}

/// Highest stage whose threshold `(i + 1) * 100 / STAGES.len()` is at or
/// below `percent`, or the first stage if none is.
pub fn stage_for_percent(percent: u8) -> usize {
    let scaled = usize::from(percent) * STAGES.len();
    (0..STAGES.len())
        .rev()
        .find(|index| (index + 1) * 100 <= scaled)
        .unwrap_or(0)
}

struct SimJob {
    id: JobId,
    spec: GenerateSpec,
    percent: u8,
    stage: usize,
    log: Vec<String>,
    canceled: bool,
    done: bool,
    error: Option<String>,
    created_at: DateTime<Utc>,
    started: Instant,
    finished_at: Option<Instant>,
    title: Option<String>,
    runtime: Option<Duration>,
}

impl SimJob {
    fn new(id: JobId, spec: GenerateSpec, settings: &SimulatorSettings) -> Self {
        let first_line = format!(
            "Queued \"{}\" ({} tone, {} min)",
            spec.topic,
            spec.tone,
            spec.length.minutes()
        );
        Self {
            id,
            spec,
            percent: settings.baseline_percent.min(RUNNING_CEILING),
            stage: 0,
            log: vec![first_line],
            canceled: false,
            done: false,
            error: None,
            created_at: Utc::now(),
            started: Instant::now(),
            finished_at: None,
            title: None,
            runtime: None,
        }
    }

    fn status(&self) -> JobStatus {
        if self.canceled {
            JobStatus::Canceled
        } else if self.done {
            JobStatus::Ready
        } else if self.error.is_some() {
            JobStatus::Error
        } else {
            JobStatus::Running
        }
    }

    fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    fn advance(&mut self, now: Instant, settings: &SimulatorSettings, rng: &mut dyn RandomSource) {
        let step = rng.percent_step(settings.min_step, settings.max_step);
        self.percent = self.percent.saturating_add(step).min(RUNNING_CEILING);

        if rng.chance(settings.log_chance) {
            let index = rng.pick(LOG_LINES.len()).min(LOG_LINES.len() - 1);
            self.log.push(LOG_LINES[index].to_string());
            truncate_log(&mut self.log);
        }

        self.stage = self.stage.max(stage_for_percent(self.percent));

        let elapsed = now.saturating_duration_since(self.started);
        if elapsed >= settings.min_runtime && rng.chance(settings.completion_chance) {
            self.finish(elapsed);
        }
    }

    fn finish(&mut self, elapsed: Duration) {
        self.done = true;
        self.finished_at = Some(self.started + elapsed);
        self.percent = 100;
        self.stage = STAGES.len() - 1;
        self.title = Some(format!("Podcast: {}", self.spec.topic));
        self.runtime = Some(elapsed);
        self.log.push("Podcast ready".to_string());
        truncate_log(&mut self.log);
    }

    fn cancel(&mut self) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.canceled = true;
        self.finished_at = Some(Instant::now());
        self.error = Some(CANCELED_MESSAGE.to_string());
        self.log.push("Canceled by user".to_string());
        truncate_log(&mut self.log);
        true
    }

    fn progress(&self) -> Progress {
        let message = match self.status() {
            JobStatus::Ready => "Podcast ready",
            JobStatus::Canceled => CANCELED_MESSAGE,
            _ => "",
        };
        Progress::new(self.stage, self.percent, message, self.log.clone())
    }

    fn result(&self, media_root: &str) -> ResultStatus {
        match self.status() {
            JobStatus::Canceled | JobStatus::Error => ResultStatus::Failed(
                self.error
                    .clone()
                    .unwrap_or_else(|| CANCELED_MESSAGE.to_string()),
            ),
            JobStatus::Ready => ResultStatus::Ready(self.podcast(media_root)),
            JobStatus::Pending | JobStatus::Running => ResultStatus::Running,
        }
    }

    fn podcast(&self, media_root: &str) -> PodcastResult {
        let root = media_root.trim_end_matches('/');
        let minutes = self.spec.length.minutes();
        let duration_secs = minutes * 60;
        PodcastResult {
            title: self
                .title
                .clone()
                .unwrap_or_else(|| format!("Podcast: {}", self.spec.topic)),
            audio_url: format!("{root}/podcasts/podcast_{}.mp3", self.id),
            notes_url: Some(format!("{root}/notes/notes_{}.md", self.id)),
            script_url: Some(format!("{root}/scripts/script_{}.txt", self.id)),
            metrics: Some(Metrics {
                duration_secs,
                sources_kept: SIMULATED_SOURCES_KEPT,
                word_count: Some(minutes * WORDS_PER_MINUTE),
                tts_secs: f64::from(duration_secs) * 0.4,
                processing_secs: self.runtime.unwrap_or_default().as_secs_f64(),
                lufs: Some(TARGET_LUFS),
            }),
        }
    }

    fn snapshot(&self) -> Job {
        Job {
            id: self.id.clone(),
            status: self.status(),
            created_at: self.created_at,
        }
    }
}

struct Shared {
    settings: SimulatorSettings,
    jobs: Mutex<HashMap<JobId, SimJob>>,
    rng: Mutex<Box<dyn RandomSource>>,
}

impl Shared {
    fn jobs(&self) -> MutexGuard<'_, HashMap<JobId, SimJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Advances every unfinished job by one tick. Returns how many moved.
    fn advance_all(&self, now: Instant) -> usize {
        let mut jobs = self.jobs();
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        let mut advanced = 0;
        for job in jobs.values_mut().filter(|job| !job.is_terminal()) {
            job.advance(now, &self.settings, rng.as_mut());
            if job.done {
                engine_info!(
                    "Simulated job {} finished after {:.1}s",
                    job.id,
                    job.runtime.unwrap_or_default().as_secs_f64()
                );
            }
            advanced += 1;
        }
        advanced
    }

    /// Drops terminal jobs that finished at least `age` before `now`.
    fn prune_finished(&self, now: Instant, age: Duration) -> usize {
        let mut jobs = self.jobs();
        let before = jobs.len();
        jobs.retain(|_, job| {
            job.finished_at
                .is_none_or(|finished| now.saturating_duration_since(finished) < age)
        });
        let pruned = before - jobs.len();
        if pruned > 0 {
            engine_info!("Pruned {} finished simulated jobs", pruned);
        }
        pruned
    }

    fn tick(&self, now: Instant) {
        self.advance_all(now);
        if let Some(age) = self.settings.retain_finished {
            self.prune_finished(now, age);
        }
    }
}

/// Job counts per status, as reported by [`SimulatedBackend::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SimulatorStats {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub ready: usize,
    pub failed: usize,
    pub canceled: usize,
}

impl SimulatorStats {
    fn count(&mut self, status: JobStatus) {
        self.total += 1;
        match status {
            JobStatus::Pending => self.pending += 1,
            JobStatus::Running => self.running += 1,
            JobStatus::Ready => self.ready += 1,
            JobStatus::Error => self.failed += 1,
            JobStatus::Canceled => self.canceled += 1,
        }
    }

    pub fn of(&self, status: JobStatus) -> usize {
        match status {
            JobStatus::Pending => self.pending,
            JobStatus::Running => self.running,
            JobStatus::Ready => self.ready,
            JobStatus::Error => self.failed,
            JobStatus::Canceled => self.canceled,
        }
    }
}

/// Job table plus its scheduler. Each instance is independent.
pub struct SimulatedBackend {
    shared: Arc<Shared>,
    scheduler: Mutex<Option<PeriodicTask>>,
}

impl SimulatedBackend {
    pub fn new(settings: SimulatorSettings) -> Self {
        Self::with_random(settings, SeededRandom::from_entropy())
    }

    pub fn with_random(settings: SimulatorSettings, rng: impl RandomSource + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                settings,
                jobs: Mutex::new(HashMap::new()),
                rng: Mutex::new(Box::new(rng)),
            }),
            scheduler: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> &SimulatorSettings {
        &self.shared.settings
    }

    /// Steps every unfinished job once, outside the scheduler.
    pub fn advance_once(&self) -> usize {
        self.shared.advance_all(Instant::now())
    }

    pub fn job(&self, job_id: &str) -> Option<Job> {
        self.shared.jobs().get(job_id).map(SimJob::snapshot)
    }

    pub fn job_count(&self) -> usize {
        self.shared.jobs().len()
    }

    /// Jobs currently in `status`, newest first.
    pub fn jobs_with_status(&self, status: JobStatus) -> Vec<Job> {
        let mut matching: Vec<Job> = self
            .shared
            .jobs()
            .values()
            .filter(|job| job.status() == status)
            .map(SimJob::snapshot)
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matching
    }

    pub fn stats(&self) -> SimulatorStats {
        let mut stats = SimulatorStats::default();
        for job in self.shared.jobs().values() {
            stats.count(job.status());
        }
        stats
    }

    /// Forgets one job, whatever its status. Returns whether it existed.
    pub fn remove_job(&self, job_id: &str) -> bool {
        let removed = self.shared.jobs().remove(job_id);
        if let Some(job) = &removed {
            engine_info!("Removed simulated job {} ({})", job_id, job.status());
        }
        removed.is_some()
    }

    /// Drops every terminal job that finished at least `age` ago. Returns how
    /// many were dropped. The scheduler does this on each tick when
    /// `retain_finished` is set.
    pub fn prune_finished(&self, age: Duration) -> usize {
        self.shared.prune_finished(Instant::now(), age)
    }

    pub fn scheduler_active(&self) -> bool {
        self.scheduler_slot()
            .as_ref()
            .is_some_and(PeriodicTask::is_active)
    }

    /// Starts the shared scheduler unless it is already running. Returns
    /// whether a new timer was started. Must be called inside a tokio runtime.
    pub fn ensure_scheduler(&self) -> bool {
        let mut slot = self.scheduler_slot();
        if slot.as_ref().is_some_and(PeriodicTask::is_active) {
            return false;
        }
        let shared = Arc::clone(&self.shared);
        let tick = shared.settings.tick;
        *slot = Some(PeriodicTask::start(tick, move || {
            shared.tick(Instant::now());
        }));
        engine_debug!("Simulator scheduler started, tick={:?}", tick);
        true
    }

    /// Stops the scheduler and forgets every job.
    pub fn reset(&self) {
        self.dispose();
        self.shared.jobs().clear();
    }

    /// Stops the scheduler; jobs stay readable but no longer advance.
    pub fn dispose(&self) {
        if let Some(task) = self.scheduler_slot().take() {
            task.stop();
            engine_debug!("Simulator scheduler stopped");
        }
    }

    fn scheduler_slot(&self) -> MutexGuard<'_, Option<PeriodicTask>> {
        self.scheduler.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn allocate_id(jobs: &HashMap<JobId, SimJob>) -> JobId {
        loop {
            let raw = Uuid::new_v4().simple().to_string();
            let id = format!("sim-{}", &raw[..8]);
            if !jobs.contains_key(&id) {
                return id;
            }
        }
    }
}

impl Default for SimulatedBackend {
    fn default() -> Self {
        Self::new(SimulatorSettings::default())
    }
}

#[async_trait::async_trait]
impl JobBackend for SimulatedBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Simulated
    }

    async fn generate(&self, spec: &GenerateSpec) -> Result<JobId, JobError> {
        let spec = spec.clone().validated()?;
        let id = {
            let mut jobs = self.shared.jobs();
            let id = Self::allocate_id(&jobs);
            engine_info!(
                "Simulated job {} created: topic={:?} tone={} length={}m",
                id,
                spec.topic,
                spec.tone,
                spec.length.minutes()
            );
            jobs.insert(id.clone(), SimJob::new(id.clone(), spec, &self.shared.settings));
            id
        };
        if self.shared.settings.auto_advance {
            self.ensure_scheduler();
        }
        Ok(id)
    }

    async fn get_progress(&self, job_id: &str) -> Result<Progress, JobError> {
        self.shared
            .jobs()
            .get(job_id)
            .map(SimJob::progress)
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    async fn get_result(&self, job_id: &str) -> Result<ResultStatus, JobError> {
        let media_root = &self.shared.settings.media_root;
        self.shared
            .jobs()
            .get(job_id)
            .map(|job| job.result(media_root))
            .ok_or_else(|| JobError::NotFound(job_id.to_string()))
    }

    async fn cancel(&self, job_id: &str) -> Result<CancelAck, JobError> {
        let mut jobs = self.shared.jobs();
        let Some(job) = jobs.get_mut(job_id) else {
            engine_debug!("Cancel for unknown simulated job {}", job_id);
            return Ok(CancelAck::ignored());
        };
        if job.cancel() {
            engine_info!("Simulated job {} canceled at {}%", job_id, job.percent);
            Ok(CancelAck::accepted())
        } else {
            Ok(CancelAck::ignored())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{stage_for_percent, RUNNING_CEILING};
    use podcast_core::STAGES;

    #[test]
    fn stage_thresholds_follow_percent() {
        assert_eq!(stage_for_percent(0), 0);
        assert_eq!(stage_for_percent(16), 0);
        assert_eq!(stage_for_percent(17), 0);
        assert_eq!(stage_for_percent(34), 1);
        assert_eq!(stage_for_percent(50), 2);
        assert_eq!(stage_for_percent(RUNNING_CEILING), 4);
        assert_eq!(stage_for_percent(100), STAGES.len() - 1);
    }
}
