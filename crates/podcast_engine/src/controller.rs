use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use podcast_core::{
    update, AppState, AppViewModel, Effect, GenerateSpec, JobError, Msg, Phase, PollSettings,
};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::periodic::PeriodicTask;
use crate::{BackendKind, JobBackend};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("{0}")]
    Rejected(JobError),
    #[error("a podcast is already being generated")]
    Busy,
    #[error("controller is no longer running")]
    Closed,
}

/// Front-end facing handle to the polling controller.
///
/// One actor task owns the [`AppState`] and applies messages in order. Backend
/// calls run as separate tasks and report back through the same queue, so a
/// slow request never blocks cancel or reset. Dropping the handle aborts the
/// actor and its poll timer; [`ControllerHandle::shutdown`] also waits for
/// outstanding cancel requests.
pub struct ControllerHandle {
    msg_tx: mpsc::UnboundedSender<Msg>,
    view_rx: watch::Receiver<AppViewModel>,
    kind: BackendKind,
    /// Valid submissions sent to the actor. Ahead of the view's counter while
    /// one is still queued.
    submitted: AtomicU64,
    stop: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ControllerHandle {
    /// Starts the actor on the current tokio runtime.
    pub fn spawn(backend: Arc<dyn JobBackend>, settings: PollSettings) -> Self {
        let state = AppState::with_settings(settings);
        let (view_tx, view_rx) = watch::channel(state.view());
        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let kind = backend.kind();
        let stop = CancellationToken::new();
        let actor = Actor {
            backend,
            self_tx: msg_tx.downgrade(),
            view_tx,
            poller: None,
            cancels: JoinSet::new(),
        };
        engine_info!(
            "Controller started: backend={} interval={:?} attempts={}",
            kind,
            settings.interval,
            settings.max_attempts()
        );
        let task = tokio::spawn(actor.run(state, msg_rx, stop.clone()));
        Self {
            msg_tx,
            view_rx,
            kind,
            submitted: AtomicU64::new(0),
            stop,
            task: Some(task),
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.kind
    }

    /// Validates `spec` locally and hands it to the backend. Invalid input
    /// never reaches the backend; the refusal is also reflected in the view.
    ///
    /// Returns [`ControllerError::Busy`] while a job runs and also while an
    /// earlier submission is still queued for the actor.
    pub fn submit(&self, spec: GenerateSpec) -> Result<(), ControllerError> {
        let (phase, seen) = {
            let view = self.view_rx.borrow();
            (view.phase, view.submission)
        };
        if phase == Phase::Running {
            return Err(ControllerError::Busy);
        }
        let validation = spec.clone().validated();
        if validation.is_ok()
            && self
                .submitted
                .compare_exchange(seen, seen + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            return Err(ControllerError::Busy);
        }
        self.send(Msg::GenerateRequested(spec))?;
        match validation {
            Ok(spec) => {
                engine_info!("Submitting podcast request for topic {:?}", spec.topic);
                Ok(())
            }
            Err(err) => {
                engine_info!("Rejected podcast request: {}", err);
                Err(ControllerError::Rejected(err))
            }
        }
    }

    pub fn request_cancel(&self) -> Result<(), ControllerError> {
        self.send(Msg::CancelRequested)
    }

    pub fn confirm_cancel(&self) -> Result<(), ControllerError> {
        self.send(Msg::CancelConfirmed)
    }

    pub fn dismiss_cancel(&self) -> Result<(), ControllerError> {
        self.send(Msg::CancelDismissed)
    }

    /// Cancels without going through the confirmation prompt.
    pub fn cancel(&self) -> Result<(), ControllerError> {
        self.confirm_cancel()
    }

    pub fn reset(&self) -> Result<(), ControllerError> {
        self.send(Msg::ResetRequested)
    }

    pub fn view(&self) -> AppViewModel {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<AppViewModel> {
        self.view_rx.clone()
    }

    /// Resolves with the first view (current one included) matching `pred`.
    pub async fn wait_for<F>(&self, mut pred: F) -> Result<AppViewModel, ControllerError>
    where
        F: FnMut(&AppViewModel) -> bool,
    {
        let mut rx = self.view_rx.clone();
        let view = rx
            .wait_for(|view| pred(view))
            .await
            .map_err(|_| ControllerError::Closed)?;
        Ok((*view).clone())
    }

    /// Stops polling, then waits until every cancel request already issued
    /// has been answered or has failed.
    pub async fn shutdown(mut self) {
        self.stop.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                engine_warn!("Controller task ended abnormally: {}", err);
            }
        }
    }

    fn send(&self, msg: Msg) -> Result<(), ControllerError> {
        self.msg_tx.send(msg).map_err(|_| ControllerError::Closed)
    }
}

impl Drop for ControllerHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

struct Actor {
    backend: Arc<dyn JobBackend>,
    self_tx: mpsc::WeakUnboundedSender<Msg>,
    view_tx: watch::Sender<AppViewModel>,
    poller: Option<PeriodicTask>,
    cancels: JoinSet<()>,
}

impl Actor {
    async fn run(
        mut self,
        mut state: AppState,
        mut msg_rx: mpsc::UnboundedReceiver<Msg>,
        stop: CancellationToken,
    ) {
        loop {
            let msg = tokio::select! {
                biased;
                _ = stop.cancelled() => break,
                msg = msg_rx.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };
            let before = state.phase();
            let (next, effects) = update(state, msg);
            state = next;
            log_transition(before, &state);
            for effect in effects {
                self.execute(effect);
            }
            if state.consume_dirty() {
                self.view_tx.send_replace(state.view());
            }
        }
        self.stop_polling();
        while let Some(joined) = self.cancels.join_next().await {
            if let Err(err) = joined {
                engine_warn!("Cancel task ended abnormally: {}", err);
            }
        }
        engine_debug!("Controller stopped");
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::SubmitJob { submission, spec } => {
                let backend = Arc::clone(&self.backend);
                let tx = self.self_tx.clone();
                tokio::spawn(async move {
                    let msg = match backend.generate(&spec).await {
                        Ok(job_id) => {
                            engine_info!("Job {} accepted by {} backend", job_id, backend.kind());
                            Msg::JobAccepted { submission, job_id }
                        }
                        Err(error) => {
                            engine_warn!("Submission failed: {}", error);
                            Msg::SubmitFailed { submission, error }
                        }
                    };
                    deliver(&tx, msg);
                });
            }
            Effect::StartPolling { interval } => {
                let tx = self.self_tx.clone();
                engine_debug!("Polling every {:?}", interval);
                self.poller = Some(PeriodicTask::start(interval, move || {
                    deliver(&tx, Msg::PollTick);
                }));
            }
            Effect::PollJob { job_id } => {
                let backend = Arc::clone(&self.backend);
                let tx = self.self_tx.clone();
                tokio::spawn(async move {
                    engine_debug!("Polling job {}", job_id);
                    let (progress, result) = futures_util::join!(
                        backend.get_progress(&job_id),
                        backend.get_result(&job_id)
                    );
                    if let Err(err) = &progress {
                        engine_warn!("Progress for {} unavailable: {}", job_id, err);
                    }
                    if let Err(err) = &result {
                        engine_warn!("Result check for {} failed: {}", job_id, err);
                    }
                    deliver(&tx, Msg::poll_completed(job_id, progress, result));
                });
            }
            Effect::StopPolling => self.stop_polling(),
            Effect::CancelJob { job_id } => {
                while self.cancels.try_join_next().is_some() {}
                let backend = Arc::clone(&self.backend);
                self.cancels.spawn(async move {
                    match backend.cancel(&job_id).await {
                        Ok(ack) => engine_info!("Cancel sent for {} (ok={})", job_id, ack.ok),
                        Err(err) => engine_warn!("Cancel for {} failed: {}", job_id, err),
                    }
                });
            }
        }
    }

    fn stop_polling(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.stop();
        }
    }
}

fn deliver(tx: &mpsc::WeakUnboundedSender<Msg>, msg: Msg) {
    // The actor is gone once every strong sender is dropped.
    if let Some(tx) = tx.upgrade() {
        let _ = tx.send(msg);
    }
}

fn log_transition(before: Phase, state: &AppState) {
    let after = state.phase();
    if before == after {
        return;
    }
    let view = state.view();
    match after {
        Phase::Success => engine_info!(
            "Job {} finished: {}",
            view.job_id.as_deref().unwrap_or("-"),
            view.result.as_ref().map_or("", |result| result.title.as_str())
        ),
        Phase::Error => engine_error!(
            "Job {} failed: {}",
            view.job_id.as_deref().unwrap_or("-"),
            view.error.as_deref().unwrap_or("unknown error")
        ),
        Phase::Idle => engine_info!("Controller back to idle"),
        Phase::Running => engine_debug!("Controller running"),
    }
}
