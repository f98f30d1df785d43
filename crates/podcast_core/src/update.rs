use crate::state::TickAction;
use crate::{AppState, Effect, Msg, Phase, ResultStatus, FAILURE_FALLBACK};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::GenerateRequested(spec) => {
            // One tracked job at a time: the form is locked while running.
            if state.phase() == Phase::Running {
                return (state, Vec::new());
            }
            match spec.validated() {
                Ok(spec) => {
                    let submission = state.begin_submission();
                    vec![Effect::SubmitJob { submission, spec }]
                }
                Err(err) => {
                    state.reject_submission(err.to_string());
                    Vec::new()
                }
            }
        }
        Msg::JobAccepted { submission, job_id } => {
            if state.accept_job(submission, &job_id) {
                vec![Effect::StartPolling {
                    interval: state.settings().interval,
                }]
            } else {
                // Accepted after the user moved on; nobody will poll it.
                vec![Effect::CancelJob { job_id }]
            }
        }
        Msg::SubmitFailed { submission, error } => {
            state.fail_submission(submission, error.to_string());
            Vec::new()
        }
        Msg::PollTick => match state.register_tick() {
            TickAction::Poll(job_id) => vec![Effect::PollJob { job_id }],
            TickAction::TimedOut => vec![Effect::StopPolling],
            TickAction::Ignore | TickAction::Skip => Vec::new(),
        },
        Msg::PollCompleted {
            job_id,
            progress,
            result,
        } => {
            if !state.accepts_poll_for(&job_id) {
                return (state, Vec::new());
            }
            state.finish_poll();
            match progress {
                Ok(progress) => state.apply_progress(progress),
                Err(err) => state.set_notice(format!("Progress unavailable: {err}")),
            }
            match result {
                Ok(ResultStatus::Running) => Vec::new(),
                Ok(ResultStatus::Ready(result)) => {
                    state.complete(result);
                    vec![Effect::StopPolling]
                }
                Ok(ResultStatus::Failed(message)) => {
                    let message = if message.trim().is_empty() {
                        FAILURE_FALLBACK.to_string()
                    } else {
                        message
                    };
                    state.finish_with_error(message);
                    vec![Effect::StopPolling]
                }
                Err(err) => {
                    // Retried on the next tick; the attempt budget bounds this.
                    state.set_notice(format!("Status check failed: {err}"));
                    Vec::new()
                }
            }
        }
        Msg::CancelRequested => {
            state.open_cancel_gate();
            Vec::new()
        }
        Msg::CancelConfirmed => {
            let mut effects = Vec::with_capacity(2);
            if let Some(job_id) = state.reset() {
                effects.push(Effect::CancelJob { job_id });
            }
            effects.push(Effect::StopPolling);
            effects
        }
        Msg::CancelDismissed => {
            state.dismiss_cancel_gate();
            Vec::new()
        }
        Msg::ResetRequested => {
            let was_running = state.phase() == Phase::Running;
            let mut effects = Vec::with_capacity(2);
            if let Some(job_id) = state.reset().filter(|_| was_running) {
                effects.push(Effect::CancelJob { job_id });
            }
            effects.push(Effect::StopPolling);
            effects
        }
    };

    (state, effects)
}
