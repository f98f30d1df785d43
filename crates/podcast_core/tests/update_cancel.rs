use podcast_core::{update, AppState, Effect, GenerateSpec, JobError, Msg, Phase, ResultStatus};

fn submitted() -> AppState {
    let (state, _) = update(
        AppState::new(),
        Msg::GenerateRequested(GenerateSpec::new("AI safety")),
    );
    state
}

fn running(job_id: &str) -> AppState {
    let (state, _) = update(
        submitted(),
        Msg::JobAccepted {
            submission: 1,
            job_id: job_id.into(),
        },
    );
    state
}

#[test]
fn cancel_request_opens_gate_only_while_running() {
    let (state, effects) = update(AppState::new(), Msg::CancelRequested);
    assert!(effects.is_empty());
    assert!(!state.view().cancel_prompt_open);

    let (state, effects) = update(running("job-1"), Msg::CancelRequested);
    assert!(effects.is_empty());
    let view = state.view();
    assert!(view.cancel_prompt_open);
    assert_eq!(view.phase, Phase::Running);
}

#[test]
fn dismissing_the_gate_keeps_the_job_running() {
    let (state, _) = update(running("job-1"), Msg::CancelRequested);
    let (state, effects) = update(state, Msg::CancelDismissed);

    assert!(effects.is_empty());
    let view = state.view();
    assert!(!view.cancel_prompt_open);
    assert_eq!(view.phase, Phase::Running);
    assert_eq!(view.job_id.as_deref(), Some("job-1"));
}

#[test]
fn confirming_cancels_then_resets() {
    let (state, _) = update(running("job-1"), Msg::CancelRequested);
    let (state, effects) = update(state, Msg::CancelConfirmed);

    assert_eq!(
        effects,
        vec![
            Effect::CancelJob {
                job_id: "job-1".into()
            },
            Effect::StopPolling,
        ]
    );
    let view = state.view();
    assert_eq!(view.phase, Phase::Idle);
    assert!(view.job_id.is_none());
    assert!(!view.cancel_prompt_open);
    assert!(view.can_submit);
}

#[test]
fn confirming_before_acceptance_only_stops() {
    let (state, _) = update(submitted(), Msg::CancelRequested);
    let (state, effects) = update(state, Msg::CancelConfirmed);

    assert_eq!(effects, vec![Effect::StopPolling]);
    assert_eq!(state.phase(), Phase::Idle);
}

#[test]
fn acceptance_after_cancel_cancels_the_orphan() {
    let (state, _) = update(submitted(), Msg::CancelConfirmed);
    let (state, effects) = update(
        state,
        Msg::JobAccepted {
            submission: 1,
            job_id: "job-late".into(),
        },
    );

    assert_eq!(
        effects,
        vec![Effect::CancelJob {
            job_id: "job-late".into()
        }]
    );
    assert_eq!(state.phase(), Phase::Idle);
    assert!(state.job_id().is_none());
}

#[test]
fn cancel_after_finish_still_returns_to_idle() {
    let (state, _) = update(running("job-1"), Msg::PollTick);
    let (state, _) = update(
        state,
        Msg::poll_completed(
            "job-1",
            Err(JobError::NotFound("job-1".into())),
            Ok(ResultStatus::Failed("boom".into())),
        ),
    );
    assert_eq!(state.phase(), Phase::Error);

    let (state, effects) = update(state, Msg::CancelConfirmed);
    assert_eq!(effects.last(), Some(&Effect::StopPolling));
    assert_eq!(state.phase(), Phase::Idle);
    assert!(state.view().error.is_none());
}

#[test]
fn in_flight_answer_after_cancel_is_discarded() {
    let (state, _) = update(running("job-1"), Msg::PollTick);
    let (state, _) = update(state, Msg::CancelConfirmed);
    let before = state.clone();

    let (state, effects) = update(
        state,
        Msg::poll_completed("job-1", Ok(Default::default()), Ok(ResultStatus::Running)),
    );
    assert!(effects.is_empty());
    assert_eq!(state, before);
}

#[test]
fn reset_is_idempotent() {
    let (once, effects) = update(running("job-1"), Msg::ResetRequested);
    assert_eq!(
        effects,
        vec![
            Effect::CancelJob {
                job_id: "job-1".into()
            },
            Effect::StopPolling,
        ]
    );
    let (twice, effects) = update(once.clone(), Msg::ResetRequested);
    assert_eq!(effects, vec![Effect::StopPolling]);
    assert_eq!(once.view(), twice.view());

    let (fresh, _) = update(AppState::new(), Msg::ResetRequested);
    assert_eq!(fresh.phase(), Phase::Idle);
}

#[test]
fn reset_after_a_finished_job_sends_no_cancel() {
    let (failed, _) = update(
        running("job-1"),
        Msg::poll_completed(
            "job-1",
            Ok(Default::default()),
            Ok(ResultStatus::Failed("TTS provider unavailable".into())),
        ),
    );
    assert_eq!(failed.phase(), Phase::Error);

    let (state, effects) = update(failed, Msg::ResetRequested);
    assert_eq!(effects, vec![Effect::StopPolling]);
    assert_eq!(state.phase(), Phase::Idle);
    assert!(state.view().job_id.is_none());
}

#[test]
fn reset_before_acceptance_leaves_the_cancel_to_the_late_reply() {
    let (state, effects) = update(submitted(), Msg::ResetRequested);
    assert_eq!(effects, vec![Effect::StopPolling]);

    let (_, effects) = update(
        state,
        Msg::JobAccepted {
            submission: 1,
            job_id: "job-late".into(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::CancelJob {
            job_id: "job-late".into()
        }]
    );
}
