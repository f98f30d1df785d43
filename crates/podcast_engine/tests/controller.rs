use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use podcast_core::{
    timeout_message, AppViewModel, GenerateSpec, JobError, JobId, JobStatus, Phase, PollSettings,
    Progress, ResultStatus,
};
use podcast_engine::{
    BackendKind, CancelAck, ControllerError, ControllerHandle, JobBackend, RemoteBackend,
    RemoteSettings, SeededRandom, SimulatedBackend, SimulatorSettings,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Counts backend calls before delegating to a simulator.
struct Counting {
    inner: SimulatedBackend,
    generate_calls: AtomicUsize,
}

#[async_trait::async_trait]
impl JobBackend for Counting {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    async fn generate(&self, spec: &GenerateSpec) -> Result<JobId, JobError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.generate(spec).await
    }

    async fn get_progress(&self, job_id: &str) -> Result<Progress, JobError> {
        self.inner.get_progress(job_id).await
    }

    async fn get_result(&self, job_id: &str) -> Result<ResultStatus, JobError> {
        self.inner.get_result(job_id).await
    }

    async fn cancel(&self, job_id: &str) -> Result<CancelAck, JobError> {
        self.inner.cancel(job_id).await
    }
}

fn simulator(settings: SimulatorSettings) -> Arc<SimulatedBackend> {
    engine_logging::initialize_for_tests();
    Arc::new(SimulatedBackend::with_random(settings, SeededRandom::seeded(5)))
}

fn never_finishing() -> SimulatorSettings {
    SimulatorSettings {
        min_runtime: Duration::from_secs(3600),
        ..SimulatorSettings::default()
    }
}

async fn settle<F>(controller: &ControllerHandle, pred: F) -> AppViewModel
where
    F: FnMut(&AppViewModel) -> bool,
{
    tokio::time::timeout(Duration::from_secs(600), controller.wait_for(pred))
        .await
        .expect("controller did not reach the expected view")
        .expect("controller closed")
}

#[tokio::test(start_paused = true)]
async fn simulated_job_runs_to_success() {
    let backend = simulator(SimulatorSettings {
        completion_chance: 1.0,
        ..SimulatorSettings::default()
    });
    let controller = ControllerHandle::spawn(backend.clone(), PollSettings::simulated());
    assert_eq!(controller.backend_kind(), BackendKind::Simulated);

    controller.submit(GenerateSpec::new("AI safety")).unwrap();
    let view = settle(&controller, |view| view.phase.is_terminal()).await;

    assert_eq!(view.phase, Phase::Success);
    assert_eq!(view.percent, 100);
    assert_eq!(view.stage, view.stage_count - 1);
    assert!(view.attempts <= view.max_attempts);
    let result = view.result.unwrap();
    assert_eq!(result.title, "Podcast: AI safety");
    assert_eq!(result.metrics.unwrap().sources_kept, 7);
    assert!(view.can_submit);

    let job_id = view.job_id.unwrap();
    assert_eq!(backend.job(&job_id).unwrap().status, JobStatus::Ready);
}

#[tokio::test(start_paused = true)]
async fn empty_topic_is_rejected_without_a_backend_call() {
    engine_logging::initialize_for_tests();
    let backend = Arc::new(Counting {
        inner: SimulatedBackend::new(SimulatorSettings::default()),
        generate_calls: AtomicUsize::new(0),
    });
    let controller = ControllerHandle::spawn(backend.clone(), PollSettings::simulated());

    let err = controller.submit(GenerateSpec::new("   ")).unwrap_err();
    assert!(matches!(err, ControllerError::Rejected(JobError::Validation(_))));

    let view = settle(&controller, |view| view.validation_error.is_some()).await;
    assert_eq!(view.phase, Phase::Idle);
    assert!(view.job_id.is_none());
    assert_eq!(backend.generate_calls.load(Ordering::SeqCst), 0);
    assert_eq!(backend.inner.job_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn second_submission_while_running_is_busy() {
    let backend = simulator(never_finishing());
    let controller = ControllerHandle::spawn(backend.clone(), PollSettings::simulated());

    controller.submit(GenerateSpec::new("AI safety")).unwrap();
    settle(&controller, |view| view.job_id.is_some()).await;

    assert_eq!(
        controller.submit(GenerateSpec::new("Another")),
        Err(ControllerError::Busy)
    );
    assert_eq!(backend.job_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn back_to_back_submissions_report_busy() {
    let backend = simulator(never_finishing());
    let controller = ControllerHandle::spawn(backend.clone(), PollSettings::simulated());

    controller.submit(GenerateSpec::new("AI safety")).unwrap();
    assert_eq!(
        controller.submit(GenerateSpec::new("Another")),
        Err(ControllerError::Busy)
    );

    let view = settle(&controller, |view| view.job_id.is_some()).await;
    assert_eq!(view.submission, 1);
    assert_eq!(backend.job_count(), 1);

    controller.reset().unwrap();
    settle(&controller, |view| view.phase == Phase::Idle).await;
    controller.submit(GenerateSpec::new("Another")).unwrap();
    let view = settle(&controller, |view| view.submission == 2 && view.job_id.is_some()).await;
    assert_eq!(view.phase, Phase::Running);
}

#[tokio::test(start_paused = true)]
async fn reset_while_running_cancels_the_job() {
    let backend = simulator(never_finishing());
    let controller = ControllerHandle::spawn(backend.clone(), PollSettings::simulated());

    controller.submit(GenerateSpec::new("AI safety")).unwrap();
    let view = settle(&controller, |view| view.job_id.is_some()).await;
    let job_id = view.job_id.unwrap();

    controller.reset().unwrap();
    settle(&controller, |view| view.phase == Phase::Idle).await;
    controller.shutdown().await;

    assert_eq!(backend.job(&job_id).unwrap().status, JobStatus::Canceled);
}

#[tokio::test(start_paused = true)]
async fn confirmed_cancel_returns_to_idle_and_cancels_the_job() {
    let backend = simulator(never_finishing());
    let controller = ControllerHandle::spawn(backend.clone(), PollSettings::simulated());

    controller.submit(GenerateSpec::new("AI safety")).unwrap();
    let running = settle(&controller, |view| view.percent >= 20).await;
    let job_id = running.job_id.unwrap();

    controller.request_cancel().unwrap();
    settle(&controller, |view| view.cancel_prompt_open).await;
    controller.confirm_cancel().unwrap();
    let view = settle(&controller, |view| view.phase == Phase::Idle).await;
    assert!(view.job_id.is_none());
    assert!(!view.cancel_prompt_open);
    assert_eq!(view.percent, 0);

    for _ in 0..10 {
        if backend.job(&job_id).map(|job| job.status) == Some(JobStatus::Canceled) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(backend.job(&job_id).unwrap().status, JobStatus::Canceled);
    assert_eq!(
        backend.get_result(&job_id).await.unwrap(),
        ResultStatus::Failed("Job was canceled".into())
    );
}

#[tokio::test(start_paused = true)]
async fn dismissed_cancel_keeps_polling() {
    let backend = simulator(never_finishing());
    let controller = ControllerHandle::spawn(backend.clone(), PollSettings::simulated());

    controller.submit(GenerateSpec::new("AI safety")).unwrap();
    settle(&controller, |view| view.job_id.is_some()).await;
    controller.request_cancel().unwrap();
    settle(&controller, |view| view.cancel_prompt_open).await;
    controller.dismiss_cancel().unwrap();

    let view = settle(&controller, |view| !view.cancel_prompt_open && view.attempts >= 3).await;
    assert_eq!(view.phase, Phase::Running);
    let job_id = view.job_id.unwrap();
    assert_eq!(backend.job(&job_id).unwrap().status, JobStatus::Running);
}

#[tokio::test(start_paused = true)]
async fn reset_after_success_clears_the_form() {
    let backend = simulator(SimulatorSettings {
        completion_chance: 1.0,
        ..SimulatorSettings::default()
    });
    let controller = ControllerHandle::spawn(backend, PollSettings::simulated());
    controller.submit(GenerateSpec::new("AI safety")).unwrap();
    settle(&controller, |view| view.phase == Phase::Success).await;

    controller.reset().unwrap();
    let view = settle(&controller, |view| view.phase == Phase::Idle).await;
    assert!(view.result.is_none());
    assert!(view.can_submit);
}

#[tokio::test]
async fn failing_result_endpoint_ends_in_timeout() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"jobId": "job-500"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/jobs/job-500/status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "job-500",
            "status": "running",
            "progress": {"stage": 1, "percent": 30, "log": []}
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/result/job-500"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/jobs/job-500/cancel"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let remote =
        RemoteBackend::new(RemoteSettings::with_base(&format!("{}/api/v1/", server.uri())).unwrap())
            .unwrap();
    let settings = PollSettings::new(Duration::from_millis(50), Duration::from_millis(300));
    let controller = ControllerHandle::spawn(Arc::new(remote), settings);
    assert_eq!(controller.backend_kind(), BackendKind::Remote);

    controller.submit(GenerateSpec::new("AI safety")).unwrap();
    let view = tokio::time::timeout(
        Duration::from_secs(10),
        controller.wait_for(|view| view.phase.is_terminal()),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(view.phase, Phase::Error);
    assert_eq!(view.error, Some(timeout_message(settings.max_attempts())));
    assert_eq!(view.percent, 30);
}

#[tokio::test]
async fn remote_submit_failure_surfaces_as_error() {
    engine_logging::initialize_for_tests();
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/generate"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let remote =
        RemoteBackend::new(RemoteSettings::with_base(&format!("{}/api/v1/", server.uri())).unwrap())
            .unwrap();
    let controller = ControllerHandle::spawn(Arc::new(remote), PollSettings::remote());
    controller.submit(GenerateSpec::new("AI safety")).unwrap();

    let view = tokio::time::timeout(
        Duration::from_secs(10),
        controller.wait_for(|view| view.phase.is_terminal()),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(view.phase, Phase::Error);
    assert!(view.error.unwrap().contains("503"));
}

#[tokio::test(start_paused = true)]
async fn shutdown_waits_for_the_cancel_request() {
    let backend = simulator(never_finishing());
    let controller = ControllerHandle::spawn(backend.clone(), PollSettings::simulated());

    controller.submit(GenerateSpec::new("AI safety")).unwrap();
    let view = settle(&controller, |view| view.job_id.is_some()).await;
    let job_id = view.job_id.unwrap();

    controller.cancel().unwrap();
    settle(&controller, |view| view.phase == Phase::Idle).await;
    controller.shutdown().await;

    assert_eq!(backend.job(&job_id).unwrap().status, JobStatus::Canceled);
}
