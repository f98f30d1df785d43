use std::time::Duration;

use engine_logging::{engine_debug, engine_info, engine_warn};
use podcast_core::{GenerateSpec, JobError, JobId, Progress, ResultStatus};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::wire::{
    CancelResponse, GenerateRequest, GenerateResponse, JobStatusWire, ProgressWire, ResultWire,
};
use crate::{BackendKind, CancelAck, JobBackend};

pub const DEFAULT_API_BASE: &str = "http://localhost:8000/api/v1/";
pub const TIMEOUT_MESSAGE: &str = "request timed out";

/// Where the per-job progress and cancel routes live. `result/{id}` and
/// `generate` are shared by both layouts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteLayout {
    /// `GET jobs/{id}/status` with progress nested under `progress`, and
    /// `POST jobs/{id}/cancel`. This is what the generation service serves.
    #[default]
    Jobs,
    /// `GET progress/{id}` returning the progress object itself, and
    /// `POST cancel/{id}`.
    Flat,
}

impl RouteLayout {
    fn progress_path(self, job_id: &str) -> Vec<&str> {
        match self {
            RouteLayout::Jobs => vec!["jobs", job_id, "status"],
            RouteLayout::Flat => vec!["progress", job_id],
        }
    }

    fn cancel_path(self, job_id: &str) -> Vec<&str> {
        match self {
            RouteLayout::Jobs => vec!["jobs", job_id, "cancel"],
            RouteLayout::Flat => vec!["cancel", job_id],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteSettings {
    pub base_url: Url,
    pub routes: RouteLayout,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
}

impl RemoteSettings {
    /// Parses `base` and appends the trailing slash that `Url::join` needs to
    /// keep the last path segment.
    pub fn with_base(base: &str) -> Result<Self, JobError> {
        let mut base_url = Url::parse(base.trim())
            .map_err(|err| JobError::Validation(format!("invalid API base {base:?}: {err}")))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            base_url,
            ..Self::default()
        })
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_routes(mut self, routes: RouteLayout) -> Self {
        self.routes = routes;
        self
    }
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_API_BASE).unwrap_or_else(|_| unreachable!()),
            routes: RouteLayout::default(),
            request_timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
        }
    }
}

/// Talks to the generation service over HTTP/JSON.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    settings: RemoteSettings,
    client: reqwest::Client,
}

impl RemoteBackend {
    pub fn new(settings: RemoteSettings) -> Result<Self, JobError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| JobError::transport(None, err.to_string()))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &RemoteSettings {
        &self.settings
    }

    fn endpoint(&self, path: &str) -> Result<Url, JobError> {
        self.settings
            .base_url
            .join(path)
            .map_err(|err| JobError::Contract(format!("bad endpoint {path:?}: {err}")))
    }

    /// Appends `segments` to the base, percent-encoding each one.
    fn job_endpoint(&self, segments: &[&str]) -> Result<Url, JobError> {
        let mut url = self.settings.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| JobError::Contract("API base cannot carry a path".into()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, job_id: &str) -> Result<T, JobError> {
        engine_debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        let bytes = read_success(response, Some(job_id)).await?;
        decode(&bytes)
    }
}

#[async_trait::async_trait]
impl JobBackend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn generate(&self, spec: &GenerateSpec) -> Result<JobId, JobError> {
        let spec = spec.clone().validated()?;
        let url = self.endpoint("generate")?;
        let body = serde_json::to_vec(&GenerateRequest::from_spec(&spec))
            .map_err(|err| JobError::Contract(err.to_string()))?;

        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            let detail = response.text().await.unwrap_or_default();
            return Err(JobError::Validation(rejection_detail(status, &detail)));
        }
        let bytes = read_success(response, None).await?;
        let job_id = decode::<GenerateResponse>(&bytes)?.into_job_id()?;
        engine_info!("Remote job {} accepted for topic {:?}", job_id, spec.topic);
        Ok(job_id)
    }

    async fn get_progress(&self, job_id: &str) -> Result<Progress, JobError> {
        let url = self.job_endpoint(&self.settings.routes.progress_path(job_id))?;
        match self.settings.routes {
            RouteLayout::Jobs => {
                let wire: JobStatusWire = self.get_json(url, job_id).await?;
                Ok(wire.into_progress())
            }
            RouteLayout::Flat => {
                let wire: ProgressWire = self.get_json(url, job_id).await?;
                Ok(wire.into_progress())
            }
        }
    }

    async fn get_result(&self, job_id: &str) -> Result<ResultStatus, JobError> {
        let url = self.job_endpoint(&["result", job_id])?;
        let wire: ResultWire = self.get_json(url, job_id).await?;
        wire.into_status(job_id, &self.settings.base_url)
    }

    async fn cancel(&self, job_id: &str) -> Result<CancelAck, JobError> {
        let url = self.job_endpoint(&self.settings.routes.cancel_path(job_id))?;
        engine_debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if response.status() == StatusCode::BAD_REQUEST {
            engine_debug!("Service refused to cancel {}", job_id);
            return Ok(CancelAck::ignored());
        }
        let bytes = read_success(response, Some(job_id)).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(CancelAck::accepted());
        }
        match serde_json::from_slice::<CancelResponse>(&bytes) {
            Ok(body) => Ok(CancelAck {
                ok: body.ok.unwrap_or(true),
            }),
            Err(err) => {
                engine_warn!("Ignoring unreadable cancel body for {}: {}", job_id, err);
                Ok(CancelAck::accepted())
            }
        }
    }
}

/// Returns the body of a 2xx response. A 404 on a job route is `NotFound`.
async fn read_success(response: reqwest::Response, job_id: Option<&str>) -> Result<Vec<u8>, JobError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        if let Some(job_id) = job_id {
            return Err(JobError::NotFound(job_id.to_string()));
        }
    }
    if !status.is_success() {
        return Err(JobError::transport(Some(status.as_u16()), status.to_string()));
    }
    let bytes = response.bytes().await.map_err(map_reqwest_error)?;
    Ok(bytes.to_vec())
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, JobError> {
    serde_json::from_slice(bytes).map_err(|err| JobError::Contract(err.to_string()))
}

fn rejection_detail(status: StatusCode, body: &str) -> String {
    let detail = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| value.get("detail").map(|detail| match detail {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }))
        .unwrap_or_else(|| body.trim().to_string());
    if detail.is_empty() {
        format!("server rejected the request ({status})")
    } else {
        detail
    }
}

fn map_reqwest_error(err: reqwest::Error) -> JobError {
    if err.is_timeout() {
        return JobError::Timeout(TIMEOUT_MESSAGE.to_string());
    }
    JobError::transport(err.status().map(|status| status.as_u16()), err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_gets_a_trailing_slash() {
        let settings = RemoteSettings::with_base("http://api.test/v2").unwrap();
        assert_eq!(settings.base_url.as_str(), "http://api.test/v2/");
        assert_eq!(settings.request_timeout, Duration::from_secs(15));
    }

    #[test]
    fn default_settings_target_the_local_service() {
        let settings = RemoteSettings::default();
        assert_eq!(settings.base_url.as_str(), DEFAULT_API_BASE);
        assert_eq!(settings.routes, RouteLayout::Jobs);
    }

    #[test]
    fn job_routes_encode_the_id() {
        let backend = RemoteBackend::new(RemoteSettings::default()).unwrap();
        let url = backend
            .job_endpoint(&RouteLayout::Jobs.progress_path("abc 1"))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/v1/jobs/abc%201/status");

        let url = backend
            .job_endpoint(&RouteLayout::Flat.cancel_path("abc/1"))
            .unwrap();
        assert_eq!(url.as_str(), "http://localhost:8000/api/v1/cancel/abc%2F1");
    }

    #[test]
    fn rejection_detail_prefers_fastapi_detail() {
        assert_eq!(
            rejection_detail(StatusCode::BAD_REQUEST, r#"{"detail":"topic too long"}"#),
            "topic too long"
        );
        assert_eq!(
            rejection_detail(StatusCode::UNPROCESSABLE_ENTITY, ""),
            "server rejected the request (422 Unprocessable Entity)"
        );
    }

    #[test]
    fn invalid_base_is_rejected() {
        assert!(matches!(
            RemoteSettings::with_base("not a url"),
            Err(JobError::Validation(_))
        ));
    }
}
