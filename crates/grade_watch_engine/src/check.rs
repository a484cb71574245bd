use std::time::Duration;

use serde::Deserialize;

use crate::{CheckError, FailureKind, PollStatus};

/// Path under the backend base address that reports a job's grading status.
pub const STATUS_PATH: &str = "ai_grading/grade_result";

/// The only status value that ends polling.
const COMPLETED_STATUS: &str = "completed";

#[derive(Debug, Clone)]
pub struct CheckSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for CheckSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Asks the backend whether a job has finished.
#[async_trait::async_trait]
pub trait StatusChecker: Send + Sync {
    async fn check(&self, job_id: &str) -> Result<PollStatus, CheckError>;
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    #[serde(default)]
    status: Option<String>,
}

/// Strips trailing slashes so paths can be appended with a single `/`.
pub fn normalize_backend_url(base: &str) -> &str {
    base.trim().trim_end_matches('/')
}

pub fn status_url(backend: &str, job_id: &str) -> String {
    format!("{}/{STATUS_PATH}/{job_id}", normalize_backend_url(backend))
}

/// Interprets a status body. Anything but `"completed"` (including a missing
/// field) is still pending; a body that does not parse as a status document is an error.
pub fn parse_status(body: &[u8]) -> Result<PollStatus, CheckError> {
    let parsed: StatusBody = serde_json::from_slice(body)
        .map_err(|err| CheckError::new(FailureKind::MalformedBody, err.to_string()))?;
    match parsed.status.as_deref() {
        Some(COMPLETED_STATUS) => Ok(PollStatus::Completed),
        _ => Ok(PollStatus::Pending),
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestStatusChecker {
    backend: String,
    client: reqwest::Client,
}

impl ReqwestStatusChecker {
    pub fn new(backend: &str, settings: CheckSettings) -> Result<Self, CheckError> {
        let backend = normalize_backend_url(backend).to_string();
        reqwest::Url::parse(&backend)
            .map_err(|err| CheckError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| CheckError::new(FailureKind::Network, err.to_string()))?;

        Ok(Self { backend, client })
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }
}

#[async_trait::async_trait]
impl StatusChecker for ReqwestStatusChecker {
    async fn check(&self, job_id: &str) -> Result<PollStatus, CheckError> {
        let url = status_url(&self.backend, job_id);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(CheckError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let body = response.bytes().await.map_err(map_reqwest_error)?;
        parse_status(&body)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> CheckError {
    if err.is_timeout() {
        return CheckError::new(FailureKind::Timeout, err.to_string());
    }
    CheckError::new(FailureKind::Network, err.to_string())
}
