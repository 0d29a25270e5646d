//! HTTP implementation of the backend contract.

use super::backend::{BackendFuture, SyncBackend};
use super::types::{
    BackendError, EntityId, JobId, JobKind, JobStatusReport, JobSubmitResponse,
};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, trace};

/// Default HTTP request timeout (30 seconds).
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP-based implementation of [`SyncBackend`].
///
/// Talks to the builder backend's REST API:
///
/// - `PUT /entities/{id}` - persist a document snapshot
/// - `POST /jobs/{kind}` - submit a job
/// - `GET /jobs/{kind}/{job_id}/status` - poll job status
/// - `GET /jobs/{kind}/{job_id}/download` - fetch a completed export
///
/// # Example
///
/// ```ignore
/// use sitesync::api::HttpBackend;
///
/// let backend = HttpBackend::new("https://api.example.com")?;
/// ```
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpBackend {
    /// Creates a backend client with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Creates a backend client with a custom request timeout.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("SiteSync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    fn entity_url(&self, id: &EntityId) -> String {
        format!("{}/entities/{}", self.base_url, id)
    }

    fn jobs_url(&self, kind: JobKind) -> String {
        format!("{}/jobs/{}", self.base_url, kind)
    }

    fn status_url(&self, kind: JobKind, id: &JobId) -> String {
        format!("{}/jobs/{}/{}/status", self.base_url, kind, id)
    }

    fn download_url(&self, kind: JobKind, id: &JobId) -> String {
        format!("{}/jobs/{}/{}/download", self.base_url, kind, id)
    }

    fn map_send_error(&self, url: &str, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout {
                url: url.to_string(),
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            BackendError::Transport(e.to_string())
        }
    }

    /// Converts a non-2xx response into a `Rejected` error, reading as much
    /// of the body as is available for the message.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(BackendError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

impl SyncBackend for HttpBackend {
    fn save_entity<'a>(
        &'a self,
        id: &'a EntityId,
        snapshot: &'a Value,
    ) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            let url = self.entity_url(id);
            trace!(entity_id = %id, url = %url, "Persisting entity snapshot");

            let response = self
                .client
                .put(&url)
                .json(snapshot)
                .send()
                .await
                .map_err(|e| self.map_send_error(&url, e))?;

            Self::check_status(response).await?;
            debug!(entity_id = %id, "Entity snapshot acknowledged");
            Ok(())
        })
    }

    fn submit_job<'a>(&'a self, kind: JobKind, params: &'a Value) -> BackendFuture<'a, JobId> {
        Box::pin(async move {
            let url = self.jobs_url(kind);
            debug!(job_kind = %kind, url = %url, "Submitting job");

            let response = self
                .client
                .post(&url)
                .json(params)
                .send()
                .await
                .map_err(|e| self.map_send_error(&url, e))?;

            let body: JobSubmitResponse = Self::check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

            Ok(JobId::new(body.job_id))
        })
    }

    fn job_status<'a>(
        &'a self,
        kind: JobKind,
        id: &'a JobId,
    ) -> BackendFuture<'a, JobStatusReport> {
        Box::pin(async move {
            let url = self.status_url(kind, id);
            trace!(job_kind = %kind, job_id = %id, "Polling job status");

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| self.map_send_error(&url, e))?;

            let mut report: JobStatusReport = Self::check_status(response)
                .await?
                .json()
                .await
                .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

            // Exports always have a download route once completed; fill the
            // result reference if the status payload omitted it.
            if kind == JobKind::Export
                && report.status == super::types::RemoteJobStatus::Completed
                && report.result.is_none()
            {
                report.result = Some(Value::String(self.download_url(kind, id)));
            }

            Ok(report)
        })
    }

    fn download_result<'a>(&'a self, kind: JobKind, id: &'a JobId) -> BackendFuture<'a, Vec<u8>> {
        Box::pin(async move {
            let url = self.download_url(kind, id);
            debug!(job_kind = %kind, job_id = %id, "Downloading job result");

            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| self.map_send_error(&url, e))?;

            let bytes = Self::check_status(response)
                .await?
                .bytes()
                .await
                .map_err(|e| BackendError::Transport(e.to_string()))?;

            Ok(bytes.to_vec())
        })
    }
}
