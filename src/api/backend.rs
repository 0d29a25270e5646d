//! The `SyncBackend` trait: every network call the coordinator makes.

use super::types::{BackendError, EntityId, JobId, JobKind, JobStatusReport};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

/// Boxed future returned by [`SyncBackend`] methods.
///
/// The trait must be object-safe (the coordinator holds an
/// `Arc<dyn SyncBackend>`), so methods return boxed futures rather than
/// using `async fn`.
pub type BackendFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, BackendError>> + Send + 'a>>;

/// Network operations the coordinator depends on.
///
/// Implemented by [`HttpBackend`](super::HttpBackend) for production and by
/// scripted mocks in tests. One backend instance is shared per project
/// session; implementations must be safe to call concurrently.
pub trait SyncBackend: Send + Sync {
    /// Persists a document snapshot via `PUT /entities/{id}`.
    ///
    /// Success means the backend acknowledged exactly this snapshot. No
    /// response body is assumed beyond the acknowledgment.
    fn save_entity<'a>(&'a self, id: &'a EntityId, snapshot: &'a Value)
        -> BackendFuture<'a, ()>;

    /// Submits a job via `POST /jobs/{kind}` and returns the assigned ID.
    fn submit_job<'a>(&'a self, kind: JobKind, params: &'a Value)
        -> BackendFuture<'a, JobId>;

    /// Fetches job status via `GET /jobs/{kind}/{job_id}/status`.
    fn job_status<'a>(&'a self, kind: JobKind, id: &'a JobId)
        -> BackendFuture<'a, JobStatusReport>;

    /// Downloads a completed job's artifact via
    /// `GET /jobs/{kind}/{job_id}/download`.
    ///
    /// Only meaningful for kinds that produce a binary result (export).
    fn download_result<'a>(&'a self, kind: JobKind, id: &'a JobId)
        -> BackendFuture<'a, Vec<u8>>;
}
