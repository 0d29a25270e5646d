//! Backend contract consumed by the coordinator.
//!
//! The backend is an external collaborator reached over REST. This module
//! defines the identifier and wire types, the [`SyncBackend`] trait through
//! which every network call flows, and [`HttpBackend`], the reqwest-based
//! implementation of that trait.
//!
//! The trait indirection exists for dependency injection: the coordinator is
//! constructed with an `Arc<dyn SyncBackend>`, so tests substitute scripted
//! mock backends without any network.

mod backend;
mod http;
mod types;

pub use backend::{BackendFuture, SyncBackend};
pub use http::HttpBackend;
pub use types::{BackendError, EntityId, JobId, JobKind, JobStatusReport, RemoteJobStatus};
