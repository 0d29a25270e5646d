//! SiteSync - asynchronous operation coordinator for the site builder frontend
//!
//! This library provides the coordination core shared by the content editor,
//! design panel, export screen, and SEO dashboard: debounced autosave of draft
//! documents and lifecycle tracking of long-running backend jobs.
//!
//! # High-Level API
//!
//! For most use cases, the [`session`] module provides a simplified facade:
//!
//! ```ignore
//! use std::sync::Arc;
//! use sitesync::api::{HttpBackend, JobKind};
//! use sitesync::config::CoordinatorConfig;
//! use sitesync::session::ProjectSession;
//!
//! let backend = Arc::new(HttpBackend::new("https://api.example.com")?);
//! let session = ProjectSession::new(backend, CoordinatorConfig::default());
//!
//! // Autosave: edits are persisted after the quiescence window.
//! session.open_document(&page_id, initial_state)?;
//! session.update_document(&page_id, patch)?;
//!
//! // Jobs: submit once, observe until terminal.
//! let handle = session.submit_job(JobKind::Export, params).await?;
//! let snapshot = handle.wait().await;
//! ```

pub mod api;
pub mod autosave;
pub mod config;
pub mod debounce;
pub mod draft;
pub mod job;
pub mod logging;
pub mod session;

/// Version of the SiteSync library.
///
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
