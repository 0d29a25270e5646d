//! Long-running job submission and lifecycle tracking.
//!
//! A job (export, publish, audit, report generation) is submitted once,
//! assigned a server-side ID, and then polled at a fixed interval until it
//! reaches a terminal state. The controller enforces:
//!
//! - one active job per kind: a second submission while one is live is
//!   rejected before any network call;
//! - a bounded poll-failure budget: consecutive transport errors beyond the
//!   budget fail the job client-side instead of polling forever;
//! - monotone progress: a regressed percentage from the server never moves
//!   the displayed value backwards;
//! - deterministic shutdown: polling stops exactly once, on a terminal
//!   status or explicit cancellation.
//!
//! Observers hold a [`JobHandle`] backed by a watch channel; every poll
//! publishes a fresh [`JobSnapshot`].

mod controller;
mod handle;
mod status;

pub use controller::{JobController, JobError};
pub use handle::JobHandle;
pub use status::{JobSnapshot, JobStatus};
