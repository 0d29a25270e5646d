//! Local draft state for editable entities.
//!
//! The draft store holds, per entity, the current in-memory document, the
//! last backend-acknowledged snapshot, and the flags the autosave
//! coordinator drives: dirty, save-in-flight, and pending-resave.
//!
//! Mutations are synchronous so the UI can render optimistically; all
//! network activity lives in the [`autosave`](crate::autosave) layer.

mod document;
mod store;

pub use document::{merge_patch, DraftState, SaveBegin};
pub use store::{DraftError, DraftStore};
