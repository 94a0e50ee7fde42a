//! # devfusion-proto
//!
//! Shared types and service traits for DevFusion.
//!
//! This crate provides:
//! - Room documents and file tree entries
//! - The `DocumentStore` seam rooms are synchronized through
//! - The `CodeRunner` seam for remote execution
//! - The `LanguageModel` seam for the AI assistant

mod model;
mod room;
mod runner;
mod store;

pub use model::{LanguageModel, ModelError, ModelResult};
pub use room::{FileEntry, FileId, FileKind, FileTree, IdError, Room, RoomEvent, RoomId};
pub use runner::{CodeRunner, LanguageId, RunError, RunOutput, RunRequest, RunResult, RunStatus};
pub use store::{DocumentStore, EventSender, RoomSubscription, StoreError, StoreResult};
