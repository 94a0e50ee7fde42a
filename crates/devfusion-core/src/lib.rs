//! # devfusion-core
//!
//! Core room editing functionality for DevFusion.
//!
//! This crate provides:
//! - Room sessions that subscribe to a room and write changes back
//! - File tree reconciliation between local edits and remote snapshots
//! - Configuration loading and API key resolution
//! - Assistant prompts and the extension-to-runtime map
//! - In-memory and file-backed document stores

pub mod assist;
mod config;
mod credentials;
pub mod language;
mod local_store;
mod memory_store;
pub mod poller;
mod reconciler;
mod session;

pub use assist::{AssistIntent, build_prompt, clean_response};
pub use config::{
    AssistantConfig, ConfigError, DevFusionConfig, OVERRIDE_KEYS, RunnerConfig, StoreBackend,
    StoreConfig,
};
pub use credentials::{
    CredentialError, Provider, clear_api_key, resolve_api_key, store_api_key,
};
pub use language::{Language, language_for};
pub use local_store::LocalStore;
pub use memory_store::MemoryStore;
pub use reconciler::{EditOutcome, ReconcileError, Reconciler, RemoteOutcome};
pub use session::{AssistOutcome, RoomSession, SessionError, SessionResult, create_room};
