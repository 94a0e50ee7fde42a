//! Builds concrete services from configuration.
//!
//! API keys are resolved here, so callers only ever deal with a loaded
//! `DevFusionConfig`.

use std::sync::Arc;

use devfusion_core::{
    DevFusionConfig, LocalStore, MemoryStore, Provider, StoreBackend, resolve_api_key,
};
use devfusion_proto::{DocumentStore, ModelError, RunError, StoreError};
use thiserror::Error;
use tracing::debug;

use crate::{FirestoreStore, GeminiClient, Judge0Client};

/// Errors from building a service out of configuration.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("store.project_id must be set for the firestore backend")]
    MissingProjectId,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Opens the document store selected by `store.backend`.
pub fn build_store(config: &DevFusionConfig) -> Result<Arc<dyn DocumentStore>, ServiceError> {
    let store = &config.store;
    debug!(backend = ?store.backend, "Building document store");
    Ok(match store.backend {
        StoreBackend::Firestore => {
            let project_id = store
                .project_id
                .as_deref()
                .filter(|id| !id.trim().is_empty())
                .ok_or(ServiceError::MissingProjectId)?;
            let api_key = resolve_api_key(Provider::Firestore, store.api_key.as_deref());
            Arc::new(FirestoreStore::new(store, project_id, api_key)?)
        }
        StoreBackend::Local => Arc::new(LocalStore::new(store.local_dir.clone(), store.poll_interval())),
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
    })
}

/// Creates the Judge0 runner. A missing key is fine for self-hosted instances.
pub fn build_runner(config: &DevFusionConfig) -> Result<Judge0Client, ServiceError> {
    let api_key = resolve_api_key(Provider::Judge0, config.runner.api_key.as_deref());
    Ok(Judge0Client::new(&config.runner, api_key)?)
}

/// Creates the Gemini client. A missing key surfaces on the first request.
pub fn build_model(config: &DevFusionConfig) -> Result<GeminiClient, ServiceError> {
    let api_key = resolve_api_key(Provider::Gemini, config.assistant.api_key.as_deref());
    Ok(GeminiClient::new(&config.assistant, api_key)?)
}
