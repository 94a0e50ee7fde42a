//! # devfusion-adapters
//!
//! Network service adapters for DevFusion.
//!
//! This crate provides implementations of the `devfusion-proto` service
//! traits:
//! - Cloud Firestore (REST) as a `DocumentStore`
//! - Judge0 as a `CodeRunner`
//! - Google Gemini as a `LanguageModel`
//!
//! The `services` module turns a loaded configuration into ready-to-use
//! instances, including API key resolution.

mod firestore;
mod firestore_value;
mod gemini;
mod judge0;
mod services;

pub use firestore::FirestoreStore;
pub use gemini::GeminiClient;
pub use judge0::Judge0Client;
pub use services::{ServiceError, build_model, build_runner, build_store};
