//! Remote code execution seam.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Runtime identifier understood by the execution service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageId(pub u32);

impl fmt::Display for LanguageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single-file execution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub source: String,
    pub language: LanguageId,
    pub stdin: Option<String>,
}

/// Outcome status reported by the execution service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub id: u32,
    pub description: String,
}

impl RunStatus {
    /// Status id the service uses for a clean run.
    pub const ACCEPTED: u32 = 3;

    pub fn is_success(&self) -> bool {
        self.id == Self::ACCEPTED
    }
}

/// Captured output of one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunOutput {
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub compile_output: Option<String>,
    /// Service-side diagnostic (e.g. sandbox limits).
    pub message: Option<String>,
    pub status: RunStatus,
    /// Wall time in seconds, as reported.
    pub time: Option<String>,
    /// Peak memory in kilobytes.
    pub memory: Option<u64>,
}

/// Errors from the execution service.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("execution service unreachable: {0}")]
    Unavailable(String),

    #[error("execution service error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("malformed execution response: {0}")]
    Malformed(String),
}

pub type RunResult<T> = Result<T, RunError>;

/// Out-of-process code runner.
#[async_trait]
pub trait CodeRunner: Send + Sync {
    async fn run(&self, request: &RunRequest) -> RunResult<RunOutput>;
}
