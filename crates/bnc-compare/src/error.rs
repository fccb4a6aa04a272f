//! Error taxonomy shared by every comparison stage.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::diff::Verdict;

/// Errors raised while preparing or running one comparison.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("Required file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("Specification is empty: {reason}")]
    EmptySpec { reason: String },

    #[error("Unsupported specification value `{value}`")]
    InvalidValue { value: String },

    #[error("Variable domain mismatch: expected {expected:?}, found {found:?}")]
    DomainMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("{tool} failed: {message}")]
    ExternalToolFailure { tool: String, message: String },

    #[error("{tool} timed out after {after:?}")]
    Timeout { tool: String, after: Duration },

    #[error("Malformed {context}: {message}")]
    Format { context: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CompareError {
    pub fn format(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Format {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn tool_failure(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalToolFailure {
            tool: tool.into(),
            message: message.into(),
        }
    }

    /// Label under which the batch orchestrator records this failure.
    pub fn verdict(&self) -> Verdict {
        match self {
            CompareError::Timeout { .. } => Verdict::Timeout,
            _ => Verdict::Error,
        }
    }
}

pub type Result<T> = std::result::Result<T, CompareError>;
