//! Error types surfaced by the wizard controller.

use crate::model::Step;
use thiserror::Error;

pub const NO_TEMPLATE_MESSAGE: &str = "Please select a .docx template file.";
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed. Please check the server or file.";
pub const GENERATION_FAILED_MESSAGE: &str = "Document generation failed.";

/// Any failure of a backend call.
///
/// Transport errors, non-2xx statuses and malformed payloads all land here;
/// `detail` is only ever logged.
#[derive(Debug, Clone, Error)]
#[error("{detail}")]
pub struct RequestFailure {
    pub detail: String,
}

impl RequestFailure {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl From<anyhow::Error> for RequestFailure {
    fn from(e: anyhow::Error) -> Self {
        Self::new(format!("{e:#}"))
    }
}

#[derive(Debug, Clone, Error)]
pub enum WizardError {
    #[error("{}", NO_TEMPLATE_MESSAGE)]
    NoTemplate,
    #[error("{}", UPLOAD_FAILED_MESSAGE)]
    Upload(#[source] RequestFailure),
    #[error("{}", GENERATION_FAILED_MESSAGE)]
    Generation(#[source] RequestFailure),
    #[error("a request is already in progress")]
    Busy,
    #[error("cannot {action} during the {step} step")]
    WrongStep { action: &'static str, step: Step },
    #[error("prompt {index} is out of range (current prompt is {current})")]
    InvalidPrompt { index: usize, current: usize },
}

impl WizardError {
    /// Whether this error came back from the backend rather than a local precondition.
    pub fn is_request_failure(&self) -> bool {
        matches!(self, WizardError::Upload(_) | WizardError::Generation(_))
    }
}
