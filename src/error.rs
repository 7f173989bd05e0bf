// ⚠️ Pipeline Errors
// Every failure a bill upload can hit, surfaced through the shared alert area

use thiserror::Error;

/// Message shown when the backend answers with a non-success status
pub const PROCESSING_FAILED: &str = "Failed to process bills";

#[derive(Debug, Error)]
pub enum PipelineError {
    /// A selected file is not an image. The file is skipped, the rest continue.
    #[error("Please upload only image files ({name} skipped).")]
    InvalidFileType {
        name: String,
        media_type: Option<String>,
    },

    /// Reading one file failed, which aborts the whole batch.
    #[error("Could not read {name}: {source}")]
    EncodingFailure {
        name: String,
        #[source]
        source: std::io::Error,
    },

    /// Non-2xx status, transport error or an unusable response body.
    #[error("{0}")]
    RequestFailure(String),
}

impl PipelineError {
    pub fn request(message: impl Into<String>) -> Self {
        PipelineError::RequestFailure(message.into())
    }

    /// Text rendered in the alert area when a run fails
    pub fn alert_text(&self) -> String {
        match self {
            PipelineError::InvalidFileType { .. } => self.to_string(),
            _ => format!("Error processing bills: {}", self),
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(e: reqwest::Error) -> Self {
        PipelineError::RequestFailure(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
