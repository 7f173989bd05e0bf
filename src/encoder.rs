// 🔐 Encoder - turns accepted files into data-URL payloads
//
// All reads run concurrently; results come back in batch order.

use crate::collector::{CandidateFile, UploadBatch};
use crate::error::{PipelineError, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

// ============================================================================
// ENCODED IMAGE
// ============================================================================

/// `data:<media-type>;base64,<payload>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncodedImage(String);

#[derive(Debug, Error, PartialEq)]
pub enum DataUrlError {
    #[error("not a data URL")]
    MissingScheme,

    #[error("data URL is not base64 encoded")]
    NotBase64,

    #[error("invalid base64 payload: {0}")]
    Payload(String),
}

impl EncodedImage {
    pub fn from_bytes(media_type: &str, bytes: &[u8]) -> Self {
        EncodedImage(format!("data:{};base64,{}", media_type, BASE64.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Media type declared in the header
    pub fn media_type(&self) -> Option<&str> {
        let header = self.0.strip_prefix("data:")?.split(',').next()?;
        header.split(';').next().filter(|m| !m.is_empty())
    }

    /// Split back into media type and raw bytes
    pub fn decode(&self) -> std::result::Result<(String, Vec<u8>), DataUrlError> {
        let rest = self.0.strip_prefix("data:").ok_or(DataUrlError::MissingScheme)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingScheme)?;

        let mut params = header.split(';');
        let media_type = params.next().filter(|m| !m.is_empty()).unwrap_or("text/plain");
        if !params.any(|p| p == "base64") {
            return Err(DataUrlError::NotBase64);
        }

        let bytes = BASE64
            .decode(payload.trim())
            .map_err(|e| DataUrlError::Payload(e.to_string()))?;

        Ok((media_type.to_string(), bytes))
    }
}

impl From<String> for EncodedImage {
    fn from(s: String) -> Self {
        EncodedImage(s)
    }
}

// ============================================================================
// ENCODING
// ============================================================================

/// Read and encode a single file
pub async fn encode_file(file: &CandidateFile) -> Result<EncodedImage> {
    let bytes = tokio::fs::read(&file.path)
        .await
        .map_err(|source| PipelineError::EncodingFailure {
            name: file.name.clone(),
            source,
        })?;

    let media_type = file.media_type.as_deref().unwrap_or(DEFAULT_MEDIA_TYPE);
    Ok(EncodedImage::from_bytes(media_type, &bytes))
}

/// Encode the whole batch. Fails as a whole if any single read fails.
pub async fn encode_batch(batch: &UploadBatch) -> Result<Vec<EncodedImage>> {
    let images = try_join_all(batch.files().iter().map(|file| encode_file(file))).await?;
    tracing::debug!("Encoded {} file(s)", images.len());
    Ok(images)
}

// ============================================================================
// TESTS
// ============================================================================
