// 🔎 Expense Extraction - turns one bill image into line items
//
// Reading the bill is delegated to an external vision model behind an
// OpenAI-compatible chat-completions endpoint. This module only builds the
// request and makes sense of whatever JSON comes back.

use crate::client::Expense;
use crate::encoder::{DataUrlError, EncodedImage};
use crate::ledger::ExpenseCategory;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_EXTRACTOR_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-4o";

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Invalid image: {0}")]
    InvalidImage(#[from] DataUrlError),

    #[error("Extractor API key is required")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for ExtractionError {
    fn from(e: reqwest::Error) -> Self {
        ExtractionError::Network(e.to_string())
    }
}

/// Reads the expenses off a single bill
#[async_trait::async_trait]
pub trait ExpenseExtractor: Send + Sync {
    async fn extract(&self, image: &EncodedImage) -> Result<Vec<Expense>, ExtractionError>;
}

// ============================================================================
// RESPONSE PARSING
// ============================================================================

/// Models wrap JSON in prose or code fences and pick their own shape.
/// Accepts an array of items, `{"expenses": [...]}` / `{"items": [...]}`,
/// or a single item object. Items that don't parse are skipped.
pub fn parse_expenses(content: &str) -> Result<Vec<Expense>, ExtractionError> {
    let body = strip_code_fence(content);
    let value: Value = serde_json::from_str(body).map_err(|e| ExtractionError::Parse(e.to_string()))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let nested = map.remove("expenses").or_else(|| map.remove("items"));
            match nested {
                Some(Value::Array(items)) => items,
                Some(other) => {
                    return Err(ExtractionError::Parse(format!("expected a list of expenses, got {}", other)))
                }
                None => vec![Value::Object(map)],
            }
        }
        other => return Err(ExtractionError::Parse(format!("unexpected JSON: {}", other))),
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<Expense>(item) {
            Ok(expense) => Some(expense),
            Err(e) => {
                tracing::warn!("Skipping unreadable line item: {}", e);
                None
            }
        })
        .collect())
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the language tag line, e.g. ```json
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

// ============================================================================
// REMOTE EXTRACTOR
// ============================================================================

#[derive(Clone)]
pub struct ExtractorConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl fmt::Debug for ExtractorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractorConfig")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize, Serialize)]
struct ChatMessage {
    content: Option<String>,
}

pub struct RemoteExtractor {
    http_client: reqwest::Client,
    config: ExtractorConfig,
}

impl fmt::Debug for RemoteExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteExtractor").field("config", &self.config).finish()
    }
}

impl RemoteExtractor {
    pub fn new(config: ExtractorConfig) -> Result<Self, ExtractionError> {
        if config.api_key.trim().is_empty() {
            return Err(ExtractionError::MissingApiKey);
        }

        let http_client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(RemoteExtractor { http_client, config })
    }

    fn prompt() -> String {
        format!(
            "Analyze this bill and extract its expenses. Return only a JSON array where each item has: \
             description (item/service name), amount (numeric value), category ({}).",
            ExpenseCategory::names()
        )
    }

    fn request_body(&self, image: &EncodedImage) -> Value {
        json!({
            "model": self.config.model,
            "temperature": 0,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": Self::prompt() },
                    { "type": "image_url", "image_url": { "url": image.as_str() } }
                ]
            }]
        })
    }
}

#[async_trait::async_trait]
impl ExpenseExtractor for RemoteExtractor {
    async fn extract(&self, image: &EncodedImage) -> Result<Vec<Expense>, ExtractionError> {
        let (media_type, bytes) = image.decode()?;
        tracing::debug!("Extracting from {} ({} bytes)", media_type, bytes.len());

        let response = self
            .http_client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(image))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Api(status.as_u16(), text));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ExtractionError::Parse(e.to_string()))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ExtractionError::Parse("empty completion".to_string()))?;

        parse_expenses(&content)
    }
}

// ============================================================================
// TESTS
// ============================================================================
