// 🌐 Backend Client - submits an encoded batch to the processing endpoint
//
// One request per batch, a single attempt, no retries.

use crate::encoder::EncodedImage;
use crate::error::{PipelineError, Result, PROCESSING_FAILED};
use crate::totals::CategoryTotals;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const PROCESS_PATH: &str = "/process-bills";
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
const USER_AGENT: &str = concat!("bill-tally/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRequest {
    pub images: Vec<EncodedImage>,
}

/// One line item extracted from a bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "amount::deserialize")]
    pub amount: f64,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "other".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub category_totals: CategoryTotals,
    #[serde(default)]
    pub raw_expenses: Vec<Expense>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

/// Amounts arrive as JSON numbers or as numeric strings ("12.50", "$12.50")
mod amount {
    use serde::de::{self, Deserializer};
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Number(n) => Ok(n),
            Raw::Text(s) => {
                let cleaned: String = s.chars().filter(|c| !matches!(c, '$' | ',' | ' ')).collect();
                cleaned
                    .parse::<f64>()
                    .map_err(|_| de::Error::custom(format!("invalid amount '{}'", s)))
            }
        }
    }
}

// ============================================================================
// PROCESSOR SEAM
// ============================================================================

/// Anything that can turn a batch of encoded bills into category totals
#[async_trait::async_trait]
pub trait BillProcessor: Send + Sync {
    async fn process(&self, images: Vec<EncodedImage>) -> Result<ProcessResponse>;
}

// ============================================================================
// HTTP CLIENT
// ============================================================================

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: DEFAULT_SERVER_URL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

pub struct BackendClient {
    http_client: reqwest::Client,
    endpoint: String,
}

impl BackendClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()?;

        let endpoint = format!("{}{}", config.base_url.trim_end_matches('/'), PROCESS_PATH);
        Ok(BackendClient { http_client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait::async_trait]
impl BillProcessor for BackendClient {
    async fn process(&self, images: Vec<EncodedImage>) -> Result<ProcessResponse> {
        tracing::info!("Submitting {} image(s) to {}", images.len(), self.endpoint);

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&ProcessRequest { images })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!("Backend answered {}", status);
            return Err(PipelineError::request(PROCESSING_FAILED));
        }

        let parsed = response.json::<ProcessResponse>().await?;
        tracing::debug!(
            "Received {} categories, {} raw expenses",
            parsed.category_totals.len(),
            parsed.raw_expenses.len()
        );
        Ok(parsed)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP exchange with a canned response; hands back the request body.
    async fn one_shot_server(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];

            let header_end = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    return String::new();
                }
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let headers = String::from_utf8_lossy(&buf[..header_end]).to_lowercase();
            let content_length = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .map(|v| v.trim().parse::<usize>().unwrap())
                .unwrap_or(0);
            while buf.len() < header_end + content_length {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }

            let response = format!(
                "{}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let _ = socket.shutdown().await;

            String::from_utf8_lossy(&buf[header_end..]).into_owned()
        });

        (format!("http://{}", addr), handle)
    }

    fn client(base_url: String) -> BackendClient {
        BackendClient::new(ClientConfig {
            base_url,
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_path() {
        let c = client("http://localhost:5000/".to_string());
        assert_eq!(c.endpoint(), "http://localhost:5000/process-bills");
    }

    #[tokio::test]
    async fn test_success_parses_totals() {
        let (url, server) = one_shot_server(
            "HTTP/1.1 200 OK",
            r#"{"category_totals": {"food": 30, "transport": 10}, "raw_expenses": [{"description": "Bus", "amount": "10.00", "category": "transport"}]}"#,
        )
        .await;

        let images = vec![EncodedImage::from_bytes("image/png", b"one"), EncodedImage::from_bytes("image/png", b"two")];
        let response = client(url).process(images).await.unwrap();

        assert_eq!(response.category_totals.get("food"), Some(30.0));
        assert_eq!(response.raw_expenses[0].amount, 10.0);

        let sent: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        let sent_images = sent["images"].as_array().unwrap();
        assert_eq!(sent_images.len(), 2);
        assert_eq!(sent_images[0], "data:image/png;base64,b25l");
    }

    #[tokio::test]
    async fn test_server_error_is_generic_failure() {
        let (url, _server) = one_shot_server("HTTP/1.1 500 Internal Server Error", r#"{"error": "boom"}"#).await;

        let err = client(url).process(vec![EncodedImage::from_bytes("image/png", b"x")]).await.unwrap_err();
        assert!(matches!(err, PipelineError::RequestFailure(ref m) if m == PROCESSING_FAILED));
    }

    #[tokio::test]
    async fn test_missing_totals_is_request_failure() {
        let (url, _server) = one_shot_server("HTTP/1.1 200 OK", r#"{"raw_expenses": []}"#).await;

        let err = client(url).process(Vec::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::RequestFailure(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_request_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(format!("http://{}", addr)).process(Vec::new()).await.unwrap_err();
        assert!(matches!(err, PipelineError::RequestFailure(_)));
    }

    #[test]
    fn test_expense_amount_accepts_strings() {
        let expense: Expense = serde_json::from_str(r#"{"description": "Milk", "amount": "$1,234.50"}"#).unwrap();
        assert_eq!(expense.amount, 1234.5);
        assert_eq!(expense.category, "other");

        assert!(serde_json::from_str::<Expense>(r#"{"amount": "lots"}"#).is_err());
    }
}
