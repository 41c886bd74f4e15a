#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! HTTP extraction provider for financial statement tables.
//!
//! # Example
//!
//! ```no_run
//! use statements_http::HttpExtractionProvider;
//! use statements_core::{ExtractionProvider, SourceDocument, SourceId};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = HttpExtractionProvider::new("http://localhost:8080")?;
//!
//!     let source = SourceDocument::new(SourceId(1234), "فولاد", "Mobarakeh Steel", "title")
//!         .with_url("https://example.com/statement/1234");
//!     let raw = provider.extract(&source).await?;
//!     println!("{} periods, {} rows", raw.periods.len(), raw.items.len());
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use serde::Serialize;
use statements_core::{ExtractionProvider, RawExtraction, Result, SourceDocument, StatementsError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};
use tracing::{debug, instrument};

/// Default spacing between extraction requests.
const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(500);

/// Default request timeout. Extraction sessions render a full page.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Rate limiter spacing requests by a minimum interval.
#[derive(Debug)]
struct RateLimiter {
    last_request: Option<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    const fn new(min_interval: Duration) -> Self {
        Self {
            last_request: None,
            min_interval,
        }
    }

    async fn wait(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

/// Request body sent to the extraction service.
#[derive(Debug, Serialize)]
struct ExtractRequest<'a> {
    source_id: u64,
    url: &'a str,
}

/// Extraction provider backed by a remote table-extraction service.
#[derive(Debug)]
pub struct HttpExtractionProvider {
    client: reqwest::Client,
    endpoint: String,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl HttpExtractionProvider {
    /// Create a provider for the service at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| StatementsError::Network(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/extract", base_url.trim_end_matches('/')),
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(DEFAULT_MIN_INTERVAL))),
        }
    }

    /// Sets the minimum interval between requests.
    #[must_use]
    pub fn with_min_interval(self, min_interval: Duration) -> Self {
        Self {
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(min_interval))),
            ..self
        }
    }

    /// Returns the extraction endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ExtractionProvider for HttpExtractionProvider {
    fn name(&self) -> &str {
        "HTTP extraction service"
    }

    fn description(&self) -> &str {
        "Remote table-extraction service returning raw statement tables"
    }

    #[instrument(skip(self, source), fields(source_id = %source.id, symbol = %source.symbol))]
    async fn extract(&self, source: &SourceDocument) -> Result<RawExtraction> {
        let url = source.url.as_deref().ok_or_else(|| {
            StatementsError::InvalidParameter(format!("source {} has no url", source.id))
        })?;

        // Rate limit
        self.rate_limiter.lock().await.wait().await;

        debug!("Requesting extraction from {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ExtractRequest {
                source_id: source.id.get(),
                url,
            })
            .send()
            .await
            .map_err(|e| StatementsError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(StatementsError::Network(format!(
                "Extraction of source {} failed: HTTP {}",
                source.id,
                response.status()
            )));
        }

        let raw: RawExtraction = response
            .json()
            .await
            .map_err(|e| StatementsError::Parse(format!("Failed to parse extraction: {}", e)))?;

        debug!(
            "Extracted {} periods and {} rows",
            raw.periods.len(),
            raw.items.len()
        );
        Ok(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use statements_core::SourceId;

    #[test]
    fn test_provider_traits() {
        let provider = HttpExtractionProvider::new("http://localhost:8080/").unwrap();
        assert_eq!(provider.endpoint(), "http://localhost:8080/extract");
        assert!(!provider.name().is_empty());
        assert!(!provider.description().is_empty());
    }

    #[test]
    fn test_request_body() {
        let body = serde_json::to_value(ExtractRequest {
            source_id: 42,
            url: "https://example.com/42",
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "source_id": 42, "url": "https://example.com/42" })
        );
    }

    #[test]
    fn test_response_decoding_accepts_name_alias() {
        let json = r#"{
            "periods": ["1403/12/29", "1402/12/29"],
            "items": [{ "name": "سود خالص", "values": [{ "amount": 12.5, "formatted": "12.5" }] }]
        }"#;
        let raw: RawExtraction = serde_json::from_str(json).unwrap();
        assert_eq!(raw.items[0].label, "سود خالص");
        assert!(raw.items[0].value_at(1).is_none());
        assert!(raw.error.is_none());
    }

    #[tokio::test]
    async fn test_extract_requires_url() {
        let provider = HttpExtractionProvider::new("http://localhost:8080").unwrap();
        let source = SourceDocument::new(SourceId(1), "فولاد", "Steel", "title");
        let err = provider.extract(&source).await.unwrap_err();
        assert!(matches!(err, StatementsError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn test_rate_limiter_spaces_requests() {
        let mut limiter = RateLimiter::new(Duration::from_millis(50));
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
        limiter.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
