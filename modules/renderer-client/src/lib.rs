//! HTTP client for the shared browser-rendering service.
//!
//! The renderer is one bounded-concurrency resource for the whole process:
//! a semaphore caps in-flight renders so a burst of JS-heavy sources cannot
//! exhaust the rendering backend.

pub mod error;

pub use error::{RenderError, Result};

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use typed_builder::TypedBuilder;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, TypedBuilder, Serialize)]
pub struct RenderRequest {
    #[builder(setter(into))]
    pub url: String,
    #[builder(default, setter(into, strip_option))]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for_selector: Option<String>,
    #[builder(default = DEFAULT_TIMEOUT_MS)]
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    Ok,
    /// Page loaded but the wait-for selector never appeared. The HTML is
    /// still returned so detection heuristics can run on it.
    Partial,
    Timeout,
    Error,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RenderResult {
    pub final_url: String,
    pub status: RenderStatus,
    #[serde(default)]
    pub html: String,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl RenderResult {
    /// True when the result carries HTML worth inspecting, even if partial.
    pub fn has_content(&self) -> bool {
        !self.html.trim().is_empty()
    }
}

pub struct RendererClient {
    client: reqwest::Client,
    base_url: String,
    permits: Arc<Semaphore>,
}

impl RendererClient {
    pub fn new(base_url: &str, max_concurrency: usize) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS + 10_000))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            permits: Arc::new(Semaphore::new(max_concurrency.max(1))),
        }
    }

    /// Render a page via the service's /render endpoint. Holds a concurrency
    /// permit for the duration of the call.
    pub async fn render(&self, request: &RenderRequest) -> Result<RenderResult> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| RenderError::Network(e.to_string()))?;

        tracing::debug!(url = %request.url, "Requesting render");

        let endpoint = format!("{}/render", self.base_url);
        let resp = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(RenderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let result: RenderResult = resp.json().await?;
        tracing::debug!(
            url = %request.url,
            status = ?result.status,
            bytes = result.html.len(),
            "Render complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_defaults() {
        let req = RenderRequest::builder().url("https://example.com").build();
        assert_eq!(req.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert!(req.wait_for_selector.is_none());
    }

    #[test]
    fn partial_result_still_has_content() {
        let raw = serde_json::json!({
            "final_url": "https://example.com/careers",
            "status": "partial",
            "html": "<html><body>jobs</body></html>",
            "errors": ["selector .job-card timed out"],
        });
        let result: RenderResult = serde_json::from_value(raw).unwrap();
        assert_eq!(result.status, RenderStatus::Partial);
        assert!(result.has_content());
    }
}
