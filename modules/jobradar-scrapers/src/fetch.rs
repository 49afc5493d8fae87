//! Shared HTTP plumbing for scraper adapters: one client, explicit
//! timeouts, status classification, and Retry-After extraction.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;
use reqwest::{Method, Response};

use crate::error::{Result, ScrapeError};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; jobradar/0.1; +https://jobradar.dev)";
pub const FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .expect("Failed to build HTTP client");
        Self { client }
    }

    fn classify(url: &str, err: reqwest::Error) -> ScrapeError {
        // Timeouts, DNS failures, connection resets: all transient.
        ScrapeError::transient(url, err.to_string())
    }

    async fn check_status(url: &str, resp: Response) -> Result<Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let retry_after = resp
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        Err(ScrapeError::from_status(url, status.as_u16(), retry_after))
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Self::classify(url, e))?;
        let resp = Self::check_status(url, resp).await?;
        resp.text().await.map_err(|e| Self::classify(url, e))
    }

    pub async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        self.request_json(Method::GET, url, None, &[]).await
    }

    pub async fn request_json(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
        headers: &[(String, String)],
    ) -> Result<serde_json::Value> {
        let mut req = self.client.request(method, url);
        for (name, value) in headers {
            req = req.header(name, value);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req.send().await.map_err(|e| Self::classify(url, e))?;
        let resp = Self::check_status(url, resp).await?;
        let text = resp.text().await.map_err(|e| Self::classify(url, e))?;

        if crate::detect::is_protected_api_response(&text) && serde_json::from_str::<serde_json::Value>(&text)
            .map(|v| v.get("jobs").is_none() && v.get("data").is_none())
            .unwrap_or(true)
        {
            return Err(ScrapeError::ProtectedApi {
                url: url.to_string(),
                message: "API requires token".to_string(),
            });
        }

        serde_json::from_str(&text)
            .map_err(|e| ScrapeError::config(url, format!("invalid JSON response: {e}")))
    }
}
