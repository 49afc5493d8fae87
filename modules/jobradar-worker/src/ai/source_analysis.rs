//! Source analysis agents: URL classification for discovery and config
//! proposals for recovery. Proposals may change the source type when the
//! sample shows a better path (an HTML page backed by a JSON API, say).

use std::sync::Arc;

use ai_client::{extract_json_from_response, CompletionRequest, InferenceClient, TaskKind};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use jobradar_common::SourceConfig;

use super::prompts;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlClassification {
    CompanySite,
    Aggregator,
    SingleJob,
    AtsVendor,
    Invalid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceClassification {
    pub kind: UrlClassification,
    pub reason: String,
    #[serde(default)]
    pub aggregator_domain: Option<String>,
}

#[async_trait]
pub trait SourceAnalyst: Send + Sync {
    async fn classify_url(&self, url: &str, page_sample: &str) -> Result<SourceClassification>;

    async fn propose_config(
        &self,
        current: &SourceConfig,
        sample: &str,
        notes: Option<&str>,
    ) -> Result<SourceConfig>;
}

pub struct AiSourceAnalyst {
    client: Arc<InferenceClient>,
}

impl AiSourceAnalyst {
    pub fn new(client: Arc<InferenceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SourceAnalyst for AiSourceAnalyst {
    async fn classify_url(&self, url: &str, page_sample: &str) -> Result<SourceClassification> {
        let request = CompletionRequest::new(prompts::source_classify_prompt(url, page_sample))
            .with_system(prompts::source_classify_system())
            .with_max_tokens(512)
            .with_temperature(0.1);

        let completion = self.client.execute(TaskKind::SourceAnalysis, &request).await?;
        let json = extract_json_from_response(&completion.text)
            .ok_or_else(|| anyhow!("no JSON in classification response"))?;
        serde_json::from_str(&json).context("classification did not match schema")
    }

    async fn propose_config(
        &self,
        current: &SourceConfig,
        sample: &str,
        notes: Option<&str>,
    ) -> Result<SourceConfig> {
        let request = CompletionRequest::new(prompts::source_repair_prompt(current, sample, notes))
            .with_system(prompts::source_repair_system())
            .with_max_tokens(1024)
            .with_temperature(0.1);

        let completion = self.client.execute(TaskKind::SourceAnalysis, &request).await?;
        let json = extract_json_from_response(&completion.text)
            .ok_or_else(|| anyhow!("no JSON in config proposal"))?;
        serde_json::from_str(&json).context("proposed config did not match any source type")
    }
}

/// Validate a proposed config: the required fields for its type must be
/// non-empty. The tagged deserialize already enforces shape; this rejects
/// structurally valid but unusable proposals.
pub fn validate_proposed_config(config: &SourceConfig) -> Result<()> {
    match config {
        SourceConfig::Html(c) => {
            if c.url.is_empty() || c.job_selector.is_empty() {
                return Err(anyhow!("html config needs url and job_selector"));
            }
            if c.fields.title.is_empty() || c.fields.url.is_empty() {
                return Err(anyhow!("html config needs title and url selectors"));
            }
        }
        SourceConfig::Api(c) => {
            if c.url.is_empty() {
                return Err(anyhow!("api config needs url"));
            }
            if c.fields.title.is_empty() || c.fields.url.is_empty() {
                return Err(anyhow!("api config needs title and url field paths"));
            }
        }
        SourceConfig::Rss(c) => {
            if c.url.is_empty() {
                return Err(anyhow!("rss config needs url"));
            }
        }
        other => {
            return Err(anyhow!(
                "recovery proposals must be html, api or rss, got {}",
                other.source_type()
            ));
        }
    }
    Ok(())
}
