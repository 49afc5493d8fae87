//! Company fact extraction from fetched page text.

use std::sync::Arc;

use ai_client::{extract_json_from_response, CompletionRequest, InferenceClient, TaskKind};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use jobradar_common::CompanySize;

use super::prompts;

/// Structured company facts as extracted from an about/careers page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompanyExtraction {
    pub about: Option<String>,
    pub culture: Option<String>,
    pub mission: Option<String>,
    pub tech_stack: Vec<String>,
    pub size: Option<CompanySize>,
    pub has_portland_office: bool,
}

#[async_trait]
pub trait CompanyInfoAgent: Send + Sync {
    async fn extract_company(&self, name: &str, page_text: &str) -> Result<CompanyExtraction>;
}

pub struct AiCompanyInfoAgent {
    client: Arc<InferenceClient>,
}

impl AiCompanyInfoAgent {
    pub fn new(client: Arc<InferenceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CompanyInfoAgent for AiCompanyInfoAgent {
    async fn extract_company(&self, name: &str, page_text: &str) -> Result<CompanyExtraction> {
        if page_text.trim().is_empty() {
            return Err(anyhow!("empty page text for company extraction"));
        }

        let request = CompletionRequest::new(prompts::company_prompt(name, page_text))
            .with_system(prompts::company_system())
            .with_max_tokens(1024)
            .with_temperature(0.2);

        let completion = self
            .client
            .execute(TaskKind::CompanyExtraction, &request)
            .await?;
        let json = extract_json_from_response(&completion.text)
            .ok_or_else(|| anyhow!("no JSON in company extraction response"))?;
        let mut extraction: CompanyExtraction =
            serde_json::from_str(&json).context("company extraction did not match schema")?;
        extraction.tech_stack = extraction
            .tech_stack
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Ok(extraction)
    }
}
