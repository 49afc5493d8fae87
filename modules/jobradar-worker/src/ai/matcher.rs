//! Qualitative match analysis. The analyser produces skills, strengths,
//! and concerns; it never scores. The deterministic score from the scoring
//! engine is attached by the save stage.

use std::sync::Arc;

use ai_client::{extract_json_from_response, CompletionRequest, InferenceClient, TaskKind};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::warn;

use jobradar_common::{JobPosting, MatchAnalysis, Profile};

use super::prompts;

#[async_trait]
pub trait Matcher: Send + Sync {
    async fn analyze(
        &self,
        job: &JobPosting,
        company_info: &str,
        profile: &Profile,
    ) -> Result<MatchAnalysis>;
}

pub struct AiMatcher {
    client: Arc<InferenceClient>,
}

impl AiMatcher {
    pub fn new(client: Arc<InferenceClient>) -> Self {
        Self { client }
    }

    fn parse(response: &str) -> Result<MatchAnalysis> {
        let json = extract_json_from_response(response)
            .ok_or_else(|| anyhow!("no JSON in analysis response: {:.200}", response))?;
        serde_json::from_str(&json).context("analysis response did not match schema")
    }

    /// Responses sometimes wrap skills as objects like
    /// {"skill": "Python", "proficiency": "Advanced"}; flatten to names.
    fn normalize_skills(raw: &serde_json::Value) -> Vec<String> {
        raw.as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| match item {
                        serde_json::Value::String(s) => Some(s.clone()),
                        serde_json::Value::Object(map) => map
                            .get("skill")
                            .or_else(|| map.get("name"))
                            .or_else(|| map.get("technology"))
                            .and_then(|v| v.as_str())
                            .map(String::from),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl Matcher for AiMatcher {
    async fn analyze(
        &self,
        job: &JobPosting,
        company_info: &str,
        profile: &Profile,
    ) -> Result<MatchAnalysis> {
        let request = CompletionRequest::new(prompts::match_prompt(job, company_info))
            .with_system(prompts::match_system(profile))
            .with_max_tokens(1400)
            .with_temperature(0.2);

        let completion = self.client.execute(TaskKind::Analysis, &request).await?;

        // Shape-tolerant parse: flatten object-form skill arrays before the
        // strict decode so a slightly creative response still lands.
        let json = extract_json_from_response(&completion.text)
            .ok_or_else(|| anyhow!("no JSON in analysis response"))?;
        let mut value: serde_json::Value =
            serde_json::from_str(&json).context("analysis response is not valid JSON")?;
        if let Some(map) = value.as_object_mut() {
            for key in ["matchedSkills", "missingSkills"] {
                if let Some(raw) = map.get(key).cloned() {
                    if raw.as_array().map(|a| a.iter().any(|v| v.is_object())).unwrap_or(false) {
                        warn!(
                            category = "ai",
                            key, "Analysis returned object-form skills, flattening"
                        );
                        map.insert(key.to_string(), serde_json::json!(Self::normalize_skills(&raw)));
                    }
                }
            }
        }

        Self::parse(&value.to_string())
    }
}
