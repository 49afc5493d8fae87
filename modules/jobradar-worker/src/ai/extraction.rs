//! Structured extraction from job postings, with a single repair pass when
//! confidence lands below the configured threshold. Extraction must be
//! idempotent for a given input, so requests run at low temperature.

use std::sync::Arc;

use ai_client::{extract_json_from_response, CompletionRequest, InferenceClient, TaskKind};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tracing::{debug, info, warn};

use jobradar_common::JobExtraction;

use super::prompts;

#[derive(Debug, Clone, Default)]
pub struct ExtractionInput {
    pub title: String,
    pub description: String,
    pub location: Option<String>,
    pub posted_date: Option<String>,
    pub salary: Option<String>,
    pub url: Option<String>,
}

impl ExtractionInput {
    pub fn from_job(job: &jobradar_common::JobPosting) -> Self {
        Self {
            title: job.title.clone(),
            description: job.description.clone(),
            location: Some(job.location.clone()).filter(|s| !s.is_empty()),
            posted_date: job.posted_date.clone(),
            salary: job.salary.clone(),
            url: Some(job.url.clone()).filter(|s| !s.is_empty()),
        }
    }
}

/// One extraction pass plus one targeted repair pass. Kept as two small
/// operations so the repair orchestration is testable without a model.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, input: &ExtractionInput) -> Result<JobExtraction>;
    async fn repair(&self, input: &ExtractionInput, missing: &[&str]) -> Result<JobExtraction>;
}

/// Extract, then issue one repair pass for the missing fields when the
/// confidence is below `threshold`. Merging only fills gaps, so confidence
/// after repair is never lower than before.
pub async fn extract_with_repair(
    extractor: &dyn Extractor,
    input: &ExtractionInput,
    threshold: f64,
) -> Result<JobExtraction> {
    let mut result = extractor.extract(input).await?;
    let initial = result.confidence;
    if initial >= threshold {
        debug!(
            category = "ai",
            confidence = initial,
            threshold,
            "Extraction confidence sufficient, skipping repair"
        );
        return Ok(result);
    }

    let missing = result.missing_fields();
    info!(
        category = "ai",
        confidence = initial,
        threshold,
        missing = ?missing,
        "Extraction confidence low, attempting repair"
    );

    match extractor.repair(input, &missing).await {
        Ok(repaired) => {
            result.merge(&repaired);
            info!(
                category = "ai",
                before = initial,
                after = result.confidence,
                "Extraction repair complete"
            );
        }
        Err(e) => {
            warn!(category = "ai", error = %e, "Extraction repair failed, keeping original");
        }
    }
    Ok(result)
}

// --- Inference-backed implementation ---

pub struct AiExtractor {
    client: Arc<InferenceClient>,
}

impl AiExtractor {
    pub fn new(client: Arc<InferenceClient>) -> Self {
        Self { client }
    }

    fn parse(response: &str) -> Result<JobExtraction> {
        let json = extract_json_from_response(response)
            .ok_or_else(|| anyhow!("no JSON in extraction response: {:.200}", response))?;
        let extraction: JobExtraction =
            serde_json::from_str(&json).context("extraction response did not match schema")?;
        Ok(extraction.normalized())
    }

    async fn run(&self, prompt: String, max_tokens: u32) -> Result<JobExtraction> {
        let request = CompletionRequest::new(prompt)
            .with_system(prompts::extraction_system())
            .with_max_tokens(max_tokens)
            .with_temperature(0.1);
        let completion = self.client.execute(TaskKind::Extraction, &request).await?;
        Self::parse(&completion.text)
    }
}

#[async_trait]
impl Extractor for AiExtractor {
    async fn extract(&self, input: &ExtractionInput) -> Result<JobExtraction> {
        if input.title.is_empty() || input.description.is_empty() {
            return Err(anyhow!("empty title or description provided for extraction"));
        }
        self.run(prompts::extraction_prompt(input), 2048).await
    }

    async fn repair(&self, input: &ExtractionInput, missing: &[&str]) -> Result<JobExtraction> {
        self.run(prompts::repair_prompt(input, missing), 1024).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobradar_common::{Seniority, WorkArrangement};

    struct Scripted {
        first: JobExtraction,
        repair: JobExtraction,
    }

    #[async_trait]
    impl Extractor for Scripted {
        async fn extract(&self, _input: &ExtractionInput) -> Result<JobExtraction> {
            let mut e = self.first.clone();
            e.confidence = e.compute_confidence();
            Ok(e)
        }

        async fn repair(
            &self,
            _input: &ExtractionInput,
            _missing: &[&str],
        ) -> Result<JobExtraction> {
            Ok(self.repair.clone())
        }
    }

    struct FailingRepair;

    #[async_trait]
    impl Extractor for FailingRepair {
        async fn extract(&self, _input: &ExtractionInput) -> Result<JobExtraction> {
            let mut e = JobExtraction {
                seniority: Seniority::Senior,
                ..Default::default()
            };
            e.confidence = e.compute_confidence();
            Ok(e)
        }

        async fn repair(
            &self,
            _input: &ExtractionInput,
            _missing: &[&str],
        ) -> Result<JobExtraction> {
            Err(anyhow!("model unavailable"))
        }
    }

    #[tokio::test]
    async fn repair_raises_confidence_never_lowers() {
        let scripted = Scripted {
            first: JobExtraction {
                seniority: Seniority::Senior,
                salary_min: Some(150_000),
                ..Default::default()
            },
            repair: JobExtraction {
                work_arrangement: WorkArrangement::Remote,
                technologies: vec!["rust".into()],
                timezone: Some(-5.0),
                ..Default::default()
            },
        };

        let input = ExtractionInput::default();
        let before = scripted.extract(&input).await.unwrap().confidence;
        let result = extract_with_repair(&scripted, &input, 0.9).await.unwrap();
        assert!(result.confidence >= before);
        assert_eq!(result.work_arrangement, WorkArrangement::Remote);
        assert_eq!(result.seniority, Seniority::Senior);
    }

    #[tokio::test]
    async fn high_confidence_skips_repair() {
        let scripted = Scripted {
            first: JobExtraction {
                seniority: Seniority::Senior,
                work_arrangement: WorkArrangement::Remote,
                timezone: Some(-8.0),
                salary_min: Some(1),
                employment_type: jobradar_common::EmploymentType::FullTime,
                technologies: vec!["rust".into()],
                ..Default::default()
            },
            repair: JobExtraction {
                seniority: Seniority::Junior,
                ..Default::default()
            },
        };

        let result = extract_with_repair(&scripted, &ExtractionInput::default(), 0.7)
            .await
            .unwrap();
        assert_eq!(result.seniority, Seniority::Senior);
        assert!((result.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn failed_repair_keeps_original() {
        let result = extract_with_repair(&FailingRepair, &ExtractionInput::default(), 0.9)
            .await
            .unwrap();
        assert_eq!(result.seniority, Seniority::Senior);
    }

    #[test]
    fn parse_handles_fenced_json() {
        let response = "```json\n{\"seniority\": \"senior\", \"technologies\": [\" Rust \"]}\n```";
        let extraction = AiExtractor::parse(response).unwrap();
        assert_eq!(extraction.seniority, Seniority::Senior);
        assert_eq!(extraction.technologies, vec!["rust".to_string()]);
    }
}
