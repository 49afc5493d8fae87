//! The COMPANY pipeline: fetch → extract → analyse → save. Fetches the
//! company website, extracts structured facts, classifies tier and
//! priority, and writes the normalised record the JOB analyse stage reads.

use anyhow::{anyhow, Context, Result};
use tracing::info;

use jobradar_common::sanitize::sanitize_text_truncated;
use jobradar_common::{
    Company, CompanySize, CompanyStage, CompanyTier, PipelineState, QueueItem, QueueStatus,
};

use crate::ai::CompanyExtraction;
use crate::context::ProcessorContext;

/// Page text cap fed to company extraction.
const PAGE_TEXT_CAP: usize = 20_000;

const PAGE_TEXT_KEY: &str = "company_page_text";
const EXTRACTION_KEY: &str = "company_extraction";

pub struct CompanyProcessor {
    ctx: ProcessorContext,
}

impl CompanyProcessor {
    pub fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }

    pub async fn process(&self, item: &QueueItem) -> Result<()> {
        let stage = item
            .company_sub_task
            .ok_or_else(|| anyhow!("company item without sub-task"))?;
        info!(
            category = "pipeline",
            action = "company_stage",
            item_id = %item.id,
            stage = %stage,
            company = item.company_name.as_deref().unwrap_or(""),
            "Running company stage"
        );

        match stage {
            CompanyStage::Fetch => self.stage_fetch(item).await,
            CompanyStage::Extract => self.stage_extract(item).await,
            CompanyStage::Analyze => self.stage_analyze(item).await,
            CompanyStage::Save => self.stage_save(item).await,
        }
    }

    async fn advance(
        &self,
        item: &QueueItem,
        next: CompanyStage,
        state: PipelineState,
    ) -> Result<()> {
        self.ctx
            .queue
            .spawn_next_pipeline_step(item, next, Some(state))
            .await?;
        Ok(())
    }

    fn company_name(item: &QueueItem) -> Result<&str> {
        item.company_name
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| anyhow!("company item without company_name"))
    }

    async fn website_for(&self, item: &QueueItem) -> Result<Option<String>> {
        let from_url = item
            .url
            .as_deref()
            .filter(|u| u.starts_with("http"))
            .map(String::from);
        if from_url.is_some() {
            return Ok(from_url);
        }
        let name = Self::company_name(item)?;
        Ok(self
            .ctx
            .companies
            .get_by_name(name)
            .await?
            .and_then(|c| c.website))
    }

    // --- fetch ---

    async fn stage_fetch(&self, item: &QueueItem) -> Result<()> {
        let name = Self::company_name(item)?;
        let website = self
            .website_for(item)
            .await?
            .ok_or_else(|| anyhow!("no website known for company '{name}'"))?;

        let html = self
            .ctx
            .fetcher
            .get_text(&website)
            .await
            .map_err(|e| anyhow!("company page fetch failed: {e}"))?;
        let text = sanitize_text_truncated(&html, PAGE_TEXT_CAP);

        let mut state = item.state();
        state
            .extra
            .insert(PAGE_TEXT_KEY.to_string(), serde_json::json!(text));
        self.advance(item, CompanyStage::Extract, state).await
    }

    // --- extract ---

    async fn stage_extract(&self, item: &QueueItem) -> Result<()> {
        let name = Self::company_name(item)?;
        let mut state = item.state();
        let page_text = state
            .extra
            .get(PAGE_TEXT_KEY)
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("extract stage reached without fetched page text"))?
            .to_string();

        let extraction = self
            .ctx
            .company_info
            .extract_company(name, &page_text)
            .await?;

        state.extra.insert(
            EXTRACTION_KEY.to_string(),
            serde_json::to_value(&extraction)?,
        );
        state.extra.remove(PAGE_TEXT_KEY);
        self.advance(item, CompanyStage::Analyze, state).await
    }

    fn extraction_from_state(state: &PipelineState) -> Result<CompanyExtraction> {
        let raw = state
            .extra
            .get(EXTRACTION_KEY)
            .cloned()
            .ok_or_else(|| anyhow!("analyse stage reached without extraction"))?;
        serde_json::from_value(raw).context("malformed company extraction in state")
    }

    // --- analyse ---

    async fn stage_analyze(&self, item: &QueueItem) -> Result<()> {
        let mut state = item.state();
        let extraction = Self::extraction_from_state(&state)?;

        let (tier, priority) = classify_company(&extraction);
        state
            .extra
            .insert("company_tier".to_string(), serde_json::json!(tier.to_string()));
        state
            .extra
            .insert("company_priority".to_string(), serde_json::json!(priority));

        self.advance(item, CompanyStage::Save, state).await
    }

    // --- save ---

    async fn stage_save(&self, item: &QueueItem) -> Result<()> {
        let name = Self::company_name(item)?;
        let state = item.state();
        let extraction = Self::extraction_from_state(&state)?;

        let tier = state
            .extra
            .get("company_tier")
            .and_then(|v| v.as_str())
            .and_then(|s| s.parse::<CompanyTier>().ok())
            .unwrap_or(CompanyTier::D);
        let priority = state
            .extra
            .get("company_priority")
            .and_then(|v| v.as_i64())
            .unwrap_or(0) as i32;

        let mut company = self
            .ctx
            .companies
            .get_by_name(name)
            .await?
            .unwrap_or_else(|| Company::new(name));

        company.website = self.website_for(item).await?.or(company.website);
        company.about = extraction.about.clone().or(company.about);
        company.culture = extraction.culture.clone().or(company.culture);
        company.mission = extraction.mission.clone().or(company.mission);
        if !extraction.tech_stack.is_empty() {
            company.tech_stack = extraction.tech_stack.clone();
        }
        company.size = extraction.size.or(company.size);
        company.has_portland_office = extraction.has_portland_office || company.has_portland_office;
        company.tier = tier;
        company.priority_score = priority;

        let company_id = self.ctx.companies.save(&company).await?;
        self.ctx
            .queue
            .update_status(
                item.id,
                QueueStatus::Success,
                Some(&format!("Company {name} saved ({company_id}, tier {tier})")),
                None,
            )
            .await?;
        Ok(())
    }
}

/// Deterministic tier/priority classification from extracted facts.
fn classify_company(extraction: &CompanyExtraction) -> (CompanyTier, i32) {
    let mut priority: i32 = 0;

    let about_len = extraction.about.as_deref().map(str::len).unwrap_or(0);
    let culture_len = extraction.culture.as_deref().map(str::len).unwrap_or(0);
    if about_len >= 100 {
        priority += 10;
    }
    if culture_len >= 100 {
        priority += 10;
    }
    if extraction.mission.is_some() {
        priority += 5;
    }
    priority += (extraction.tech_stack.len() as i32).min(10) * 2;
    if extraction.has_portland_office {
        priority += 15;
    }
    if matches!(
        extraction.size,
        Some(CompanySize::Medium) | Some(CompanySize::Large)
    ) {
        priority += 5;
    }

    let tier = match priority {
        p if p >= 50 => CompanyTier::S,
        p if p >= 40 => CompanyTier::A,
        p if p >= 25 => CompanyTier::B,
        p if p >= 15 => CompanyTier::C,
        _ => CompanyTier::D,
    };
    (tier, priority)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rich_extraction_ranks_high() {
        let extraction = CompanyExtraction {
            about: Some("a".repeat(200)),
            culture: Some("c".repeat(200)),
            mission: Some("Make widgets".into()),
            tech_stack: vec!["rust".into(), "postgres".into(), "react".into()],
            size: Some(CompanySize::Medium),
            has_portland_office: true,
        };
        let (tier, priority) = classify_company(&extraction);
        assert_eq!(tier, CompanyTier::S);
        assert!(priority >= 50);
    }

    #[test]
    fn empty_extraction_ranks_d() {
        let (tier, priority) = classify_company(&CompanyExtraction::default());
        assert_eq!(tier, CompanyTier::D);
        assert_eq!(priority, 0);
    }
}
