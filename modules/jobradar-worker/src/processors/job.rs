//! The JOB pipeline: scrape → prefilter → extract → score → analyse → save.
//! Each stage either advances the item (requeue with new state) or lands it
//! in a terminal status; the item re-enters the poll loop between stages.

use anyhow::{anyhow, Context, Result};
use serde_json::Value;
use tracing::{info, warn};

use jobradar_common::{
    normalize_url, CompanyStage, JobPosting, JobStage, PipelineState, QueueItem, QueueItemKind,
    QueueStatus,
};
use jobradar_filters::{prefilter, FilterConfig, ScoringEngine, StrikeEngine};
use jobradar_scrapers::enrich::apply_detail_html;
use jobradar_store::{MatchLineage, PublishedStore};

use crate::ai::{extract_with_repair, ExtractionInput};
use crate::context::ProcessorContext;

/// How many poll cycles a JOB waits for company enrichment before it
/// proceeds with whatever data exists.
pub const MAX_COMPANY_WAITS: u32 = 3;

/// Unwrap legacy double-nested `{"job_data": {"job_data": {...}}}` payloads
/// until the value is a map containing `title`. Already-flat payloads pass
/// through unchanged.
pub fn unwrap_job_data(mut value: Value) -> Value {
    loop {
        let is_flat = value
            .as_object()
            .map(|map| map.contains_key("title"))
            .unwrap_or(true);
        if is_flat {
            return value;
        }
        match value.get_mut("job_data") {
            Some(inner) => value = inner.take(),
            None => return value,
        }
    }
}

pub struct JobProcessor {
    ctx: ProcessorContext,
}

impl JobProcessor {
    pub fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }

    pub async fn process(&self, item: &QueueItem) -> Result<()> {
        let stage = item.job_stage();
        info!(
            category = "pipeline",
            action = "job_stage",
            item_id = %item.id,
            stage = %stage,
            "Running job stage"
        );

        match stage {
            JobStage::Scrape => self.stage_scrape(item).await,
            JobStage::Prefilter => self.stage_prefilter(item).await,
            JobStage::Extract => self.stage_extract(item).await,
            JobStage::Score => self.stage_score(item).await,
            JobStage::Analyze => self.stage_analyze(item).await,
            JobStage::Save => self.stage_save(item).await,
        }
    }

    async fn advance(&self, item: &QueueItem, mut state: PipelineState, next: JobStage) -> Result<()> {
        state.pipeline_stage = Some(next);
        self.ctx.queue.requeue_with_state(item.id, &state).await?;
        Ok(())
    }

    fn job_from_state(&self, state: &PipelineState) -> Result<JobPosting> {
        let raw = state
            .job_data
            .clone()
            .ok_or_else(|| anyhow!("pipeline state has no job data"))?;
        let job: JobPosting =
            serde_json::from_value(unwrap_job_data(raw)).context("malformed job data payload")?;
        if job.title.is_empty() {
            return Err(anyhow!("job data has no title after unwrapping"));
        }
        Ok(job)
    }

    async fn filter_config(&self) -> Result<FilterConfig> {
        Ok(self.ctx.settings.get("filters").await?.unwrap_or_default())
    }

    // --- Stage 1: scrape ---

    async fn stage_scrape(&self, item: &QueueItem) -> Result<()> {
        let mut state = item.state();

        // Prefer data already on the item (runner intake or resubmission),
        // unwrapping legacy nesting as needed.
        let existing = state.job_data.clone().or_else(|| item.scraped_data.clone());
        let job = match existing {
            Some(raw) => {
                let flat = unwrap_job_data(raw);
                let job: JobPosting =
                    serde_json::from_value(flat).context("malformed scraped_data payload")?;
                if job.title.is_empty() {
                    self.scrape_single(item).await?
                } else {
                    job
                }
            }
            None => self.scrape_single(item).await?,
        };

        state.job_data = Some(serde_json::to_value(&job)?);
        self.advance(item, state, JobStage::Prefilter).await
    }

    /// Targeted scrape of one posting URL. Uses the source's adapter when
    /// the item points at a configured source, else a generic detail fetch
    /// with a JSON-LD fallback.
    async fn scrape_single(&self, item: &QueueItem) -> Result<JobPosting> {
        let url = item
            .url
            .as_deref()
            .ok_or_else(|| anyhow!("job item has no url to scrape"))?;

        if let Some(source_id) = item.source_id {
            if let Some(source) = self.ctx.sources.get_source(source_id).await? {
                let scraper = self
                    .ctx
                    .scrapers
                    .build(
                        &source.config,
                        item.company_name.as_deref().unwrap_or(&source.name),
                        "",
                    )
                    .map_err(|e| anyhow!("scraper init failed: {e}"))?;

                let target = normalize_url(url);
                let jobs = scraper.scrape().await.map_err(|e| anyhow!("scrape failed: {e}"))?;
                if let Some(job) = jobs.into_iter().find(|j| normalize_url(&j.url) == target) {
                    return Ok(job);
                }
                warn!(
                    category = "scrape",
                    url,
                    source = %source.name,
                    "Posting not in source listing, falling back to detail fetch"
                );
            }
        }

        let html = self
            .ctx
            .fetcher
            .get_text(url)
            .await
            .map_err(|e| anyhow!("detail fetch failed: {e}"))?;

        let mut job = JobPosting {
            url: url.to_string(),
            company: item.company_name.clone().unwrap_or_default(),
            ..Default::default()
        };
        apply_detail_html(&html, &mut job);

        if job.title.is_empty() {
            return Err(anyhow!("could not extract a job record from {url}"));
        }
        Ok(job)
    }

    // --- Stage 2: prefilter ---

    async fn stage_prefilter(&self, item: &QueueItem) -> Result<()> {
        let state = item.state();

        // Bypass is a dispatcher-level concern carried on the item; the
        // filter library itself stays bypass-free.
        if state.bypass_prefilter {
            info!(category = "pipeline", item_id = %item.id, "Prefilter bypassed by submitter flag");
            return self.advance(item, state, JobStage::Extract).await;
        }

        let job = self.job_from_state(&state)?;
        let config = self.filter_config().await?;
        let outcome = prefilter(&job, &config.prefilter);

        if !outcome.passed {
            let reason = outcome.reason_summary();
            info!(
                category = "pipeline",
                action = "prefilter_rejected",
                item_id = %item.id,
                reason = %reason,
                "Job filtered before extraction"
            );
            self.ctx
                .queue
                .update_status(item.id, QueueStatus::Filtered, Some(&reason), None)
                .await?;
            return Ok(());
        }

        self.advance(item, state, JobStage::Extract).await
    }

    // --- Stage 3: extract ---

    async fn stage_extract(&self, item: &QueueItem) -> Result<()> {
        let mut state = item.state();
        let job = self.job_from_state(&state)?;
        let ai_settings = self.ctx.settings.ai_settings().await?;

        let input = ExtractionInput::from_job(&job);
        let extraction = extract_with_repair(
            self.ctx.extractor.as_ref(),
            &input,
            ai_settings.extraction_confidence_threshold,
        )
        .await?;

        state.extraction = Some(extraction);
        self.advance(item, state, JobStage::Score).await
    }

    // --- Stage 4: score ---

    async fn stage_score(&self, item: &QueueItem) -> Result<()> {
        let mut state = item.state();
        let job = self.job_from_state(&state)?;
        let extraction = state
            .extraction
            .clone()
            .ok_or_else(|| anyhow!("score stage reached without extraction"))?;

        let config = self.filter_config().await?;
        let ai_settings = self.ctx.settings.ai_settings().await?;

        let strikes =
            StrikeEngine::new(config.strike_engine.clone(), config.technology_ranks.clone())
                .evaluate(&job);
        if !strikes.passed {
            let reason = strikes.reason_summary();
            self.ctx
                .queue
                .update_status(item.id, QueueStatus::Filtered, Some(&reason), None)
                .await?;
            return Ok(());
        }

        let company = self.resolve_company(item).await?;
        let score = ScoringEngine::new(config.scoring.clone()).score(
            &extraction,
            &self.ctx.profile,
            company.as_ref(),
        );

        if score < ai_settings.min_match_score {
            let reason = format!(
                "Score {score} below threshold {}",
                ai_settings.min_match_score
            );
            info!(
                category = "pipeline",
                action = "score_rejected",
                item_id = %item.id,
                score,
                "Job below score threshold"
            );
            self.ctx
                .queue
                .update_status(item.id, QueueStatus::Filtered, Some(&reason), None)
                .await?;
            return Ok(());
        }

        state.deterministic_score = Some(score);
        self.advance(item, state, JobStage::Analyze).await
    }

    // --- Stage 5: analyse ---

    async fn stage_analyze(&self, item: &QueueItem) -> Result<()> {
        let mut state = item.state();
        let job = self.job_from_state(&state)?;
        let ai_settings = self.ctx.settings.ai_settings().await?;

        let company = self.resolve_company(item).await?;
        let good_data = company
            .as_ref()
            .map(|c| c.has_good_data(ai_settings.company_good_data_min_len))
            .unwrap_or(false);

        if !good_data && self.enrichment_applies(item).await? {
            if state.company_wait_count < MAX_COMPANY_WAITS {
                self.request_enrichment(item, &job).await?;
                state.awaiting_company = true;
                state.company_wait_count += 1;
                info!(
                    category = "pipeline",
                    action = "awaiting_company",
                    item_id = %item.id,
                    wait = state.company_wait_count,
                    "Requeued job while company enrichment runs"
                );
                // Stay at analyse; the wait counter bounds the loop.
                return self.advance(item, state, JobStage::Analyze).await;
            }
            warn!(
                category = "pipeline",
                item_id = %item.id,
                waits = state.company_wait_count,
                "Proceeding without complete company data"
            );
        }

        let company_info = company.as_ref().map(|c| c.info_string()).unwrap_or_default();
        let analysis = self
            .ctx
            .matcher
            .analyze(&job, &company_info, &self.ctx.profile)
            .await?;

        state.awaiting_company = false;
        state.match_analysis = Some(analysis);
        self.advance(item, state, JobStage::Save).await
    }

    /// Company enrichment is not applicable for postings that came from an
    /// aggregator source, or when there is no company to enrich.
    async fn enrichment_applies(&self, item: &QueueItem) -> Result<bool> {
        if item.company_name.as_deref().unwrap_or("").is_empty() {
            return Ok(false);
        }
        if let Some(source_id) = item.source_id {
            if let Some(source) = self.ctx.sources.get_source(source_id).await? {
                if source.aggregator_domain.is_some() {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Spawn a COMPANY item for the job's company unless one is already in
    /// flight or recently finished. The job never blocks on the result.
    async fn request_enrichment(&self, item: &QueueItem, job: &JobPosting) -> Result<()> {
        let name = item
            .company_name
            .clone()
            .or_else(|| Some(job.company.clone()).filter(|s| !s.is_empty()))
            .ok_or_else(|| anyhow!("no company name for enrichment"))?;

        if self.ctx.queue.has_active_company_task(&name).await? {
            return Ok(());
        }

        let mut child = QueueItem::new(QueueItemKind::Company);
        child.company_name = Some(name.clone());
        child.company_id = item.company_id;
        child.company_sub_task = Some(CompanyStage::Fetch);
        child.url = Some(job.company_website.clone())
            .filter(|s| !s.is_empty())
            .or_else(|| Some(format!("company://{}", name.to_lowercase().replace(' ', "-"))));
        child.submitted_by = Some("job_processor".to_string());

        match self.ctx.queue.spawn_item_safely(item, child).await {
            Ok(Some(id)) => info!(
                category = "pipeline",
                action = "company_spawned",
                item_id = %item.id,
                company_item = %id,
                company = %name,
                "Spawned company enrichment"
            ),
            Ok(None) => info!(
                category = "pipeline",
                item_id = %item.id,
                company = %name,
                "Company enrichment already queued in this lineage"
            ),
            // A retained company row from another lineage holds the URL;
            // the enrichment it produced is what we would have asked for.
            Err(jobradar_store::StoreError::DuplicateQueueItem(_)) => info!(
                category = "pipeline",
                item_id = %item.id,
                company = %name,
                "Company enrichment already exists in the queue"
            ),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    // --- Stage 6: save ---

    async fn stage_save(&self, item: &QueueItem) -> Result<()> {
        let state = item.state();
        let job = self.job_from_state(&state)?;
        let score = state
            .deterministic_score
            .ok_or_else(|| anyhow!("save stage reached without a score"))?;
        let analysis = state
            .match_analysis
            .clone()
            .ok_or_else(|| anyhow!("save stage reached without analysis"))?;

        let company = self.resolve_company(item).await?;
        let lineage = MatchLineage {
            company_id: company.map(|c| c.id).or(item.company_id),
            queue_item_id: Some(item.id),
            tracking_id: Some(item.tracking_id),
        };

        let match_id = self
            .ctx
            .published
            .save_match(&job, &analysis, score, lineage)
            .await?;

        self.ctx
            .queue
            .update_status(
                item.id,
                QueueStatus::Success,
                Some(&format!("Saved match {match_id} (score {score})")),
                None,
            )
            .await?;
        Ok(())
    }

    async fn resolve_company(&self, item: &QueueItem) -> Result<Option<jobradar_common::Company>> {
        if let Some(company_id) = item.company_id {
            if let Some(company) = self.ctx.companies.get(company_id).await? {
                return Ok(Some(company));
            }
        }
        if let Some(name) = item.company_name.as_deref() {
            return Ok(self.ctx.companies.get_by_name(name).await?);
        }
        Ok(None)
    }
}
