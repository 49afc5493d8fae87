//! Source item kinds: discovery (probe + classify a URL into a usable
//! source row), targeted scrape runs, and recovery (AI-proposed config
//! repair for sources that stopped yielding jobs).

use anyhow::{anyhow, Result};
use renderer_client::RenderRequest;
use tracing::{info, warn};

use jobradar_common::{QueueItem, QueueStatus, Source, SourceConfig};
use jobradar_scrapers::{detect_protection, ProtectionKind};

use crate::ai::{validate_proposed_config, UrlClassification};
use crate::context::ProcessorContext;
use crate::runner::ScrapeRunner;

/// Content sample cap fed to the source-analysis agent.
const SAMPLE_CAP: usize = 30_000;

pub struct SourceProcessor {
    ctx: ProcessorContext,
}

impl SourceProcessor {
    pub fn new(ctx: ProcessorContext) -> Self {
        Self { ctx }
    }

    // --- SOURCE_DISCOVERY ---

    pub async fn process_discovery(&self, item: &QueueItem) -> Result<()> {
        let company_name = item
            .company_name
            .as_deref()
            .ok_or_else(|| anyhow!("source discovery needs a company_name"))?;
        let website = item.url.as_deref().filter(|u| u.starts_with("http"));

        // ATS probe first: a hit gives us a working config with no model.
        let prober = jobradar_scrapers::AtsProber::new(self.ctx.fetcher.clone());
        let probe = prober.probe(company_name, website).await;

        if let Some(hit) = probe {
            let mut source = Source::new(format!("{company_name} ({})", hit.provider), hit.config);
            source.aggregator_domain = None;
            if let Some(company) = self.ctx.companies.get_by_name(company_name).await? {
                source.company_id = Some(company.id);
            }
            let source_id = self.ctx.sources.add_source(&source).await?;
            self.ctx
                .queue
                .update_status(
                    item.id,
                    QueueStatus::Success,
                    Some(&format!(
                        "Discovered {} board '{}' with {} jobs (source {source_id})",
                        hit.provider, hit.slug, hit.job_count
                    )),
                    None,
                )
                .await?;
            return Ok(());
        }

        // No ATS: classify the page itself when we have a URL to look at.
        let Some(url) = website else {
            self.ctx
                .queue
                .update_status(
                    item.id,
                    QueueStatus::Failed,
                    Some("No ATS board found and no website to classify"),
                    Some("disable_reason: no_ats_no_website"),
                )
                .await?;
            return Ok(());
        };

        let sample = match self.ctx.fetcher.get_text(url).await {
            Ok(html) => jobradar_common::sanitize::sanitize_text_truncated(&html, SAMPLE_CAP),
            Err(e) => {
                self.ctx
                    .queue
                    .update_status(
                        item.id,
                        QueueStatus::Failed,
                        Some(&format!("Could not fetch {url} for classification")),
                        Some(&format!("disable_reason: fetch_failed\ndisable_notes: {e}")),
                    )
                    .await?;
                return Ok(());
            }
        };

        let classification = self.ctx.source_analyst.classify_url(url, &sample).await?;
        match classification.kind {
            UrlClassification::CompanySite | UrlClassification::Aggregator => {
                let mut source = Source::new(
                    company_name.to_string(),
                    SourceConfig::Html(jobradar_common::HtmlSourceConfig {
                        url: url.to_string(),
                        job_selector: "a[href*='job']".to_string(),
                        requires_js: true,
                        render_wait_for: None,
                        follow_detail: true,
                        fields: jobradar_common::HtmlFieldSelectors {
                            title: "a[href*='job']".to_string(),
                            url: "a[href*='job']@href".to_string(),
                            description: None,
                            location: None,
                            posted_date: None,
                        },
                        base_url: None,
                    }),
                );
                if classification.kind == UrlClassification::Aggregator {
                    source.aggregator_domain = classification
                        .aggregator_domain
                        .clone()
                        .or_else(|| Some(jobradar_common::extract_domain(url)));
                } else if let Some(company) =
                    self.ctx.companies.get_by_name(company_name).await?
                {
                    source.company_id = Some(company.id);
                }
                let source_id = self.ctx.sources.add_source(&source).await?;
                self.ctx
                    .queue
                    .update_status(
                        item.id,
                        QueueStatus::Success,
                        Some(&format!(
                            "Classified as {:?}; created source {source_id}",
                            classification.kind
                        )),
                        None,
                    )
                    .await?;
            }
            other => {
                self.ctx
                    .queue
                    .update_status(
                        item.id,
                        QueueStatus::Failed,
                        Some(&format!("URL not usable as a source: {other:?}")),
                        Some(&format!(
                            "disable_reason: {other:?}\ndisable_notes: {}",
                            classification.reason
                        )),
                    )
                    .await?;
            }
        }
        Ok(())
    }

    // --- SCRAPE_SOURCE ---

    pub async fn process_scrape_source(&self, item: &QueueItem) -> Result<()> {
        let source_id = item
            .source_id
            .ok_or_else(|| anyhow!("scrape_source needs a source_id"))?;

        let runner = ScrapeRunner::new(self.ctx.clone());
        let config = jobradar_common::ScrapeRunConfig {
            source_ids: Some(vec![source_id]),
            ..Default::default()
        };
        let stats = runner.run(&config).await?;

        self.ctx
            .queue
            .update_status(
                item.id,
                QueueStatus::Success,
                Some(&format!(
                    "Source scraped: {} jobs found, {} queued",
                    stats.jobs_found, stats.jobs_queued
                )),
                None,
            )
            .await?;
        Ok(())
    }

    // --- SOURCE_RECOVER ---

    pub async fn process_recover(&self, item: &QueueItem) -> Result<()> {
        let source_id = item
            .source_id
            .ok_or_else(|| anyhow!("source_recover needs a source_id"))?;
        let source = self
            .ctx
            .sources
            .get_source(source_id)
            .await?
            .ok_or_else(|| anyhow!("source {source_id} not found"))?;

        // 1. Content sample: render HTML sources (static fallback), fetch
        //    JSON for API sources.
        let sample = self.fetch_sample(&source).await?;

        // 2. Bot protection short-circuits; there is nothing to repair.
        if detect_protection(&sample) == Some(ProtectionKind::Bot) {
            self.ctx
                .queue
                .update_status(
                    item.id,
                    QueueStatus::Failed,
                    Some("Recovery aborted: bot protection on content sample"),
                    None,
                )
                .await?;
            return Ok(());
        }

        // 3. Ask for a repaired config. The proposal may change the type.
        let proposal = self
            .ctx
            .source_analyst
            .propose_config(&source.config, &sample, source.disabled_notes.as_deref())
            .await?;

        // 4. Validate and probe before committing anything.
        if let Err(e) = validate_proposed_config(&proposal) {
            self.ctx
                .queue
                .update_status(
                    item.id,
                    QueueStatus::Failed,
                    Some(&format!("Proposed config invalid: {e}")),
                    None,
                )
                .await?;
            return Ok(());
        }

        let scraper = self
            .ctx
            .scrapers
            .build(&proposal, &source.name, "")
            .map_err(|e| anyhow!("probe scraper init failed: {e}"))?;

        match scraper.scrape().await {
            Ok(jobs) if !jobs.is_empty() => {
                self.ctx
                    .sources
                    .apply_recovered_config(source_id, &proposal)
                    .await?;
                info!(
                    category = "scrape",
                    action = "source_recovered",
                    source_id = %source_id,
                    new_type = proposal.source_type(),
                    jobs = jobs.len(),
                    "Source recovery succeeded"
                );
                self.ctx
                    .queue
                    .update_status(
                        item.id,
                        QueueStatus::Success,
                        Some(&format!(
                            "Recovered as {} config; probe found {} jobs",
                            proposal.source_type(),
                            jobs.len()
                        )),
                        None,
                    )
                    .await?;
            }
            Ok(_) => {
                self.ctx
                    .queue
                    .update_status(
                        item.id,
                        QueueStatus::Failed,
                        Some("Proposed config probe returned zero jobs; source stays disabled"),
                        None,
                    )
                    .await?;
            }
            Err(e) => {
                warn!(category = "scrape", source_id = %source_id, error = %e, "Recovery probe failed");
                self.ctx
                    .queue
                    .update_status(
                        item.id,
                        QueueStatus::Failed,
                        Some(&format!("Proposed config probe failed: {e}")),
                        None,
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Content sample for the repair agent. Rendering falls back to a
    /// static fetch; a failed fetch yields an empty sample rather than
    /// aborting, since the disable notes alone can carry the repair.
    async fn fetch_sample(&self, source: &Source) -> Result<String> {
        let url = source
            .config
            .url()
            .ok_or_else(|| anyhow!("source config has no URL to sample"))?;

        match &source.config {
            SourceConfig::Html(c) if c.requires_js => {
                if let Some(renderer) = &self.ctx.renderer {
                    let request = RenderRequest::builder().url(url.to_string()).build();
                    match renderer.render(&request).await {
                        Ok(result) if result.has_content() => {
                            return Ok(truncate(&result.html, SAMPLE_CAP))
                        }
                        Ok(_) | Err(_) => {
                            warn!(
                                category = "scrape",
                                url, "Render failed for recovery sample, falling back to static fetch"
                            );
                        }
                    }
                }
                Ok(self.static_sample(url).await)
            }
            SourceConfig::Api(_) => match self.ctx.fetcher.get_json(url).await {
                Ok(json) => Ok(truncate(
                    &serde_json::to_string_pretty(&json).unwrap_or_default(),
                    SAMPLE_CAP,
                )),
                Err(e) => {
                    warn!(category = "scrape", url, error = %e, "API sample fetch failed");
                    Ok(String::new())
                }
            },
            _ => Ok(self.static_sample(url).await),
        }
    }

    async fn static_sample(&self, url: &str) -> String {
        match self.ctx.fetcher.get_text(url).await {
            Ok(body) => truncate(&body, SAMPLE_CAP),
            Err(e) => {
                warn!(category = "scrape", url, error = %e, "Static sample fetch failed");
                String::new()
            }
        }
    }
}

fn truncate(text: &str, cap: usize) -> String {
    if text.len() <= cap {
        return text.to_string();
    }
    let mut end = cap;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text[..end].to_string()
}
