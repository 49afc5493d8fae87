//! The scrape runner: source rotation, per-source strike bookkeeping,
//! rate-limit awareness, and queue ingest of surviving jobs.
//!
//! This strike system is distinct from the per-job filter strikes: it
//! counts consecutive source failures and disables adapters, it never
//! judges postings.

use anyhow::Result;
use tracing::{info, warn};

use jobradar_common::{QueueItem, QueueItemKind, ScrapeRunConfig, Source};
use jobradar_scrapers::ScrapeError;

use crate::context::ProcessorContext;
use crate::intake::ScraperIntake;

/// Consecutive transient/config failures before a source is disabled.
pub const TRANSIENT_FAILURE_THRESHOLD: u32 = 3;

/// Consecutive zero-job runs of a JS-rendered HTML source before one
/// SOURCE_RECOVER item is spawned.
pub const ZERO_JOBS_RECOVERY_THRESHOLD: u32 = 3;

#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub sources_scraped: usize,
    pub jobs_found: usize,
    pub jobs_queued: usize,
    pub duplicates_skipped: usize,
    pub errors: Vec<String>,
}

pub struct ScrapeRunner {
    ctx: ProcessorContext,
    intake: ScraperIntake,
}

impl ScrapeRunner {
    pub fn new(ctx: ProcessorContext) -> Self {
        let intake = ScraperIntake::new(ctx.queue.clone());
        Self { ctx, intake }
    }

    /// Run over eligible sources under the given constraints. `None` on a
    /// limit means unlimited.
    pub async fn run(&self, config: &ScrapeRunConfig) -> Result<RunStats> {
        let mut stats = RunStats::default();

        let mut sources = self.ctx.sources.get_active_sources().await?;
        if let Some(ids) = &config.source_ids {
            sources.retain(|s| ids.contains(&s.id));
        }
        if let Some(max) = config.max_sources {
            sources.truncate(max as usize);
        }

        info!(
            category = "scrape",
            action = "run_started",
            sources = sources.len(),
            target_matches = ?config.target_matches,
            "Starting scrape run"
        );

        let filter_config: jobradar_filters::FilterConfig =
            self.ctx.settings.get("filters").await?.unwrap_or_default();

        for source in &sources {
            if let Some(target) = config.target_matches {
                if stats.jobs_queued as u32 >= target {
                    info!(
                        category = "scrape",
                        action = "target_reached",
                        queued = stats.jobs_queued,
                        "Target matches reached, stopping run"
                    );
                    break;
                }
            }

            match self.scrape_source(source, &filter_config.prefilter).await {
                Ok((found, queued, duplicates)) => {
                    stats.sources_scraped += 1;
                    stats.jobs_found += found;
                    stats.jobs_queued += queued;
                    stats.duplicates_skipped += duplicates;
                }
                Err(e) => {
                    stats.errors.push(format!("{}: {e}", source.name));
                    self.handle_scrape_error(source, &e).await?;
                }
            }
        }

        info!(
            category = "scrape",
            action = "run_complete",
            sources_scraped = stats.sources_scraped,
            jobs_found = stats.jobs_found,
            jobs_queued = stats.jobs_queued,
            errors = stats.errors.len(),
            "Scrape run complete"
        );
        Ok(stats)
    }

    async fn scrape_source(
        &self,
        source: &Source,
        title_policy: &jobradar_filters::PrefilterPolicy,
    ) -> std::result::Result<(usize, usize, usize), ScrapeError> {
        let scraper = self.ctx.scrapers.build(&source.config, &source.name, "")?;

        let jobs = scraper.scrape().await?;
        let found = jobs.len();

        // Bookkeeping on success. A zero-job success is still a success for
        // the failure counter, but JS-rendered sources that keep coming back
        // empty get handed to recovery.
        self.ctx
            .sources
            .record_scrape_success(source.id, found as u32)
            .await
            .map_err(storage_to_scrape_error)?;

        if found == 0 && source.config.is_js_rendered_html() {
            let count = self
                .ctx
                .sources
                .increment_zero_jobs(source.id)
                .await
                .map_err(storage_to_scrape_error)?;
            if count == ZERO_JOBS_RECOVERY_THRESHOLD {
                self.spawn_recovery(source).await;
            }
            return Ok((0, 0, 0));
        }

        let intake_stats = self
            .intake
            .ingest(&jobs, &source.name, Some(source.id), title_policy)
            .await
            .map_err(|e| ScrapeError::transient(source.name.clone(), e.to_string()))?;

        Ok((found, intake_stats.queued, intake_stats.duplicates))
    }

    /// The per-source strike table. Classification comes straight from the
    /// scrape error taxonomy.
    async fn handle_scrape_error(&self, source: &Source, error: &ScrapeError) -> Result<()> {
        match error {
            // Rate limited with Retry-After: a deferred no-op. No strike,
            // no success stamp.
            ScrapeError::Transient {
                retry_after: Some(seconds),
                ..
            } => {
                info!(
                    category = "scrape",
                    action = "rate_limited",
                    source = %source.name,
                    retry_after = seconds,
                    "Source rate limited, deferring without a strike"
                );
                self.ctx
                    .sources
                    .record_deferred_error(source.id, &error.to_string())
                    .await?;
            }

            // Transient/config/not-found: the three-strike system.
            ScrapeError::Transient { .. } | ScrapeError::Config { .. } | ScrapeError::NotFound { .. } => {
                let count = self
                    .ctx
                    .sources
                    .record_failure(source.id, &error.to_string())
                    .await?;
                warn!(
                    category = "scrape",
                    action = "source_strike",
                    source = %source.name,
                    consecutive_failures = count,
                    error = %error,
                    "Recoverable scrape failure"
                );
                if count >= TRANSIENT_FAILURE_THRESHOLD {
                    self.ctx
                        .sources
                        .disable_source(
                            source.id,
                            &format!("Disabled after {count} consecutive failures: {error}"),
                            &["strike_threshold"],
                        )
                        .await?;
                }
            }

            // Permanent conditions disable immediately with a triage tag.
            ScrapeError::Auth { .. } => {
                self.ctx
                    .sources
                    .disable_source(
                        source.id,
                        &format!("Authentication required: {error}"),
                        &["auth_required"],
                    )
                    .await?;
            }
            ScrapeError::ProtectedApi { .. } => {
                self.ctx
                    .sources
                    .disable_source(
                        source.id,
                        &format!("Protected API: {error}"),
                        &["protected_api"],
                    )
                    .await?;
            }
            ScrapeError::BotProtection { .. } => {
                self.ctx
                    .sources
                    .disable_source(
                        source.id,
                        &format!("Bot protection: {error}"),
                        &["anti_bot"],
                    )
                    .await?;
            }
        }
        Ok(())
    }

    /// Spawn exactly one SOURCE_RECOVER item when the zero-jobs threshold
    /// is crossed. The counter keeps climbing on later runs, so the
    /// equality check above never fires twice.
    async fn spawn_recovery(&self, source: &Source) {
        let mut item = QueueItem::new(QueueItemKind::SourceRecover);
        item.source_id = Some(source.id);
        item.source = Some(source.name.clone());
        item.url = source.config.url().map(|u| format!("recover://{u}"));
        item.submitted_by = Some("scrape_runner".to_string());

        match self.ctx.queue.add_item(&item).await {
            Ok(id) => info!(
                category = "scrape",
                action = "recovery_spawned",
                source = %source.name,
                item_id = %id,
                "Spawned source recovery"
            ),
            Err(jobradar_store::StoreError::DuplicateQueueItem(_)) => {
                // A recovery item for this source is already queued.
            }
            Err(e) => warn!(
                category = "scrape",
                source = %source.name,
                error = %e,
                "Failed to spawn source recovery"
            ),
        }
    }
}

fn storage_to_scrape_error(e: jobradar_store::StoreError) -> ScrapeError {
    ScrapeError::transient(String::new(), e.to_string())
}
