//! Pipeline dispatcher: routes queue items by kind and sub-stage, applies
//! the stop-list and duplicate short-circuits, and owns the retry protocol.

use anyhow::{anyhow, Result};
use tracing::{error, info};

use jobradar_common::{extract_domain, QueueItem, QueueItemKind, QueueStatus};
use jobradar_store::{PublishedStore, StopList};

use crate::context::ProcessorContext;
use crate::processors::{CompanyProcessor, JobProcessor, SourceProcessor};
use crate::runner::ScrapeRunner;

pub struct Dispatcher {
    ctx: ProcessorContext,
    jobs: JobProcessor,
    companies: CompanyProcessor,
    sources: SourceProcessor,
}

impl Dispatcher {
    pub fn new(ctx: ProcessorContext) -> Self {
        Self {
            jobs: JobProcessor::new(ctx.clone()),
            companies: CompanyProcessor::new(ctx.clone()),
            sources: SourceProcessor::new(ctx.clone()),
            ctx,
        }
    }

    /// Process one queue item end to end: PROCESSING transition,
    /// short-circuits, kind dispatch, and failure handling with retries.
    pub async fn process_item(&self, item: &QueueItem) {
        if item.id.is_nil() {
            error!(category = "pipeline", "Cannot process item without id");
            return;
        }

        info!(
            category = "pipeline",
            action = "item_started",
            item_id = %item.id,
            kind = %item.kind,
            url = item.url.as_deref().unwrap_or(""),
            "Processing queue item"
        );

        if let Err(e) = self.run(item).await {
            self.handle_failure(item, &e).await;
        }
    }

    async fn run(&self, item: &QueueItem) -> Result<()> {
        self.ctx
            .queue
            .update_status(item.id, QueueStatus::Processing, None, None)
            .await?;

        // Stop-list short-circuit for everything but scrape runs.
        if item.kind != QueueItemKind::Scrape {
            let stop_list = self.ctx.settings.stop_list().await?;
            if let Some(reason) = stop_list_match(item, &stop_list) {
                info!(
                    category = "pipeline",
                    action = "stop_list_skip",
                    item_id = %item.id,
                    reason = %reason,
                    "Skipping item via stop list"
                );
                self.ctx
                    .queue
                    .update_status(item.id, QueueStatus::Skipped, Some(&reason), None)
                    .await?;
                return Ok(());
            }
        }

        // Already-published jobs are done before they start.
        if item.kind == QueueItemKind::Job {
            if let Some(url) = item.url.as_deref() {
                if self.ctx.published.job_exists(url).await? {
                    self.ctx
                        .queue
                        .update_status(
                            item.id,
                            QueueStatus::Skipped,
                            Some("Job already exists in published matches"),
                            None,
                        )
                        .await?;
                    return Ok(());
                }
            }
        }

        match item.kind {
            QueueItemKind::Job => self.jobs.process(item).await,
            QueueItemKind::Company => {
                if item.company_sub_task.is_none() {
                    return Err(anyhow!(
                        "Company items must have company_sub_task set; submit via the company \
                         pipeline which creates granular items"
                    ));
                }
                self.companies.process(item).await
            }
            QueueItemKind::Scrape => {
                let runner = ScrapeRunner::new(self.ctx.clone());
                let config = item.scrape_config.clone().unwrap_or_default();
                let stats = runner.run(&config).await?;
                self.ctx
                    .queue
                    .update_status(
                        item.id,
                        QueueStatus::Success,
                        Some(&format!(
                            "Scraped {} sources, queued {} jobs",
                            stats.sources_scraped, stats.jobs_queued
                        )),
                        None,
                    )
                    .await?;
                Ok(())
            }
            QueueItemKind::SourceDiscovery => self.sources.process_discovery(item).await,
            QueueItemKind::ScrapeSource => self.sources.process_scrape_source(item).await,
            QueueItemKind::SourceRecover => self.sources.process_recover(item).await,
        }
    }

    /// Retry protocol: bump the counter, requeue with context while retries
    /// remain, otherwise land in FAILED with troubleshooting notes.
    async fn handle_failure(&self, item: &QueueItem, error: &anyhow::Error) {
        error!(
            category = "pipeline",
            action = "item_failed",
            item_id = %item.id,
            kind = %item.kind,
            error = %error,
            "Error processing item"
        );

        if let Err(e) = self.ctx.queue.increment_retry(item.id).await {
            error!(category = "queue", item_id = %item.id, error = %e, "Failed to increment retry count");
            return;
        }

        let attempts = item.retry_count + 1;
        let max_retries = item.max_retries;
        let error_context = format!(
            "Queue Item: {}\nType: {}\nURL: {}\nCompany: {}\nRetry Count: {}/{}\n\n",
            item.id,
            item.kind,
            item.url.as_deref().unwrap_or(""),
            item.company_name.as_deref().unwrap_or(""),
            attempts,
            max_retries,
        );

        let result = if attempts < max_retries {
            let message = format!("Processing failed. Will retry ({attempts}/{max_retries})");
            let details = format!(
                "{error_context}Error: {error}\n\nThis item will be automatically retried.\n\n\
                 Error chain:\n{error:#}"
            );
            self.ctx
                .queue
                .update_status(item.id, QueueStatus::Pending, Some(&message), Some(&details))
                .await
        } else {
            let message = format!("Failed after {max_retries} retries: {error}");
            let details = format!(
                "{error_context}Error: {error}\n\n\
                 Max retries ({max_retries}) exceeded. Manual intervention may be required.\n\n\
                 Troubleshooting:\n\
                 1. Check if the URL is still valid\n\
                 2. Review error details below for specific issues\n\
                 3. Verify network connectivity and API credentials\n\
                 4. Check if the source website has changed structure\n\n\
                 Error chain:\n{error:#}"
            );
            self.ctx
                .queue
                .update_status(item.id, QueueStatus::Failed, Some(&message), Some(&details))
                .await
        };

        if let Err(e) = result {
            error!(category = "queue", item_id = %item.id, error = %e, "Failed to record failure status");
        }
    }
}

/// Case-insensitive substring checks against company name, URL, and host.
fn stop_list_match(item: &QueueItem, stop_list: &StopList) -> Option<String> {
    if let Some(company) = item.company_name.as_deref() {
        let company_lower = company.to_lowercase();
        for excluded in &stop_list.excluded_companies {
            if company_lower.contains(&excluded.to_lowercase()) {
                return Some(format!("Excluded by stop list: company '{excluded}'"));
            }
        }
    }

    if let Some(url) = item.url.as_deref() {
        let url_lower = url.to_lowercase();
        for keyword in &stop_list.excluded_keywords {
            if url_lower.contains(&keyword.to_lowercase()) {
                return Some(format!("Excluded by stop list: keyword '{keyword}'"));
            }
        }
        let host = extract_domain(url);
        for domain in &stop_list.excluded_domains {
            if host.contains(&domain.to_lowercase()) {
                return Some(format!("Excluded by stop list: domain '{domain}'"));
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop_list() -> StopList {
        StopList {
            excluded_companies: vec!["Evil Corp".into()],
            excluded_keywords: vec!["/internships/".into()],
            excluded_domains: vec!["spamboard.example".into()],
        }
    }

    #[test]
    fn matches_company_url_and_domain() {
        let mut item = QueueItem::job("https://good.example/jobs/1");
        item.company_name = Some("Evil Corp Holdings".into());
        assert!(stop_list_match(&item, &stop_list()).is_some());

        let item = QueueItem::job("https://good.example/internships/123");
        assert!(stop_list_match(&item, &stop_list()).is_some());

        let item = QueueItem::job("https://jobs.spamboard.example/x");
        assert!(stop_list_match(&item, &stop_list()).is_some());

        let item = QueueItem::job("https://good.example/jobs/1");
        assert!(stop_list_match(&item, &stop_list()).is_none());
    }
}
