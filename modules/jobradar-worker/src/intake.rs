//! Queue ingest for scraped job records: cheap title gate, dedup by
//! normalised URL, JOB item creation. Duplicate-URL errors are expected
//! during concurrent scraping and counted rather than raised.

use std::collections::HashSet;

use tracing::{debug, info};
use uuid::Uuid;

use jobradar_common::{normalize_url, JobPosting, QueueItem};
use jobradar_filters::{title_allowed, PrefilterPolicy};
use jobradar_store::{QueueStore, StoreError};

#[derive(Debug, Default, Clone, Copy)]
pub struct IntakeStats {
    pub submitted: usize,
    pub queued: usize,
    pub duplicates: usize,
    pub title_filtered: usize,
}

pub struct ScraperIntake {
    queue: QueueStore,
}

impl ScraperIntake {
    pub fn new(queue: QueueStore) -> Self {
        Self { queue }
    }

    /// Create JOB items for the surviving records of one scrape run.
    pub async fn ingest(
        &self,
        jobs: &[JobPosting],
        source_name: &str,
        source_id: Option<Uuid>,
        title_policy: &PrefilterPolicy,
    ) -> anyhow::Result<IntakeStats> {
        let mut stats = IntakeStats {
            submitted: jobs.len(),
            ..Default::default()
        };
        let mut seen: HashSet<String> = HashSet::new();

        for job in jobs {
            if !job.is_complete() {
                continue;
            }
            if !title_allowed(&job.title, title_policy) {
                stats.title_filtered += 1;
                continue;
            }

            let normalized = normalize_url(&job.url);
            if !seen.insert(normalized.clone()) {
                stats.duplicates += 1;
                continue;
            }

            let mut item = QueueItem::job(normalized);
            item.company_name = Some(job.company.clone()).filter(|s| !s.is_empty());
            item.source = Some(source_name.to_string());
            item.source_id = source_id;
            item.scraped_data = Some(serde_json::to_value(job)?);
            item.submitted_by = Some("scrape_runner".to_string());

            match self.queue.add_item(&item).await {
                Ok(_) => stats.queued += 1,
                Err(StoreError::DuplicateQueueItem(url)) => {
                    debug!(category = "queue", url = %url, "Duplicate job URL during intake");
                    stats.duplicates += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            category = "scrape",
            action = "intake_complete",
            source = source_name,
            submitted = stats.submitted,
            queued = stats.queued,
            duplicates = stats.duplicates,
            title_filtered = stats.title_filtered,
            "Scraper intake complete"
        );
        Ok(stats)
    }
}
