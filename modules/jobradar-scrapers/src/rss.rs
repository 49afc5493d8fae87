//! RSS/Atom adapter. Feed items with thin descriptions are enriched from
//! their detail pages.

use async_trait::async_trait;
use feed_rs::parser;
use tracing::info;

use jobradar_common::{
    sanitize_company_name, sanitize_html_description, sanitize_title, JobPosting, RssSourceConfig,
};

use crate::enrich::enrich_from_detail;
use crate::error::{Result, ScrapeError};
use crate::fetch::HttpFetcher;
use crate::Scraper;

/// Descriptions shorter than this are worth a detail fetch.
const THIN_DESCRIPTION_LEN: usize = 120;

pub struct RssScraper {
    config: RssSourceConfig,
    company_name: String,
    company_website: String,
    fetcher: HttpFetcher,
}

impl RssScraper {
    pub fn new(
        config: RssSourceConfig,
        company_name: impl Into<String>,
        company_website: impl Into<String>,
        fetcher: HttpFetcher,
    ) -> Self {
        Self {
            config,
            company_name: company_name.into(),
            company_website: company_website.into(),
            fetcher,
        }
    }

    fn parse_feed(&self, body: &str) -> Result<Vec<JobPosting>> {
        let feed = parser::parse(body.as_bytes())
            .map_err(|e| ScrapeError::config(&self.config.url, format!("feed parse error: {e}")))?;

        let mut jobs = Vec::with_capacity(feed.entries.len());
        for entry in feed.entries {
            let Some(title) = entry.title.as_ref().map(|t| t.content.clone()) else {
                continue;
            };
            let Some(link) = entry.links.first().map(|l| l.href.clone()) else {
                continue;
            };

            let description = entry
                .summary
                .as_ref()
                .map(|s| s.content.clone())
                .or_else(|| {
                    entry
                        .content
                        .as_ref()
                        .and_then(|c| c.body.clone())
                })
                .unwrap_or_default();

            let posted_date = entry
                .published
                .or(entry.updated)
                .map(|d| d.to_rfc3339());

            jobs.push(JobPosting {
                title: sanitize_title(&title),
                company: sanitize_company_name(&self.company_name),
                company_website: self.company_website.clone(),
                location: String::new(),
                description: sanitize_html_description(&description),
                url: link,
                posted_date,
                salary: None,
            });
        }
        Ok(jobs)
    }
}

#[async_trait]
impl Scraper for RssScraper {
    fn name(&self) -> &str {
        "rss"
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>> {
        let body = self.fetcher.get_text(&self.config.url).await?;
        let mut jobs = self.parse_feed(&body)?;

        for job in &mut jobs {
            if job.description.len() < THIN_DESCRIPTION_LEN {
                enrich_from_detail(&self.fetcher, job).await;
            }
        }

        info!(
            category = "scrape",
            url = %self.config.url,
            jobs = jobs.len(),
            "RSS feed scraped"
        );
        Ok(jobs)
    }
}
