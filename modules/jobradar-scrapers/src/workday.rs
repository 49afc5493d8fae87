//! Workday adapter. Unlike the other ATS providers, Workday's listing
//! endpoint is a POST with offset pagination, the tenant appears as a
//! subdomain, and job descriptions only exist on the CXS detail API. The
//! persisted job URL stays the human-readable board URL; only the detail
//! fetch is rewritten to the CXS path.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;
use tracing::{info, warn};

use jobradar_common::{
    sanitize_company_name, sanitize_html_description, sanitize_title, JobPosting,
    WorkdaySourceConfig,
};

use crate::error::{Result, ScrapeError};
use crate::fetch::HttpFetcher;
use crate::json_path::lookup_string;
use crate::Scraper;

const PAGE_SIZE: u64 = 20;
const MAX_PAGES: u64 = 20;

pub struct WorkdayScraper {
    config: WorkdaySourceConfig,
    company_name: String,
    company_website: String,
    fetcher: HttpFetcher,
}

impl WorkdayScraper {
    pub fn new(
        config: WorkdaySourceConfig,
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

    fn host(&self) -> String {
        format!(
            "https://{}.{}.myworkdayjobs.com",
            self.config.tenant, self.config.subdomain
        )
    }

    /// CXS listing endpoint for the board.
    pub fn listing_url(&self) -> String {
        format!(
            "{}/wday/cxs/{}/{}/jobs",
            self.host(),
            self.config.tenant,
            self.config.board
        )
    }

    /// Human-readable URL persisted for a posting's `externalPath`.
    pub fn human_url(&self, external_path: &str) -> String {
        format!("{}/{}{}", self.host(), self.config.board, external_path)
    }

    /// CXS detail endpoint for a posting's `externalPath`.
    pub fn detail_url(&self, external_path: &str) -> String {
        format!(
            "{}/wday/cxs/{}/{}{}",
            self.host(),
            self.config.tenant,
            self.config.board,
            external_path
        )
    }

    async fn fetch_page(&self, offset: u64) -> Result<(Vec<JobPosting>, u64)> {
        let url = self.listing_url();
        let body = json!({
            "limit": PAGE_SIZE,
            "offset": offset,
            "searchText": "",
            "appliedFacets": {},
        });

        let response = self
            .fetcher
            .request_json(Method::POST, &url, Some(&body), &[])
            .await?;

        let total = response.get("total").and_then(|v| v.as_u64()).unwrap_or(0);
        let postings = response
            .get("jobPostings")
            .and_then(|v| v.as_array())
            .ok_or_else(|| ScrapeError::config(&url, "missing jobPostings array"))?;

        let mut jobs = Vec::with_capacity(postings.len());
        for posting in postings {
            let Some(title) = lookup_string(posting, "title") else {
                continue;
            };
            let Some(external_path) = lookup_string(posting, "externalPath") else {
                continue;
            };

            let mut job = JobPosting {
                title: sanitize_title(&title),
                company: sanitize_company_name(&self.company_name),
                company_website: self.company_website.clone(),
                location: lookup_string(posting, "locationsText")
                    .unwrap_or_else(|| "Unknown".to_string()),
                description: String::new(),
                url: self.human_url(&external_path),
                posted_date: lookup_string(posting, "postedOnDate"),
                salary: None,
            };

            self.enrich_detail(&external_path, &mut job).await;
            jobs.push(job);
        }
        Ok((jobs, total))
    }

    async fn enrich_detail(&self, external_path: &str, job: &mut JobPosting) {
        let url = self.detail_url(external_path);
        match self.fetcher.get_json(&url).await {
            Ok(detail) => {
                if let Some(description) = lookup_string(&detail, "jobPostingInfo.jobDescription") {
                    job.description = sanitize_html_description(&description);
                }
                if job.location == "Unknown" {
                    if let Some(location) = lookup_string(&detail, "jobPostingInfo.location") {
                        job.location = location;
                    }
                }
                if job.posted_date.is_none() {
                    job.posted_date = lookup_string(&detail, "jobPostingInfo.startDate");
                }
            }
            Err(e) => warn!(
                category = "scrape",
                url = %url,
                error = %e,
                "Workday detail fetch failed, keeping listing fields"
            ),
        }
    }
}

#[async_trait]
impl Scraper for WorkdayScraper {
    fn name(&self) -> &str {
        "workday"
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>> {
        let mut jobs = Vec::new();
        let mut offset = 0;

        for page in 0..MAX_PAGES {
            let (batch, total) = self.fetch_page(offset).await?;
            let batch_len = batch.len() as u64;
            jobs.extend(batch);
            offset += PAGE_SIZE;

            if batch_len == 0 || offset >= total {
                break;
            }
            if page + 1 == MAX_PAGES {
                info!(
                    category = "scrape",
                    tenant = %self.config.tenant,
                    total,
                    "Workday pagination cap reached"
                );
            }
        }

        info!(
            category = "scrape",
            tenant = %self.config.tenant,
            board = %self.config.board,
            jobs = jobs.len(),
            "Workday board scraped"
        );
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scraper() -> WorkdayScraper {
        WorkdayScraper::new(
            WorkdaySourceConfig {
                tenant: "acme".into(),
                subdomain: "wd5".into(),
                board: "External".into(),
            },
            "Acme",
            "https://acme.example",
            HttpFetcher::new(),
        )
    }

    #[test]
    fn url_shapes() {
        let s = scraper();
        assert_eq!(
            s.listing_url(),
            "https://acme.wd5.myworkdayjobs.com/wday/cxs/acme/External/jobs"
        );
        assert_eq!(
            s.human_url("/job/NYC/Engineer_R123"),
            "https://acme.wd5.myworkdayjobs.com/External/job/NYC/Engineer_R123"
        );
        assert_eq!(
            s.detail_url("/job/NYC/Engineer_R123"),
            "https://acme.wd5.myworkdayjobs.com/wday/cxs/acme/External/job/NYC/Engineer_R123"
        );
    }
}
