//! ATS API adapters. Each known provider maps a URL shape to a JSON
//! endpoint and field layout; one engine drives them all. Workday needs
//! POST pagination and lives in its own module.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use jobradar_common::{
    sanitize_company_name, sanitize_html_description, sanitize_title, JobPosting,
};

use crate::error::{Result, ScrapeError};
use crate::fetch::HttpFetcher;
use crate::json_path::{lookup, lookup_string};
use crate::Scraper;

/// Field layout of a provider's listing endpoint, as dotted JSON paths.
/// Empty string means the provider does not expose the field.
#[derive(Debug)]
pub struct AtsProvider {
    pub name: &'static str,
    /// URL template with a `{slug}` placeholder.
    pub api_url: &'static str,
    /// Path to the array of job records; empty when the root is the array.
    pub response_path: &'static str,
    pub aggregator_domain: &'static str,
    pub title: &'static str,
    pub url: &'static str,
    pub location: &'static str,
    pub description: &'static str,
    pub posted_date: &'static str,
}

pub const ATS_PROVIDERS: &[AtsProvider] = &[
    AtsProvider {
        name: "greenhouse",
        api_url: "https://boards-api.greenhouse.io/v1/boards/{slug}/jobs?content=true",
        response_path: "jobs",
        aggregator_domain: "greenhouse.io",
        title: "title",
        url: "absolute_url",
        location: "location.name",
        description: "content",
        posted_date: "updated_at",
    },
    AtsProvider {
        name: "lever",
        api_url: "https://api.lever.co/v0/postings/{slug}?mode=json",
        response_path: "",
        aggregator_domain: "lever.co",
        title: "text",
        url: "hostedUrl",
        location: "categories.location",
        description: "descriptionPlain",
        posted_date: "createdAt",
    },
    AtsProvider {
        name: "ashby",
        api_url: "https://api.ashbyhq.com/posting-api/job-board/{slug}",
        response_path: "jobs",
        aggregator_domain: "ashbyhq.com",
        title: "title",
        url: "jobUrl",
        location: "location",
        description: "descriptionHtml",
        posted_date: "",
    },
    AtsProvider {
        name: "smartrecruiters",
        api_url: "https://api.smartrecruiters.com/v1/companies/{slug}/postings",
        response_path: "content",
        aggregator_domain: "smartrecruiters.com",
        title: "name",
        url: "ref",
        location: "location.city",
        description: "jobAd.sections.companyDescription.text",
        posted_date: "releasedDate",
    },
    AtsProvider {
        name: "recruitee",
        api_url: "https://{slug}.recruitee.com/api/offers",
        response_path: "offers",
        aggregator_domain: "recruitee.com",
        title: "title",
        url: "careers_url",
        location: "location",
        description: "description",
        posted_date: "created_at",
    },
    AtsProvider {
        name: "breezy",
        api_url: "https://{slug}.breezy.hr/json",
        response_path: "",
        aggregator_domain: "breezy.hr",
        title: "name",
        url: "url",
        location: "location.name",
        description: "description",
        posted_date: "published_date",
    },
    AtsProvider {
        name: "workable",
        api_url: "https://apply.workable.com/api/v1/widget/accounts/{slug}",
        response_path: "jobs",
        aggregator_domain: "workable.com",
        title: "title",
        url: "url",
        location: "location.city",
        description: "description",
        posted_date: "published_on",
    },
];

pub fn provider_by_name(name: &str) -> Option<&'static AtsProvider> {
    ATS_PROVIDERS.iter().find(|p| p.name == name)
}

/// Scraper for one company board on a known ATS provider.
#[derive(Debug)]
pub struct AtsScraper {
    provider: &'static AtsProvider,
    slug: String,
    company_name: String,
    company_website: String,
    fetcher: HttpFetcher,
}

impl AtsScraper {
    pub fn new(
        provider_name: &str,
        slug: impl Into<String>,
        company_name: impl Into<String>,
        company_website: impl Into<String>,
        fetcher: HttpFetcher,
    ) -> Result<Self> {
        let provider = provider_by_name(provider_name).ok_or_else(|| {
            ScrapeError::config(provider_name, format!("unknown ATS provider: {provider_name}"))
        })?;
        Ok(Self {
            provider,
            slug: slug.into(),
            company_name: company_name.into(),
            company_website: company_website.into(),
            fetcher,
        })
    }

    pub fn api_url(&self) -> String {
        self.provider.api_url.replace("{slug}", &self.slug)
    }

    fn parse_job(&self, record: &Value) -> Option<JobPosting> {
        let p = self.provider;

        let title = lookup_string(record, p.title)?;
        let mut url = lookup_string(record, p.url).unwrap_or_default();

        // Greenhouse: prefer the canonical boards URL so the same posting
        // always dedupes to one key.
        if p.name == "greenhouse" {
            if let Some(id) = lookup_string(record, "id") {
                url = format!("https://boards.greenhouse.io/{}/jobs/{}", self.slug, id);
            }
        }
        if url.is_empty() {
            return None;
        }

        let location = if p.location.is_empty() {
            "Unknown".to_string()
        } else {
            lookup_string(record, p.location).unwrap_or_else(|| "Unknown".to_string())
        };
        let description = if p.description.is_empty() {
            String::new()
        } else {
            lookup_string(record, p.description).unwrap_or_default()
        };
        let posted_date = if p.posted_date.is_empty() {
            None
        } else {
            lookup_string(record, p.posted_date)
        };

        Some(JobPosting {
            title: sanitize_title(&title),
            company: sanitize_company_name(&self.company_name),
            company_website: self.company_website.clone(),
            location,
            description: sanitize_html_description(&description),
            url,
            posted_date,
            salary: None,
        })
    }

    /// SmartRecruiters listing rows omit the job ad body; the detail API
    /// has it.
    async fn enrich_smartrecruiters(&self, record: &Value, job: &mut JobPosting) {
        let Some(id) = lookup_string(record, "id") else {
            return;
        };
        let detail_url = format!(
            "https://api.smartrecruiters.com/v1/companies/{}/postings/{}",
            self.slug, id
        );
        match self.fetcher.get_json(&detail_url).await {
            Ok(detail) => {
                let mut parts = Vec::new();
                if let Some(sections) = lookup(&detail, "jobAd.sections").and_then(|v| v.as_object())
                {
                    for section in sections.values() {
                        if let Some(text) = section.get("text").and_then(|v| v.as_str()) {
                            parts.push(text.to_string());
                        }
                    }
                }
                if !parts.is_empty() {
                    job.description = sanitize_html_description(&parts.join("\n\n"));
                }
            }
            Err(e) => warn!(
                category = "scrape",
                url = %detail_url,
                error = %e,
                "SmartRecruiters detail fetch failed, keeping listing fields"
            ),
        }
    }
}

#[async_trait]
impl Scraper for AtsScraper {
    fn name(&self) -> &str {
        self.provider.name
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>> {
        let url = self.api_url();
        info!(
            category = "scrape",
            provider = self.provider.name,
            slug = %self.slug,
            "Fetching ATS board"
        );

        let response = self.fetcher.get_json(&url).await?;
        let records = lookup(&response, self.provider.response_path)
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                ScrapeError::config(
                    &url,
                    format!("response path '{}' is not an array", self.provider.response_path),
                )
            })?;

        let mut jobs = Vec::with_capacity(records.len());
        for record in records {
            let Some(mut job) = self.parse_job(record) else {
                continue;
            };
            if self.provider.name == "smartrecruiters" && job.description.len() < 80 {
                self.enrich_smartrecruiters(record, &mut job).await;
            }
            jobs.push(job);
        }

        info!(
            category = "scrape",
            provider = self.provider.name,
            slug = %self.slug,
            jobs = jobs.len(),
            "ATS board scraped"
        );
        Ok(jobs)
    }
}
