//! Generic JSON API adapter: configured endpoint, dotted field paths, and
//! offset or page-number pagination with a hard page cap.

use async_trait::async_trait;
use reqwest::Method;
use tracing::info;

use jobradar_common::{
    sanitize_company_name, sanitize_html_description, sanitize_title, ApiSourceConfig, JobPosting,
    PaginationKind,
};

use crate::error::{Result, ScrapeError};
use crate::fetch::HttpFetcher;
use crate::json_path::{lookup, lookup_string};
use crate::Scraper;

pub struct GenericApiScraper {
    config: ApiSourceConfig,
    company_name: String,
    company_website: String,
    fetcher: HttpFetcher,
}

impl GenericApiScraper {
    pub fn new(
        config: ApiSourceConfig,
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

    fn method(&self) -> Result<Method> {
        match self.config.method.as_deref() {
            None | Some("GET") | Some("get") => Ok(Method::GET),
            Some("POST") | Some("post") => Ok(Method::POST),
            Some(other) => Err(ScrapeError::config(
                &self.config.url,
                format!("unsupported method: {other}"),
            )),
        }
    }

    fn page_url(&self, page_index: u32) -> String {
        let Some(pagination) = &self.config.pagination else {
            return self.config.url.clone();
        };

        let value = match pagination.kind {
            PaginationKind::Offset => page_index * pagination.page_size,
            PaginationKind::PageNum => pagination.page_start.unwrap_or(1) + page_index,
        };

        let separator = if self.config.url.contains('?') { '&' } else { '?' };
        format!("{}{}{}={}", self.config.url, separator, pagination.param, value)
    }

    fn resolve_url(&self, raw: &str) -> String {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            return raw.to_string();
        }
        let base = self.config.base_url.as_deref().unwrap_or(&self.config.url);
        match url::Url::parse(base).and_then(|b| b.join(raw)) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => raw.to_string(),
        }
    }

    fn parse_records(&self, response: &serde_json::Value) -> Result<Vec<JobPosting>> {
        let fields = &self.config.fields;
        let records = lookup(response, &self.config.response_path)
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                ScrapeError::config(
                    &self.config.url,
                    format!("response path '{}' is not an array", self.config.response_path),
                )
            })?;

        let mut jobs = Vec::with_capacity(records.len());
        for record in records {
            let Some(title) = lookup_string(record, &fields.title) else {
                continue;
            };
            let Some(raw_url) = lookup_string(record, &fields.url) else {
                continue;
            };

            let description = fields
                .description
                .as_deref()
                .and_then(|p| lookup_string(record, p))
                .unwrap_or_default();

            jobs.push(JobPosting {
                title: sanitize_title(&title),
                company: sanitize_company_name(&self.company_name),
                company_website: self.company_website.clone(),
                location: fields
                    .location
                    .as_deref()
                    .and_then(|p| lookup_string(record, p))
                    .unwrap_or_default(),
                description: sanitize_html_description(&description),
                url: self.resolve_url(&raw_url),
                posted_date: fields
                    .posted_date
                    .as_deref()
                    .and_then(|p| lookup_string(record, p)),
                salary: fields.salary.as_deref().and_then(|p| lookup_string(record, p)),
            });
        }
        Ok(jobs)
    }

    fn headers(&self) -> Vec<(String, String)> {
        self.config
            .headers
            .as_ref()
            .map(|h| h.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Scraper for GenericApiScraper {
    fn name(&self) -> &str {
        "api"
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>> {
        let method = self.method()?;
        let headers = self.headers();
        let max_pages = self
            .config
            .pagination
            .as_ref()
            .map(|p| p.max_pages.max(1))
            .unwrap_or(1);

        let mut jobs = Vec::new();
        for page_index in 0..max_pages {
            let url = self.page_url(page_index);
            let response = self
                .fetcher
                .request_json(method.clone(), &url, self.config.post_body.as_ref(), &headers)
                .await?;

            let batch = self.parse_records(&response)?;
            if batch.is_empty() {
                break;
            }
            let full_page = self
                .config
                .pagination
                .as_ref()
                .map(|p| batch.len() as u32 >= p.page_size)
                .unwrap_or(false);
            jobs.extend(batch);
            if !full_page {
                break;
            }
        }

        info!(
            category = "scrape",
            url = %self.config.url,
            jobs = jobs.len(),
            "API source scraped"
        );
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobradar_common::{ApiFieldPaths, Pagination};

    fn config(pagination: Option<Pagination>) -> ApiSourceConfig {
        ApiSourceConfig {
            url: "https://example.com/api/jobs".into(),
            method: None,
            post_body: None,
            response_path: "data.jobs".into(),
            fields: ApiFieldPaths {
                title: "title".into(),
                url: "link".into(),
                description: Some("body".into()),
                location: Some("office.city".into()),
                posted_date: Some("posted".into()),
                salary: None,
            },
            headers: None,
            pagination,
            base_url: None,
        }
    }

    fn scraper(pagination: Option<Pagination>) -> GenericApiScraper {
        GenericApiScraper::new(config(pagination), "Acme", "", HttpFetcher::new())
    }

    #[test]
    fn offset_and_page_num_urls() {
        let offset = scraper(Some(Pagination {
            kind: PaginationKind::Offset,
            param: "offset".into(),
            page_size: 50,
            max_pages: 4,
            page_start: None,
        }));
        assert_eq!(offset.page_url(0), "https://example.com/api/jobs?offset=0");
        assert_eq!(offset.page_url(2), "https://example.com/api/jobs?offset=100");

        let paged = scraper(Some(Pagination {
            kind: PaginationKind::PageNum,
            param: "page".into(),
            page_size: 25,
            max_pages: 4,
            page_start: Some(1),
        }));
        assert_eq!(paged.page_url(0), "https://example.com/api/jobs?page=1");
        assert_eq!(paged.page_url(3), "https://example.com/api/jobs?page=4");
    }

    #[test]
    fn parses_records_at_response_path() {
        let response = serde_json::json!({
            "data": {"jobs": [
                {"title": "Engineer", "link": "/jobs/1", "body": "<p>Work</p>",
                 "office": {"city": "Portland"}, "posted": "2026-01-15"},
                {"link": "/jobs/2"},
            ]}
        });
        let jobs = scraper(None).parse_records(&response).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].url, "https://example.com/jobs/1");
        assert_eq!(jobs[0].location, "Portland");
        assert_eq!(jobs[0].description, "Work");
    }

    #[test]
    fn wrong_response_path_is_config_error() {
        let response = serde_json::json!({"data": {"jobs": "nope"}});
        let err = scraper(None).parse_records(&response).unwrap_err();
        assert!(matches!(err, ScrapeError::Config { .. }));
    }
}
