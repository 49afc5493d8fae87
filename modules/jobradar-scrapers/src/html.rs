//! Generic HTML adapter: configured CSS selectors over a static fetch or a
//! rendered page. Selectors accept the `selector@attr` form to read an
//! attribute instead of element text.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use renderer_client::{RenderRequest, RenderStatus, RendererClient};
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};

use jobradar_common::{
    sanitize_company_name, sanitize_html_description, sanitize_title, HtmlSourceConfig, JobPosting,
};

use crate::detect::{detect_protection, ProtectionKind};
use crate::enrich::{enrich_from_detail, extract_jsonld_listing};
use crate::error::{Result, ScrapeError};
use crate::fetch::HttpFetcher;
use crate::Scraper;

/// A `selector@attr` field spec split into its parts.
fn split_field_spec(spec: &str) -> (&str, Option<&str>) {
    match spec.rsplit_once('@') {
        Some((selector, attr)) if !selector.is_empty() => (selector, Some(attr)),
        _ => (spec, None),
    }
}

fn parse_selector(url: &str, spec: &str) -> Result<Selector> {
    Selector::parse(spec).map_err(|e| ScrapeError::config(url, format!("bad selector '{spec}': {e}")))
}

fn extract_field(element: ElementRef<'_>, url: &str, spec: &str) -> Result<Option<String>> {
    let (selector_str, attr) = split_field_spec(spec);
    let selector = parse_selector(url, selector_str)?;
    let Some(target) = element.select(&selector).next() else {
        return Ok(None);
    };
    let value = match attr {
        Some(attr) => target.value().attr(attr).map(String::from),
        None => Some(target.text().collect::<String>()),
    };
    Ok(value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()))
}

/// Selector hints for zero-match diagnostics: classes and ids on the page
/// that look job-related.
fn job_like_selector_hints(document: &Html) -> Vec<String> {
    const HINT_WORDS: &[&str] = &["job", "career", "position", "opening", "vacanc", "posting"];
    let mut hints = BTreeSet::new();

    let all = Selector::parse("[class], [id]").expect("static selector");
    for element in document.select(&all) {
        if let Some(id) = element.value().id() {
            if HINT_WORDS.iter().any(|w| id.to_lowercase().contains(w)) {
                hints.insert(format!("#{id}"));
            }
        }
        for class in element.value().classes() {
            if HINT_WORDS.iter().any(|w| class.to_lowercase().contains(w)) {
                hints.insert(format!(".{class}"));
            }
        }
        if hints.len() >= 8 {
            break;
        }
    }
    hints.into_iter().collect()
}

fn page_title(document: &Html) -> String {
    Selector::parse("title")
        .ok()
        .and_then(|sel| {
            document
                .select(&sel)
                .next()
                .map(|t| t.text().collect::<String>().trim().to_string())
        })
        .unwrap_or_default()
}

pub struct GenericHtmlScraper {
    config: HtmlSourceConfig,
    company_name: String,
    company_website: String,
    fetcher: HttpFetcher,
    renderer: Option<Arc<RendererClient>>,
}

impl GenericHtmlScraper {
    pub fn new(
        config: HtmlSourceConfig,
        company_name: impl Into<String>,
        company_website: impl Into<String>,
        fetcher: HttpFetcher,
        renderer: Option<Arc<RendererClient>>,
    ) -> Self {
        Self {
            config,
            company_name: company_name.into(),
            company_website: company_website.into(),
            fetcher,
            renderer,
        }
    }

    async fn fetch_html(&self) -> Result<String> {
        let url = &self.config.url;

        let html = if self.config.requires_js {
            let renderer = self.renderer.as_ref().ok_or_else(|| {
                ScrapeError::config(url, "source requires JS rendering but no renderer is configured")
            })?;

            let request = match &self.config.render_wait_for {
                Some(wait_for) => RenderRequest::builder()
                    .url(url.clone())
                    .wait_for_selector(wait_for.clone())
                    .build(),
                None => RenderRequest::builder().url(url.clone()).build(),
            };
            let result = renderer
                .render(&request)
                .await
                .map_err(|e| ScrapeError::transient(url, format!("renderer: {e}")))?;

            match result.status {
                RenderStatus::Ok | RenderStatus::Partial => result.html,
                RenderStatus::Timeout if result.has_content() => result.html,
                RenderStatus::Timeout => {
                    return Err(ScrapeError::transient(url, "render timed out with no content"))
                }
                RenderStatus::Error => {
                    return Err(ScrapeError::transient(
                        url,
                        format!("render failed: {}", result.errors.join("; ")),
                    ))
                }
            }
        } else {
            self.fetcher.get_text(url).await?
        };

        // Challenge and login pages come back as HTTP 200; the markers are
        // the only tell.
        match detect_protection(&html) {
            Some(ProtectionKind::Bot) => Err(ScrapeError::BotProtection {
                url: url.clone(),
                message: "challenge markers in page content".to_string(),
            }),
            Some(ProtectionKind::Auth) => Err(ScrapeError::Auth {
                url: url.clone(),
                message: "login wall in page content".to_string(),
            }),
            None => Ok(html),
        }
    }

    fn resolve_url(&self, href: &str) -> String {
        if href.starts_with("http://") || href.starts_with("https://") {
            return href.to_string();
        }
        let base = self.config.base_url.as_deref().unwrap_or(&self.config.url);
        match url::Url::parse(base).and_then(|b| b.join(href)) {
            Ok(resolved) => resolved.to_string(),
            Err(_) => href.to_string(),
        }
    }

    /// Parse a fetched page into job records. Synchronous: the parsed DOM
    /// never crosses an await point.
    fn parse_listing(&self, html: &str) -> Result<Vec<JobPosting>> {
        let url = &self.config.url;
        let document = Html::parse_document(html);
        let job_selector = parse_selector(url, &self.config.job_selector)?;

        let elements: Vec<ElementRef<'_>> = document.select(&job_selector).collect();
        if elements.is_empty() {
            warn!(
                category = "scrape",
                action = "zero_selector_matches",
                url = %url,
                job_selector = %self.config.job_selector,
                page_title = %page_title(&document),
                found_selectors = ?job_like_selector_hints(&document),
                "Configured selector matched nothing"
            );
            // Structured-data fallback: a silently broken selector should
            // not lose postings the page still declares in JSON-LD. Only
            // runs when the selector matched nothing at all.
            let fallback = extract_jsonld_listing(html, &self.company_name, &self.company_website);
            if !fallback.is_empty() {
                info!(
                    category = "scrape",
                    action = "jsonld_listing_fallback",
                    url = %url,
                    jobs = fallback.len(),
                    "Recovered postings from JSON-LD"
                );
                return Ok(fallback
                    .into_iter()
                    .map(|mut job| {
                        job.url = self.resolve_url(&job.url);
                        job
                    })
                    .collect());
            }
            return Ok(Vec::new());
        }

        let mut jobs = Vec::new();
        let mut extraction_failures = 0usize;
        for element in &elements {
            let title = extract_field(*element, url, &self.config.fields.title)?;
            let href = extract_field(*element, url, &self.config.fields.url)?;
            let (Some(title), Some(href)) = (title, href) else {
                extraction_failures += 1;
                continue;
            };

            let description = match &self.config.fields.description {
                Some(spec) => extract_field(*element, url, spec)?.unwrap_or_default(),
                None => String::new(),
            };
            let location = match &self.config.fields.location {
                Some(spec) => extract_field(*element, url, spec)?.unwrap_or_default(),
                None => String::new(),
            };
            let posted_date = match &self.config.fields.posted_date {
                Some(spec) => extract_field(*element, url, spec)?,
                None => None,
            };

            jobs.push(JobPosting {
                title: sanitize_title(&title),
                company: sanitize_company_name(&self.company_name),
                company_website: self.company_website.clone(),
                location,
                description: sanitize_html_description(&description),
                url: self.resolve_url(&href),
                posted_date,
                salary: None,
            });
        }

        if jobs.is_empty() && extraction_failures > 0 {
            warn!(
                category = "scrape",
                action = "field_extraction_failed",
                url = %url,
                matched_elements = elements.len(),
                "Job selector matched but no element yielded title and url"
            );
        }
        Ok(jobs)
    }

    fn should_enrich(&self, job: &JobPosting) -> bool {
        self.config.follow_detail && job.description.len() < 80
    }
}

#[async_trait]
impl Scraper for GenericHtmlScraper {
    fn name(&self) -> &str {
        "html"
    }

    async fn scrape(&self) -> Result<Vec<JobPosting>> {
        let html = self.fetch_html().await?;
        let mut jobs = self.parse_listing(&html)?;

        for job in &mut jobs {
            if self.should_enrich(job) {
                enrich_from_detail(&self.fetcher, job).await;
            }
        }

        info!(
            category = "scrape",
            url = %self.config.url,
            jobs = jobs.len(),
            rendered = self.config.requires_js,
            "HTML source scraped"
        );
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobradar_common::HtmlFieldSelectors;

    fn scraper(job_selector: &str, title: &str, url_spec: &str) -> GenericHtmlScraper {
        GenericHtmlScraper::new(
            HtmlSourceConfig {
                url: "https://example.com/careers".into(),
                job_selector: job_selector.into(),
                requires_js: false,
                render_wait_for: None,
                follow_detail: false,
                fields: HtmlFieldSelectors {
                    title: title.into(),
                    url: url_spec.into(),
                    description: Some(".desc".into()),
                    location: Some(".loc".into()),
                    posted_date: None,
                },
                base_url: None,
            },
            "Acme",
            "https://acme.example",
            HttpFetcher::new(),
            None,
        )
    }

    #[test]
    fn parses_cards_and_resolves_relative_urls() {
        let html = r#"
            <div class="job-card">
                <h2>Senior Engineer</h2>
                <a href="/jobs/1">Apply</a>
                <span class="desc">Build things</span>
                <span class="loc">Remote</span>
            </div>
            <div class="job-card">
                <h2>Staff Engineer</h2>
                <a href="https://other.example/jobs/2">Apply</a>
            </div>
        "#;
        let jobs = scraper(".job-card", "h2", "a@href").parse_listing(html).unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].url, "https://example.com/jobs/1");
        assert_eq!(jobs[0].location, "Remote");
        assert_eq!(jobs[1].url, "https://other.example/jobs/2");
    }

    #[test]
    fn zero_matches_yields_empty_not_error() {
        let html = r#"
            <html><head><title>Acme Corp - Careers</title></head><body>
            <div class="job-listing"><a href="/job/1">Engineer</a></div>
            </body></html>
        "#;
        let jobs = scraper(".nonexistent", "h2", "a@href").parse_listing(html).unwrap();
        assert!(jobs.is_empty());
    }

    #[test]
    fn jsonld_listing_fallback_extracts_jobs_on_zero_matches() {
        let html = r#"
            <html><head><title>Careers</title></head><body>
            <script type="application/ld+json">
            [{"@type": "JobPosting", "title": "Engineer",
              "url": "https://example.com/job/1",
              "hiringOrganization": {"name": "Acme"},
              "description": "Build things",
              "jobLocation": {"address": {"addressLocality": "NYC", "addressRegion": "NY"}}},
             {"@type": "JobPosting", "title": "Designer",
              "url": "/job/2",
              "hiringOrganization": {"name": "Acme"},
              "description": "Design things"}]
            </script>
            </body></html>
        "#;
        let jobs = scraper(".nonexistent-selector", ".title", "a@href")
            .parse_listing(html)
            .unwrap();
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].title, "Engineer");
        assert_eq!(jobs[0].url, "https://example.com/job/1");
        assert_eq!(jobs[0].location, "NYC, NY");
        assert_eq!(jobs[1].title, "Designer");
        // Relative JSON-LD URLs resolve against the page URL.
        assert_eq!(jobs[1].url, "https://example.com/job/2");
    }

    #[test]
    fn jsonld_fallback_skipped_when_selector_matches() {
        let html = r#"
            <div class="job-card"><h2>Engineer</h2><a href="/job/1">Apply</a></div>
            <div class="job-card"><h2>Designer</h2><a href="/job/2">Apply</a></div>
            <script type="application/ld+json">
            [{"@type": "JobPosting", "title": "JSON-LD Job",
              "url": "https://example.com/jsonld-job"}]
            </script>
        "#;
        let jobs = scraper(".job-card", "h2", "a@href").parse_listing(html).unwrap();
        assert_eq!(jobs.len(), 2);
        assert!(jobs.iter().all(|j| j.title != "JSON-LD Job"));
        assert!(jobs.iter().all(|j| j.url != "https://example.com/jsonld-job"));
    }

    #[test]
    fn elements_without_required_fields_are_skipped() {
        let html = r#"<div class="job-card"><span class="name">Engineer</span></div>"#;
        let jobs = scraper(".job-card", ".wrong-title", ".wrong-url@href")
            .parse_listing(html)
            .unwrap();
        assert!(jobs.is_empty());
    }

    #[test]
    fn bad_selector_is_config_error() {
        let err = scraper("[[[", "h2", "a@href").parse_listing("<div/>").unwrap_err();
        assert!(matches!(err, ScrapeError::Config { .. }));
    }

    #[test]
    fn field_spec_splitting() {
        assert_eq!(split_field_spec("a@href"), ("a", Some("href")));
        assert_eq!(split_field_spec("h2"), ("h2", None));
        assert_eq!(split_field_spec("[data-x=y]@data-id"), ("[data-x=y]", Some("data-id")));
    }

    #[test]
    fn hint_collection_finds_job_classes() {
        let document = Html::parse_document(
            r#"<div class="job-listing"></div><div id="careers-list"></div><div class="nav"></div>"#,
        );
        let hints = job_like_selector_hints(&document);
        assert!(hints.contains(&".job-listing".to_string()));
        assert!(hints.contains(&"#careers-list".to_string()));
        assert!(!hints.contains(&".nav".to_string()));
    }
}
