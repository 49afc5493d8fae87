//! Scraper adapters. Every adapter produces the same uniform job record;
//! the source's stored config decides which adapter runs.

pub mod api;
pub mod ats;
pub mod detect;
pub mod enrich;
pub mod error;
pub mod fetch;
pub mod html;
pub mod json_path;
pub mod probe;
pub mod rss;
pub mod workday;

pub use api::GenericApiScraper;
pub use ats::{provider_by_name, AtsProvider, AtsScraper, ATS_PROVIDERS};
pub use detect::{detect_protection, ProtectionKind};
pub use error::{Result, ScrapeError};
pub use fetch::HttpFetcher;
pub use html::GenericHtmlScraper;
pub use probe::{AtsProber, DetailedProbeResult, ProbeHit};
pub use rss::RssScraper;
pub use workday::WorkdayScraper;

use std::sync::Arc;

use async_trait::async_trait;
use renderer_client::RendererClient;

use jobradar_common::{JobPosting, SourceConfig};

/// A job-record producer for one configured source.
#[async_trait]
pub trait Scraper: Send + Sync {
    fn name(&self) -> &str;
    async fn scrape(&self) -> Result<Vec<JobPosting>>;
}

/// Instantiate the adapter for a source config. `company_name` and
/// `company_website` flow into every record the adapter emits.
pub fn build_scraper(
    config: &SourceConfig,
    company_name: &str,
    company_website: &str,
    fetcher: HttpFetcher,
    renderer: Option<Arc<RendererClient>>,
) -> Result<Box<dyn Scraper>> {
    let scraper: Box<dyn Scraper> = match config {
        SourceConfig::Html(c) => Box::new(GenericHtmlScraper::new(
            c.clone(),
            company_name,
            company_website,
            fetcher,
            renderer,
        )),
        SourceConfig::Api(c) => Box::new(GenericApiScraper::new(
            c.clone(),
            company_name,
            company_website,
            fetcher,
        )),
        SourceConfig::Rss(c) => Box::new(RssScraper::new(
            c.clone(),
            company_name,
            company_website,
            fetcher,
        )),
        SourceConfig::Greenhouse { board_token } => Box::new(AtsScraper::new(
            "greenhouse",
            board_token.clone(),
            company_name,
            company_website,
            fetcher,
        )?),
        SourceConfig::Lever { slug } => Box::new(AtsScraper::new(
            "lever",
            slug.clone(),
            company_name,
            company_website,
            fetcher,
        )?),
        SourceConfig::Ashby { slug } => Box::new(AtsScraper::new(
            "ashby",
            slug.clone(),
            company_name,
            company_website,
            fetcher,
        )?),
        SourceConfig::Smartrecruiters { slug } => Box::new(AtsScraper::new(
            "smartrecruiters",
            slug.clone(),
            company_name,
            company_website,
            fetcher,
        )?),
        SourceConfig::Recruitee { slug } => Box::new(AtsScraper::new(
            "recruitee",
            slug.clone(),
            company_name,
            company_website,
            fetcher,
        )?),
        SourceConfig::Breezy { slug } => Box::new(AtsScraper::new(
            "breezy",
            slug.clone(),
            company_name,
            company_website,
            fetcher,
        )?),
        SourceConfig::Workable { slug } => Box::new(AtsScraper::new(
            "workable",
            slug.clone(),
            company_name,
            company_website,
            fetcher,
        )?),
        SourceConfig::Workday(c) => Box::new(WorkdayScraper::new(
            c.clone(),
            company_name,
            company_website,
            fetcher,
        )),
    };
    Ok(scraper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_covers_every_config_variant() {
        let fetcher = HttpFetcher::new();
        let configs = [
            serde_json::json!({"type": "rss", "url": "https://x.example/feed"}),
            serde_json::json!({"type": "greenhouse", "board_token": "acme"}),
            serde_json::json!({"type": "lever", "slug": "acme"}),
            serde_json::json!({"type": "workday", "tenant": "acme", "subdomain": "wd5", "board": "External"}),
            serde_json::json!({
                "type": "html",
                "url": "https://x.example/careers",
                "job_selector": ".job",
                "fields": {"title": "h2", "url": "a@href"},
            }),
            serde_json::json!({
                "type": "api",
                "url": "https://x.example/api",
                "response_path": "jobs",
                "fields": {"title": "title", "url": "url"},
            }),
        ];

        for raw in configs {
            let config: SourceConfig = serde_json::from_value(raw.clone()).unwrap();
            let scraper = build_scraper(&config, "Acme", "", fetcher.clone(), None).unwrap();
            assert_eq!(scraper.name(), config.source_type());
        }
    }
}
