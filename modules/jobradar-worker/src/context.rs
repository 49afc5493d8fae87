//! Shared adapters for the pipeline processors. One value, built once at
//! worker start and passed explicitly; no globals.

use std::sync::Arc;

use renderer_client::RendererClient;

use jobradar_common::{Profile, SourceConfig};
use jobradar_scrapers::{build_scraper, HttpFetcher, ScrapeError, Scraper};
use jobradar_store::{
    CompaniesStore, PublishedStore, QueueStore, SettingsStore, SourcesStore,
};

use crate::ai::{CompanyInfoAgent, Extractor, Matcher, SourceAnalyst};

/// Seam for adapter construction, so processors and the runner can be
/// exercised with scripted scrapers.
pub trait ScraperFactory: Send + Sync {
    fn build(
        &self,
        config: &SourceConfig,
        company_name: &str,
        company_website: &str,
    ) -> Result<Box<dyn Scraper>, ScrapeError>;
}

pub struct DefaultScraperFactory {
    pub fetcher: HttpFetcher,
    pub renderer: Option<Arc<RendererClient>>,
}

impl ScraperFactory for DefaultScraperFactory {
    fn build(
        &self,
        config: &SourceConfig,
        company_name: &str,
        company_website: &str,
    ) -> Result<Box<dyn Scraper>, ScrapeError> {
        build_scraper(
            config,
            company_name,
            company_website,
            self.fetcher.clone(),
            self.renderer.clone(),
        )
    }
}

#[derive(Clone)]
pub struct ProcessorContext {
    pub queue: QueueStore,
    pub sources: SourcesStore,
    pub companies: CompaniesStore,
    pub published: Arc<dyn PublishedStore>,
    pub settings: SettingsStore,

    pub extractor: Arc<dyn Extractor>,
    pub matcher: Arc<dyn Matcher>,
    pub company_info: Arc<dyn CompanyInfoAgent>,
    pub source_analyst: Arc<dyn SourceAnalyst>,

    pub scrapers: Arc<dyn ScraperFactory>,
    pub fetcher: HttpFetcher,
    pub renderer: Option<Arc<RendererClient>>,
    pub profile: Profile,
}
