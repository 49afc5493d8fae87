//! Shared test harness: in-memory stores, scripted agents, and scripted
//! scrapers so pipeline behaviour can be driven without a network or a
//! model.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use jobradar_common::{
    Company, JobExtraction, JobPosting, MatchAnalysis, Profile, QueueItem, Seniority, SourceConfig,
    WorkArrangement,
};
use jobradar_filters::FilterConfig;
use jobradar_scrapers::{HttpFetcher, ScrapeError, Scraper};
use jobradar_store::{
    connect_in_memory, CompaniesStore, NoopNotifier, QueueStore, SettingsStore, SourcesStore,
    SqlitePublishedStore,
};
use jobradar_worker::ai::{
    CompanyExtraction, CompanyInfoAgent, ExtractionInput, Extractor, Matcher, SourceAnalyst,
    SourceClassification, UrlClassification,
};
use jobradar_worker::context::ScraperFactory;
use jobradar_worker::{Dispatcher, ProcessorContext};

// --- Scripted agents ---

pub struct ScriptedExtractor;

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(&self, _input: &ExtractionInput) -> Result<JobExtraction> {
        Ok(strong_extraction())
    }

    async fn repair(&self, _input: &ExtractionInput, _missing: &[&str]) -> Result<JobExtraction> {
        Ok(strong_extraction())
    }
}

pub fn strong_extraction() -> JobExtraction {
    JobExtraction {
        seniority: Seniority::Senior,
        work_arrangement: WorkArrangement::Remote,
        timezone: Some(-8.0),
        salary_min: Some(150_000),
        salary_max: Some(180_000),
        experience_min: Some(5),
        experience_max: Some(10),
        technologies: vec!["rust".into(), "postgres".into()],
        employment_type: jobradar_common::EmploymentType::FullTime,
        days_old: Some(2),
        ..Default::default()
    }
    .normalized()
}

pub struct ScriptedMatcher {
    pub calls: Mutex<u32>,
}

impl ScriptedMatcher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(0),
        })
    }
}

#[async_trait]
impl Matcher for ScriptedMatcher {
    async fn analyze(
        &self,
        _job: &JobPosting,
        _company_info: &str,
        _profile: &Profile,
    ) -> Result<MatchAnalysis> {
        *self.calls.lock().unwrap() += 1;
        Ok(MatchAnalysis {
            matched_skills: vec!["rust".into()],
            missing_skills: vec!["kubernetes".into()],
            experience_match: "Strong backend overlap".into(),
            key_strengths: vec!["queueing systems".into()],
            potential_concerns: vec![],
            customization_recommendations: serde_json::json!({}),
        })
    }
}

pub struct ScriptedCompanyInfo;

#[async_trait]
impl CompanyInfoAgent for ScriptedCompanyInfo {
    async fn extract_company(&self, _name: &str, _page_text: &str) -> Result<CompanyExtraction> {
        Ok(CompanyExtraction {
            about: Some("a".repeat(120)),
            culture: Some("c".repeat(120)),
            mission: Some("Build useful things".into()),
            tech_stack: vec!["rust".into()],
            size: None,
            has_portland_office: false,
        })
    }
}

pub struct ScriptedAnalyst {
    pub proposal: Mutex<Option<SourceConfig>>,
}

impl ScriptedAnalyst {
    pub fn new(proposal: Option<SourceConfig>) -> Arc<Self> {
        Arc::new(Self {
            proposal: Mutex::new(proposal),
        })
    }
}

#[async_trait]
impl SourceAnalyst for ScriptedAnalyst {
    async fn classify_url(&self, _url: &str, _sample: &str) -> Result<SourceClassification> {
        Ok(SourceClassification {
            kind: UrlClassification::CompanySite,
            reason: "scripted".into(),
            aggregator_domain: None,
        })
    }

    async fn propose_config(
        &self,
        _current: &SourceConfig,
        _sample: &str,
        _notes: Option<&str>,
    ) -> Result<SourceConfig> {
        self.proposal
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow::anyhow!("no scripted proposal"))
    }
}

// --- Scripted scrapers ---

#[derive(Clone)]
pub enum ScrapeOutcome {
    Jobs(Vec<JobPosting>),
    Transient { retry_after: Option<u64> },
    ConfigError,
    Auth,
    Bot,
    ProtectedApi,
}

impl ScrapeOutcome {
    fn into_result(self, name: &str) -> std::result::Result<Vec<JobPosting>, ScrapeError> {
        let url = format!("https://{name}.example");
        match self {
            ScrapeOutcome::Jobs(jobs) => Ok(jobs),
            ScrapeOutcome::Transient { retry_after } => Err(ScrapeError::Transient {
                url,
                message: "HTTP 503".into(),
                retry_after,
            }),
            ScrapeOutcome::ConfigError => Err(ScrapeError::Config {
                url,
                message: "HTTP 422".into(),
            }),
            ScrapeOutcome::Auth => Err(ScrapeError::Auth {
                url,
                message: "Login required".into(),
            }),
            ScrapeOutcome::Bot => Err(ScrapeError::BotProtection {
                url,
                message: "cf-browser-verification in content".into(),
            }),
            ScrapeOutcome::ProtectedApi => Err(ScrapeError::ProtectedApi {
                url,
                message: "API requires token".into(),
            }),
        }
    }
}

struct ScriptedScraper {
    name: String,
    outcome: ScrapeOutcome,
}

#[async_trait]
impl Scraper for ScriptedScraper {
    fn name(&self) -> &str {
        &self.name
    }

    async fn scrape(&self) -> std::result::Result<Vec<JobPosting>, ScrapeError> {
        self.outcome.clone().into_result(&self.name)
    }
}

/// Scraper factory that pops scripted outcomes per source name. An
/// exhausted script yields an empty job list.
pub struct ScriptedFactory {
    scripts: Mutex<HashMap<String, VecDeque<ScrapeOutcome>>>,
}

impl ScriptedFactory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(HashMap::new()),
        })
    }

    pub fn script(&self, source_name: &str, outcomes: Vec<ScrapeOutcome>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(source_name.to_string())
            .or_default()
            .extend(outcomes);
    }
}

impl ScraperFactory for ScriptedFactory {
    fn build(
        &self,
        _config: &SourceConfig,
        company_name: &str,
        _company_website: &str,
    ) -> std::result::Result<Box<dyn Scraper>, ScrapeError> {
        let outcome = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(company_name)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(ScrapeOutcome::Jobs(Vec::new()));
        Ok(Box::new(ScriptedScraper {
            name: company_name.to_string(),
            outcome,
        }))
    }
}

// --- Harness assembly ---

pub struct Harness {
    pub ctx: ProcessorContext,
    pub dispatcher: Dispatcher,
    pub matcher: Arc<ScriptedMatcher>,
    pub analyst: Arc<ScriptedAnalyst>,
    pub factory: Arc<ScriptedFactory>,
}

pub async fn harness() -> Harness {
    let pool = connect_in_memory().await.unwrap();
    let queue = QueueStore::new(pool.clone(), Arc::new(NoopNotifier));
    let sources = SourcesStore::new(pool.clone());
    let companies = CompaniesStore::new(pool.clone());
    let published = Arc::new(SqlitePublishedStore::new(pool.clone()));
    let settings = SettingsStore::new(pool);

    // Permissive filters; deterministic scoring does the gating.
    settings.set("filters", &FilterConfig::default()).await.unwrap();

    let matcher = ScriptedMatcher::new();
    let analyst = ScriptedAnalyst::new(None);
    let factory = ScriptedFactory::new();

    let profile = Profile {
        name: "Test User".into(),
        skills: vec!["rust".into(), "postgres".into()],
        years_experience: 8,
        timezone: -8.0,
        target_salary: Some(150_000),
        ..Default::default()
    };

    let ctx = ProcessorContext {
        queue,
        sources,
        companies,
        published,
        settings,
        extractor: Arc::new(ScriptedExtractor),
        matcher: matcher.clone(),
        company_info: Arc::new(ScriptedCompanyInfo),
        source_analyst: analyst.clone(),
        scrapers: factory.clone(),
        fetcher: HttpFetcher::new(),
        renderer: None,
        profile,
    };

    Harness {
        dispatcher: Dispatcher::new(ctx.clone()),
        ctx,
        matcher,
        analyst,
        factory,
    }
}

/// Drain the queue: poll and dispatch until nothing is pending or the
/// iteration cap trips.
pub async fn drain(h: &Harness, max_cycles: usize) {
    for _ in 0..max_cycles {
        let items = h.ctx.queue.get_pending_items(10).await.unwrap();
        if items.is_empty() {
            return;
        }
        for item in &items {
            h.dispatcher.process_item(item).await;
        }
    }
}

pub fn sample_job(url: &str) -> JobPosting {
    JobPosting {
        title: "Senior Software Engineer".into(),
        company: "Acme".into(),
        company_website: "https://acme.example".into(),
        location: "Remote - USA".into(),
        description: "Build durable queue and pipeline systems in Rust.".repeat(5),
        url: url.into(),
        posted_date: None,
        salary: Some("$160,000 - $180,000".into()),
    }
}

pub fn seeded_job_item(url: &str, company: &str) -> QueueItem {
    let mut item = QueueItem::job(url);
    item.company_name = Some(company.into());
    item.scraped_data = Some(serde_json::to_value(sample_job(url)).unwrap());
    item
}

pub async fn seed_good_company(h: &Harness, name: &str) -> Company {
    let mut company = Company::new(name);
    company.about = Some("About text ".repeat(20));
    company.culture = Some("Culture text ".repeat(20));
    company.website = Some("https://acme.example".into());
    h.ctx.companies.save(&company).await.unwrap();
    h.ctx.companies.get_by_name(name).await.unwrap().unwrap()
}
