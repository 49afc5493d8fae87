use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Source status ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Active,
    Disabled,
    Failed,
}

impl std::fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceStatus::Active => write!(f, "active"),
            SourceStatus::Disabled => write!(f, "disabled"),
            SourceStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for SourceStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "disabled" => Ok(Self::Disabled),
            "failed" => Ok(Self::Failed),
            other => Err(format!("unknown SourceStatus: {other}")),
        }
    }
}

// --- Adapter configuration ---

/// Pagination settings for paged listing endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Pagination {
    #[serde(rename = "type")]
    pub kind: PaginationKind,
    pub param: String,
    pub page_size: u32,
    pub max_pages: u32,
    #[serde(default)]
    pub page_start: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaginationKind {
    Offset,
    PageNum,
}

/// CSS selectors for the generic HTML adapter. Selectors accept the
/// `selector@attr` form to read an attribute instead of text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HtmlFieldSelectors {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
}

/// Dotted JSON paths for the generic API adapter.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiFieldPaths {
    pub title: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HtmlSourceConfig {
    pub url: String,
    pub job_selector: String,
    #[serde(default)]
    pub requires_js: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_wait_for: Option<String>,
    /// Follow each row's link to a detail page when the listing is thin.
    #[serde(default)]
    pub follow_detail: bool,
    pub fields: HtmlFieldSelectors,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiSourceConfig {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_body: Option<serde_json::Value>,
    /// Dotted path to the array of job records; empty string means the
    /// response root is the array.
    #[serde(default)]
    pub response_path: String,
    pub fields: ApiFieldPaths,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RssSourceConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkdaySourceConfig {
    /// Tenant slug, e.g. "acme" in acme.wd5.myworkdayjobs.com.
    pub tenant: String,
    /// Workday data-center subdomain, e.g. "wd5".
    pub subdomain: String,
    /// Board name, e.g. "External" or "careers".
    pub board: String,
}

/// Type-specific adapter configuration, tagged by `type` on the wire so it
/// matches the stored source documents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    Html(HtmlSourceConfig),
    Api(ApiSourceConfig),
    Rss(RssSourceConfig),
    Greenhouse { board_token: String },
    Lever { slug: String },
    Ashby { slug: String },
    Smartrecruiters { slug: String },
    Recruitee { slug: String },
    Breezy { slug: String },
    Workable { slug: String },
    Workday(WorkdaySourceConfig),
}

impl SourceConfig {
    pub fn source_type(&self) -> &'static str {
        match self {
            SourceConfig::Html(_) => "html",
            SourceConfig::Api(_) => "api",
            SourceConfig::Rss(_) => "rss",
            SourceConfig::Greenhouse { .. } => "greenhouse",
            SourceConfig::Lever { .. } => "lever",
            SourceConfig::Ashby { .. } => "ashby",
            SourceConfig::Smartrecruiters { .. } => "smartrecruiters",
            SourceConfig::Recruitee { .. } => "recruitee",
            SourceConfig::Breezy { .. } => "breezy",
            SourceConfig::Workable { .. } => "workable",
            SourceConfig::Workday(_) => "workday",
        }
    }

    /// The URL the adapter will hit, when the config names one directly.
    pub fn url(&self) -> Option<&str> {
        match self {
            SourceConfig::Html(c) => Some(&c.url),
            SourceConfig::Api(c) => Some(&c.url),
            SourceConfig::Rss(c) => Some(&c.url),
            _ => None,
        }
    }

    /// True when zero-job runs should be treated as a rendering regression
    /// worth handing to source recovery.
    pub fn is_js_rendered_html(&self) -> bool {
        matches!(self, SourceConfig::Html(c) if c.requires_js)
    }
}

// --- Source row ---

/// A scraping target. A source is single-company iff `company_id` is set and
/// `aggregator_domain` is empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: Uuid,
    pub name: String,
    pub config: SourceConfig,
    pub status: SourceStatus,
    pub company_id: Option<Uuid>,
    pub aggregator_domain: Option<String>,
    pub last_scraped_at: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub consecutive_zero_jobs: u32,
    pub disabled_notes: Option<String>,
    pub disabled_tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Source {
    pub fn new(name: impl Into<String>, config: SourceConfig) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            config,
            status: SourceStatus::Active,
            company_id: None,
            aggregator_domain: None,
            last_scraped_at: None,
            consecutive_failures: 0,
            consecutive_zero_jobs: 0,
            disabled_notes: None,
            disabled_tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_single_company(&self) -> bool {
        self.company_id.is_some() && self.aggregator_domain.is_none()
    }

    pub fn source_type(&self) -> &'static str {
        self.config.source_type()
    }
}
