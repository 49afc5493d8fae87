use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::extraction::JobExtraction;
use crate::listing::MatchAnalysis;

// --- Queue item kinds ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueItemKind {
    Job,
    Company,
    Scrape,
    SourceDiscovery,
    ScrapeSource,
    SourceRecover,
}

impl std::fmt::Display for QueueItemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueItemKind::Job => write!(f, "job"),
            QueueItemKind::Company => write!(f, "company"),
            QueueItemKind::Scrape => write!(f, "scrape"),
            QueueItemKind::SourceDiscovery => write!(f, "source_discovery"),
            QueueItemKind::ScrapeSource => write!(f, "scrape_source"),
            QueueItemKind::SourceRecover => write!(f, "source_recover"),
        }
    }
}

impl std::str::FromStr for QueueItemKind {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "job" => Ok(Self::Job),
            "company" => Ok(Self::Company),
            "scrape" => Ok(Self::Scrape),
            "source_discovery" => Ok(Self::SourceDiscovery),
            "scrape_source" => Ok(Self::ScrapeSource),
            "source_recover" => Ok(Self::SourceRecover),
            other => Err(format!("unknown QueueItemKind: {other}")),
        }
    }
}

// --- Queue status ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Processing,
    Success,
    Failed,
    Filtered,
    Skipped,
}

impl QueueStatus {
    /// Terminal statuses set `completed_at` and end the item's lifecycle.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueueStatus::Success | QueueStatus::Failed | QueueStatus::Filtered | QueueStatus::Skipped
        )
    }

    pub const ALL: [QueueStatus; 6] = [
        QueueStatus::Pending,
        QueueStatus::Processing,
        QueueStatus::Success,
        QueueStatus::Failed,
        QueueStatus::Filtered,
        QueueStatus::Skipped,
    ];
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueueStatus::Pending => write!(f, "pending"),
            QueueStatus::Processing => write!(f, "processing"),
            QueueStatus::Success => write!(f, "success"),
            QueueStatus::Failed => write!(f, "failed"),
            QueueStatus::Filtered => write!(f, "filtered"),
            QueueStatus::Skipped => write!(f, "skipped"),
        }
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "filtered" => Ok(Self::Filtered),
            "skipped" => Ok(Self::Skipped),
            other => Err(format!("unknown QueueStatus: {other}")),
        }
    }
}

// --- Pipeline stages ---

/// Stage of the JOB pipeline. Carried in `PipelineState::pipeline_stage`,
/// not on the queue row itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    Scrape,
    Prefilter,
    Extract,
    Score,
    Analyze,
    Save,
}

impl JobStage {
    pub fn next(&self) -> Option<JobStage> {
        match self {
            JobStage::Scrape => Some(JobStage::Prefilter),
            JobStage::Prefilter => Some(JobStage::Extract),
            JobStage::Extract => Some(JobStage::Score),
            JobStage::Score => Some(JobStage::Analyze),
            JobStage::Analyze => Some(JobStage::Save),
            JobStage::Save => None,
        }
    }
}

impl std::fmt::Display for JobStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStage::Scrape => write!(f, "scrape"),
            JobStage::Prefilter => write!(f, "prefilter"),
            JobStage::Extract => write!(f, "extract"),
            JobStage::Score => write!(f, "score"),
            JobStage::Analyze => write!(f, "analyze"),
            JobStage::Save => write!(f, "save"),
        }
    }
}

/// Stage of the COMPANY pipeline. Stored on the queue row as
/// `company_sub_task`; company items without one are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyStage {
    Fetch,
    Extract,
    Analyze,
    Save,
}

impl CompanyStage {
    pub fn next(&self) -> Option<CompanyStage> {
        match self {
            CompanyStage::Fetch => Some(CompanyStage::Extract),
            CompanyStage::Extract => Some(CompanyStage::Analyze),
            CompanyStage::Analyze => Some(CompanyStage::Save),
            CompanyStage::Save => None,
        }
    }
}

impl std::fmt::Display for CompanyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompanyStage::Fetch => write!(f, "fetch"),
            CompanyStage::Extract => write!(f, "extract"),
            CompanyStage::Analyze => write!(f, "analyze"),
            CompanyStage::Save => write!(f, "save"),
        }
    }
}

impl std::str::FromStr for CompanyStage {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "fetch" => Ok(Self::Fetch),
            "extract" => Ok(Self::Extract),
            "analyze" => Ok(Self::Analyze),
            "save" => Ok(Self::Save),
            other => Err(format!("unknown CompanyStage: {other}")),
        }
    }
}

// --- Pipeline state ---

/// Per-item state carried between stages of the same pipeline.
/// Typed fields for everything the processors read; the flattened `extra`
/// map preserves anything legacy submitters stuffed in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_stage: Option<JobStage>,
    /// Scraped job payload as produced by a scraper adapter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction: Option<JobExtraction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deterministic_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_analysis: Option<MatchAnalysis>,
    #[serde(default)]
    pub awaiting_company: bool,
    #[serde(default)]
    pub company_wait_count: u32,
    #[serde(default)]
    pub bypass_prefilter: bool,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PipelineState {
    pub fn at_stage(stage: JobStage) -> Self {
        Self {
            pipeline_stage: Some(stage),
            ..Default::default()
        }
    }
}

// --- Scrape run config ---

/// Constraints for a SCRAPE queue item. `None` means unlimited.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeRunConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_matches: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_sources: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ids: Option<Vec<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_match_score: Option<u8>,
}

// --- Queue item ---

/// One row of the durable work queue. Mutated only through the queue store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: Uuid,
    pub kind: QueueItemKind,
    pub status: QueueStatus,
    /// Unique across pending/processing work for most kinds. SCRAPE items
    /// carry no URL.
    pub url: Option<String>,
    pub company_name: Option<String>,
    pub company_id: Option<Uuid>,
    pub source: Option<String>,
    pub source_id: Option<Uuid>,
    /// Lineage identifier inherited by all descendants of an initial item.
    pub tracking_id: Uuid,
    pub parent_item_id: Option<Uuid>,
    pub company_sub_task: Option<CompanyStage>,
    pub pipeline_state: Option<PipelineState>,
    pub scraped_data: Option<serde_json::Value>,
    pub scrape_config: Option<ScrapeRunConfig>,
    pub metadata: Option<serde_json::Value>,
    pub retry_count: u32,
    pub max_retries: u32,
    pub result_message: Option<String>,
    pub error_details: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub submitted_by: Option<String>,
}

impl QueueItem {
    /// Fresh item with defaults: pending, new lineage, three retries.
    pub fn new(kind: QueueItemKind) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            kind,
            status: QueueStatus::Pending,
            url: None,
            company_name: None,
            company_id: None,
            source: None,
            source_id: None,
            tracking_id: Uuid::new_v4(),
            parent_item_id: None,
            company_sub_task: None,
            pipeline_state: None,
            scraped_data: None,
            scrape_config: None,
            metadata: None,
            retry_count: 0,
            max_retries: 3,
            result_message: None,
            error_details: None,
            created_at: now,
            updated_at: now,
            processed_at: None,
            completed_at: None,
            submitted_by: None,
        }
    }

    pub fn job(url: impl Into<String>) -> Self {
        let mut item = Self::new(QueueItemKind::Job);
        item.url = Some(url.into());
        item
    }

    pub fn company(name: impl Into<String>, stage: CompanyStage) -> Self {
        let mut item = Self::new(QueueItemKind::Company);
        item.company_name = Some(name.into());
        item.company_sub_task = Some(stage);
        item
    }

    pub fn scrape(config: ScrapeRunConfig) -> Self {
        let mut item = Self::new(QueueItemKind::Scrape);
        item.scrape_config = Some(config);
        item
    }

    pub fn state(&self) -> PipelineState {
        self.pipeline_state.clone().unwrap_or_default()
    }

    /// The job pipeline stage this item is at; new JOB items start at scrape.
    pub fn job_stage(&self) -> JobStage {
        self.pipeline_state
            .as_ref()
            .and_then(|s| s.pipeline_stage)
            .unwrap_or(JobStage::Scrape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_roundtrips_through_display_and_parse() {
        for kind in [
            QueueItemKind::Job,
            QueueItemKind::Company,
            QueueItemKind::Scrape,
            QueueItemKind::SourceDiscovery,
            QueueItemKind::ScrapeSource,
            QueueItemKind::SourceRecover,
        ] {
            let parsed: QueueItemKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn terminal_statuses() {
        assert!(!QueueStatus::Pending.is_terminal());
        assert!(!QueueStatus::Processing.is_terminal());
        assert!(QueueStatus::Success.is_terminal());
        assert!(QueueStatus::Failed.is_terminal());
        assert!(QueueStatus::Filtered.is_terminal());
        assert!(QueueStatus::Skipped.is_terminal());
    }

    #[test]
    fn job_stage_order() {
        assert_eq!(JobStage::Scrape.next(), Some(JobStage::Prefilter));
        assert_eq!(JobStage::Analyze.next(), Some(JobStage::Save));
        assert_eq!(JobStage::Save.next(), None);
    }

    #[test]
    fn pipeline_state_preserves_unknown_keys() {
        let raw = serde_json::json!({
            "pipeline_stage": "extract",
            "legacy_flag": true,
        });
        let state: PipelineState = serde_json::from_value(raw).unwrap();
        assert_eq!(state.pipeline_stage, Some(JobStage::Extract));
        assert_eq!(state.extra.get("legacy_flag"), Some(&serde_json::json!(true)));
        let back = serde_json::to_value(&state).unwrap();
        assert_eq!(back.get("legacy_flag"), Some(&serde_json::json!(true)));
    }

    #[test]
    fn new_job_item_defaults() {
        let item = QueueItem::job("https://example.com/jobs/1");
        assert_eq!(item.kind, QueueItemKind::Job);
        assert_eq!(item.status, QueueStatus::Pending);
        assert_eq!(item.retry_count, 0);
        assert!(item.processed_at.is_none());
        assert_eq!(item.job_stage(), JobStage::Scrape);
    }
}
