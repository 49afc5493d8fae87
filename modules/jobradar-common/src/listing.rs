use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Scraped job record ---

/// Uniform job record produced by every scraper adapter.
/// `title`..`url` are required; `posted_date` and `salary` appear only when
/// the source exposes them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct JobPosting {
    pub title: String,
    pub company: String,
    pub company_website: String,
    pub location: String,
    pub description: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
}

impl JobPosting {
    pub fn is_complete(&self) -> bool {
        !self.title.is_empty() && !self.url.is_empty()
    }
}

// --- Match analysis (AI output) ---

/// Qualitative analysis from the match analyser. The analyser never scores;
/// the deterministic score is attached separately.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchAnalysis {
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub experience_match: String,
    pub key_strengths: Vec<String>,
    pub potential_concerns: Vec<String>,
    pub customization_recommendations: serde_json::Value,
}

// --- Application priority ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationPriority {
    High,
    Medium,
    Low,
}

impl ApplicationPriority {
    /// Priority band derived from the deterministic score.
    pub fn from_score(score: u8) -> Self {
        match score {
            85..=u8::MAX => ApplicationPriority::High,
            70..=84 => ApplicationPriority::Medium,
            _ => ApplicationPriority::Low,
        }
    }
}

impl std::fmt::Display for ApplicationPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplicationPriority::High => write!(f, "high"),
            ApplicationPriority::Medium => write!(f, "medium"),
            ApplicationPriority::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for ApplicationPriority {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(format!("unknown ApplicationPriority: {other}")),
        }
    }
}

// --- Published records ---

/// A published job posting, keyed by its normalised URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobListing {
    pub id: Uuid,
    /// Normalised URL; unique in the published store.
    pub url: String,
    pub title: String,
    /// Title with seniority prefixes and level markers stripped.
    pub role: String,
    pub company: String,
    pub company_website: String,
    pub company_id: Option<Uuid>,
    pub location: String,
    pub description: String,
    pub posted_date: Option<String>,
    pub salary: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A scored match for a published listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMatch {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub match_score: u8,
    pub matched_skills: Vec<String>,
    pub missing_skills: Vec<String>,
    pub experience_match: String,
    pub key_strengths: Vec<String>,
    pub potential_concerns: Vec<String>,
    pub application_priority: ApplicationPriority,
    pub customization_recommendations: serde_json::Value,
    /// Lineage back to the queue item that produced the match.
    pub queue_item_id: Option<Uuid>,
    pub tracking_id: Option<Uuid>,
    pub document_generated: bool,
    pub document_url: Option<String>,
    pub status: Option<String>,
    pub status_notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Strip seniority prefixes and parenthesised level markers from a title.
/// Falls back to the full title when the remainder is implausibly short.
pub fn extract_role_from_title(title: &str) -> String {
    let no_brackets = regex::Regex::new(r"\s*[\(\[][^\)\]]*[\)\]]")
        .unwrap()
        .replace_all(title, "");
    let seniority =
        regex::Regex::new(r"(?i)^(Senior|Sr\.?|Junior|Jr\.?|Lead|Principal|Staff|Entry[ -]?Level|Mid[ -]?Level)\s+")
            .unwrap();
    let role = seniority.replace(no_brackets.trim(), "").trim().to_string();
    if role.len() < 5 {
        title.trim().to_string()
    } else {
        role
    }
}
