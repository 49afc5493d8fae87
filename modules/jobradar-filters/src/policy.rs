//! Filter and scoring policy documents. Stored as JSON settings and loaded
//! at runtime; field names match the stored camelCase documents.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

// --- Stage A: pre-filter policy ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemotePolicy {
    pub allow_remote: bool,
    pub allow_hybrid: bool,
    pub allow_onsite: bool,
    pub allowed_hybrid_locations: Vec<String>,
    pub allowed_onsite_locations: Vec<String>,
}

impl Default for RemotePolicy {
    fn default() -> Self {
        Self {
            allow_remote: true,
            allow_hybrid: false,
            allow_onsite: false,
            allowed_hybrid_locations: Vec::new(),
            allowed_onsite_locations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmploymentPolicy {
    pub allow_full_time: bool,
    pub allow_part_time: bool,
    pub allow_contract: bool,
}

impl Default for EmploymentPolicy {
    fn default() -> Self {
        Self {
            allow_full_time: true,
            allow_part_time: false,
            allow_contract: false,
        }
    }
}

/// Stage A rejection rules. Each check is skipped when its required data is
/// absent: missing data passes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrefilterPolicy {
    /// At least one must appear in the title when non-empty.
    pub required_title_keywords: Vec<String>,
    /// None of these may appear in the title.
    pub excluded_title_keywords: Vec<String>,
    /// Maximum posting age in days. 0 disables freshness checking.
    pub max_age_days: u32,
    pub remote_policy: RemotePolicy,
    pub employment: EmploymentPolicy,
    /// Any parsed salary maximum must reach this floor.
    pub min_salary_floor: Option<u32>,
    /// Word-boundary matches against these reject outright.
    pub rejected_tech: Vec<String>,
}

// --- Stage B: strike engine policy ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HardRejections {
    pub excluded_seniority: Vec<String>,
    pub excluded_companies: Vec<String>,
    pub excluded_keywords: Vec<String>,
    pub required_title_keywords: Vec<String>,
    pub min_salary_floor: Option<u32>,
    pub reject_commission_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SalaryStrike {
    pub enabled: bool,
    /// Salaries with a max below this accumulate points.
    pub threshold: u32,
    pub points: u32,
}

impl Default for SalaryStrike {
    fn default() -> Self {
        Self {
            enabled: false,
            threshold: 0,
            points: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QualityStrikes {
    pub min_description_length: usize,
    pub short_description_points: u32,
    pub buzzwords: Vec<String>,
    pub buzzword_points: u32,
}

impl Default for QualityStrikes {
    fn default() -> Self {
        Self {
            min_description_length: 0,
            short_description_points: 1,
            buzzwords: Vec::new(),
            buzzword_points: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgeStrike {
    pub enabled: bool,
    /// Older than this accumulates points.
    pub strike_days: u32,
    /// Older than this is a hard rejection.
    pub reject_days: u32,
    pub points: u32,
}

impl Default for AgeStrike {
    fn default() -> Self {
        Self {
            enabled: false,
            strike_days: 7,
            reject_days: 30,
            points: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrikePolicy {
    pub enabled: bool,
    /// Overall rejection when accumulated points reach this.
    pub strike_threshold: u32,
    pub hard_rejections: HardRejections,
    pub remote_policy: RemotePolicy,
    pub salary_strike: SalaryStrike,
    /// Title seniority token to strike points, e.g. {"principal": 1}.
    pub seniority_strikes: HashMap<String, u32>,
    pub quality_strikes: QualityStrikes,
    pub age_strike: AgeStrike,
}

impl Default for StrikePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            strike_threshold: 3,
            hard_rejections: HardRejections::default(),
            remote_policy: RemotePolicy::default(),
            salary_strike: SalaryStrike::default(),
            seniority_strikes: HashMap::new(),
            quality_strikes: QualityStrikes::default(),
            age_strike: AgeStrike::default(),
        }
    }
}

// --- Technology ranks ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TechRank {
    /// "required" | "preferred" | "nice-to-have" | "strike" | "fail".
    /// Only "strike" and "fail" penalise; the rest are positive signals.
    pub rank: String,
    pub weight: f64,
    pub points: u32,
}

impl Default for TechRank {
    fn default() -> Self {
        Self {
            rank: "nice-to-have".to_string(),
            weight: 0.5,
            points: 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TechnologyRanks {
    pub technologies: HashMap<String, TechRank>,
}

// --- Scoring policy ---

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringPolicy {
    /// Penalty per hour of timezone difference beyond the free allowance.
    pub timezone_penalty_per_hour: f64,
    /// Hours of timezone difference that cost nothing.
    pub timezone_free_hours: f64,
    pub preferred_city_bonus: i32,
    pub portland_office_bonus: i32,
    pub preferred_roles: Vec<String>,
    pub disliked_roles: Vec<String>,
    pub prefer_large_companies: bool,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            timezone_penalty_per_hour: 2.0,
            timezone_free_hours: 2.0,
            preferred_city_bonus: 10,
            portland_office_bonus: 15,
            preferred_roles: Vec::new(),
            disliked_roles: Vec::new(),
            prefer_large_companies: false,
        }
    }
}

/// The whole filter configuration as one stored document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterConfig {
    pub prefilter: PrefilterPolicy,
    pub strike_engine: StrikePolicy,
    pub technology_ranks: TechnologyRanks,
    pub scoring: ScoringPolicy,
}
