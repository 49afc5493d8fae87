use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Enumerated extraction fields ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Seniority {
    Junior,
    Mid,
    Senior,
    Staff,
    Lead,
    Principal,
    #[default]
    Unknown,
}

impl std::fmt::Display for Seniority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Seniority::Junior => write!(f, "junior"),
            Seniority::Mid => write!(f, "mid"),
            Seniority::Senior => write!(f, "senior"),
            Seniority::Staff => write!(f, "staff"),
            Seniority::Lead => write!(f, "lead"),
            Seniority::Principal => write!(f, "principal"),
            Seniority::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum WorkArrangement {
    Remote,
    Hybrid,
    Onsite,
    #[default]
    Unknown,
}

impl std::fmt::Display for WorkArrangement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkArrangement::Remote => write!(f, "remote"),
            WorkArrangement::Hybrid => write!(f, "hybrid"),
            WorkArrangement::Onsite => write!(f, "onsite"),
            WorkArrangement::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
pub enum EmploymentType {
    #[serde(rename = "full-time")]
    FullTime,
    #[serde(rename = "part-time")]
    PartTime,
    #[serde(rename = "contract")]
    Contract,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl std::fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmploymentType::FullTime => write!(f, "full-time"),
            EmploymentType::PartTime => write!(f, "part-time"),
            EmploymentType::Contract => write!(f, "contract"),
            EmploymentType::Unknown => write!(f, "unknown"),
        }
    }
}

// --- Extraction result ---

/// Structured semantic data extracted from a job posting by the extraction
/// task. Extraction produces data only; all scoring is deterministic and
/// happens downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct JobExtraction {
    pub seniority: Seniority,
    pub work_arrangement: WorkArrangement,
    /// UTC offset of the required working timezone, when stated.
    pub timezone: Option<f64>,
    pub city: Option<String>,
    pub salary_min: Option<u32>,
    pub salary_max: Option<u32>,
    pub experience_min: Option<u32>,
    pub experience_max: Option<u32>,
    pub technologies: Vec<String>,
    pub employment_type: EmploymentType,

    // Freshness
    pub days_old: Option<u32>,
    pub is_repost: bool,

    // Location
    pub relocation_required: bool,

    // Compensation
    pub includes_equity: bool,
    pub is_contract: bool,

    // Seniority signals
    pub is_management: bool,
    pub is_lead: bool,

    /// Role type tags, e.g. ["backend", "ml-ai", "devops"].
    pub role_types: Vec<String>,

    /// Fraction of key fields that extraction filled (0.0–1.0).
    pub confidence: f64,

    pub timezone_flexible: bool,
}

/// Anything older than this is almost certainly a date-parsing artefact
/// (epoch zero, bad model arithmetic) and is treated as unknown.
pub const MAX_PLAUSIBLE_DAYS_OLD: u32 = 365;

impl JobExtraction {
    /// Key fields that drive the confidence signal, in reporting order.
    pub const CONFIDENCE_FIELDS: [&'static str; 6] = [
        "seniority",
        "work_arrangement",
        "timezone",
        "salary_min",
        "employment_type",
        "technologies",
    ];

    fn field_is_filled(&self, field: &str) -> bool {
        match field {
            "seniority" => self.seniority != Seniority::Unknown,
            "work_arrangement" => self.work_arrangement != WorkArrangement::Unknown,
            "timezone" => self.timezone.is_some(),
            "salary_min" => self.salary_min.is_some(),
            "employment_type" => self.employment_type != EmploymentType::Unknown,
            "technologies" => !self.technologies.is_empty(),
            _ => false,
        }
    }

    /// Confidence as the fraction of key fields that are non-null/non-unknown.
    pub fn compute_confidence(&self) -> f64 {
        let filled = Self::CONFIDENCE_FIELDS
            .iter()
            .filter(|f| self.field_is_filled(f))
            .count();
        filled as f64 / Self::CONFIDENCE_FIELDS.len() as f64
    }

    pub fn missing_fields(&self) -> Vec<&'static str> {
        Self::CONFIDENCE_FIELDS
            .iter()
            .copied()
            .filter(|f| !self.field_is_filled(f))
            .collect()
    }

    /// Merge filled values from a repair pass into the gaps of this result.
    /// Existing values always win; merging can only raise confidence.
    pub fn merge(&mut self, repair: &JobExtraction) {
        if self.seniority == Seniority::Unknown && repair.seniority != Seniority::Unknown {
            self.seniority = repair.seniority;
        }
        if self.work_arrangement == WorkArrangement::Unknown
            && repair.work_arrangement != WorkArrangement::Unknown
        {
            self.work_arrangement = repair.work_arrangement;
        }
        if self.timezone.is_none() {
            self.timezone = repair.timezone;
        }
        if self.salary_min.is_none() {
            self.salary_min = repair.salary_min;
        }
        if self.salary_max.is_none() {
            self.salary_max = repair.salary_max;
        }
        if self.employment_type == EmploymentType::Unknown
            && repair.employment_type != EmploymentType::Unknown
        {
            self.employment_type = repair.employment_type;
        }
        if self.technologies.is_empty() {
            self.technologies = repair.technologies.clone();
        }
        if repair.timezone_flexible {
            self.timezone_flexible = true;
        }
        self.confidence = self.compute_confidence();
    }

    /// Normalise after deserialising a model response: lowercase technologies,
    /// drop implausible ages, recompute confidence.
    pub fn normalized(mut self) -> Self {
        self.technologies = self
            .technologies
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        self.role_types = self
            .role_types
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        if matches!(self.days_old, Some(d) if d > MAX_PLAUSIBLE_DAYS_OLD) {
            self.days_old = None;
        }
        self.confidence = self.compute_confidence();
        self
    }
}
