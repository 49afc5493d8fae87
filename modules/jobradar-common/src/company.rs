use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Tiers ---

/// Priority tier assigned by company analysis, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CompanyTier {
    S,
    A,
    B,
    C,
    D,
}

impl std::fmt::Display for CompanyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompanyTier::S => write!(f, "S"),
            CompanyTier::A => write!(f, "A"),
            CompanyTier::B => write!(f, "B"),
            CompanyTier::C => write!(f, "C"),
            CompanyTier::D => write!(f, "D"),
        }
    }
}

impl std::str::FromStr for CompanyTier {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "S" => Ok(Self::S),
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            other => Err(format!("unknown CompanyTier: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanySize {
    Startup,
    Small,
    Medium,
    Large,
    Enterprise,
}

// --- Company record ---

/// Normalised company record produced by the COMPANY pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub website: Option<String>,
    pub about: Option<String>,
    pub culture: Option<String>,
    pub mission: Option<String>,
    pub tech_stack: Vec<String>,
    pub tier: CompanyTier,
    pub priority_score: i32,
    pub size: Option<CompanySize>,
    pub has_portland_office: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Company {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            website: None,
            about: None,
            culture: None,
            mission: None,
            tech_stack: Vec::new(),
            tier: CompanyTier::D,
            priority_score: 0,
            size: None,
            has_portland_office: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Good data gates company enrichment: about and culture both present
    /// and each at least `min_len` characters.
    pub fn has_good_data(&self, min_len: usize) -> bool {
        let long_enough = |field: &Option<String>| {
            field
                .as_deref()
                .map(|s| s.trim().len() >= min_len)
                .unwrap_or(false)
        };
        long_enough(&self.about) && long_enough(&self.culture)
    }

    /// Context string handed to the match analyser.
    pub fn info_string(&self) -> String {
        let mut parts = Vec::new();
        if let Some(about) = self.about.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("About: {about}"));
        }
        if let Some(culture) = self.culture.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("Culture: {culture}"));
        }
        if let Some(mission) = self.mission.as_deref().filter(|s| !s.is_empty()) {
            parts.push(format!("Mission: {mission}"));
        }
        parts.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn good_data_requires_both_fields_long_enough() {
        let mut company = Company::new("Acme");
        assert!(!company.has_good_data(50));

        company.about = Some("a".repeat(60));
        assert!(!company.has_good_data(50));

        company.culture = Some("c".repeat(60));
        assert!(company.has_good_data(50));

        company.culture = Some("short".into());
        assert!(!company.has_good_data(50));
    }

    #[test]
    fn info_string_skips_empty_sections() {
        let mut company = Company::new("Acme");
        company.about = Some("Makes widgets".into());
        company.mission = Some(String::new());
        assert_eq!(company.info_string(), "About: Makes widgets");
    }

    #[test]
    fn tier_orders_best_first() {
        assert!(CompanyTier::S < CompanyTier::D);
        assert_eq!("A".parse::<CompanyTier>().unwrap(), CompanyTier::A);
    }
}
