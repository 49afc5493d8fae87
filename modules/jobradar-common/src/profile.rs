use serde::{Deserialize, Serialize};

/// One prior role, used as matching context in analyser prompts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub company: String,
    pub title: String,
    #[serde(default)]
    pub highlights: Vec<String>,
}

/// The user profile jobs are matched against.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    pub name: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub years_experience: u32,
    /// UTC offset of the user's home timezone.
    #[serde(default)]
    pub timezone: f64,
    #[serde(default)]
    pub target_salary: Option<u32>,
    #[serde(default)]
    pub preferred_city: Option<String>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
}

impl Profile {
    /// Case-insensitive skill membership, used by the scoring engine.
    pub fn has_skill(&self, skill: &str) -> bool {
        let needle = skill.to_lowercase();
        self.skills.iter().any(|s| s.to_lowercase() == needle)
    }
}
