use serde::{Deserialize, Serialize};

/// Task families with independently configurable provider chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Structured field extraction from a job posting. Most detail-sensitive.
    Extraction,
    /// Qualitative match analysis against a profile.
    Analysis,
    /// Company about/culture/mission extraction from page text.
    CompanyExtraction,
    /// Source classification and scrape-config proposals.
    SourceAnalysis,
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Extraction => write!(f, "extraction"),
            TaskKind::Analysis => write!(f, "analysis"),
            TaskKind::CompanyExtraction => write!(f, "company_extraction"),
            TaskKind::SourceAnalysis => write!(f, "source_analysis"),
        }
    }
}

/// A single completion request. Providers are stateless; each call is
/// isolated.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: 1024,
            temperature: 0.2,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub provider: &'static str,
    pub model: String,
}
