use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    HardReject,
    Strike,
}

/// One rule firing, with enough context for the stored rejection reason.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rejection {
    pub filter_name: String,
    pub filter_category: String,
    pub severity: Severity,
    pub reason: String,
    pub points: u32,
}

/// Combined result of the pre-filter and strike engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOutcome {
    pub passed: bool,
    pub total_strikes: u32,
    pub rejections: Vec<Rejection>,
}

impl FilterOutcome {
    pub fn pass() -> Self {
        Self {
            passed: true,
            total_strikes: 0,
            rejections: Vec::new(),
        }
    }

    pub fn add_hard_reject(
        &mut self,
        filter_name: &str,
        filter_category: &str,
        reason: impl Into<String>,
    ) {
        self.rejections.push(Rejection {
            filter_name: filter_name.to_string(),
            filter_category: filter_category.to_string(),
            severity: Severity::HardReject,
            reason: reason.into(),
            points: 0,
        });
        self.passed = false;
    }

    pub fn add_strike(
        &mut self,
        filter_name: &str,
        filter_category: &str,
        reason: impl Into<String>,
        points: u32,
    ) {
        self.rejections.push(Rejection {
            filter_name: filter_name.to_string(),
            filter_category: filter_category.to_string(),
            severity: Severity::Strike,
            reason: reason.into(),
            points,
        });
        self.total_strikes += points;
    }

    /// Summary string stored as the queue item's rejection reason.
    pub fn reason_summary(&self) -> String {
        if self.rejections.is_empty() {
            return "passed".to_string();
        }
        self.rejections
            .iter()
            .map(|r| r.reason.as_str())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
