use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::error::Result;

// --- Typed settings documents ---

/// Stop lists applied before any pipeline stage, by case-insensitive
/// substring match.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StopList {
    pub excluded_companies: Vec<String>,
    pub excluded_keywords: Vec<String>,
    pub excluded_domains: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueueSettings {
    pub max_retries: u32,
    pub batch_size: u32,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            batch_size: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerSettings {
    pub poll_interval_seconds: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    /// Provider names in fallback order, first is preferred.
    pub providers: Vec<String>,
    pub model: Option<String>,
    pub min_match_score: u8,
    pub extraction_confidence_threshold: f64,
    /// Minimum length for company about/culture to count as good data.
    pub company_good_data_min_len: usize,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            providers: vec!["anthropic".to_string(), "openai".to_string()],
            model: None,
            min_match_score: 70,
            extraction_confidence_threshold: 0.7,
            company_good_data_min_len: 50,
        }
    }
}

// --- Store ---

/// Dynamic configuration documents stored as JSON in the settings table.
/// Reloadable at runtime via the admin surface.
#[derive(Clone)]
pub struct SettingsStore {
    pool: SqlitePool,
}

impl SettingsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let raw = sqlx::query_scalar::<_, String>("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(serde_json::to_string(value)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn stop_list(&self) -> Result<StopList> {
        Ok(self.get("stop_list").await?.unwrap_or_default())
    }

    pub async fn queue_settings(&self) -> Result<QueueSettings> {
        Ok(self.get("queue").await?.unwrap_or_default())
    }

    pub async fn scheduler_settings(&self) -> Result<SchedulerSettings> {
        Ok(self.get("scheduler").await?.unwrap_or_default())
    }

    pub async fn ai_settings(&self) -> Result<AiSettings> {
        Ok(self.get("ai").await?.unwrap_or_default())
    }
}
