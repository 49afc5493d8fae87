use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use jobradar_common::{Source, SourceConfig, SourceStatus};

use crate::error::{Result, StoreError};

#[derive(sqlx::FromRow)]
struct SourceRow {
    id: String,
    name: String,
    config: String,
    status: String,
    company_id: Option<String>,
    aggregator_domain: Option<String>,
    last_scraped_at: Option<DateTime<Utc>>,
    consecutive_failures: i64,
    consecutive_zero_jobs: i64,
    disabled_notes: Option<String>,
    disabled_tags: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SourceRow> for Source {
    type Error = StoreError;

    fn try_from(row: SourceRow) -> Result<Self> {
        Ok(Source {
            id: row
                .id
                .parse()
                .map_err(|_| StoreError::Serialization(format!("invalid uuid: {}", row.id)))?,
            name: row.name,
            config: serde_json::from_str(&row.config)?,
            status: row
                .status
                .parse::<SourceStatus>()
                .map_err(StoreError::Serialization)?,
            company_id: row
                .company_id
                .as_deref()
                .map(|v| {
                    v.parse()
                        .map_err(|_| StoreError::Serialization(format!("invalid uuid: {v}")))
                })
                .transpose()?,
            aggregator_domain: row.aggregator_domain,
            last_scraped_at: row.last_scraped_at,
            consecutive_failures: row.consecutive_failures as u32,
            consecutive_zero_jobs: row.consecutive_zero_jobs as u32,
            disabled_notes: row.disabled_notes,
            disabled_tags: serde_json::from_str(&row.disabled_tags).unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Store for scraping targets and their strike/recovery bookkeeping.
#[derive(Clone)]
pub struct SourcesStore {
    pool: SqlitePool,
}

impl SourcesStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn add_source(&self, source: &Source) -> Result<Uuid> {
        sqlx::query(
            r#"
            INSERT INTO job_sources (
                id, name, source_type, config, status, company_id, aggregator_domain,
                last_scraped_at, consecutive_failures, consecutive_zero_jobs,
                disabled_notes, disabled_tags, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(source.id.to_string())
        .bind(&source.name)
        .bind(source.source_type())
        .bind(serde_json::to_string(&source.config)?)
        .bind(source.status.to_string())
        .bind(source.company_id.map(|v| v.to_string()))
        .bind(&source.aggregator_domain)
        .bind(source.last_scraped_at)
        .bind(source.consecutive_failures as i64)
        .bind(source.consecutive_zero_jobs as i64)
        .bind(&source.disabled_notes)
        .bind(serde_json::to_string(&source.disabled_tags)?)
        .bind(source.created_at)
        .bind(source.updated_at)
        .execute(&self.pool)
        .await?;

        info!(
            category = "database",
            action = "source_added",
            source_id = %source.id,
            source_type = source.source_type(),
            "Added source"
        );
        Ok(source.id)
    }

    pub async fn get_source(&self, source_id: Uuid) -> Result<Option<Source>> {
        let row = sqlx::query_as::<_, SourceRow>("SELECT * FROM job_sources WHERE id = ?")
            .bind(source_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Source::try_from).transpose()
    }

    /// Active sources in rotation order: never-scraped first, then oldest
    /// `last_scraped_at` first.
    pub async fn get_active_sources(&self) -> Result<Vec<Source>> {
        let rows = sqlx::query_as::<_, SourceRow>(
            r#"
            SELECT * FROM job_sources
            WHERE status = 'active'
            ORDER BY last_scraped_at IS NOT NULL, datetime(last_scraped_at) ASC, name ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Source::try_from).collect()
    }

    /// A successful scrape: stamp `last_scraped_at`, reset the transient
    /// failure counter. The zero-jobs counter is managed separately because
    /// a zero-job success is still a success.
    pub async fn record_scrape_success(&self, source_id: Uuid, jobs_found: u32) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE job_sources
            SET last_scraped_at = ?, consecutive_failures = 0, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(Utc::now())
        .bind(source_id.to_string())
        .execute(&self.pool)
        .await?;

        if jobs_found > 0 {
            self.reset_zero_jobs(source_id).await?;
        }
        Ok(())
    }

    /// A recoverable failure: bump the strike counter and return its new
    /// value so the runner can decide whether the threshold was reached.
    pub async fn record_failure(&self, source_id: Uuid, error: &str) -> Result<u32> {
        sqlx::query(
            r#"
            UPDATE job_sources
            SET consecutive_failures = consecutive_failures + 1,
                disabled_notes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(error)
        .bind(Utc::now())
        .bind(source_id.to_string())
        .execute(&self.pool)
        .await?;

        let count = sqlx::query_scalar::<_, i64>(
            "SELECT consecutive_failures FROM job_sources WHERE id = ?",
        )
        .bind(source_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u32)
    }

    /// Record an error without touching the strike counter. Used for
    /// rate-limited responses that carry Retry-After.
    pub async fn record_deferred_error(&self, source_id: Uuid, error: &str) -> Result<()> {
        sqlx::query("UPDATE job_sources SET disabled_notes = ?, updated_at = ? WHERE id = ?")
            .bind(error)
            .bind(Utc::now())
            .bind(source_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Disable a source with triage tags (`anti_bot`, `auth_required`,
    /// `protected_api`, `strike_threshold`).
    pub async fn disable_source(&self, source_id: Uuid, notes: &str, tags: &[&str]) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE job_sources
            SET status = 'disabled', disabled_notes = ?, disabled_tags = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(notes)
        .bind(serde_json::to_string(tags)?)
        .bind(Utc::now())
        .bind(source_id.to_string())
        .execute(&self.pool)
        .await?;

        warn!(
            category = "scrape",
            action = "source_disabled",
            source_id = %source_id,
            tags = ?tags,
            notes,
            "Disabled source"
        );
        Ok(())
    }

    pub async fn set_status(&self, source_id: Uuid, status: SourceStatus) -> Result<()> {
        sqlx::query("UPDATE job_sources SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(Utc::now())
            .bind(source_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Bump the consecutive-zero-jobs counter and return its new value.
    pub async fn increment_zero_jobs(&self, source_id: Uuid) -> Result<u32> {
        sqlx::query(
            r#"
            UPDATE job_sources
            SET consecutive_zero_jobs = consecutive_zero_jobs + 1, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Utc::now())
        .bind(source_id.to_string())
        .execute(&self.pool)
        .await?;

        let count = sqlx::query_scalar::<_, i64>(
            "SELECT consecutive_zero_jobs FROM job_sources WHERE id = ?",
        )
        .bind(source_id.to_string())
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u32)
    }

    pub async fn reset_zero_jobs(&self, source_id: Uuid) -> Result<()> {
        sqlx::query(
            "UPDATE job_sources SET consecutive_zero_jobs = 0, updated_at = ? WHERE id = ?",
        )
        .bind(Utc::now())
        .bind(source_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Atomic recovery swap: new config, counters cleared, back to active.
    /// Used when a SOURCE_RECOVER probe produced at least one job.
    pub async fn apply_recovered_config(
        &self,
        source_id: Uuid,
        config: &SourceConfig,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE job_sources
            SET config = ?, source_type = ?, status = 'active',
                consecutive_failures = 0, consecutive_zero_jobs = 0,
                disabled_notes = NULL, disabled_tags = '[]', updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(serde_json::to_string(config)?)
        .bind(config.source_type())
        .bind(Utc::now())
        .bind(source_id.to_string())
        .execute(&self.pool)
        .await?;

        info!(
            category = "scrape",
            action = "source_recovered",
            source_id = %source_id,
            source_type = config.source_type(),
            "Recovered source with repaired config"
        );
        Ok(())
    }
}
