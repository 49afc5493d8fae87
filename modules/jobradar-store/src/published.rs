use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use jobradar_common::{
    extract_role_from_title, normalize_url, ApplicationPriority, JobListing, JobMatch, JobPosting,
    MatchAnalysis,
};

use crate::error::{Result, StoreError};

/// Lineage a saved match keeps back to the queue.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchLineage {
    pub company_id: Option<Uuid>,
    pub queue_item_id: Option<Uuid>,
    pub tracking_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default)]
pub struct MatchFilters {
    pub min_score: Option<u8>,
    pub limit: Option<u32>,
}

/// The record of published job matches consumed by the user-facing app.
/// All URL comparisons use the normalised form; `save_match` is idempotent
/// per normalised URL.
#[async_trait]
pub trait PublishedStore: Send + Sync {
    async fn save_match(
        &self,
        job: &JobPosting,
        analysis: &MatchAnalysis,
        score: u8,
        lineage: MatchLineage,
    ) -> Result<Uuid>;

    async fn update_document_generated(&self, match_id: Uuid, document_url: &str) -> Result<()>;

    async fn update_status(&self, match_id: Uuid, status: &str, notes: Option<&str>)
        -> Result<()>;

    async fn get_matches(&self, filters: MatchFilters) -> Result<Vec<(JobListing, JobMatch)>>;

    async fn job_exists(&self, url: &str) -> Result<bool>;

    async fn batch_check_exists(&self, urls: &[String]) -> Result<HashMap<String, bool>>;
}

// --- SQLite implementation ---

#[derive(sqlx::FromRow)]
struct ListingRow {
    id: String,
    url: String,
    title: String,
    role: String,
    company: String,
    company_website: String,
    company_id: Option<String>,
    location: String,
    description: String,
    posted_date: Option<String>,
    salary: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct MatchRow {
    id: String,
    listing_id: String,
    match_score: i64,
    matched_skills: String,
    missing_skills: String,
    experience_match: String,
    key_strengths: String,
    potential_concerns: String,
    application_priority: String,
    customization_recommendations: String,
    queue_item_id: Option<String>,
    tracking_id: Option<String>,
    document_generated: bool,
    document_url: Option<String>,
    status: Option<String>,
    status_notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_uuid(value: &str) -> Result<Uuid> {
    value
        .parse()
        .map_err(|_| StoreError::Serialization(format!("invalid uuid: {value}")))
}

impl TryFrom<ListingRow> for JobListing {
    type Error = StoreError;

    fn try_from(row: ListingRow) -> Result<Self> {
        Ok(JobListing {
            id: parse_uuid(&row.id)?,
            url: row.url,
            title: row.title,
            role: row.role,
            company: row.company,
            company_website: row.company_website,
            company_id: row.company_id.as_deref().map(parse_uuid).transpose()?,
            location: row.location,
            description: row.description,
            posted_date: row.posted_date,
            salary: row.salary,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<MatchRow> for JobMatch {
    type Error = StoreError;

    fn try_from(row: MatchRow) -> Result<Self> {
        Ok(JobMatch {
            id: parse_uuid(&row.id)?,
            listing_id: parse_uuid(&row.listing_id)?,
            match_score: row.match_score.clamp(0, 100) as u8,
            matched_skills: serde_json::from_str(&row.matched_skills).unwrap_or_default(),
            missing_skills: serde_json::from_str(&row.missing_skills).unwrap_or_default(),
            experience_match: row.experience_match,
            key_strengths: serde_json::from_str(&row.key_strengths).unwrap_or_default(),
            potential_concerns: serde_json::from_str(&row.potential_concerns).unwrap_or_default(),
            application_priority: row
                .application_priority
                .parse::<ApplicationPriority>()
                .map_err(StoreError::Serialization)?,
            customization_recommendations: serde_json::from_str(
                &row.customization_recommendations,
            )
            .unwrap_or_default(),
            queue_item_id: row.queue_item_id.as_deref().map(parse_uuid).transpose()?,
            tracking_id: row.tracking_id.as_deref().map(parse_uuid).transpose()?,
            document_generated: row.document_generated,
            document_url: row.document_url,
            status: row.status,
            status_notes: row.status_notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone)]
pub struct SqlitePublishedStore {
    pool: SqlitePool,
}

impl SqlitePublishedStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn existing_match_id(&self, normalized: &str) -> Result<Option<Uuid>> {
        let row = sqlx::query_scalar::<_, String>(
            r#"
            SELECT m.id FROM job_matches m
            JOIN job_listings l ON l.id = m.listing_id
            WHERE l.url = ?
            LIMIT 1
            "#,
        )
        .bind(normalized)
        .fetch_optional(&self.pool)
        .await?;
        row.as_deref().map(parse_uuid).transpose()
    }
}

#[async_trait]
impl PublishedStore for SqlitePublishedStore {
    async fn save_match(
        &self,
        job: &JobPosting,
        analysis: &MatchAnalysis,
        score: u8,
        lineage: MatchLineage,
    ) -> Result<Uuid> {
        let normalized = normalize_url(&job.url);
        if let Some(existing) = self.existing_match_id(&normalized).await? {
            info!(
                category = "database",
                action = "match_duplicate",
                url = %normalized,
                match_id = %existing,
                "Match already exists, returning existing id"
            );
            return Ok(existing);
        }

        let now = Utc::now();
        let listing_id = Uuid::new_v4();
        let match_id = Uuid::new_v4();
        let role = extract_role_from_title(&job.title);
        let priority = ApplicationPriority::from_score(score);

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO job_listings (
                id, url, title, role, company, company_website, company_id,
                location, description, posted_date, salary, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(listing_id.to_string())
        .bind(&normalized)
        .bind(&job.title)
        .bind(&role)
        .bind(&job.company)
        .bind(&job.company_website)
        .bind(lineage.company_id.map(|v| v.to_string()))
        .bind(&job.location)
        .bind(&job.description)
        .bind(&job.posted_date)
        .bind(&job.salary)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO job_matches (
                id, listing_id, match_score, matched_skills, missing_skills,
                experience_match, key_strengths, potential_concerns,
                application_priority, customization_recommendations,
                queue_item_id, tracking_id, document_generated, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(match_id.to_string())
        .bind(listing_id.to_string())
        .bind(score as i64)
        .bind(serde_json::to_string(&analysis.matched_skills)?)
        .bind(serde_json::to_string(&analysis.missing_skills)?)
        .bind(&analysis.experience_match)
        .bind(serde_json::to_string(&analysis.key_strengths)?)
        .bind(serde_json::to_string(&analysis.potential_concerns)?)
        .bind(priority.to_string())
        .bind(serde_json::to_string(&analysis.customization_recommendations)?)
        .bind(lineage.queue_item_id.map(|v| v.to_string()))
        .bind(lineage.tracking_id.map(|v| v.to_string()))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            category = "database",
            action = "match_saved",
            url = %normalized,
            score,
            priority = %priority,
            match_id = %match_id,
            "Saved job match"
        );
        Ok(match_id)
    }

    async fn update_document_generated(&self, match_id: Uuid, document_url: &str) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE job_matches
            SET document_generated = 1, document_url = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(document_url)
        .bind(Utc::now())
        .bind(match_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_status(
        &self,
        match_id: Uuid,
        status: &str,
        notes: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE job_matches SET status = ?, status_notes = ?, updated_at = ? WHERE id = ?",
        )
        .bind(status)
        .bind(notes)
        .bind(Utc::now())
        .bind(match_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_matches(&self, filters: MatchFilters) -> Result<Vec<(JobListing, JobMatch)>> {
        let min_score = filters.min_score.unwrap_or(0) as i64;
        let limit = filters.limit.unwrap_or(100) as i64;

        let match_rows = sqlx::query_as::<_, MatchRow>(
            r#"
            SELECT * FROM job_matches
            WHERE match_score >= ?
            ORDER BY match_score DESC, datetime(created_at) DESC
            LIMIT ?
            "#,
        )
        .bind(min_score)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(match_rows.len());
        for row in match_rows {
            let listing_row =
                sqlx::query_as::<_, ListingRow>("SELECT * FROM job_listings WHERE id = ?")
                    .bind(&row.listing_id)
                    .fetch_one(&self.pool)
                    .await?;
            out.push((listing_row.try_into()?, row.try_into()?));
        }
        Ok(out)
    }

    async fn job_exists(&self, url: &str) -> Result<bool> {
        let normalized = normalize_url(url);
        let row = sqlx::query_scalar::<_, i64>("SELECT 1 FROM job_listings WHERE url = ? LIMIT 1")
            .bind(&normalized)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn batch_check_exists(&self, urls: &[String]) -> Result<HashMap<String, bool>> {
        let mut out = HashMap::with_capacity(urls.len());
        for url in urls {
            out.insert(url.clone(), self.job_exists(url).await?);
        }
        Ok(out)
    }
}
