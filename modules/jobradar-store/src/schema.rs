//! Embedded schema, applied idempotently at startup.

use sqlx::SqlitePool;

use crate::error::Result;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS job_queue (
    id              TEXT PRIMARY KEY,
    type            TEXT NOT NULL,
    status          TEXT NOT NULL,
    url             TEXT UNIQUE,
    company_name    TEXT,
    company_id      TEXT,
    source          TEXT,
    source_id       TEXT,
    tracking_id     TEXT NOT NULL,
    parent_item_id  TEXT,
    company_sub_task TEXT,
    pipeline_state  TEXT,
    scraped_data    TEXT,
    scrape_config   TEXT,
    metadata        TEXT,
    retry_count     INTEGER NOT NULL DEFAULT 0,
    max_retries     INTEGER NOT NULL DEFAULT 3,
    result_message  TEXT,
    error_details   TEXT,
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL,
    processed_at    TEXT,
    completed_at    TEXT,
    submitted_by    TEXT
);

CREATE INDEX IF NOT EXISTS idx_job_queue_status ON job_queue (status, updated_at);
CREATE INDEX IF NOT EXISTS idx_job_queue_tracking ON job_queue (tracking_id);

CREATE TABLE IF NOT EXISTS job_sources (
    id                    TEXT PRIMARY KEY,
    name                  TEXT NOT NULL,
    source_type           TEXT NOT NULL,
    config                TEXT NOT NULL,
    status                TEXT NOT NULL DEFAULT 'active',
    company_id            TEXT,
    aggregator_domain     TEXT,
    last_scraped_at       TEXT,
    consecutive_failures  INTEGER NOT NULL DEFAULT 0,
    consecutive_zero_jobs INTEGER NOT NULL DEFAULT 0,
    disabled_notes        TEXT,
    disabled_tags         TEXT NOT NULL DEFAULT '[]',
    created_at            TEXT NOT NULL,
    updated_at            TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_job_sources_status ON job_sources (status, last_scraped_at);

CREATE TABLE IF NOT EXISTS companies (
    id                  TEXT PRIMARY KEY,
    name                TEXT NOT NULL,
    website             TEXT,
    about               TEXT,
    culture             TEXT,
    mission             TEXT,
    tech_stack          TEXT NOT NULL DEFAULT '[]',
    tier                TEXT NOT NULL DEFAULT 'D',
    priority_score      INTEGER NOT NULL DEFAULT 0,
    size                TEXT,
    has_portland_office INTEGER NOT NULL DEFAULT 0,
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_companies_name ON companies (name);

CREATE TABLE IF NOT EXISTS job_listings (
    id              TEXT PRIMARY KEY,
    url             TEXT NOT NULL UNIQUE,
    title           TEXT NOT NULL,
    role            TEXT NOT NULL,
    company         TEXT NOT NULL,
    company_website TEXT NOT NULL DEFAULT '',
    company_id      TEXT,
    location        TEXT NOT NULL DEFAULT '',
    description     TEXT NOT NULL DEFAULT '',
    posted_date     TEXT,
    salary          TEXT,
    created_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS job_matches (
    id                           TEXT PRIMARY KEY,
    listing_id                   TEXT NOT NULL REFERENCES job_listings (id),
    match_score                  INTEGER NOT NULL,
    matched_skills               TEXT NOT NULL DEFAULT '[]',
    missing_skills               TEXT NOT NULL DEFAULT '[]',
    experience_match             TEXT NOT NULL DEFAULT '',
    key_strengths                TEXT NOT NULL DEFAULT '[]',
    potential_concerns           TEXT NOT NULL DEFAULT '[]',
    application_priority         TEXT NOT NULL,
    customization_recommendations TEXT NOT NULL DEFAULT '{}',
    queue_item_id                TEXT,
    tracking_id                  TEXT,
    document_generated           INTEGER NOT NULL DEFAULT 0,
    document_url                 TEXT,
    status                       TEXT,
    status_notes                 TEXT,
    created_at                   TEXT NOT NULL,
    updated_at                   TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_job_matches_listing ON job_matches (listing_id);

CREATE TABLE IF NOT EXISTS settings (
    key        TEXT PRIMARY KEY,
    value      TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

pub async fn apply(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await?;
    for statement in SCHEMA.split(';') {
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }
        sqlx::query(statement).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::debug!(category = "database", action = "schema_applied", "Schema applied");
    Ok(())
}
