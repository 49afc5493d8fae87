use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use jobradar_common::{Company, CompanySize, CompanyTier};

use crate::error::{Result, StoreError};

#[derive(sqlx::FromRow)]
struct CompanyRow {
    id: String,
    name: String,
    website: Option<String>,
    about: Option<String>,
    culture: Option<String>,
    mission: Option<String>,
    tech_stack: String,
    tier: String,
    priority_score: i64,
    size: Option<String>,
    has_portland_office: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CompanyRow> for Company {
    type Error = StoreError;

    fn try_from(row: CompanyRow) -> Result<Self> {
        Ok(Company {
            id: row
                .id
                .parse()
                .map_err(|_| StoreError::Serialization(format!("invalid uuid: {}", row.id)))?,
            name: row.name,
            website: row.website,
            about: row.about,
            culture: row.culture,
            mission: row.mission,
            tech_stack: serde_json::from_str(&row.tech_stack).unwrap_or_default(),
            tier: row
                .tier
                .parse::<CompanyTier>()
                .map_err(StoreError::Serialization)?,
            priority_score: row.priority_score as i32,
            size: row
                .size
                .as_deref()
                .map(|s| serde_json::from_value::<CompanySize>(serde_json::Value::String(s.into())))
                .transpose()
                .map_err(|e| StoreError::Serialization(e.to_string()))?,
            has_portland_office: row.has_portland_office,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn size_to_column(size: &Option<CompanySize>) -> Option<String> {
    size.as_ref().and_then(|s| match serde_json::to_value(s) {
        Ok(serde_json::Value::String(v)) => Some(v),
        _ => None,
    })
}

/// Store for normalised company records.
#[derive(Clone)]
pub struct CompaniesStore {
    pool: SqlitePool,
}

impl CompaniesStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or fully replace a company record.
    pub async fn save(&self, company: &Company) -> Result<Uuid> {
        sqlx::query(
            r#"
            INSERT INTO companies (
                id, name, website, about, culture, mission, tech_stack, tier,
                priority_score, size, has_portland_office, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (name) DO UPDATE SET
                website = excluded.website,
                about = excluded.about,
                culture = excluded.culture,
                mission = excluded.mission,
                tech_stack = excluded.tech_stack,
                tier = excluded.tier,
                priority_score = excluded.priority_score,
                size = excluded.size,
                has_portland_office = excluded.has_portland_office,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(company.id.to_string())
        .bind(&company.name)
        .bind(&company.website)
        .bind(&company.about)
        .bind(&company.culture)
        .bind(&company.mission)
        .bind(serde_json::to_string(&company.tech_stack)?)
        .bind(company.tier.to_string())
        .bind(company.priority_score as i64)
        .bind(size_to_column(&company.size))
        .bind(company.has_portland_office)
        .bind(company.created_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        // The conflict path keeps the original row id, so read it back.
        let id = self
            .get_by_name(&company.name)
            .await?
            .map(|c| c.id)
            .unwrap_or(company.id);

        info!(
            category = "database",
            action = "company_saved",
            company_id = %id,
            name = %company.name,
            "Saved company"
        );
        Ok(id)
    }

    pub async fn get(&self, company_id: Uuid) -> Result<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>("SELECT * FROM companies WHERE id = ?")
            .bind(company_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(Company::try_from).transpose()
    }

    pub async fn get_by_name(&self, name: &str) -> Result<Option<Company>> {
        let row = sqlx::query_as::<_, CompanyRow>("SELECT * FROM companies WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Company::try_from).transpose()
    }

    /// Fetch the existing record for a name or create a bare one.
    pub async fn get_or_create(&self, name: &str, website: Option<&str>) -> Result<Company> {
        if let Some(existing) = self.get_by_name(name).await? {
            return Ok(existing);
        }
        let mut company = Company::new(name);
        company.website = website.map(String::from);
        self.save(&company).await?;
        // Re-read in case a concurrent insert won the race.
        self.get_by_name(name)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("company {name}")))
    }
}
