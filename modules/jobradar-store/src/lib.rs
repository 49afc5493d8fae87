//! SQLite persistence: the work queue, scraping sources, companies, the
//! published match record, and dynamic settings.

pub mod companies;
pub mod error;
pub mod notify;
pub mod published;
pub mod queue;
pub mod schema;
pub mod settings;
pub mod sources;

pub use companies::CompaniesStore;
pub use error::{Result, StoreError};
pub use notify::{LogNotifier, NoopNotifier, QueueNotifier};
pub use published::{MatchFilters, MatchLineage, PublishedStore, SqlitePublishedStore};
pub use queue::QueueStore;
pub use settings::{AiSettings, QueueSettings, SchedulerSettings, SettingsStore, StopList};
pub use sources::SourcesStore;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

/// Open (creating if missing) the database at `path` and apply the schema.
pub async fn connect(path: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{path}"))
        .map_err(|e| StoreError::Database(e.to_string()))?
        .create_if_missing(true)
        .busy_timeout(std::time::Duration::from_secs(5))
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    schema::apply(&pool).await?;
    Ok(pool)
}

/// In-memory database for tests. A single connection keeps the database
/// alive for the pool's lifetime.
pub async fn connect_in_memory() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .map_err(|e| StoreError::Database(e.to_string()))?
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await?;

    schema::apply(&pool).await?;
    Ok(pool)
}
