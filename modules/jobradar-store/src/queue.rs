use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use jobradar_common::{CompanyStage, PipelineState, QueueItem, QueueItemKind, QueueStatus};

use crate::error::{is_unique_violation, Result, StoreError};
use crate::notify::QueueNotifier;

// --- Row mapping ---

#[derive(sqlx::FromRow)]
struct QueueRow {
    id: String,
    #[sqlx(rename = "type")]
    kind: String,
    status: String,
    url: Option<String>,
    company_name: Option<String>,
    company_id: Option<String>,
    source: Option<String>,
    source_id: Option<String>,
    tracking_id: String,
    parent_item_id: Option<String>,
    company_sub_task: Option<String>,
    pipeline_state: Option<String>,
    scraped_data: Option<String>,
    scrape_config: Option<String>,
    metadata: Option<String>,
    retry_count: i64,
    max_retries: i64,
    result_message: Option<String>,
    error_details: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    processed_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    submitted_by: Option<String>,
}

fn parse_uuid(value: &str, field: &str) -> Result<Uuid> {
    value
        .parse()
        .map_err(|_| StoreError::Serialization(format!("invalid uuid in {field}: {value}")))
}

fn parse_opt_json<T: serde::de::DeserializeOwned>(raw: &Option<String>) -> Result<Option<T>> {
    match raw.as_deref().filter(|s| !s.is_empty()) {
        Some(s) => Ok(Some(serde_json::from_str(s)?)),
        None => Ok(None),
    }
}

impl TryFrom<QueueRow> for QueueItem {
    type Error = StoreError;

    fn try_from(row: QueueRow) -> Result<Self> {
        Ok(QueueItem {
            id: parse_uuid(&row.id, "id")?,
            kind: row
                .kind
                .parse::<QueueItemKind>()
                .map_err(StoreError::Serialization)?,
            status: row
                .status
                .parse::<QueueStatus>()
                .map_err(StoreError::Serialization)?,
            url: row.url,
            company_name: row.company_name,
            company_id: row
                .company_id
                .as_deref()
                .map(|v| parse_uuid(v, "company_id"))
                .transpose()?,
            source: row.source,
            source_id: row
                .source_id
                .as_deref()
                .map(|v| parse_uuid(v, "source_id"))
                .transpose()?,
            tracking_id: parse_uuid(&row.tracking_id, "tracking_id")?,
            parent_item_id: row
                .parent_item_id
                .as_deref()
                .map(|v| parse_uuid(v, "parent_item_id"))
                .transpose()?,
            company_sub_task: row
                .company_sub_task
                .as_deref()
                .map(|v| v.parse::<CompanyStage>().map_err(StoreError::Serialization))
                .transpose()?,
            pipeline_state: parse_opt_json(&row.pipeline_state)?,
            scraped_data: parse_opt_json(&row.scraped_data)?,
            scrape_config: parse_opt_json(&row.scrape_config)?,
            metadata: parse_opt_json(&row.metadata)?,
            retry_count: row.retry_count as u32,
            max_retries: row.max_retries as u32,
            result_message: row.result_message,
            error_details: row.error_details,
            created_at: row.created_at,
            updated_at: row.updated_at,
            processed_at: row.processed_at,
            completed_at: row.completed_at,
            submitted_by: row.submitted_by,
        })
    }
}

fn to_json_column<T: serde::Serialize>(value: &Option<T>) -> Result<Option<String>> {
    value
        .as_ref()
        .map(|v| serde_json::to_string(v).map_err(StoreError::from))
        .transpose()
}

// --- Queue store ---

/// Durable row-per-item work queue. All status transitions go through here;
/// every mutation emits an event through the injected notifier.
#[derive(Clone)]
pub struct QueueStore {
    pool: SqlitePool,
    notifier: Arc<dyn QueueNotifier>,
}

impl QueueStore {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn QueueNotifier>) -> Self {
        Self { pool, notifier }
    }

    // --- CRUD ---

    pub async fn add_item(&self, item: &QueueItem) -> Result<Uuid> {
        let result = sqlx::query(
            r#"
            INSERT INTO job_queue (
                id, type, status, url, company_name, company_id, source, source_id,
                tracking_id, parent_item_id, company_sub_task, pipeline_state,
                scraped_data, scrape_config, metadata, retry_count, max_retries,
                result_message, error_details, created_at, updated_at,
                processed_at, completed_at, submitted_by
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.id.to_string())
        .bind(item.kind.to_string())
        .bind(item.status.to_string())
        .bind(&item.url)
        .bind(&item.company_name)
        .bind(item.company_id.map(|v| v.to_string()))
        .bind(&item.source)
        .bind(item.source_id.map(|v| v.to_string()))
        .bind(item.tracking_id.to_string())
        .bind(item.parent_item_id.map(|v| v.to_string()))
        .bind(item.company_sub_task.map(|v| v.to_string()))
        .bind(to_json_column(&item.pipeline_state)?)
        .bind(to_json_column(&item.scraped_data)?)
        .bind(to_json_column(&item.scrape_config)?)
        .bind(to_json_column(&item.metadata)?)
        .bind(item.retry_count as i64)
        .bind(item.max_retries as i64)
        .bind(&item.result_message)
        .bind(&item.error_details)
        .bind(item.created_at)
        .bind(item.updated_at)
        .bind(item.processed_at)
        .bind(item.completed_at)
        .bind(&item.submitted_by)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                info!(
                    category = "queue",
                    action = "item_created",
                    item_id = %item.id,
                    kind = %item.kind,
                    "Added queue item"
                );
                self.notifier.send_event(
                    "item.created",
                    serde_json::json!({ "queueItem": serde_json::to_value(item)? }),
                );
                Ok(item.id)
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateQueueItem(
                item.url.clone().unwrap_or_default(),
            )),
            Err(e) => Err(e.into()),
        }
    }

    /// Oldest-first batch of pending items.
    pub async fn get_pending_items(&self, limit: u32) -> Result<Vec<QueueItem>> {
        let rows = sqlx::query_as::<_, QueueRow>(
            r#"
            SELECT * FROM job_queue
            WHERE status = ?
            ORDER BY datetime(updated_at) ASC, updated_at ASC
            LIMIT ?
            "#,
        )
        .bind(QueueStatus::Pending.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QueueItem::try_from).collect()
    }

    /// Atomic status transition. PROCESSING sets `processed_at`; terminal
    /// statuses set `completed_at`; everything writes `updated_at`.
    pub async fn update_status(
        &self,
        item_id: Uuid,
        status: QueueStatus,
        result_message: Option<&str>,
        error_details: Option<&str>,
    ) -> Result<()> {
        let now = Utc::now();
        let set_processed = status == QueueStatus::Processing;
        let set_completed = status.is_terminal();

        sqlx::query(
            r#"
            UPDATE job_queue SET
                status = ?,
                updated_at = ?,
                result_message = COALESCE(?, result_message),
                error_details = COALESCE(?, error_details),
                processed_at = CASE WHEN ? THEN ? ELSE processed_at END,
                completed_at = CASE WHEN ? THEN ? ELSE completed_at END
            WHERE id = ?
            "#,
        )
        .bind(status.to_string())
        .bind(now)
        .bind(result_message)
        .bind(error_details)
        .bind(set_processed)
        .bind(now)
        .bind(set_completed)
        .bind(now)
        .bind(item_id.to_string())
        .execute(&self.pool)
        .await?;

        debug!(
            category = "queue",
            action = "status_updated",
            item_id = %item_id,
            status = %status,
            "Updated queue item"
        );
        self.notify_item_updated(item_id).await;
        Ok(())
    }

    pub async fn get_item(&self, item_id: Uuid) -> Result<Option<QueueItem>> {
        let row = sqlx::query_as::<_, QueueRow>("SELECT * FROM job_queue WHERE id = ?")
            .bind(item_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(QueueItem::try_from).transpose()
    }

    async fn notify_item_updated(&self, item_id: Uuid) {
        match self.get_item(item_id).await {
            Ok(Some(item)) => {
                if let Ok(payload) = serde_json::to_value(&item) {
                    self.notifier
                        .send_event("item.updated", serde_json::json!({ "queueItem": payload }));
                }
            }
            Ok(None) => {}
            Err(e) => warn!(
                category = "queue",
                item_id = %item_id,
                error = %e,
                "Failed to load item for update notification"
            ),
        }
    }

    pub async fn url_exists(&self, url: &str) -> Result<bool> {
        let row = sqlx::query_scalar::<_, i64>("SELECT 1 FROM job_queue WHERE url = ? LIMIT 1")
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    pub async fn stats(&self) -> Result<HashMap<String, i64>> {
        let mut stats: HashMap<String, i64> = QueueStatus::ALL
            .iter()
            .map(|s| (s.to_string(), 0))
            .collect();
        stats.insert("total".to_string(), 0);

        let rows = sqlx::query_as::<_, (String, i64)>(
            "SELECT status, COUNT(*) FROM job_queue GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        for (status, count) in rows {
            stats.insert(status, count);
            *stats.get_mut("total").unwrap() += count;
        }
        Ok(stats)
    }

    /// Handle an inbound command event from the notifier bridge. Currently
    /// only cancellation, which lands the item in SKIPPED.
    pub async fn handle_command(&self, command: &serde_json::Value) -> Result<()> {
        if command.get("event").and_then(|v| v.as_str()) == Some("command.cancel") {
            if let Some(item_id) = command
                .get("itemId")
                .and_then(|v| v.as_str())
                .and_then(|v| v.parse::<Uuid>().ok())
            {
                self.update_status(
                    item_id,
                    QueueStatus::Skipped,
                    Some("Cancelled by user (command)"),
                    None,
                )
                .await?;
            }
        }
        Ok(())
    }

    /// Reset a FAILED item to PENDING for another attempt, clearing the
    /// processing timestamps and error details.
    pub async fn retry_item(&self, item_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE job_queue
            SET status = ?, updated_at = ?, processed_at = NULL,
                completed_at = NULL, error_details = NULL
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(QueueStatus::Pending.to_string())
        .bind(Utc::now())
        .bind(item_id.to_string())
        .bind(QueueStatus::Failed.to_string())
        .execute(&self.pool)
        .await?;

        let reset = result.rows_affected() > 0;
        if reset {
            info!(
                category = "queue",
                action = "item_retried",
                item_id = %item_id,
                "Reset queue item to pending for retry"
            );
            self.notify_item_updated(item_id).await;
        }
        Ok(reset)
    }

    pub async fn increment_retry(&self, item_id: Uuid) -> Result<()> {
        sqlx::query("UPDATE job_queue SET retry_count = retry_count + 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_item(&self, item_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM job_queue WHERE id = ?")
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await?;
        let deleted = result.rows_affected() > 0;
        if deleted {
            info!(category = "queue", action = "item_deleted", item_id = %item_id, "Deleted queue item");
            self.notifier
                .send_event("item.deleted", serde_json::json!({ "queueItemId": item_id }));
        }
        Ok(deleted)
    }

    // --- Loop prevention + spawn helpers ---

    async fn items_by_tracking_id(
        &self,
        tracking_id: Uuid,
        status_filter: &[QueueStatus],
    ) -> Result<Vec<QueueItem>> {
        let rows = sqlx::query_as::<_, QueueRow>("SELECT * FROM job_queue WHERE tracking_id = ?")
            .bind(tracking_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        let items: Vec<QueueItem> = rows
            .into_iter()
            .map(QueueItem::try_from)
            .collect::<Result<_>>()?;

        if status_filter.is_empty() {
            return Ok(items);
        }
        Ok(items
            .into_iter()
            .filter(|i| status_filter.contains(&i.status))
            .collect())
    }

    /// True when an enrichment task for this company is already pending,
    /// processing, or recently succeeded, regardless of lineage. The JOB
    /// analyse stage uses this to avoid duplicate company spawns.
    pub async fn has_active_company_task(&self, company_name: &str) -> Result<bool> {
        let row = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT 1 FROM job_queue
            WHERE type = 'company' AND company_name = ?
              AND (status IN ('pending', 'processing')
                   OR (status = 'success' AND datetime(completed_at) >= datetime('now', '-1 day')))
            LIMIT 1
            "#,
        )
        .bind(company_name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    pub async fn has_pending_work_for_url(
        &self,
        url: &str,
        kind: QueueItemKind,
        tracking_id: Uuid,
    ) -> Result<bool> {
        let row = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT 1 FROM job_queue
            WHERE tracking_id = ? AND url = ? AND type = ? AND status IN (?, ?)
            LIMIT 1
            "#,
        )
        .bind(tracking_id.to_string())
        .bind(url)
        .bind(kind.to_string())
        .bind(QueueStatus::Pending.to_string())
        .bind(QueueStatus::Processing.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.is_some())
    }

    /// Loop prevention: a spawn is denied when matching work is already
    /// queued, already failed/filtered/skipped, or already succeeded within
    /// the same lineage.
    pub async fn can_spawn_item(
        &self,
        current: &QueueItem,
        target_url: &str,
        target_kind: QueueItemKind,
    ) -> Result<(bool, String)> {
        if self
            .has_pending_work_for_url(target_url, target_kind, current.tracking_id)
            .await?
        {
            return Ok((false, format!("Duplicate work already queued for {target_url}")));
        }

        let terminal = self
            .items_by_tracking_id(
                current.tracking_id,
                &[QueueStatus::Filtered, QueueStatus::Skipped, QueueStatus::Failed],
            )
            .await?;
        for item in &terminal {
            if item.url.as_deref() == Some(target_url) && item.kind == target_kind {
                return Ok((false, format!("Already in terminal state ({})", item.status)));
            }
        }

        let completed = self
            .items_by_tracking_id(current.tracking_id, &[QueueStatus::Success])
            .await?;
        for item in &completed {
            if item.url.as_deref() == Some(target_url) && item.kind == target_kind {
                return Ok((false, "Already completed successfully".to_string()));
            }
        }

        Ok((true, "OK".to_string()))
    }

    /// Spawn a child item under the parent's lineage if loop prevention
    /// allows it. Returns `None` when the spawn was blocked.
    pub async fn spawn_item_safely(
        &self,
        current: &QueueItem,
        mut child: QueueItem,
    ) -> Result<Option<Uuid>> {
        let target_url = child.url.clone().unwrap_or_default();
        let (can_spawn, reason) = self.can_spawn_item(current, &target_url, child.kind).await?;
        if !can_spawn {
            warn!(category = "queue", action = "spawn_blocked", reason = %reason, "Blocked spawn");
            return Ok(None);
        }

        child.tracking_id = current.tracking_id;
        child.parent_item_id = Some(current.id);
        self.add_item(&child).await.map(Some)
    }

    /// Spawn the next company-pipeline step as a new item. When the unique
    /// URL constraint blocks a granular step, fall back to requeueing the
    /// same item in place with the sub-task advanced.
    pub async fn spawn_next_pipeline_step(
        &self,
        current: &QueueItem,
        next_sub_task: CompanyStage,
        pipeline_state: Option<PipelineState>,
    ) -> Result<Option<Uuid>> {
        let mut child = QueueItem::new(QueueItemKind::Company);
        child.url = current.url.clone();
        child.company_name = current.company_name.clone();
        child.company_id = current.company_id;
        child.source = current.source.clone();
        child.company_sub_task = Some(next_sub_task);
        child.pipeline_state = pipeline_state.clone();

        match self.spawn_item_safely(current, child).await {
            Ok(Some(spawned)) => Ok(Some(spawned)),
            // The company URL is occupied, either by this very item (loop
            // prevention) or by the table-wide unique constraint. Granular
            // steps then advance the same row in place.
            Ok(None) | Err(StoreError::DuplicateQueueItem(_)) => {
                self.requeue_company_step(current.id, next_sub_task, pipeline_state)
                    .await?;
                debug!(
                    category = "queue",
                    action = "company_requeued_in_place",
                    item_id = %current.id,
                    sub_task = %next_sub_task,
                    "Requeued company item in place"
                );
                Ok(Some(current.id))
            }
            Err(e) => Err(e),
        }
    }

    /// Advance a company item in place: next sub-task, new state, back to
    /// PENDING.
    pub async fn requeue_company_step(
        &self,
        item_id: Uuid,
        next_sub_task: CompanyStage,
        pipeline_state: Option<PipelineState>,
    ) -> Result<()> {
        let state_json = serde_json::to_string(&pipeline_state.unwrap_or_default())?;
        sqlx::query(
            r#"
            UPDATE job_queue
            SET company_sub_task = ?, pipeline_state = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(next_sub_task.to_string())
        .bind(state_json)
        .bind(QueueStatus::Pending.to_string())
        .bind(Utc::now())
        .bind(item_id.to_string())
        .execute(&self.pool)
        .await?;

        self.notify_item_updated(item_id).await;
        Ok(())
    }

    /// Requeue an item in place with new pipeline state so the next poll
    /// picks up the following stage.
    pub async fn requeue_with_state(&self, item_id: Uuid, state: &PipelineState) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE job_queue
            SET pipeline_state = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(serde_json::to_string(state)?)
        .bind(QueueStatus::Pending.to_string())
        .bind(Utc::now())
        .bind(item_id.to_string())
        .execute(&self.pool)
        .await?;

        self.notify_item_updated(item_id).await;
        Ok(())
    }

    /// Persist scraped data on an item outside a status transition. Used by
    /// the scrape stage when it stores its payload before requeueing.
    pub async fn set_scraped_data(&self, item_id: Uuid, data: &serde_json::Value) -> Result<()> {
        sqlx::query("UPDATE job_queue SET scraped_data = ?, updated_at = ? WHERE id = ?")
            .bind(serde_json::to_string(data)?)
            .bind(Utc::now())
            .bind(item_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for QueueStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueStore").finish_non_exhaustive()
    }
}

// Error paths that callers promote to log-and-continue rather than failing
// the poll loop live in the worker; the store stays strict.
impl QueueStore {
    /// Like `get_pending_items` but logs and returns an empty batch on
    /// database errors so the poll loop never stalls on a bad read.
    pub async fn get_pending_items_or_empty(&self, limit: u32) -> Vec<QueueItem> {
        match self.get_pending_items(limit).await {
            Ok(items) => items,
            Err(e) => {
                error!(
                    category = "database",
                    action = "get_pending_failed",
                    error = %e,
                    "Failed to fetch pending items"
                );
                Vec::new()
            }
        }
    }
}
