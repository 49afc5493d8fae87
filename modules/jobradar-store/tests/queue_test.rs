use std::sync::Arc;

use jobradar_common::{
    CompanyStage, JobPosting, MatchAnalysis, PipelineState, QueueItem, QueueItemKind, QueueStatus,
};
use jobradar_store::{
    connect_in_memory, MatchFilters, MatchLineage, NoopNotifier, PublishedStore, QueueStore,
    SqlitePublishedStore, StoreError,
};

async fn queue() -> QueueStore {
    let pool = connect_in_memory().await.unwrap();
    QueueStore::new(pool, Arc::new(NoopNotifier))
}

#[tokio::test]
async fn processing_sets_processed_at_and_terminal_sets_completed_at() {
    let store = queue().await;
    let item = QueueItem::job("https://example.com/jobs/1");
    store.add_item(&item).await.unwrap();

    store
        .update_status(item.id, QueueStatus::Processing, None, None)
        .await
        .unwrap();
    let processing = store.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(processing.status, QueueStatus::Processing);
    assert!(processing.processed_at.is_some());
    assert!(processing.completed_at.is_none());

    store
        .update_status(item.id, QueueStatus::Success, Some("done"), None)
        .await
        .unwrap();
    let done = store.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(done.status, QueueStatus::Success);
    assert!(done.completed_at.is_some());
    assert_eq!(done.result_message.as_deref(), Some("done"));
}

#[tokio::test]
async fn duplicate_url_insert_raises_typed_error_without_growing_store() {
    let store = queue().await;
    let first = QueueItem::job("https://example.com/jobs/dup");
    store.add_item(&first).await.unwrap();

    let second = QueueItem::job("https://example.com/jobs/dup");
    let err = store.add_item(&second).await.unwrap_err();
    assert!(matches!(err, StoreError::DuplicateQueueItem(_)));

    let stats = store.stats().await.unwrap();
    assert_eq!(stats["total"], 1);
}

#[tokio::test]
async fn retry_resets_timestamps_and_error_details() {
    let store = queue().await;
    let item = QueueItem::job("https://example.com/jobs/retry");
    store.add_item(&item).await.unwrap();

    store
        .update_status(item.id, QueueStatus::Processing, None, None)
        .await
        .unwrap();
    store
        .update_status(item.id, QueueStatus::Failed, Some("boom"), Some("stack trace"))
        .await
        .unwrap();

    assert!(store.retry_item(item.id).await.unwrap());
    let reset = store.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(reset.status, QueueStatus::Pending);
    assert!(reset.processed_at.is_none());
    assert!(reset.completed_at.is_none());
    assert!(reset.error_details.is_none());

    // Only FAILED items are retryable.
    assert!(!store.retry_item(item.id).await.unwrap());
}

#[tokio::test]
async fn get_pending_returns_oldest_first() {
    let store = queue().await;
    for i in 0..5 {
        let item = QueueItem::job(format!("https://example.com/jobs/{i}"));
        store.add_item(&item).await.unwrap();
        // Space the updated_at stamps out so the ordering is unambiguous.
        tokio::time::sleep(std::time::Duration::from_millis(1100)).await;
    }

    let items = store.get_pending_items(10).await.unwrap();
    assert_eq!(items.len(), 5);
    for pair in items.windows(2) {
        assert!(pair[0].updated_at <= pair[1].updated_at);
    }
    assert_eq!(items[0].url.as_deref(), Some("https://example.com/jobs/0"));
}

#[tokio::test]
async fn spawn_is_denied_within_lineage_for_pending_terminal_and_success() {
    let store = queue().await;
    let parent = QueueItem::job("https://example.com/jobs/parent");
    store.add_item(&parent).await.unwrap();

    // Pending child blocks a second spawn of the same url+type.
    let mut child = QueueItem::job("https://example.com/jobs/child");
    child.tracking_id = parent.tracking_id;
    let spawned = store.spawn_item_safely(&parent, child).await.unwrap();
    let child_id = spawned.expect("first spawn should succeed");

    let blocked = store
        .spawn_item_safely(&parent, QueueItem::job("https://example.com/jobs/child"))
        .await
        .unwrap();
    assert!(blocked.is_none());

    // Terminal state also blocks respawn.
    store
        .update_status(child_id, QueueStatus::Filtered, Some("rejected"), None)
        .await
        .unwrap();
    let (can, reason) = store
        .can_spawn_item(&parent, "https://example.com/jobs/child", QueueItemKind::Job)
        .await
        .unwrap();
    assert!(!can);
    assert!(reason.contains("terminal"));

    // Lineage is inherited.
    let child = store.get_item(child_id).await.unwrap().unwrap();
    assert_eq!(child.tracking_id, parent.tracking_id);
    assert_eq!(child.parent_item_id, Some(parent.id));
}

#[tokio::test]
async fn company_step_falls_back_to_in_place_requeue_on_duplicate_url() {
    let store = queue().await;
    let mut parent = QueueItem::company("Acme", CompanyStage::Fetch);
    parent.url = Some("https://acme.example".to_string());
    store.add_item(&parent).await.unwrap();
    store
        .update_status(parent.id, QueueStatus::Processing, None, None)
        .await
        .unwrap();

    // Spawning the next step reuses the same URL, so the unique constraint
    // forces the in-place fallback.
    let parent = store.get_item(parent.id).await.unwrap().unwrap();
    let id = store
        .spawn_next_pipeline_step(&parent, CompanyStage::Extract, Some(PipelineState::default()))
        .await
        .unwrap();
    assert_eq!(id, Some(parent.id));

    let requeued = store.get_item(parent.id).await.unwrap().unwrap();
    assert_eq!(requeued.status, QueueStatus::Pending);
    assert_eq!(requeued.company_sub_task, Some(CompanyStage::Extract));
}

#[tokio::test]
async fn cancel_command_skips_item() {
    let store = queue().await;
    let item = QueueItem::job("https://example.com/jobs/cancel");
    store.add_item(&item).await.unwrap();

    store
        .handle_command(&serde_json::json!({
            "event": "command.cancel",
            "itemId": item.id.to_string(),
        }))
        .await
        .unwrap();

    let cancelled = store.get_item(item.id).await.unwrap().unwrap();
    assert_eq!(cancelled.status, QueueStatus::Skipped);
    assert!(cancelled.completed_at.is_some());
}

// --- Published store ---

fn sample_job(url: &str) -> JobPosting {
    JobPosting {
        title: "Senior Software Engineer".into(),
        company: "Acme".into(),
        company_website: "https://acme.example".into(),
        location: "Remote".into(),
        description: "Build things".into(),
        url: url.into(),
        posted_date: None,
        salary: None,
    }
}

#[tokio::test]
async fn save_match_is_idempotent_per_normalized_url() {
    let pool = connect_in_memory().await.unwrap();
    let published = SqlitePublishedStore::new(pool);

    let analysis = MatchAnalysis::default();
    let first = published
        .save_match(
            &sample_job("https://example.com/jobs/1?utm_source=feed"),
            &analysis,
            88,
            MatchLineage::default(),
        )
        .await
        .unwrap();
    let second = published
        .save_match(
            &sample_job("https://example.com/jobs/1"),
            &analysis,
            88,
            MatchLineage::default(),
        )
        .await
        .unwrap();
    assert_eq!(first, second);

    let matches = published.get_matches(MatchFilters::default()).await.unwrap();
    assert_eq!(matches.len(), 1);
    let (listing, job_match) = &matches[0];
    assert_eq!(listing.url, "https://example.com/jobs/1");
    assert_eq!(listing.role, "Software Engineer");
    assert_eq!(job_match.match_score, 88);

    assert!(published
        .job_exists("https://example.com/jobs/1?utm_source=other")
        .await
        .unwrap());
    assert!(!published.job_exists("https://example.com/jobs/2").await.unwrap());
}
