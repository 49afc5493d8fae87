//! Minimal unauthenticated admin surface: health, queue status, worker
//! lifecycle, and dynamic config reload. Bind host is configurable so the
//! surface can stay loopback-only.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use jobradar_store::{QueueStore, SchedulerSettings, SettingsStore};

use crate::worker::WorkerState;

pub struct AdminState {
    pub worker: Arc<WorkerState>,
    pub queue: QueueStore,
    pub settings: SettingsStore,
}

pub fn router(state: Arc<AdminState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/start", post(start))
        .route("/stop", post(stop))
        .route("/restart", post(restart))
        .route("/config/reload", post(config_reload))
        .route("/config", get(config_get).post(config_set))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<Arc<AdminState>>) -> Json<serde_json::Value> {
    let last_poll = state
        .worker
        .last_poll_time
        .read()
        .unwrap()
        .map(|t| t.to_rfc3339());
    Json(json!({
        "running": state.worker.running.load(Ordering::SeqCst),
        "itemsProcessed": state.worker.items_processed_total.load(Ordering::SeqCst),
        "lastPollTime": last_poll,
    }))
}

async fn status(State(state): State<Arc<AdminState>>) -> Json<serde_json::Value> {
    let stats = state.queue.stats().await.unwrap_or_default();
    Json(json!({
        "queue": stats,
        "uptimeSeconds": state.worker.uptime_seconds(),
    }))
}

async fn start(State(state): State<Arc<AdminState>>) -> Json<serde_json::Value> {
    state.worker.running.store(true, Ordering::SeqCst);
    info!(category = "worker", action = "start_requested", "Worker started via admin");
    Json(json!({"running": true}))
}

async fn stop(State(state): State<Arc<AdminState>>) -> Json<serde_json::Value> {
    state.worker.running.store(false, Ordering::SeqCst);
    info!(category = "worker", action = "stop_requested", "Worker stopped via admin");
    Json(json!({"running": false}))
}

async fn restart(State(state): State<Arc<AdminState>>) -> Json<serde_json::Value> {
    state.worker.running.store(false, Ordering::SeqCst);
    state.worker.running.store(true, Ordering::SeqCst);
    info!(category = "worker", action = "restart_requested", "Worker restarted via admin");
    Json(json!({"running": true}))
}

/// Re-read dynamic settings from the database into the running worker.
async fn config_reload(State(state): State<Arc<AdminState>>) -> Json<serde_json::Value> {
    match state.settings.scheduler_settings().await {
        Ok(scheduler) => {
            state
                .worker
                .poll_interval_secs
                .store(scheduler.poll_interval_seconds.max(5), Ordering::SeqCst);
            let ai = state.settings.ai_settings().await.ok();
            info!(category = "worker", action = "config_reloaded", "Dynamic settings reloaded");
            Json(json!({
                "pollIntervalSeconds": scheduler.poll_interval_seconds,
                "minMatchScore": ai.as_ref().map(|a| a.min_match_score),
                "providers": ai.map(|a| a.providers),
            }))
        }
        Err(e) => Json(json!({"error": e.to_string()})),
    }
}

async fn config_get(State(state): State<Arc<AdminState>>) -> Json<serde_json::Value> {
    Json(json!({
        "pollIntervalSeconds": state.worker.poll_interval_secs.load(Ordering::SeqCst),
    }))
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigUpdate {
    poll_interval_seconds: u64,
}

async fn config_set(
    State(state): State<Arc<AdminState>>,
    Json(update): Json<ConfigUpdate>,
) -> Json<serde_json::Value> {
    let interval = update.poll_interval_seconds.max(5);
    state
        .worker
        .poll_interval_secs
        .store(interval, Ordering::SeqCst);
    let persisted = state
        .settings
        .set(
            "scheduler",
            &SchedulerSettings {
                poll_interval_seconds: interval,
            },
        )
        .await
        .is_ok();
    Json(json!({"pollIntervalSeconds": interval, "persisted": persisted}))
}
