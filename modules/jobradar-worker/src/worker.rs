//! The poll loop: fetch a batch of pending items oldest-first, process
//! them sequentially, sleep, repeat. Graceful shutdown lets the in-flight
//! item finish before the loop exits.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::context::ProcessorContext;
use crate::dispatcher::Dispatcher;

pub struct WorkerState {
    pub running: AtomicBool,
    pub shutdown_requested: AtomicBool,
    pub items_processed_total: AtomicU64,
    pub poll_interval_secs: AtomicU64,
    pub last_poll_time: RwLock<Option<DateTime<Utc>>>,
    pub started_at: DateTime<Utc>,
}

impl WorkerState {
    pub fn new(poll_interval_secs: u64) -> Arc<Self> {
        Arc::new(Self {
            running: AtomicBool::new(true),
            shutdown_requested: AtomicBool::new(false),
            items_processed_total: AtomicU64::new(0),
            poll_interval_secs: AtomicU64::new(poll_interval_secs),
            last_poll_time: RwLock::new(None),
            started_at: Utc::now(),
        })
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

pub struct Worker {
    ctx: ProcessorContext,
    dispatcher: Dispatcher,
    state: Arc<WorkerState>,
}

impl Worker {
    pub fn new(ctx: ProcessorContext, state: Arc<WorkerState>) -> Self {
        let dispatcher = Dispatcher::new(ctx.clone());
        Self {
            ctx,
            dispatcher,
            state,
        }
    }

    /// Pull the dynamic poll interval and batch size for this iteration.
    async fn poll_settings(&self) -> (u64, u32) {
        let interval = match self.ctx.settings.scheduler_settings().await {
            Ok(s) => s.poll_interval_seconds.max(5),
            Err(e) => {
                warn!(category = "worker", error = %e, "Failed to load scheduler settings");
                self.state.poll_interval_secs.load(Ordering::SeqCst)
            }
        };
        self.state.poll_interval_secs.store(interval, Ordering::SeqCst);

        let batch = self
            .ctx
            .settings
            .queue_settings()
            .await
            .map(|s| s.batch_size.max(1))
            .unwrap_or(10);
        (interval, batch)
    }

    pub async fn run(self) {
        info!(category = "worker", action = "worker_started", "Worker poll loop started");

        loop {
            if self.state.is_shutdown_requested() {
                break;
            }
            if !self.state.running.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }

            let (interval, batch_size) = self.poll_settings().await;
            *self.state.last_poll_time.write().unwrap() = Some(Utc::now());

            let items = self.ctx.queue.get_pending_items_or_empty(batch_size).await;
            if !items.is_empty() {
                info!(
                    category = "worker",
                    action = "batch_fetched",
                    count = items.len(),
                    "Processing batch"
                );
            }

            for item in &items {
                // Shutdown is observed between items; the current stage
                // always completes.
                if self.state.is_shutdown_requested() {
                    break;
                }
                self.dispatcher.process_item(item).await;
                self.state
                    .items_processed_total
                    .fetch_add(1, Ordering::SeqCst);
            }

            self.sleep_interruptibly(Duration::from_secs(interval)).await;
        }

        info!(category = "worker", action = "worker_stopped", "Worker poll loop exited");
    }

    /// Sleep in one-second slices so shutdown and stop requests are seen
    /// promptly.
    async fn sleep_interruptibly(&self, total: Duration) {
        let mut remaining = total;
        while !remaining.is_zero() {
            if self.state.is_shutdown_requested() || !self.state.running.load(Ordering::SeqCst) {
                return;
            }
            let step = remaining.min(Duration::from_secs(1));
            tokio::time::sleep(step).await;
            remaining -= step;
        }
    }
}
