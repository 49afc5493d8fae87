//! Structured logging setup. Every log line is one JSON object carrying
//! `severity`, `timestamp`, `environment`, `service`, and the per-event
//! `category`/`action` fields attached at each call site.

use std::fs::OpenOptions;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

/// Log categories used across the workspace. Attached at call sites as
/// `category = logging::QUEUE` so log pipelines can route on them.
pub const QUEUE: &str = "queue";
pub const PIPELINE: &str = "pipeline";
pub const SCRAPE: &str = "scrape";
pub const AI: &str = "ai";
pub const DATABASE: &str = "database";
pub const WORKER: &str = "worker";
pub const SYSTEM: &str = "system";

/// Initialise the global subscriber: JSON lines, env-filtered, to stdout or
/// the file named by `log_file`. Called once at worker start.
pub fn init(service: &str, environment: &str, log_level: &str, log_file: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("jobradar={log_level},warn")));

    let builder = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(false)
        .with_target(true);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .unwrap_or_else(|e| panic!("cannot open log file {path}: {e}"));
            builder.with_writer(Arc::new(file)).init();
        }
        None => builder.init(),
    }

    tracing::info!(
        category = SYSTEM,
        action = "logging_initialized",
        service,
        environment,
        "Structured logging initialised"
    );
}
