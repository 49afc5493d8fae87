use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};

use ai_client::{AnthropicProvider, InferenceClient, InferenceProvider, OpenAiProvider};
use jobradar_common::{logging, Config, Profile};
use jobradar_scrapers::HttpFetcher;
use jobradar_store::{
    CompaniesStore, LogNotifier, QueueStore, SettingsStore, SourcesStore, SqlitePublishedStore,
};
use jobradar_worker::admin::{self, AdminState};
use jobradar_worker::ai::{AiCompanyInfoAgent, AiExtractor, AiMatcher, AiSourceAnalyst};
use jobradar_worker::context::DefaultScraperFactory;
use jobradar_worker::{ProcessorContext, Worker, WorkerState};

#[derive(Parser, Debug)]
#[command(name = "jobradar-worker", about = "Queue worker for the jobradar pipeline")]
struct Args {
    /// Override the SQLite database path (else SQLITE_DB_PATH).
    #[arg(long)]
    db: Option<String>,
    /// Override the admin bind host (else WORKER_HOST).
    #[arg(long)]
    host: Option<String>,
    /// Override the admin port (else WORKER_PORT).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();

    if args.db.is_none()
        && std::env::var("SQLITE_DB_PATH").is_err()
        && std::env::var("JF_SQLITE_DB_PATH").is_err()
    {
        bail!("SQLITE_DB_PATH (or JF_SQLITE_DB_PATH, or --db) is required");
    }
    if let Some(db) = &args.db {
        std::env::set_var("SQLITE_DB_PATH", db);
    }

    let mut config = Config::worker_from_env();
    if let Some(host) = args.host {
        config.worker_host = host;
    }
    if let Some(port) = args.port {
        config.worker_port = port;
    }

    logging::init(
        "jobradar-worker",
        &config.environment,
        &config.log_level,
        config.log_file.as_deref(),
    );
    config.log_redacted();

    // Storage.
    let pool = jobradar_store::connect(&config.sqlite_db_path)
        .await
        .context("failed to open database")?;
    let queue = QueueStore::new(pool.clone(), Arc::new(LogNotifier));
    let sources = SourcesStore::new(pool.clone());
    let companies = CompaniesStore::new(pool.clone());
    let published = Arc::new(SqlitePublishedStore::new(pool.clone()));
    let settings = SettingsStore::new(pool);

    // Inference: provider chain from the dynamic AI settings, keys from env.
    let ai_settings = settings.ai_settings().await?;
    let mut providers: Vec<Arc<dyn InferenceProvider>> = Vec::new();
    for name in &ai_settings.providers {
        match name.as_str() {
            "anthropic" if !config.anthropic_api_key.is_empty() => {
                providers.push(Arc::new(AnthropicProvider::new(
                    &config.anthropic_api_key,
                    ai_settings.model.as_deref(),
                )));
            }
            "openai" if !config.openai_api_key.is_empty() => {
                providers.push(Arc::new(OpenAiProvider::new(
                    &config.openai_api_key,
                    ai_settings.model.as_deref(),
                )));
            }
            other => warn!(
                category = "ai",
                provider = other,
                "Provider unavailable (unknown name or missing API key)"
            ),
        }
    }
    if providers.is_empty() {
        warn!(
            category = "ai",
            "No inference providers configured; extraction and analysis stages will fail"
        );
    }
    let inference = Arc::new(InferenceClient::new().with_default_chain(providers));

    // Renderer (optional collaborator).
    let renderer = config
        .renderer_url
        .as_deref()
        .map(|url| Arc::new(renderer_client::RendererClient::new(url, renderer_client::DEFAULT_MAX_CONCURRENCY)));

    // Profile.
    let profile = load_profile(config.config_path.as_deref())?;
    info!(
        category = "system",
        profile = %profile.name,
        skills = profile.skills.len(),
        "Profile loaded"
    );

    let fetcher = HttpFetcher::new();
    let ctx = ProcessorContext {
        queue: queue.clone(),
        sources,
        companies,
        published,
        settings: settings.clone(),
        extractor: Arc::new(AiExtractor::new(inference.clone())),
        matcher: Arc::new(AiMatcher::new(inference.clone())),
        company_info: Arc::new(AiCompanyInfoAgent::new(inference.clone())),
        source_analyst: Arc::new(AiSourceAnalyst::new(inference)),
        scrapers: Arc::new(DefaultScraperFactory {
            fetcher: fetcher.clone(),
            renderer: renderer.clone(),
        }),
        fetcher,
        renderer,
        profile,
    };

    let scheduler = settings.scheduler_settings().await?;
    let state = WorkerState::new(scheduler.poll_interval_seconds.max(5));

    // Admin surface.
    let admin_state = Arc::new(AdminState {
        worker: state.clone(),
        queue,
        settings,
    });
    let bind_addr = format!("{}:{}", config.worker_host, config.worker_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind admin surface on {bind_addr}"))?;
    info!(category = "worker", addr = %bind_addr, "Admin surface listening");

    let admin_task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, admin::router(admin_state)).await {
            warn!(category = "worker", error = %e, "Admin surface exited");
        }
    });

    // Poll loop + signal-driven graceful shutdown.
    let worker = Worker::new(ctx, state.clone());
    let worker_task = tokio::spawn(worker.run());

    wait_for_shutdown_signal().await;
    info!(category = "worker", action = "shutdown_requested", "Shutdown signal received");
    state.request_shutdown();

    worker_task.await.ok();
    admin_task.abort();
    info!(category = "worker", action = "shutdown_complete", "Worker shut down cleanly");
    Ok(())
}

fn load_profile(config_path: Option<&str>) -> Result<Profile> {
    let Some(path) = config_path else {
        warn!(category = "system", "CONFIG_PATH not set, using an empty profile");
        return Ok(Profile::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read profile config {path}"))?;
    let doc: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {path}"))?;
    let profile = doc.get("profile").cloned().unwrap_or(doc);
    serde_json::from_value(profile).context("profile section did not match schema")
}

async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
