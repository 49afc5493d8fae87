use std::env;

/// Process configuration loaded from environment variables. Dynamic settings
/// (poll interval, filter policy, provider order) live in the database and
/// are loaded separately so they can be reloaded without a restart.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file.
    pub sqlite_db_path: String,

    // Admin HTTP surface
    pub worker_host: String,
    pub worker_port: u16,

    // Logging
    pub environment: String,
    pub log_level: String,
    pub log_file: Option<String>,

    // Optional static config file (profile, defaults)
    pub config_path: Option<String>,

    // Collaborators
    pub renderer_url: Option<String>,
    pub anthropic_api_key: String,
    pub openai_api_key: String,
}

impl Config {
    /// Load worker configuration. Panics with a clear message when the
    /// database path is missing.
    pub fn worker_from_env() -> Self {
        let sqlite_db_path = env::var("SQLITE_DB_PATH")
            .or_else(|_| env::var("JF_SQLITE_DB_PATH"))
            .unwrap_or_else(|_| {
                panic!("SQLITE_DB_PATH (or JF_SQLITE_DB_PATH) environment variable is required")
            });

        Self {
            sqlite_db_path,
            worker_host: env::var("WORKER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            worker_port: env::var("WORKER_PORT")
                .unwrap_or_else(|_| "8081".to_string())
                .parse()
                .expect("WORKER_PORT must be a number"),
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_file: env::var("QUEUE_WORKER_LOG_FILE").ok(),
            config_path: env::var("CONFIG_PATH").ok(),
            renderer_url: env::var("RENDERER_URL").ok(),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            openai_api_key: env::var("OPENAI_API_KEY").unwrap_or_default(),
        }
    }

    /// Log the presence of each sensitive value without leaking it.
    pub fn log_redacted(&self) {
        let vars = [
            ("ANTHROPIC_API_KEY", &self.anthropic_api_key),
            ("OPENAI_API_KEY", &self.openai_api_key),
        ];
        for (name, value) in vars {
            if value.is_empty() {
                tracing::info!(category = "system", "{name} = (empty)");
            } else {
                tracing::info!(category = "system", "{name} = ({} chars)", value.len());
            }
        }
        tracing::info!(
            category = "system",
            db = %self.sqlite_db_path,
            host = %self.worker_host,
            port = self.worker_port,
            environment = %self.environment,
            "Worker configuration loaded"
        );
    }
}
