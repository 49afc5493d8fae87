use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScrapeError>;

/// Error taxonomy for scraper adapters. The scrape runner's strike system
/// keys off these variants, so the classification here is load-bearing:
/// transient errors accumulate strikes, auth/bot/protected disable the
/// source immediately, and Retry-After exempts a response from striking.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// 5xx, timeouts, DNS failures, rate limits. Carries Retry-After
    /// seconds when the response included one.
    #[error("Transient error for {url}: {message}")]
    Transient {
        url: String,
        message: String,
        retry_after: Option<u64>,
    },

    /// 4xx other than auth/not-found: the adapter configuration is wrong.
    #[error("Config error for {url}: {message}")]
    Config { url: String, message: String },

    #[error("Not found: {url}")]
    NotFound { url: String },

    /// 401/403 indicating a login wall.
    #[error("Authentication wall detected at {url}: {message}")]
    Auth { url: String, message: String },

    /// Cloudflare/reCAPTCHA/challenge markers detected in content.
    #[error("Bot protection detected at {url}: {message}")]
    BotProtection { url: String, message: String },

    /// Explicit "requires token" response from an API.
    #[error("Protected API at {url}: {message}")]
    ProtectedApi { url: String, message: String },
}

impl ScrapeError {
    pub fn transient(url: impl Into<String>, message: impl Into<String>) -> Self {
        ScrapeError::Transient {
            url: url.into(),
            message: message.into(),
            retry_after: None,
        }
    }

    pub fn config(url: impl Into<String>, message: impl Into<String>) -> Self {
        ScrapeError::Config {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Classify an HTTP status into the taxonomy.
    pub fn from_status(url: &str, status: u16, retry_after: Option<u64>) -> Self {
        match status {
            401 | 403 => ScrapeError::Auth {
                url: url.to_string(),
                message: format!("HTTP {status}"),
            },
            404 => ScrapeError::NotFound {
                url: url.to_string(),
            },
            429 => ScrapeError::Transient {
                url: url.to_string(),
                message: "HTTP 429".to_string(),
                retry_after,
            },
            s if s >= 500 => ScrapeError::Transient {
                url: url.to_string(),
                message: format!("HTTP {s}"),
                retry_after,
            },
            s => ScrapeError::Config {
                url: url.to_string(),
                message: format!("HTTP {s}"),
            },
        }
    }

    pub fn retry_after(&self) -> Option<u64> {
        match self {
            ScrapeError::Transient { retry_after, .. } => *retry_after,
            _ => None,
        }
    }
}

impl From<renderer_client::RenderError> for ScrapeError {
    fn from(err: renderer_client::RenderError) -> Self {
        ScrapeError::Transient {
            url: String::new(),
            message: format!("renderer: {err}"),
            retry_after: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            ScrapeError::from_status("u", 401, None),
            ScrapeError::Auth { .. }
        ));
        assert!(matches!(
            ScrapeError::from_status("u", 404, None),
            ScrapeError::NotFound { .. }
        ));
        assert!(matches!(
            ScrapeError::from_status("u", 422, None),
            ScrapeError::Config { .. }
        ));
        assert!(matches!(
            ScrapeError::from_status("u", 503, None),
            ScrapeError::Transient { .. }
        ));

        let rate_limited = ScrapeError::from_status("u", 429, Some(60));
        assert_eq!(rate_limited.retry_after(), Some(60));
    }
}
