//! Client configuration loaded from environment variables.
//!
//! The token endpoint URL may be given as an absolute URL or as a path
//! relative to the API base URL.

use std::env;

/// Seconds before token expiry at which the renewal timer fires.
pub const DEFAULT_RENEWAL_MARGIN_SECS: i64 = 60;

/// Client configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Gateway base URL, e.g. `https://api.mesa.example`
    pub api_base_url: String,
    /// OAuth token endpoint (absolute)
    pub token_url: String,
    /// OAuth client ID (may be empty if the gateway does not require one)
    pub client_id: String,
    /// OAuth client secret (may be empty)
    pub client_secret: String,
    /// OAuth scope requested on login
    pub scope: Option<String>,
    /// Safety margin for proactive token renewal
    pub renewal_margin_secs: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let api_base_url =
            env::var("MESA_API_BASE_URL").map_err(|_| ConfigError::Missing("MESA_API_BASE_URL"))?;

        let token_url = env::var("MESA_TOKEN_URL").unwrap_or_else(|_| "/auth/token".to_string());
        let token_url = if token_url.starts_with("http://") || token_url.starts_with("https://") {
            token_url
        } else {
            join_url(&api_base_url, &token_url)
        };

        Ok(Self {
            token_url,
            client_id: env::var("MESA_CLIENT_ID").unwrap_or_default(),
            client_secret: env::var("MESA_CLIENT_SECRET").unwrap_or_default(),
            scope: env::var("MESA_OAUTH_SCOPE").ok(),
            renewal_margin_secs: DEFAULT_RENEWAL_MARGIN_SECS,
            api_base_url,
        })
    }

    /// Default config for testing only.
    pub fn test_default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            token_url: "http://localhost:8080/auth/token".to_string(),
            client_id: "mesa-web".to_string(),
            client_secret: "test_secret".to_string(),
            scope: Some("api".to_string()),
            renewal_margin_secs: DEFAULT_RENEWAL_MARGIN_SECS,
        }
    }
}

/// Join a base URL and a path, normalizing the slashes between them.
pub fn join_url(base: &str, path: &str) -> String {
    if base.is_empty() {
        return path.to_string();
    }
    if path.is_empty() {
        return base.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),
}
