use anyhow::{Context, Result};
use std::time::Duration;

/// Provider-imposed ceiling on `maxResults` for a message listing
pub const GMAIL_LIST_MAX_RESULTS_CEILING: u32 = 500;

#[derive(Debug, Clone)]
pub struct Config {
    pub google: GoogleOAuthConfig,
    pub gmail: GmailConfig,
    pub gemini: GeminiConfig,
}

#[derive(Debug, Clone)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone)]
pub struct GmailConfig {
    /// Get-message calls admitted per window, per user
    pub get_message_rate_limit: usize,
    pub rate_limit_window_ms: u64,
    pub list_max_results: u32,
    pub request_timeout_secs: u64,
    /// Restrict listings to the primary inbox category when the user has categories
    pub primary_only: bool,
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for GmailConfig {
    fn default() -> Self {
        GmailConfig {
            get_message_rate_limit: 25,
            rate_limit_window_ms: 1000,
            list_max_results: GMAIL_LIST_MAX_RESULTS_CEILING,
            request_timeout_secs: 30,
            primary_only: false,
        }
    }
}

impl GmailConfig {
    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit_window_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Page size sent to the provider, never above its ceiling
    pub fn page_size(&self) -> u32 {
        self.list_max_results.clamp(1, GMAIL_LIST_MAX_RESULTS_CEILING)
    }
}

impl GeminiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    pub fn new() -> Result<Self> {
        Self::check_required_env_vars()?;

        let defaults = GmailConfig::default();

        Ok(Config {
            google: GoogleOAuthConfig {
                client_id: required_var("GOOGLE_CLIENT_ID")?,
                client_secret: required_var("GOOGLE_CLIENT_SECRET")?,
            },
            gmail: GmailConfig {
                get_message_rate_limit: parsed_var("GMAIL_GET_MESSAGE_RATE_LIMIT", defaults.get_message_rate_limit)?,
                rate_limit_window_ms: parsed_var("GMAIL_RATE_LIMIT_WINDOW_MS", defaults.rate_limit_window_ms)?,
                list_max_results: parsed_var("GMAIL_LIST_MAX_RESULTS", defaults.list_max_results)?,
                request_timeout_secs: parsed_var("GMAIL_REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs)?,
                primary_only: parsed_var("GMAIL_PRIMARY_ONLY", defaults.primary_only)?,
            },
            gemini: GeminiConfig {
                api_key: required_var("GEMINI_API_KEY")?,
                model: std::env::var("GEMINI_MODEL")
                    .unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
                base_url: std::env::var("GEMINI_API_BASE_URL")
                    .unwrap_or_else(|_| "https://generativelanguage.googleapis.com".to_string()),
                request_timeout_secs: parsed_var("GEMINI_REQUEST_TIMEOUT_SECS", 120)?,
            },
        })
    }

    fn check_required_env_vars() -> Result<()> {
        let required_vars = [
            "GOOGLE_CLIENT_ID",
            "GOOGLE_CLIENT_SECRET",
            "GEMINI_API_KEY",
        ];

        let missing_vars: Vec<&str> = required_vars
            .iter()
            .copied()
            .filter(|var| std::env::var(var).is_err())
            .collect();

        if !missing_vars.is_empty() {
            anyhow::bail!(
                "Missing environment variables: {}\n\
                 \n\
                 💡 Solutions:\n\
                 1. Create a .env file with your credentials:\n\
                    GOOGLE_CLIENT_ID=...\n\
                    GOOGLE_CLIENT_SECRET=...\n\
                    GEMINI_API_KEY=...\n\
                 \n\
                 2. Or export them in your shell before running:\n\
                    export GEMINI_API_KEY=...\n\
                    cargo run -- --user me@example.com --check-config",
                missing_vars.join(", ")
            );
        }

        Ok(())
    }
}

fn required_var(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{} must be set", name))
}

fn parsed_var<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{} has an invalid value: {}", name, value)),
        Err(_) => Ok(default),
    }
}
