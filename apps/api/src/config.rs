use std::time::Duration;

use anyhow::{Context, Result};

use crate::job_requests::status::StatusPolicy;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_MAIL_FROM: &str = "StudyLink <noreply@studylink.space>";

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    /// Resend API key. Without it, outgoing mail is only logged.
    pub resend_api_key: Option<String>,
    pub mail_from: String,
    /// Base URL of the web front-end, used to build deep links in e-mails.
    pub app_base_url: String,
    pub mail_timeout: Duration,
    pub status_policy: StatusPolicy,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let status_policy = match optional_env("JOB_REQUEST_STATUS_POLICY") {
            Some(raw) => raw
                .parse::<StatusPolicy>()
                .map_err(|e| anyhow::anyhow!("JOB_REQUEST_STATUS_POLICY: {e}"))?,
            None => StatusPolicy::default(),
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            database_max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
            resend_api_key: optional_env("RESEND_API_KEY").or_else(|| optional_env("AUTH_RESEND_KEY")),
            mail_from: optional_env("MAIL_FROM").unwrap_or_else(|| DEFAULT_MAIL_FROM.to_string()),
            app_base_url: resolve_base_url(&[
                optional_env("APP_BASE_URL"),
                optional_env("NEXTAUTH_URL"),
                optional_env("NEXT_PUBLIC_MAIN_URL"),
            ]),
            mail_timeout: Duration::from_secs(parse_env("MAIL_TIMEOUT_SECS", 10)?),
            status_policy,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Returns the variable's value, treating an empty string as unset.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

/// First configured candidate wins; trailing slashes are dropped so links can
/// be joined with `/path`.
fn resolve_base_url(candidates: &[Option<String>]) -> String {
    candidates
        .iter()
        .flatten()
        .next()
        .map(String::as_str)
        .unwrap_or(DEFAULT_BASE_URL)
        .trim_end_matches('/')
        .to_string()
}
