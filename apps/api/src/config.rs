use std::time::Duration;

use anyhow::{bail, Context, Result};

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. When unset the service runs with an
    /// ephemeral in-memory progress store (dev mode; jobs vanish on
    /// restart).
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub port: u16,
    pub rust_log: String,
    /// Root of the GitHub REST API. Overridable for GitHub Enterprise
    /// installs and for tests.
    pub github_api_url: String,
    /// Longest primary rate-limit reset the client will sleep through
    /// before surfacing the error instead.
    pub github_ratelimit_wait_ceiling: Duration,
    pub render: RenderConfig,
    /// Present only when S3_BUCKET is set; otherwise previews are inlined
    /// into the document as data URLs.
    pub s3: Option<S3Config>,
    /// Concurrent per-repository language lookups.
    pub language_concurrency: usize,
    /// Concurrent browser sessions for preview capture.
    pub render_concurrency: usize,
    /// Cap on the number of projects given a preview.
    pub max_projects: usize,
    pub placeholder_image: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderBackendKind {
    /// Local headless chromium, one short-lived process per capture.
    Chromium,
    /// Browserless-style remote screenshot service.
    Remote,
}

#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub backend: RenderBackendKind,
    pub chromium_bin: String,
    pub remote_url: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Base URL previews are served from, e.g. a CDN in front of the bucket.
    pub public_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: std::env::var("DATABASE_URL").ok(),
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 10)?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            github_api_url: std::env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
            github_ratelimit_wait_ceiling: Duration::from_secs(parse_env(
                "GITHUB_RATELIMIT_WAIT_CEILING_SECS",
                300,
            )?),
            render: RenderConfig::from_env()?,
            s3: S3Config::from_env()?,
            language_concurrency: parse_env("LANGUAGE_CONCURRENCY", 8)?,
            render_concurrency: parse_env("RENDER_CONCURRENCY", 2)?,
            max_projects: parse_env("MAX_PROJECTS", 6)?,
            placeholder_image: std::env::var("PLACEHOLDER_IMAGE")
                .unwrap_or_else(|_| "/placeholder-thumbnail.png".to_string()),
        })
    }
}

impl RenderConfig {
    fn from_env() -> Result<Self> {
        let backend = match std::env::var("RENDER_BACKEND").as_deref() {
            Ok("remote") => RenderBackendKind::Remote,
            Ok("chromium") | Err(_) => RenderBackendKind::Chromium,
            Ok(other) => bail!("RENDER_BACKEND must be 'chromium' or 'remote', got '{other}'"),
        };
        let remote_url = std::env::var("RENDER_SERVICE_URL").ok();
        if backend == RenderBackendKind::Remote && remote_url.is_none() {
            bail!("RENDER_SERVICE_URL is required when RENDER_BACKEND=remote");
        }

        Ok(RenderConfig {
            backend,
            chromium_bin: std::env::var("CHROMIUM_BIN")
                .unwrap_or_else(|_| "chromium".to_string()),
            remote_url,
            timeout: Duration::from_secs(parse_env("RENDER_TIMEOUT_SECS", 30)?),
        })
    }
}

impl S3Config {
    /// S3 is opt-in: no bucket means no object storage, and the remaining
    /// S3 variables are only required once a bucket is named.
    fn from_env() -> Result<Option<Self>> {
        let Ok(bucket) = std::env::var("S3_BUCKET") else {
            return Ok(None);
        };
        Ok(Some(S3Config {
            public_base_url: std::env::var("S3_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("https://{bucket}.s3.amazonaws.com")),
            bucket,
            endpoint: require_env("S3_ENDPOINT")?,
            access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
        }))
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value")),
        Err(_) => Ok(default),
    }
}
