//! GitHub API client — the single point of entry for all GitHub REST calls
//! in GitFolio.
//!
//! No other module may call api.github.com directly: all GitHub
//! interactions go through this module so rate-limit handling lives in
//! exactly one place and section generators only ever see I/O or
//! permanent-auth errors.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

pub mod models;

use models::{GhRepo, GhUser};

const DEFAULT_API_URL: &str = "https://api.github.com";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("gitfolio-api/", env!("CARGO_PKG_VERSION"));
/// Page size used by the repositories generator; the provider caps at 100.
pub const PER_PAGE: u32 = 100;
const MAX_RETRIES: u32 = 3;
/// Fallback wait when a primary rate-limit response omits the reset header.
const DEFAULT_PRIMARY_WAIT: Duration = Duration::from_secs(60);
/// Never sleep longer than this on a primary rate limit; surface the error
/// instead and let the poller see a failed section.
const MAX_PRIMARY_WAIT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum GithubError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("GitHub API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("GitHub credential rejected (status {status})")]
    Auth { status: u16 },

    #[error("GitHub rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },
}

impl GithubError {
    /// Auth failures abort the whole job; every other variant fails only
    /// the section that hit it.
    pub fn is_auth(&self) -> bool {
        matches!(self, GithubError::Auth { .. })
    }
}

#[derive(Debug, Deserialize)]
struct GithubApiError {
    message: String,
}

/// How a 403/429 response asked us to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RateLimitKind {
    /// Quota exhausted; wait until the advertised reset instant.
    Primary { wait: Duration },
    /// Abuse-detection throttle; short backoff, provider hint if present.
    Secondary { retry_after: Option<Duration> },
}

/// GitHub REST client carrying one owner's delegated credential.
///
/// The credential lives only inside this struct for the duration of a run;
/// it is never written into the Job document or any store.
#[derive(Clone)]
pub struct GithubClient {
    client: Client,
    token: String,
    base_url: String,
    max_primary_wait: Duration,
}

impl GithubClient {
    pub fn new(token: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("Failed to build HTTP client"),
            token,
            base_url: DEFAULT_API_URL.to_string(),
            max_primary_wait: MAX_PRIMARY_WAIT,
        }
    }

    /// Points the client at a different API root (tests use a local mock).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_primary_wait(mut self, wait: Duration) -> Self {
        self.max_primary_wait = wait;
        self
    }

    /// `GET /users/{owner}` — the owner's public profile.
    pub async fn get_profile(&self, owner: &str) -> Result<GhUser, GithubError> {
        self.get_json(&format!("/users/{owner}"), &[]).await
    }

    /// `GET /users/{owner}/repos` — one page of the owner's repositories,
    /// most recently updated first. Callers loop from page 1 until a page
    /// comes back shorter than `per_page`; no total-count header is trusted.
    pub async fn list_repositories(
        &self,
        owner: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<GhRepo>, GithubError> {
        self.get_json(
            &format!("/users/{owner}/repos"),
            &[
                ("page", page.to_string()),
                ("per_page", per_page.to_string()),
                ("sort", "updated".to_string()),
            ],
        )
        .await
    }

    /// `GET /repos/{owner}/{repo}/languages` — language names in the
    /// provider's own order (byte count descending), so the first entry is
    /// the repository's dominant language.
    pub async fn list_languages(&self, owner: &str, repo: &str) -> Result<Vec<String>, GithubError> {
        let langs: serde_json::Map<String, serde_json::Value> = self
            .get_json(&format!("/repos/{owner}/{repo}/languages"), &[])
            .await?;
        Ok(langs.keys().cloned().collect())
    }

    /// Issues a GET with the retry discipline applied:
    /// - 401 → `Auth`, no retry.
    /// - primary rate limit → sleep until reset, retry the same request.
    /// - secondary rate limit / 5xx / network error → exponential backoff
    ///   (1s, 2s, 4s), at most `MAX_RETRIES` attempts.
    /// - any other non-2xx → `Api`, no retry.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GithubError> {
        let url = format!("{}{path}", self.base_url);
        let mut last_error: Option<GithubError> = None;
        let mut next_delay: Option<Duration> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff unless the previous response told us
                // exactly how long to wait.
                let delay = next_delay
                    .take()
                    .unwrap_or_else(|| Duration::from_millis(1000 * (1 << (attempt - 1))));
                warn!(
                    "GitHub GET {path} attempt {attempt} failed, retrying after {}ms...",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .get(&url)
                .query(query)
                .header("authorization", format!("Bearer {}", self.token))
                .header("accept", "application/vnd.github+json")
                .header("x-github-api-version", API_VERSION)
                .header("user-agent", USER_AGENT)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(GithubError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status == StatusCode::UNAUTHORIZED {
                return Err(GithubError::Auth {
                    status: status.as_u16(),
                });
            }

            if status.as_u16() == 403 || status.as_u16() == 429 {
                match classify_rate_limit(status, response.headers()) {
                    Some(RateLimitKind::Primary { wait }) => {
                        if wait > self.max_primary_wait {
                            warn!(
                                "GitHub primary rate limit resets in {}s, beyond the {}s wait ceiling",
                                wait.as_secs(),
                                self.max_primary_wait.as_secs()
                            );
                            return Err(GithubError::RateLimited { attempts: attempt + 1 });
                        }
                        warn!(
                            "GitHub primary rate limit hit on {path}, waiting {}s until reset",
                            wait.as_secs()
                        );
                        next_delay = Some(wait);
                        last_error = Some(GithubError::RateLimited {
                            attempts: attempt + 1,
                        });
                        continue;
                    }
                    Some(RateLimitKind::Secondary { retry_after }) => {
                        warn!("GitHub secondary rate limit hit on {path}");
                        next_delay = retry_after;
                        last_error = Some(GithubError::RateLimited {
                            attempts: attempt + 1,
                        });
                        continue;
                    }
                    None => {
                        // 403 without rate-limit signals is a permission
                        // problem, not throttling.
                        let message = read_error_message(response).await;
                        return Err(GithubError::Api {
                            status: status.as_u16(),
                            message,
                        });
                    }
                }
            }

            if status.is_server_error() {
                let message = read_error_message(response).await;
                warn!("GitHub API returned {status}: {message}");
                last_error = Some(GithubError::Api {
                    status: status.as_u16(),
                    message,
                });
                continue;
            }

            if !status.is_success() {
                let message = read_error_message(response).await;
                return Err(GithubError::Api {
                    status: status.as_u16(),
                    message,
                });
            }

            let parsed: T = response.json().await?;
            debug!("GitHub GET {path} succeeded");
            return Ok(parsed);
        }

        Err(last_error.unwrap_or(GithubError::RateLimited {
            attempts: MAX_RETRIES,
        }))
    }
}

/// Reads the `message` field of a GitHub error body, falling back to the
/// raw body text.
async fn read_error_message(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    serde_json::from_str::<GithubApiError>(&body)
        .map(|e| e.message)
        .unwrap_or(body)
}

/// Classifies a 403/429 response using GitHub's rate-limit headers.
///
/// Primary: `x-ratelimit-remaining: 0` with the reset instant in
/// `x-ratelimit-reset` (epoch seconds). Secondary: `retry-after` while
/// quota remains, or a bare 429. A 403 with neither signal is not a rate
/// limit at all.
fn classify_rate_limit(status: StatusCode, headers: &HeaderMap) -> Option<RateLimitKind> {
    let remaining = header_u64(headers, "x-ratelimit-remaining");
    if remaining == Some(0) {
        let wait = header_u64(headers, "x-ratelimit-reset")
            .map(|reset| Duration::from_secs(reset.saturating_sub(unix_now())))
            .unwrap_or(DEFAULT_PRIMARY_WAIT);
        return Some(RateLimitKind::Primary { wait });
    }

    if let Some(secs) = header_u64(headers, "retry-after") {
        return Some(RateLimitKind::Secondary {
            retry_after: Some(Duration::from_secs(secs)),
        });
    }

    if status.as_u16() == 429 {
        return Some(RateLimitKind::Secondary { retry_after: None });
    }

    None
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
