//! Tier-1 capture backends. A backend produces PNG bytes for a URL at the
//! fixed preview viewport; everything around it (preflight, fallback,
//! storage) lives in the renderer.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::{RenderError, VIEWPORT_HEIGHT, VIEWPORT_WIDTH};

/// Captures a screenshot of one page. Implementations own their session
/// lifecycle: a failed or timed-out capture must not leak processes or
/// scratch files.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    async fn capture(&self, url: &str) -> Result<Vec<u8>, RenderError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Local headless chromium
// ────────────────────────────────────────────────────────────────────────────

/// Spawns a short-lived headless chromium per capture. The profile dir and
/// screenshot live in a `TempDir` and the child is `kill_on_drop`, so both
/// the process and the scratch space are released on every exit path,
/// including timeout and task cancellation.
pub struct ChromiumRenderBackend {
    binary: String,
    timeout: Duration,
}

impl ChromiumRenderBackend {
    pub fn new(binary: String, timeout: Duration) -> Self {
        Self { binary, timeout }
    }

    fn build_args(&self, url: &str, profile_dir: &Path, screenshot: &Path) -> Vec<String> {
        vec![
            "--headless=new".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-setuid-sandbox".to_string(),
            "--hide-scrollbars".to_string(),
            format!("--window-size={VIEWPORT_WIDTH},{VIEWPORT_HEIGHT}"),
            // Approximates waiting for network idle before the capture.
            "--virtual-time-budget=10000".to_string(),
            format!("--user-data-dir={}", profile_dir.display()),
            format!("--screenshot={}", screenshot.display()),
            url.to_string(),
        ]
    }
}

#[async_trait]
impl RenderBackend for ChromiumRenderBackend {
    async fn capture(&self, url: &str) -> Result<Vec<u8>, RenderError> {
        let scratch = TempDir::new()?;
        let screenshot = scratch.path().join("preview.png");
        let args = self.build_args(url, scratch.path(), &screenshot);

        debug!("Capturing {url} with {}", self.binary);
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let status = match timeout(self.timeout, child.wait()).await {
            Ok(status) => status?,
            Err(_) => {
                // Timeout leaves the child running; start_kill tears it
                // down now rather than at drop.
                let _ = child.start_kill();
                return Err(RenderError::Timeout(self.timeout));
            }
        };

        if !status.success() {
            return Err(RenderError::Backend(format!(
                "chromium exited with {status}"
            )));
        }

        let bytes = tokio::fs::read(&screenshot).await?;
        if bytes.is_empty() {
            return Err(RenderError::Backend(
                "chromium produced an empty screenshot".to_string(),
            ));
        }
        Ok(bytes)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Remote rendering service
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoteCaptureRequest<'a> {
    url: &'a str,
    width: u32,
    height: u32,
    timeout_ms: u64,
}

/// Delegates capture to a browserless-style screenshot service. The service
/// owns browser lifecycles; this backend only holds an HTTP connection.
pub struct RemoteRenderBackend {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl RemoteRenderBackend {
    pub fn new(endpoint: String, timeout: Duration) -> Self {
        Self {
            // The service needs the full render window plus slack before we
            // give up on the connection.
            client: Client::builder()
                .timeout(timeout + Duration::from_secs(10))
                .build()
                .expect("Failed to build HTTP client"),
            endpoint,
            timeout,
        }
    }
}

#[async_trait]
impl RenderBackend for RemoteRenderBackend {
    async fn capture(&self, url: &str) -> Result<Vec<u8>, RenderError> {
        let request = RemoteCaptureRequest {
            url,
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
            timeout_ms: self.timeout.as_millis() as u64,
        };

        let response = self.client.post(&self.endpoint).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RenderError::Backend(format!(
                "render service returned {status}: {body}"
            )));
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(RenderError::Backend(
                "render service returned an empty body".to_string(),
            ));
        }
        Ok(bytes.to_vec())
    }
}
