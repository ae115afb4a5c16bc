//! Preview rendering with three-tier degradation: live screenshot, social
//! preview extraction, then a fixed placeholder. The chain never fails as
//! a whole; every project gets *some* preview image.

pub mod backend;
pub mod og_image;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::models::portfolio::RenderTier;
use backend::RenderBackend;
use store::ImageStore;

/// Fixed capture viewport shared by all backends.
pub const VIEWPORT_WIDTH: u32 = 1200;
pub const VIEWPORT_HEIGHT: u32 = 630;

const PREFLIGHT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("render timed out after {0:?}")]
    Timeout(Duration),

    #[error("render backend failed: {0}")]
    Backend(String),

    #[error("no preview image reference in page")]
    NoImageTag,

    #[error("image upload failed: {0}")]
    Upload(String),
}

/// Outcome of a render: the preview image string plus the tier that
/// produced it, retained so consumers can tell a live screenshot from a
/// degraded fallback.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPreview {
    pub image: String,
    pub tier: RenderTier,
}

/// Runs the tier chain for one URL at a time per session permit.
///
/// Browser sessions are the scarce resource: the semaphore bounds tier-1
/// captures only. Preflight happens inside the permit (it gates spending
/// the session), upload and tier-2 extraction happen outside it.
pub struct PreviewRenderer {
    backend: Arc<dyn RenderBackend>,
    store: Arc<dyn ImageStore>,
    client: Client,
    placeholder: String,
    sessions: Arc<Semaphore>,
}

impl PreviewRenderer {
    pub fn new(
        backend: Arc<dyn RenderBackend>,
        store: Arc<dyn ImageStore>,
        placeholder: String,
        concurrency: usize,
    ) -> Self {
        Self {
            backend,
            store,
            client: Client::builder()
                .timeout(PREFLIGHT_TIMEOUT)
                .build()
                .expect("Failed to build HTTP client"),
            placeholder,
            sessions: Arc::new(Semaphore::new(concurrency)),
        }
    }

    /// Renders a preview for `url`, falling through the tiers in order.
    /// Infallible: the worst case is the placeholder.
    pub async fn render(&self, owner: &str, repo: &str, url: &str) -> RenderedPreview {
        match self.try_rendered(owner, repo, url).await {
            Ok(preview) => return preview,
            Err(RenderError::Upload(msg)) => {
                // The capture itself worked; losing the upload degrades
                // straight to the placeholder.
                warn!("Preview upload failed for {url}: {msg}");
                return self.placeholder_preview();
            }
            Err(e) => debug!("Tier-1 render failed for {url}: {e}"),
        }

        match og_image::extract_preview_image(&self.client, url).await {
            Ok(image) => {
                return RenderedPreview {
                    image,
                    tier: RenderTier::OgImage,
                }
            }
            Err(e) => debug!("Tier-2 extraction failed for {url}: {e}"),
        }

        self.placeholder_preview()
    }

    async fn try_rendered(
        &self,
        owner: &str,
        repo: &str,
        url: &str,
    ) -> Result<RenderedPreview, RenderError> {
        let bytes = {
            let _session = match self.sessions.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    warn!("Render session pool closed: {e}");
                    return Err(RenderError::Backend(
                        "render session pool closed".to_string(),
                    ));
                }
            };
            self.preflight(url).await?;
            self.backend.capture(url).await?
            // permit drops here; storage does not hold a session
        };

        let image = self.store.store_png(owner, repo, bytes).await?;
        Ok(RenderedPreview {
            image,
            tier: RenderTier::Rendered,
        })
    }

    /// Tier-1 gate: the main document must answer 2xx before a browser
    /// session is spent on it.
    async fn preflight(&self, url: &str) -> Result<(), RenderError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RenderError::Backend(format!(
                "main document returned {status}"
            )));
        }
        Ok(())
    }

    fn placeholder_preview(&self) -> RenderedPreview {
        RenderedPreview {
            image: self.placeholder.clone(),
            tier: RenderTier::Placeholder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::store::InlineImageStore;
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PLACEHOLDER: &str = "/placeholder-thumbnail.png";
    const OG_PAGE: &str = r#"<html><head>
        <meta property="og:image" content="https://cdn.example.com/og.png">
    </head><body>site</body></html>"#;

    struct StubBackend {
        png: Option<Vec<u8>>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl StubBackend {
        fn succeeding() -> Arc<Self> {
            Arc::new(Self {
                png: Some(vec![0x89, 0x50, 0x4e, 0x47]),
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                png: None,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RenderBackend for StubBackend {
        async fn capture(&self, _url: &str) -> Result<Vec<u8>, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            match &self.png {
                Some(bytes) => Ok(bytes.clone()),
                None => Err(RenderError::Backend("stub capture failure".to_string())),
            }
        }
    }

    struct FailingStore;

    #[async_trait]
    impl ImageStore for FailingStore {
        async fn store_png(
            &self,
            _owner: &str,
            _repo: &str,
            _bytes: Vec<u8>,
        ) -> Result<String, RenderError> {
            Err(RenderError::Upload("bucket unavailable".to_string()))
        }
    }

    fn renderer(backend: Arc<StubBackend>, store: Arc<dyn ImageStore>) -> PreviewRenderer {
        PreviewRenderer::new(backend, store, PLACEHOLDER.to_string(), 2)
    }

    #[tokio::test]
    async fn test_tier1_success_returns_stored_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let backend = StubBackend::succeeding();
        let r = renderer(backend.clone(), Arc::new(InlineImageStore));
        let preview = r.render("ada", "gitfolio", &server.uri()).await;

        assert_eq!(preview.tier, RenderTier::Rendered);
        assert!(preview.image.starts_with("data:image/png;base64,"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_preflight_failure_never_spends_a_session() {
        let server = MockServer::start().await;
        // first GET is the failing preflight, second is the tier-2 fetch
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(OG_PAGE))
            .mount(&server)
            .await;

        let backend = StubBackend::succeeding();
        let r = renderer(backend.clone(), Arc::new(InlineImageStore));
        let preview = r.render("ada", "gitfolio", &server.uri()).await;

        assert_eq!(preview.tier, RenderTier::OgImage);
        assert_eq!(preview.image, "https://cdn.example.com/og.png");
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_backend_failure_falls_back_to_og_image() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(OG_PAGE))
            .mount(&server)
            .await;

        let backend = StubBackend::failing();
        let r = renderer(backend.clone(), Arc::new(InlineImageStore));
        let preview = r.render("ada", "gitfolio", &server.uri()).await;

        assert_eq!(preview.tier, RenderTier::OgImage);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upload_failure_degrades_to_placeholder() {
        let server = MockServer::start().await;
        // page has an og:image, which must NOT be consulted on upload loss
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(OG_PAGE))
            .mount(&server)
            .await;

        let backend = StubBackend::succeeding();
        let r = renderer(backend.clone(), Arc::new(FailingStore));
        let preview = r.render("ada", "gitfolio", &server.uri()).await;

        assert_eq!(preview.tier, RenderTier::Placeholder);
        assert_eq!(preview.image, PLACEHOLDER);
    }

    #[tokio::test]
    async fn test_total_failure_lands_on_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let backend = StubBackend::failing();
        let r = renderer(backend.clone(), Arc::new(InlineImageStore));
        let preview = r.render("ada", "gitfolio", &server.uri()).await;

        assert_eq!(preview.tier, RenderTier::Placeholder);
        assert_eq!(preview.image, PLACEHOLDER);
        // preflight never passed, so no session was spent
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_capture_sessions_are_bounded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let backend = StubBackend::succeeding();
        let r = PreviewRenderer::new(
            backend.clone(),
            Arc::new(InlineImageStore),
            PLACEHOLDER.to_string(),
            1,
        );

        let url = server.uri();
        tokio::join!(
            r.render("ada", "one", &url),
            r.render("ada", "two", &url),
            r.render("ada", "three", &url)
        );

        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
        assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), 1);
    }
}
