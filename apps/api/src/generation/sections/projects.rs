//! Projects section: a capped slice of the repository list, each entry
//! rendered through the preview tier chain. Rendering never fails the
//! section; the worst case per project is a placeholder image.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::info;

use super::{GenerationContext, SectionError, SectionGenerator};
use crate::models::portfolio::{ProjectPreview, RepositorySnapshot, SectionData, SectionName};

pub struct ProjectsGenerator {
    cap: usize,
    render_concurrency: usize,
}

impl ProjectsGenerator {
    pub fn new(cap: usize, render_concurrency: usize) -> Self {
        Self {
            cap,
            render_concurrency: render_concurrency.max(1),
        }
    }
}

#[async_trait]
impl SectionGenerator for ProjectsGenerator {
    fn name(&self) -> SectionName {
        SectionName::Projects
    }

    async fn generate(&self, ctx: &mut GenerationContext) -> Result<SectionData, SectionError> {
        let snapshots = ctx
            .repositories
            .as_deref()
            .ok_or(SectionError::MissingRepositories)?;
        // The list arrives most-recently-updated first, so the cap keeps
        // the freshest projects.
        let selected: Vec<RepositorySnapshot> =
            snapshots.iter().take(self.cap).cloned().collect();
        info!(
            "Rendering previews for {} of {} repositories of {}",
            selected.len(),
            snapshots.len(),
            ctx.owner
        );

        let owner = ctx.owner.clone();
        let renderer = ctx.renderer.clone();
        // Bounded fan-out preserving project order. The renderer's session
        // pool bounds tier-1 captures; this stream bound also covers the
        // fallback tiers' HTML fetches.
        let previews: Vec<ProjectPreview> = stream::iter(selected)
            .map(|snapshot| {
                let owner = owner.clone();
                let renderer = renderer.clone();
                async move {
                    let target = snapshot
                        .homepage_url
                        .clone()
                        .unwrap_or_else(|| snapshot.canonical_url.clone());
                    let rendered = renderer.render(&owner, &snapshot.name, &target).await;
                    ProjectPreview {
                        name: snapshot.name,
                        description: snapshot.description,
                        source_url: snapshot.canonical_url,
                        preview_image: rendered.image,
                        render_tier: rendered.tier,
                    }
                }
            })
            .buffered(self.render_concurrency)
            .collect()
            .await;

        Ok(SectionData::Projects(previews))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::GithubClient;
    use crate::models::portfolio::RenderTier;
    use crate::render::backend::ChromiumRenderBackend;
    use crate::render::store::InlineImageStore;
    use crate::render::PreviewRenderer;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const OG_PAGE: &str = r#"<html><head>
        <meta property="og:image" content="https://cdn.example.com/og.png">
    </head></html>"#;

    fn snapshot(name: &str, homepage_url: Option<String>) -> RepositorySnapshot {
        RepositorySnapshot {
            name: name.to_string(),
            description: Some(format!("{name} description")),
            canonical_url: format!("https://github.com/ada/{name}"),
            homepage_url,
            languages: vec!["Rust".to_string()],
            star_count: 0,
            fork_count: 0,
            is_private: false,
        }
    }

    /// Renderer whose tier 1 can never succeed (no such browser binary),
    /// exercising the real fallback chain.
    fn ctx_with(repositories: Option<Vec<RepositorySnapshot>>) -> GenerationContext {
        let renderer = PreviewRenderer::new(
            Arc::new(ChromiumRenderBackend::new(
                "chromium-missing-binary-for-tests".to_string(),
                Duration::from_secs(5),
            )),
            Arc::new(InlineImageStore),
            "/placeholder-thumbnail.png".to_string(),
            2,
        );
        let mut ctx = GenerationContext::new(
            "ada",
            GithubClient::new("test-token".to_string()),
            Arc::new(renderer),
            false,
        );
        ctx.repositories = repositories;
        ctx
    }

    #[tokio::test]
    async fn test_selection_is_capped_and_keeps_list_order() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(OG_PAGE))
            .mount(&server)
            .await;

        let mut ctx = ctx_with(Some(vec![
            snapshot("first", Some(server.uri())),
            snapshot("second", Some(server.uri())),
            snapshot("third", Some(server.uri())),
        ]));
        let data = ProjectsGenerator::new(2, 2).generate(&mut ctx).await.unwrap();
        let SectionData::Projects(previews) = data else {
            panic!("expected projects data");
        };
        let names: Vec<&str> = previews.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(previews[0].render_tier, RenderTier::OgImage);
        assert_eq!(previews[0].preview_image, "https://cdn.example.com/og.png");
    }

    #[tokio::test]
    async fn test_render_target_falls_back_to_source_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(OG_PAGE))
            .mount(&server)
            .await;

        // no homepage; canonical URL is the render target
        let mut snap = snapshot("gitfolio", None);
        snap.canonical_url = server.uri();
        let mut ctx = ctx_with(Some(vec![snap]));

        let data = ProjectsGenerator::new(6, 2).generate(&mut ctx).await.unwrap();
        let SectionData::Projects(previews) = data else {
            panic!("expected projects data");
        };
        assert_eq!(previews[0].preview_image, "https://cdn.example.com/og.png");
        assert_eq!(previews[0].source_url, server.uri());
    }

    #[tokio::test]
    async fn test_unreachable_targets_still_produce_previews() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut ctx = ctx_with(Some(vec![
            snapshot("dead-site", Some(server.uri())),
            snapshot("also-dead", Some(server.uri())),
        ]));
        let data = ProjectsGenerator::new(6, 2).generate(&mut ctx).await.unwrap();
        let SectionData::Projects(previews) = data else {
            panic!("expected projects data");
        };
        assert_eq!(previews.len(), 2);
        for preview in &previews {
            assert_eq!(preview.preview_image, "/placeholder-thumbnail.png");
        }
    }

    #[tokio::test]
    async fn test_renders_are_bounded_by_the_stream_not_just_the_session_pool() {
        use crate::render::backend::RenderBackend;
        use crate::render::RenderError;
        use async_trait::async_trait;
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountingBackend {
            in_flight: AtomicUsize,
            max_in_flight: AtomicUsize,
        }

        #[async_trait]
        impl RenderBackend for CountingBackend {
            async fn capture(&self, _url: &str) -> Result<Vec<u8>, RenderError> {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(vec![0x89, 0x50, 0x4e, 0x47])
            }
        }

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .mount(&server)
            .await;

        let backend = Arc::new(CountingBackend {
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        // session pool of 8 leaves the semaphore slack; only the stream
        // bound can serialize the renders
        let renderer = PreviewRenderer::new(
            backend.clone(),
            Arc::new(InlineImageStore),
            "/placeholder-thumbnail.png".to_string(),
            8,
        );
        let mut ctx = GenerationContext::new(
            "ada",
            GithubClient::new("test-token".to_string()),
            Arc::new(renderer),
            false,
        );
        ctx.repositories = Some(vec![
            snapshot("one", Some(server.uri())),
            snapshot("two", Some(server.uri())),
            snapshot("three", Some(server.uri())),
            snapshot("four", Some(server.uri())),
        ]);

        let data = ProjectsGenerator::new(6, 1).generate(&mut ctx).await.unwrap();
        let SectionData::Projects(previews) = data else {
            panic!("expected projects data");
        };
        assert_eq!(previews.len(), 4);
        assert_eq!(backend.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_repository_list_fails_the_section() {
        let mut ctx = ctx_with(None);
        let err = ProjectsGenerator::new(6, 2).generate(&mut ctx).await.unwrap_err();
        assert!(matches!(err, SectionError::MissingRepositories));
        assert!(!err.is_fatal());
    }
}
