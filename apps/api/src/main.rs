mod config;
mod db;
mod errors;
mod generation;
mod github;
mod models;
mod render;
mod routes;
mod state;
mod storage;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, RenderBackendKind, S3Config};
use crate::db::create_pool;
use crate::generation::orchestrator::JobOrchestrator;
use crate::render::backend::{ChromiumRenderBackend, RemoteRenderBackend, RenderBackend};
use crate::render::store::{ImageStore, InlineImageStore, S3ImageStore};
use crate::render::PreviewRenderer;
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::{MemoryProgressStore, PostgresProgressStore, ProgressStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let target = env!("CARGO_PKG_NAME").replace('-', "_");
            EnvFilter::new(format!("{target}={}", &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting GitFolio API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the progress store (Postgres when configured)
    let store: Arc<dyn ProgressStore> = match &config.database_url {
        Some(url) => {
            let db = create_pool(url, config.db_max_connections).await?;
            let progress = PostgresProgressStore::new(db);
            progress.ensure_schema().await?;
            info!("Progress store ready (postgres)");
            Arc::new(progress)
        }
        None => {
            info!("DATABASE_URL not set; using an ephemeral in-memory progress store");
            Arc::new(MemoryProgressStore::new())
        }
    };

    // Initialize the preview renderer (backend + image store from config)
    let backend: Arc<dyn RenderBackend> = match config.render.backend {
        RenderBackendKind::Chromium => {
            info!(
                "Render backend: local chromium ({})",
                config.render.chromium_bin
            );
            Arc::new(ChromiumRenderBackend::new(
                config.render.chromium_bin.clone(),
                config.render.timeout,
            ))
        }
        RenderBackendKind::Remote => {
            let endpoint = config
                .render
                .remote_url
                .clone()
                .expect("validated by Config::from_env");
            info!("Render backend: remote service ({endpoint})");
            Arc::new(RemoteRenderBackend::new(endpoint, config.render.timeout))
        }
    };
    let images: Arc<dyn ImageStore> = match &config.s3 {
        Some(s3) => {
            info!("Image store: s3://{}", s3.bucket);
            Arc::new(S3ImageStore::new(
                build_s3_client(s3).await,
                s3.bucket.clone(),
                s3.public_base_url.clone(),
            ))
        }
        None => {
            info!("Image store: inline data URLs (no S3_BUCKET configured)");
            Arc::new(InlineImageStore)
        }
    };
    let renderer = Arc::new(PreviewRenderer::new(
        backend,
        images,
        config.placeholder_image.clone(),
        config.render_concurrency,
    ));

    // Build app state
    let state = AppState {
        orchestrator: Arc::new(JobOrchestrator::new(store.clone())),
        store,
        renderer,
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &S3Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.access_key_id,
        &config.secret_access_key,
        None,
        None,
        "gitfolio-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
