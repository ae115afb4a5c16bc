//! Axum route handlers for the Portfolio API.
//!
//! Generation is trigger-and-poll: the POST creates the job synchronously
//! (so the returned id resolves immediately) and runs the pipeline in a
//! spawned task; the status endpoint is the pull-based contract pollers
//! loop on. Polling cadence is the client's business — the server only
//! guarantees monotonic status.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::sections::{default_generators, GenerationContext};
use crate::github::GithubClient;
use crate::models::portfolio::{Job, JobStatus, SectionName, SectionStatus};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// The account whose repositories become the portfolio.
    pub owner: String,
    /// Delegated credential for that account. Held in memory for the run,
    /// never persisted.
    pub token: String,
    #[serde(default)]
    pub include_private: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

#[derive(Debug, Serialize)]
pub struct SectionStatusEntry {
    pub name: SectionName,
    pub status: SectionStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub sections: Vec<SectionStatusEntry>,
    /// completedSections / totalSections * 100, recomputed on every read.
    pub overall_progress: u8,
}

impl StatusResponse {
    fn from_job(job: &Job) -> Self {
        StatusResponse {
            job_id: job.id,
            status: job.status,
            sections: SectionName::ALL
                .into_iter()
                .map(|name| SectionStatusEntry {
                    name,
                    status: job.sections.status_of(name),
                })
                .collect(),
            overall_progress: job.sections.progress_percent(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/portfolio/generate
///
/// Creates a new generation job and returns 202 with its id. The pipeline
/// runs in the background; callers poll the status endpoint. A repeat POST
/// for the same owner starts an independent job that shadows the previous
/// one — it does not cancel anything in flight.
pub async fn handle_generate(
    State(state): State<AppState>,
    Json(request): Json<GenerateRequest>,
) -> Result<(StatusCode, Json<GenerateResponse>), AppError> {
    if request.owner.trim().is_empty() {
        return Err(AppError::Validation("owner cannot be empty".to_string()));
    }
    if request.token.trim().is_empty() {
        return Err(AppError::Validation("token cannot be empty".to_string()));
    }

    let job = state.orchestrator.start(&request.owner).await?;

    let github = GithubClient::new(request.token)
        .with_base_url(&state.config.github_api_url)
        .with_max_primary_wait(state.config.github_ratelimit_wait_ceiling);
    let ctx = GenerationContext::new(
        &request.owner,
        github,
        state.renderer.clone(),
        request.include_private,
    );
    let generators = default_generators(
        state.config.language_concurrency,
        state.config.max_projects,
        state.config.render_concurrency,
    );

    let orchestrator = state.orchestrator.clone();
    let job_id = job.id;
    tokio::spawn(async move {
        orchestrator.run(job_id, ctx, generators).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateResponse {
            job_id,
            status: job.status,
        }),
    ))
}

/// GET /api/v1/portfolio/status/:job_id
///
/// Per-section progress for one job. Safe to poll at any cadence.
pub async fn handle_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<StatusResponse>, AppError> {
    let job = state
        .store
        .job(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {job_id} not found")))?;

    Ok(Json(StatusResponse::from_job(&job)))
}

/// GET /api/v1/portfolio/owner/:owner
///
/// The full portfolio document of the owner's most recent job — what a
/// themeable renderer consumes. Older runs stay in storage but are never
/// served.
pub async fn handle_owner_portfolio(
    State(state): State<AppState>,
    Path(owner): Path<String>,
) -> Result<Json<Job>, AppError> {
    let job = state
        .store
        .latest_for_owner(&owner)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No portfolio for owner '{owner}'")))?;

    Ok(Json(job))
}
