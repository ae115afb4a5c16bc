//! Durable progress state for generation jobs.
//!
//! The store is the only coordination point between the background pipeline
//! (writer) and status polling (readers). Guarded writes keep the job
//! lifecycle monotonic: a terminal job never changes again and a status
//! never moves backwards, regardless of write ordering.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::portfolio::{Job, JobStatus, SectionUpdate};

pub use memory::MemoryProgressStore;
pub use postgres::PostgresProgressStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("job {id} has corrupt state: {reason}")]
    Corrupt { id: Uuid, reason: String },
}

/// Persistence seam for job progress. Write methods return `Ok(false)` when
/// the guard dropped the write (unknown job, terminal job, or a status
/// regression) — dropped writes are a normal outcome, not an error.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn create_job(&self, job: &Job) -> Result<(), StoreError>;

    /// Moves the job's lifecycle status forward. Refuses regressions and
    /// any write against a terminal job.
    async fn set_status(&self, job_id: Uuid, status: JobStatus) -> Result<bool, StoreError>;

    /// Applies one section update. Refused once the job is terminal.
    async fn update_section(&self, job_id: Uuid, update: SectionUpdate)
        -> Result<bool, StoreError>;

    async fn job(&self, job_id: Uuid) -> Result<Option<Job>, StoreError>;

    /// The most recently created job for an owner. Newer runs shadow older
    /// ones; history stays in the table but is not served.
    async fn latest_for_owner(&self, owner_id: &str) -> Result<Option<Job>, StoreError>;
}
