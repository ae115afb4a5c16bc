//! Job lifecycle: `initializing → in_progress → {completed | failed}`.
//!
//! Sections run sequentially in a fixed order. A section failure is
//! isolated (recorded, then execution continues); a credential failure is
//! not (the job aborts and the remaining sections are never attempted).
//! Partial portfolios are useful; portfolios built against a revoked
//! credential are not.

use std::sync::Arc;

use tracing::{error, info, warn};
use uuid::Uuid;

use super::sections::{GenerationContext, SectionGenerator};
use crate::models::portfolio::{Job, JobStatus, SectionUpdate};
use crate::storage::{ProgressStore, StoreError};

pub struct JobOrchestrator {
    store: Arc<dyn ProgressStore>,
}

impl JobOrchestrator {
    pub fn new(store: Arc<dyn ProgressStore>) -> Self {
        Self { store }
    }

    /// Creates and persists a new Job, all sections pending, so a poller
    /// can resolve the id immediately. The pipeline runs separately via
    /// [`run`](Self::run).
    pub async fn start(&self, owner: &str) -> Result<Job, StoreError> {
        let job = Job::new(owner);
        self.store.create_job(&job).await?;
        info!("Created job {} for {owner}", job.id);
        Ok(job)
    }

    /// Runs the section pipeline to completion. A store failure ends the
    /// run early; with the store gone there is nowhere to record progress.
    pub async fn run(
        &self,
        job_id: Uuid,
        mut ctx: GenerationContext,
        generators: Vec<Box<dyn SectionGenerator>>,
    ) {
        if let Err(e) = self.run_sections(job_id, &mut ctx, &generators).await {
            error!("Job {job_id}: progress store failure: {e}");
        }
    }

    async fn run_sections(
        &self,
        job_id: Uuid,
        ctx: &mut GenerationContext,
        generators: &[Box<dyn SectionGenerator>],
    ) -> Result<(), StoreError> {
        self.store.set_status(job_id, JobStatus::InProgress).await?;
        info!("Job {job_id}: started for {}", ctx.owner);

        for generator in generators {
            let name = generator.name();
            self.store
                .update_section(job_id, SectionUpdate::in_progress(name))
                .await?;

            match generator.generate(ctx).await {
                Ok(data) => {
                    self.store
                        .update_section(job_id, SectionUpdate::completed(data))
                        .await?;
                    info!("Job {job_id}: section {name} completed");
                }
                Err(e) if e.is_fatal() => {
                    warn!("Job {job_id}: credential failure in section {name}: {e}");
                    self.store
                        .update_section(job_id, SectionUpdate::failed(name))
                        .await?;
                    self.store.set_status(job_id, JobStatus::Failed).await?;
                    return Ok(());
                }
                Err(e) => {
                    warn!("Job {job_id}: section {name} failed: {e}");
                    self.store
                        .update_section(job_id, SectionUpdate::failed(name))
                        .await?;
                }
            }
        }

        self.store.set_status(job_id, JobStatus::Completed).await?;
        info!("Job {job_id}: completed");
        Ok(())
    }
}
