//! In-memory ProgressStore used by tests and single-process setups. Applies
//! the same write guards as the Postgres adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ProgressStore, StoreError};
use crate::models::portfolio::{Job, JobStatus, SectionUpdate};

#[derive(Default)]
pub struct MemoryProgressStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl MemoryProgressStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgressStore {
    async fn create_job(&self, job: &Job) -> Result<(), StoreError> {
        self.jobs.write().await.insert(job.id, job.clone());
        Ok(())
    }

    async fn set_status(&self, job_id: Uuid, status: JobStatus) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&job_id) else {
            return Ok(false);
        };
        if !job.status.can_advance_to(status) {
            return Ok(false);
        }
        job.status = status;
        job.updated_at = Utc::now();
        Ok(true)
    }

    async fn update_section(
        &self,
        job_id: Uuid,
        update: SectionUpdate,
    ) -> Result<bool, StoreError> {
        let mut jobs = self.jobs.write().await;
        let Some(job) = jobs.get_mut(&job_id) else {
            return Ok(false);
        };
        if job.status.is_terminal() {
            return Ok(false);
        }
        job.sections.apply(update);
        job.updated_at = Utc::now();
        Ok(true)
    }

    async fn job(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        Ok(self.jobs.read().await.get(&job_id).cloned())
    }

    async fn latest_for_owner(&self, owner_id: &str) -> Result<Option<Job>, StoreError> {
        Ok(self
            .jobs
            .read()
            .await
            .values()
            .filter(|job| job.owner_id == owner_id)
            .max_by_key(|job| job.created_at)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::portfolio::{SectionData, SectionName, SectionStatus, SkillSet};

    #[tokio::test]
    async fn test_created_job_is_readable() {
        let store = MemoryProgressStore::new();
        let job = Job::new("ada");
        store.create_job(&job).await.unwrap();

        let fetched = store.job(job.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, job.id);
        assert_eq!(fetched.status, JobStatus::Initializing);
    }

    #[tokio::test]
    async fn test_unknown_job_reads_as_none_and_writes_are_dropped() {
        let store = MemoryProgressStore::new();
        let id = Uuid::new_v4();
        assert!(store.job(id).await.unwrap().is_none());
        assert!(!store.set_status(id, JobStatus::InProgress).await.unwrap());
    }

    #[tokio::test]
    async fn test_terminal_status_is_never_overwritten() {
        let store = MemoryProgressStore::new();
        let job = Job::new("ada");
        store.create_job(&job).await.unwrap();

        assert!(store.set_status(job.id, JobStatus::InProgress).await.unwrap());
        assert!(store.set_status(job.id, JobStatus::Completed).await.unwrap());
        assert!(!store.set_status(job.id, JobStatus::Failed).await.unwrap());

        let fetched = store.job(job.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::Completed);
    }

    #[tokio::test]
    async fn test_status_never_regresses() {
        let store = MemoryProgressStore::new();
        let job = Job::new("ada");
        store.create_job(&job).await.unwrap();

        assert!(store.set_status(job.id, JobStatus::InProgress).await.unwrap());
        assert!(!store
            .set_status(job.id, JobStatus::Initializing)
            .await
            .unwrap());

        let fetched = store.job(job.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, JobStatus::InProgress);
    }

    #[tokio::test]
    async fn test_section_update_lands_in_named_section() {
        let store = MemoryProgressStore::new();
        let job = Job::new("ada");
        store.create_job(&job).await.unwrap();

        let applied = store
            .update_section(
                job.id,
                SectionUpdate::completed(SectionData::Skills(SkillSet(vec!["Rust".to_string()]))),
            )
            .await
            .unwrap();
        assert!(applied);

        let fetched = store.job(job.id).await.unwrap().unwrap();
        assert_eq!(fetched.sections.skills.status, SectionStatus::Completed);
        assert_eq!(
            fetched.sections.skills.data.as_ref().unwrap().0,
            vec!["Rust".to_string()]
        );
        assert_eq!(fetched.sections.profile.status, SectionStatus::Pending);
    }

    #[tokio::test]
    async fn test_section_updates_after_terminal_are_dropped() {
        let store = MemoryProgressStore::new();
        let job = Job::new("ada");
        store.create_job(&job).await.unwrap();
        store.set_status(job.id, JobStatus::InProgress).await.unwrap();
        store.set_status(job.id, JobStatus::Failed).await.unwrap();

        let applied = store
            .update_section(job.id, SectionUpdate::in_progress(SectionName::Profile))
            .await
            .unwrap();
        assert!(!applied);

        let fetched = store.job(job.id).await.unwrap().unwrap();
        assert_eq!(fetched.sections.profile.status, SectionStatus::Pending);
    }

    #[tokio::test]
    async fn test_latest_for_owner_shadows_older_runs() {
        let store = MemoryProgressStore::new();
        let mut older = Job::new("ada");
        older.created_at = older.created_at - chrono::Duration::seconds(60);
        let newer = Job::new("ada");
        let other = Job::new("grace");
        store.create_job(&older).await.unwrap();
        store.create_job(&newer).await.unwrap();
        store.create_job(&other).await.unwrap();

        let latest = store.latest_for_owner("ada").await.unwrap().unwrap();
        assert_eq!(latest.id, newer.id);
        assert!(store.latest_for_owner("nobody").await.unwrap().is_none());
    }
}
