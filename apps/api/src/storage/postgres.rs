//! Postgres ProgressStore. One row per job; the four section states live in
//! a `sections` JSONB column written with `jsonb_set` so a section update
//! touches only its own key. Lifecycle guards run inside the UPDATE's WHERE
//! clause: a write that loses the guard affects zero rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ProgressStore, StoreError};
use crate::models::portfolio::{Job, JobStatus, SectionUpdate, Sections};

/// Ranks lifecycle statuses for the in-SQL regression guard. Must mirror
/// `JobStatus::can_advance_to`.
const STATUS_RANK_SQL: &str =
    "CASE {} WHEN 'initializing' THEN 0 WHEN 'in_progress' THEN 1 ELSE 2 END";

pub struct PostgresProgressStore {
    pool: PgPool,
}

impl PostgresProgressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the jobs table and its lookup index if missing. Safe to run
    /// on every startup.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS portfolio_jobs (
                id UUID PRIMARY KEY,
                owner_id TEXT NOT NULL,
                status TEXT NOT NULL,
                sections JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_portfolio_jobs_owner
             ON portfolio_jobs (owner_id, created_at DESC)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    owner_id: String,
    status: String,
    sections: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRow {
    fn into_job(self) -> Result<Job, StoreError> {
        let status = JobStatus::parse(&self.status).ok_or_else(|| StoreError::Corrupt {
            id: self.id,
            reason: format!("unknown status {:?}", self.status),
        })?;
        let sections: Sections = serde_json::from_value(self.sections)?;
        Ok(Job {
            id: self.id,
            owner_id: self.owner_id,
            status,
            sections,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[async_trait]
impl ProgressStore for PostgresProgressStore {
    async fn create_job(&self, job: &Job) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO portfolio_jobs (id, owner_id, status, sections, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(job.id)
        .bind(&job.owner_id)
        .bind(job.status.as_str())
        .bind(serde_json::to_value(&job.sections)?)
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn set_status(&self, job_id: Uuid, status: JobStatus) -> Result<bool, StoreError> {
        let rank_existing = STATUS_RANK_SQL.replace("{}", "status");
        let rank_new = STATUS_RANK_SQL.replace("{}", "$2");
        let sql = format!(
            r#"
            UPDATE portfolio_jobs
            SET status = $2, updated_at = NOW()
            WHERE id = $1
              AND status NOT IN ('completed', 'failed')
              AND {rank_existing} < {rank_new}
            "#,
        );

        let result = sqlx::query(&sql)
            .bind(job_id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_section(
        &self,
        job_id: Uuid,
        update: SectionUpdate,
    ) -> Result<bool, StoreError> {
        let path = vec![update.name.as_str().to_string()];
        let state = update.to_state_json()?;

        let result = sqlx::query(
            r#"
            UPDATE portfolio_jobs
            SET sections = jsonb_set(sections, $2, $3), updated_at = NOW()
            WHERE id = $1
              AND status NOT IN ('completed', 'failed')
            "#,
        )
        .bind(job_id)
        .bind(path)
        .bind(state)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn job(&self, job_id: Uuid) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT id, owner_id, status, sections, created_at, updated_at
             FROM portfolio_jobs WHERE id = $1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRow::into_job).transpose()
    }

    async fn latest_for_owner(&self, owner_id: &str) -> Result<Option<Job>, StoreError> {
        let row = sqlx::query_as::<_, JobRow>(
            "SELECT id, owner_id, status, sections, created_at, updated_at
             FROM portfolio_jobs
             WHERE owner_id = $1
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(JobRow::into_job).transpose()
    }
}
