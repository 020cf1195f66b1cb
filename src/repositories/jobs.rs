use sqlx::PgPool;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::models::SurveyJob;
use crate::db::types::{JobStage, JobStatus};

pub(crate) const COLUMNS: &str = "\
    id, filename, source_path, processed_path, status, stage, progress, error, \
    num_questions, num_options, created_at, updated_at";

/// Partial update of a single job row. `None` fields keep their current
/// value; progress can only move forward.
#[derive(Debug, Clone, Default)]
pub(crate) struct JobPatch {
    pub(crate) status: Option<JobStatus>,
    pub(crate) stage: Option<JobStage>,
    pub(crate) progress: Option<f64>,
    pub(crate) error: Option<String>,
    pub(crate) processed_path: Option<String>,
    pub(crate) num_questions: Option<i32>,
    pub(crate) num_options: Option<i32>,
}

impl JobPatch {
    pub(crate) fn with_progress(progress: f64) -> Self {
        Self { progress: Some(progress), ..Self::default() }
    }

    pub(crate) fn at_stage(stage: JobStage) -> Self {
        Self { stage: Some(stage), ..Self::default() }
    }

    pub(crate) fn completed() -> Self {
        Self {
            status: Some(JobStatus::Completed),
            progress: Some(100.0),
            ..Self::default()
        }
    }

    pub(crate) fn failed(message: String) -> Self {
        Self { status: Some(JobStatus::Failed), error: Some(message), ..Self::default() }
    }
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: Uuid,
) -> Result<Option<SurveyJob>, sqlx::Error> {
    sqlx::query_as::<_, SurveyJob>(&format!(
        "SELECT {COLUMNS}
         FROM survey_jobs
         WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Atomically claims the oldest uploaded job for this worker. The row is
/// flipped to `processing` in the same statement, so concurrent workers
/// can never pick up the same job.
pub(crate) async fn claim_next_for_processing(
    pool: &PgPool,
    now: PrimitiveDateTime,
) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar::<_, Uuid>(
        "WITH candidate AS (
            SELECT id
            FROM survey_jobs
            WHERE status = $1
            ORDER BY created_at
            FOR UPDATE SKIP LOCKED
            LIMIT 1
        )
        UPDATE survey_jobs
        SET status = $2,
            stage = NULL,
            progress = GREATEST(progress, $3),
            error = NULL,
            updated_at = $4
        FROM candidate
        WHERE survey_jobs.id = candidate.id
        RETURNING survey_jobs.id",
    )
    .bind(JobStatus::Uploaded)
    .bind(JobStatus::Processing)
    .bind(10.0_f64)
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Applies a patch as one last-write-wins UPDATE. `GREATEST` keeps
/// progress monotone even if a stale writer reports a lower checkpoint.
pub(crate) async fn update(
    pool: &PgPool,
    id: Uuid,
    patch: JobPatch,
    now: PrimitiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE survey_jobs
         SET status = COALESCE($2, status),
             stage = COALESCE($3, stage),
             progress = GREATEST(progress, COALESCE($4, progress)),
             error = COALESCE($5, error),
             processed_path = COALESCE($6, processed_path),
             num_questions = COALESCE($7, num_questions),
             num_options = COALESCE($8, num_options),
             updated_at = $9
         WHERE id = $1",
    )
    .bind(id)
    .bind(patch.status)
    .bind(patch.stage)
    .bind(patch.progress)
    .bind(patch.error)
    .bind(patch.processed_path)
    .bind(patch.num_questions)
    .bind(patch.num_options)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}
