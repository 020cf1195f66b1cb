use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;
use uuid::Uuid;

use crate::db::types::{JobStage, JobStatus};

/// One survey-image processing request. The pipeline only mutates
/// status/progress/error and the derived fields; rows are created by the
/// upload side, which lives outside this service.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct SurveyJob {
    pub(crate) id: Uuid,
    pub(crate) filename: String,
    pub(crate) source_path: String,
    pub(crate) processed_path: Option<String>,
    pub(crate) status: JobStatus,
    pub(crate) stage: Option<JobStage>,
    pub(crate) progress: f64,
    pub(crate) error: Option<String>,
    pub(crate) num_questions: Option<i32>,
    pub(crate) num_options: Option<i32>,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
