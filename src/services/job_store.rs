use anyhow::{Context, Result};
use async_trait::async_trait;
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::SurveyJob;
use crate::pipeline::types::SurveyDocument;
use crate::repositories::jobs::{self, JobPatch};
use crate::repositories::results;

/// Persistence seam for the analysis pipeline. Stages talk to jobs and
/// results exclusively through this trait so tests can run against an
/// in-memory store.
#[async_trait]
pub(crate) trait JobStore: Send + Sync {
    async fn get(&self, job_id: Uuid) -> Result<SurveyJob>;
    async fn update(&self, job_id: Uuid, patch: JobPatch) -> Result<()>;
    async fn create_result(&self, job_id: Uuid, document: &SurveyDocument) -> Result<()>;
}

/// Postgres-backed store used by the worker.
#[derive(Clone)]
pub(crate) struct PgJobStore {
    state: AppState,
}

impl PgJobStore {
    pub(crate) fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn get(&self, job_id: Uuid) -> Result<SurveyJob> {
        jobs::find_by_id(self.state.db(), job_id)
            .await
            .context("Failed to load survey job")?
            .with_context(|| format!("survey job {job_id} not found"))
    }

    async fn update(&self, job_id: Uuid, patch: JobPatch) -> Result<()> {
        jobs::update(self.state.db(), job_id, patch, primitive_now_utc())
            .await
            .context("Failed to update survey job")
    }

    async fn create_result(&self, job_id: Uuid, document: &SurveyDocument) -> Result<()> {
        let document =
            serde_json::to_value(document).context("Failed to serialize survey document")?;
        results::insert(self.state.db(), job_id, document, primitive_now_utc())
            .await
            .context("Failed to persist survey result")?;
        Ok(())
    }
}
