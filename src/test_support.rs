use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use image::{GrayImage, Luma};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_circle_mut};
use uuid::Uuid;

use crate::core::time::primitive_now_utc;
use crate::db::models::SurveyJob;
use crate::db::types::JobStatus;
use crate::pipeline::context::PipelineConfig;
use crate::pipeline::types::SurveyDocument;
use crate::repositories::jobs::JobPatch;
use crate::services::job_store::JobStore;
use crate::services::recognition::Recognizer;

pub(crate) const BUBBLE_RADIUS: i32 = 14;

/// In-memory stand-in for the Postgres job store. Patches apply with the
/// same semantics as the SQL update: absent fields keep their value and
/// progress never moves backwards.
#[derive(Default)]
pub(crate) struct MemoryJobStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    jobs: HashMap<Uuid, SurveyJob>,
    results: HashMap<Uuid, SurveyDocument>,
    progress_log: HashMap<Uuid, Vec<f64>>,
    fail_next_result: Option<String>,
}

impl MemoryJobStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Inserts a job the way the claim query leaves it: processing, at the
    /// queued checkpoint, with no stage or error yet.
    pub(crate) fn insert_claimed(&self, filename: &str, source_path: &str) -> Uuid {
        let id = Uuid::new_v4();
        let now = primitive_now_utc();
        let job = SurveyJob {
            id,
            filename: filename.to_string(),
            source_path: source_path.to_string(),
            processed_path: None,
            status: JobStatus::Processing,
            stage: None,
            progress: 10.0,
            error: None,
            num_questions: None,
            num_options: None,
            created_at: now,
            updated_at: now,
        };

        let mut inner = self.inner.lock().unwrap();
        inner.progress_log.insert(id, vec![job.progress]);
        inner.jobs.insert(id, job);
        id
    }

    pub(crate) fn fail_next_result(&self, message: &str) {
        self.inner.lock().unwrap().fail_next_result = Some(message.to_string());
    }

    pub(crate) fn job(&self, id: Uuid) -> SurveyJob {
        self.inner.lock().unwrap().jobs.get(&id).cloned().expect("job exists")
    }

    pub(crate) fn result(&self, id: Uuid) -> Option<SurveyDocument> {
        self.inner.lock().unwrap().results.get(&id).cloned()
    }

    pub(crate) fn progress_log(&self, id: Uuid) -> Vec<f64> {
        self.inner.lock().unwrap().progress_log.get(&id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn get(&self, job_id: Uuid) -> Result<SurveyJob> {
        self.inner
            .lock()
            .unwrap()
            .jobs
            .get(&job_id)
            .cloned()
            .ok_or_else(|| anyhow!("survey job {job_id} not found"))
    }

    async fn update(&self, job_id: Uuid, patch: JobPatch) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        let job = inner.jobs.get_mut(&job_id).ok_or_else(|| anyhow!("survey job not found"))?;

        if let Some(status) = patch.status {
            job.status = status;
        }
        if let Some(stage) = patch.stage {
            job.stage = Some(stage);
        }
        if let Some(progress) = patch.progress {
            job.progress = job.progress.max(progress);
        }
        if let Some(error) = patch.error {
            job.error = Some(error);
        }
        if let Some(path) = patch.processed_path {
            job.processed_path = Some(path);
        }
        if let Some(num_questions) = patch.num_questions {
            job.num_questions = Some(num_questions);
        }
        if let Some(num_options) = patch.num_options {
            job.num_options = Some(num_options);
        }
        job.updated_at = primitive_now_utc();

        let progress = job.progress;
        inner.progress_log.entry(job_id).or_default().push(progress);
        Ok(())
    }

    async fn create_result(&self, job_id: Uuid, document: &SurveyDocument) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(message) = inner.fail_next_result.take() {
            return Err(anyhow!(message));
        }
        if inner.results.contains_key(&job_id) {
            return Err(anyhow!("result already exists for job {job_id}"));
        }
        inner.results.insert(job_id, document.clone());
        Ok(())
    }
}

/// Scripted recognition capability: returns queued texts in order, empty
/// text once the script runs out, or a fixed error.
pub(crate) struct FakeRecognizer {
    responses: Mutex<VecDeque<String>>,
    failure: Option<String>,
    calls: Mutex<usize>,
}

impl FakeRecognizer {
    pub(crate) fn with_texts(texts: &[&str]) -> Self {
        Self {
            responses: Mutex::new(texts.iter().map(|text| text.to_string()).collect()),
            failure: None,
            calls: Mutex::new(0),
        }
    }

    pub(crate) fn failing(message: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            failure: Some(message.to_string()),
            calls: Mutex::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl Recognizer for FakeRecognizer {
    async fn recognize(&self, _region: &GrayImage) -> Result<String> {
        *self.calls.lock().unwrap() += 1;
        if let Some(message) = &self.failure {
            return Err(anyhow!(message.clone()));
        }
        Ok(self.responses.lock().unwrap().pop_front().unwrap_or_default())
    }
}

/// White sheet the size of a small scan; bubbles are drawn in ink.
pub(crate) fn blank_sheet(width: u32, height: u32) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([255]))
}

pub(crate) fn draw_empty_bubble(sheet: &mut GrayImage, cx: i32, cy: i32) {
    draw_hollow_circle_mut(sheet, (cx, cy), BUBBLE_RADIUS, Luma([0]));
}

pub(crate) fn draw_filled_bubble(sheet: &mut GrayImage, cx: i32, cy: i32) {
    draw_filled_circle_mut(sheet, (cx, cy), BUBBLE_RADIUS, Luma([0]));
}

pub(crate) async fn write_sheet(dir: &Path, name: &str, sheet: &GrayImage) -> String {
    let path = dir.join(name);
    sheet.save(&path).expect("save sheet");
    path.to_string_lossy().into_owned()
}

/// Pipeline tunables for synthetic sheets: near-zero smoothing keeps the
/// one-pixel outlines of drawn bubbles from widening past the fill-ratio
/// threshold.
pub(crate) fn test_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.normalizer.blur_sigma = 0.3;
    config
}
