use uuid::Uuid;

use crate::core::config::{AssociatorSettings, DetectorSettings, NormalizerSettings, Settings};
use crate::services::image_store::ImageStore;
use crate::services::job_store::JobStore;
use crate::services::recognition::Recognizer;

/// Tunables for one pipeline run, snapshotted from `Settings` so stages
/// never reach back into ambient configuration.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PipelineConfig {
    pub(crate) normalizer: NormalizerSettings,
    pub(crate) detector: DetectorSettings,
    pub(crate) associator: AssociatorSettings,
}

impl PipelineConfig {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        Self {
            normalizer: *settings.normalizer(),
            detector: *settings.detector(),
            associator: *settings.associator(),
        }
    }
}

/// Everything a stage may touch: the job it is processing, the persistence
/// seam, the image store, and the recognition capability. Stages receive
/// this by reference and own no state across stage boundaries.
pub(crate) struct StageContext<'a> {
    pub(crate) job_id: Uuid,
    pub(crate) store: &'a dyn JobStore,
    pub(crate) images: &'a ImageStore,
    pub(crate) recognizer: &'a dyn Recognizer,
    pub(crate) config: PipelineConfig,
}
