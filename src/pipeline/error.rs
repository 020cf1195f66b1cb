use thiserror::Error;

use crate::db::types::JobStage;

/// Failure taxonomy for the five pipeline stages. Each stage wraps every
/// unexpected failure it encounters in its own variant, so the variant
/// alone attributes a failure to a stage.
#[derive(Debug, Error)]
pub(crate) enum StageError {
    #[error("cannot decode source image: {0}")]
    UnreadableImage(String),
    #[error("cannot persist normalized image: {0}")]
    StorageWrite(String),
    #[error("mark detection failed: {0}")]
    Detection(String),
    #[error("text recognition failed: {0}")]
    Recognition(String),
    #[error("structuring failed: {0}")]
    Structuring(String),
    #[error("result persistence failed: {0}")]
    Aggregation(String),
}

impl StageError {
    pub(crate) fn stage(&self) -> JobStage {
        match self {
            StageError::UnreadableImage(_) | StageError::StorageWrite(_) => JobStage::Normalize,
            StageError::Detection(_) => JobStage::Detect,
            StageError::Recognition(_) => JobStage::Associate,
            StageError::Structuring(_) => JobStage::Structure,
            StageError::Aggregation(_) => JobStage::Aggregate,
        }
    }
}
