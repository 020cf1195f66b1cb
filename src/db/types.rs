use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "jobstatus", rename_all = "lowercase")]
pub(crate) enum JobStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "jobstage", rename_all = "lowercase")]
pub(crate) enum JobStage {
    Normalize,
    Detect,
    Associate,
    Structure,
    Aggregate,
}

impl JobStage {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            JobStage::Normalize => "normalize",
            JobStage::Detect => "detect",
            JobStage::Associate => "associate",
            JobStage::Structure => "structure",
            JobStage::Aggregate => "aggregate",
        }
    }
}
