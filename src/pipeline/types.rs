use serde::{Deserialize, Serialize};

/// A detected candidate bubble. Produced fresh on every run and never
/// persisted on its own.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Mark {
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) area: f64,
    pub(crate) circularity: f64,
    pub(crate) filled: bool,
}

/// Marks judged to belong to one question by vertical proximity, ordered
/// top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct QuestionGroup {
    pub(crate) marks: Vec<Mark>,
}

impl QuestionGroup {
    /// Topmost mark edge; groups are built from y-sorted marks.
    pub(crate) fn top(&self) -> u32 {
        self.marks.first().map(|mark| mark.y).unwrap_or(0)
    }
}

/// A mark paired with the question text recognized above its group.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct MarkAssociation {
    pub(crate) question: String,
    pub(crate) x: u32,
    pub(crate) y: u32,
    pub(crate) filled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct OptionPosition {
    pub(crate) x: u32,
    pub(crate) y: u32,
}

/// One question with its options in reading order and the fill states
/// aligned by option index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct StructuredQuestion {
    pub(crate) question: String,
    pub(crate) options: Vec<OptionPosition>,
    pub(crate) responses: Vec<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct QuestionStatistics {
    pub(crate) total_options: usize,
    pub(crate) selected_count: usize,
    pub(crate) percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct AnalyzedQuestion {
    #[serde(flatten)]
    pub(crate) question: StructuredQuestion,
    pub(crate) statistics: QuestionStatistics,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct SurveyStatistics {
    pub(crate) total_questions: usize,
    pub(crate) total_options: usize,
    pub(crate) total_selected: usize,
    pub(crate) selection_rate: f64,
}

/// The finalized document attached to a completed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct SurveyDocument {
    pub(crate) questions: Vec<AnalyzedQuestion>,
    pub(crate) statistics: SurveyStatistics,
}
