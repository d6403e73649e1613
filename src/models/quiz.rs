use serde::{Deserialize, Serialize};

/// A knowledge-check question pushed by the server mid-scan. At most one
/// is outstanding at any time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    #[serde(default)]
    pub phase_id: Option<String>,
    pub prompt: String,
    pub options: Vec<String>,
    #[serde(default)]
    pub points_value: u32,
}

/// Recorded only when a question is resolved correctly. Incorrect attempts
/// leave no trace here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionHistoryEntry {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option_index: usize,
    pub submitted_option_index: usize,
    pub was_correct: bool,
    pub points_earned: u32,
    /// True per-question maximum when the result event carried one.
    #[serde(default)]
    pub points_possible: Option<u32>,
}
