use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuizStatus {
    Pending,
    Ready,
    Failed,
}

impl std::fmt::Display for QuizStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            QuizStatus::Pending => "pending",
            QuizStatus::Ready => "ready",
            QuizStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for QuizStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(QuizStatus::Pending),
            "ready" => Ok(QuizStatus::Ready),
            "failed" => Ok(QuizStatus::Failed),
            other => Err(format!("unknown quiz status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Cycles easy → medium → hard → easy as questions are generated, so a
    /// quiz has a spread of difficulty rather than being uniformly one level.
    pub fn for_position(position: usize) -> Self {
        match position % 3 {
            0 => Difficulty::Easy,
            1 => Difficulty::Medium,
            _ => Difficulty::Hard,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question: String,
    pub options: Vec<String>,
    pub correct_index: u32,
    pub explanation: String,
    pub difficulty: Difficulty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quiz {
    pub id: String,
    pub lesson_id: String,
    pub user_id: String,
    pub status: QuizStatus,
    pub error: Option<String>,
    pub questions: Vec<Question>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub question_index: u32,
    pub selected_option: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub question_index: u32,
    pub correct: bool,
    pub correct_index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub lesson_id: String,
    pub user_id: String,
    pub answers: Vec<Answer>,
    pub score: u32,
    pub total: u32,
    pub submitted_at: String,
}
