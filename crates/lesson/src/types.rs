use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    Generating,
    Ready,
    Failed,
}

impl std::fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LessonStatus::Generating => "generating",
            LessonStatus::Ready => "ready",
            LessonStatus::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for LessonStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generating" => Ok(LessonStatus::Generating),
            "ready" => Ok(LessonStatus::Ready),
            "failed" => Ok(LessonStatus::Failed),
            other => Err(format!("unknown lesson status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub document_id: String,
    pub user_id: String,
    pub status: LessonStatus,
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonSection {
    pub id: String,
    pub lesson_id: String,
    pub position: u32,
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonWithSections {
    #[serde(flatten)]
    pub lesson: Lesson,
    pub sections: Vec<LessonSection>,
}
