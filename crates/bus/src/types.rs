use serde::{Deserialize, Serialize};

/// Published once ingestion finishes extracting a document's text.
pub const TOPIC_DOCUMENT_INGESTED: &str = "document.ingested";
/// Published once the lesson generator has produced sections for a document.
pub const TOPIC_LESSON_READY: &str = "lesson.ready";
/// Published once the visualization orchestrator has packed and timed a lesson.
pub const TOPIC_VISUALIZATION_READY: &str = "visualization.ready";
/// Published once quiz/notes generation has produced a quiz for a lesson.
pub const TOPIC_QUIZ_READY: &str = "quiz.ready";

/// A single row in the outbox, as handed to a consumer.
///
/// `cursor` is the monotonically increasing position used to resume polling;
/// it is the SQLite rowid, not part of the JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub cursor: i64,
    pub id: String,
    pub topic: String,
    pub payload: serde_json::Value,
    pub published_at: String,
}

impl Event {
    /// Deserialize `payload` into a concrete event body type.
    pub fn decode<T: serde::de::DeserializeOwned>(&self) -> crate::error::Result<T> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentIngested {
    pub document_id: String,
    pub user_id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonReady {
    pub lesson_id: String,
    pub document_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationReady {
    pub visualization_id: String,
    pub lesson_id: String,
    pub user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizReady {
    pub quiz_id: String,
    pub lesson_id: String,
    pub user_id: String,
}
