use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub lesson_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}
