use std::sync::{Arc, Mutex};
use std::time::Duration;

use lumen_bus::{EventBus, LessonReady, TOPIC_LESSON_READY};
use lumen_core::jwt::{self, KeyRing};
use lumen_core::types::{new_id, now_rfc3339, Principal, Role};
use lumen_generator::{GenerationRequest, TextGenerator};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::error::{LessonError, Result};
use crate::types::{Lesson, LessonSection, LessonStatus, LessonWithSections};

const MAX_GENERATION_ATTEMPTS: u32 = 3;
const MAX_SECTIONS: u32 = 8;

#[derive(Debug, Deserialize)]
struct IngestedDocument {
    title: String,
    extracted_text: Option<String>,
}

pub struct LessonManager {
    db: Mutex<Connection>,
    bus: EventBus,
    http: reqwest::Client,
    ingestion_url: String,
    generator: Arc<dyn TextGenerator>,
    keys: KeyRing,
}

impl LessonManager {
    pub fn new(
        conn: Connection,
        bus: EventBus,
        ingestion_url: String,
        generator: Arc<dyn TextGenerator>,
        keys: KeyRing,
    ) -> Arc<Self> {
        Arc::new(Self {
            db: Mutex::new(conn),
            bus,
            http: reqwest::Client::new(),
            ingestion_url,
            generator,
            keys,
        })
    }

    /// Handle a `document.ingested` event. Idempotent on `document_id`: a
    /// second delivery of the same event is a no-op once a lesson row
    /// already exists for it, per the at-least-once delivery contract.
    #[instrument(skip(self))]
    pub async fn handle_document_ingested(&self, document_id: &str, user_id: &str) -> anyhow::Result<()> {
        let Some(lesson_id) = self.create_pending_lesson(document_id, user_id)? else {
            info!(document_id, "lesson already exists for this document, skipping");
            return Ok(());
        };

        match self.generate(&lesson_id, document_id, user_id).await {
            Ok(()) => {
                self.set_status(&lesson_id, LessonStatus::Ready, None)?;
                let event = LessonReady { lesson_id: lesson_id.clone(), document_id: document_id.to_string(), user_id: user_id.to_string() };
                self.bus.publish(TOPIC_LESSON_READY, event).await?;
            }
            Err(e) => {
                warn!(lesson_id, "lesson generation failed: {e}");
                self.set_status(&lesson_id, LessonStatus::Failed, Some(e.to_string()))?;
            }
        }
        Ok(())
    }

    pub fn get(&self, lesson_id: &str) -> Result<LessonWithSections> {
        let db = self.db.lock().unwrap();
        let lesson = get_lesson(&db, lesson_id)?.ok_or_else(|| LessonError::NotFound(lesson_id.to_string()))?;
        let sections = list_sections(&db, lesson_id)?;
        Ok(LessonWithSections { lesson, sections })
    }

    pub fn list(&self, user_id: &str) -> Result<Vec<Lesson>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, document_id, user_id, status, error, created_at, updated_at
             FROM lessons WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_lesson)?.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn delete(&self, lesson_id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute("DELETE FROM lesson_sections WHERE lesson_id = ?1", params![lesson_id])?;
        db.execute("DELETE FROM lessons WHERE id = ?1", params![lesson_id])?;
        Ok(())
    }

    fn create_pending_lesson(&self, document_id: &str, user_id: &str) -> Result<Option<String>> {
        let id = new_id();
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        let inserted = db.execute(
            "INSERT OR IGNORE INTO lessons (id, document_id, user_id, status, error, created_at, updated_at)
             VALUES (?1, ?2, ?3, 'generating', NULL, ?4, ?4)",
            params![id, document_id, user_id, now],
        )?;
        Ok(if inserted > 0 { Some(id) } else { None })
    }

    async fn generate(&self, lesson_id: &str, document_id: &str, user_id: &str) -> anyhow::Result<()> {
        let document = self.fetch_document(document_id, user_id).await?;
        let source_text = document
            .extracted_text
            .ok_or_else(|| anyhow::anyhow!("document {document_id} has no extracted text yet"))?;

        let request = GenerationRequest {
            instruction: format!("Produce lesson sections covering \"{}\"", document.title),
            source_text,
            max_items: MAX_SECTIONS,
        };

        let mut attempt = 0;
        let response = loop {
            attempt += 1;
            match self.generator.generate(&request).await {
                Ok(response) => break response,
                Err(e) if attempt < MAX_GENERATION_ATTEMPTS => {
                    warn!(lesson_id, attempt, "generation attempt failed, retrying: {e}");
                    tokio::time::sleep(Duration::from_millis(200 * attempt as u64)).await;
                }
                Err(e) => return Err(e.into()),
            }
        };

        let db = self.db.lock().unwrap();
        for (position, item) in response.items.into_iter().enumerate() {
            db.execute(
                "INSERT INTO lesson_sections (id, lesson_id, position, title, body) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![new_id(), lesson_id, position as u32, item.title, item.body],
            )?;
        }
        Ok(())
    }

    async fn fetch_document(&self, document_id: &str, user_id: &str) -> anyhow::Result<IngestedDocument> {
        let token = self.service_token(user_id)?;
        let url = format!("{}/documents/{}", self.ingestion_url, document_id);
        let response = self.http.get(url).bearer_auth(token).send().await?.error_for_status()?;
        Ok(response.json::<IngestedDocument>().await?)
    }

    /// Mint a short-lived access token scoped to `user_id` so this
    /// bus-triggered call satisfies the same JWT check the gateway's
    /// forwarded end-user requests go through.
    fn service_token(&self, user_id: &str) -> Result<String> {
        let principal = Principal { user_id: user_id.to_string(), email: String::new(), name: String::new(), role: Role::Student };
        jwt::encode_access_token(&self.keys, &principal)
            .map_err(|e| LessonError::Generation(format!("failed to mint service token: {e}")))
    }

    fn set_status(&self, lesson_id: &str, status: LessonStatus, error: Option<String>) -> Result<()> {
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE lessons SET status = ?2, error = ?3, updated_at = ?4 WHERE id = ?1",
            params![lesson_id, status.to_string(), error, now],
        )?;
        Ok(())
    }
}

fn row_to_lesson(row: &rusqlite::Row) -> rusqlite::Result<Lesson> {
    let status_str: String = row.get(3)?;
    Ok(Lesson {
        id: row.get(0)?,
        document_id: row.get(1)?,
        user_id: row.get(2)?,
        status: status_str.parse().unwrap_or(LessonStatus::Failed),
        error: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn get_lesson(conn: &Connection, lesson_id: &str) -> Result<Option<Lesson>> {
    const SQL: &str = "SELECT id, document_id, user_id, status, error, created_at, updated_at FROM lessons WHERE id = ?1";
    conn.query_row(SQL, params![lesson_id], row_to_lesson).optional().map_err(LessonError::Database)
}

fn list_sections(conn: &Connection, lesson_id: &str) -> Result<Vec<LessonSection>> {
    let mut stmt = conn.prepare(
        "SELECT id, lesson_id, position, title, body FROM lesson_sections WHERE lesson_id = ?1 ORDER BY position",
    )?;
    let rows = stmt
        .query_map(params![lesson_id], |row| {
            Ok(LessonSection { id: row.get(0)?, lesson_id: row.get(1)?, position: row.get(2)?, title: row.get(3)?, body: row.get(4)? })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}
