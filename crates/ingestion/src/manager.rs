use std::sync::{Arc, Mutex};

use dashmap::DashMap;
use lumen_bus::{DocumentIngested, EventBus, TOPIC_DOCUMENT_INGESTED};
use lumen_core::types::{new_id, now_rfc3339};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::{IngestionError, Result};
use crate::extractor::Extractor;
use crate::storage;
use crate::types::{Document, DocumentStatus};

/// Bounds how many documents are extracted concurrently, per spec.md §5's
/// worker-pool requirement.
const MAX_CONCURRENT_EXTRACTIONS: usize = 4;

pub struct IngestionManager {
    db: Mutex<Connection>,
    storage_dir: String,
    bus: EventBus,
    extractor: Arc<dyn Extractor>,
    /// document_id -> cancellation token for its in-flight extraction.
    active: DashMap<String, CancellationToken>,
    semaphore: Arc<Semaphore>,
}

impl IngestionManager {
    pub fn new(conn: Connection, storage_dir: String, bus: EventBus, extractor: Arc<dyn Extractor>) -> Arc<Self> {
        Arc::new(Self {
            db: Mutex::new(conn),
            storage_dir,
            bus,
            extractor,
            active: DashMap::new(),
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_EXTRACTIONS)),
        })
    }

    #[instrument(skip(self, bytes))]
    pub fn upload(self: &Arc<Self>, user_id: &str, title: &str, filename: &str, bytes: &[u8]) -> Result<Document> {
        if bytes.is_empty() {
            return Err(IngestionError::EmptyUpload);
        }

        let id = new_id();
        let storage_path = storage::save_upload(&self.storage_dir, &id, filename, bytes)?;
        let now = now_rfc3339();
        let doc = Document {
            id: id.clone(),
            user_id: user_id.to_string(),
            title: title.to_string(),
            status: DocumentStatus::Pending,
            storage_path,
            extracted_text: None,
            error: None,
            created_at: now.clone(),
            updated_at: now,
        };

        {
            let db = self.db.lock().unwrap();
            insert_document(&db, &doc)?;
        }

        self.spawn_extraction(id);
        Ok(doc)
    }

    #[instrument(skip(self))]
    pub fn stop(&self, document_id: &str) -> Result<()> {
        if let Some((_, token)) = self.active.remove(document_id) {
            token.cancel();
            info!(document_id, "extraction cancelled");
        }
        Ok(())
    }

    pub fn get(&self, document_id: &str) -> Result<Document> {
        let db = self.db.lock().unwrap();
        get_document(&db, document_id)?.ok_or_else(|| IngestionError::NotFound(document_id.to_string()))
    }

    pub fn list(&self, user_id: &str) -> Result<Vec<Document>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, user_id, title, status, storage_path, extracted_text, error, created_at, updated_at
             FROM documents WHERE user_id = ?1 ORDER BY created_at DESC",
        )?;
        let rows = stmt
            .query_map(params![user_id], row_to_document)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn spawn_extraction(self: &Arc<Self>, document_id: String) {
        let manager = Arc::clone(self);
        let token = CancellationToken::new();
        self.active.insert(document_id.clone(), token.clone());

        tokio::spawn(async move {
            let Ok(_permit) = manager.semaphore.clone().acquire_owned().await else {
                return;
            };

            if token.is_cancelled() {
                manager.active.remove(&document_id);
                return;
            }

            manager.set_status(&document_id, DocumentStatus::Extracting, None, None);

            let extractor = Arc::clone(&manager.extractor);
            let storage_path = match manager.get(&document_id) {
                Ok(doc) => doc.storage_path,
                Err(e) => {
                    warn!(document_id = %document_id, "failed to reload document before extraction: {e}");
                    manager.active.remove(&document_id);
                    return;
                }
            };

            let extraction = tokio::task::spawn_blocking(move || extractor.extract(&storage_path));

            tokio::select! {
                result = extraction => {
                    match result {
                        Ok(Ok(text)) => manager.finish_success(&document_id, text).await,
                        Ok(Err(e)) => manager.set_status(&document_id, DocumentStatus::Failed, None, Some(e.to_string())),
                        Err(e) => manager.set_status(&document_id, DocumentStatus::Failed, None, Some(format!("extraction task panicked: {e}"))),
                    }
                }
                _ = token.cancelled() => {
                    manager.set_status(&document_id, DocumentStatus::Stopped, None, None);
                }
            }

            manager.active.remove(&document_id);
        });
    }

    async fn finish_success(&self, document_id: &str, text: String) {
        self.set_status(document_id, DocumentStatus::Ready, Some(text), None);

        let (user_id, title) = match self.get(document_id) {
            Ok(doc) => (doc.user_id, doc.title),
            Err(_) => return,
        };

        let event = DocumentIngested { document_id: document_id.to_string(), user_id, title };
        if let Err(e) = self.bus.publish(TOPIC_DOCUMENT_INGESTED, event).await {
            warn!(document_id, "failed to publish document.ingested: {e}");
        }
    }

    fn set_status(&self, document_id: &str, status: DocumentStatus, text: Option<String>, error: Option<String>) {
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        let result = db.execute(
            "UPDATE documents SET status = ?2, extracted_text = COALESCE(?3, extracted_text), error = ?4, updated_at = ?5
             WHERE id = ?1",
            params![document_id, status.to_string(), text, error, now],
        );
        if let Err(e) = result {
            warn!(document_id, "failed to persist status update: {e}");
        }
    }
}

fn insert_document(conn: &Connection, doc: &Document) -> Result<()> {
    conn.execute(
        "INSERT INTO documents (id, user_id, title, status, storage_path, extracted_text, error, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            doc.id,
            doc.user_id,
            doc.title,
            doc.status.to_string(),
            doc.storage_path,
            doc.extracted_text,
            doc.error,
            doc.created_at,
            doc.updated_at,
        ],
    )?;
    Ok(())
}

fn row_to_document(row: &rusqlite::Row) -> rusqlite::Result<Document> {
    let status_str: String = row.get(3)?;
    Ok(Document {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        status: status_str.parse().unwrap_or(DocumentStatus::Failed),
        storage_path: row.get(4)?,
        extracted_text: row.get(5)?,
        error: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn get_document(conn: &Connection, document_id: &str) -> Result<Option<Document>> {
    const SQL: &str = "SELECT id, user_id, title, status, storage_path, extracted_text, error, created_at, updated_at FROM documents WHERE id = ?1";
    conn.query_row(SQL, params![document_id], row_to_document).optional().map_err(IngestionError::Database)
}
