use std::sync::Mutex;

use lumen_core::types::{new_id, now_rfc3339};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::instrument;

use crate::error::{ConversationError, Result};
use crate::types::Conversation;

/// Owns the per-user conversation list. A thin wrapper around a single
/// SQLite connection behind a `Mutex`, following the same shape as the
/// other document-store-backed managers in this system.
pub struct ConversationManager {
    db: Mutex<Connection>,
}

impl ConversationManager {
    pub fn new(conn: Connection) -> Self {
        Self { db: Mutex::new(conn) }
    }

    #[instrument(skip(self))]
    pub fn create(&self, user_id: &str) -> Result<Conversation> {
        let id = new_id();
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO conversations (id, user_id, title, lesson_id, deleted, created_at, updated_at)
             VALUES (?1, ?2, 'New conversation', NULL, 0, ?3, ?3)",
            params![id, user_id, now],
        )?;
        get_conversation(&db, &id)?.ok_or_else(|| ConversationError::NotFound(id.clone()))
    }

    pub fn get(&self, id: &str) -> Result<Conversation> {
        let db = self.db.lock().unwrap();
        get_conversation(&db, id)?.ok_or_else(|| ConversationError::NotFound(id.to_string()))
    }

    #[instrument(skip(self))]
    pub fn list(&self, user_id: &str) -> Result<Vec<Conversation>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, user_id, title, lesson_id, created_at, updated_at
             FROM conversations WHERE user_id = ?1 AND deleted = 0 ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map(params![user_id], row_to_conversation)?.collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub fn rename(&self, id: &str, title: &str) -> Result<Conversation> {
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE conversations SET title = ?2, updated_at = ?3 WHERE id = ?1 AND deleted = 0",
            params![id, title, now],
        )?;
        if rows == 0 {
            return Err(ConversationError::NotFound(id.to_string()));
        }
        get_conversation(&db, id)?.ok_or_else(|| ConversationError::NotFound(id.to_string()))
    }

    /// Soft-delete: the owning lesson is left untouched, deletion of the
    /// lesson itself is a separate call against the lesson service.
    #[instrument(skip(self))]
    pub fn delete(&self, id: &str) -> Result<()> {
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        let rows = db.execute("UPDATE conversations SET deleted = 1, updated_at = ?2 WHERE id = ?1", params![id, now])?;
        if rows == 0 {
            return Err(ConversationError::NotFound(id.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn attach_lesson(&self, id: &str, lesson_id: &str) -> Result<Conversation> {
        let now = now_rfc3339();
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE conversations SET lesson_id = ?2, updated_at = ?3 WHERE id = ?1 AND deleted = 0",
            params![id, lesson_id, now],
        )?;
        if rows == 0 {
            return Err(ConversationError::NotFound(id.to_string()));
        }
        get_conversation(&db, id)?.ok_or_else(|| ConversationError::NotFound(id.to_string()))
    }
}

fn row_to_conversation(row: &rusqlite::Row) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        lesson_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

fn get_conversation(conn: &Connection, id: &str) -> Result<Option<Conversation>> {
    const SQL: &str = "SELECT id, user_id, title, lesson_id, created_at, updated_at FROM conversations WHERE id = ?1 AND deleted = 0";
    conn.query_row(SQL, params![id], row_to_conversation).optional().map_err(ConversationError::Database)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> ConversationManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        ConversationManager::new(conn)
    }

    #[test]
    fn create_then_list_returns_newest_first() {
        let mgr = manager();
        let first = mgr.create("user-1").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = mgr.create("user-1").unwrap();

        let listed = mgr.list("user-1").unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, second.id);
        assert_eq!(listed[1].id, first.id);
    }

    #[test]
    fn delete_is_soft_and_excludes_from_list() {
        let mgr = manager();
        let conv = mgr.create("user-1").unwrap();
        mgr.delete(&conv.id).unwrap();
        assert!(mgr.list("user-1").unwrap().is_empty());
        assert!(mgr.get(&conv.id).is_err());
    }

    #[test]
    fn rename_updates_title() {
        let mgr = manager();
        let conv = mgr.create("user-1").unwrap();
        let renamed = mgr.rename(&conv.id, "Photosynthesis basics").unwrap();
        assert_eq!(renamed.title, "Photosynthesis basics");
    }

    #[test]
    fn attach_lesson_sets_lesson_id() {
        let mgr = manager();
        let conv = mgr.create("user-1").unwrap();
        let updated = mgr.attach_lesson(&conv.id, "lesson-42").unwrap();
        assert_eq!(updated.lesson_id.as_deref(), Some("lesson-42"));
    }
}
