use rusqlite::Connection;

use crate::error::Result;

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS documents (
            id              TEXT    NOT NULL PRIMARY KEY,
            user_id         TEXT    NOT NULL,
            title           TEXT    NOT NULL,
            status          TEXT    NOT NULL DEFAULT 'pending',
            storage_path    TEXT    NOT NULL,
            extracted_text  TEXT,
            error           TEXT,
            created_at      TEXT    NOT NULL,
            updated_at      TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_documents_user ON documents (user_id, created_at);
        ",
    )?;
    Ok(())
}
