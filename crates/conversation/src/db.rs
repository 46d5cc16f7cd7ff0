use rusqlite::Connection;

use crate::error::Result;

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS conversations (
            id          TEXT    NOT NULL PRIMARY KEY,
            user_id     TEXT    NOT NULL,
            title       TEXT    NOT NULL,
            lesson_id   TEXT,
            deleted     INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_conversations_user ON conversations (user_id, deleted, updated_at);
        ",
    )?;
    Ok(())
}
