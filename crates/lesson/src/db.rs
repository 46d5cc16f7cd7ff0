use rusqlite::Connection;

use crate::error::Result;

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS lessons (
            id          TEXT    NOT NULL PRIMARY KEY,
            document_id TEXT    NOT NULL UNIQUE,
            user_id     TEXT    NOT NULL,
            status      TEXT    NOT NULL DEFAULT 'generating',
            error       TEXT,
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_lessons_user ON lessons (user_id, created_at);

        CREATE TABLE IF NOT EXISTS lesson_sections (
            id          TEXT    NOT NULL PRIMARY KEY,
            lesson_id   TEXT    NOT NULL REFERENCES lessons(id),
            position    INTEGER NOT NULL,
            title       TEXT    NOT NULL,
            body        TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_sections_lesson ON lesson_sections (lesson_id, position);
        ",
    )?;
    Ok(())
}
