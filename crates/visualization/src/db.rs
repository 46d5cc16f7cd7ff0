use rusqlite::Connection;

use crate::error::Result;

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS visualizations (
            id              TEXT    NOT NULL PRIMARY KEY,
            lesson_id       TEXT    NOT NULL,
            user_id         TEXT    NOT NULL,
            status          TEXT    NOT NULL,
            total_duration  REAL    NOT NULL DEFAULT 0,
            errors          TEXT    NOT NULL DEFAULT '[]',
            warnings        TEXT    NOT NULL DEFAULT '[]',
            created_at      TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_visualizations_user ON visualizations (user_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_visualizations_lesson ON visualizations (lesson_id, created_at);

        CREATE TABLE IF NOT EXISTS scenes (
            id                TEXT    NOT NULL PRIMARY KEY,
            visualization_id  TEXT    NOT NULL REFERENCES visualizations(id),
            position          INTEGER NOT NULL,
            scene_id          TEXT    NOT NULL,
            title             TEXT    NOT NULL,
            duration          REAL    NOT NULL,
            shapes            TEXT    NOT NULL,
            animations        TEXT    NOT NULL,
            audio             TEXT,
            background_color  TEXT
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_scenes_visualization ON scenes (visualization_id, position);
        ",
    )?;
    Ok(())
}
