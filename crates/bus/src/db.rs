use rusqlite::Connection;

use crate::error::Result;

/// Initialise the outbox schema in `conn`.
///
/// `events` is append-only; `bus_cursors` tracks, per (consumer_group, topic),
/// the highest rowid that consumer has successfully processed.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS events (
            cursor       INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT,
            id           TEXT    NOT NULL UNIQUE,
            topic        TEXT    NOT NULL,
            payload      TEXT    NOT NULL,
            published_at TEXT    NOT NULL
        ) STRICT;

        CREATE INDEX IF NOT EXISTS idx_events_topic_cursor ON events (topic, cursor);

        CREATE TABLE IF NOT EXISTS bus_cursors (
            consumer_group TEXT    NOT NULL,
            topic          TEXT    NOT NULL,
            last_cursor    INTEGER NOT NULL DEFAULT 0,
            updated_at     TEXT    NOT NULL,
            PRIMARY KEY (consumer_group, topic)
        ) STRICT;
        ",
    )?;
    Ok(())
}
