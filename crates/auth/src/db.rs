use rusqlite::Connection;

use crate::error::Result;

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id              TEXT    NOT NULL PRIMARY KEY,
            email           TEXT    NOT NULL UNIQUE,
            name            TEXT    NOT NULL,
            role            TEXT    NOT NULL DEFAULT 'student',
            password_hash   TEXT    NOT NULL,
            email_verified  INTEGER NOT NULL DEFAULT 0,
            created_at      TEXT    NOT NULL,
            updated_at      TEXT    NOT NULL
        ) STRICT;

        CREATE TABLE IF NOT EXISTS otp_codes (
            id                  TEXT    NOT NULL PRIMARY KEY,
            user_id             TEXT    NOT NULL UNIQUE REFERENCES users(id),
            code_hash           TEXT    NOT NULL,
            attempts_remaining  INTEGER NOT NULL DEFAULT 5,
            consumed            INTEGER NOT NULL DEFAULT 0,
            expires_at          TEXT    NOT NULL,
            created_at          TEXT    NOT NULL
        ) STRICT;

        CREATE TABLE IF NOT EXISTS refresh_tokens (
            id          TEXT    NOT NULL PRIMARY KEY,
            user_id     TEXT    NOT NULL REFERENCES users(id),
            token_hash  TEXT    NOT NULL UNIQUE,
            revoked     INTEGER NOT NULL DEFAULT 0,
            expires_at  TEXT    NOT NULL,
            created_at  TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user ON refresh_tokens (user_id);
        ",
    )?;
    Ok(())
}
