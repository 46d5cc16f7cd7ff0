use rusqlite::Connection;

use crate::error::Result;

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS quizzes (
            id          TEXT    NOT NULL PRIMARY KEY,
            lesson_id   TEXT    NOT NULL UNIQUE,
            user_id     TEXT    NOT NULL,
            status      TEXT    NOT NULL DEFAULT 'pending',
            error       TEXT,
            created_at  TEXT    NOT NULL,
            updated_at  TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_quizzes_user ON quizzes (user_id, created_at);

        CREATE TABLE IF NOT EXISTS quiz_questions (
            id              TEXT    NOT NULL PRIMARY KEY,
            quiz_id         TEXT    NOT NULL REFERENCES quizzes(id),
            position        INTEGER NOT NULL,
            question        TEXT    NOT NULL,
            options         TEXT    NOT NULL,
            correct_index   INTEGER NOT NULL,
            explanation     TEXT    NOT NULL,
            difficulty      TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_questions_quiz ON quiz_questions (quiz_id, position);

        CREATE TABLE IF NOT EXISTS submissions (
            id            TEXT    NOT NULL PRIMARY KEY,
            lesson_id     TEXT    NOT NULL,
            user_id       TEXT    NOT NULL,
            answers       TEXT    NOT NULL,
            score         INTEGER NOT NULL,
            total         INTEGER NOT NULL,
            submitted_at  TEXT    NOT NULL
        ) STRICT;
        CREATE INDEX IF NOT EXISTS idx_submissions_lesson_user ON submissions (lesson_id, user_id, submitted_at);
        ",
    )?;
    Ok(())
}
