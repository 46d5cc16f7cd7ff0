use std::path::Path;

use rusqlite::Connection;

use crate::error::{AppError, Result};

/// Open (creating parent directories as needed) a SQLite connection with the
/// pragmas every Lumen service wants: WAL for concurrent readers, foreign
/// keys enforced, and a busy timeout so a writer under the `Mutex` a caller
/// holds never makes a concurrent reader fail outright.
pub fn open(path: &str) -> Result<Connection> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AppError::Internal(format!("failed to create {parent:?}: {e}")))?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(conn)
}

/// In-memory connection for unit tests.
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    Ok(conn)
}
