//! Database connection management, migrations, and error types.
//!
//! This module handles all SQLite connection setup with appropriate settings
//! for concurrent access (WAL mode, foreign keys, busy timeout), the `regexp`
//! SQL function used by note search, schema versioning via migrations, and a
//! unified error type for the entire crate.

use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Central error type for the notes store.
///
/// Every variant except [`NotesError::OwnershipMismatch`] is reported to
/// callers as a plain 400-class failure carrying its message.
#[derive(Debug, Error)]
pub enum NotesError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// I/O operation failed (file/directory creation, terminal, stdin).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored JSON column could not be encoded or decoded.
    #[error("Malformed stored data: {0}")]
    Json(#[from] serde_json::Error),

    /// Requested entity was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input provided by the user or caller.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A label in the batch is already attached to the note.
    #[error("Label \"{label}\" is already added to this note")]
    Conflict { label: String },

    /// The caller is not the note's author.
    #[error("Note does not belong to user '{author}'")]
    OwnershipMismatch { author: String },
}

impl NotesError {
    /// HTTP-style status for this error: 401 for ownership mismatches,
    /// 400 for everything else.
    pub fn status(&self) -> u16 {
        match self {
            NotesError::OwnershipMismatch { .. } => 401,
            _ => 400,
        }
    }
}

/// Returns the path to the SQLite database file.
///
/// Resolution order:
/// 1. `flag` (the `--db` option)
/// 2. `PINBOARD_PATH` environment variable (if set)
/// 3. `~/.pinboard/notes.db` (default)
///
/// Creates the parent directory if it doesn't exist.
pub fn db_path(flag: Option<&Path>) -> Result<PathBuf, NotesError> {
    let path = if let Some(explicit) = flag {
        explicit.to_path_buf()
    } else if let Ok(custom) = std::env::var("PINBOARD_PATH") {
        PathBuf::from(custom)
    } else {
        let home = dirs::home_dir().ok_or_else(|| {
            NotesError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine home directory",
            ))
        })?;
        home.join(".pinboard").join("notes.db")
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    Ok(path)
}

/// Opens the database at `path` and brings its schema up to date.
pub fn open_connection(path: &Path) -> Result<Connection, NotesError> {
    let mut conn = open_connection_at(path)?;
    run_migrations(&mut conn)?;
    Ok(conn)
}

/// Opens a SQLite connection at the specified path with proper settings.
///
/// - **WAL mode**: concurrent readers with serialized writers
/// - **Foreign keys**: note state cascade relies on them
/// - **Busy timeout**: 5 seconds to absorb write contention
/// - **regexp()**: see [`register_functions`]
pub fn open_connection_at(path: &Path) -> Result<Connection, NotesError> {
    let conn = Connection::open(path)?;

    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_secs(5))?;
    register_functions(&conn)?;

    log::debug!("opened database at {}", path.display());
    Ok(conn)
}

/// Opens an in-memory database configured like a file-backed one and
/// migrated to the latest schema.
#[cfg(test)]
pub fn open_in_memory() -> Result<Connection, NotesError> {
    let mut conn = Connection::open_in_memory()?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    register_functions(&conn)?;
    run_migrations(&mut conn)?;
    Ok(conn)
}

/// Registers `regexp(pattern, text)`, which also backs the `REGEXP`
/// operator. A NULL pattern yields NULL and a NULL `text` never matches.
/// Compiled patterns are cached per statement.
pub fn register_functions(conn: &Connection) -> Result<(), NotesError> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        move |ctx| {
            if matches!(ctx.get_raw(0), ValueRef::Null) {
                return Ok(None);
            }
            let re: Arc<Regex> = ctx.get_or_create_aux(0, |vr| -> Result<_, BoxError> {
                Ok(Regex::new(vr.as_str()?)?)
            })?;
            let text: Option<String> = ctx.get(1)?;
            Ok(Some(text.map_or(false, |t| re.is_match(&t))))
        },
    )?;
    Ok(())
}

/// Runs all pending database migrations.
///
/// Reads the current version from `schema_meta` (0 when the table does not
/// exist yet) and applies every embedded migration above it, each in its
/// own transaction.
/// Version recorded in `schema_meta`, or 0 when the table does not exist yet.
fn schema_version(conn: &Connection) -> Result<i64, NotesError> {
    let has_meta: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_meta')",
        [],
        |row| row.get(0),
    )?;
    if !has_meta {
        return Ok(0);
    }
    let version = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_meta", [], |row| {
        row.get(0)
    })?;
    Ok(version)
}

pub fn run_migrations(conn: &mut Connection) -> Result<(), NotesError> {
    let current_version = schema_version(conn)?;

    let migrations: Vec<(i64, &str)> = vec![(1, include_str!("../migrations/001_initial.sql"))];

    for (target_version, sql) in migrations {
        if target_version > current_version {
            let tx = conn.transaction()?;
            tx.execute_batch(sql)?;
            tx.commit()?;
            log::info!("applied schema migration {}", target_version);
        }
    }

    Ok(())
}
