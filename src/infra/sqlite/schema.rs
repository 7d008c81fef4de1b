use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn open_connection(db_path: &Path) -> Result<Connection> {
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent dir: {}", parent.display()))?;
    }
    let conn = Connection::open(db_path)
        .with_context(|| format!("failed to open db: {}", db_path.display()))?;
    configure(&conn)?;
    Ok(conn)
}

pub fn open_memory_connection() -> Result<Connection> {
    let conn = Connection::open_in_memory().context("failed to open in-memory db")?;
    configure(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    register_regexp(conn).context("failed to register regexp function")?;
    init_db(conn)
}

/// Backs the SQL `value REGEXP pattern` operator. Compiled patterns are cached
/// per statement; values that are not text never match.
fn register_regexp(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "regexp",
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let regex: Arc<Regex> = ctx.get_or_create_aux(0, |pattern| -> Result<_, BoxError> {
                Ok(Regex::new(pattern.as_str()?)?)
            })?;
            match ctx.get_raw(1) {
                ValueRef::Text(bytes) => {
                    let text = std::str::from_utf8(bytes)
                        .map_err(|err| rusqlite::Error::UserFunctionError(err.into()))?;
                    Ok(regex.is_match(text))
                }
                _ => Ok(false),
            }
        },
    )
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS document (
            collection  TEXT NOT NULL,
            id          TEXT NOT NULL,
            body        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY (collection, id)
        );
        ",
    )
    .context("failed to initialize schema")?;
    Ok(())
}
