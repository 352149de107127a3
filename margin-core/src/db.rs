use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::OptionalExtension;
use tokio_rusqlite::Connection;

use crate::schema::{COMMENT_ID_KEY, THREADS_KEY};

/// Opens (or creates) the SQLite database at `path`, configures WAL mode,
/// checkpoints leftover WAL, and applies schema migrations.
///
/// Called from the terminal UI. The MCP server uses [`open_db_shared`], which
/// skips the checkpoint so it never truncates the WAL under the UI.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the file cannot be opened, WAL configuration
/// fails, or schema DDL fails.
pub async fn open_db(path: &str) -> Result<Connection, tokio_rusqlite::Error> {
    let conn = connect(path).await?;

    conn.call(|db| {
        db.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    migrate(&conn).await?;
    Ok(conn)
}

/// Like [`open_db`] without the WAL checkpoint.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the file cannot be opened or migrated.
pub async fn open_db_shared(path: &str) -> Result<Connection, tokio_rusqlite::Error> {
    let conn = connect(path).await?;
    migrate(&conn).await?;
    Ok(conn)
}

async fn connect(path: &str) -> Result<Connection, tokio_rusqlite::Error> {
    let conn = Connection::open(path).await?;

    // WAL pragmas are connection-level settings, re-applied on every open.
    conn.call(|db| {
        db.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;
             PRAGMA foreign_keys=ON;",
        )?;
        db.busy_timeout(Duration::from_secs(5))?;
        Ok::<_, rusqlite::Error>(())
    })
    .await?;

    Ok(conn)
}

async fn migrate(conn: &Connection) -> Result<(), tokio_rusqlite::Error> {
    conn.call(|db| {
        crate::schema::migrate(db)?;
        Ok::<_, rusqlite::Error>(())
    })
    .await
}

/// Returns the current Unix timestamp in seconds.
fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// Raw persisted values, before decoding. Both are `None` on first run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoredState {
    pub threads: Option<String>,
    pub comment_id: Option<u64>,
}

/// Reads the two persisted keys.
///
/// A counter value that is not an integer reads as absent.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the query fails.
pub async fn load_state(conn: &Connection) -> Result<StoredState, tokio_rusqlite::Error> {
    conn.call(|db| {
        let mut stmt = db.prepare("SELECT value FROM workspace_state WHERE key = ?1")?;
        let threads: Option<String> = stmt
            .query_row(rusqlite::params![THREADS_KEY], |r| r.get(0))
            .optional()?;
        let comment_id: Option<String> = stmt
            .query_row(rusqlite::params![COMMENT_ID_KEY], |r| r.get(0))
            .optional()?;
        Ok::<_, rusqlite::Error>(StoredState {
            threads,
            comment_id: comment_id.and_then(|v| v.trim().parse().ok()),
        })
    })
    .await
}

/// Writes the thread list and id counter in one `BEGIN IMMEDIATE` transaction.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the upsert transaction fails.
pub async fn save_state(
    conn: &Connection,
    threads_json: String,
    comment_id: u64,
) -> Result<(), tokio_rusqlite::Error> {
    conn.call(move |db| {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        upsert_state(&tx, &threads_json, comment_id)?;
        tx.commit()?;
        Ok::<_, rusqlite::Error>(())
    })
    .await
}

/// Outcome of [`save_state_if_current`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written. Carries the `data_version` the write was based on.
    Saved(i64),
    /// Another connection committed after `seen_version`; nothing was written.
    Stale,
}

/// Like [`save_state`], but only if no other connection has committed since
/// this one observed `seen_version`.
///
/// The version check runs after `BEGIN IMMEDIATE` has taken the write lock, so
/// no commit can land between the check and the write.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the transaction fails.
pub async fn save_state_if_current(
    conn: &Connection,
    threads_json: String,
    comment_id: u64,
    seen_version: i64,
) -> Result<SaveOutcome, tokio_rusqlite::Error> {
    conn.call(move |db| {
        let tx = db.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
        let version: i64 = tx.query_row("PRAGMA data_version", [], |r| r.get(0))?;
        if version != seen_version {
            tx.rollback()?;
            return Ok::<_, rusqlite::Error>(SaveOutcome::Stale);
        }
        upsert_state(&tx, &threads_json, comment_id)?;
        tx.commit()?;
        Ok(SaveOutcome::Saved(version))
    })
    .await
}

fn upsert_state(
    tx: &rusqlite::Transaction<'_>,
    threads_json: &str,
    comment_id: u64,
) -> rusqlite::Result<()> {
    let now = now_secs();
    let mut upsert = tx.prepare(
        "INSERT INTO workspace_state (key, value, updated_at)
         VALUES (?1, ?2, ?3)
         ON CONFLICT(key)
         DO UPDATE SET value = excluded.value,
                       updated_at = excluded.updated_at",
    )?;
    upsert.execute(rusqlite::params![THREADS_KEY, threads_json, now])?;
    upsert.execute(rusqlite::params![COMMENT_ID_KEY, comment_id.to_string(), now])?;
    Ok(())
}

/// Returns SQLite's `data_version` for this connection.
///
/// The value changes only when another connection commits, which is how the
/// terminal UI and the MCP server notice each other's writes.
///
/// # Errors
///
/// Returns `tokio_rusqlite::Error` if the pragma query fails.
pub async fn data_version(conn: &Connection) -> Result<i64, tokio_rusqlite::Error> {
    conn.call(|db| {
        let v: i64 = db.query_row("PRAGMA data_version", [], |r| r.get(0))?;
        Ok::<_, rusqlite::Error>(v)
    })
    .await
}
