//! The Thread Store bound to its durable copy.
//!
//! Every mutating method changes the in-memory store first, without
//! suspending, and then awaits the persistence write. A failed mutation
//! returns before anything is written. Writes are conditional on the
//! database not having moved since the last load; a stale write reloads and
//! applies the mutation again.

use tokio_rusqlite::Connection;

use crate::codec::{self, MalformedRecord, Snapshot};
use crate::db::{self, SaveOutcome};
use crate::error::{Result, StoreError};
use crate::store::{Removal, ThreadStore};
use crate::types::{Address, CommentBody, CommentId, Thread, ThreadId};

pub struct Workspace {
    store: ThreadStore,
    conn: Connection,
    seen_version: i64,
}

impl Workspace {
    /// Restores the store from `conn`.
    ///
    /// Records that fail to decode are dropped and returned so the caller can
    /// report them; they are also logged here.
    ///
    /// # Errors
    ///
    /// Fails only if the database cannot be read.
    pub async fn open(conn: Connection) -> Result<(Self, Vec<MalformedRecord>)> {
        let seen_version = db::data_version(&conn).await?;
        let (store, skipped) = load(&conn).await?;
        tracing::info!(threads = store.len(), counter = store.comment_counter(), "comment threads restored");
        Ok((Self { store, conn, seen_version }, skipped))
    }

    pub fn store(&self) -> &ThreadStore {
        &self.store
    }

    /// Reloads from the database if another process committed since the last
    /// load. Returns `true` when the store was replaced.
    ///
    /// Reloading reallocates comment and thread ids; callers holding ids
    /// should re-resolve them by address.
    ///
    /// # Errors
    ///
    /// Fails if the database cannot be read; the in-memory store is kept.
    pub async fn sync(&mut self) -> Result<bool> {
        let version = db::data_version(&self.conn).await?;
        if version == self.seen_version {
            return Ok(false);
        }
        self.reload().await?;
        tracing::debug!(threads = self.store.len(), "reloaded comment threads written by another process");
        Ok(true)
    }

    pub async fn add_comment(
        &mut self,
        address: Address,
        body: CommentBody,
        author: &str,
    ) -> Result<ThreadId, StoreError> {
        self.mutate(|store| store.create_thread(address.clone(), body.clone(), author))
            .await
    }

    pub async fn reply(
        &mut self,
        address: &Address,
        body: CommentBody,
        author: &str,
    ) -> Result<CommentId, StoreError> {
        self.mutate(|store| store.append_comment(address, body.clone(), author))
            .await
    }

    /// Removes the `index`th comment (0-based, insertion order) of the thread
    /// at `address`. The thread goes too if that was its last comment.
    pub async fn delete_comment(
        &mut self,
        address: &Address,
        index: usize,
    ) -> Result<Removal, StoreError> {
        self.mutate(|store| {
            let thread = store
                .find_by_address(&address.file, address.line)
                .ok_or_else(|| StoreError::ThreadNotFound {
                    file: address.file.to_string(),
                    line: address.line,
                })?;
            let comment = thread.comments.get(index).map(|c| c.id).ok_or_else(|| {
                StoreError::NoCommentAt {
                    file: address.file.to_string(),
                    line: address.line,
                    index,
                }
            })?;
            let thread = thread.id;
            store.remove_comment(thread, comment)
        })
        .await
    }

    pub async fn delete_thread(&mut self, address: &Address) -> Result<Thread, StoreError> {
        self.mutate(|store| store.remove_thread(address)).await
    }

    /// Applies `op` and persists the result.
    ///
    /// The write only lands if the database still holds what this store was
    /// loaded from. Otherwise the store is reloaded and `op` runs again on the
    /// fresh copy, so a commit from the other process is never overwritten and
    /// the id counter never goes backwards.
    async fn mutate<T>(
        &mut self,
        mut op: impl FnMut(&mut ThreadStore) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut attempt = 1;
        loop {
            let out = op(&mut self.store)?;
            match self.persist().await {
                Persisted::Done => return Ok(out),
                Persisted::Stale if attempt < SAVE_ATTEMPTS => {
                    attempt += 1;
                    tracing::debug!(attempt, "database changed underneath a write; reloading");
                    if let Err(e) = self.reload().await {
                        tracing::error!(error = %e, "cannot reload comment threads before retrying a write");
                        return Ok(out);
                    }
                }
                Persisted::Stale => {
                    tracing::error!(attempts = SAVE_ATTEMPTS, "comment threads kept changing underneath a write; giving up");
                    return Ok(out);
                }
            }
        }
    }

    /// Writes the full store if nobody else committed since the last load.
    /// A failed write is logged, not returned; the mutation stays in memory.
    async fn persist(&mut self) -> Persisted {
        let snapshot = Snapshot::capture(&self.store);
        let json = match snapshot.threads_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(error = %e, "cannot encode comment threads");
                return Persisted::Done;
            }
        };
        match db::save_state_if_current(&self.conn, json, snapshot.comment_id, self.seen_version).await {
            Ok(SaveOutcome::Saved(version)) => {
                self.seen_version = version;
                Persisted::Done
            }
            Ok(SaveOutcome::Stale) => Persisted::Stale,
            Err(e) => {
                tracing::error!(error = %e, "cannot persist comment threads");
                Persisted::Done
            }
        }
    }

    async fn reload(&mut self) -> Result<()> {
        // Read the version first: a commit that lands in between makes the
        // next conditional save stale again instead of being missed.
        let version = db::data_version(&self.conn).await?;
        let (store, _) = load(&self.conn).await?;
        self.store = store;
        self.seen_version = version;
        Ok(())
    }
}

const SAVE_ATTEMPTS: usize = 3;

/// Whether [`Workspace::persist`] is done with the current mutation.
enum Persisted {
    /// Written, or failed in a way a retry would not fix.
    Done,
    /// The database moved on; reload and apply again.
    Stale,
}

async fn load(conn: &Connection) -> Result<(ThreadStore, Vec<MalformedRecord>)> {
    let stored = db::load_state(conn).await?;
    let restored = codec::restore(stored.threads.as_deref(), stored.comment_id);
    for record in &restored.skipped {
        tracing::warn!(index = record.index, reason = %record.reason, "skipped malformed thread record");
    }
    Ok((restored.store, restored.skipped))
}
