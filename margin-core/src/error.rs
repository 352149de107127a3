use thiserror::Error;

use crate::types::{CommentId, ThreadId};

/// Failures of a Thread Store operation.
///
/// Every variant means the operation was a no-op: the store is unchanged and
/// nothing is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("no thread at {file} line {line}")]
    ThreadNotFound { file: String, line: u32 },

    #[error("thread {0:?} no longer exists")]
    StaleThread(ThreadId),

    #[error("comment {comment:?} not found in thread {thread:?}")]
    CommentNotFound { thread: ThreadId, comment: CommentId },

    #[error("no comment {} in the thread at {file} line {line}", .index + 1)]
    NoCommentAt { file: String, line: u32, index: usize },

    #[error("a thread already exists at {file} line {line}")]
    DuplicateAddress { file: String, line: u32 },
}

impl StoreError {
    /// True for both ways of addressing a thread that is not there.
    pub fn is_thread_not_found(&self) -> bool {
        matches!(self, StoreError::ThreadNotFound { .. } | StoreError::StaleThread(_))
    }
}

/// Crate-level error for everything that reaches outside the in-memory store.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("database error: {0}")]
    Db(#[from] tokio_rusqlite::Error),

    #[error("invalid config: {0}")]
    Config(#[from] toml::de::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
