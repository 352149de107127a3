//! In-memory Thread Store.
//!
//! Owns every thread and, through them, every comment. Operations are
//! synchronous and never partially apply: an `Err` leaves the store exactly as
//! it was. Persistence is the caller's job (see [`crate::workspace`]).

use crate::error::StoreError;
use crate::types::{Address, Comment, CommentBody, CommentId, FileUri, Thread, ThreadId};

/// Free-running comment id counter.
///
/// `value` is the high-water mark: the last id handed out. It is persisted on
/// every mutation and restored before any id is allocated, so ids are never
/// reused across restarts.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    value: u64,
}

impl IdAllocator {
    pub fn starting_at(value: u64) -> Self {
        Self { value }
    }

    pub fn allocate(&mut self) -> CommentId {
        self.value += 1;
        CommentId(self.value)
    }

    pub fn value(&self) -> u64 {
        self.value
    }
}

/// What `remove_comment` ended up removing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    CommentRemoved,
    /// The comment was the last one, so its thread went with it.
    ThreadRemoved,
}

#[derive(Debug, Clone, Default)]
pub struct ThreadStore {
    threads: Vec<Thread>,
    comment_ids: IdAllocator,
    next_thread: u64,
}

impl ThreadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty store whose comment ids continue after `counter`.
    pub fn with_comment_counter(counter: u64) -> Self {
        Self {
            comment_ids: IdAllocator::starting_at(counter),
            ..Self::default()
        }
    }

    /// Creates a thread at `address` holding one comment.
    ///
    /// At most one thread may occupy an address; a second create is rejected
    /// rather than stacked or merged.
    pub fn create_thread(
        &mut self,
        address: Address,
        body: CommentBody,
        author: impl Into<String>,
    ) -> Result<ThreadId, StoreError> {
        if self.find_by_address(&address.file, address.line).is_some() {
            return Err(StoreError::DuplicateAddress {
                file: address.file.to_string(),
                line: address.line,
            });
        }

        let comment = Comment {
            id: self.comment_ids.allocate(),
            body,
            author: author.into(),
        };
        self.next_thread += 1;
        let id = ThreadId(self.next_thread);
        self.threads.push(Thread {
            id,
            address,
            comments: vec![comment],
            replyable: true,
        });
        Ok(id)
    }

    /// Appends a comment to the thread at `address`.
    pub fn append_comment(
        &mut self,
        address: &Address,
        body: CommentBody,
        author: impl Into<String>,
    ) -> Result<CommentId, StoreError> {
        let thread = self
            .find_by_address(&address.file, address.line)
            .map(|t| t.id)
            .ok_or_else(|| StoreError::ThreadNotFound {
                file: address.file.to_string(),
                line: address.line,
            })?;
        self.append_to_thread(thread, body, author)
    }

    /// Appends a comment to the thread with identity `thread`.
    pub fn append_to_thread(
        &mut self,
        thread: ThreadId,
        body: CommentBody,
        author: impl Into<String>,
    ) -> Result<CommentId, StoreError> {
        let idx = self.index_of(thread).ok_or(StoreError::StaleThread(thread))?;
        let id = self.comment_ids.allocate();
        self.threads[idx].comments.push(Comment {
            id,
            body,
            author: author.into(),
        });
        Ok(id)
    }

    /// Removes one comment; an emptied thread is removed with it.
    pub fn remove_comment(
        &mut self,
        thread: ThreadId,
        comment: CommentId,
    ) -> Result<Removal, StoreError> {
        let idx = self.index_of(thread).ok_or(StoreError::StaleThread(thread))?;
        let comments = &mut self.threads[idx].comments;
        let pos = comments
            .iter()
            .position(|c| c.id == comment)
            .ok_or(StoreError::CommentNotFound { thread, comment })?;
        comments.remove(pos);

        if comments.is_empty() {
            self.threads.remove(idx);
            Ok(Removal::ThreadRemoved)
        } else {
            Ok(Removal::CommentRemoved)
        }
    }

    /// Removes the thread at `address` together with all of its comments.
    pub fn remove_thread(&mut self, address: &Address) -> Result<Thread, StoreError> {
        let idx = self
            .threads
            .iter()
            .position(|t| t.address == *address)
            .ok_or_else(|| StoreError::ThreadNotFound {
                file: address.file.to_string(),
                line: address.line,
            })?;
        Ok(self.threads.remove(idx))
    }

    /// Threads of one file in store (insertion) order.
    pub fn list_by_file<'a>(&'a self, file: &'a FileUri) -> impl Iterator<Item = &'a Thread> + 'a {
        self.threads.iter().filter(move |t| t.address.file == *file)
    }

    pub fn find_by_address(&self, file: &FileUri, line: u32) -> Option<&Thread> {
        self.threads
            .iter()
            .find(|t| t.address.line == line && t.address.file == *file)
    }

    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == id)
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    /// Distinct files that carry at least one thread, sorted by canonical form.
    pub fn files(&self) -> Vec<&FileUri> {
        let mut files: Vec<&FileUri> = self.threads.iter().map(|t| &t.address.file).collect();
        files.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        files.dedup();
        files
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Current high-water mark of the comment id counter.
    pub fn comment_counter(&self) -> u64 {
        self.comment_ids.value()
    }

    fn index_of(&self, thread: ThreadId) -> Option<usize> {
        self.threads.iter().position(|t| t.id == thread)
    }
}
