//! Persistence codec: Thread Store <-> flat records.
//!
//! The persisted form is two values: a JSON list of thread records and the
//! comment id counter. Per-comment ids are not part of the record; restored
//! comments get fresh ids above the restored counter.

use serde::{Deserialize, Serialize};

use crate::store::ThreadStore;
use crate::types::{Address, CommentBody, FileUri};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedComment {
    pub body: String,
    pub author: String,
    /// Set only for plain-text bodies; records without it are formatted text.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub plain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedThread {
    pub uri: String,
    pub line: u32,
    pub comments: Vec<PersistedComment>,
}

/// Full persisted image of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub threads: Vec<PersistedThread>,
    pub comment_id: u64,
}

impl Snapshot {
    pub fn capture(store: &ThreadStore) -> Self {
        let threads = store
            .threads()
            .iter()
            .map(|t| PersistedThread {
                uri: t.address.file.as_str().to_owned(),
                line: t.address.line,
                comments: t
                    .comments
                    .iter()
                    .map(|c| PersistedComment {
                        body: c.body.as_str().to_owned(),
                        author: c.author.clone(),
                        plain: c.body.is_plain(),
                    })
                    .collect(),
            })
            .collect();
        Self { threads, comment_id: store.comment_counter() }
    }

    pub fn threads_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.threads)
    }
}

/// A thread record that could not be restored. Restore continues without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    pub index: usize,
    pub reason: String,
}

#[derive(Debug)]
pub struct Restored {
    pub store: ThreadStore,
    pub skipped: Vec<MalformedRecord>,
}

/// Rebuilds a store from the persisted thread list and counter.
///
/// `threads_json` is `None` on first run. Each record is decoded on its own so
/// one bad record costs only that thread. A list that is not a JSON array at
/// all is reported as a single malformed record at index 0.
pub fn restore(threads_json: Option<&str>, comment_id: Option<u64>) -> Restored {
    let mut store = ThreadStore::with_comment_counter(comment_id.unwrap_or(0));
    let mut skipped = Vec::new();

    let Some(raw) = threads_json else {
        return Restored { store, skipped };
    };

    let records: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(records) => records,
        Err(err) => {
            skipped.push(MalformedRecord { index: 0, reason: format!("unreadable thread list: {err}") });
            return Restored { store, skipped };
        }
    };

    for (index, value) in records.into_iter().enumerate() {
        if let Err(reason) = restore_one(&mut store, value) {
            skipped.push(MalformedRecord { index, reason });
        }
    }

    Restored { store, skipped }
}

fn restore_one(store: &mut ThreadStore, value: serde_json::Value) -> Result<(), String> {
    let record: PersistedThread = serde_json::from_value(value).map_err(|e| e.to_string())?;
    if record.line == u32::MAX {
        return Err(format!("line {} is out of range", record.line));
    }
    let file = FileUri::parse(&record.uri)
        .map_err(|e| format!("bad file identifier {:?}: {e}", record.uri))?;

    let mut comments = record.comments.into_iter();
    let first = comments.next().ok_or("thread has no comments")?;
    let thread = store
        .create_thread(Address::new(file, record.line), body_of(&first), first.author)
        .map_err(|e| e.to_string())?;
    for c in comments {
        let body = body_of(&c);
        store
            .append_to_thread(thread, body, c.author)
            .map_err(|e| e.to_string())?;
    }
    Ok(())
}

fn body_of(c: &PersistedComment) -> CommentBody {
    if c.plain {
        CommentBody::PlainText(c.body.clone())
    } else {
        CommentBody::FormattedText(c.body.clone())
    }
}
