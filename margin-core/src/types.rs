use std::fmt;
use std::path::{Path, PathBuf};

use url::Url;

/// Identifier of the file a thread is anchored to.
///
/// Wraps a URL so that every file has one canonical string form
/// (`file:///abs/path` for local files). The canonical form is what gets
/// persisted and what the navigator sorts on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileUri(Url);

impl FileUri {
    /// Parses a persisted identifier. Fails for strings that are not URLs.
    pub fn parse(raw: &str) -> Result<Self, url::ParseError> {
        Url::parse(raw).map(Self)
    }

    /// Builds a `file://` identifier from an absolute path.
    ///
    /// Returns `None` for relative paths; callers resolve those against the
    /// workspace root first (see [`crate::root::PathResolver`]).
    pub fn from_path(path: &Path) -> Option<Self> {
        Url::from_file_path(path).ok().map(Self)
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The local path, if this is a `file://` identifier.
    pub fn to_file_path(&self) -> Option<PathBuf> {
        if self.0.scheme() != "file" {
            return None;
        }
        self.0.to_file_path().ok()
    }
}

impl fmt::Display for FileUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anchor point of a thread: a file plus a 0-based line number.
///
/// External callers speak 1-based lines; convert with [`Address::from_one_based`]
/// and [`Address::one_based_line`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    pub file: FileUri,
    pub line: u32, // 0-based
}

impl Address {
    pub fn new(file: FileUri, line: u32) -> Self {
        Self { file, line }
    }

    /// Converts a 1-based boundary line. Line 0 has no internal counterpart.
    pub fn from_one_based(file: FileUri, line: u32) -> Option<Self> {
        line.checked_sub(1).map(|line| Self { file, line })
    }

    pub fn one_based_line(&self) -> u32 {
        self.line.saturating_add(1)
    }
}

/// Identity of a comment. Unique for the lifetime of the store, restarts included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CommentId(pub u64);

/// Session-local identity of a thread. Not persisted; reassigned on restore.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u64);

/// Comment text, tagged with how it should be interpreted by a renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentBody {
    /// Text shown verbatim.
    PlainText(String),
    /// Markdown-capable text.
    FormattedText(String),
}

impl CommentBody {
    pub fn as_str(&self) -> &str {
        match self {
            CommentBody::PlainText(s) | CommentBody::FormattedText(s) => s,
        }
    }

    pub fn is_plain(&self) -> bool {
        matches!(self, CommentBody::PlainText(_))
    }
}

/// A single authored message inside a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub id: CommentId,
    pub body: CommentBody,
    pub author: String,
}

/// An ordered, non-empty sequence of comments anchored to one address.
#[derive(Debug, Clone)]
pub struct Thread {
    pub id: ThreadId,
    pub address: Address,
    /// Insertion order. Never empty while the thread is in a store.
    pub comments: Vec<Comment>,
    /// Always `true` once created.
    pub replyable: bool,
}

impl Thread {
    pub fn comment(&self, id: CommentId) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == id)
    }
}
