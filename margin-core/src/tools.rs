//! Text facade used by the tool calls.
//!
//! Inputs use 1-based lines and caller-supplied paths; outputs are the
//! human-readable strings handed back to the agent. Every failure is a text
//! result, never an error.

use crate::config::DEFAULT_AUTHOR;
use crate::root::PathResolver;
use crate::types::{Address, CommentBody, FileUri};
use crate::workspace::Workspace;

pub const NO_COMMENTS: &str = "No comments found.";

/// Outcome of resolving a boundary `(path, line)` pair.
enum Target {
    Resolved(Address),
    Rejected(String),
}

fn target(resolver: &PathResolver, file_path: &str, line: u32) -> Target {
    let Some(file) = resolver.resolve(file_path) else {
        return Target::Rejected(format!("Cannot resolve file path {file_path}"));
    };
    match Address::from_one_based(file, line) {
        Some(address) => Target::Resolved(address),
        None => Target::Rejected(format!("Line numbers start at 1 (got {line}).")),
    }
}

fn author_or_default(username: Option<&str>, fallback: &str) -> String {
    match username.map(str::trim) {
        Some(name) if !name.is_empty() => name.to_owned(),
        _ if !fallback.is_empty() => fallback.to_owned(),
        _ => DEFAULT_AUTHOR.to_owned(),
    }
}

/// Shared state of the tool facade: the workspace root and the fallback author.
#[derive(Debug, Clone)]
pub struct Facade {
    resolver: PathResolver,
    default_author: String,
}

impl Facade {
    pub fn new(resolver: PathResolver, default_author: impl Into<String>) -> Self {
        Self { resolver, default_author: default_author.into() }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Starts a thread at `file_path:line` with `body` as its first comment.
    pub async fn add_comment(
        &self,
        ws: &mut Workspace,
        file_path: &str,
        line: u32,
        body: &str,
        username: Option<&str>,
    ) -> String {
        let address = match target(&self.resolver, file_path, line) {
            Target::Resolved(a) => a,
            Target::Rejected(msg) => return msg,
        };
        let author = author_or_default(username, &self.default_author);
        match ws
            .add_comment(address, CommentBody::FormattedText(body.to_owned()), &author)
            .await
        {
            Ok(_) => format!("Comment added to {file_path} at line {line}"),
            Err(_) => format!(
                "A comment thread already exists at {file_path} line {line}; use addReply to respond."
            ),
        }
    }

    /// Appends `body` to the thread at `file_path:line`.
    pub async fn add_reply(
        &self,
        ws: &mut Workspace,
        file_path: &str,
        line: u32,
        body: &str,
        username: Option<&str>,
    ) -> String {
        let address = match target(&self.resolver, file_path, line) {
            Target::Resolved(a) => a,
            Target::Rejected(msg) => return msg,
        };
        let author = author_or_default(username, &self.default_author);
        match ws
            .reply(&address, CommentBody::FormattedText(body.to_owned()), &author)
            .await
        {
            Ok(_) => format!("Reply added to thread at {file_path} line {line}"),
            Err(_) => format!("No comment thread found at {file_path} line {line}"),
        }
    }

    /// Lists every thread of `file_path` in store order.
    ///
    /// Each thread renders as `Line N:` followed by its comment bodies one per
    /// line; threads are separated by a blank line.
    pub fn get_comments(&self, ws: &Workspace, file_path: &str) -> String {
        let Some(file) = self.resolver.resolve(file_path) else {
            return NO_COMMENTS.to_owned();
        };
        render_file(ws, &file)
    }

    /// Deletes the whole thread at `file_path:line`.
    pub async fn delete_comment(&self, ws: &mut Workspace, file_path: &str, line: u32) -> String {
        let address = match target(&self.resolver, file_path, line) {
            Target::Resolved(a) => a,
            Target::Rejected(msg) => return msg,
        };
        match ws.delete_thread(&address).await {
            Ok(_) => format!("Comment deleted from {file_path} at line {line}"),
            Err(_) => format!("No comment found at {file_path} line {line}"),
        }
    }
}

fn render_file(ws: &Workspace, file: &FileUri) -> String {
    let blocks: Vec<String> = ws
        .store()
        .list_by_file(file)
        .map(|t| {
            let bodies: Vec<&str> = t.comments.iter().map(|c| c.body.as_str()).collect();
            format!("Line {}:\n{}", t.address.one_based_line(), bodies.join("\n"))
        })
        .collect();
    if blocks.is_empty() {
        NO_COMMENTS.to_owned()
    } else {
        blocks.join("\n\n")
    }
}

/// Progress lines logged when a tool starts.
pub mod invocation {
    pub fn add_comment(file_path: &str, line: u32) -> String {
        format!("Adding comment to {file_path} at line {line}")
    }

    pub fn add_reply(file_path: &str, line: u32) -> String {
        format!("Adding reply to thread at {file_path} line {line}")
    }

    pub fn get_comments(file_path: &str) -> String {
        format!("Getting comments for {file_path}")
    }

    pub fn delete_comment(file_path: &str, line: u32) -> String {
        format!("Deleting comment from {file_path} at line {line}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_username_falls_back() {
        assert_eq!(author_or_default(Some("  "), "alice"), "alice");
        assert_eq!(author_or_default(None, ""), "User");
        assert_eq!(author_or_default(Some("bob"), "alice"), "bob");
    }

    #[test]
    fn line_zero_is_rejected() {
        let resolver = PathResolver::new(std::env::temp_dir());
        assert!(matches!(
            target(&resolver, "a.ts", 0),
            Target::Rejected(msg) if msg == "Line numbers start at 1 (got 0)."
        ));
    }

    #[test]
    fn invocation_messages_name_the_location() {
        assert_eq!(invocation::add_comment("a.ts", 3), "Adding comment to a.ts at line 3");
        assert_eq!(invocation::add_reply("a.ts", 3), "Adding reply to thread at a.ts line 3");
        assert_eq!(invocation::get_comments("a.ts"), "Getting comments for a.ts");
        assert_eq!(invocation::delete_comment("a.ts", 3), "Deleting comment from a.ts at line 3");
    }
}
