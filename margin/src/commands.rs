//! Interactive commands that change or traverse the thread store.
//!
//! The keybinding dispatcher only reads the store; anything that mutates it is
//! returned as a [`Command`] and run here against the [`Workspace`], which
//! persists after every mutation. Results are reported on the status bar.

use margin_core::error::StoreError;
use margin_core::navigator::Navigator;
use margin_core::store::Removal;
use margin_core::types::{Address, CommentBody};
use margin_core::workspace::Workspace;

use crate::app::AppState;

/// A store command. Threads are named by address: thread ids do not survive
/// the reload that precedes every command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Start a thread at `address` with `body` as its first comment.
    AddComment { address: Address, body: String },
    /// Append `body` to the thread at `address`.
    Reply { address: Address, body: String },
    DeleteThread(Address),
    /// Remove the `index`th comment; the thread goes too if it was the last one.
    DeleteComment { address: Address, index: usize },
    /// Reveal the thread after `current` in navigation order.
    NextThread { current: Option<Address> },
    /// Reveal the thread before `current` in navigation order.
    PreviousThread { current: Option<Address> },
}

/// Picks up writes from the other process, runs `command`, then refreshes
/// the store-derived parts of `state`.
pub async fn execute(command: Command, ws: &mut Workspace, state: &mut AppState, author: &str) {
    tracing::debug!(?command, "executing command");
    if let Err(e) = ws.sync().await {
        tracing::warn!(error = %e, "cannot check for comment updates before a command");
    }
    match command {
        Command::AddComment { address, body } => {
            match ws.add_comment(address.clone(), CommentBody::PlainText(body), author).await {
                Ok(_) => {
                    let where_ = location(state, &address);
                    state.select_thread(address);
                    state.set_status(format!("Comment added at {where_}"));
                }
                Err(e) => report(state, &e),
            }
        }
        Command::Reply { address, body } => {
            match ws.reply(&address, CommentBody::PlainText(body), author).await {
                Ok(_) => {
                    if let Some(t) = ws.store().find_by_address(&address.file, address.line) {
                        state.comment_cursor = t.comments.len().saturating_sub(1);
                    }
                    state.set_status("Reply added");
                }
                Err(e) => report(state, &e),
            }
        }
        Command::DeleteThread(address) => match ws.delete_thread(&address).await {
            Ok(removed) => {
                let where_ = location(state, &removed.address);
                state.set_status(format!("Thread deleted at {where_}"));
            }
            Err(e) => report(state, &e),
        },
        Command::DeleteComment { address, index } => {
            match ws.delete_comment(&address, index).await {
                Ok(Removal::CommentRemoved) => state.set_status("Comment deleted"),
                Ok(Removal::ThreadRemoved) => {
                    state.set_status("Comment deleted; thread removed with its last comment")
                }
                Err(e) => report(state, &e),
            }
        }
        Command::NextThread { current } => navigate(ws, state, current, Direction::Next),
        Command::PreviousThread { current } => navigate(ws, state, current, Direction::Previous),
    }
    state.refresh(ws.store());
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Next,
    Previous,
}

fn navigate(ws: &Workspace, state: &mut AppState, current: Option<Address>, direction: Direction) {
    let store = ws.store();
    let navigator = Navigator::snapshot(store);
    let order = navigator.order();
    let current = current
        .and_then(|a| store.find_by_address(&a.file, a.line))
        .map(|t| t.id);
    // With nothing selected, start from the first or the last thread.
    let target = match (current, direction) {
        (Some(id), Direction::Next) => navigator.next(id),
        (Some(id), Direction::Previous) => navigator.previous(id),
        (None, Direction::Next) => order.first().copied(),
        (None, Direction::Previous) => order.last().copied(),
    };
    let Some(thread) = target.and_then(|id| store.thread(id)) else {
        state.set_status("No comment threads");
        return;
    };
    let position = order.iter().position(|id| *id == thread.id).map_or(0, |i| i + 1);
    let address = thread.address.clone();
    state.set_status(format!(
        "Thread {position} of {}: {}",
        order.len(),
        location(state, &address)
    ));
    state.reveal(address);
}

fn location(state: &AppState, address: &Address) -> String {
    format!("{}:{}", state.resolver.display(&address.file), address.one_based_line())
}

fn report(state: &mut AppState, error: &StoreError) {
    tracing::debug!(%error, "command refused");
    state.set_status(error.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use margin_core::db;
    use margin_core::root::PathResolver;
    use margin_core::types::FileUri;

    struct Fixture {
        dir: tempfile::TempDir,
        ws: Workspace,
        state: AppState,
    }

    impl Fixture {
        fn file(&self, name: &str) -> FileUri {
            self.state.resolver.resolve(name).unwrap()
        }

        fn at(&self, name: &str, line: u32) -> Address {
            Address::new(self.file(name), line)
        }

        fn db_path(&self) -> String {
            self.dir.path().join("comments.db").to_string_lossy().to_string()
        }

        async fn run(&mut self, command: Command) {
            execute(command, &mut self.ws, &mut self.state, "me").await;
        }

        fn status(&self) -> &str {
            self.state.status.as_deref().unwrap_or_default()
        }
    }

    async fn fixture() -> Fixture {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("comments.db").to_string_lossy().to_string();
        let (ws, _) = Workspace::open(db::open_db(&path).await.unwrap()).await.unwrap();
        let state = AppState::new(PathResolver::new(dir.path()), None);
        Fixture { dir, ws, state }
    }

    async fn add(f: &mut Fixture, name: &str, line: u32, body: &str) {
        let address = f.at(name, line);
        f.run(Command::AddComment { address, body: body.into() }).await;
    }

    #[tokio::test]
    async fn add_selects_the_new_thread() {
        let mut f = fixture().await;
        add(&mut f, "a.rs", 4, "check bounds").await;

        let address = f.at("a.rs", 4);
        assert_eq!(f.state.selected_thread, Some(address.clone()));
        let expected = format!("Comment added at {}:5", f.state.resolver.display(&address.file));
        assert_eq!(f.status(), expected);
        let thread = f.ws.store().find_by_address(&address.file, 4).unwrap();
        assert_eq!(thread.comments[0].author, "me");
        assert!(thread.comments[0].body.is_plain());
    }

    #[tokio::test]
    async fn occupied_line_reports_and_keeps_the_store() {
        let mut f = fixture().await;
        add(&mut f, "a.rs", 4, "first").await;
        add(&mut f, "a.rs", 4, "second").await;

        assert!(f.status().starts_with("a thread already exists"));
        assert_eq!(f.ws.store().len(), 1);
    }

    #[tokio::test]
    async fn navigation_without_selection_starts_at_the_ends() {
        let mut f = fixture().await;
        add(&mut f, "b.rs", 0, "later file").await;
        add(&mut f, "a.rs", 9, "earlier file").await;

        f.run(Command::NextThread { current: None }).await;
        let first = f.at("a.rs", 9);
        assert_eq!(f.state.selected_thread, Some(first.clone()));
        assert_eq!(f.state.cursor_line, 9);
        let expected = format!("Thread 1 of 2: {}:10", f.state.resolver.display(&first.file));
        assert_eq!(f.status(), expected);

        f.run(Command::PreviousThread { current: None }).await;
        let last = f.at("b.rs", 0);
        assert_eq!(f.state.selected_thread, Some(last.clone()));
        assert_eq!(f.state.open_file, Some(last.file.clone()));
        assert!(f.status().starts_with("Thread 2 of 2"));
    }

    #[tokio::test]
    async fn navigation_wraps_from_the_current_thread() {
        let mut f = fixture().await;
        add(&mut f, "a.rs", 1, "one").await;
        add(&mut f, "a.rs", 2, "two").await;

        let current = Some(f.at("a.rs", 2));
        f.run(Command::NextThread { current }).await;
        assert_eq!(f.state.selected_thread, Some(f.at("a.rs", 1)));
        assert!(f.status().starts_with("Thread 1 of 2"));
    }

    #[tokio::test]
    async fn navigation_on_empty_store() {
        let mut f = fixture().await;
        f.run(Command::NextThread { current: None }).await;
        assert_eq!(f.status(), "No comment threads");
        assert_eq!(f.state.selected_thread, None);
    }

    #[tokio::test]
    async fn reply_moves_cursor_to_the_new_comment() {
        let mut f = fixture().await;
        add(&mut f, "a.rs", 3, "question").await;
        let address = f.at("a.rs", 3);
        assert_eq!(f.state.comment_cursor, 0);

        f.run(Command::Reply { address: address.clone(), body: "answer".into() }).await;
        assert_eq!(f.status(), "Reply added");
        assert_eq!(f.state.comment_cursor, 1);
        let thread = f.ws.store().find_by_address(&address.file, 3).unwrap();
        assert_eq!(thread.comments[1].body.as_str(), "answer");
    }

    #[tokio::test]
    async fn deleting_the_last_comment_removes_the_thread() {
        let mut f = fixture().await;
        add(&mut f, "a.rs", 3, "question").await;
        let address = f.at("a.rs", 3);
        f.run(Command::Reply { address: address.clone(), body: "answer".into() }).await;

        f.run(Command::DeleteComment { address: address.clone(), index: 1 }).await;
        assert_eq!(f.status(), "Comment deleted");
        assert_eq!(f.ws.store().len(), 1);

        f.run(Command::DeleteComment { address: address.clone(), index: 0 }).await;
        assert_eq!(f.status(), "Comment deleted; thread removed with its last comment");
        assert!(f.ws.store().is_empty());
        assert_eq!(f.state.selected_thread, None);
    }

    #[tokio::test]
    async fn delete_thread_reports_its_location() {
        let mut f = fixture().await;
        add(&mut f, "a.rs", 0, "drop me").await;
        let address = f.at("a.rs", 0);

        f.run(Command::DeleteThread(address.clone())).await;
        let expected = format!("Thread deleted at {}:1", f.state.resolver.display(&address.file));
        assert_eq!(f.status(), expected);

        f.run(Command::DeleteThread(address)).await;
        assert!(f.status().starts_with("no thread at"));
    }

    #[tokio::test]
    async fn commands_see_writes_from_the_other_process() {
        let mut f = fixture().await;
        let (mut agent, _) = Workspace::open(db::open_db_shared(&f.db_path()).await.unwrap())
            .await
            .unwrap();
        agent
            .add_comment(f.at("a.rs", 9), CommentBody::FormattedText("agent note".into()), "bot")
            .await
            .unwrap();

        // No tick in between: the command itself must pick up the agent's thread.
        let agent_thread = f.at("a.rs", 9);
        f.run(Command::Reply { address: agent_thread.clone(), body: "seen".into() }).await;
        assert_eq!(f.status(), "Reply added");
        add(&mut f, "b.rs", 0, "mine").await;

        assert!(agent.sync().await.unwrap());
        let store = agent.store();
        assert_eq!(store.len(), 2);
        let bodies: Vec<&str> = store
            .find_by_address(&agent_thread.file, 9)
            .unwrap()
            .comments
            .iter()
            .map(|c| c.body.as_str())
            .collect();
        assert_eq!(bodies, ["agent note", "seen"]);
    }
}
