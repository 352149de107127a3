//! Integration test for the state database lifecycle.
//!
//! Exercises: open_db, open_db_shared, migrate, load_state, save_state,
//! save_state_if_current, data_version, and Workspace restore / sync / write
//! conflicts across two connections.

use margin_core::db;
use margin_core::error::StoreError;
use margin_core::store::Removal;
use margin_core::types::{Address, CommentBody, FileUri};
use margin_core::workspace::Workspace;

fn temp_db_path() -> String {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.keep().join("test.db");
    path.to_string_lossy().to_string()
}

fn addr(name: &str, line: u32) -> Address {
    Address::new(FileUri::parse(&format!("file:///work/{name}")).unwrap(), line)
}

#[tokio::test]
async fn schema_and_raw_state() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();

    // Verify schema_version = 1
    let version: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(db.query_row(
                "SELECT MAX(version) FROM schema_version",
                [],
                |r| r.get(0),
            )?)
        })
        .await
        .unwrap();
    assert_eq!(version, 1, "schema_version should be 1");

    // Verify WAL mode
    let journal: String = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(
                db.query_row("PRAGMA journal_mode", [], |r| r.get(0))?,
            )
        })
        .await
        .unwrap();
    assert_eq!(journal, "wal", "journal_mode should be wal");

    // First run: nothing persisted
    let state = db::load_state(&conn).await.unwrap();
    assert_eq!(state, db::StoredState::default());

    db::save_state(&conn, "[]".to_owned(), 7).await.unwrap();
    db::save_state(&conn, r#"[{"uri":"file:///x","line":0,"comments":[]}]"#.to_owned(), 9)
        .await
        .unwrap();

    let state = db::load_state(&conn).await.unwrap();
    assert_eq!(state.comment_id, Some(9), "second save should overwrite the counter");
    assert!(state.threads.unwrap().contains("file:///x"));

    // Exactly two keys, upserted in place
    let rows: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(
                db.query_row("SELECT COUNT(*) FROM workspace_state", [], |r| r.get(0))?,
            )
        })
        .await
        .unwrap();
    assert_eq!(rows, 2);

    // Reopening migrates idempotently and keeps data
    let conn2 = db::open_db_shared(&path).await.unwrap();
    assert_eq!(db::load_state(&conn2).await.unwrap().comment_id, Some(9));
}

#[tokio::test]
async fn workspace_persists_every_mutation() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();
    let (mut ws, skipped) = Workspace::open(conn).await.unwrap();
    assert!(skipped.is_empty());
    assert!(ws.store().is_empty());

    ws.add_comment(addr("a.ts", 9), CommentBody::FormattedText("fix this".into()), "alice")
        .await
        .unwrap();
    ws.reply(&addr("a.ts", 9), CommentBody::PlainText("ok".into()), "bob")
        .await
        .unwrap();
    let counter = ws.store().comment_counter();
    drop(ws);

    // A fresh process sees both comments and continues the id sequence.
    let conn = db::open_db(&path).await.unwrap();
    let (ws, _) = Workspace::open(conn).await.unwrap();
    let restored = &ws.store().threads()[0];
    assert_eq!(restored.address, addr("a.ts", 9));
    let bodies: Vec<&str> = restored.comments.iter().map(|c| c.body.as_str()).collect();
    assert_eq!(bodies, ["fix this", "ok"]);
    assert_eq!(restored.comments[1].author, "bob");
    assert!(restored.comments.iter().all(|c| c.id.0 > counter));
}

#[tokio::test]
async fn failed_mutation_writes_nothing() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();
    let (mut ws, _) = Workspace::open(conn).await.unwrap();

    let err = ws
        .reply(&addr("a.ts", 1), CommentBody::FormattedText("ok".into()), "bob")
        .await
        .unwrap_err();
    assert!(err.is_thread_not_found());

    let reader = db::open_db_shared(&path).await.unwrap();
    assert_eq!(db::load_state(&reader).await.unwrap(), db::StoredState::default());
}

#[tokio::test]
async fn sync_picks_up_writes_from_another_connection() {
    let path = temp_db_path();
    let (mut ui, _) = Workspace::open(db::open_db(&path).await.unwrap()).await.unwrap();
    let (mut agent, _) = Workspace::open(db::open_db_shared(&path).await.unwrap())
        .await
        .unwrap();

    assert!(!ui.sync().await.unwrap(), "nothing written yet");

    agent
        .add_comment(addr("b.ts", 0), CommentBody::FormattedText("from agent".into()), "bot")
        .await
        .unwrap();

    assert!(ui.sync().await.unwrap(), "agent commit should be visible");
    assert_eq!(ui.store().len(), 1);
    assert!(!ui.sync().await.unwrap(), "second sync has nothing new");

    // The UI's own write does not trigger a reload on the UI side.
    ui.reply(&addr("b.ts", 0), CommentBody::PlainText("seen".into()), "me")
        .await
        .unwrap();
    assert!(!ui.sync().await.unwrap());
    assert!(agent.sync().await.unwrap());
    assert_eq!(agent.store().threads()[0].comments.len(), 2);
}

#[tokio::test]
async fn unsynced_write_keeps_the_other_connections_commit() {
    let path = temp_db_path();
    let (mut ui, _) = Workspace::open(db::open_db(&path).await.unwrap()).await.unwrap();
    let (mut agent, _) = Workspace::open(db::open_db_shared(&path).await.unwrap())
        .await
        .unwrap();

    agent
        .add_comment(addr("a.ts", 9), CommentBody::FormattedText("agent note".into()), "bot")
        .await
        .unwrap();
    let agent_id = agent.store().threads()[0].comments[0].id;

    // The UI writes from a load that predates the agent's commit.
    ui.add_comment(addr("b.ts", 0), CommentBody::PlainText("mine".into()), "me")
        .await
        .unwrap();
    assert_eq!(ui.store().len(), 2, "the stale write reloaded and re-applied");
    assert!(!ui.sync().await.unwrap());

    assert!(agent.sync().await.unwrap());
    let store = agent.store();
    let agent_thread = store.find_by_address(&addr("a.ts", 9).file, 9).unwrap();
    assert_eq!(agent_thread.comments[0].body.as_str(), "agent note");
    let mine = store.find_by_address(&addr("b.ts", 0).file, 0).unwrap();
    assert_eq!(mine.comments[0].body.as_str(), "mine");

    // The persisted counter moved past the agent's allocation.
    let counter = db::load_state(&db::open_db_shared(&path).await.unwrap())
        .await
        .unwrap()
        .comment_id
        .unwrap();
    assert!(counter > agent_id.0);
}

#[tokio::test]
async fn unsynced_mutation_is_checked_against_fresh_state() {
    let path = temp_db_path();
    let (mut ui, _) = Workspace::open(db::open_db(&path).await.unwrap()).await.unwrap();
    let (mut agent, _) = Workspace::open(db::open_db_shared(&path).await.unwrap())
        .await
        .unwrap();

    agent
        .add_comment(addr("a.ts", 1), CommentBody::FormattedText("agent".into()), "bot")
        .await
        .unwrap();

    // Same address: after the reload the UI's create is a duplicate.
    let err = ui
        .add_comment(addr("a.ts", 1), CommentBody::PlainText("mine".into()), "me")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateAddress { line: 1, .. }));
    assert_eq!(ui.store().threads()[0].comments[0].body.as_str(), "agent");

    assert!(!agent.sync().await.unwrap(), "the refused write committed nothing");
}

#[tokio::test]
async fn conditional_save_refuses_outdated_version() {
    let path = temp_db_path();
    let ui = db::open_db(&path).await.unwrap();
    let agent = db::open_db_shared(&path).await.unwrap();

    let seen = db::data_version(&ui).await.unwrap();
    let outcome = db::save_state_if_current(&ui, "[]".to_owned(), 1, seen).await.unwrap();
    assert_eq!(outcome, db::SaveOutcome::Saved(seen));

    db::save_state(&agent, "[]".to_owned(), 5).await.unwrap();
    let outcome = db::save_state_if_current(&ui, "[]".to_owned(), 2, seen).await.unwrap();
    assert_eq!(outcome, db::SaveOutcome::Stale);
    assert_eq!(db::load_state(&ui).await.unwrap().comment_id, Some(5));
}

#[tokio::test]
async fn delete_comment_by_position() {
    let path = temp_db_path();
    let (mut ws, _) = Workspace::open(db::open_db(&path).await.unwrap()).await.unwrap();
    ws.add_comment(addr("a.ts", 2), CommentBody::PlainText("one".into()), "u")
        .await
        .unwrap();

    let err = ws.delete_comment(&addr("a.ts", 2), 3).await.unwrap_err();
    assert!(matches!(err, StoreError::NoCommentAt { index: 3, .. }));
    assert_eq!(err.to_string(), format!("no comment 4 in the thread at {} line 2", addr("a.ts", 2).file));

    assert_eq!(ws.delete_comment(&addr("a.ts", 2), 0).await.unwrap(), Removal::ThreadRemoved);
    assert!(ws.store().is_empty());
}

#[tokio::test]
async fn malformed_records_are_dropped_on_open() {
    let path = temp_db_path();
    let conn = db::open_db(&path).await.unwrap();
    db::save_state(
        &conn,
        r#"[
            {"uri": "::nope::", "line": 0, "comments": [{"body": "lost", "author": "u"}]},
            {"uri": "file:///work/a.ts", "line": 2, "comments": [{"body": "kept", "author": "u"}]},
            {"uri": "file:///work/a.ts", "line": 4294967295, "comments": [{"body": "lost", "author": "u"}]}
        ]"#
        .to_owned(),
        3,
    )
    .await
    .unwrap();

    let (ws, skipped) = Workspace::open(conn).await.unwrap();
    let indices: Vec<usize> = skipped.iter().map(|s| s.index).collect();
    assert_eq!(indices, [0, 2]);
    assert_eq!(ws.store().len(), 1);
    assert_eq!(ws.store().threads()[0].comments[0].id.0, 4);
}

#[tokio::test]
async fn migration_handles_legacy_db() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("legacy.db").to_string_lossy().to_string();

    // A database that already has unrelated tables
    {
        let db = rusqlite::Connection::open(&path).unwrap();
        db.execute_batch(
            "CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT NOT NULL);
             INSERT INTO notes (body) VALUES ('old');",
        )
        .unwrap();
    }

    let conn = db::open_db(&path).await.unwrap();
    db::save_state(&conn, "[]".to_owned(), 1).await.unwrap();
    assert_eq!(db::load_state(&conn).await.unwrap().comment_id, Some(1));

    let notes: i64 = conn
        .call(|db| {
            Ok::<_, rusqlite::Error>(
                db.query_row("SELECT COUNT(*) FROM notes", [], |r| r.get(0))?,
            )
        })
        .await
        .unwrap();
    assert_eq!(notes, 1, "unrelated tables are left alone");
}
