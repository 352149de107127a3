//! margin: line-anchored comment threads in the terminal.
//!
//! Entry point for the `margin` binary. Wires together configuration and
//! logging, the shared WAL-mode SQLite database (`margin-core`), the terminal
//! lifecycle (`tui`), the unified event bus (`event`), the source-highlighting
//! worker (`source`), and rendering (`ui`).
//!
//! # Startup sequence
//!
//! 1. Parse flags and load the XDG config; discover the workspace root.
//! 2. Open `<root>/.margin/margin.log` and install the tracing subscriber.
//!    stderr belongs to the UI, so nothing is logged there.
//! 3. Open the database and restore threads before the terminal is touched,
//!    so startup errors print normally.
//! 4. `install_panic_hook()`, `register_sigterm()`, then `init_tui()`.
//! 5. Spawn the event task and the source worker thread; run the event loop.
//!
//! `restore_tui()` runs once the loop returns, whether it quit normally, saw
//! SIGTERM, or failed to draw. The panic hook covers panics.

mod app;
mod commands;
mod event;
mod source;
mod theme;
mod tui;
mod ui;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Context as _};
use clap::Parser;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

use margin_core::config::Config;
use margin_core::root::{discover_root, PathResolver};
use margin_core::store::ThreadStore;
use margin_core::types::Address;
use margin_core::workspace::Workspace;

use app::{AppState, InputTarget};
use event::AppEvent;
use ui::keybindings::{self, KeyAction};

#[derive(Debug, Parser)]
#[command(name = "margin", about = "Line-anchored comment threads for a source tree")]
struct Args {
    /// File to open, optionally with a 1-based line to comment on.
    #[arg(value_name = "FILE[:LINE]")]
    location: Option<String>,
    /// Workspace root; relative paths resolve against it.
    #[arg(long)]
    root: Option<PathBuf>,
    /// Database file (default: <root>/.margin/comments.db).
    #[arg(long)]
    db: Option<PathBuf>,
    /// Author recorded on new comments.
    #[arg(long)]
    author: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (config, config_problem) = Config::load();

    let cwd = std::env::current_dir().context("cannot read current directory")?;
    let root = discover_root(args.root.as_deref().or(config.root.as_deref()), &cwd);
    let state_dir = root.join(".margin");
    std::fs::create_dir_all(&state_dir)
        .with_context(|| format!("cannot create {}", state_dir.display()))?;

    init_logging(&state_dir.join("margin.log"), &config.log_filter)?;
    if let Some(problem) = config_problem {
        tracing::warn!("{problem}; using defaults");
    }

    let theme = theme::Theme::from_name(&config.theme);
    let author = args.author.unwrap_or_else(|| config.author.clone());
    let resolver = PathResolver::new(&root);
    let start = args
        .location
        .as_deref()
        .map(|raw| start_location(&resolver, raw))
        .transpose()?;

    let db_path = args.db.unwrap_or_else(|| config.database_path(&root));
    if let Some(dir) = db_path.parent() {
        std::fs::create_dir_all(dir).with_context(|| format!("cannot create {}", dir.display()))?;
    }
    let conn = margin_core::db::open_db(&db_path.to_string_lossy())
        .await
        .with_context(|| format!("cannot open {}", db_path.display()))?;
    let (mut workspace, skipped) = Workspace::open(conn).await?;
    tracing::info!(root = %root.display(), db = %db_path.display(), "starting margin");

    tui::install_panic_hook();
    let term_flag = tui::register_sigterm()?;
    let mut terminal = tui::init_tui()?;

    let handler = event::EventHandler::new();
    event::spawn_event_task(handler.tx.clone());
    let (source_tx, source_rx) = crossbeam_channel::unbounded();
    let worker_events = handler.tx.clone();
    let spawned = std::thread::Builder::new()
        .name("margin-source".to_owned())
        .spawn(move || source::worker::source_worker_loop(source_rx, worker_events));
    if let Err(e) = spawned {
        tui::restore_tui()?;
        return Err(e).context("cannot start source worker");
    }
    let mut rx = handler.rx;

    let mut state = AppState::new(resolver, Some(source_tx));
    state.refresh(workspace.store());
    if !skipped.is_empty() {
        state.set_status(format!(
            "{} comment threads could not be restored; see margin.log",
            skipped.len()
        ));
    }
    if let Some(start) = start {
        open_at(&mut state, workspace.store(), start);
    }

    let result = run(
        &mut terminal,
        &mut rx,
        &mut state,
        &mut workspace,
        &theme,
        &author,
        &term_flag,
    )
    .await;

    tui::restore_tui()?;
    tracing::info!("margin stopped");
    result
}

/// The event loop. Returns on quit, SIGTERM, channel close, or a draw error.
async fn run(
    terminal: &mut tui::Tui,
    rx: &mut UnboundedReceiver<AppEvent>,
    state: &mut AppState,
    workspace: &mut Workspace,
    theme: &theme::Theme,
    author: &str,
    term_flag: &AtomicBool,
) -> anyhow::Result<()> {
    loop {
        tokio::select! {
            // Heartbeat: SIGTERM is checked at least every 50ms even when no
            // events arrive.
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                if term_flag.load(Ordering::Relaxed) {
                    tracing::info!("SIGTERM received");
                    return Ok(());
                }
            }
            maybe_event = rx.recv() => {
                let Some(event) = maybe_event else { return Ok(()) };
                match event {
                    AppEvent::Render => {
                        // The only draw() call in the application.
                        terminal.draw(|frame| ui::render(frame, state, workspace.store(), theme))?;
                    }
                    AppEvent::Key(key) => match keybindings::handle_key(key, state, workspace.store()) {
                        KeyAction::Quit => return Ok(()),
                        KeyAction::Run(command) => {
                            commands::execute(command, workspace, state, author).await;
                        }
                        KeyAction::Continue => state.refresh(workspace.store()),
                    },
                    AppEvent::Mouse(mouse) => keybindings::handle_mouse(mouse, state, workspace.store()),
                    AppEvent::Tick => match workspace.sync().await {
                        Ok(true) => state.refresh(workspace.store()),
                        Ok(false) => {}
                        Err(e) => tracing::warn!(error = %e, "cannot check for comment updates"),
                    },
                    AppEvent::SourceLoaded(payload) => state.apply_source(*payload),
                    // ratatui picks up the new size on the next Render.
                    AppEvent::Resize(_, _) => {}
                }
                if term_flag.load(Ordering::Relaxed) {
                    return Ok(());
                }
            }
        }
    }
}

/// Logs go to a file: stderr is the UI's drawing surface.
fn init_logging(path: &Path, fallback_filter: &str) -> anyhow::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("cannot open log file {}", path.display()))?;
    let filter = EnvFilter::try_from_env("MARGIN_LOG")
        .unwrap_or_else(|_| EnvFilter::new(fallback_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// A location given on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Start {
    /// Open the file with the cursor on the first line.
    File(margin_core::types::FileUri),
    /// Open the file and prompt for a comment at this address.
    Comment(Address),
}

/// Splits `FILE[:LINE]`. A suffix that is not a number is part of the path.
fn split_location(raw: &str) -> anyhow::Result<(&str, Option<u32>)> {
    let numeric = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    match raw.rsplit_once(':') {
        Some((path, line)) if !path.is_empty() && numeric(line) => {
            let line: u32 = line.parse().with_context(|| format!("line number out of range: {line}"))?;
            if line == 0 {
                bail!("Line numbers start at 1 (got 0).");
            }
            Ok((path, Some(line)))
        }
        _ => Ok((raw, None)),
    }
}

fn start_location(resolver: &PathResolver, raw: &str) -> anyhow::Result<Start> {
    let (path, line) = split_location(raw)?;
    let Some(file) = resolver.resolve(path) else {
        bail!("Cannot resolve file path {path}");
    };
    Ok(match line.and_then(|n| Address::from_one_based(file.clone(), n)) {
        Some(address) => Start::Comment(address),
        None => Start::File(file),
    })
}

/// Opens the start location. With a line, prompts for a comment there, or
/// selects the existing thread when the line already has one.
fn open_at(state: &mut AppState, store: &ThreadStore, start: Start) {
    match start {
        Start::File(file) => state.open_file(file),
        Start::Comment(address) => {
            state.open_file(address.file.clone());
            state.cursor_line = address.line;
            state.refresh(store);
            if store.find_by_address(&address.file, address.line).is_some() {
                state.select_thread(address);
                state.set_status("This line already has a thread; press r to reply");
            } else {
                state.begin_input(InputTarget::NewThread(address));
            }
        }
    }
    state.refresh(store);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_with_line() {
        assert_eq!(split_location("src/lib.rs:12").unwrap(), ("src/lib.rs", Some(12)));
    }

    #[test]
    fn location_without_line() {
        assert_eq!(split_location("src/lib.rs").unwrap(), ("src/lib.rs", None));
        assert_eq!(split_location("odd:name.rs").unwrap(), ("odd:name.rs", None));
        assert_eq!(split_location("trailing:").unwrap(), ("trailing:", None));
    }

    #[test]
    fn location_line_zero_is_rejected() {
        let err = split_location("a.rs:0").unwrap_err();
        assert_eq!(err.to_string(), "Line numbers start at 1 (got 0).");
    }

    #[cfg(unix)]
    #[test]
    fn start_location_resolves_against_root() {
        let resolver = PathResolver::new("/ws");
        let start = start_location(&resolver, "src/a.rs:3").unwrap();
        let file = margin_core::types::FileUri::parse("file:///ws/src/a.rs").unwrap();
        assert_eq!(start, Start::Comment(Address::new(file.clone(), 2)));
        assert_eq!(start_location(&resolver, "src/a.rs").unwrap(), Start::File(file));
    }

    #[cfg(unix)]
    #[test]
    fn open_at_prompts_on_free_line() {
        let resolver = PathResolver::new("/ws");
        let store = ThreadStore::new();
        let mut state = AppState::new(resolver.clone(), None);
        let start = start_location(&resolver, "a.rs:5").unwrap();
        open_at(&mut state, &store, start);
        assert_eq!(state.mode, app::Mode::Insert);
        assert_eq!(state.cursor_line, 4);
        assert_eq!(state.files.len(), 1);
    }
}
