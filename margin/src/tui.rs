//! Terminal lifecycle management for margin.
//!
//! The UI draws on stderr. `margin-mcp` speaks JSON-RPC on stdout and may run in
//! the same terminal session, and stdout stays clean for pipelines. Because
//! stderr is taken, logs go to a file (see `main.rs`).

use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use signal_hook::consts::SIGTERM;
use signal_hook::flag::register;
use std::io::{stderr, BufWriter, Stderr};
use std::panic;
use std::sync::{atomic::AtomicBool, Arc};

/// CrosstermBackend over a buffered stderr writer.
///
/// `BufWriter` batches escape sequences into fewer write(2) calls per frame.
pub type Tui = Terminal<CrosstermBackend<BufWriter<Stderr>>>;

/// Enables raw mode, enters the alternate screen, and turns on mouse capture.
/// Call [`restore_tui`] at every exit path.
pub fn init_tui() -> std::io::Result<Tui> {
    let mut out = BufWriter::new(stderr());
    enable_raw_mode()?;
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    Terminal::new(CrosstermBackend::new(out))
}

/// Restores the terminal to its pre-UI state. Idempotent.
///
/// ratatui does not restore the terminal on `Drop`, so this runs on every exit
/// path including the panic hook.
pub fn restore_tui() -> std::io::Result<()> {
    disable_raw_mode()?;
    execute!(stderr(), LeaveAlternateScreen, DisableMouseCapture)?;
    Ok(())
}

/// Installs a panic hook that restores the terminal, logs the panic, and then
/// chains to the previous hook so the message still prints.
///
/// Must be called before [`init_tui`].
pub fn install_panic_hook() {
    let original_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        let _ = restore_tui();
        tracing::error!(%panic_info, "margin panicked");
        original_hook(panic_info);
    }));
}

/// Returns a flag that flips to `true` when the process receives SIGTERM.
/// The event loop polls it on its heartbeat.
///
/// # Errors
///
/// Fails if the OS refuses to register the handler.
pub fn register_sigterm() -> std::io::Result<Arc<AtomicBool>> {
    let term = Arc::new(AtomicBool::new(false));
    register(SIGTERM, Arc::clone(&term))?;
    Ok(term)
}
