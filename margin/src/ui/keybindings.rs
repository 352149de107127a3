//! Keybinding dispatcher for margin.
//!
//! Translates raw crossterm `KeyEvent`s into `AppState` mutations and returns a
//! `KeyAction` telling the event loop whether to continue, quit, or run a
//! store command. The dispatcher branches first on `state.mode` so that
//! HelpOverlay, ConfirmQuit, Insert, and Normal all have isolated handlers.
//!
//! The store is passed in read-only to check selections; mutations are
//! returned as [`Command`]s for `commands::execute`.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Position;

use margin_core::store::ThreadStore;

use crate::app::{AppState, InputTarget, Mode, PanelFocus};
use crate::commands::Command;
use crate::ui::layout::inner_rect;

/// Control-flow signal returned from the key dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Continue the event loop normally.
    Continue,
    /// Exit cleanly.
    Quit,
    /// Run a store command, then continue.
    Run(Command),
}

/// Dispatches a key event to the handler matching the current mode.
pub fn handle_key(key: KeyEvent, state: &mut AppState, store: &ThreadStore) -> KeyAction {
    if state.mode == Mode::Normal {
        state.status = None;
    }
    let action = match state.mode {
        Mode::HelpOverlay => handle_help(key, state),
        Mode::ConfirmQuit => handle_confirm_quit(key, state),
        Mode::Normal => handle_normal(key, state, store),
        Mode::Insert => handle_insert(key, state),
    };
    if state.focus == PanelFocus::Source && state.mode == Mode::Normal {
        state.follow_cursor(store);
    }
    action
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

fn handle_normal(key: KeyEvent, state: &mut AppState, store: &ThreadStore) -> KeyAction {
    if let Some(action) = handle_scroll_key(key, state) {
        return action;
    }
    if let Some(action) = handle_file_list_key(key, state) {
        return action;
    }
    if let Some(action) = handle_thread_key(key, state, store) {
        return action;
    }

    match key.code {
        // Panel focus
        KeyCode::Char('H') => {
            state.focus = state.focus.prev();
            KeyAction::Continue
        }
        KeyCode::Char('L') | KeyCode::Tab => {
            state.focus = state.focus.next();
            KeyAction::Continue
        }

        // Source panel resize
        KeyCode::Char('<') => { state.shrink_source_panel(); KeyAction::Continue }
        KeyCode::Char('>') => { state.grow_source_panel(); KeyAction::Continue }

        KeyCode::Char('?') => {
            state.help_scroll = 0;
            state.mode = Mode::HelpOverlay;
            KeyAction::Continue
        }

        KeyCode::Char('q') | KeyCode::Esc => {
            if state.has_unsaved_comment() {
                state.mode = Mode::ConfirmQuit;
                KeyAction::Continue
            } else {
                KeyAction::Quit
            }
        }

        _ => KeyAction::Continue,
    }
}

/// Comment and thread commands. Available from any panel.
fn handle_thread_key(key: KeyEvent, state: &mut AppState, store: &ThreadStore) -> Option<KeyAction> {
    let current = state.selected(store).map(|t| t.address.clone());
    let action = match key.code {
        KeyCode::Char('c') => {
            let Some(address) = state.cursor_address() else {
                state.set_status("Open a file first");
                return Some(KeyAction::Continue);
            };
            if store.find_by_address(&address.file, address.line).is_some() {
                state.set_status("This line already has a thread; press r to reply");
            } else {
                state.begin_input(InputTarget::NewThread(address));
            }
            KeyAction::Continue
        }
        KeyCode::Char('r') => {
            match current {
                Some(address) => state.begin_input(InputTarget::Reply(address)),
                None => state.set_status("No thread selected"),
            }
            KeyAction::Continue
        }
        KeyCode::Char('i') => {
            match state.input_target.clone() {
                Some(target) => state.begin_input(target),
                None => state.set_status("No draft to resume"),
            }
            KeyAction::Continue
        }
        KeyCode::Char('n') | KeyCode::Char(']') => KeyAction::Run(Command::NextThread { current }),
        KeyCode::Char('N') | KeyCode::Char('[') => {
            KeyAction::Run(Command::PreviousThread { current })
        }
        KeyCode::Char('D') => match current {
            Some(address) => KeyAction::Run(Command::DeleteThread(address)),
            None => {
                state.set_status("No thread selected");
                KeyAction::Continue
            }
        },
        KeyCode::Char('x') => {
            let index = state.comment_cursor;
            let selected = state
                .selected(store)
                .filter(|t| index < t.comments.len())
                .map(|t| t.address.clone());
            match selected {
                Some(address) => KeyAction::Run(Command::DeleteComment { address, index }),
                None => {
                    state.set_status("No comment selected");
                    KeyAction::Continue
                }
            }
        }
        _ => return None,
    };
    Some(action)
}

/// Enter / l open the selected file when the file list is focused.
fn handle_file_list_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    match key.code {
        KeyCode::Enter | KeyCode::Char('l') if state.focus == PanelFocus::FileList => {
            state.open_selected_file();
            Some(KeyAction::Continue)
        }
        _ => None,
    }
}

/// j / k / g / G and the Ctrl page keys, applied to the focused panel.
fn handle_scroll_key(key: KeyEvent, state: &mut AppState) -> Option<KeyAction> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => state.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => state.scroll_up(1),
        KeyCode::Char('g') | KeyCode::Home => state.scroll_top(),
        KeyCode::Char('G') | KeyCode::End => state.scroll_bottom(),
        KeyCode::Char('d') if ctrl => state.half_page_down(),
        KeyCode::Char('u') if ctrl => state.half_page_up(),
        KeyCode::Char('f') if ctrl => state.full_page_down(),
        KeyCode::Char('b') if ctrl => state.full_page_up(),
        KeyCode::PageDown => state.full_page_down(),
        KeyCode::PageUp => state.full_page_up(),
        _ => return None,
    }
    Some(KeyAction::Continue)
}

// ---------------------------------------------------------------------------
// HelpOverlay mode
// ---------------------------------------------------------------------------

fn handle_help(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('j') => state.help_scroll = state.help_scroll.saturating_add(1),
        KeyCode::Char('k') => state.help_scroll = state.help_scroll.saturating_sub(1),
        KeyCode::Char('g') => state.help_scroll = 0,
        KeyCode::Char('G') => state.help_scroll = u16::MAX,
        KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q') => state.mode = Mode::Normal,
        _ => {}
    }
    KeyAction::Continue
}

// ---------------------------------------------------------------------------
// ConfirmQuit mode
// ---------------------------------------------------------------------------

/// `y` quits and drops the draft; `n` / `Esc` go back to Normal mode.
fn handle_confirm_quit(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Char('y') | KeyCode::Char('Y') => KeyAction::Quit,
        KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
            state.mode = Mode::Normal;
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

// ---------------------------------------------------------------------------
// Insert mode
// ---------------------------------------------------------------------------

/// Edits the draft. `Enter` submits, `Alt-Enter` inserts a newline, `Esc`
/// leaves the draft in place and returns to Normal mode.
fn handle_insert(key: KeyEvent, state: &mut AppState) -> KeyAction {
    match key.code {
        KeyCode::Esc => {
            state.mode = Mode::Normal;
            KeyAction::Continue
        }
        KeyCode::Enter if key.modifiers.contains(KeyModifiers::ALT) => {
            state.input.push('\n');
            KeyAction::Continue
        }
        KeyCode::Enter => submit(state),
        KeyCode::Backspace => {
            state.input.pop();
            KeyAction::Continue
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            state.input.clear();
            KeyAction::Continue
        }
        KeyCode::Char(c) => {
            state.input.push(c);
            KeyAction::Continue
        }
        _ => KeyAction::Continue,
    }
}

fn submit(state: &mut AppState) -> KeyAction {
    let Some((target, body)) = state.take_input() else {
        return KeyAction::Continue;
    };
    let body = body.trim().to_owned();
    if body.is_empty() {
        state.set_status("Empty comment discarded");
        return KeyAction::Continue;
    }
    KeyAction::Run(match target {
        InputTarget::NewThread(address) => Command::AddComment { address, body },
        InputTarget::Reply(address) => Command::Reply { address, body },
    })
}

// ---------------------------------------------------------------------------
// Mouse events
// ---------------------------------------------------------------------------

/// Left click focuses a panel (and moves the cursor in the source panel);
/// the wheel moves the focused panel by 3 rows.
pub fn handle_mouse(mouse: MouseEvent, state: &mut AppState, store: &ThreadStore) {
    if !matches!(state.mode, Mode::Normal | Mode::HelpOverlay) {
        return;
    }
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) if state.mode == Mode::Normal => {
            handle_mouse_click(mouse.column, mouse.row, state, store)
        }
        MouseEventKind::ScrollUp => {
            if state.mode == Mode::HelpOverlay {
                state.help_scroll = state.help_scroll.saturating_sub(3);
            } else {
                state.scroll_up(3);
            }
        }
        MouseEventKind::ScrollDown => {
            if state.mode == Mode::HelpOverlay {
                state.help_scroll = state.help_scroll.saturating_add(3);
            } else {
                state.scroll_down(3);
            }
        }
        _ => {}
    }
}

/// Collapsed (zero-width) panels cannot receive focus via click.
fn handle_mouse_click(col: u16, row: u16, state: &mut AppState, store: &ThreadStore) {
    let pos = Position { x: col, y: row };
    let [left, center, right] = state.panel_rects;

    if left.width > 0 && left.contains(pos) {
        state.focus = PanelFocus::FileList;
    } else if center.contains(pos) {
        state.focus = PanelFocus::Source;
        let inner = inner_rect(center);
        if inner.contains(pos) && !state.source_lines.is_empty() {
            let line = state.source_scroll + usize::from(row - inner.y);
            if line < state.source_lines.len() {
                state.cursor_to(u32::try_from(line).unwrap_or(u32::MAX));
                state.follow_cursor(store);
            }
        }
    } else if right.width > 0 && right.contains(pos) {
        state.focus = PanelFocus::Thread;
    }
}
