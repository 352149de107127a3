//! UI rendering module for margin.
//!
//! `render()` is the single entry point called by the event loop's
//! `terminal.draw()` closure. Layout arithmetic lives in `layout.rs`; each
//! panel has its own module.

mod layout;
pub mod file_list;
pub mod help;
pub mod keybindings;
pub mod prompt;
pub mod source_view;
pub mod thread_view;

use ratatui::{Frame, style::Style, widgets::Block};

use margin_core::store::ThreadStore;

use crate::app::{AppState, Mode};
use crate::theme::Theme;
use layout::{compute_layout, inner_rect, render_status_bar};

/// Renders one complete frame: three panels, status bar, and any overlay.
///
/// Viewport heights and panel rects are written back into `state` so the next
/// keypress can compute page distances and mouse hits. The one-frame lag is
/// not noticeable.
pub fn render(frame: &mut Frame, state: &mut AppState, store: &ThreadStore, theme: &Theme) {
    let [left, center, right, status_bar] = compute_layout(frame, state);
    frame.render_widget(Block::default().style(Style::default().bg(theme.background)), frame.area());

    state.file_list_viewport_height = inner_rect(left).height;
    state.source_viewport_height = inner_rect(center).height;
    state.thread_viewport_height = inner_rect(right).height;
    state.panel_rects = [left, center, right];

    if left.width > 0 {
        file_list::render_file_list(frame, left, state, theme);
    }

    source_view::render_source(frame, center, state, theme);

    if right.width > 0 {
        thread_view::render_thread(frame, right, state, store, theme);
    }

    render_status_bar(frame, status_bar, state, theme);

    // Overlays last so they sit on top.
    match state.mode {
        Mode::Insert => prompt::render_comment_prompt(frame, state, theme),
        Mode::HelpOverlay => help::render_help_overlay(frame, theme, state.help_scroll),
        Mode::ConfirmQuit => prompt::render_confirm_quit(frame, theme),
        Mode::Normal => {}
    }
}
