//! Responsive 3-panel layout engine for margin.
//!
//! Pure layout arithmetic plus the shared panel chrome (bordered blocks and the
//! status bar). Called inside `terminal.draw()` on every render, so every frame
//! reflects the current terminal size.
//!
//! At `>= 120` columns all three panels are visible with widths driven by
//! `AppState.left_pct / center_pct / right_pct`. Narrower terminals collapse the
//! file list; below 80 columns the thread panel collapses too and the source
//! fills the full width.
//!
//! `Spacing::Overlap(1)` combined with `Block::merge_borders(MergeStrategy::Fuzzy)`
//! makes adjacent panel borders share a single column.

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Margin, Rect, Spacing},
    style::{Modifier, Style},
    symbols::merge::MergeStrategy,
    text::{Line, Span},
    widgets::{Block, BorderType, Paragraph},
};

use crate::app::{AppState, Mode};
use crate::theme::Theme;

/// Returns `[left, center, right, status_bar]` panel `Rect`s for the current frame.
pub fn compute_layout(frame: &Frame, state: &AppState) -> [Rect; 4] {
    let term_width = frame.area().width;

    let [main_area, status_bar] =
        frame.area().layout(&Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]));

    let constraints = if term_width >= 120 {
        [
            Constraint::Percentage(state.left_pct),
            Constraint::Percentage(state.center_pct),
            Constraint::Percentage(state.right_pct),
        ]
    } else if term_width >= 80 {
        [
            Constraint::Length(0),
            Constraint::Fill(1),
            Constraint::Percentage(state.right_pct.max(35)),
        ]
    } else {
        [Constraint::Length(0), Constraint::Fill(1), Constraint::Length(0)]
    };
    let horizontal = Layout::horizontal(constraints).spacing(Spacing::Overlap(1));

    let [left, center, right] = main_area.layout(&horizontal);

    [left, center, right, status_bar]
}

/// Inner `Rect` of a panel after removing the 1-cell border on each side.
pub fn inner_rect(area: Rect) -> Rect {
    area.inner(Margin { vertical: 1, horizontal: 1 })
}

/// Builds a bordered `Block` for a panel.
///
/// Focused panels get `BorderType::Thick`. `MergeStrategy::Fuzzy` is required
/// because `Exact` produces wrong junctions when Thick and Plain borders meet.
pub fn panel_block<'a>(title: impl Into<Line<'a>>, is_focused: bool, theme: &Theme) -> Block<'a> {
    let border_style = if is_focused {
        Style::default().fg(theme.border_active)
    } else {
        Style::default().fg(theme.border_inactive)
    };
    let border_type = if is_focused { BorderType::Thick } else { BorderType::Plain };

    Block::bordered()
        .title(title)
        .border_type(border_type)
        .border_style(border_style)
        .merge_borders(MergeStrategy::Fuzzy)
}

/// Renders the 1-row status bar: mode, cursor location, and the last
/// command result.
pub fn render_status_bar(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let (mode_text, mode_fg) = match state.mode {
        Mode::Insert => (" INSERT ", theme.status_mode_insert),
        Mode::Normal | Mode::ConfirmQuit | Mode::HelpOverlay => {
            (" NORMAL ", theme.status_mode_normal)
        }
    };

    let mut spans = vec![Span::styled(
        mode_text,
        Style::default().fg(mode_fg).add_modifier(Modifier::BOLD),
    )];

    if let Some(file) = &state.open_file {
        let mut location = format!(" {}:{}", state.resolver.display(file), state.cursor_line + 1);
        if state.source_loading {
            location.push_str(" (loading)");
        }
        spans.push(Span::raw(location));
    }

    if let Some(message) = &state.status {
        spans.push(Span::raw("  "));
        spans.push(Span::styled(message.clone(), Style::default().fg(theme.status_message)));
    } else if state.mode == Mode::Normal && state.has_unsaved_comment() {
        spans.push(Span::styled("  draft pending (i to resume)", Style::default().fg(theme.muted)));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .style(Style::default().bg(theme.status_bar_bg).fg(theme.status_bar_fg)),
        area,
    );
}
