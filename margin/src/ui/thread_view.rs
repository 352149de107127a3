//! Thread panel renderer for margin.
//!
//! Shows the selected thread: a header with its location, then each comment as
//! an author line followed by the body. Bodies are shown as typed; formatted
//! bodies are not rendered as markup. The panel scrolls so the comment under
//! the comment cursor stays in view.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Paragraph, Wrap},
};

use margin_core::store::ThreadStore;
use margin_core::types::Thread;

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

pub fn render_thread(
    frame: &mut Frame,
    area: Rect,
    state: &AppState,
    store: &ThreadStore,
    theme: &Theme,
) {
    let is_focused = state.focus == PanelFocus::Thread;
    let inner = inner_rect(area);

    let Some(thread) = state.selected(store) else {
        frame.render_widget(panel_block("Thread", is_focused, theme), area);
        let hint = Text::from(vec![
            Line::styled("No thread selected.", Style::default().fg(theme.muted)),
            Line::raw(""),
            Line::styled("c  comment on the cursor line", Style::default().fg(theme.muted)),
            Line::styled("n  next thread", Style::default().fg(theme.muted)),
        ]);
        frame.render_widget(Paragraph::new(hint).wrap(Wrap { trim: false }), inner);
        return;
    };

    let title = format!("Thread ({})", thread.comments.len());
    frame.render_widget(panel_block(title, is_focused, theme), area);

    let (text, selected_row) = thread_text(thread, state, theme);
    // Keep the selected comment's author line visible.
    let height = inner.height.max(1);
    let scroll = selected_row.saturating_sub(height / 3);

    frame.render_widget(
        Paragraph::new(text).wrap(Wrap { trim: false }).scroll((scroll, 0)),
        inner,
    );
}

/// Builds the panel text and returns the row of the selected comment's author
/// line. Rows are counted before wrapping, which is close enough for scrolling.
fn thread_text<'a>(thread: &'a Thread, state: &AppState, theme: &Theme) -> (Text<'a>, u16) {
    let mut lines = vec![
        Line::styled(
            format!(
                "{}:{}",
                state.resolver.display(&thread.address.file),
                thread.address.one_based_line()
            ),
            Style::default().fg(theme.thread_header).add_modifier(Modifier::BOLD),
        ),
        Line::raw(""),
    ];
    let mut selected_row = 0u16;

    for (index, comment) in thread.comments.iter().enumerate() {
        let selected = index == state.comment_cursor;
        if selected {
            selected_row = u16::try_from(lines.len()).unwrap_or(u16::MAX);
        }
        let (pointer, color) = if selected && state.focus == PanelFocus::Thread {
            ("▸ ", theme.comment_selected)
        } else {
            ("  ", theme.comment_author)
        };
        lines.push(Line::from(vec![
            Span::styled(pointer, Style::default().fg(color)),
            Span::styled(
                comment.author.as_str(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            ),
        ]));
        for body_line in comment.body.as_str().lines() {
            lines.push(Line::raw(format!("  {body_line}")));
        }
        lines.push(Line::raw(""));
    }

    (Text::from(lines), selected_row)
}
