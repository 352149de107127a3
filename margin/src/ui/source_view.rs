//! Source panel renderer for margin.
//!
//! Renders the open file with a gutter (thread marker and 1-based line number)
//! using a List widget with manual virtual scrolling: only
//! `source_lines[source_scroll..source_scroll + viewport_height]` become
//! ListItems per frame, so large files render in O(viewport).

use ratatui::{
    Frame,
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph, Wrap},
};

use crate::app::{AppState, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::{inner_rect, panel_block};

const THREAD_MARKER: &str = "●";

pub fn render_source(frame: &mut Frame, area: Rect, state: &AppState, theme: &Theme) {
    let is_focused = state.focus == PanelFocus::Source;
    let title = match &state.open_file {
        Some(file) => state.resolver.display(file),
        None => "Source".to_owned(),
    };
    let block = panel_block(title, is_focused, theme);
    let inner = inner_rect(area);
    frame.render_widget(block, area);

    let placeholder = if state.open_file.is_none() {
        Some("No file open. Pick one from the file list, or press n to jump to a thread.".to_owned())
    } else if let Some(error) = &state.source_error {
        Some(error.clone())
    } else if state.source_loading {
        Some("Loading...".to_owned())
    } else {
        None
    };
    if let Some(text) = placeholder {
        frame.render_widget(
            Paragraph::new(Line::styled(text, Style::default().fg(theme.muted)))
                .wrap(Wrap { trim: true }),
            inner,
        );
        return;
    }

    let total = state.source_lines.len();
    let number_width = total.max(1).to_string().len();
    let visible_start = state.source_scroll.min(total.saturating_sub(1));
    let visible_end = (visible_start + inner.height as usize).min(total);

    let items: Vec<ListItem> = state.source_lines[visible_start..visible_end]
        .iter()
        .enumerate()
        .map(|(offset, code)| {
            let index = visible_start + offset;
            let line_no = u32::try_from(index).unwrap_or(u32::MAX);
            let has_thread = state.thread_lines.binary_search(&line_no).is_ok();
            let is_cursor = line_no == state.cursor_line;

            let marker = if has_thread {
                Span::styled(THREAD_MARKER, Style::default().fg(theme.gutter_marker))
            } else {
                Span::raw(" ")
            };
            let number = Span::styled(
                format!("{:>number_width$} ", index + 1),
                Style::default().fg(theme.line_number),
            );

            let mut spans = Vec::with_capacity(code.spans.len() + 2);
            spans.push(marker);
            spans.push(number);
            spans.extend(code.spans.iter().cloned());
            let mut line = Line::from(spans);
            if is_cursor {
                line = line.style(Style::default().bg(theme.cursor_line_bg));
            }
            ListItem::new(line)
        })
        .collect();

    frame.render_widget(List::new(items), inner);
}
