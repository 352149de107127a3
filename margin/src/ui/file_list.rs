//! File list panel renderer for margin.
//!
//! Each row shows a root-relative path and the number of threads in that file.
//! The open file is marked so it stays findable when it has no threads yet.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem},
};

use crate::app::{AppState, FileEntry, PanelFocus};
use crate::theme::Theme;
use crate::ui::layout::panel_block;

pub fn render_file_list(frame: &mut Frame, area: Rect, state: &mut AppState, theme: &Theme) {
    let is_focused = state.focus == PanelFocus::FileList;
    let title = if state.files.is_empty() {
        "Files".to_owned()
    } else {
        format!("Files ({})", state.files.len())
    };
    let block = panel_block(title, is_focused, theme);

    let items: Vec<ListItem> = if state.files.is_empty() {
        vec![ListItem::new(Line::styled("No comments yet", Style::default().fg(theme.muted)))]
    } else {
        state
            .files
            .iter()
            .map(|entry| {
                let open = state.open_file.as_ref() == Some(&entry.file);
                file_item(entry, open, area.width, theme)
            })
            .collect()
    };

    let list = List::new(items)
        .block(block)
        .highlight_style(Style::default().fg(theme.border_active).add_modifier(Modifier::BOLD));

    frame.render_stateful_widget(list, area, &mut state.file_list_state);
}

/// Format: `src/main.rs  3`, with long paths cut from the left.
fn file_item(entry: &FileEntry, open: bool, width: u16, theme: &Theme) -> ListItem<'static> {
    let count = if entry.threads > 0 { format!("  {}", entry.threads) } else { String::new() };
    // Borders, the open marker, and the count.
    let budget = (width as usize).saturating_sub(4 + count.len()).max(8);
    let chars = entry.label.chars().count();
    let label = if chars > budget {
        let tail: String = entry.label.chars().skip(chars - (budget - 3)).collect();
        format!("...{tail}")
    } else {
        entry.label.clone()
    };

    let marker = if open { "▸" } else { " " };
    ListItem::new(Line::from(vec![
        Span::raw(marker),
        Span::raw(label),
        Span::styled(count, Style::default().fg(theme.file_thread_count)),
    ]))
}
