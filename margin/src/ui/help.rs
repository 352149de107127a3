//! Help overlay renderer for margin.
//!
//! Draws a centred modal over the panel layout. `Clear` erases the background
//! first, inside the same `terminal.draw()` closure as the panels.

use ratatui::{
    Frame,
    layout::Constraint,
    text::{Line, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::theme::Theme;

/// Renders the help overlay, scrolled by `help_scroll` rows.
///
/// Skipped on terminals narrower than 60 columns to avoid a zero-height `Rect`.
pub fn render_help_overlay(frame: &mut Frame, theme: &Theme, help_scroll: u16) {
    if frame.area().width < 60 {
        return;
    }

    let overlay_area = frame
        .area()
        .centered(Constraint::Percentage(80), Constraint::Percentage(80));

    frame.render_widget(Clear, overlay_area);

    let block = Block::bordered()
        .title(" Help  (j/k scroll, ? or Esc to dismiss) ")
        .border_style(ratatui::style::Style::default().fg(theme.border_active));

    frame.render_widget(
        Paragraph::new(build_help_text())
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((help_scroll, 0)),
        overlay_area,
    );
}

fn build_help_text() -> Text<'static> {
    Text::from(vec![
        Line::from("Navigation"),
        Line::from("  j / k         Move down / up (cursor, file, or comment)"),
        Line::from("  g / G         Jump to top / bottom"),
        Line::from("  Ctrl-d / u    Half page down / up"),
        Line::from("  Ctrl-f / b    Full page down / up"),
        Line::from("  H / L / Tab   Move panel focus"),
        Line::from("  < / >         Shrink / grow source panel by 5%"),
        Line::from(""),
        Line::from("File List"),
        Line::from("  Enter / l     Open the selected file"),
        Line::from(""),
        Line::from("Threads"),
        Line::from("  n / ]         Next thread (wraps around)"),
        Line::from("  N / [         Previous thread (wraps around)"),
        Line::from("  c             Comment on the cursor line"),
        Line::from("  r             Reply to the selected thread"),
        Line::from("  i             Resume an unfinished comment"),
        Line::from("  x             Delete the selected comment"),
        Line::from("  D             Delete the selected thread"),
        Line::from(""),
        Line::from("Writing a comment"),
        Line::from("  Enter         Save"),
        Line::from("  Alt-Enter     New line"),
        Line::from("  Ctrl-u        Clear"),
        Line::from("  Esc           Leave; the draft is kept"),
        Line::from(""),
        Line::from("General"),
        Line::from("  ?             Open / close this help overlay"),
        Line::from("  q / Esc       Quit (confirms if a draft is pending)"),
    ])
}
