//! Modal boxes drawn over the panels: the comment prompt and the quit
//! confirmation.

use ratatui::{
    Frame,
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Clear, Paragraph, Wrap},
};

use crate::app::{AppState, InputTarget};
use crate::theme::Theme;

const CURSOR: &str = "▏";

/// Renders the Insert-mode prompt near the bottom of the screen.
pub fn render_comment_prompt(frame: &mut Frame, state: &AppState, theme: &Theme) {
    let Some(target) = &state.input_target else { return };
    let address = target.address();
    let verb = match target {
        InputTarget::NewThread(_) => "Comment on",
        InputTarget::Reply(_) => "Reply to",
    };
    let title = format!(
        " {verb} {}:{}  (Enter save, Alt-Enter newline, Esc leave) ",
        state.resolver.display(&address.file),
        address.one_based_line()
    );

    let area = bottom_box(frame.area(), 7);
    frame.render_widget(Clear, area);

    let mut lines: Vec<Line> = state.input.split('\n').map(|l| Line::raw(l.to_owned())).collect();
    if let Some(last) = lines.last_mut() {
        last.push_span(Span::styled(CURSOR, Style::default().fg(theme.status_mode_insert)));
    }
    let block = Block::bordered()
        .title(title)
        .border_style(Style::default().fg(theme.status_mode_insert));

    // Keep the end of a long draft in view.
    let inner_height = area.height.saturating_sub(2);
    let overflow = u16::try_from(lines.len()).unwrap_or(u16::MAX).saturating_sub(inner_height);

    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: false })
            .scroll((overflow, 0)),
        area,
    );
}

/// Renders the quit confirmation shown while a draft is pending.
pub fn render_confirm_quit(frame: &mut Frame, theme: &Theme) {
    let area = frame.area().centered(Constraint::Length(44), Constraint::Length(5));
    frame.render_widget(Clear, area);
    let block = Block::bordered()
        .title(" Quit ")
        .border_style(Style::default().fg(theme.border_active));
    let text = Text::from(vec![
        Line::raw("Discard the unsaved comment and quit?"),
        Line::from(vec![
            Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" quit   "),
            Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(" keep editing"),
        ]),
    ]);
    frame.render_widget(Paragraph::new(text).block(block), area);
}

/// A full-width box of `height` rows just above the status bar.
fn bottom_box(screen: Rect, height: u16) -> Rect {
    let height = height.min(screen.height.saturating_sub(1));
    Rect {
        x: screen.x,
        y: screen.y + screen.height.saturating_sub(height + 1),
        width: screen.width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottom_box_sits_above_status_bar() {
        let screen = Rect::new(0, 0, 100, 30);
        assert_eq!(bottom_box(screen, 7), Rect::new(0, 22, 100, 7));
    }

    #[test]
    fn bottom_box_shrinks_on_tiny_terminals() {
        let screen = Rect::new(0, 0, 40, 4);
        let r = bottom_box(screen, 7);
        assert_eq!(r.height, 3);
        assert_eq!(r.y, 0);
    }
}
