//! Background thread that owns the syntect syntax and theme sets.
//!
//! Loading the default sets takes long enough to stall a frame, so they live
//! on this thread. Requests arrive over a crossbeam channel; results go back
//! as `AppEvent::SourceLoaded`.

use std::path::Path;
use std::sync::LazyLock;

use crossbeam_channel::Receiver;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use tokio::sync::mpsc::UnboundedSender;

use crate::event::AppEvent;
use crate::source::types::{SourcePayload, SourceRequest};

static PS: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static TS: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Files above this size are shown unhighlighted.
const HIGHLIGHT_LIMIT_BYTES: usize = 2 * 1024 * 1024;

/// Entry point for the source worker thread.
///
/// Loops over incoming requests until the channel closes (sender dropped).
pub fn source_worker_loop(rx: Receiver<SourceRequest>, event_tx: UnboundedSender<AppEvent>) {
    // Initialize the sets now so the first file opens without a pause.
    let _ = &*PS;
    let _ = &*TS;

    for request in rx {
        let payload = handle_request(request);
        if event_tx.send(AppEvent::SourceLoaded(Box::new(payload))).is_err() {
            break;
        }
    }
}

fn handle_request(request: SourceRequest) -> SourcePayload {
    match request {
        SourceRequest::Load { file, path } => match std::fs::read_to_string(&path) {
            Ok(text) => {
                let lines = if text.len() > HIGHLIGHT_LIMIT_BYTES {
                    plain_lines(&text)
                } else {
                    highlight(&text, &path)
                };
                SourcePayload { file, lines, error: None }
            }
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "cannot read source file");
                SourcePayload {
                    file,
                    lines: Vec::new(),
                    error: Some(format!("cannot read {}: {e}", path.display())),
                }
            }
        },
    }
}

/// Converts a syntect (Style, &str) pair to an owned ratatui Span.
///
/// Background colors are dropped so the cursor-line highlight shows through.
fn syntect_to_span(style: syntect::highlighting::Style, content: &str) -> Span<'static> {
    use syntect::highlighting::FontStyle;

    let mut ratatui_style = Style::default();
    let fg = style.foreground;
    if fg.a > 0 {
        ratatui_style = ratatui_style.fg(Color::Rgb(fg.r, fg.g, fg.b));
    }
    if style.font_style.contains(FontStyle::BOLD) {
        ratatui_style = ratatui_style.add_modifier(Modifier::BOLD);
    }
    if style.font_style.contains(FontStyle::ITALIC) {
        ratatui_style = ratatui_style.add_modifier(Modifier::ITALIC);
    }
    if style.font_style.contains(FontStyle::UNDERLINE) {
        ratatui_style = ratatui_style.add_modifier(Modifier::UNDERLINED);
    }
    Span::styled(content.trim_end_matches(['\n', '\r']).to_owned(), ratatui_style)
}

/// Highlights a whole file, one ratatui Line per source line.
///
/// Falls back to plain lines when no theme is available.
fn highlight(text: &str, path: &Path) -> Vec<Line<'static>> {
    let Some(theme) = TS.themes.get("base16-ocean.dark").or_else(|| TS.themes.values().next())
    else {
        return plain_lines(text);
    };
    let syntax = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(|ext| PS.find_syntax_by_extension(ext))
        .unwrap_or_else(|| PS.find_syntax_plain_text());

    // One highlighter for the whole file so multi-line constructs carry over.
    let mut h = HighlightLines::new(syntax, theme);
    syntect::util::LinesWithEndings::from(text)
        .map(|line| match h.highlight_line(line, &PS) {
            Ok(ranges) => Line::from(
                ranges
                    .into_iter()
                    .map(|(style, s)| syntect_to_span(style, s))
                    .collect::<Vec<_>>(),
            ),
            Err(_) => Line::raw(line.trim_end_matches(['\n', '\r']).to_owned()),
        })
        .collect()
}

fn plain_lines(text: &str) -> Vec<Line<'static>> {
    text.lines().map(|l| Line::raw(l.to_owned())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn highlight_keeps_one_line_per_source_line() {
        let src = "fn main() {\n    println!(\"hi\");\n}\n";
        let lines = highlight(src, Path::new("main.rs"));
        assert_eq!(lines.len(), 3);
        let first: String = lines[0].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(first, "fn main() {");
    }

    #[test]
    fn missing_file_reports_error() {
        let file = margin_core::types::FileUri::parse("file:///definitely/not/here.rs").unwrap();
        let payload = handle_request(SourceRequest::Load {
            file,
            path: "/definitely/not/here.rs".into(),
        });
        assert!(payload.lines.is_empty());
        assert!(payload.error.is_some());
    }
}
