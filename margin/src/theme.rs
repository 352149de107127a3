//! Color theme system for margin.
//!
//! A `Theme` holds named `ratatui::style::Color` fields covering every UI surface
//! margin renders. Two built-in themes are provided:
//!
//! - `dark`: ANSI 16 colors, works on any terminal including SSH sessions
//!   without truecolor support.
//! - `catppuccin_mocha`: Catppuccin Mocha palette in RGB; requires truecolor.

use ratatui::style::Color;

/// All color values used across margin's UI surfaces.
#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    /// Border color for the currently focused panel.
    pub border_active: Color,
    /// Border color for unfocused panels.
    pub border_inactive: Color,

    // Source view
    /// Gutter marker on lines that carry a thread.
    pub gutter_marker: Color,
    /// Line numbers in the gutter.
    pub line_number: Color,
    /// Background of the cursor line.
    pub cursor_line_bg: Color,
    /// Placeholder and hint text.
    pub muted: Color,

    // Thread panel
    /// Author line of a comment.
    pub comment_author: Color,
    /// Author line of the selected comment.
    pub comment_selected: Color,
    /// Thread header (file and line).
    pub thread_header: Color,

    // File list
    /// Thread count badge next to a file.
    pub file_thread_count: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    /// Mode indicator color when in NORMAL mode.
    pub status_mode_normal: Color,
    /// Mode indicator color when in INSERT mode.
    pub status_mode_insert: Color,
    /// Transient result messages ("Comment added", errors).
    pub status_message: Color,

    // General
    /// Application background (used for clearing areas).
    pub background: Color,
}

impl Theme {
    /// Returns the built-in dark theme using ANSI 16 colors.
    pub fn dark() -> Self {
        Self {
            border_active: Color::Cyan,
            border_inactive: Color::DarkGray,

            gutter_marker: Color::Yellow,
            line_number: Color::DarkGray,
            cursor_line_bg: Color::Indexed(236),
            muted: Color::DarkGray,

            comment_author: Color::Blue,
            comment_selected: Color::Cyan,
            thread_header: Color::Yellow,

            file_thread_count: Color::DarkGray,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_mode_normal: Color::Cyan,
            status_mode_insert: Color::Green,
            status_message: Color::Yellow,

            background: Color::Reset,
        }
    }

    /// Returns the Catppuccin Mocha theme using RGB truecolor values.
    ///
    /// Palette source: <https://github.com/catppuccin/catppuccin> Mocha variant.
    pub fn catppuccin_mocha() -> Self {
        let green = Color::Rgb(166, 227, 161);    // #a6e3a1
        let yellow = Color::Rgb(249, 226, 175);   // #f9e2af
        let blue = Color::Rgb(137, 180, 250);     // #89b4fa
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let surface0 = Color::Rgb(49, 50, 68);    // #313244
        let surface1 = Color::Rgb(69, 71, 90);    // #45475a
        let base = Color::Rgb(30, 30, 46);        // #1e1e2e
        let text = Color::Rgb(205, 214, 244);     // #cdd6f4
        let peach = Color::Rgb(250, 179, 135);    // #fab387

        Self {
            border_active: lavender,
            border_inactive: overlay1,

            gutter_marker: peach,
            line_number: overlay1,
            cursor_line_bg: surface0,
            muted: overlay1,

            comment_author: blue,
            comment_selected: lavender,
            thread_header: yellow,

            file_thread_count: overlay1,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_mode_normal: lavender,
            status_mode_insert: green,
            status_message: yellow,

            background: base,
        }
    }

    /// Resolves a theme name string to the corresponding built-in theme.
    ///
    /// Unknown names fall back to `dark()` so a typo in config never prevents
    /// startup.
    pub fn from_name(name: &str) -> Self {
        match name {
            "catppuccin-mocha" | "catppuccin_mocha" => Self::catppuccin_mocha(),
            "dark" => Self::dark(),
            other => {
                tracing::warn!(theme = other, "unknown theme, falling back to 'dark'");
                Self::dark()
            }
        }
    }
}
