//! Central application state for margin.
//!
//! This module owns all mutable UI state: the current mode, which panel has focus,
//! the open file and cursor, the selected thread, the comment draft, per-panel
//! scroll offsets and viewport heights, and panel width percentages. No ratatui
//! rendering logic lives here, and the thread store is never mutated from here;
//! store changes go through `commands.rs`.

use crossbeam_channel::Sender;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;

use margin_core::root::PathResolver;
use margin_core::store::ThreadStore;
use margin_core::types::{Address, FileUri, Thread};

use crate::source::types::{SourcePayload, SourceRequest};

/// Editor mode controlling which keybinding set is active.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Normal vim-style navigation mode (default).
    #[default]
    Normal,
    /// Typing a comment or reply body.
    Insert,
    /// Full-screen help overlay is shown above all panels.
    HelpOverlay,
    /// Quit-confirmation dialog shown while a draft is pending.
    ConfirmQuit,
}

/// Which panel currently has keyboard focus.
///
/// Navigation cycles through FileList → Source → Thread → FileList via `next()`
/// and in reverse via `prev()`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    /// Left panel listing files that carry threads.
    FileList,
    /// Centre panel showing the open file.
    #[default]
    Source,
    /// Right panel showing the selected thread.
    Thread,
}

impl PanelFocus {
    pub fn prev(self) -> Self {
        match self {
            PanelFocus::FileList => PanelFocus::Thread,
            PanelFocus::Source => PanelFocus::FileList,
            PanelFocus::Thread => PanelFocus::Source,
        }
    }

    pub fn next(self) -> Self {
        match self {
            PanelFocus::FileList => PanelFocus::Source,
            PanelFocus::Source => PanelFocus::Thread,
            PanelFocus::Thread => PanelFocus::FileList,
        }
    }
}

/// Where the Insert-mode draft goes on submit.
///
/// Targets are held by address: ids are reallocated whenever the store is
/// reloaded after a write from the MCP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputTarget {
    /// Start a thread at this address.
    NewThread(Address),
    /// Append to the thread at this address.
    Reply(Address),
}

impl InputTarget {
    pub fn address(&self) -> &Address {
        match self {
            InputTarget::NewThread(a) | InputTarget::Reply(a) => a,
        }
    }
}

/// One row of the file-list panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub file: FileUri,
    /// Root-relative path for display.
    pub label: String,
    pub threads: usize,
}

/// All mutable UI state passed through every render cycle.
pub struct AppState {
    pub mode: Mode,
    pub focus: PanelFocus,

    /// Stateful list widget backing the file-list panel (left).
    pub file_list_state: ListState,
    /// Files with threads, plus the open file if it has none.
    pub files: Vec<FileEntry>,

    /// File shown in the source panel.
    pub open_file: Option<FileUri>,
    /// Highlighted lines of `open_file`, gutter not included.
    pub source_lines: Vec<ratatui::text::Line<'static>>,
    /// True while the worker is reading `open_file`.
    pub source_loading: bool,
    /// Read error for `open_file`, shown in place of the source.
    pub source_error: Option<String>,
    /// First visible source line.
    pub source_scroll: usize,
    /// 0-based cursor line in `open_file`.
    pub cursor_line: u32,
    /// 0-based lines of `open_file` that carry a thread, ascending.
    pub thread_lines: Vec<u32>,

    /// Thread shown in the thread panel.
    pub selected_thread: Option<Address>,
    /// Index of the highlighted comment within the selected thread.
    pub comment_cursor: usize,

    /// Comment draft typed in Insert mode.
    pub input: String,
    /// Destination of `input`; kept across Esc so the draft can be resumed.
    pub input_target: Option<InputTarget>,
    /// One-line result of the last command, cleared on the next key.
    pub status: Option<String>,

    /// Inner heights of the three panels, cached after each render.
    pub file_list_viewport_height: u16,
    pub source_viewport_height: u16,
    pub thread_viewport_height: u16,

    /// Width percentage allocated to the left (file-list) panel. Default: 20.
    pub left_pct: u16,
    /// Width percentage allocated to the centre (source) panel. Default: 50.
    pub center_pct: u16,
    /// Width percentage allocated to the right (thread) panel. Default: 30.
    pub right_pct: u16,

    /// Panel rects from the last render, for mouse hit-testing.
    pub panel_rects: [Rect; 3],
    /// Vertical scroll offset for the help overlay.
    pub help_scroll: u16,

    pub resolver: PathResolver,
    /// Request channel to the source worker; `None` in tests.
    pub source_tx: Option<Sender<SourceRequest>>,
}

impl AppState {
    /// Panel percentages start at 20 / 50 / 30 (left / centre / right); no file is open.
    pub fn new(resolver: PathResolver, source_tx: Option<Sender<SourceRequest>>) -> Self {
        Self {
            mode: Mode::default(),
            focus: PanelFocus::default(),
            file_list_state: ListState::default(),
            files: Vec::new(),
            open_file: None,
            source_lines: Vec::new(),
            source_loading: false,
            source_error: None,
            source_scroll: 0,
            cursor_line: 0,
            thread_lines: Vec::new(),
            selected_thread: None,
            comment_cursor: 0,
            input: String::new(),
            input_target: None,
            status: None,
            file_list_viewport_height: 0,
            source_viewport_height: 0,
            thread_viewport_height: 0,
            left_pct: 20,
            center_pct: 50,
            right_pct: 30,
            panel_rects: [Rect::default(); 3],
            help_scroll: 0,
            resolver,
            source_tx,
        }
    }

    /// True when an Insert-mode draft would be lost by quitting.
    pub fn has_unsaved_comment(&self) -> bool {
        !self.input.trim().is_empty()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    /// Address under the cursor in the open file.
    pub fn cursor_address(&self) -> Option<Address> {
        self.open_file
            .as_ref()
            .map(|file| Address::new(file.clone(), self.cursor_line))
    }

    /// The selected thread, looked up afresh in `store`.
    pub fn selected<'a>(&self, store: &'a ThreadStore) -> Option<&'a Thread> {
        let address = self.selected_thread.as_ref()?;
        store.find_by_address(&address.file, address.line)
    }

    // -----------------------------------------------------------------------
    // Store-derived state
    // -----------------------------------------------------------------------

    /// Rebuilds everything derived from the store: the file list, gutter
    /// markers, and the selection (dropped if its thread is gone).
    pub fn refresh(&mut self, store: &ThreadStore) {
        let selected_file = self
            .file_list_state
            .selected()
            .and_then(|i| self.files.get(i))
            .map(|e| e.file.clone());

        let mut files: Vec<FileEntry> = store
            .files()
            .into_iter()
            .map(|file| FileEntry {
                label: self.resolver.display(file),
                threads: store.list_by_file(file).count(),
                file: file.clone(),
            })
            .collect();
        if let Some(open) = &self.open_file {
            if !files.iter().any(|e| &e.file == open) {
                files.push(FileEntry {
                    label: self.resolver.display(open),
                    threads: 0,
                    file: open.clone(),
                });
            }
        }
        files.sort_by(|a, b| a.label.cmp(&b.label));
        self.files = files;

        let keep = selected_file
            .and_then(|f| self.files.iter().position(|e| e.file == f))
            .or(if self.files.is_empty() { None } else { Some(0) });
        self.file_list_state.select(keep);

        self.thread_lines = match &self.open_file {
            Some(file) => {
                let mut lines: Vec<u32> = store.list_by_file(file).map(|t| t.address.line).collect();
                lines.sort_unstable();
                lines
            }
            None => Vec::new(),
        };

        match self.selected(store) {
            Some(thread) => {
                let len = thread.comments.len();
                self.comment_cursor = self.comment_cursor.min(len.saturating_sub(1));
            }
            None => {
                self.selected_thread = None;
                self.comment_cursor = 0;
            }
        }
    }

    /// Selects the thread under the cursor, if any. Leaves the selection
    /// alone on lines without a thread so a reply can still target it.
    pub fn follow_cursor(&mut self, store: &ThreadStore) {
        let Some(file) = &self.open_file else { return };
        if let Some(thread) = store.find_by_address(file, self.cursor_line) {
            if self.selected_thread.as_ref() != Some(&thread.address) {
                self.select_thread(thread.address.clone());
            }
        }
    }

    pub fn select_thread(&mut self, address: Address) {
        self.selected_thread = Some(address);
        self.comment_cursor = 0;
    }

    // -----------------------------------------------------------------------
    // Source view
    // -----------------------------------------------------------------------

    /// Asks the worker for `file` and resets the view. Reopening the open
    /// file only reloads it.
    pub fn open_file(&mut self, file: FileUri) {
        if self.open_file.as_ref() != Some(&file) {
            self.source_scroll = 0;
            self.cursor_line = 0;
        }
        self.source_lines.clear();
        self.source_error = None;
        match (file.to_file_path(), &self.source_tx) {
            (Some(path), Some(tx)) => {
                self.source_loading = true;
                if tx.send(SourceRequest::Load { file: file.clone(), path }).is_err() {
                    self.source_loading = false;
                    self.source_error = Some("source worker stopped".to_owned());
                }
            }
            (None, _) => self.source_error = Some(format!("{file} is not a local file")),
            (Some(_), None) => {}
        }
        self.open_file = Some(file);
    }

    /// Stores a worker result if it still belongs to the open file.
    pub fn apply_source(&mut self, payload: SourcePayload) {
        if self.open_file.as_ref() != Some(&payload.file) {
            return;
        }
        self.source_loading = false;
        self.source_error = payload.error;
        self.source_lines = payload.lines;
        self.clamp_cursor();
        self.scroll_to_cursor();
    }

    /// Opens the file-list selection in the source panel.
    pub fn open_selected_file(&mut self) {
        let Some(entry) = self.file_list_state.selected().and_then(|i| self.files.get(i)) else {
            return;
        };
        let file = entry.file.clone();
        self.open_file(file);
        self.focus = PanelFocus::Source;
    }

    /// Opens the thread's file, puts the cursor on its line, and selects it.
    pub fn reveal(&mut self, address: Address) {
        if self.open_file.as_ref() != Some(&address.file) {
            self.open_file(address.file.clone());
        }
        self.cursor_line = address.line;
        self.center_on_cursor();
        if let Some(i) = self.files.iter().position(|e| e.file == address.file) {
            self.file_list_state.select(Some(i));
        }
        self.select_thread(address);
    }

    pub fn cursor_down(&mut self, lines: u32) {
        self.cursor_line = self.cursor_line.saturating_add(lines);
        self.clamp_cursor();
        self.scroll_to_cursor();
    }

    pub fn cursor_up(&mut self, lines: u32) {
        self.cursor_line = self.cursor_line.saturating_sub(lines);
        self.scroll_to_cursor();
    }

    pub fn cursor_to(&mut self, line: u32) {
        self.cursor_line = line;
        self.clamp_cursor();
        self.scroll_to_cursor();
    }

    /// Keeps the cursor inside the loaded file. Before the file loads the
    /// cursor is left alone so a line given on the command line survives.
    fn clamp_cursor(&mut self) {
        if self.source_lines.is_empty() {
            return;
        }
        let last = u32::try_from(self.source_lines.len() - 1).unwrap_or(u32::MAX);
        self.cursor_line = self.cursor_line.min(last);
    }

    fn scroll_to_cursor(&mut self) {
        let cursor = self.cursor_line as usize;
        let height = (self.source_viewport_height as usize).max(1);
        if cursor < self.source_scroll {
            self.source_scroll = cursor;
        } else if cursor >= self.source_scroll + height {
            self.source_scroll = cursor + 1 - height;
        }
    }

    fn center_on_cursor(&mut self) {
        let half = (self.source_viewport_height / 2) as usize;
        self.source_scroll = (self.cursor_line as usize).saturating_sub(half);
    }

    // -----------------------------------------------------------------------
    // Scrolling (focused panel)
    // -----------------------------------------------------------------------

    /// Moves the focused panel's selection down by `lines` rows: the file
    /// selection, the source cursor, or the comment cursor.
    pub fn scroll_down(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::FileList => self.file_list_state.scroll_down_by(lines),
            PanelFocus::Source => self.cursor_down(u32::from(lines)),
            PanelFocus::Thread => {
                self.comment_cursor = self.comment_cursor.saturating_add(lines as usize);
            }
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::FileList => self.file_list_state.scroll_up_by(lines),
            PanelFocus::Source => self.cursor_up(u32::from(lines)),
            PanelFocus::Thread => {
                self.comment_cursor = self.comment_cursor.saturating_sub(lines as usize);
            }
        }
    }

    pub fn scroll_top(&mut self) {
        match self.focus {
            PanelFocus::FileList => self.file_list_state.select_first(),
            PanelFocus::Source => self.cursor_to(0),
            PanelFocus::Thread => self.comment_cursor = 0,
        }
    }

    pub fn scroll_bottom(&mut self) {
        match self.focus {
            PanelFocus::FileList => self.file_list_state.select_last(),
            PanelFocus::Source => {
                let last = self.source_lines.len().saturating_sub(1);
                self.cursor_to(u32::try_from(last).unwrap_or(u32::MAX));
            }
            // Clamped by the next refresh.
            PanelFocus::Thread => self.comment_cursor = usize::MAX,
        }
    }

    fn viewport_height(&self) -> u16 {
        match self.focus {
            PanelFocus::FileList => self.file_list_viewport_height,
            PanelFocus::Source => self.source_viewport_height,
            PanelFocus::Thread => self.thread_viewport_height,
        }
    }

    /// Uses the viewport height cached from the previous render; scrolls by 1
    /// on the first frame.
    pub fn half_page_down(&mut self) {
        self.scroll_down((self.viewport_height() / 2).max(1));
    }

    pub fn half_page_up(&mut self) {
        self.scroll_up((self.viewport_height() / 2).max(1));
    }

    pub fn full_page_down(&mut self) {
        self.scroll_down(self.viewport_height().max(1));
    }

    pub fn full_page_up(&mut self) {
        self.scroll_up(self.viewport_height().max(1));
    }

    // -----------------------------------------------------------------------
    // Insert mode
    // -----------------------------------------------------------------------

    /// Enters Insert mode for `target`. A draft for the same target is kept;
    /// a draft for another target is discarded.
    pub fn begin_input(&mut self, target: InputTarget) {
        if self.input_target.as_ref() != Some(&target) {
            self.input.clear();
        }
        self.input_target = Some(target);
        self.mode = Mode::Insert;
    }

    /// Takes the draft and its target, leaving Insert mode.
    pub fn take_input(&mut self) -> Option<(InputTarget, String)> {
        self.mode = Mode::Normal;
        let target = self.input_target.take()?;
        Some((target, std::mem::take(&mut self.input)))
    }

    // -----------------------------------------------------------------------
    // Panel sizing
    // -----------------------------------------------------------------------

    /// Shrinks the centre panel by 5%, split between the side panels. Stops at 20%.
    pub fn shrink_source_panel(&mut self) {
        const MIN_CENTER: u16 = 20;
        const STEP: u16 = 5;
        if self.center_pct <= MIN_CENTER {
            return;
        }
        let transfer = STEP.min(self.center_pct - MIN_CENTER);
        self.center_pct -= transfer;
        let left_gain = transfer / 2;
        let right_gain = transfer - left_gain;
        self.left_pct = self.left_pct.saturating_add(left_gain);
        self.right_pct = self.right_pct.saturating_add(right_gain);
    }

    /// Grows the centre panel by 5% taken from the side panels. Stops at 80%.
    pub fn grow_source_panel(&mut self) {
        const MAX_CENTER: u16 = 80;
        const MIN_SIDE: u16 = 5;
        const STEP: u16 = 5;
        if self.center_pct >= MAX_CENTER {
            return;
        }
        let transfer = STEP.min(MAX_CENTER - self.center_pct);
        let left_give = (transfer / 2).min(self.left_pct.saturating_sub(MIN_SIDE));
        let right_give = (transfer - transfer / 2).min(self.right_pct.saturating_sub(MIN_SIDE));
        self.left_pct -= left_give;
        self.right_pct -= right_give;
        self.center_pct += left_give + right_give;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use margin_core::types::CommentBody;

    fn uri(path: &str) -> FileUri {
        FileUri::parse(&format!("file://{path}")).unwrap()
    }

    fn state() -> AppState {
        AppState::new(PathResolver::new("/ws"), None)
    }

    fn store_with(addresses: &[(&str, u32)]) -> ThreadStore {
        let mut store = ThreadStore::new();
        for (path, line) in addresses {
            store
                .create_thread(
                    Address::new(uri(path), *line),
                    CommentBody::PlainText("note".into()),
                    "User",
                )
                .unwrap();
        }
        store
    }

    #[test]
    fn refresh_lists_files_with_counts() {
        let store = store_with(&[("/ws/b.rs", 1), ("/ws/a.rs", 3), ("/ws/a.rs", 7)]);
        let mut s = state();
        s.refresh(&store);
        let labels: Vec<_> = s.files.iter().map(|e| (e.label.as_str(), e.threads)).collect();
        assert_eq!(labels, vec![("a.rs", 2), ("b.rs", 1)]);
        assert_eq!(s.file_list_state.selected(), Some(0));
    }

    #[test]
    fn refresh_includes_open_file_without_threads() {
        let store = store_with(&[("/ws/a.rs", 0)]);
        let mut s = state();
        s.open_file(uri("/ws/z.rs"));
        s.refresh(&store);
        assert!(s.files.iter().any(|e| e.label == "z.rs" && e.threads == 0));
        assert!(s.thread_lines.is_empty());
    }

    #[test]
    fn refresh_drops_selection_of_deleted_thread() {
        let mut store = store_with(&[("/ws/a.rs", 4)]);
        let mut s = state();
        s.reveal(Address::new(uri("/ws/a.rs"), 4));
        s.refresh(&store);
        assert!(s.selected(&store).is_some());
        assert_eq!(s.thread_lines, vec![4]);

        store.remove_thread(&Address::new(uri("/ws/a.rs"), 4)).unwrap();
        s.refresh(&store);
        assert_eq!(s.selected_thread, None);
        assert!(s.thread_lines.is_empty());
    }

    #[test]
    fn reveal_opens_file_and_moves_cursor() {
        let mut s = state();
        s.source_viewport_height = 10;
        s.reveal(Address::new(uri("/ws/a.rs"), 42));
        assert_eq!(s.open_file, Some(uri("/ws/a.rs")));
        assert_eq!(s.cursor_line, 42);
        assert_eq!(s.source_scroll, 37);
        assert_eq!(s.selected_thread, Some(Address::new(uri("/ws/a.rs"), 42)));
    }

    #[test]
    fn follow_cursor_selects_thread_on_line() {
        let store = store_with(&[("/ws/a.rs", 2)]);
        let mut s = state();
        s.open_file(uri("/ws/a.rs"));
        s.cursor_line = 1;
        s.follow_cursor(&store);
        assert_eq!(s.selected_thread, None);
        s.cursor_line = 2;
        s.follow_cursor(&store);
        assert_eq!(s.selected_thread, Some(Address::new(uri("/ws/a.rs"), 2)));
        s.cursor_line = 3;
        s.follow_cursor(&store);
        assert!(s.selected_thread.is_some());
    }

    #[test]
    fn stale_source_payload_is_ignored() {
        let mut s = state();
        s.open_file(uri("/ws/a.rs"));
        s.apply_source(SourcePayload {
            file: uri("/ws/b.rs"),
            lines: vec![ratatui::text::Line::raw("x")],
            error: None,
        });
        assert!(s.source_lines.is_empty());
    }

    #[test]
    fn cursor_is_clamped_to_loaded_file() {
        let mut s = state();
        s.source_viewport_height = 5;
        s.open_file(uri("/ws/a.rs"));
        s.cursor_line = 99;
        s.apply_source(SourcePayload {
            file: uri("/ws/a.rs"),
            lines: (0..10).map(|i| ratatui::text::Line::raw(i.to_string())).collect(),
            error: None,
        });
        assert_eq!(s.cursor_line, 9);
        assert_eq!(s.source_scroll, 5);
        s.cursor_up(9);
        assert_eq!((s.cursor_line, s.source_scroll), (0, 0));
    }

    #[test]
    fn draft_survives_reentry_for_same_target_only() {
        let a = InputTarget::NewThread(Address::new(uri("/ws/a.rs"), 1));
        let b = InputTarget::Reply(Address::new(uri("/ws/a.rs"), 1));
        let mut s = state();
        s.begin_input(a.clone());
        s.input.push_str("half");
        s.mode = Mode::Normal;
        assert!(s.has_unsaved_comment());
        s.begin_input(a.clone());
        assert_eq!(s.input, "half");
        s.begin_input(b.clone());
        assert_eq!(s.input, "");
        s.input.push_str("done");
        assert_eq!(s.take_input(), Some((b, "done".to_owned())));
        assert_eq!(s.mode, Mode::Normal);
        assert!(!s.has_unsaved_comment());
    }

    #[test]
    fn panel_resize_respects_bounds() {
        let mut s = state();
        for _ in 0..20 {
            s.grow_source_panel();
        }
        assert!(s.center_pct <= 80);
        assert_eq!(s.left_pct + s.center_pct + s.right_pct, 100);
        for _ in 0..20 {
            s.shrink_source_panel();
        }
        assert_eq!(s.center_pct, 20);
        assert_eq!(s.left_pct + s.center_pct + s.right_pct, 100);
    }
}
