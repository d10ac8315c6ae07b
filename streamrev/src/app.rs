//! Central application state.
//!
//! Owns everything the renderer reads and the key dispatcher mutates: the
//! loaded diff, the latest snapshot of the active analysis request, focus and
//! scroll positions. No rendering or I/O lives here.

use streamrev_core::diff::{hunk_offsets, parse, summarize_files};
use streamrev_core::{DiffLine, FileSummary, Issue, Snapshot};
use uuid::Uuid;

use crate::git::types::{DiffMode, DiffPayload};
use crate::highlight::{highlight_code, HighlightedCode};

/// Which keybinding set is active.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    #[default]
    Normal,
    /// Full-screen help overlay is shown above all panels.
    HelpOverlay,
}

/// Which panel receives scroll keys. `Tab` toggles.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PanelFocus {
    #[default]
    Diff,
    Issues,
}

impl PanelFocus {
    pub fn toggle(self) -> Self {
        match self {
            PanelFocus::Diff => PanelFocus::Issues,
            PanelFocus::Issues => PanelFocus::Diff,
        }
    }
}

/// Progress of the diff load and the active analysis request, as shown in
/// the status bar.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum RequestStatus {
    #[default]
    Idle,
    LoadingDiff,
    /// Request sent, nothing parseable received yet.
    Waiting,
    Streaming,
    Done,
    Failed(String),
}

impl RequestStatus {
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            RequestStatus::LoadingDiff | RequestStatus::Waiting | RequestStatus::Streaming
        )
    }
}

pub struct AppState {
    pub mode: Mode,
    pub focus: PanelFocus,
    pub status: RequestStatus,

    /// Where the diff came from, for the status bar.
    pub diff_label: String,
    /// Set when the diff comes from the git worker.
    pub diff_mode: Option<DiffMode>,
    pub diff_text: String,
    pub lines: Vec<DiffLine>,
    /// Syntax-highlighted code, aligned with `lines`.
    pub code: HighlightedCode,
    pub files: Vec<FileSummary>,
    /// Positions of `@@` lines within `lines`, for `[`/`]`.
    pub hunk_offsets: Vec<usize>,
    pub hunk_cursor: usize,

    /// Tag of the request whose snapshots are accepted. Anything else is stale.
    pub request_id: Option<Uuid>,
    pub snapshot: Option<Snapshot>,

    /// First visible diff line. usize supports diffs past 65535 lines.
    pub diff_scroll: usize,
    pub issues_scroll: u16,
    /// Inner panel heights cached by the renderer for page scrolling.
    pub diff_viewport_height: u16,
    pub issues_viewport_height: u16,
    /// Width percentage of the diff panel; the issues panel takes the rest.
    pub diff_pct: u16,
    pub help_scroll: u16,
    /// Advanced on every tick while a request is active.
    pub spinner: usize,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            focus: PanelFocus::default(),
            status: RequestStatus::default(),
            diff_label: String::new(),
            diff_mode: None,
            diff_text: String::new(),
            lines: Vec::new(),
            code: Vec::new(),
            files: Vec::new(),
            hunk_offsets: Vec::new(),
            hunk_cursor: 0,
            request_id: None,
            snapshot: None,
            diff_scroll: 0,
            issues_scroll: 0,
            diff_viewport_height: 0,
            issues_viewport_height: 0,
            diff_pct: 65,
            help_scroll: 0,
            spinner: 0,
        }
    }
}

impl AppState {
    pub fn scroll_down(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::Diff => {
                let max = self.lines.len().saturating_sub(1);
                self.diff_scroll = self.diff_scroll.saturating_add(lines as usize).min(max);
            }
            PanelFocus::Issues => {
                self.issues_scroll = self.issues_scroll.saturating_add(lines);
            }
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        match self.focus {
            PanelFocus::Diff => {
                self.diff_scroll = self.diff_scroll.saturating_sub(lines as usize);
            }
            PanelFocus::Issues => {
                self.issues_scroll = self.issues_scroll.saturating_sub(lines);
            }
        }
    }

    pub fn scroll_top(&mut self) {
        match self.focus {
            PanelFocus::Diff => self.diff_scroll = 0,
            PanelFocus::Issues => self.issues_scroll = 0,
        }
    }

    /// For the issues panel the renderer clamps `u16::MAX` to the content.
    pub fn scroll_bottom(&mut self) {
        match self.focus {
            PanelFocus::Diff => self.diff_scroll = self.lines.len().saturating_sub(1),
            PanelFocus::Issues => self.issues_scroll = u16::MAX,
        }
    }

    /// Scrolls by half the cached viewport, or by 1 before the first frame.
    pub fn half_page_down(&mut self) {
        self.scroll_down((self.focused_viewport_height() / 2).max(1));
    }

    pub fn half_page_up(&mut self) {
        self.scroll_up((self.focused_viewport_height() / 2).max(1));
    }

    fn focused_viewport_height(&self) -> u16 {
        match self.focus {
            PanelFocus::Diff => self.diff_viewport_height,
            PanelFocus::Issues => self.issues_viewport_height,
        }
    }

    /// Jumps to the previous hunk header. Stays on the first one.
    pub fn prev_hunk(&mut self) {
        if self.hunk_offsets.is_empty() {
            return;
        }
        self.hunk_cursor = self.hunk_cursor.saturating_sub(1);
        self.diff_scroll = self.hunk_offsets[self.hunk_cursor];
    }

    /// Jumps to the next hunk header. Stays on the last one.
    pub fn next_hunk(&mut self) {
        if self.hunk_offsets.is_empty() {
            return;
        }
        self.hunk_cursor = (self.hunk_cursor + 1).min(self.hunk_offsets.len() - 1);
        self.diff_scroll = self.hunk_offsets[self.hunk_cursor];
    }

    /// Issue pinned to the line at `pos`, from the latest snapshot.
    pub fn annotation(&self, pos: usize) -> Option<&Issue> {
        self.snapshot
            .as_ref()?
            .annotated_lines
            .get(pos)?
            .matched_issue
            .as_ref()
    }

    fn annotated_positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.snapshot.iter().flat_map(|s| {
            s.annotated_lines
                .iter()
                .enumerate()
                .filter(|(_, a)| a.matched_issue.is_some())
                .map(|(pos, _)| pos)
        })
    }

    /// Moves the diff view to the next line with an issue below the top one.
    pub fn next_annotation(&mut self) {
        let current = self.diff_scroll;
        let next = self.annotated_positions().find(|&pos| pos > current);
        if let Some(pos) = next {
            self.focus = PanelFocus::Diff;
            self.diff_scroll = pos;
        }
    }

    pub fn prev_annotation(&mut self) {
        let current = self.diff_scroll;
        let prev = self.annotated_positions().filter(|&pos| pos < current).last();
        if let Some(pos) = prev {
            self.focus = PanelFocus::Diff;
            self.diff_scroll = pos;
        }
    }

    /// Replaces the diff. Any snapshot belongs to the old lines, so it is
    /// dropped along with its request.
    pub fn apply_diff(&mut self, payload: DiffPayload) {
        let source_changed = self.diff_mode != payload.mode || self.diff_label != payload.label;
        let lines = parse(&payload.text);
        self.code = highlight_code(&lines);
        self.files = summarize_files(&lines);
        self.hunk_offsets = hunk_offsets(&lines);
        self.lines = lines;
        self.diff_text = payload.text;
        self.diff_label = payload.label;
        self.diff_mode = payload.mode;
        self.snapshot = None;
        self.request_id = None;
        self.status = RequestStatus::Idle;
        if source_changed {
            self.diff_scroll = 0;
            self.hunk_cursor = 0;
            self.issues_scroll = 0;
        } else {
            self.diff_scroll = self.diff_scroll.min(self.lines.len().saturating_sub(1));
            let scroll = self.diff_scroll;
            self.hunk_cursor = self
                .hunk_offsets
                .iter()
                .rposition(|&offset| offset <= scroll)
                .unwrap_or(0);
        }
    }

    /// Marks a new analysis request as current and returns its tag.
    pub fn begin_request(&mut self) -> Uuid {
        let id = Uuid::new_v4();
        self.request_id = Some(id);
        self.snapshot = None;
        self.status = RequestStatus::Waiting;
        id
    }

    /// Stores a snapshot if it belongs to the current request. Returns whether
    /// it was accepted.
    pub fn apply_snapshot(&mut self, request: Uuid, snapshot: Snapshot) -> bool {
        if self.request_id != Some(request) {
            tracing::debug!(%request, sequence = snapshot.sequence, "dropping stale snapshot");
            return false;
        }
        self.status = if snapshot.is_final {
            RequestStatus::Done
        } else {
            RequestStatus::Streaming
        };
        self.snapshot = Some(snapshot);
        true
    }

    /// Records a failure of the current request. The last snapshot stays.
    pub fn fail_request(&mut self, request: Uuid, error: String) {
        if self.request_id == Some(request) {
            self.status = RequestStatus::Failed(error);
        }
    }

    pub fn tick(&mut self) {
        if self.status.is_active() {
            self.spinner = self.spinner.wrapping_add(1);
        }
    }

    /// Grows the diff panel by 5%, up to 85%.
    pub fn grow_diff_panel(&mut self) {
        self.diff_pct = (self.diff_pct + 5).min(85);
    }

    /// Shrinks the diff panel by 5%, down to 30%.
    pub fn shrink_diff_panel(&mut self) {
        self.diff_pct = self.diff_pct.saturating_sub(5).max(30);
    }
}
