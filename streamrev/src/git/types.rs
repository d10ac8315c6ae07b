//! Owned data types exchanged with the git background thread.
//!
//! Everything here is `Send` so it can cross from the thread that owns the
//! `git2::Repository` to the main loop.

/// Which comparison the git worker produces a patch for.
///
/// The default is `Unstaged` (working directory vs index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum DiffMode {
    /// Working directory vs index (`git diff`).
    #[default]
    Unstaged,
    /// Index vs HEAD (`git diff --cached`).
    Staged,
    /// `main` vs HEAD (`git diff main..HEAD`).
    Branch,
}

impl DiffMode {
    /// Cycle order used by the `m` key: Unstaged → Staged → Branch → Unstaged.
    pub fn next(self) -> Self {
        match self {
            DiffMode::Unstaged => DiffMode::Staged,
            DiffMode::Staged => DiffMode::Branch,
            DiffMode::Branch => DiffMode::Unstaged,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DiffMode::Unstaged => "unstaged",
            DiffMode::Staged => "staged",
            DiffMode::Branch => "main..HEAD",
        }
    }
}

/// Commands sent from the main loop to the git worker thread over a
/// `crossbeam_channel::Sender<GitRequest>`.
#[derive(Debug)]
pub enum GitRequest {
    LoadDiff(DiffMode),
}

/// Unified diff text ready for parsing, plus where it came from.
///
/// Carried inside `AppEvent::DiffLoaded(Box<DiffPayload>)`.
#[derive(Debug, Clone)]
pub struct DiffPayload {
    /// Human-readable origin shown in the status bar (`unstaged`, a path, a URL).
    pub label: String,
    /// Set when the diff came from the git worker, so `m` can cycle modes.
    pub mode: Option<DiffMode>,
    pub text: String,
}
