//! Background thread that owns git2::Repository for its lifetime.
//!
//! git2::Repository is !Send, so it is opened inside the thread, never passed in.
//! Requests arrive as `GitRequest`; results leave as `AppEvent::DiffLoaded` or
//! `AppEvent::DiffFailed`.

use std::path::Path;

use crossbeam_channel::Receiver;
use git2::{Diff, DiffFormat, DiffOptions, Repository};
use tokio::sync::mpsc::UnboundedSender;

use crate::event::AppEvent;
use crate::git::types::{DiffMode, DiffPayload, GitRequest};

/// Entry point for the git worker thread.
///
/// Opens the repository at `path` and serves requests until the sender side of
/// `rx` is dropped.
pub fn git_worker_loop(
    path: String,
    rx: Receiver<GitRequest>,
    event_tx: UnboundedSender<AppEvent>,
) {
    let repo = match Repository::open(&path) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!(%path, error = %e, "cannot open repository");
            let _ = event_tx.send(AppEvent::DiffFailed(format!("{path}: {}", e.message())));
            return;
        }
    };

    for request in rx {
        let GitRequest::LoadDiff(mode) = request;
        let event = match load_patch(&repo, mode) {
            Ok(text) => AppEvent::DiffLoaded(Box::new(DiffPayload {
                label: mode.label().to_owned(),
                mode: Some(mode),
                text,
            })),
            Err(e) => AppEvent::DiffFailed(format!("{}: {}", mode.label(), e.message())),
        };
        if event_tx.send(event).is_err() {
            break;
        }
    }
}

/// Opens `repo_path` and renders the patch for `mode`. Used directly by plain
/// mode, which has no worker thread.
pub fn load_patch_at(repo_path: &Path, mode: DiffMode) -> Result<String, git2::Error> {
    let repo = Repository::open(repo_path)?;
    load_patch(&repo, mode)
}

/// Renders the diff for `mode` as unified patch text.
pub fn load_patch(repo: &Repository, mode: DiffMode) -> Result<String, git2::Error> {
    let diff = diff_for_mode(repo, mode)?;
    patch_text(&diff)
}

fn diff_for_mode(repo: &Repository, mode: DiffMode) -> Result<Diff<'_>, git2::Error> {
    let mut opts = DiffOptions::new();
    match mode {
        DiffMode::Unstaged => repo.diff_index_to_workdir(None, Some(&mut opts)),
        DiffMode::Staged => {
            let head_tree = repo.head()?.peel_to_commit()?.tree()?;
            repo.diff_tree_to_index(Some(&head_tree), None, Some(&mut opts))
        }
        DiffMode::Branch => {
            let base_tree = repo.revparse_single("main")?.peel_to_commit()?.tree()?;
            let head_tree = repo.head()?.peel_to_commit()?.tree()?;
            repo.diff_tree_to_tree(Some(&base_tree), Some(&head_tree), Some(&mut opts))
        }
    }
}

/// Flattens a `git2::Diff` into `git diff`-style text.
///
/// Content lines (`+`, `-`, ` `) arrive without their origin character, so it
/// is re-added; header and hunk lines already carry their full text.
/// Returns an empty string when there are no changes.
fn patch_text(diff: &Diff<'_>) -> Result<String, git2::Error> {
    let mut out = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        let origin = line.origin();
        let content = String::from_utf8_lossy(line.content());
        match origin {
            '+' | '-' | ' ' => {
                out.push(origin);
                out.push_str(&content);
            }
            // "\ No newline at end of file" markers come with a leading newline.
            '=' | '>' | '<' => out.push_str(content.trim_start_matches('\n')),
            _ => out.push_str(&content),
        }
        if !out.ends_with('\n') {
            out.push('\n');
        }
        true
    })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn commit_all(repo: &Repository, message: &str) {
        let mut index = repo.index().unwrap();
        index
            .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
            .unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = git2::Signature::now("test", "test@example.com").unwrap();
        let parents: Vec<git2::Commit> = repo
            .head()
            .ok()
            .and_then(|h| h.peel_to_commit().ok())
            .into_iter()
            .collect();
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap();
    }

    #[test]
    fn unstaged_patch_parses_into_classified_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join("a.js"), "const a = 1;\nconst b = 2;\n").unwrap();
        commit_all(&repo, "init");
        fs::write(dir.path().join("a.js"), "const a = 1;\nconst b = 3;\n").unwrap();

        let text = load_patch_at(dir.path(), DiffMode::Unstaged).unwrap();
        assert!(text.starts_with("diff --git a/a.js b/a.js\n"), "{text}");
        assert!(text.contains("\n-const b = 2;\n+const b = 3;\n"), "{text}");

        let lines = streamrev_core::diff::parse(&text);
        let files = streamrev_core::diff::summarize_files(&lines);
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, "a.js");
        assert_eq!((files[0].added, files[0].removed), (1, 1));
    }

    #[test]
    fn clean_worktree_yields_empty_patch() {
        let dir = tempfile::TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join("a.txt"), "x\n").unwrap();
        commit_all(&repo, "init");
        assert_eq!(load_patch_at(dir.path(), DiffMode::Unstaged).unwrap(), "");
    }

    #[test]
    fn mode_cycle_visits_every_mode() {
        let mut mode = DiffMode::default();
        let mut seen = vec![mode];
        for _ in 0..2 {
            mode = mode.next();
            seen.push(mode);
        }
        assert_eq!(seen, vec![DiffMode::Unstaged, DiffMode::Staged, DiffMode::Branch]);
        assert_eq!(mode.next(), DiffMode::Unstaged);
    }
}
