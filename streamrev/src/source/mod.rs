//! Where diffs and analysis byte streams come from.
//!
//! Diff text is loaded once per request from git, a file, stdin, or a URL.
//! Analysis bytes come either from a recorded response replayed in chunks or
//! from a live generator endpoint; both end up as a [`ChunkStream`] that the
//! core `StreamController` consumes.

pub mod generator;
pub mod replay;
pub mod sse;

use std::path::PathBuf;

use bytes::Bytes;
use futures::stream::BoxStream;
use streamrev_core::BoxError;

use crate::git::types::DiffMode;
use crate::git::worker::load_patch_at;

pub use generator::GeneratorClient;
pub use replay::{Replay, ReplayInput};

/// Chunked analysis bytes, as produced by any source.
pub type ChunkStream = BoxStream<'static, Result<Bytes, BoxError>>;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {label}: {source}")]
    Read {
        label: String,
        source: std::io::Error,
    },

    #[error("request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("{url} answered with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("git: {0}")]
    Git(#[from] git2::Error),

    #[error("no analysis source: pass --analysis or configure [generator]")]
    NoAnalysisSource,

    #[error("environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("stdin was already consumed by an earlier request")]
    StdinConsumed,
}

/// Origin of the unified diff under review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffSource {
    File(PathBuf),
    Stdin,
    Url(String),
    Git { repo: PathBuf, mode: DiffMode },
}

impl DiffSource {
    /// Short label for the status bar and log lines.
    pub fn label(&self) -> String {
        match self {
            DiffSource::File(path) => path.display().to_string(),
            DiffSource::Stdin => "stdin".to_owned(),
            DiffSource::Url(url) => url.clone(),
            DiffSource::Git { mode, .. } => mode.label().to_owned(),
        }
    }

    pub fn reads_stdin(&self) -> bool {
        matches!(self, DiffSource::Stdin)
    }

    /// Reads the full diff text. Invalid UTF-8 is replaced, never rejected.
    pub async fn load_text(&self) -> Result<String, SourceError> {
        match self {
            DiffSource::File(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|source| SourceError::Read {
                        label: path.display().to_string(),
                        source,
                    })?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            DiffSource::Stdin => {
                use tokio::io::AsyncReadExt;
                let mut bytes = Vec::new();
                tokio::io::stdin()
                    .read_to_end(&mut bytes)
                    .await
                    .map_err(|source| SourceError::Read {
                        label: "stdin".to_owned(),
                        source,
                    })?;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            DiffSource::Url(url) => fetch_text(url).await,
            DiffSource::Git { repo, mode } => Ok(load_patch_at(repo, *mode)?),
        }
    }
}

async fn fetch_text(url: &str) -> Result<String, SourceError> {
    let http_err = |source: reqwest::Error| SourceError::Http {
        url: url.to_owned(),
        source,
    };
    let resp = reqwest::get(url).await.map_err(http_err)?;
    let status = resp.status();
    if !status.is_success() {
        return Err(SourceError::HttpStatus {
            url: url.to_owned(),
            status,
        });
    }
    let bytes = resp.bytes().await.map_err(http_err)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Producer of analysis byte streams, one per request.
#[derive(Debug)]
pub enum AnalysisSource {
    Replay(Replay),
    Generator(GeneratorClient),
}

impl AnalysisSource {
    pub fn reads_stdin(&self) -> bool {
        matches!(self, AnalysisSource::Replay(replay) if replay.input() == &ReplayInput::Stdin)
    }

    /// Starts one request for `diff_text`. Errors here happen before any
    /// chunk is produced (unreadable file, refused connection, non-2xx).
    pub async fn open(&self, diff_text: &str) -> Result<ChunkStream, SourceError> {
        match self {
            AnalysisSource::Replay(replay) => replay.open().await,
            AnalysisSource::Generator(client) => client.open(diff_text).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn file_diff_replaces_invalid_utf8() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("change.diff");
        std::fs::write(&path, b"+caf\xe9\n").unwrap();
        let text = DiffSource::File(path).load_text().await.unwrap();
        assert_eq!(text, "+caf\u{FFFD}\n");
    }

    #[tokio::test]
    async fn missing_diff_file_names_the_path() {
        let err = DiffSource::File(PathBuf::from("/nonexistent/x.diff"))
            .load_text()
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/x.diff"));
    }

    #[test]
    fn stdin_usage_is_reported() {
        assert!(DiffSource::Stdin.reads_stdin());
        let replay = Replay::new(ReplayInput::Stdin, 8, Duration::ZERO);
        assert!(AnalysisSource::Replay(replay).reads_stdin());
        let replay = Replay::new(ReplayInput::File("a.txt".into()), 8, Duration::ZERO);
        assert!(!AnalysisSource::Replay(replay).reads_stdin());
    }
}
