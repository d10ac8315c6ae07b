//! Runs one analysis request in the background and forwards its snapshots to
//! the event bus.
//!
//! Each request gets a fresh `StreamController` and a `Uuid` tag. Aborting
//! the returned `JoinHandle` drops the snapshot stream and with it the source
//! connection; any snapshot already queued carries the old tag and is
//! discarded by `AppState::apply_snapshot`.

use std::sync::Arc;

use futures::StreamExt;
use streamrev_core::{DiffLine, StreamController};
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::event::AppEvent;
use crate::source::AnalysisSource;

pub fn spawn_analysis(
    request: Uuid,
    lines: Vec<DiffLine>,
    diff_text: String,
    source: Arc<AnalysisSource>,
    tx: UnboundedSender<AppEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let chunks = match source.open(&diff_text).await {
            Ok(chunks) => chunks,
            Err(e) => {
                tracing::warn!(%request, error = %e, "analysis source failed to open");
                let _ = tx.send(AppEvent::AnalysisFailed {
                    request,
                    error: e.to_string(),
                });
                return;
            }
        };
        tracing::info!(%request, lines = lines.len(), "analysis request started");

        let snapshots = StreamController::new(lines).snapshots(chunks);
        futures::pin_mut!(snapshots);
        while let Some(item) = snapshots.next().await {
            let event = match item {
                Ok(snapshot) => AppEvent::Snapshot {
                    request,
                    snapshot: Box::new(snapshot),
                },
                Err(e) => AppEvent::AnalysisFailed {
                    request,
                    error: e.to_string(),
                },
            };
            if tx.send(event).is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{Replay, ReplayInput};
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn replay_of(dir: &tempfile::TempDir, body: &str) -> Arc<AnalysisSource> {
        let path = dir.path().join("response.txt");
        std::fs::write(&path, body).unwrap();
        Arc::new(AnalysisSource::Replay(Replay::new(
            ReplayInput::File(path),
            4,
            Duration::ZERO,
        )))
    }

    #[tokio::test]
    async fn forwards_tagged_snapshots_until_final() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = replay_of(&dir, r#"noise {"summary":"ok","issues":[]} tail"#);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let request = Uuid::new_v4();
        let lines = streamrev_core::diff::parse("+a\n");

        spawn_analysis(request, lines, "+a\n".to_owned(), source, tx)
            .await
            .unwrap();

        let mut finals = 0;
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::Snapshot { request: tag, snapshot } => {
                    assert_eq!(tag, request);
                    assert_eq!(snapshot.analysis.summary, "ok");
                    finals += usize::from(snapshot.is_final);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        assert_eq!(finals, 1);
    }

    #[tokio::test]
    async fn open_failure_is_reported_once() {
        let source = Arc::new(AnalysisSource::Replay(Replay::new(
            ReplayInput::File("/nonexistent/response.txt".into()),
            4,
            Duration::ZERO,
        )));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let request = Uuid::new_v4();

        spawn_analysis(request, Vec::new(), String::new(), source, tx)
            .await
            .unwrap();

        match rx.try_recv() {
            Ok(AppEvent::AnalysisFailed { request: tag, error }) => {
                assert_eq!(tag, request);
                assert!(error.contains("/nonexistent/response.txt"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }
}
