//! Non-interactive mode: one JSON snapshot per line on stdout.

use std::io::Write;

use streamrev_core::diff::{parse, summarize_files};
use streamrev_core::{Snapshot, StreamController, StreamError};

use crate::source::{AnalysisSource, ChunkStream, DiffSource, SourceError};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    #[error("failed to write snapshot: {0}")]
    Output(#[from] std::io::Error),
}

impl RunError {
    /// 1 when the analysis stream broke mid-request, 2 for setup failures.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::Stream(_) => 1,
            RunError::Source(_) | RunError::Output(_) => 2,
        }
    }
}

pub async fn run_plain(diff: &DiffSource, analysis: &AnalysisSource) -> Result<(), RunError> {
    let diff_text = diff.load_text().await?;
    let lines = parse(&diff_text);
    tracing::info!(
        source = %diff.label(),
        lines = lines.len(),
        files = summarize_files(&lines).len(),
        "diff loaded"
    );

    let chunks = analysis.open(&diff_text).await?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let final_snapshot = write_snapshots(StreamController::new(lines), chunks, &mut out).await?;
    tracing::info!(
        snapshots = final_snapshot.sequence + 1,
        chunks = final_snapshot.chunks_consumed,
        issues = final_snapshot.analysis.issues.len(),
        "analysis complete"
    );
    Ok(())
}

/// Streams every snapshot to `out` as NDJSON and returns the final one.
/// The first write error stops output; the stream is still drained so the
/// request ends cleanly.
pub async fn write_snapshots<W: Write>(
    controller: StreamController,
    chunks: ChunkStream,
    out: &mut W,
) -> Result<Snapshot, RunError> {
    let mut write_err: Option<std::io::Error> = None;
    let final_snapshot = controller
        .run(chunks, |snapshot| {
            if write_err.is_none() {
                write_err = write_line(&mut *out, snapshot).err();
            }
        })
        .await?;
    match write_err {
        Some(e) => Err(e.into()),
        None => Ok(final_snapshot),
    }
}

fn write_line<W: Write>(out: &mut W, snapshot: &Snapshot) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, snapshot)?;
    out.write_all(b"\n")?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::replay::paced;
    use bytes::Bytes;
    use futures::StreamExt;
    use std::time::Duration;
    use streamrev_core::BoxError;

    const DIFF: &str = "+++ b/a.js\n+eval(x)\n";
    const RESPONSE: &str = r#"```json
{"summary":"eval","overallRisk":"High","issues":[{"severity":"High","category":"Security","lineNumber":2}]}
```"#;

    #[tokio::test]
    async fn each_snapshot_is_one_json_line() {
        let controller = StreamController::new(parse(DIFF));
        let chunks = paced(Bytes::from_static(RESPONSE.as_bytes()), 16, Duration::ZERO);
        let mut out = Vec::new();
        let last = write_snapshots(controller, chunks, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        let rows: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(rows.len(), last.sequence + 1);

        let final_row = rows.last().unwrap();
        assert_eq!(final_row["isFinal"], true);
        assert_eq!(final_row["analysis"]["overallRisk"], "High");
        assert_eq!(
            final_row["annotatedLines"][1]["matchedIssue"]["category"],
            "Security"
        );
        assert!(final_row["annotatedLines"][0]["matchedIssue"].is_null());
    }

    #[tokio::test]
    async fn transport_failure_maps_to_exit_code_one() {
        let controller = StreamController::new(parse(DIFF));
        let chunks: ChunkStream = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"{\"summary\":")),
            Err(BoxError::from("connection reset")),
        ])
        .boxed();
        let mut out = Vec::new();
        let err = write_snapshots(controller, chunks, &mut out)
            .await
            .unwrap_err();

        assert_eq!(err.exit_code(), 1);
        assert!(out.is_empty());
    }
}
