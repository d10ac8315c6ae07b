//! Per-request driver turning a chunked byte stream into snapshots.
//!
//! ```text
//! Idle ──chunk──▶ Reading ──end of stream──▶ Draining ──▶ Done
//!                    │                          │
//!                    └──────transport error─────┴──▶ Errored
//! ```
//!
//! While `Reading`, every chunk runs accumulate → extract → coerce →
//! correlate and produces a snapshot only when coercion succeeds. `Draining`
//! always produces exactly one final snapshot, falling back to the last good
//! analysis (or the default one) when the complete buffer still does not
//! parse. A controller serves one request; start a new one per request.

use std::ops::Range;

use futures::{Stream, StreamExt};

use crate::accumulator::ChunkAccumulator;
use crate::coerce::coerce;
use crate::correlate::annotate;
use crate::error::{BoxError, StreamError};
use crate::extract::ObjectScanner;
use crate::types::{Analysis, DiffLine, Snapshot};

/// Lifecycle of a [`StreamController`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerState {
    /// No chunk received yet.
    #[default]
    Idle,
    Reading,
    /// End of stream seen; the final pass is running.
    Draining,
    Done,
    /// The source failed. Terminal.
    Errored,
}

/// Drives one analysis request over a fixed set of parsed diff lines.
#[derive(Debug)]
pub struct StreamController {
    lines: Vec<DiffLine>,
    accumulator: ChunkAccumulator,
    scanner: ObjectScanner,
    state: ControllerState,
    last_good: Option<(Range<usize>, Analysis)>,
    emitted: usize,
}

impl StreamController {
    pub fn new(lines: Vec<DiffLine>) -> Self {
        Self {
            lines,
            accumulator: ChunkAccumulator::new(),
            scanner: ObjectScanner::new(),
            state: ControllerState::Idle,
            last_good: None,
            emitted: 0,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn lines(&self) -> &[DiffLine] {
        &self.lines
    }

    /// The most recent successfully coerced analysis, if any.
    pub fn latest(&self) -> Option<&Analysis> {
        self.last_good.as_ref().map(|(_, analysis)| analysis)
    }

    /// Feeds one chunk. Returns a snapshot when the buffer now holds a
    /// candidate that coerces; `None` means "nothing new yet".
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Option<Snapshot> {
        match self.state {
            ControllerState::Idle => self.state = ControllerState::Reading,
            ControllerState::Reading => {}
            state => {
                tracing::warn!(?state, bytes = chunk.len(), "chunk ignored after stream end");
                return None;
            }
        }

        self.accumulator.append(chunk);
        let analysis = self.refresh()?;
        Some(self.snapshot(analysis, false))
    }

    /// Handles end of stream: one last pass over the complete buffer, then a
    /// final snapshot regardless of whether that pass succeeded.
    ///
    /// Returns `None` once the request has failed; an `Errored` controller
    /// never produces another snapshot.
    pub fn finish(&mut self) -> Option<Snapshot> {
        if self.state == ControllerState::Errored {
            tracing::warn!("finish ignored after transport failure");
            return None;
        }
        Some(self.finalize())
    }

    fn finalize(&mut self) -> Snapshot {
        if matches!(self.state, ControllerState::Idle | ControllerState::Reading) {
            self.state = ControllerState::Draining;
            self.accumulator.finish();
        }

        let analysis = self
            .refresh()
            .or_else(|| self.latest().cloned())
            .unwrap_or_default();
        if self.last_good.is_none() {
            tracing::debug!(
                chunks = self.accumulator.chunks(),
                "stream ended without a parseable analysis"
            );
        }
        self.state = ControllerState::Done;
        self.snapshot(analysis, true)
    }

    /// Records a transport failure and returns it as the request's error.
    pub fn fail(&mut self, source: BoxError) -> StreamError {
        self.state = ControllerState::Errored;
        let chunks = self.accumulator.chunks();
        tracing::warn!(chunks, error = %source, "analysis stream failed");
        StreamError::Transport { chunks, source }
    }

    /// Adapts a byte-chunk source into the request's snapshot sequence.
    ///
    /// The returned stream yields `Ok` snapshots (the last one with
    /// `is_final`), or a single `Err` after which it ends. Dropping it cancels
    /// the request and drops `source`.
    pub fn snapshots<S, B, E>(self, source: S) -> impl Stream<Item = Result<Snapshot, StreamError>>
    where
        S: Stream<Item = Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: Into<BoxError>,
    {
        futures::stream::unfold(Some((self, source)), |pending| async move {
            let (mut controller, mut source) = match pending {
                Some(pending) => pending,
                None => return None,
            };
            loop {
                match source.next().await {
                    Some(Ok(chunk)) => {
                        if let Some(snapshot) = controller.push_chunk(chunk.as_ref()) {
                            return Some((Ok(snapshot), Some((controller, source))));
                        }
                    }
                    Some(Err(err)) => {
                        let err = controller.fail(err.into());
                        return Some((Err(err), None));
                    }
                    None => return controller.finish().map(|snapshot| (Ok(snapshot), None)),
                }
            }
        })
    }

    /// Drains `source`, handing every snapshot (final one included) to
    /// `on_snapshot`, and returns the final snapshot.
    pub async fn run<S, B, E, F>(
        mut self,
        mut source: S,
        mut on_snapshot: F,
    ) -> Result<Snapshot, StreamError>
    where
        S: Stream<Item = Result<B, E>> + Unpin,
        B: AsRef<[u8]>,
        E: Into<BoxError>,
        F: FnMut(&Snapshot),
    {
        while let Some(next) = source.next().await {
            match next {
                Ok(chunk) => {
                    if let Some(snapshot) = self.push_chunk(chunk.as_ref()) {
                        on_snapshot(&snapshot);
                    }
                }
                Err(err) => return Err(self.fail(err.into())),
            }
        }
        let snapshot = self.finalize();
        on_snapshot(&snapshot);
        Ok(snapshot)
    }

    /// Re-scans the buffer and coerces the current candidate. An unchanged
    /// candidate reuses the previous analysis.
    fn refresh(&mut self) -> Option<Analysis> {
        let text = self.accumulator.text();
        let range = self.scanner.scan(text)?;

        if let Some((last_range, analysis)) = &self.last_good {
            if *last_range == range {
                return Some(analysis.clone());
            }
        }

        match coerce(&text[range.clone()]) {
            Ok(analysis) => {
                tracing::debug!(
                    chunks = self.accumulator.chunks(),
                    issues = analysis.issues.len(),
                    "candidate coerced"
                );
                self.last_good = Some((range, analysis.clone()));
                Some(analysis)
            }
            Err(err) => {
                tracing::debug!(chunks = self.accumulator.chunks(), %err, "candidate rejected");
                None
            }
        }
    }

    fn snapshot(&mut self, analysis: Analysis, is_final: bool) -> Snapshot {
        let annotated_lines = annotate(&self.lines, &analysis.issues);
        let snapshot = Snapshot {
            sequence: self.emitted,
            chunks_consumed: self.accumulator.chunks(),
            analysis,
            annotated_lines,
            is_final,
        };
        self.emitted += 1;
        snapshot
    }
}
