//! streamrev-core: streaming review analysis over unified diffs.
//!
//! The pipeline runs once per chunk of a generator's response:
//!
//! 1. [`accumulator::ChunkAccumulator`] decodes bytes into one growing buffer.
//! 2. [`extract::ObjectScanner`] finds the first balanced `{ ... }` in it.
//! 3. [`coerce::coerce`] turns that candidate into a fully-defaulted
//!    [`types::Analysis`].
//! 4. [`correlate::correlate`] pins issues to lines from [`diff::parse`].
//! 5. [`stream::StreamController`] wraps the above into a sequence of
//!    [`types::Snapshot`]s.
//!
//! Nothing here performs I/O; sources are any `futures::Stream` of byte
//! chunks.

pub mod accumulator;
pub mod coerce;
pub mod correlate;
pub mod diff;
pub mod error;
pub mod extract;
pub mod stream;
pub mod types;

pub use error::{BoxError, ParseFailure, StreamError};
pub use stream::{ControllerState, StreamController};
pub use types::{
    Analysis, AnnotatedLine, DiffLine, DiffLineKind, FileSummary, Issue, Severity, Snapshot,
    Statistics,
};
