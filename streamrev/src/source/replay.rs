//! Replays a recorded generator response as a chunked stream.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use futures::{stream, StreamExt};
use streamrev_core::BoxError;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::{ChunkStream, SourceError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplayInput {
    File(PathBuf),
    /// Read live, chunk by chunk, as the upstream writer produces output.
    Stdin,
}

#[derive(Debug)]
pub struct Replay {
    input: ReplayInput,
    chunk_size: usize,
    delay: Duration,
    stdin_taken: AtomicBool,
}

impl Replay {
    pub fn new(input: ReplayInput, chunk_size: usize, delay: Duration) -> Self {
        Self {
            input,
            chunk_size: chunk_size.max(1),
            delay,
            stdin_taken: AtomicBool::new(false),
        }
    }

    pub fn input(&self) -> &ReplayInput {
        &self.input
    }

    /// Files are re-read on every call, so restarting a request replays from
    /// the beginning. Stdin can only be opened once.
    pub async fn open(&self) -> Result<ChunkStream, SourceError> {
        match &self.input {
            ReplayInput::File(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|source| SourceError::Read {
                        label: path.display().to_string(),
                        source,
                    })?;
                tracing::debug!(
                    path = %path.display(),
                    bytes = bytes.len(),
                    "replaying recorded response"
                );
                Ok(paced(Bytes::from(bytes), self.chunk_size, self.delay))
            }
            ReplayInput::Stdin => {
                if self.stdin_taken.swap(true, Ordering::SeqCst) {
                    return Err(SourceError::StdinConsumed);
                }
                Ok(read_live(tokio::io::stdin(), self.chunk_size))
            }
        }
    }
}

/// Splits `bytes` into `chunk_size` pieces, sleeping `delay` before each.
pub fn paced(bytes: Bytes, chunk_size: usize, delay: Duration) -> ChunkStream {
    let chunk_size = chunk_size.max(1);
    let chunks: Vec<Bytes> = (0..bytes.len())
        .step_by(chunk_size)
        .map(|start| bytes.slice(start..(start + chunk_size).min(bytes.len())))
        .collect();
    stream::iter(chunks)
        .then(move |chunk| async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            Ok::<_, BoxError>(chunk)
        })
        .boxed()
}

/// Yields whatever `reader` returns, at most `chunk_size` bytes at a time.
/// A read error ends the stream after being reported once.
pub fn read_live<R>(reader: R, chunk_size: usize) -> ChunkStream
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let chunk_size = chunk_size.max(1);
    stream::unfold(Some(reader), move |reader| async move {
        let mut reader = match reader {
            Some(reader) => reader,
            None => return None,
        };
        let mut buf = vec![0u8; chunk_size];
        match reader.read(&mut buf).await {
            Ok(0) => None,
            Ok(n) => {
                buf.truncate(n);
                Some((Ok(Bytes::from(buf)), Some(reader)))
            }
            Err(e) => Some((Err(BoxError::from(e)), None)),
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    async fn drain(chunks: ChunkStream) -> Vec<Bytes> {
        chunks.try_collect().await.unwrap()
    }

    #[tokio::test]
    async fn paced_splits_into_fixed_chunks() {
        let chunks = drain(paced(Bytes::from_static(b"abcdefg"), 3, Duration::ZERO)).await;
        assert_eq!(chunks, vec!["abc", "def", "g"]);
    }

    #[tokio::test]
    async fn empty_recording_yields_no_chunks() {
        assert!(drain(paced(Bytes::new(), 3, Duration::ZERO)).await.is_empty());
    }

    #[tokio::test]
    async fn live_reader_respects_chunk_size() {
        let chunks = drain(read_live(&b"0123456789"[..], 4)).await;
        assert_eq!(chunks.concat(), b"0123456789");
        assert!(chunks.iter().all(|c| c.len() <= 4));
    }

    #[tokio::test]
    async fn file_replay_restarts_from_the_beginning() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("response.txt");
        std::fs::write(&path, r#"{"summary":"ok"}"#).unwrap();
        let replay = Replay::new(ReplayInput::File(path), 5, Duration::ZERO);

        let first = drain(replay.open().await.unwrap()).await.concat();
        let second = drain(replay.open().await.unwrap()).await.concat();
        assert_eq!(first, second);
        assert_eq!(first, br#"{"summary":"ok"}"#);
    }

    #[tokio::test]
    async fn stdin_replay_opens_once() {
        let replay = Replay::new(ReplayInput::Stdin, 64, Duration::ZERO);
        let first = replay.open().await;
        assert!(first.is_ok());
        assert!(matches!(replay.open().await, Err(SourceError::StdinConsumed)));
    }
}
