//! Decoding of server-sent-event response bodies into completion text.
//!
//! Completion endpoints asked to `stream` answer with `data:` frames, each a
//! JSON envelope carrying a slice of the generated text in
//! `choices[0].text` (completions) or `choices[0].delta.content` (chat).
//! Only that text reaches the accumulator; envelopes would otherwise be the
//! first balanced object the scanner finds.
//!
//! Bodies that do not start like an SSE stream are passed through unchanged,
//! so endpoints that stream raw completion text keep working.

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;
use streamrev_core::BoxError;

use super::ChunkStream;

const SSE_PREFIXES: [&[u8]; 3] = [b"data:", b"event:", b":"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Framing {
    /// Not enough bytes seen to tell.
    #[default]
    Unknown,
    Sse,
    Raw,
}

/// Incremental decoder from response body bytes to completion text bytes.
#[derive(Debug, Default)]
pub struct SseDecoder {
    framing: Framing,
    buffer: Vec<u8>,
    done: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once `data: [DONE]` has been seen. Later bytes are ignored.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feeds one body chunk and returns the completion text it completes.
    /// A `data:` line split across chunks is held back until its newline.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<u8>, BoxError> {
        if self.done {
            return Ok(Vec::new());
        }
        self.buffer.extend_from_slice(chunk);
        if self.framing == Framing::Unknown {
            match sniff(&self.buffer) {
                Some(framing) => self.framing = framing,
                None => return Ok(Vec::new()),
            }
        }
        match self.framing {
            Framing::Sse => self.drain_lines(),
            _ => Ok(std::mem::take(&mut self.buffer)),
        }
    }

    /// Flushes whatever is left at end of body: an unterminated last line,
    /// or a short body that never got classified.
    pub fn finish(&mut self) -> Result<Vec<u8>, BoxError> {
        if self.done || self.buffer.is_empty() {
            return Ok(Vec::new());
        }
        match self.framing {
            Framing::Sse => {
                let line = std::mem::take(&mut self.buffer);
                let mut out = Vec::new();
                self.decode_line(&line, &mut out)?;
                Ok(out)
            }
            Framing::Unknown | Framing::Raw => Ok(std::mem::take(&mut self.buffer)),
        }
    }

    fn drain_lines(&mut self) -> Result<Vec<u8>, BoxError> {
        let mut out = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline).collect();
            self.decode_line(&line, &mut out)?;
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        Ok(out)
    }

    fn decode_line(&mut self, line: &[u8], out: &mut Vec<u8>) -> Result<(), BoxError> {
        let line = String::from_utf8_lossy(line);
        let Some(data) = line.trim().strip_prefix("data:") else {
            // Separators, comments, `event:` and `id:` lines carry no text.
            return Ok(());
        };
        let data = data.trim();
        if data == "[DONE]" {
            self.done = true;
            return Ok(());
        }

        let envelope: Value = match serde_json::from_str(data) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::debug!(%err, "skipping non-JSON data frame");
                return Ok(());
            }
        };
        if let Some(error) = envelope.get("error") {
            return Err(format!("generator reported an error: {error}").into());
        }
        if let Some(text) = completion_text(&envelope) {
            out.extend_from_slice(text.as_bytes());
        }
        Ok(())
    }
}

/// `None` while the leading bytes could still become an SSE prefix.
fn sniff(buffer: &[u8]) -> Option<Framing> {
    let start = buffer.iter().position(|b| !b.is_ascii_whitespace())?;
    let rest = &buffer[start..];
    if SSE_PREFIXES.iter().any(|prefix| rest.starts_with(prefix)) {
        Some(Framing::Sse)
    } else if SSE_PREFIXES.iter().any(|prefix| prefix.starts_with(rest)) {
        None
    } else {
        Some(Framing::Raw)
    }
}

fn completion_text(envelope: &Value) -> Option<&str> {
    let choice = envelope.get("choices")?.get(0)?;
    choice
        .get("text")
        .and_then(Value::as_str)
        .or_else(|| choice.get("delta")?.get("content")?.as_str())
}

/// Wraps a response body so it yields only completion text. The body is
/// dropped as soon as `[DONE]` arrives.
pub fn completion_stream<S>(body: S) -> ChunkStream
where
    S: Stream<Item = Result<Bytes, BoxError>> + Send + 'static,
{
    stream::unfold(Some((body.boxed(), SseDecoder::new())), |pending| async move {
        let (mut body, mut decoder) = pending?;
        loop {
            if decoder.is_done() {
                return None;
            }
            let decoded = match body.next().await {
                Some(Ok(bytes)) => decoder.push(&bytes),
                Some(Err(err)) => return Some((Err(err), None)),
                None => {
                    return match decoder.finish() {
                        Ok(text) if text.is_empty() => None,
                        Ok(text) => Some((Ok(Bytes::from(text)), None)),
                        Err(err) => Some((Err(err), None)),
                    };
                }
            };
            match decoded {
                Ok(text) if text.is_empty() => continue,
                Ok(text) => return Some((Ok(Bytes::from(text)), Some((body, decoder)))),
                Err(err) => return Some((Err(err), None)),
            }
        }
    })
    .boxed()
}
