//! Growing text buffer fed by raw byte chunks.

/// Appends byte chunks to one text buffer, decoding UTF-8 across chunk
/// boundaries.
///
/// A multi-byte sequence split by a chunk boundary is held back until the
/// next chunk completes it. Bytes that can never form valid UTF-8 decode to
/// U+FFFD. One accumulator serves exactly one request.
#[derive(Debug, Default)]
pub struct ChunkAccumulator {
    text: String,
    pending: Vec<u8>,
    chunks: usize,
}

impl ChunkAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns the full decoded text so far.
    pub fn append(&mut self, chunk: &[u8]) -> &str {
        self.chunks += 1;
        self.pending.extend_from_slice(chunk);

        let mut consumed = 0;
        while consumed < self.pending.len() {
            match std::str::from_utf8(&self.pending[consumed..]) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    consumed = self.pending.len();
                }
                Err(err) => {
                    let valid_end = consumed + err.valid_up_to();
                    self.text
                        .push_str(&String::from_utf8_lossy(&self.pending[consumed..valid_end]));
                    match err.error_len() {
                        Some(bad) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            consumed = valid_end + bad;
                        }
                        // Incomplete sequence at the tail: wait for more bytes.
                        None => {
                            consumed = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..consumed);

        &self.text
    }

    /// Flushes a still-incomplete trailing sequence as U+FFFD and returns the
    /// final text. Call once the source signals end of stream.
    pub fn finish(&mut self) -> &str {
        if !self.pending.is_empty() {
            self.pending.clear();
            self.text.push(char::REPLACEMENT_CHARACTER);
        }
        &self.text
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of chunks appended so far, including empty ones.
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Bytes held back waiting for the rest of a multi-byte sequence.
    pub fn pending_bytes(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_ascii_chunks() {
        let mut acc = ChunkAccumulator::new();
        assert_eq!(acc.append(b"{\"summary\""), "{\"summary\"");
        assert_eq!(acc.append(b":\"ok\"}"), "{\"summary\":\"ok\"}");
        assert_eq!(acc.chunks(), 2);
    }

    #[test]
    fn holds_back_split_multibyte_sequence() {
        let bytes = "héllo 🦀".as_bytes();
        // Split inside 'é' (2 bytes) and inside the crab (4 bytes).
        let mut acc = ChunkAccumulator::new();
        assert_eq!(acc.append(&bytes[..2]), "h");
        assert_eq!(acc.pending_bytes(), 1);
        assert_eq!(acc.append(&bytes[2..9]), "héllo ");
        assert_eq!(acc.append(&bytes[9..]), "héllo 🦀");
        assert_eq!(acc.pending_bytes(), 0);
    }

    #[test]
    fn every_byte_split_decodes_identically() {
        let text = "naïve — «quoted» 日本語";
        let bytes = text.as_bytes();
        for split in 0..=bytes.len() {
            let mut acc = ChunkAccumulator::new();
            acc.append(&bytes[..split]);
            assert_eq!(acc.append(&bytes[split..]), text, "split at {split}");
        }
    }

    #[test]
    fn invalid_bytes_become_replacement_characters() {
        let mut acc = ChunkAccumulator::new();
        assert_eq!(acc.append(b"a\xffb"), "a\u{FFFD}b");
    }

    #[test]
    fn finish_flushes_truncated_sequence() {
        let mut acc = ChunkAccumulator::new();
        acc.append(&"é".as_bytes()[..1]);
        assert_eq!(acc.text(), "");
        assert_eq!(acc.finish(), "\u{FFFD}");
        assert_eq!(acc.finish(), "\u{FFFD}");
    }
}
