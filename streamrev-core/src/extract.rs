//! Recovery of the first balanced `{ ... }` object from a growing buffer.
//!
//! The buffer is normally a model response still being streamed: prose, a
//! fenced code block opener, then JSON whose tail has not arrived yet. The
//! scanner tracks brace depth outside string literals only, so braces and
//! escaped quotes inside strings never end the object early.

use std::ops::Range;

/// Returns the first syntactically closed object in `text`, or `None` if the
/// first `{` has not been closed yet (or there is none).
///
/// Text before the first `{` and anything after its matching `}` is ignored.
pub fn extract(text: &str) -> Option<&str> {
    ObjectScanner::new().scan(text).map(|range| &text[range])
}

/// Resumable form of [`extract`] for append-only buffers.
///
/// Each call to [`scan`](Self::scan) only examines bytes appended since the
/// previous call. Once the object closes, its range is returned for every
/// later call, since appending cannot change an already-closed prefix.
#[derive(Debug, Clone, Default)]
pub struct ObjectScanner {
    start: Option<usize>,
    pos: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
    closed: Option<Range<usize>>,
}

impl ObjectScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `text`, which must extend the text passed on the previous call.
    /// A shorter `text` resets the scanner.
    pub fn scan(&mut self, text: &str) -> Option<Range<usize>> {
        if text.len() < self.pos {
            *self = Self::default();
        }
        if let Some(range) = &self.closed {
            return Some(range.clone());
        }

        let bytes = text.as_bytes();
        // Only ASCII bytes are inspected, and UTF-8 continuation bytes are
        // never ASCII, so every returned boundary is a char boundary.
        while self.pos < bytes.len() {
            let at = self.pos;
            let b = bytes[at];
            self.pos += 1;

            let Some(start) = self.start else {
                if b == b'{' {
                    self.start = Some(at);
                    self.depth = 1;
                }
                continue;
            };

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if b == b'\\' {
                    self.escaped = true;
                } else if b == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            match b {
                b'"' => self.in_string = true,
                b'{' => self.depth += 1,
                b'}' => {
                    self.depth -= 1;
                    if self.depth == 0 {
                        let range = start..at + 1;
                        self.closed = Some(range.clone());
                        return Some(range);
                    }
                }
                _ => {}
            }
        }

        None
    }

    /// Current nesting depth; zero before the first `{` and after it closes.
    pub fn depth(&self) -> usize {
        if self.closed.is_some() {
            0
        } else {
            self.depth
        }
    }

    /// True while the scan position is inside an unterminated string literal.
    pub fn in_string(&self) -> bool {
        self.in_string
    }
}
