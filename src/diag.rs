//! Bounded buffer for human-readable error messages.
//!
//! Each component appends a line prefixed with its short tag (`zip:`,
//! `xml:`, `ods:`) when a call fails, so after a failure the buffer reads as
//! a bottom-up trace of what went wrong. The buffer never grows past its
//! capacity: once full, further messages are dropped.

use std::fmt::{self, Write};

/// Append-only, fixed-capacity message sink.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    buf: String,
    capacity: usize,
}

impl Diagnostics {
    /// Capacity used by [`Diagnostics::new`], in bytes.
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: String::with_capacity(capacity),
            capacity,
        }
    }

    /// Append one message, terminating it with a newline if it lacks one.
    ///
    /// A message that does not fit is cut at the last character boundary
    /// that leaves room for its newline. Nothing is appended once the
    /// buffer is full.
    pub fn add(&mut self, msg: impl fmt::Display) {
        let available = self.capacity.saturating_sub(self.buf.len());
        if available == 0 {
            return;
        }

        let mut line = String::new();
        // Writing into a String cannot fail.
        let _ = write!(line, "{msg}");
        if !line.ends_with('\n') {
            line.push('\n');
        }

        if line.len() <= available {
            self.buf.push_str(&line);
            return;
        }

        let mut cut = available - 1;
        while !line.is_char_boundary(cut) {
            cut -= 1;
        }
        self.buf.push_str(&line[..cut]);
        self.buf.push('\n');
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Everything appended since creation or the last [`clear`](Self::clear).
    pub fn contents(&self) -> &str {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() >= self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buf)
    }
}
