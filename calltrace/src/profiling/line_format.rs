//! Trace line rendering
//!
//! One line per event, composed in a fixed stack buffer and handed to the
//! sink as a single write so concurrent threads never split each other's
//! lines:
//!
//! ```text
//! >> main
//!   >> ns::bar(int)
//!   << ns::bar(int): 2.000 ms
//! << main: 10.000 ms
//! ```
//!
//! Lines longer than [`LINE_CAPACITY`] bytes are cut short (at a character
//! boundary) and still end in a newline.

// Raw write(2) on stderr
#![allow(unsafe_code)]

use std::fmt::{self, Write as _};

use crate::domain::Elapsed;

/// Maximum bytes per emitted line, newline included.
pub const LINE_CAPACITY: usize = 512;

pub const ENTRY_MARKER: &str = ">>";
pub const EXIT_MARKER: &str = "<<";

/// Name printed for a traced frame that somehow lost its display name.
const UNKNOWN_NAME: &str = "?";

/// Destination of finished trace lines.
pub trait LineSink {
    /// Write one complete line. Failures are swallowed: tracing must never
    /// disturb the traced program.
    fn write_line(&mut self, line: &[u8]);
}

/// Standard error, written with one `write(2)` per line.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl LineSink for StderrSink {
    fn write_line(&mut self, line: &[u8]) {
        // SAFETY: `line` is a valid, initialized buffer of `line.len()` bytes.
        let _ = unsafe { libc::write(libc::STDERR_FILENO, line.as_ptr().cast(), line.len()) };
    }
}

impl LineSink for Vec<u8> {
    fn write_line(&mut self, line: &[u8]) {
        self.extend_from_slice(line);
    }
}

/// Fixed-capacity line under construction.
pub struct LineBuffer {
    buf: [u8; LINE_CAPACITY],
    len: usize,
    truncated: bool,
}

impl LineBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self { buf: [0; LINE_CAPACITY], len: 0, truncated: false }
    }

    /// Compose `<indent>>> <name>\n`.
    pub fn entry(&mut self, depth: usize, name: Option<&str>) -> &[u8] {
        self.compose(depth, ENTRY_MARKER, name, None)
    }

    /// Compose `<indent><< <name>: <value> <unit>\n`.
    pub fn exit(&mut self, depth: usize, name: Option<&str>, elapsed: Elapsed) -> &[u8] {
        self.compose(depth, EXIT_MARKER, name, Some(elapsed))
    }

    /// Whether the last composed line was cut short.
    #[must_use]
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    fn compose(&mut self, depth: usize, marker: &str, name: Option<&str>, elapsed: Option<Elapsed>) -> &[u8] {
        self.len = 0;
        self.truncated = false;

        for _ in 0..depth {
            self.push_str("  ");
        }
        let name = name.unwrap_or(UNKNOWN_NAME);
        // Writing into a LineBuffer never reports an error; overflow truncates
        let _ = match elapsed {
            Some(elapsed) => write!(self, "{marker} {name}: {elapsed}"),
            None => write!(self, "{marker} {name}"),
        };

        // Room for the newline was reserved by push_str
        self.buf[self.len] = b'\n';
        &self.buf[..=self.len]
    }

    fn push_str(&mut self, s: &str) {
        let room = LINE_CAPACITY - 1 - self.len;
        let mut take = s.len().min(room);
        if take < s.len() {
            self.truncated = true;
            while !s.is_char_boundary(take) {
                take -= 1;
            }
        }
        self.buf[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;
    }
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Write for LineBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push_str(s);
        Ok(())
    }
}
