//! Fixed-capacity line buffering.
//!
//! The policy, stated once and tested: LF is ignored, CR terminates the
//! line, any other byte accumulates, and bytes beyond the capacity are
//! silently dropped. Truncation can mangle one command but must never
//! desynchronize the stream — the terminating CR still executes and
//! clears the buffer.

use heapless::Vec;

/// Request line capacity. A full `w` line (1 + 4×32 hex digits + 3
/// separators) needs 132 bytes; the rest is headroom for future
/// commands.
pub const LINE_CAPACITY: usize = 512;

/// Accumulates one request line at a time.
#[derive(Debug, Default)]
pub struct LineBuffer {
    buf: Vec<u8, LINE_CAPACITY>,
}

impl LineBuffer {
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Feed one byte. Returns `true` when a CR completed the line; the
    /// caller then reads [`line`](Self::line) and must [`clear`](Self::clear).
    pub fn push(&mut self, byte: u8) -> bool {
        match byte {
            b'\n' => false,
            b'\r' => true,
            other => {
                // Overflow drops the byte, not the line.
                let _ = self.buf.push(other);
                false
            }
        }
    }

    /// The accumulated line (without terminator).
    pub fn line(&self) -> &[u8] {
        &self.buf
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lf_is_ignored_cr_terminates() {
        let mut lb = LineBuffer::new();
        assert!(!lb.push(b'\n'));
        assert!(!lb.push(b'v'));
        assert!(!lb.push(b'\n'));
        assert!(lb.push(b'\r'));
        assert_eq!(lb.line(), b"v");
    }

    #[test]
    fn bare_cr_yields_an_empty_line() {
        let mut lb = LineBuffer::new();
        assert!(lb.push(b'\r'));
        assert!(lb.line().is_empty());
    }

    #[test]
    fn overflow_drops_excess_but_keeps_the_stream_in_sync() {
        let mut lb = LineBuffer::new();
        for _ in 0..LINE_CAPACITY + 100 {
            assert!(!lb.push(b'x'));
        }
        assert!(lb.push(b'\r'));
        assert_eq!(lb.line().len(), LINE_CAPACITY);

        lb.clear();
        assert!(!lb.push(b'd'));
        assert!(lb.push(b'\r'));
        assert_eq!(lb.line(), b"d");
    }
}
