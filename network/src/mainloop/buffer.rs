//! Shared session buffer.
//!
//! One fixed-capacity staging area used first for the received payload and
//! then for the outbound request, never both in the same phase.
//!
//! ```text
//! 0            pos              len           CAPACITY
//! ├─────────────┼────────────────┼────────────────┤
//! │  consumed   │    pending     │     unused     │
//! ```
//!
//! Invariant: `pos <= len <= BUFFER_CAPACITY`.

use core::fmt;

/// Capacity of the session buffer in bytes.
pub const BUFFER_CAPACITY: usize = 256;

/// Outcome of copying an inbound payload into the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fill {
    /// Bytes retained in the buffer.
    pub copied: usize,
    /// Bytes beyond capacity that were discarded.
    pub dropped: usize,
}

/// Fixed-capacity byte buffer with a send cursor.
#[derive(Clone)]
pub struct SessionBuffer {
    data: [u8; BUFFER_CAPACITY],
    len: usize,
    pos: usize,
}

impl SessionBuffer {
    pub const fn new() -> Self {
        Self {
            data: [0u8; BUFFER_CAPACITY],
            len: 0,
            pos: 0,
        }
    }

    #[inline]
    pub const fn capacity(&self) -> usize {
        BUFFER_CAPACITY
    }

    /// Bytes currently valid.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cursor: bytes consumed (acknowledged, when sending).
    #[inline]
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Valid bytes.
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.len]
    }

    /// Valid bytes not yet consumed.
    pub fn pending(&self) -> &[u8] {
        &self.data[self.pos..self.len]
    }

    /// Forget contents without scrubbing.
    pub fn clear(&mut self) {
        self.len = 0;
        self.pos = 0;
    }

    /// Scrub contents and cursors.
    pub fn zero(&mut self) {
        self.data.fill(0);
        self.clear();
    }

    pub fn is_zeroed(&self) -> bool {
        self.len == 0 && self.pos == 0 && self.data.iter().all(|&b| b == 0)
    }

    /// Copy an inbound payload from offset 0.
    ///
    /// Anything beyond capacity is dropped, not an error. Both `len` and
    /// `pos` end up at the copied length.
    pub fn fill(&mut self, payload: &[u8]) -> Fill {
        let copied = payload.len().min(BUFFER_CAPACITY);
        self.data[..copied].copy_from_slice(&payload[..copied]);
        self.len = copied;
        self.pos = copied;
        Fill {
            copied,
            dropped: payload.len() - copied,
        }
    }

    /// Format an outbound payload into the buffer.
    ///
    /// On success `len` is the payload length and `pos` is 0. A payload that
    /// does not fit leaves the buffer empty.
    pub fn compose(&mut self, args: fmt::Arguments<'_>) -> Result<usize, fmt::Error> {
        self.clear();
        let mut writer = Writer {
            data: &mut self.data,
            written: 0,
        };
        match fmt::write(&mut writer, args) {
            Ok(()) => {
                self.len = writer.written;
                Ok(self.len)
            }
            Err(e) => {
                self.clear();
                Err(e)
            }
        }
    }

    /// Advance the cursor by `acked` bytes, clamped to `len`.
    ///
    /// Returns true once everything valid has been consumed.
    pub fn advance(&mut self, acked: usize) -> bool {
        self.pos = self.pos.saturating_add(acked).min(self.len);
        self.pos == self.len
    }
}

impl Default for SessionBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionBuffer")
            .field("len", &self.len)
            .field("pos", &self.pos)
            .finish()
    }
}

struct Writer<'a> {
    data: &'a mut [u8; BUFFER_CAPACITY],
    written: usize,
}

impl fmt::Write for Writer<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        let end = self.written + bytes.len();
        if end > BUFFER_CAPACITY {
            return Err(fmt::Error);
        }
        self.data[self.written..end].copy_from_slice(bytes);
        self.written = end;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    #[test]
    fn test_new_buffer_is_zeroed() {
        let buf = SessionBuffer::new();
        assert!(buf.is_zeroed());
        assert_eq!(buf.capacity(), 256);
    }

    #[test]
    fn test_compose_sets_len_and_resets_cursor() {
        let mut buf = SessionBuffer::new();
        buf.fill(b"stale");
        let n = buf.compose(format_args!("Hello server {}", 0)).unwrap();
        assert_eq!(n, 14);
        assert_eq!(buf.filled(), b"Hello server 0");
        assert_eq!(buf.pos(), 0);
        assert_eq!(buf.pending(), b"Hello server 0");
    }

    #[test]
    fn test_compose_overflow_leaves_buffer_empty() {
        let mut buf = SessionBuffer::new();
        let long = "x".repeat(BUFFER_CAPACITY + 1);
        assert!(buf.compose(format_args!("{}", long)).is_err());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_advance_reports_drained() {
        let mut buf = SessionBuffer::new();
        buf.compose(format_args!("abcdef")).unwrap();
        assert!(!buf.advance(4));
        assert_eq!(buf.pending(), b"ef");
        assert!(buf.advance(2));
        assert!(buf.advance(10));
        assert_eq!(buf.pos(), 6);
    }

    #[test]
    fn test_zero_scrubs() {
        let mut buf = SessionBuffer::new();
        buf.fill(b"data");
        buf.clear();
        assert!(!buf.is_zeroed());
        buf.zero();
        assert!(buf.is_zeroed());
    }

    proptest! {
        #[test]
        fn fill_within_capacity_keeps_everything(payload in vec(any::<u8>(), 0..=BUFFER_CAPACITY)) {
            let mut buf = SessionBuffer::new();
            let fill = buf.fill(&payload);
            prop_assert_eq!(fill.copied, payload.len());
            prop_assert_eq!(fill.dropped, 0);
            prop_assert_eq!(buf.len(), payload.len());
            prop_assert_eq!(buf.pos(), payload.len());
            prop_assert_eq!(buf.filled(), &payload[..]);
        }

        #[test]
        fn fill_over_capacity_truncates(payload in vec(any::<u8>(), BUFFER_CAPACITY + 1..4 * BUFFER_CAPACITY)) {
            let mut buf = SessionBuffer::new();
            let fill = buf.fill(&payload);
            prop_assert_eq!(buf.len(), BUFFER_CAPACITY);
            prop_assert_eq!(buf.filled(), &payload[..BUFFER_CAPACITY]);
            prop_assert_eq!(fill.dropped, payload.len() - BUFFER_CAPACITY);
        }

        #[test]
        fn cursor_never_passes_len(len in 0usize..64, acks in vec(0usize..32, 0..8)) {
            let mut buf = SessionBuffer::new();
            let text = "y".repeat(len);
            buf.compose(format_args!("{}", text)).unwrap();
            for ack in acks {
                buf.advance(ack);
                prop_assert!(buf.pos() <= buf.len());
                prop_assert!(buf.len() <= BUFFER_CAPACITY);
            }
        }
    }
}
