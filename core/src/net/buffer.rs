//! FIFO byte buffer for socket ingress/egress. A safe `Vec<u8>` with a
//! head offset replaces the teacher's `slice_deque`-backed ring buffer:
//! same `egress`/`ingress`/`free_capacity` shape, no unsafe.

use std::io;

/// Buffer grows past this only if a single write demands it; otherwise
/// capacity is reused in place once the head catches up to the tail.
pub const DEFAULT_CAPACITY: usize = 64 * 1024;

#[derive(Debug)]
pub struct Buffer {
    data: Vec<u8>,
    head: usize,
}

impl Buffer {
    pub fn new() -> Self {
        Buffer::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Buffer {
            data: Vec::with_capacity(capacity),
            head: 0,
        }
    }

    /// Bytes available to read.
    pub fn len(&self) -> usize {
        self.data.len() - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn compact(&mut self) {
        if self.head == 0 {
            return;
        }
        if self.head == self.data.len() {
            self.data.clear();
            self.head = 0;
            return;
        }
        self.data.drain(0..self.head);
        self.head = 0;
    }

    /// Read bytes from `reader` into the buffer's tail. Returns the
    /// number of bytes ingested, or 0 on `WouldBlock`.
    pub fn ingress<R: io::Read>(&mut self, reader: &mut R) -> io::Result<usize> {
        self.compact();
        let mut chunk = [0u8; 8192];
        match reader.read(&mut chunk) {
            Ok(0) => Ok(0),
            Ok(n) => {
                self.data.extend_from_slice(&chunk[..n]);
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Append raw bytes directly (used by tests and by the writer
    /// thread when framing an outbound message).
    pub fn write_slice(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Drain and write everything currently buffered to `writer`.
    /// Returns the number of bytes flushed.
    pub fn egress<W: io::Write>(&mut self, writer: &mut W) -> io::Result<usize> {
        if self.is_empty() {
            return Ok(0);
        }
        let slice = &self.data[self.head..];
        match writer.write(slice) {
            Ok(0) => Ok(0),
            Ok(n) => {
                self.head += n;
                if self.head == self.data.len() {
                    self.data.clear();
                    self.head = 0;
                }
                Ok(n)
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) => Err(e),
        }
    }

    /// Peek at the readable slice without consuming it.
    pub fn readable_slice(&self) -> &[u8] {
        &self.data[self.head..]
    }

    /// Consume `count` bytes from the head (caller already copied them
    /// out via `readable_slice`).
    pub fn advance(&mut self, count: usize) {
        assert!(self.head + count <= self.data.len(), "advance past tail");
        self.head += count;
    }
}

impl Default for Buffer {
    fn default() -> Self {
        Buffer::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_roundtrip() {
        let mut buf = Buffer::new();
        let mut src = Cursor::new(vec![1, 2, 3, 4, 5]);
        let n = buf.ingress(&mut src).unwrap();
        assert_eq!(n, 5);
        assert_eq!(buf.len(), 5);

        let mut dst = Vec::new();
        let written = buf.egress(&mut dst).unwrap();
        assert_eq!(written, 5);
        assert_eq!(dst, vec![1, 2, 3, 4, 5]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_partial_advance_then_compact() {
        let mut buf = Buffer::new();
        buf.write_slice(&[1, 2, 3, 4]);
        assert_eq!(buf.readable_slice(), &[1, 2, 3, 4]);
        buf.advance(2);
        assert_eq!(buf.readable_slice(), &[3, 4]);
        buf.write_slice(&[5, 6]);
        assert_eq!(buf.readable_slice(), &[3, 4, 5, 6]);
    }

    #[test]
    #[should_panic(expected = "advance past tail")]
    fn test_advance_past_tail_panics() {
        let mut buf = Buffer::new();
        buf.write_slice(&[1]);
        buf.advance(2);
    }

    struct WouldBlockOnce {
        triggered: bool,
    }

    impl io::Read for WouldBlockOnce {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            if self.triggered {
                Ok(0)
            } else {
                self.triggered = true;
                Err(io::Error::from(io::ErrorKind::WouldBlock))
            }
        }
    }

    #[test]
    fn test_ingress_would_block_is_not_an_error() {
        let mut buf = Buffer::new();
        let mut src = WouldBlockOnce { triggered: false };
        let n = buf.ingress(&mut src).unwrap();
        assert_eq!(n, 0);
    }
}
