//! src/reader/blob.rs
//!
//! Sink adapters for streamed blob decryption.
//!
//! Attachment plaintext reaches its sink before the trailing MAC can be
//! verified. [`BufferedSink`] restores write-all-or-none semantics by
//! holding the plaintext until the caller commits; the raw streaming path
//! stays available for blobs too large to buffer.

use std::io::{self, Write};

/// Buffers every write and only forwards them to the inner writer on
/// [`commit`](BufferedSink::commit). Dropping the sink without committing
/// discards the buffered bytes.
pub struct BufferedSink<W: Write> {
    inner: W,
    buf: Vec<u8>,
}

impl<W: Write> BufferedSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            buf: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize, inner: W) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Bytes buffered so far.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Flush the buffered plaintext through to the inner writer.
    pub fn commit(mut self) -> io::Result<W> {
        self.inner.write_all(&self.buf)?;
        self.inner.flush()?;
        Ok(self.inner)
    }

    /// Drop the buffered plaintext and return the untouched inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for BufferedSink<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_forwards_everything() {
        let mut out = Vec::new();
        let mut sink = BufferedSink::new(&mut out);
        sink.write_all(b"hello ").unwrap();
        sink.write_all(b"world").unwrap();
        assert_eq!(sink.buffered(), 11);
        sink.commit().unwrap();
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn uncommitted_writes_are_dropped() {
        let mut out = Vec::new();
        let mut sink = BufferedSink::new(&mut out);
        sink.write_all(b"secret").unwrap();
        drop(sink);
        assert!(out.is_empty());
    }
}
