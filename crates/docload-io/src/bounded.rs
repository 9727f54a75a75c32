//! Quota-capped rewindable stream for speculative parsing.

use std::io::{self, Read};
use std::sync::Arc;

use crate::buffered::BufferedByteReader;
use crate::error::StreamError;
use crate::pool::BufferPool;

/// Adds a byte-quota ceiling, close suppression, and cooperative
/// interruption on top of [`BufferedByteReader`].
///
/// The ceiling decouples "how much may this parse consume" from how much
/// the source actually has: a caller can grant a small quota to a sniffing
/// pass and later raise it for the authoritative pass over the same handle.
/// A ceiling of 0 means unbounded.
#[derive(Debug)]
pub struct BoundedRewindableStream<R: Read> {
    inner: BufferedByteReader<R>,
    max: usize,
    consumed: u64,
    mark_consumed: Option<u64>,
    allow_close: bool,
    interrupted: bool,
}

impl<R: Read> BoundedRewindableStream<R> {
    pub fn new(source: R, max: usize) -> Self {
        Self::from_reader(BufferedByteReader::new(source), max)
    }

    pub fn with_pool(source: R, max: usize, pool: Arc<BufferPool>) -> Self {
        Self::from_reader(BufferedByteReader::with_pool(source, pool), max)
    }

    fn from_reader(inner: BufferedByteReader<R>, max: usize) -> Self {
        Self {
            inner,
            max,
            consumed: 0,
            mark_consumed: None,
            allow_close: true,
            interrupted: false,
        }
    }

    fn capped(&self) -> bool {
        self.max != 0
    }

    fn remaining(&self) -> usize {
        (self.max as u64).saturating_sub(self.consumed) as usize
    }

    /// Current ceiling (0 = unbounded).
    pub fn max(&self) -> usize {
        self.max
    }

    /// Replace the ceiling. Consumption accounting is preserved, so the cap
    /// can be raised later without forgetting what was already read.
    pub fn set_max(&mut self, new_max: usize) {
        self.max = new_max;
    }

    /// When disabled, [`close`](Self::close) is a no-op. Protects the stream
    /// from teardown by a speculative pass the caller may rewind and retry.
    pub fn allow_close(&mut self, allow: bool) {
        self.allow_close = allow;
    }

    pub fn close(&mut self) {
        if self.allow_close {
            self.inner.close();
        }
    }

    /// Cooperative cancellation: subsequent reads report EOF.
    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    /// True once the underlying source has been permanently exhausted.
    pub fn source_fully_consumed(&self) -> bool {
        self.inner.is_exhausted()
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        self.inner.pool()
    }

    /// Mark the current position, snapshotting quota consumption with it.
    pub fn mark(&mut self, limit: usize) -> Result<(), StreamError> {
        self.inner.mark(limit)?;
        self.mark_consumed = Some(self.consumed);
        Ok(())
    }

    /// Rewind to the mark, restoring quota consumption atomically with the
    /// byte position.
    pub fn reset(&mut self) -> Result<(), StreamError> {
        let snapshot = self.mark_consumed.ok_or(StreamError::ResetWithoutMark)?;
        self.inner.reset()?;
        self.consumed = snapshot;
        Ok(())
    }
}

impl<R: Read> Read for BoundedRewindableStream<R> {
    fn read(&mut self, dest: &mut [u8]) -> io::Result<usize> {
        if dest.is_empty() {
            return Ok(0);
        }
        if self.interrupted {
            return Ok(0);
        }
        let want = if self.capped() {
            let remaining = self.remaining();
            if remaining == 0 {
                return Ok(0);
            }
            dest.len().min(remaining)
        } else {
            dest.len()
        };
        let read = self.inner.read(&mut dest[..want])?;
        self.consumed += read as u64;
        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn stream(len: usize, max: usize) -> BoundedRewindableStream<Cursor<Vec<u8>>> {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        BoundedRewindableStream::new(Cursor::new(data), max)
    }

    #[test]
    fn quota_caps_total_bytes() {
        let mut s = stream(10_000, 5120);
        let mut out = Vec::new();
        s.read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), 5120);
        assert!(!s.source_fully_consumed());
    }

    #[test]
    fn raising_the_ceiling_resumes_reading() {
        let mut s = stream(10_000, 5120);
        let mut out = Vec::new();
        s.read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), 5120);

        s.set_max(0);
        s.read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), 10_000);
        assert!(s.source_fully_consumed());
    }

    #[test]
    fn lowering_below_consumption_reports_eof() {
        let mut s = stream(100, 0);
        let mut dest = [0u8; 50];
        s.read(&mut dest).unwrap();
        s.set_max(10);
        assert_eq!(s.read(&mut dest).unwrap(), 0);
    }

    #[test]
    fn reset_restores_quota_with_position() {
        let mut s = stream(1000, 100);
        s.mark(32).unwrap();
        let mut dest = [0u8; 30];
        s.read(&mut dest).unwrap();
        s.reset().unwrap();

        // The 30 bytes consumed under the mark are refunded.
        let mut out = Vec::new();
        s.read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), 100);
        assert_eq!(out[0], 0);
    }

    #[test]
    fn interrupt_converts_reads_to_eof() {
        let mut s = stream(100, 0);
        let mut dest = [0u8; 10];
        assert_eq!(s.read(&mut dest).unwrap(), 10);
        s.interrupt();
        assert_eq!(s.read(&mut dest).unwrap(), 0);
        assert!(s.is_interrupted());
    }

    #[test]
    fn unbounded_stream_ignores_quota_accounting() {
        let mut s = stream(300, 0);
        let mut out = Vec::new();
        s.read_to_end(&mut out).unwrap();
        assert_eq!(out.len(), 300);
    }
}
