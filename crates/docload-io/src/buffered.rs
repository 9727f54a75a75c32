//! Buffered reader with bounded rewind over a pooled backing array.

use std::io::{self, Read};
use std::sync::Arc;

use crate::error::StreamError;
use crate::pool::{BufferPool, PooledBuf};

/// Turns an arbitrary byte source into a reread-capable stream backed by a
/// single pooled array.
///
/// `mark`/`reset` allow un-reading up to one buffer's worth of lookahead.
/// When no mark is active and no buffered bytes are pending, reads bypass
/// the buffer and go straight to the source. Once the source reports EOF the
/// reader is permanently exhausted; the source is dropped at that point and
/// never queried again.
#[derive(Debug)]
pub struct BufferedByteReader<R: Read> {
    source: Option<R>,
    pool: Arc<BufferPool>,
    buf: Option<PooledBuf>,
    buf_pos: usize,
    buf_len: usize,
    mark: Option<usize>,
    exhausted: bool,
}

impl<R: Read> BufferedByteReader<R> {
    pub fn new(source: R) -> Self {
        Self::with_pool(source, BufferPool::global().clone())
    }

    pub fn with_pool(source: R, pool: Arc<BufferPool>) -> Self {
        Self {
            source: Some(source),
            pool,
            buf: None,
            buf_pos: 0,
            buf_len: 0,
            mark: None,
            exhausted: false,
        }
    }

    pub fn capacity(&self) -> usize {
        self.pool.buffer_size()
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// True once the source has signalled EOF. One-way.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Bytes servable without a new source read.
    pub fn available(&self) -> usize {
        self.buf_len - self.buf_pos
    }

    /// Record the current logical position as the rewind point.
    ///
    /// `limit` is the caller's promised maximum lookahead; it must fit in
    /// the backing buffer.
    pub fn mark(&mut self, limit: usize) -> Result<(), StreamError> {
        let capacity = self.capacity();
        if limit > capacity {
            return Err(StreamError::MarkLimitTooLarge { limit, capacity });
        }
        self.mark = Some(self.buf_pos);
        Ok(())
    }

    /// Restore the read cursor to the mark.
    pub fn reset(&mut self) -> Result<(), StreamError> {
        match self.mark {
            Some(pos) => {
                self.buf_pos = pos;
                Ok(())
            }
            None => Err(StreamError::ResetWithoutMark),
        }
    }

    /// Idempotent teardown: the backing array returns to the pool once and
    /// the source is dropped once.
    pub fn close(&mut self) {
        self.buf = None;
        self.buf_pos = 0;
        self.buf_len = 0;
        self.source = None;
    }

    fn record_exhausted(&mut self) {
        self.exhausted = true;
        self.source = None;
    }

    /// Refill the backing buffer, preserving the marked region.
    ///
    /// With an active mark and a full buffer, `[mark, pos)` is compacted to
    /// offset 0 so the rewind point survives; a mark already at 0 cannot be
    /// preserved past capacity and is abandoned. Without a mark the buffer
    /// restarts at 0.
    fn fill(&mut self) -> io::Result<()> {
        if self.exhausted {
            return Ok(());
        }
        if self.buf.is_none() {
            self.buf = Some(self.pool.clone().check_out());
        }
        let capacity = self.capacity();
        let buf = self.buf.as_mut().expect("backing buffer just borrowed");
        match self.mark {
            None => self.buf_pos = 0,
            Some(mark) if self.buf_pos >= capacity => {
                if mark > 0 {
                    buf.copy_within(mark..self.buf_pos, 0);
                    self.buf_pos -= mark;
                    self.mark = Some(0);
                } else {
                    self.mark = None;
                    self.buf_pos = 0;
                }
            }
            Some(_) => {}
        }
        self.buf_len = self.buf_pos;
        let read = match self.source.as_mut() {
            Some(source) => source.read(&mut buf[self.buf_pos..])?,
            None => 0,
        };
        if read > 0 {
            self.buf_len = self.buf_pos + read;
        } else {
            self.record_exhausted();
        }
        Ok(())
    }
}

impl<R: Read> Read for BufferedByteReader<R> {
    fn read(&mut self, dest: &mut [u8]) -> io::Result<usize> {
        if dest.is_empty() {
            return Ok(0);
        }
        let mut avail = self.available();
        if avail == 0 {
            if self.exhausted {
                return Ok(0);
            }
            // No pending buffered bytes and no rewind point to maintain:
            // skip the copy and read the source directly.
            if self.mark.is_none() {
                let read = match self.source.as_mut() {
                    Some(source) => source.read(dest)?,
                    None => 0,
                };
                if read == 0 {
                    self.record_exhausted();
                }
                return Ok(read);
            }
            self.fill()?;
            avail = self.available();
            if avail == 0 {
                return Ok(0);
            }
        }
        let n = avail.min(dest.len());
        let buf = self.buf.as_ref().expect("buffered bytes imply a backing array");
        dest[..n].copy_from_slice(&buf[self.buf_pos..self.buf_pos + n]);
        self.buf_pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader_with_capacity(data: Vec<u8>, capacity: usize) -> BufferedByteReader<Cursor<Vec<u8>>> {
        let pool = Arc::new(BufferPool::new(capacity));
        BufferedByteReader::with_pool(Cursor::new(data), pool)
    }

    #[test]
    fn zero_length_read_returns_zero() {
        let mut r = reader_with_capacity(vec![1, 2, 3], 16);
        assert_eq!(r.read(&mut []).unwrap(), 0);
        let mut one = [0u8; 1];
        assert_eq!(r.read(&mut one).unwrap(), 1);
    }

    #[test]
    fn bypasses_buffer_without_mark() {
        let mut r = reader_with_capacity((0..64).collect(), 16);
        // Request larger than the buffer capacity; served directly.
        let mut dest = [0u8; 40];
        assert_eq!(r.read(&mut dest).unwrap(), 40);
        assert_eq!(dest[..40], (0..40).collect::<Vec<u8>>()[..]);
        assert_eq!(r.available(), 0);
    }

    #[test]
    fn mark_then_reset_without_reads_is_a_noop() {
        let mut r = reader_with_capacity((0..32).collect(), 16);
        r.mark(8).unwrap();
        let mut dest = [0u8; 4];
        r.read(&mut dest).unwrap();
        r.reset().unwrap();
        let avail = r.available();
        r.mark(8).unwrap();
        r.reset().unwrap();
        assert_eq!(r.available(), avail);
        r.read(&mut dest).unwrap();
        assert_eq!(dest, [0, 1, 2, 3]);
    }

    #[test]
    fn reset_without_mark_fails() {
        let mut r = reader_with_capacity(vec![1], 16);
        assert!(matches!(r.reset(), Err(StreamError::ResetWithoutMark)));
    }

    #[test]
    fn mark_limit_beyond_capacity_fails() {
        let mut r = reader_with_capacity(vec![0; 8], 16);
        for limit in [17, 32, 100, 160] {
            match r.mark(limit) {
                Err(StreamError::MarkLimitTooLarge { limit: l, capacity }) => {
                    assert_eq!(l, limit);
                    assert_eq!(capacity, 16);
                }
                other => panic!("expected MarkLimitTooLarge, got {other:?}"),
            }
        }
        // At capacity is still fine.
        r.mark(16).unwrap();
    }

    #[test]
    fn compaction_preserves_mark_across_refills() {
        let mut r = reader_with_capacity((0..64).collect(), 16);
        let mut dest = [0u8; 16];

        r.mark(4).unwrap();
        r.read(&mut dest[..4]).unwrap(); // buffer now holds 0..16
        r.mark(6).unwrap(); // mark at logical position 4
        r.read(&mut dest[..12]).unwrap(); // drains the buffer
        let mut two = [0u8; 2];
        r.read(&mut two).unwrap(); // forces a compacting refill
        assert_eq!(two, [16, 17]);

        r.reset().unwrap();
        let mut replay = [0u8; 14];
        r.read(&mut replay).unwrap();
        assert_eq!(replay[..], (4..18).collect::<Vec<u8>>()[..]);
    }

    #[test]
    fn exhaustion_is_permanent() {
        let mut r = reader_with_capacity(vec![9, 9], 16);
        let mut dest = [0u8; 8];
        assert_eq!(r.read(&mut dest).unwrap(), 2);
        assert_eq!(r.read(&mut dest).unwrap(), 0);
        assert!(r.is_exhausted());
        assert_eq!(r.read(&mut dest).unwrap(), 0);
    }

    #[test]
    fn close_returns_buffer_to_pool_once() {
        let pool = Arc::new(BufferPool::new(16));
        let mut r = BufferedByteReader::with_pool(Cursor::new(vec![0u8; 32]), pool.clone());
        r.mark(4).unwrap();
        let mut dest = [0u8; 4];
        r.read(&mut dest).unwrap();
        assert_eq!(pool.idle_count(), 0);
        r.close();
        assert_eq!(pool.idle_count(), 1);
        r.close();
        assert_eq!(pool.idle_count(), 1);
    }
}
