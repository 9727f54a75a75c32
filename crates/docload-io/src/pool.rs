//! Buffer pooling
//!
//! Free list of fixed-size byte arrays shared across readers.

use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, OnceLock};

/// Size of pooled read buffers.
pub const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;

/// How many idle buffers a pool retains before letting returns drop.
const MAX_IDLE: usize = 8;

/// Thread-safe free list of fixed-size byte arrays.
///
/// Buffers are checked out for a reader's lifetime and returned exactly once
/// when the guard drops. Contents are not zeroed between borrows.
#[derive(Debug)]
pub struct BufferPool {
    buffer_size: usize,
    idle: Mutex<Vec<Box<[u8]>>>,
}

impl BufferPool {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            idle: Mutex::new(Vec::new()),
        }
    }

    /// Process-wide default pool.
    pub fn global() -> &'static Arc<BufferPool> {
        static GLOBAL: OnceLock<Arc<BufferPool>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(BufferPool::new(DEFAULT_BUFFER_SIZE)))
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Borrow a buffer, reusing an idle one when available.
    pub fn check_out(self: Arc<Self>) -> PooledBuf {
        let buf = {
            let mut idle = self.idle.lock().expect("buffer pool poisoned");
            idle.pop()
        };
        let buf = buf.unwrap_or_else(|| {
            tracing::debug!(size = self.buffer_size, "allocating fresh pool buffer");
            vec![0u8; self.buffer_size].into_boxed_slice()
        });
        PooledBuf {
            buf: Some(buf),
            pool: self,
        }
    }

    fn check_in(&self, buf: Box<[u8]>) {
        let mut idle = self.idle.lock().expect("buffer pool poisoned");
        if idle.len() < MAX_IDLE {
            idle.push(buf);
        }
    }

    /// Number of idle buffers currently retained.
    pub fn idle_count(&self) -> usize {
        self.idle.lock().expect("buffer pool poisoned").len()
    }
}

/// Checkout guard; returns the array to its pool on drop.
#[derive(Debug)]
pub struct PooledBuf {
    buf: Option<Box<[u8]>>,
    pool: Arc<BufferPool>,
}

impl Deref for PooledBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.buf.as_deref().expect("buffer already returned")
    }
}

impl DerefMut for PooledBuf {
    fn deref_mut(&mut self) -> &mut [u8] {
        self.buf.as_deref_mut().expect("buffer already returned")
    }
}

impl Drop for PooledBuf {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.check_in(buf);
        }
    }
}
