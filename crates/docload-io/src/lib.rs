//! docload I/O layer
//!
//! Pooled buffered reading over any `std::io::Read` source, with bounded
//! mark/reset, byte quotas for speculative passes, and full-stream
//! accumulation.

mod accumulate;
mod bounded;
mod buffered;
mod error;
mod pool;

pub use accumulate::read_fully;
pub use bounded::BoundedRewindableStream;
pub use buffered::BufferedByteReader;
pub use error::StreamError;
pub use pool::{BufferPool, PooledBuf, DEFAULT_BUFFER_SIZE};
