//! Full-stream accumulation into one contiguous buffer.

use std::io::{self, Read};
use std::sync::Arc;

use crate::pool::BufferPool;

/// Drain `source` into a single `Vec<u8>`, reading through a pooled chunk
/// buffer.
///
/// `max` caps the number of bytes accumulated (0 = unbounded). The output
/// capacity grows by `max(1.5x, current + just_read)` when a chunk does not
/// fit, and is trimmed to exact length before returning. The chunk buffer
/// returns to the pool on success and on error.
pub fn read_fully<R: Read>(
    source: &mut R,
    max: usize,
    pool: &Arc<BufferPool>,
) -> io::Result<Vec<u8>> {
    let capped = max > 0;
    let chunk_size = pool.buffer_size();
    let mut chunk = pool.clone().check_out();
    let mut out = Vec::with_capacity(if capped { max.min(chunk_size) } else { chunk_size });
    let mut remaining = max;

    loop {
        let want = if capped {
            remaining.min(chunk_size)
        } else {
            chunk_size
        };
        if want == 0 {
            break;
        }
        let read = source.read(&mut chunk[..want])?;
        if read == 0 {
            break;
        }
        if out.capacity() - out.len() < read {
            let grown = (out.capacity() + out.capacity() / 2).max(out.capacity() + read);
            out.reserve_exact(grown - out.len());
        }
        out.extend_from_slice(&chunk[..read]);
        if capped {
            remaining -= read;
            if remaining == 0 {
                break;
            }
        }
    }
    out.shrink_to_fit();
    Ok(out)
}
