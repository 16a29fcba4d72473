//! Random access data sources.
//!
//! Everything in this crate reads through [`ReadAt`], which takes an
//! explicit offset on every call. No cursor is shared between callers, so
//! one source can feed any number of tagged copies one after another.

mod http;
mod local;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;

use std::io::{self, Write};

use crate::Result;

/// Chunk size used when streaming a byte range into a writer.
const COPY_CHUNK_SIZE: usize = 64 * 1024;

/// Trait for random access reading from a data source
pub trait ReadAt {
    /// Read data at the specified offset into the buffer
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Fill the whole buffer starting at `offset`, failing on a short source.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..])?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "source ended at {} while reading {} bytes at {}",
                        offset + filled as u64,
                        buf.len(),
                        offset
                    ),
                )
                .into());
            }
            filled += n;
        }
        Ok(())
    }
}

impl<T: ReadAt + ?Sized> ReadAt for &T {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        (**self).read_at(offset, buf)
    }

    fn size(&self) -> u64 {
        (**self).size()
    }
}

impl ReadAt for Vec<u8> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let start = offset.min(self.len() as u64) as usize;
        let n = buf.len().min(self.len() - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }

    fn size(&self) -> u64 {
        self.len() as u64
    }
}

/// Stream `len` bytes starting at `offset` from `reader` into `writer`.
pub fn copy_range<R: ReadAt + ?Sized, W: Write>(
    reader: &R,
    offset: u64,
    len: u64,
    writer: &mut W,
) -> Result<()> {
    let mut buf = vec![0u8; COPY_CHUNK_SIZE.min(len as usize)];
    let mut copied = 0u64;
    while copied < len {
        let chunk = (len - copied).min(buf.len() as u64) as usize;
        reader.read_exact_at(offset + copied, &mut buf[..chunk])?;
        writer.write_all(&buf[..chunk])?;
        copied += chunk as u64;
    }
    Ok(())
}
