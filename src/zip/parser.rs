//! ZIP tail parser.
//!
//! Only the trailing structures of the archive are read:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. Refuse the archive if a ZIP64 EOCD locator precedes it
//! 3. Read the Central Directory offset and size from the EOCD and check
//!    that the Central Directory ends exactly where the EOCD starts
//!
//! The Central Directory entries themselves are never walked; the APK
//! Signing Block is found purely by arithmetic from the Central Directory
//! offset.

use crate::io::ReadAt;
use crate::{Error, Result};

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = u16::MAX as u64;

/// ZIP tail parser over any [`ReadAt`] source.
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: R,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    pub fn new(reader: R) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find the offset of the End of Central Directory record.
    ///
    /// The record may be followed by a comment of up to 65535 bytes, so the
    /// tail is scanned backwards starting at the zero-comment position. A
    /// signature hit only counts when the record's comment length equals the
    /// number of bytes stepped back, which keeps signature bytes that happen
    /// to sit inside a comment from being taken for the real record.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if the file is shorter than an EOCD record or no
    /// candidate passes both checks.
    pub fn locate_eocd(&self) -> Result<u64> {
        let eocd_size = EndOfCentralDirectory::SIZE as u64;
        if self.size < eocd_size {
            return Err(Error::NotFound);
        }

        // One read covers every candidate position
        let max_comment = (self.size - eocd_size).min(MAX_COMMENT_SIZE);
        let search_start = self.size - eocd_size - max_comment;
        let mut buf = vec![0u8; (self.size - search_start) as usize];
        self.reader.read_exact_at(search_start, &mut buf)?;

        let no_comment_pos = buf.len() - EndOfCentralDirectory::SIZE;
        for comment_len in 0..=max_comment as usize {
            let i = no_comment_pos - comment_len;
            if &buf[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
                continue;
            }

            let field = i + EndOfCentralDirectory::COMMENT_LEN_FIELD_OFFSET;
            let declared = u16::from_le_bytes([buf[field], buf[field + 1]]) as usize;
            if declared == comment_len {
                let offset = search_start + i as u64;
                log::debug!("EOCD at {offset} with a {comment_len} byte comment");
                return Ok(offset);
            }
        }

        Err(Error::NotFound)
    }

    /// Whether a ZIP64 EOCD locator sits immediately before the EOCD record.
    pub fn is_zip64(&self, eocd_offset: u64) -> Result<bool> {
        let Some(locator_offset) = eocd_offset.checked_sub(ZIP64_LOCATOR_SIZE) else {
            return Ok(false);
        };

        let mut sig = [0u8; 4];
        self.reader.read_exact_at(locator_offset, &mut sig)?;
        Ok(&sig[..] == ZIP64_LOCATOR_SIGNATURE)
    }

    /// Read the Central Directory offset and size from the EOCD record.
    ///
    /// # Errors
    ///
    /// [`Error::Layout`] when the Central Directory does not end exactly at
    /// the EOCD record.
    pub fn resolve_central_directory(&self, eocd_offset: u64) -> Result<(u64, u64)> {
        let mut buf = [0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(eocd_offset, &mut buf)?;
        let eocd = EndOfCentralDirectory::from_bytes(&buf)?;

        let central_dir_offset = eocd.cd_offset as u64;
        let central_dir_size = eocd.cd_size as u64;

        if central_dir_offset + central_dir_size != eocd_offset {
            return Err(Error::Layout {
                central_dir_offset,
                central_dir_size,
                eocd_offset,
            });
        }

        Ok((central_dir_offset, central_dir_size))
    }

    /// Locate and validate the whole archive tail.
    pub fn read_tail(&self) -> Result<ZipTail> {
        let eocd_offset = self.locate_eocd()?;
        if self.is_zip64(eocd_offset)? {
            return Err(Error::Zip64Unsupported);
        }

        let (central_dir_offset, central_dir_size) = self.resolve_central_directory(eocd_offset)?;

        let mut comment_len = [0u8; 2];
        self.reader.read_exact_at(
            eocd_offset + EndOfCentralDirectory::COMMENT_LEN_FIELD_OFFSET as u64,
            &mut comment_len,
        )?;

        Ok(ZipTail {
            eocd_offset,
            central_dir_offset,
            central_dir_size,
            comment_length: u16::from_le_bytes(comment_len),
        })
    }

    /// Total size of the archive in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Get a reference to the underlying reader.
    pub fn reader(&self) -> &R {
        &self.reader
    }
}
