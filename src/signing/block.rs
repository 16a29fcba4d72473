//! APK Signing Block framing.
//!
//! The block sits directly in front of the ZIP Central Directory and ends
//! with a fixed magic, so it is found by reading backwards from the Central
//! Directory offset: magic, then the footer size, then the whole block.
//! Both size fields must agree with each other and with the block length.

use byteorder::{ByteOrder, LittleEndian};

use super::{APK_SIG_BLOCK_MAGIC, APK_SIG_BLOCK_MIN_SIZE};
use crate::io::ReadAt;
use crate::zip::EndOfCentralDirectory;
use crate::{Error, Result};

/// Size of the `size_of_block` field, found at both ends of the block.
pub(crate) const SIZE_FIELD_LEN: usize = 8;
/// Footer: the repeated `size_of_block` followed by the magic.
pub(crate) const FOOTER_LEN: usize = SIZE_FIELD_LEN + APK_SIG_BLOCK_MAGIC.len();

/// A raw APK Signing Block.
///
/// ```text
/// size_of_block    u64   (counts everything after this field)
/// pairs            u64 length-prefixed (id: u32, value) entries
/// size_of_block    u64   (same value as above)
/// magic            "APK Sig Block 42"
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningBlock {
    bytes: Vec<u8>,
}

impl SigningBlock {
    /// Wrap raw block bytes after checking the framing: minimum size, magic
    /// at the tail, and both size fields equal to `len - 8`.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < APK_SIG_BLOCK_MIN_SIZE {
            return Err(Error::SignatureNotFound(format!(
                "APK Signing Block too small: {} bytes",
                bytes.len()
            )));
        }

        let len = bytes.len();
        if &bytes[len - APK_SIG_BLOCK_MAGIC.len()..] != APK_SIG_BLOCK_MAGIC {
            return Err(Error::SignatureNotFound(
                "APK Signing Block magic is invalid".to_string(),
            ));
        }

        let header = LittleEndian::read_u64(&bytes[..SIZE_FIELD_LEN]);
        let footer = LittleEndian::read_u64(&bytes[len - FOOTER_LEN..]);
        if header != footer {
            return Err(Error::SignatureNotFound(format!(
                "APK Signing Block size in header and footer do not match: {header} vs {footer}"
            )));
        }
        if header != (len - SIZE_FIELD_LEN) as u64 {
            return Err(Error::SignatureNotFound(format!(
                "APK Signing Block declares {header} bytes but holds {}",
                len - SIZE_FIELD_LEN
            )));
        }

        Ok(Self { bytes })
    }

    /// Serialise a block holding `entries` in the given order.
    pub fn build<'a, I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (u32, &'a [u8])>,
    {
        let mut bytes = vec![0u8; SIZE_FIELD_LEN];
        for (id, value) in entries {
            push_entry(&mut bytes, id, value);
        }
        Self::seal(bytes, APK_SIG_BLOCK_MAGIC)
    }

    /// Append the footer to `header + pairs` and fill in both size fields.
    pub(crate) fn seal(mut bytes: Vec<u8>, magic: &[u8]) -> Self {
        // The leading size field is already in `bytes` but isn't counted
        let size_of_block = (bytes.len() + FOOTER_LEN - SIZE_FIELD_LEN) as u64;
        LittleEndian::write_u64(&mut bytes[..SIZE_FIELD_LEN], size_of_block);
        bytes.extend_from_slice(&size_of_block.to_le_bytes());
        bytes.extend_from_slice(magic);
        Self { bytes }
    }

    /// The `size_of_block` value, i.e. `len() - 8`.
    pub fn size_of_block(&self) -> u64 {
        LittleEndian::read_u64(&self.bytes[..SIZE_FIELD_LEN])
    }

    /// The trailing 16 magic bytes.
    pub fn magic(&self) -> &[u8] {
        &self.bytes[self.bytes.len() - APK_SIG_BLOCK_MAGIC.len()..]
    }

    /// Region between the header size field and the footer.
    pub(crate) fn pairs_end(&self) -> usize {
        self.bytes.len() - FOOTER_LEN
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Write one `u64 length | u32 id | value` entry.
pub(crate) fn push_entry(out: &mut Vec<u8>, id: u32, value: &[u8]) {
    out.extend_from_slice(&(value.len() as u64 + 4).to_le_bytes());
    out.extend_from_slice(&id.to_le_bytes());
    out.extend_from_slice(value);
}

/// Read the APK Signing Block that ends at `central_dir_offset`.
///
/// Returns the block together with the file offset of its first byte.
pub fn extract_signing_block<R: ReadAt + ?Sized>(
    reader: &R,
    central_dir_offset: u64,
) -> Result<(SigningBlock, u64)> {
    let size = reader.size();
    let eocd_size = EndOfCentralDirectory::SIZE as u64;
    if size < eocd_size || central_dir_offset > size - eocd_size {
        return Err(Error::SignatureNotFound(format!(
            "Central Directory offset {central_dir_offset} out of range for a {size} byte file"
        )));
    }
    if central_dir_offset < APK_SIG_BLOCK_MIN_SIZE as u64 {
        return Err(Error::SignatureNotFound(format!(
            "APK too small for APK Signing Block, Central Directory offset: {central_dir_offset}"
        )));
    }

    let mut footer = [0u8; FOOTER_LEN];
    reader.read_exact_at(central_dir_offset - FOOTER_LEN as u64, &mut footer)?;

    if &footer[SIZE_FIELD_LEN..] != APK_SIG_BLOCK_MAGIC {
        return Err(Error::SignatureNotFound(
            "No APK Signing Block before ZIP Central Directory".to_string(),
        ));
    }

    let size_of_block = LittleEndian::read_u64(&footer[..SIZE_FIELD_LEN]);
    let total = size_of_block.checked_add(SIZE_FIELD_LEN as u64);
    let block_offset = match total {
        Some(total) if size_of_block >= FOOTER_LEN as u64 && total <= central_dir_offset => {
            central_dir_offset - total
        }
        _ => {
            return Err(Error::SignatureNotFound(format!(
                "APK Signing Block size out of range: {size_of_block}"
            )));
        }
    };

    let mut bytes = vec![0u8; (central_dir_offset - block_offset) as usize];
    reader.read_exact_at(block_offset, &mut bytes)?;
    log::debug!(
        "APK Signing Block at {block_offset}, {} bytes",
        bytes.len()
    );

    Ok((SigningBlock::from_bytes(bytes)?, block_offset))
}
