use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::{Error, Result};

/// End of Central Directory (EOCD) - 22 bytes minimum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;
    /// Offset of the Central Directory size field inside the record.
    pub const CD_SIZE_FIELD_OFFSET: u64 = 12;
    /// Offset of the Central Directory offset field inside the record.
    pub const CD_OFFSET_FIELD_OFFSET: u64 = 16;
    /// Offset of the comment length field inside the record.
    pub const COMMENT_LEN_FIELD_OFFSET: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::NotFound);
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes, placed right before the EOCD
pub const ZIP64_LOCATOR_SIGNATURE: &[u8] = b"PK\x06\x07";
pub const ZIP64_LOCATOR_SIZE: u64 = 20;

/// Where the archive's trailing structures live.
///
/// `central_dir_offset + central_dir_size == eocd_offset` always holds for a
/// value produced by [`ZipParser::read_tail`](super::ZipParser::read_tail).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZipTail {
    pub eocd_offset: u64,
    pub central_dir_offset: u64,
    pub central_dir_size: u64,
    pub comment_length: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eocd_fields() {
        let mut raw = Vec::new();
        raw.extend_from_slice(b"PK\x05\x06");
        raw.extend_from_slice(&[0, 0, 0, 0, 2, 0, 2, 0]);
        raw.extend_from_slice(&0x5au32.to_le_bytes());
        raw.extend_from_slice(&0x1234u32.to_le_bytes());
        raw.extend_from_slice(&7u16.to_le_bytes());

        let eocd = EndOfCentralDirectory::from_bytes(&raw).unwrap();
        assert_eq!(eocd.total_entries, 2);
        assert_eq!(eocd.cd_size, 0x5a);
        assert_eq!(eocd.cd_offset, 0x1234);
        assert_eq!(eocd.comment_len, 7);
    }

    #[test]
    fn test_eocd_rejects_wrong_signature() {
        let raw = [0u8; EndOfCentralDirectory::SIZE];
        assert!(matches!(
            EndOfCentralDirectory::from_bytes(&raw),
            Err(Error::NotFound)
        ));
    }
}
