//! ID-value entries of the APK Signing Block.
//!
//! Each entry is stored as
//!
//! ```text
//! length   u64   (id + value, so value length is length - 4)
//! id       u32
//! value    length - 4 bytes
//! ```
//!
//! back to back with no padding, between the header size field and the
//! footer. Ids are little-endian on disk and compared as `u32`, so the
//! v2 signature id `0x7109871a` appears in the file as `1a 87 09 71`.

use std::iter::FusedIterator;

use byteorder::{ByteOrder, LittleEndian};

use super::block::{SIZE_FIELD_LEN, SigningBlock, push_entry};
use crate::{Error, Result};

const ID_LEN: usize = 4;

/// One ID-value pair borrowed from a [`SigningBlock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Entry<'a> {
    pub id: u32,
    /// Offset of the value from the first byte of the block.
    pub value_offset: usize,
    pub value: &'a [u8],
}

/// Iterator over the entries of a block, in stored order.
///
/// Yields an error and then stops if an entry's declared length does not
/// fit the remaining pair region.
pub struct Entries<'a> {
    block: &'a [u8],
    pos: usize,
    end: usize,
    index: usize,
    failed: bool,
}

impl<'a> Entries<'a> {
    fn corrupt(&mut self, msg: String) -> Option<Result<Entry<'a>>> {
        self.failed = true;
        Some(Err(Error::CorruptBlock(msg)))
    }
}

impl<'a> Iterator for Entries<'a> {
    type Item = Result<Entry<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.end {
            return None;
        }
        self.index += 1;

        let remaining = self.end - self.pos;
        if remaining < SIZE_FIELD_LEN {
            return self.corrupt(format!(
                "insufficient data to read size of entry #{}",
                self.index
            ));
        }

        let declared = LittleEndian::read_u64(&self.block[self.pos..self.pos + SIZE_FIELD_LEN]);
        let available = (remaining - SIZE_FIELD_LEN) as u64;
        if declared < ID_LEN as u64 || declared > available {
            return self.corrupt(format!(
                "entry #{} size out of range: {}, available: {}",
                self.index, declared, available
            ));
        }

        let id_start = self.pos + SIZE_FIELD_LEN;
        let value_offset = id_start + ID_LEN;
        let next = id_start + declared as usize;
        let entry = Entry {
            id: LittleEndian::read_u32(&self.block[id_start..value_offset]),
            value_offset,
            value: &self.block[value_offset..next],
        };
        self.pos = next;
        Some(Ok(entry))
    }
}

impl FusedIterator for Entries<'_> {}

impl SigningBlock {
    /// Iterate the entries. Every call starts again from the first entry.
    pub fn entries(&self) -> Entries<'_> {
        Entries {
            block: self.as_bytes(),
            pos: SIZE_FIELD_LEN,
            end: self.pairs_end(),
            index: 0,
            failed: false,
        }
    }

    /// Value of the first entry with `id`.
    ///
    /// A corrupt entry ends the search: nothing after it can be trusted.
    pub fn find(&self, id: u32) -> Option<&[u8]> {
        self.entries()
            .map_while(|entry| entry.ok())
            .find(|entry| entry.id == id)
            .map(|entry| entry.value)
    }

    /// Whether any entry carries `id`.
    pub fn has_id(&self, id: u32) -> bool {
        self.find(id).is_some()
    }

    /// Build a new block with every existing entry followed by `(id, value)`.
    ///
    /// Existing entries are copied byte for byte in their original order
    /// and the magic is carried over. Returns the new block and how many
    /// bytes it grew by, which is always `12 + value.len()`.
    pub fn append(&self, id: u32, value: &[u8]) -> Result<(SigningBlock, u64)> {
        let mut bytes = Vec::with_capacity(self.len() + SIZE_FIELD_LEN + ID_LEN + value.len());
        bytes.resize(SIZE_FIELD_LEN, 0);

        for entry in self.entries() {
            let entry = entry?;
            push_entry(&mut bytes, entry.id, entry.value);
        }
        push_entry(&mut bytes, id, value);

        let patched = SigningBlock::seal(bytes, self.magic());
        let delta = (patched.len() - self.len()) as u64;
        Ok((patched, delta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::{CHANNEL_ID, V2_SIGNATURE_ID};

    fn block_with_raw_pairs(pairs: &[u8]) -> SigningBlock {
        let mut bytes = vec![0u8; SIZE_FIELD_LEN];
        bytes.extend_from_slice(pairs);
        SigningBlock::seal(bytes, crate::signing::APK_SIG_BLOCK_MAGIC)
    }

    #[test]
    fn test_entries_in_stored_order() {
        let block = SigningBlock::build([
            (V2_SIGNATURE_ID, &b"v2 signature"[..]),
            (0x42726577, &b""[..]),
            (0xf05368c0, &b"v3"[..]),
        ]);

        let entries: Vec<_> = block.entries().collect::<Result<_>>().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, V2_SIGNATURE_ID);
        assert_eq!(entries[0].value, b"v2 signature");
        assert_eq!(entries[0].value_offset, 8 + 8 + 4);
        assert_eq!(entries[1].id, 0x42726577);
        assert!(entries[1].value.is_empty());
        assert_eq!(entries[2].value, b"v3");

        // Restartable
        assert_eq!(block.entries().count(), 3);
    }

    #[test]
    fn test_ids_are_little_endian_on_disk() {
        let block = SigningBlock::build([(V2_SIGNATURE_ID, &b"x"[..])]);
        assert_eq!(&block.as_bytes()[16..20], &[0x1a, 0x87, 0x09, 0x71]);
    }

    #[test]
    fn test_empty_block_has_no_entries() {
        let block = SigningBlock::build(std::iter::empty());
        assert_eq!(block.entries().count(), 0);
        assert!(!block.has_id(V2_SIGNATURE_ID));
    }

    #[test]
    fn test_overlong_entry_is_corrupt() {
        let mut pairs = Vec::new();
        pairs.extend_from_slice(&100u64.to_le_bytes());
        pairs.extend_from_slice(&V2_SIGNATURE_ID.to_le_bytes());
        pairs.extend_from_slice(b"short");
        let block = block_with_raw_pairs(&pairs);

        let mut entries = block.entries();
        assert!(matches!(entries.next(), Some(Err(Error::CorruptBlock(_)))));
        assert!(entries.next().is_none());
        assert!(!block.has_id(V2_SIGNATURE_ID));
        assert!(matches!(
            block.append(CHANNEL_ID, b"x"),
            Err(Error::CorruptBlock(_))
        ));
    }

    #[test]
    fn test_truncated_length_field_is_corrupt() {
        let mut pairs = Vec::new();
        pairs.extend_from_slice(&5u64.to_le_bytes());
        pairs.extend_from_slice(&1u32.to_le_bytes());
        pairs.push(b'a');
        pairs.extend_from_slice(&[0u8; 3]);
        let block = block_with_raw_pairs(&pairs);

        let results: Vec<_> = block.entries().collect();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].as_ref().unwrap().value, b"a");
        assert!(matches!(results[1], Err(Error::CorruptBlock(_))));
        // The good entry before the damage is still found
        assert!(block.has_id(1));
    }

    #[test]
    fn test_length_below_id_size_is_corrupt() {
        let mut pairs = Vec::new();
        pairs.extend_from_slice(&2u64.to_le_bytes());
        pairs.extend_from_slice(&[0u8; 4]);
        let block = block_with_raw_pairs(&pairs);
        assert!(matches!(
            block.entries().next(),
            Some(Err(Error::CorruptBlock(_)))
        ));
    }

    #[test]
    fn test_append_keeps_existing_entries() {
        let original = SigningBlock::build([
            (V2_SIGNATURE_ID, &[1u8, 2, 3, 4, 5][..]),
            (0x42726577, &[0u8; 7][..]),
        ]);

        let (patched, delta) = original.append(CHANNEL_ID, b"official").unwrap();
        assert_eq!(delta, 12 + 8);
        assert_eq!(patched.len() - original.len(), 12 + 8);
        assert_eq!(patched.size_of_block(), patched.len() as u64 - 8);
        assert_eq!(patched.magic(), original.magic());

        let before: Vec<_> = original.entries().map(|e| e.unwrap()).collect();
        let after: Vec<_> = patched.entries().map(|e| e.unwrap()).collect();
        assert_eq!(after.len(), before.len() + 1);
        for (old, new) in before.iter().zip(&after) {
            assert_eq!((old.id, old.value), (new.id, new.value));
        }
        assert_eq!(after[2].id, CHANNEL_ID);
        assert_eq!(after[2].value, b"official");

        // Unchanged prefix: pre-existing pairs are byte-identical
        let pairs_len = original.len() - 32;
        assert_eq!(
            &patched.as_bytes()[8..8 + pairs_len],
            &original.as_bytes()[8..8 + pairs_len]
        );
        assert!(SigningBlock::from_bytes(patched.into_bytes()).is_ok());
    }

    #[test]
    fn test_append_does_not_dedup() {
        let original = SigningBlock::build([(CHANNEL_ID, &b"old"[..])]);
        let (patched, _) = original.append(CHANNEL_ID, b"new").unwrap();
        let values: Vec<_> = patched.entries().map(|e| e.unwrap().value).collect();
        assert_eq!(values, vec![&b"old"[..], &b"new"[..]]);
        // First match wins
        assert_eq!(patched.find(CHANNEL_ID), Some(&b"old"[..]));
    }
}
