//! APK Signing Block access.
//!
//! APK Signature Scheme v2 stores its signature in a block placed between
//! the last local file entry and the ZIP Central Directory. The block holds
//! a list of ID-value entries, and entries other than the signature survive
//! verification untouched, which is what makes it a place to record a
//! distribution channel without re-signing.
//!
//! - [`block`]: block framing and locating it in front of the Central Directory
//! - [`entry`]: iterating and appending ID-value entries
//! - [`patcher`]: [`ChannelPatcher`], which ties the above to a source archive

pub mod block;
pub mod entry;
pub mod patcher;

pub use block::{SigningBlock, extract_signing_block};
pub use entry::{Entries, Entry};
pub use patcher::{ChannelPatcher, PatcherStatus};

/// Trailing magic of every APK Signing Block.
pub const APK_SIG_BLOCK_MAGIC: &[u8; 16] = b"APK Sig Block 42";

/// Smallest possible block: two size fields and the magic.
pub const APK_SIG_BLOCK_MIN_SIZE: usize = 32;

/// Entry id of the APK Signature Scheme v2 block.
pub const V2_SIGNATURE_ID: u32 = 0x7109871a;

/// Entry id used for the channel name.
pub const CHANNEL_ID: u32 = 0x71098719;

/// Turn a short text key into an entry id.
///
/// The first up to four UTF-8 bytes of `key` fill the id from the most
/// significant byte down; missing bytes are zero. `"chnl"` becomes
/// `0x63686e6c`.
pub fn id_from_key(key: &str) -> u32 {
    key.bytes()
        .take(4)
        .enumerate()
        .fold(0u32, |id, (i, b)| id | ((b as u32) << ((3 - i) * 8)))
}
