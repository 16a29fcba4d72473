//! # apkchannel
//!
//! Write channel entries into the APK Signing Block of v2-signed APKs.
//!
//! APK Signature Scheme v2 keeps its signature in a block between the
//! archive's file data and its Central Directory. Entries in that block
//! other than the signature itself are not covered by it, so an extra
//! ID-value entry naming a distribution channel can be added to a signed
//! APK without re-signing. This crate finds the block, checks it carries a
//! v2 signature, and writes copies of the APK with one extra entry,
//! correcting the Central Directory offset for the larger block.
//!
//! ## Features
//!
//! - Reads local files or remote ones through HTTP Range requests
//! - Copies are written to a temporary file and renamed into place
//! - ZIP64 and non-contiguous archives are refused rather than guessed at
//!
//! ## Example
//!
//! ```no_run
//! use apkchannel::ChannelPatcher;
//!
//! fn main() -> anyhow::Result<()> {
//!     let patcher = ChannelPatcher::open("app-release.apk")?;
//!     for channel in ["google", "huawei"] {
//!         patcher.write_channel_copy(format!("app-{channel}.apk"), channel)?;
//!     }
//!
//!     let tagged = ChannelPatcher::open("app-google.apk")?;
//!     assert_eq!(tagged.channel().as_deref(), Some("google"));
//!     Ok(())
//! }
//! ```

pub mod channels;
pub mod cli;
pub mod error;
pub mod io;
pub mod signing;
pub mod zip;

#[cfg(test)]
mod test_support;

pub use cli::Cli;
pub use error::{Error, Result};
pub use io::{HttpRangeReader, LocalFileReader, ReadAt};
pub use signing::{
    CHANNEL_ID, ChannelPatcher, PatcherStatus, SigningBlock, V2_SIGNATURE_ID, id_from_key,
};
