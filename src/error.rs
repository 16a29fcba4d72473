//! Error types for APK Signing Block operations.
//!
//! Locator failures collapse into a "not ready" state inside
//! [`ChannelPatcher`](crate::ChannelPatcher), so the same error value is
//! handed out again by every write attempt. That is why [`enum@Error`] is
//! `Clone` and keeps its I/O and HTTP sources behind an [`Arc`].

use std::io;
use std::sync::Arc;

use thiserror::Error;

/// Error type for locating and patching the APK Signing Block.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Reading the source or writing the target failed.
    #[error("IO error: {0}")]
    Io(Arc<io::Error>),

    /// A remote source could not be fetched.
    #[error("HTTP error: {0}")]
    Http(Arc<reqwest::Error>),

    /// A remote source answered, but not in a way a range reader can use.
    #[error("remote error: {0}")]
    Remote(String),

    /// No End of Central Directory record was found. The file is not a ZIP
    /// archive or it has been truncated.
    #[error("End of Central Directory record not found")]
    NotFound,

    /// A ZIP64 End of Central Directory locator sits in front of the EOCD.
    #[error("ZIP64 archives are not supported")]
    Zip64Unsupported,

    /// The Central Directory does not end exactly where the EOCD begins.
    #[error(
        "Central Directory ({central_dir_offset} + {central_dir_size}) is not immediately followed by the EOCD at {eocd_offset}"
    )]
    Layout {
        central_dir_offset: u64,
        central_dir_size: u64,
        eocd_offset: u64,
    },

    /// There is no well-formed APK Signing Block right before the Central
    /// Directory.
    #[error("APK Signing Block not found: {0}")]
    SignatureNotFound(String),

    /// An ID-value entry runs past the end of the pair region.
    #[error("corrupt APK Signing Block: {0}")]
    CorruptBlock(String),

    /// The block exists but carries no APK Signature Scheme v2 entry.
    #[error("APK Signing Block has no APK Signature Scheme v2 entry")]
    MissingSignatureEntry,

    /// The patched Central Directory offset does not fit the 32-bit EOCD field.
    #[error("Central Directory offset {0} does not fit in the EOCD record")]
    OffsetOverflow(u64),

    /// Invalid user supplied configuration (channel list, name format, entry id).
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::Io(Arc::new(value))
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Http(Arc::new(value))
    }
}

/// Result type where the error is always [`enum@Error`].
pub type Result<T> = std::result::Result<T, Error>;
