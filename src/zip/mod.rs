//! ZIP archive tail parsing.
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. (APK only) the APK Signing Block
//! 3. Central Directory with metadata for all files
//! 4. End of Central Directory (EOCD) record at the end
//!
//! This module finds 3 and 4 from the end of the file and checks that they
//! are laid out back to back, which is what lets [`crate::signing`] find
//! the APK Signing Block without walking the Central Directory.
//!
//! ## Limitations
//!
//! - ZIP64 archives are rejected
//! - No multi-disk archive support

mod parser;
mod structures;

pub use parser::ZipParser;
pub use structures::*;
