//! Tagged copies of a signed archive.
//!
//! [`ChannelPatcher`] runs the tail parser and the block locator once per
//! source and caches the block. A copy is the source prefix, the extended
//! block, then the Central Directory and EOCD with the Central Directory
//! offset moved by however much the block grew.

use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;
use tempfile::NamedTempFile;

use super::block::{SigningBlock, extract_signing_block};
use super::{CHANNEL_ID, V2_SIGNATURE_ID};
use crate::io::{LocalFileReader, ReadAt, copy_range};
use crate::zip::{EndOfCentralDirectory, ZipParser, ZipTail};
use crate::{Error, Result};

/// Outcome of looking for the APK Signing Block when a patcher is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatcherStatus {
    /// The block was found and all of its entries parse.
    Ready,
    /// No usable block: not a ZIP, ZIP64, non-contiguous layout, or no
    /// block in front of the Central Directory.
    NoSigningBlock,
    /// A block was found but its entries run past its end.
    CorruptBlock,
}

enum State {
    Ready {
        tail: ZipTail,
        block: SigningBlock,
        block_offset: u64,
    },
    Rejected {
        status: PatcherStatus,
        reason: Error,
    },
}

/// Reads the APK Signing Block of one archive and writes copies of that
/// archive with an extra entry in the block.
///
/// The block is located once, when the patcher is created. Failing to find
/// it is not an error at that point: queries then answer `false`/`None`,
/// and only the write operations report why the archive can't be patched.
///
/// ## Example
///
/// ```no_run
/// use apkchannel::{ChannelPatcher, CHANNEL_ID};
///
/// let patcher = ChannelPatcher::open("app-release.apk")?;
/// if patcher.has_v2_signature() {
///     patcher.write_tagged_copy("app-official.apk", CHANNEL_ID, b"official")?;
/// }
/// # Ok::<(), apkchannel::Error>(())
/// ```
pub struct ChannelPatcher<R: ReadAt> {
    reader: R,
    state: State,
}

impl ChannelPatcher<LocalFileReader> {
    /// Open a local archive.
    ///
    /// Only failing to open the file is an error; see [`ChannelPatcher::new`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(LocalFileReader::new(path.as_ref())?))
    }
}

impl<R: ReadAt> ChannelPatcher<R> {
    /// Locate the archive tail and the signing block in `reader`.
    pub fn new(reader: R) -> Self {
        let state = match locate(&reader) {
            Ok((tail, block, block_offset)) => {
                match block.entries().find_map(|entry| entry.err()) {
                    Some(reason) => {
                        log::debug!("signing block rejected: {reason}");
                        State::Rejected {
                            status: PatcherStatus::CorruptBlock,
                            reason,
                        }
                    }
                    None => State::Ready {
                        tail,
                        block,
                        block_offset,
                    },
                }
            }
            Err(reason) => {
                log::debug!("no usable signing block: {reason}");
                State::Rejected {
                    status: PatcherStatus::NoSigningBlock,
                    reason,
                }
            }
        };

        Self { reader, state }
    }

    pub fn status(&self) -> PatcherStatus {
        match &self.state {
            State::Ready { .. } => PatcherStatus::Ready,
            State::Rejected { status, .. } => *status,
        }
    }

    /// Why the archive can't be patched, if it can't.
    pub fn rejection(&self) -> Option<&Error> {
        match &self.state {
            State::Ready { .. } => None,
            State::Rejected { reason, .. } => Some(reason),
        }
    }

    /// The archive tail, when the signing block was found.
    pub fn tail(&self) -> Option<&ZipTail> {
        match &self.state {
            State::Ready { tail, .. } => Some(tail),
            State::Rejected { .. } => None,
        }
    }

    /// The cached signing block, when it was found.
    pub fn signing_block(&self) -> Option<&SigningBlock> {
        match &self.state {
            State::Ready { block, .. } => Some(block),
            State::Rejected { .. } => None,
        }
    }

    pub fn has_entry(&self, id: u32) -> bool {
        self.signing_block().is_some_and(|block| block.has_id(id))
    }

    pub fn has_v2_signature(&self) -> bool {
        self.has_entry(V2_SIGNATURE_ID)
    }

    /// Value of the first entry with `id`.
    pub fn entry_value(&self, id: u32) -> Option<Vec<u8>> {
        self.signing_block()
            .and_then(|block| block.find(id))
            .map(<[u8]>::to_vec)
    }

    /// The channel name stored under [`CHANNEL_ID`], decoded lossily as UTF-8.
    pub fn channel(&self) -> Option<String> {
        self.entry_value(CHANNEL_ID)
            .map(|value| String::from_utf8_lossy(&value).into_owned())
    }

    /// `(id, value length)` of every entry, in stored order.
    pub fn entries(&self) -> Vec<(u32, usize)> {
        self.signing_block()
            .map(|block| {
                block
                    .entries()
                    .map_while(|entry| entry.ok())
                    .map(|entry| (entry.id, entry.value.len()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Write a copy of the archive to `target` whose signing block carries an
    /// extra `(id, value)` entry, and return how many bytes the copy grew.
    ///
    /// The copy is assembled in a temporary file next to `target` and renamed
    /// over it once complete, so a failure never leaves a half written
    /// `target` behind. The source is only read.
    pub fn write_tagged_copy<P: AsRef<Path>>(&self, target: P, id: u32, value: &[u8]) -> Result<u64> {
        let (tail, block, block_offset) = match &self.state {
            State::Ready {
                tail,
                block,
                block_offset,
            } => (tail, block, *block_offset),
            State::Rejected { reason, .. } => return Err(reason.clone()),
        };

        let (patched, delta) = block.append(id, value)?;
        let new_cd_offset = tail.central_dir_offset + delta;
        let new_cd_offset =
            u32::try_from(new_cd_offset).map_err(|_| Error::OffsetOverflow(new_cd_offset))?;

        let target = target.as_ref();
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;

        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            // Everything up to the old block
            copy_range(&self.reader, 0, block_offset, &mut writer)?;
            writer.write_all(patched.as_bytes())?;
            // Central Directory, EOCD and comment
            copy_range(
                &self.reader,
                tail.central_dir_offset,
                self.reader.size() - tail.central_dir_offset,
                &mut writer,
            )?;

            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.seek(SeekFrom::Start(
                tail.eocd_offset + delta + EndOfCentralDirectory::CD_OFFSET_FIELD_OFFSET,
            ))?;
            file.write_u32::<LittleEndian>(new_cd_offset)?;
            file.sync_all()?;
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(std::fs::Permissions::from_mode(0o644))?;
        }

        tmp.persist(target).map_err(|e| e.error)?;
        log::debug!(
            "wrote {} with entry {:#010x} ({} bytes added)",
            target.display(),
            id,
            delta
        );

        Ok(delta)
    }

    /// [`write_tagged_copy`](Self::write_tagged_copy) with `channel` under
    /// [`CHANNEL_ID`], for archives that must already be v2-signed.
    pub fn write_channel_copy<P: AsRef<Path>>(&self, target: P, channel: &str) -> Result<u64> {
        if let Some(reason) = self.rejection() {
            return Err(reason.clone());
        }
        if !self.has_v2_signature() {
            return Err(Error::MissingSignatureEntry);
        }
        self.write_tagged_copy(target, CHANNEL_ID, channel.as_bytes())
    }

    /// Get a reference to the underlying reader.
    pub fn reader(&self) -> &R {
        &self.reader
    }
}

fn locate<R: ReadAt>(reader: &R) -> Result<(ZipTail, SigningBlock, u64)> {
    let tail = ZipParser::new(reader).read_tail()?;
    let (block, block_offset) = extract_signing_block(reader, tail.central_dir_offset)?;
    Ok((tail, block, block_offset))
}
