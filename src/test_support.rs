//! Hand-built archives for unit tests.

const FILE_NAME: &[u8] = b"classes.dex";
const FILE_DATA: &[u8] = b"dex\n035\0 fake bytecode";

/// Size of the single Central Directory header [`build_zip`] writes.
pub const CD_SIZE: u64 = 46 + FILE_NAME.len() as u64;

/// A one-file stored archive, with `signing_block` placed right before its
/// Central Directory when given. CRCs are left at zero.
pub fn build_zip(signing_block: Option<&[u8]>) -> Vec<u8> {
    let mut zip = Vec::new();

    zip.extend_from_slice(b"PK\x03\x04");
    zip.extend_from_slice(&[20, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    zip.extend_from_slice(&0u32.to_le_bytes());
    zip.extend_from_slice(&(FILE_DATA.len() as u32).to_le_bytes());
    zip.extend_from_slice(&(FILE_DATA.len() as u32).to_le_bytes());
    zip.extend_from_slice(&(FILE_NAME.len() as u16).to_le_bytes());
    zip.extend_from_slice(&0u16.to_le_bytes());
    zip.extend_from_slice(FILE_NAME);
    zip.extend_from_slice(FILE_DATA);

    if let Some(block) = signing_block {
        zip.extend_from_slice(block);
    }

    let cd_offset = zip.len() as u32;
    zip.extend_from_slice(b"PK\x01\x02");
    zip.extend_from_slice(&[20, 0, 20, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    zip.extend_from_slice(&0u32.to_le_bytes());
    zip.extend_from_slice(&(FILE_DATA.len() as u32).to_le_bytes());
    zip.extend_from_slice(&(FILE_DATA.len() as u32).to_le_bytes());
    zip.extend_from_slice(&(FILE_NAME.len() as u16).to_le_bytes());
    zip.extend_from_slice(&[0u8; 12]);
    zip.extend_from_slice(&0u32.to_le_bytes());
    zip.extend_from_slice(FILE_NAME);

    zip.extend_from_slice(b"PK\x05\x06");
    zip.extend_from_slice(&[0, 0, 0, 0, 1, 0, 1, 0]);
    zip.extend_from_slice(&(CD_SIZE as u32).to_le_bytes());
    zip.extend_from_slice(&cd_offset.to_le_bytes());
    zip.extend_from_slice(&0u16.to_le_bytes());

    zip
}

/// Give a comment-less archive a trailing comment.
pub fn set_comment(zip: &mut Vec<u8>, comment: &[u8]) {
    let field = zip.len() - 2;
    zip[field..].copy_from_slice(&(comment.len() as u16).to_le_bytes());
    zip.extend_from_slice(comment);
}
