//! Channel list and output naming.
//!
//! A channel list is a UTF-8 text file with one channel name per line.
//! Lines are trimmed; blank lines and lines starting with `#` are ignored.

use std::fs;
use std::path::Path;

use crate::signing::id_from_key;
use crate::{Error, Result};

/// Default file name template for tagged copies.
pub const DEFAULT_NAME_FORMAT: &str = "app-%s.apk";

const PLACEHOLDER: &str = "%s";

/// Read channel names from a channel list file.
pub fn read_channels<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    Ok(parse_channels(&text))
}

pub fn parse_channels(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

/// File name template with a single `%s` standing for the channel name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputNaming {
    format: String,
}

impl OutputNaming {
    pub fn new(format: &str) -> Result<Self> {
        if !format.contains(PLACEHOLDER) {
            return Err(Error::Config(format!(
                "name format {format:?} must contain %s, e.g. [<pre>]%s[<next>]"
            )));
        }
        Ok(Self {
            format: format.to_string(),
        })
    }

    pub fn file_name(&self, channel: &str) -> String {
        self.format.replacen(PLACEHOLDER, channel, 1)
    }
}

impl Default for OutputNaming {
    fn default() -> Self {
        Self {
            format: DEFAULT_NAME_FORMAT.to_string(),
        }
    }
}

/// Parse an entry id given as `0x`-prefixed hex, decimal, or a short text
/// key (see [`id_from_key`]).
pub fn parse_entry_id(text: &str) -> Result<u32> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16)
            .map_err(|e| Error::Config(format!("invalid entry id {text:?}: {e}")));
    }
    if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
        return text
            .parse()
            .map_err(|e| Error::Config(format!("invalid entry id {text:?}: {e}")));
    }
    if text.is_empty() || text.len() > 4 {
        return Err(Error::Config(format!(
            "entry id {text:?} is neither a number nor a key of 1-4 bytes"
        )));
    }
    Ok(id_from_key(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::CHANNEL_ID;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_channels_skips_comments_and_blanks() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "# release channels").unwrap();
        writeln!(file, "official").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "  google  ").unwrap();
        writeln!(file, "#huawei").unwrap();

        let channels = read_channels(file.path()).unwrap();
        assert_eq!(channels, vec!["official", "google"]);
    }

    #[test]
    fn test_missing_channel_file() {
        assert!(matches!(
            read_channels("/nonexistent/channels.txt"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_output_naming() {
        assert_eq!(OutputNaming::default().file_name("google"), "app-google.apk");
        let naming = OutputNaming::new("demo_%s_v1.apk").unwrap();
        assert_eq!(naming.file_name("huawei"), "demo_huawei_v1.apk");
        assert!(OutputNaming::new("demo.apk").is_err());
    }

    #[test]
    fn test_parse_entry_id() {
        assert_eq!(parse_entry_id("0x71098719").unwrap(), CHANNEL_ID);
        assert_eq!(parse_entry_id("1896449817").unwrap(), CHANNEL_ID);
        assert_eq!(parse_entry_id("chnl").unwrap(), 0x63686e6c);
        assert!(parse_entry_id("0xzz").is_err());
        assert!(parse_entry_id("channel").is_err());
        assert!(parse_entry_id("").is_err());
    }
}
