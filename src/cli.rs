use clap::{Args, Parser, Subcommand};

use crate::channels::DEFAULT_NAME_FORMAT;

#[derive(Parser, Debug)]
#[command(name = "apkchannel")]
#[command(version)]
#[command(about = "Write channel entries into the APK Signing Block of v2-signed APKs", long_about = None)]
#[command(after_help = "Examples:\n  \
  apkchannel check app-release.apk                       is the APK v2-signed?\n  \
  apkchannel write --source-apk app-release.apk --channels channels.txt --target-dir out\n  \
  apkchannel show https://example.com/app-google.apk     read the channel of a remote APK")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', global = true, action = clap::ArgAction::Count)]
    pub quiet: u8,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report whether an APK carries an APK Signature Scheme v2 signature
    Check {
        /// APK path or HTTP URL
        #[arg(value_name = "APK")]
        apk: String,

        /// List every entry of the signing block
        #[arg(short = 'v')]
        verbose: bool,
    },

    /// Print the channel (or another entry) stored in an APK
    Show {
        /// APK path or HTTP URL
        #[arg(value_name = "APK")]
        apk: String,

        /// Entry id: 0x-prefixed hex, decimal, or a 1-4 character key
        #[arg(long, value_name = "ID")]
        id: Option<String>,
    },

    /// Write one tagged copy of an APK per channel
    Write(WriteArgs),
}

#[derive(Args, Debug)]
pub struct WriteArgs {
    /// APK path or HTTP URL to copy from
    #[arg(long = "source-apk", value_name = "APK")]
    pub source_apk: String,

    /// Channel list file, one channel per line, `#` starts a comment
    #[arg(long, value_name = "FILE")]
    pub channels: Option<String>,

    /// Extra channel names, in addition to the channel list
    #[arg(long = "channel", value_name = "NAME")]
    pub channel: Vec<String>,

    /// Output directory (default: current directory)
    #[arg(long = "target-dir", value_name = "DIR")]
    pub target_dir: Option<String>,

    /// Output file name, %s is replaced with the channel name
    #[arg(long, value_name = "FORMAT", default_value = DEFAULT_NAME_FORMAT)]
    pub format: String,

    /// Entry id to write the channel under (default: the channel id)
    #[arg(long, value_name = "ID")]
    pub id: Option<String>,
}

impl Cli {
    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    pub fn is_very_quiet(&self) -> bool {
        self.quiet > 1
    }
}

/// Whether `source` should be read over HTTP rather than from disk.
pub fn is_http_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_write_command() {
        let cli = Cli::parse_from([
            "apkchannel",
            "write",
            "--source-apk",
            "app.apk",
            "--channels",
            "channels.txt",
            "--channel",
            "google",
            "--channel",
            "huawei",
            "-q",
        ]);
        assert!(cli.is_quiet());
        let Command::Write(args) = cli.command else {
            panic!("expected write command");
        };
        assert_eq!(args.source_apk, "app.apk");
        assert_eq!(args.channels.as_deref(), Some("channels.txt"));
        assert_eq!(args.channel, vec!["google", "huawei"]);
        assert_eq!(args.format, DEFAULT_NAME_FORMAT);
        assert!(args.target_dir.is_none());
    }

    #[test]
    fn test_is_http_url() {
        assert!(is_http_url("https://example.com/app.apk"));
        assert!(!is_http_url("app.apk"));
    }
}
