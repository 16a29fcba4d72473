//! Main entry point for the apkchannel CLI application.
//!
//! Sources may be local files or HTTP URLs; remote APKs are read with Range
//! requests, so only the archive tail, the signing block and the data being
//! copied are transferred.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use apkchannel::channels::{OutputNaming, parse_entry_id, read_channels};
use apkchannel::cli::{Command, WriteArgs, is_http_url};
use apkchannel::{
    CHANNEL_ID, ChannelPatcher, Cli, HttpRangeReader, LocalFileReader, ReadAt, V2_SIGNATURE_ID,
};

/// Entry id of the APK Signature Scheme v3 block.
const V3_SIGNATURE_ID: u32 = 0xf05368c0;
/// Entry id of the padding apksigner adds to align the block.
const VERITY_PADDING_ID: u32 = 0x42726577;

/// Exit code for a source that isn't v2-signed.
const EXIT_NOT_V2: u8 = 2;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli);

    let source = match &cli.command {
        Command::Check { apk, .. } | Command::Show { apk, .. } => apk,
        Command::Write(args) => &args.source_apk,
    };

    if is_http_url(source) {
        let reader = HttpRangeReader::new(source.clone())
            .with_context(|| format!("cannot open {source}"))?;
        let code = run(&reader, &cli)?;
        log::info!(
            "Total bytes transferred: {}",
            format_size(reader.transferred_bytes())
        );
        Ok(code)
    } else {
        let reader = LocalFileReader::new(Path::new(source))
            .with_context(|| format!("cannot open {source}"))?;
        run(reader, &cli)
    }
}

/// Set up `env_logger`; `RUST_LOG` wins over `-q`.
fn init_logging(cli: &Cli) {
    let default_level = if cli.is_very_quiet() {
        "error"
    } else if cli.is_quiet() {
        "warn"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_target(false)
        .init();
}

/// Dispatch the parsed command against an opened source.
fn run<R: ReadAt>(reader: R, cli: &Cli) -> Result<ExitCode> {
    let patcher = ChannelPatcher::new(reader);

    match &cli.command {
        Command::Check { apk, verbose } => Ok(check(&patcher, apk, *verbose)),
        Command::Show { apk, id } => {
            let id = match id {
                Some(id) => parse_entry_id(id)?,
                None => CHANNEL_ID,
            };
            match patcher.entry_value(id) {
                Some(value) => {
                    println!("{}", String::from_utf8_lossy(&value));
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    log::error!("{apk} has no entry {id:#010x}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Command::Write(args) => write_channels(&patcher, args),
    }
}

/// Print whether the source is v2-signed and, in verbose mode, its entries.
fn check<R: ReadAt>(patcher: &ChannelPatcher<R>, apk: &str, verbose: bool) -> ExitCode {
    if !patcher.has_v2_signature() {
        match patcher.rejection() {
            Some(reason) => println!("{apk}: not signed with APK Signature Scheme v2 ({reason})"),
            None => println!("{apk}: not signed with APK Signature Scheme v2"),
        }
        return ExitCode::from(EXIT_NOT_V2);
    }

    println!("{apk}: signed with APK Signature Scheme v2");
    if verbose {
        println!("{:>10}  {:>10}  Entry", "Id", "Size");
        println!("{}", "-".repeat(48));
        for (id, len) in patcher.entries() {
            println!("{:#010x}  {:>10}  {}", id, len, describe_id(id));
        }
        if let Some(channel) = patcher.channel() {
            println!("{}", "-".repeat(48));
            println!("channel: {channel}");
        }
    }
    ExitCode::SUCCESS
}

/// Write one tagged copy per channel, then re-open each copy to confirm
/// the entry landed. Every channel is attempted even if one fails.
fn write_channels<R: ReadAt>(patcher: &ChannelPatcher<R>, args: &WriteArgs) -> Result<ExitCode> {
    let naming = OutputNaming::new(&args.format)?;

    let mut channels = match &args.channels {
        Some(path) => read_channels(path)?,
        None => Vec::new(),
    };
    channels.extend(args.channel.iter().cloned());
    if channels.is_empty() {
        bail!("no channels given, use --channels or --channel");
    }

    let target_dir = match &args.target_dir {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    if !target_dir.is_dir() {
        bail!("target directory {} is invalid", target_dir.display());
    }

    let id = match &args.id {
        Some(id) => parse_entry_id(id)?,
        None => CHANNEL_ID,
    };

    if !patcher.has_v2_signature() {
        match patcher.rejection() {
            Some(reason) => log::error!(
                "{} is not an APK signed by scheme v2: {reason}",
                args.source_apk
            ),
            None => log::error!("{} is not an APK signed by scheme v2", args.source_apk),
        }
        return Ok(ExitCode::from(EXIT_NOT_V2));
    }

    let mut failures = 0usize;
    for channel in &channels {
        let target = target_dir.join(naming.file_name(channel));
        match write_and_verify(patcher, &target, id, channel) {
            Ok(()) => log::info!("generate {channel} apk success: {}", target.display()),
            Err(e) => {
                failures += 1;
                log::error!("generate {channel} apk fail: {e:#}");
            }
        }
    }

    if failures > 0 {
        log::error!("{failures} of {} channels failed", channels.len());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn write_and_verify<R: ReadAt>(
    patcher: &ChannelPatcher<R>,
    target: &Path,
    id: u32,
    channel: &str,
) -> Result<()> {
    patcher.write_tagged_copy(target, id, channel.as_bytes())?;

    let written = ChannelPatcher::open(target)
        .with_context(|| format!("cannot re-open {}", target.display()))?;
    if !written.has_entry(id) {
        bail!("entry {id:#010x} missing from {}", target.display());
    }
    Ok(())
}

/// Human-readable name of well known signing block entries.
fn describe_id(id: u32) -> &'static str {
    match id {
        V2_SIGNATURE_ID => "APK Signature Scheme v2",
        V3_SIGNATURE_ID => "APK Signature Scheme v3",
        VERITY_PADDING_ID => "padding",
        CHANNEL_ID => "channel",
        _ => "",
    }
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
