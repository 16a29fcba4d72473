//! Random access to a remote file over HTTP Range requests.

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, HeaderMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use super::ReadAt;
use crate::{Error, Result};

/// HTTP Range reader for remote APK files
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    transferred_bytes: AtomicU64,
    max_retry: u32,
}

impl HttpRangeReader {
    /// Create a new HTTP Range reader
    ///
    /// This will send a HEAD request to verify Range support and get file size
    pub fn new(url: String) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;

        let resp = client.head(&url).send()?;

        if !resp.status().is_success() {
            return Err(Error::Remote(format!(
                "HEAD {} failed with status {}",
                url,
                resp.status()
            )));
        }

        let size = ranged_length(resp.headers(), &url)?;

        log::debug!("remote source {url}: {size} bytes");

        Ok(Self {
            client,
            url,
            size,
            transferred_bytes: AtomicU64::new(0),
            max_retry: 10,
        })
    }

    /// Get total bytes transferred from network
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred_bytes.load(Ordering::Relaxed)
    }
}

impl ReadAt for HttpRangeReader {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let Some(end) = last_byte(offset, buf.len(), self.size) else {
            return Ok(0);
        };
        let expected_size = (end - offset + 1) as usize;

        let mut received = 0;
        let mut retry_count = 0;

        while received < expected_size {
            let current_start = offset + received as u64;
            let range = format!("bytes={}-{}", current_start, end);

            match self.client.get(&self.url).header("Range", &range).send() {
                Ok(resp) => {
                    if resp.status() != StatusCode::PARTIAL_CONTENT {
                        return Err(Error::Remote(format!(
                            "range request {} on {} answered {}",
                            range,
                            self.url,
                            resp.status()
                        )));
                    }

                    let bytes = resp.bytes()?;
                    if bytes.is_empty() {
                        break;
                    }
                    let chunk_len = bytes.len().min(expected_size - received);
                    buf[received..received + chunk_len].copy_from_slice(&bytes[..chunk_len]);
                    received += chunk_len;

                    self.transferred_bytes
                        .fetch_add(chunk_len as u64, Ordering::Relaxed);
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        return Err(e.into());
                    }
                    log::warn!(
                        "connection error, retry {}/{}: {}",
                        retry_count,
                        self.max_retry,
                        e
                    );
                    thread::sleep(retry_delay(retry_count));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }
}

/// File size from a HEAD response, provided the server accepts byte ranges.
fn ranged_length(headers: &HeaderMap, url: &str) -> Result<u64> {
    let accept_ranges = headers
        .get(ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("none");

    if !accept_ranges.contains("bytes") {
        return Err(Error::Remote(format!(
            "{url} does not support Range requests"
        )));
    }

    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::Remote(format!("{url} did not return Content-Length")))
}

/// Inclusive end of a `len` byte read at `offset`, clamped to the file.
fn last_byte(offset: u64, len: usize, size: u64) -> Option<u64> {
    if len == 0 || offset >= size {
        return None;
    }
    Some(offset.saturating_add(len as u64 - 1).min(size - 1))
}

/// Linear back-off between retries.
fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(500 * attempt as u64)
}
