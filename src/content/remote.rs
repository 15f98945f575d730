use std::io::{BufReader, Read, Seek, SeekFrom, Write};

use flate2::read::GzDecoder;

use crate::adapters::transport::Transport;
use crate::logging::redact_url;
use crate::types::auth::Credentials;
use crate::types::errors::{Error, Result};

/// Request headers sent with every retrieval.
pub const FETCH_HEADERS: &[(&str, &str)] = &[("Accept-Encoding", "gzip")];

/// Retrieve `url` into `dest`, un-gzipping when the response says so.
///
/// Returns whether the payload was gzip-encoded.
///
/// # Errors
///
/// Transport errors from the collaborator, IO errors while copying, and
/// decompression failures.
pub fn write_remote(
    dest: &mut dyn Write,
    url: &str,
    transport: &dyn Transport,
    credentials: Option<&Credentials>,
) -> Result<bool> {
    log::debug!("retrieving contents from {}", redact_url(url));
    let mut resp = transport.fetch(url, FETCH_HEADERS, credentials)?;
    if resp.is_gzip() {
        write_gzip(&mut resp.body, dest, url)?;
        Ok(true)
    } else {
        std::io::copy(&mut resp.body, dest)
            .map_err(|e| Error::io(format!("could not copy {}", redact_url(url)), &e))?;
        Ok(false)
    }
}

/// Stage the compressed stream in an anonymous temp file, then decompress
/// from that seekable copy. Both handles drop on every path out of here.
fn write_gzip(body: &mut dyn Read, dest: &mut dyn Write, url: &str) -> Result<()> {
    let mut staged = tempfile::tempfile()
        .map_err(|e| Error::io("could not create staging file", &e))?;
    std::io::copy(body, &mut staged)
        .map_err(|e| Error::io(format!("could not download {}", redact_url(url)), &e))?;
    staged
        .seek(SeekFrom::Start(0))
        .map_err(|e| Error::io("could not rewind staging file", &e))?;
    let mut gz = GzDecoder::new(BufReader::new(staged));
    std::io::copy(&mut gz, dest)
        .map_err(|e| Error::io(format!("could not decompress {}", redact_url(url)), &e))?;
    Ok(())
}
