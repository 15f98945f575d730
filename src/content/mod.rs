//! Content resolution: turn a non-link entry into the bytes written to disk.

pub mod inline;
pub mod remote;

use std::io::Write;

use crate::adapters::transport::Transport;
use crate::types::auth::AuthConfig;
use crate::types::entry::FileEntry;
use crate::types::errors::{Error, Result};

pub use inline::{decode_base64, write_inline};
pub use remote::{write_remote, FETCH_HEADERS};

/// Where the bytes of an entry came from; reported in facts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Origin {
    Inline,
    Remote { gzip: bool },
}

impl Origin {
    pub fn as_str(self) -> &'static str {
        match self {
            Origin::Inline => "inline",
            Origin::Remote { gzip: false } => "remote",
            Origin::Remote { gzip: true } => "remote+gzip",
        }
    }
}

/// Write the content of `entry` to `dest`.
///
/// Inline content wins over `source` unless it is empty-like, in which case the
/// source is fetched. Credentials are looked up in `auth` only when fetching.
///
/// # Errors
///
/// A configuration error when the entry has neither content nor source, or
/// names unknown credentials for a fetch, plus anything the inline writer or the
/// transport reports.
pub fn write_content(
    entry: &FileEntry,
    dest: &mut dyn Write,
    transport: &dyn Transport,
    auth: &AuthConfig,
) -> Result<Origin> {
    if let Some(content) = entry.content.as_ref().filter(|c| !c.is_empty_like()) {
        write_inline(dest, content, entry.encoding)?;
        return Ok(Origin::Inline);
    }
    match entry.source.as_deref() {
        Some(url) if !url.is_empty() => {
            let credentials = auth.resolve(entry.authentication.as_deref())?;
            let gzip = write_remote(dest, url, transport, credentials)?;
            Ok(Origin::Remote { gzip })
        }
        _ => Err(Error::config("file specified without source or content")),
    }
}
