//! Error types used across materialize.
use std::path::Path;

use thiserror::Error;

/// High-level error categories for the fs, content and adapter layers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("configuration error")]
    Config,
    #[error("invalid path")]
    InvalidPath,
    #[error("io error")]
    Io,
    #[error("transport error")]
    Transport,
    #[error("identity error")]
    Identity,
    #[error("locking error")]
    Locking,
}

/// Structured error with a kind and human message.
#[derive(Debug, Error)]
#[error("{kind}: {msg}")]
pub struct Error {
    pub kind: ErrorKind,
    pub msg: String,
    /// Raw OS error code when the failure came from a syscall.
    pub os_code: Option<i32>,
}

impl Error {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            msg: msg.into(),
            os_code: None,
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config, msg)
    }

    /// Wrap an IO failure, keeping the OS error code for error-id mapping.
    pub fn io(context: impl Into<String>, e: &std::io::Error) -> Self {
        Self {
            kind: ErrorKind::Io,
            msg: format!("{}: {e}", context.into()),
            os_code: e.raw_os_error(),
        }
    }

    /// IO failure of a move between two paths.
    pub fn rename(src: &Path, dst: &Path, e: &std::io::Error) -> Self {
        Self::io(
            format!("could not rename {} to {}", src.display(), dst.display()),
            e,
        )
    }
}

/// Convenient alias for results returning a `types::Error`.
pub type Result<T> = std::result::Result<T, Error>;
