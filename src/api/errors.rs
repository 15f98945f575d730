use thiserror::Error;

use crate::types::errors::{Error as CoreError, ErrorKind};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("filesystem error: {0}")]
    Filesystem(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("identity error: {0}")]
    Identity(String),
    #[error("locking error: {0}")]
    Locking(String),
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e.kind {
            ErrorKind::Config | ErrorKind::InvalidPath => ApiError::Config(e.msg),
            ErrorKind::Io => ApiError::Filesystem(e.msg),
            ErrorKind::Transport => ApiError::Transport(e.msg),
            ErrorKind::Identity => ApiError::Identity(e.msg),
            ErrorKind::Locking => ApiError::Locking(e.msg),
        }
    }
}

// Stable identifiers carried in failure facts.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorId {
    E_CONFIG,
    E_IO,
    E_TRANSPORT,
    E_IDENTITY,
    E_LOCKING,
    E_EXDEV,
}

#[must_use]
pub const fn id_str(id: ErrorId) -> &'static str {
    match id {
        ErrorId::E_CONFIG => "E_CONFIG",
        ErrorId::E_IO => "E_IO",
        ErrorId::E_TRANSPORT => "E_TRANSPORT",
        ErrorId::E_IDENTITY => "E_IDENTITY",
        ErrorId::E_LOCKING => "E_LOCKING",
        ErrorId::E_EXDEV => "E_EXDEV",
    }
}

#[must_use]
pub const fn exit_code_for(id: ErrorId) -> i32 {
    match id {
        ErrorId::E_CONFIG => 10,
        ErrorId::E_IO => 20,
        ErrorId::E_TRANSPORT => 30,
        ErrorId::E_IDENTITY => 40,
        ErrorId::E_LOCKING => 50,
        ErrorId::E_EXDEV => 60,
    }
}

/// Classify a core error. A rename that crossed filesystems gets its own id.
#[must_use]
pub fn error_id_for(e: &CoreError) -> ErrorId {
    match e.kind {
        ErrorKind::Config | ErrorKind::InvalidPath => ErrorId::E_CONFIG,
        ErrorKind::Io if e.os_code == Some(libc::EXDEV) => ErrorId::E_EXDEV,
        ErrorKind::Io => ErrorId::E_IO,
        ErrorKind::Transport => ErrorId::E_TRANSPORT,
        ErrorKind::Identity => ErrorId::E_IDENTITY,
        ErrorKind::Locking => ErrorId::E_LOCKING,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exdev_is_told_apart_from_other_io() {
        let xdev = std::io::Error::from_raw_os_error(libc::EXDEV);
        let e = CoreError::io("rename", &xdev);
        assert_eq!(error_id_for(&e), ErrorId::E_EXDEV);
        let other = CoreError::io("rename", &std::io::Error::from_raw_os_error(libc::EACCES));
        assert_eq!(error_id_for(&other), ErrorId::E_IO);
        assert!(matches!(ApiError::from(e), ApiError::Filesystem(_)));
    }

    #[test]
    fn invalid_paths_are_configuration_errors() {
        let e = CoreError::new(ErrorKind::InvalidPath, "..");
        assert_eq!(id_str(error_id_for(&e)), "E_CONFIG");
        assert_eq!(exit_code_for(error_id_for(&e)), 10);
        assert!(matches!(ApiError::from(e), ApiError::Config(_)));
    }
}
