//! Shared crate-wide constants for materialize.
//!
//! Centralizes magic values and default labels used across modules.

/// Suffix of the first backup generation: `<path>.bak`.
pub const BACKUP_SUFFIX: &str = ".bak";

/// Suffix of the second backup generation: `<path>.bak2`.
pub const BACKUP2_SUFFIX: &str = ".bak2";

/// Block size used when comparing a backup against freshly written content.
pub const COMPARE_BUFFER: usize = 8 * 1024;

/// File-type mask of a mode word (`S_IFMT`).
pub const MODE_TYPE_MASK: u32 = 0o170_000;

/// File-type bits marking a symbolic link (`S_IFLNK`).
pub const MODE_SYMLINK: u32 = 0o120_000;

/// Permission bits of a mode word, including setuid/setgid/sticky (`S_IMODE`).
pub const MODE_PERM_MASK: u32 = 0o7777;

/// Subsystem label attached to every emitted fact.
pub const SUBSYSTEM: &str = "materialize";

/// Poll interval in milliseconds for the file-backed lock manager (see `adapters/lock/file.rs`).
pub const LOCK_POLL_MS: u64 = 25;

/// Default lock timeout used by `Policy::default()`.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5_000;

/// Default number of attempts for a remote fetch, including the first one.
pub const DEFAULT_FETCH_ATTEMPTS: u32 = 5;

/// Initial delay between fetch attempts; doubled after each failure.
pub const DEFAULT_FETCH_BACKOFF_MS: u64 = 250;

/// Upper bound on the delay between fetch attempts.
pub const DEFAULT_FETCH_MAX_BACKOFF_MS: u64 = 8_000;

/// Global timeout for a single fetch attempt.
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// User agent sent by the HTTP transport.
pub const DEFAULT_USER_AGENT: &str = concat!("materialize/", env!("CARGO_PKG_VERSION"));

/// Account databases read by the system identity provider.
pub const PASSWD_FILE: &str = "/etc/passwd";
pub const GROUP_FILE: &str = "/etc/group";
