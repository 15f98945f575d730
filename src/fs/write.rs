//! Writers used inside a backup transaction.
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::Path;

use rustix::fs::{fchmod, Mode};

use crate::types::errors::{Error, Result};

use super::atomic::{errno_to_io, fsync_parent_dir, symlink_in_dir};

/// Create `path` exclusively and let `fill` stream content into it.
///
/// The path is expected to be vacant (the snapshot moved any occupant aside),
/// so `O_EXCL` turns a concurrent writer into an error instead of a silent
/// overwrite. Links at the final component are not followed.
///
/// # Errors
///
/// Returns IO errors from create/flush/sync and any error produced by `fill`.
pub fn write_file_with<F>(path: &Path, durable: bool, fill: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .custom_flags(libc::O_NOFOLLOW | libc::O_CLOEXEC)
        .open(path)
        .map_err(|e| Error::io(format!("could not create {}", path.display()), &e))?;
    let mut w = BufWriter::new(file);
    fill(&mut w)?;
    let file = w
        .into_inner()
        .map_err(|e| Error::io(format!("could not write {}", path.display()), e.error()))?;
    if durable {
        file.sync_all()
            .map_err(|e| Error::io(format!("could not sync {}", path.display()), &e))?;
        let _ = fsync_parent_dir(path);
    }
    Ok(())
}

/// Create a symbolic link at `path` pointing to `dest`.
///
/// # Errors
///
/// Returns an IO error if the link cannot be created.
pub fn write_symlink(path: &Path, dest: &str, durable: bool) -> Result<()> {
    symlink_in_dir(Path::new(dest), path, durable).map_err(|e| {
        Error::io(
            format!("could not link {} to {dest}", path.display()),
            &e,
        )
    })
}

/// Apply permission bits to a regular file without following links.
///
/// # Errors
///
/// Returns an IO error if the file cannot be opened or `fchmod` fails.
pub fn set_mode(path: &Path, perms: u32) -> Result<()> {
    let file = OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NOFOLLOW | libc::O_CLOEXEC)
        .open(path)
        .map_err(|e| Error::io(format!("could not open {} for chmod", path.display()), &e))?;
    fchmod(&file, Mode::from_bits_truncate(perms))
        .map_err(|e| Error::io(format!("could not set mode {perms:o} on {}", path.display()), &errno_to_io(e)))
}
