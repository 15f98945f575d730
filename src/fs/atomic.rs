//! Directory-handle primitives used by the backup protocol.
//!
//! Every mutation of a target or its backup chain happens inside a single parent
//! directory, so operations open the parent once with `O_DIRECTORY` and act on
//! the final component with the `*at` syscalls. The parent path may cross
//! symlinks (`/var/run -> /run`); the final component is never followed.
use std::ffi::{CString, OsStr};
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use rustix::fd::OwnedFd;
use rustix::fs::{openat, renameat, symlinkat, unlinkat, AtFlags, Mode, OFlags, CWD};
use rustix::io::Errno;

pub(crate) fn errno_to_io(e: Errno) -> std::io::Error {
    std::io::Error::from_raw_os_error(e.raw_os_error())
}

fn cstring(s: &OsStr) -> std::io::Result<CString> {
    CString::new(s.as_bytes())
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid cstring"))
}

/// Parent directory of `path`, treating a bare file name as living in `.`.
#[must_use]
pub fn parent_of(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn file_name_c(path: &Path) -> std::io::Result<CString> {
    let name = path.file_name().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} has no file name", path.display()),
        )
    })?;
    cstring(name)
}

/// Open a directory handle for the `*at` operations below.
///
/// Symlinks along `dir` are followed; the `*at` calls themselves never follow
/// the final component.
///
/// # Errors
///
/// Returns an IO error if the directory cannot be opened.
pub fn open_dir(dir: &Path) -> std::io::Result<OwnedFd> {
    let c = cstring(dir.as_os_str())?;
    openat(
        CWD,
        c.as_c_str(),
        OFlags::RDONLY | OFlags::DIRECTORY | OFlags::CLOEXEC,
        Mode::empty(),
    )
    .map_err(errno_to_io)
}

/// Fsync the parent directory of `path` for durability.
///
/// # Errors
///
/// Returns an IO error if the parent directory cannot be opened or fsynced.
pub fn fsync_parent_dir(path: &Path) -> std::io::Result<()> {
    let dir = fs::File::open(parent_of(path))?;
    dir.sync_all()
}

/// Rename `src` to `dst`; both must share a parent directory.
///
/// An existing `dst` is replaced, as with `rename(2)`.
///
/// # Errors
///
/// Returns an IO error if the paths live in different directories or `renameat` fails.
pub fn rename_in_dir(src: &Path, dst: &Path, durable: bool) -> std::io::Result<()> {
    let parent = parent_of(src);
    if parent != parent_of(dst) {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "rename across directories",
        ));
    }
    let dirfd = open_dir(parent)?;
    let old_c = file_name_c(src)?;
    let new_c = file_name_c(dst)?;
    renameat(&dirfd, old_c.as_c_str(), &dirfd, new_c.as_c_str()).map_err(errno_to_io)?;
    if durable {
        let _ = rustix::fs::fsync(&dirfd);
    }
    Ok(())
}

/// Unlink `path` (never a directory); absence is not an error.
///
/// # Errors
///
/// Returns an IO error if the parent cannot be opened or `unlinkat` fails with
/// anything other than `ENOENT`.
pub fn ensure_absent(path: &Path) -> std::io::Result<()> {
    let dirfd = open_dir(parent_of(path))?;
    let name = file_name_c(path)?;
    match unlinkat(&dirfd, name.as_c_str(), AtFlags::empty()) {
        Ok(()) => Ok(()),
        Err(e) if e == Errno::NOENT => Ok(()),
        Err(e) => Err(errno_to_io(e)),
    }
}

/// Create a symlink at `link` whose literal content is `dest`.
///
/// # Errors
///
/// Returns an IO error if `symlinkat` fails (including when `link` exists).
pub fn symlink_in_dir(dest: &Path, link: &Path, durable: bool) -> std::io::Result<()> {
    let dirfd = open_dir(parent_of(link))?;
    let dest_c = cstring(dest.as_os_str())?;
    let name = file_name_c(link)?;
    symlinkat(dest_c.as_c_str(), &dirfd, name.as_c_str()).map_err(errno_to_io)?;
    if durable {
        let _ = rustix::fs::fsync(&dirfd);
    }
    Ok(())
}
