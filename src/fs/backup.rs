//! Per-path backup transaction: snapshot, write, then commit or roll back.
//!
//! Layout of the backup chain next to a target `p`:
//! - `p.bak`: whatever occupied `p` before the current transaction;
//! - `p.bak2`: the previous `p.bak`, kept only while a transaction is open or
//!   when the transaction turned out to be a no-op.
//!
//! [`Snapshot`] is a guard: a snapshot that is neither committed nor rolled back
//! (a panic inside the write body) rolls back when dropped.
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::constants::{BACKUP2_SUFFIX, BACKUP_SUFFIX};
use crate::types::errors::{Error, Result};

use super::atomic::{ensure_absent, rename_in_dir};
use super::compare::same_contents;
use super::meta::{is_symlink, occupied};

fn with_suffix(target: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(target.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

/// `<target>.bak`
#[must_use]
pub fn backup_path(target: &Path) -> PathBuf {
    with_suffix(target, BACKUP_SUFFIX)
}

/// `<target>.bak2`
#[must_use]
pub fn backup2_path(target: &Path) -> PathBuf {
    with_suffix(target, BACKUP2_SUFFIX)
}

/// Result of a committed transaction.
#[derive(Debug, Default)]
pub struct Commit {
    /// New content differs from what occupied the path before.
    pub changed: bool,
    /// Best-effort cleanup steps that failed; the commit itself stands.
    pub warnings: Vec<String>,
}

/// Open transaction over one target path.
#[derive(Debug)]
pub struct Snapshot {
    target: PathBuf,
    backup: Option<PathBuf>,
    backup2: Option<PathBuf>,
    durable: bool,
    done: bool,
}

impl Snapshot {
    /// Move the current occupant of `target` (if any) aside to `target.bak`,
    /// first shifting an existing `target.bak` to `target.bak2`.
    ///
    /// # Errors
    ///
    /// Fails when `target` is a directory or either rename fails. A failed second
    /// rename puts `.bak2` back in place before returning.
    pub fn take(target: &Path, durable: bool) -> Result<Self> {
        let mut snap = Snapshot {
            target: target.to_path_buf(),
            backup: None,
            backup2: None,
            durable,
            done: false,
        };
        let md = match std::fs::symlink_metadata(target) {
            Ok(md) => md,
            Err(_) => return Ok(snap),
        };
        if md.is_dir() {
            // nothing to restore yet, so skip the rollback in Drop
            snap.done = true;
            return Err(Error::config(format!(
                "{} exists and is a directory",
                target.display()
            )));
        }

        log::debug!("{} already exists", target.display());
        let bak = backup_path(target);
        if occupied(&bak) {
            let bak2 = backup2_path(target);
            log::debug!("moving {} to {}", bak.display(), bak2.display());
            if let Err(e) = rename_in_dir(&bak, &bak2, durable) {
                snap.done = true;
                return Err(Error::rename(&bak, &bak2, &e));
            }
            snap.backup2 = Some(bak2);
        }

        log::debug!("moving {} to {}", target.display(), bak.display());
        if let Err(e) = rename_in_dir(target, &bak, durable) {
            snap.done = true;
            let err = Error::rename(target, &bak, &e);
            if let Some(bak2) = &snap.backup2 {
                if let Err(e2) = rename_in_dir(bak2, &bak, durable) {
                    log::warn!("error restoring backup file {}: {e2}", bak.display());
                }
            }
            return Err(err);
        }
        snap.backup = Some(bak);
        Ok(snap)
    }

    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// The path pre-existed and now lives at `.bak`.
    #[must_use]
    pub fn backup(&self) -> Option<&Path> {
        self.backup.as_deref()
    }

    /// A previous `.bak` was shifted to `.bak2` by this transaction.
    #[must_use]
    pub fn backup2(&self) -> Option<&Path> {
        self.backup2.as_deref()
    }

    /// Close the transaction after a successful write and decide whether the
    /// path changed.
    ///
    /// # Errors
    ///
    /// Returns an IO error when the backup and new content cannot be compared.
    /// The new content stays in place either way, and the path is treated as
    /// changed so the chain keeps at most two generations.
    pub fn commit(mut self) -> Result<Commit> {
        self.done = true;
        let mut out = Commit::default();

        let compared = match &self.backup {
            None => Ok(true),
            // links are never byte-compared
            Some(bak) if is_symlink(bak) || is_symlink(&self.target) => Ok(true),
            Some(bak) => same_contents(bak, &self.target)
                .map(|same| !same)
                .map_err(|e| {
                    Error::io(
                        format!(
                            "comparing {} with {}",
                            bak.display(),
                            self.target.display()
                        ),
                        &e,
                    )
                }),
        };
        out.changed = match compared {
            Ok(changed) => changed,
            Err(e) => {
                if let Some(bak2) = &self.backup2 {
                    if let Err(w) = ensure_absent(bak2) {
                        log::warn!("error removing stale backup {}: {w}", bak2.display());
                    }
                }
                return Err(e);
            }
        };

        if let Some(bak2) = &self.backup2 {
            if out.changed {
                log::debug!("discarding superseded {}", bak2.display());
                if let Err(e) = ensure_absent(bak2) {
                    out.warnings
                        .push(format!("error removing stale backup {}: {e}", bak2.display()));
                }
            } else if let Some(bak) = &self.backup {
                if let Err(e) = rename_in_dir(bak2, bak, self.durable) {
                    out.warnings
                        .push(format!("error restoring backup file {}: {e}", bak.display()));
                }
            }
        }
        Ok(out)
    }

    /// Undo the transaction: put the original occupant and backup chain back.
    ///
    /// Returns the restore steps that failed; those are never escalated so the
    /// error that triggered the rollback stays visible.
    pub fn rollback(mut self) -> Vec<String> {
        self.done = true;
        self.restore()
    }

    fn restore(&mut self) -> Vec<String> {
        let mut warnings = Vec::new();
        match &self.backup {
            Some(bak) => {
                if let Err(e) = rename_in_dir(bak, &self.target, self.durable) {
                    warnings.push(format!(
                        "error restoring {} from backup: {e}",
                        self.target.display()
                    ));
                } else if let Some(bak2) = &self.backup2 {
                    if let Err(e) = rename_in_dir(bak2, bak, self.durable) {
                        warnings.push(format!("error restoring backup file {}: {e}", bak.display()));
                    }
                }
            }
            None => {
                // the path did not exist before; drop whatever the body left behind
                if let Err(e) = ensure_absent(&self.target) {
                    warnings.push(format!(
                        "error removing partial {}: {e}",
                        self.target.display()
                    ));
                }
            }
        }
        warnings
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        if !self.done {
            for w in self.restore() {
                log::warn!("{w}");
            }
        }
    }
}

/// Run `body` inside a backup transaction on `target`.
///
/// Returns whether the path changed. Failed best-effort recovery steps are
/// handed to `on_warn`; the error from `body` is returned unchanged after
/// rollback.
///
/// # Errors
///
/// Snapshot failures, errors from `body`, and comparison failures.
pub fn transact<F>(target: &Path, durable: bool, mut on_warn: impl FnMut(String), body: F) -> Result<bool>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let snap = Snapshot::take(target, durable)?;
    match body(target) {
        Ok(()) => {
            let c = snap.commit()?;
            c.warnings.into_iter().for_each(&mut on_warn);
            Ok(c.changed)
        }
        Err(e) => {
            snap.rollback().into_iter().for_each(&mut on_warn);
            Err(e)
        }
    }
}
