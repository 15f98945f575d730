use std::path::{Component, Path, PathBuf};

use super::errors::{Error, ErrorKind, Result};

/// A desired-state path resolved under a root directory.
///
/// Absolute candidates that already live under the root are taken relative to it;
/// any other absolute candidate is re-rooted, so `/etc/app.conf` under `/srv/img`
/// becomes `/srv/img/etc/app.conf`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SafePath {
    root: PathBuf,
    rel: PathBuf,
}

impl SafePath {
    /// Resolve `candidate` under `root`.
    ///
    /// # Errors
    ///
    /// Fails when `root` is not absolute, when the candidate contains `..`,
    /// or when nothing but the root itself would remain.
    pub fn from_rooted(root: &Path, candidate: &Path) -> Result<Self> {
        if !root.is_absolute() {
            return Err(Error::new(ErrorKind::InvalidPath, "root must be absolute"));
        }
        let effective = candidate.strip_prefix(root).unwrap_or(candidate);

        let mut rel = PathBuf::new();
        for seg in effective.components() {
            match seg {
                Component::RootDir | Component::CurDir => {}
                Component::Normal(p) => rel.push(p),
                Component::ParentDir => {
                    return Err(Error::new(
                        ErrorKind::InvalidPath,
                        format!("{}: parent directory components are not allowed", candidate.display()),
                    ));
                }
                Component::Prefix(_) => {
                    return Err(Error::new(ErrorKind::InvalidPath, "unsupported component"));
                }
            }
        }
        if rel.as_os_str().is_empty() {
            return Err(Error::new(
                ErrorKind::InvalidPath,
                format!("{}: resolves to the root itself", candidate.display()),
            ));
        }
        Ok(SafePath {
            root: root.to_path_buf(),
            rel,
        })
    }

    /// Returns the full path by joining the root and relative components.
    #[must_use]
    pub fn as_path(&self) -> PathBuf {
        self.root.join(&self.rel)
    }

    #[must_use]
    pub fn rel(&self) -> &Path {
        &self.rel
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}
