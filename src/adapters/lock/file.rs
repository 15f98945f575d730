use std::fs::{File, OpenOptions};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use fs2::FileExt;

use crate::constants::LOCK_POLL_MS;
use crate::types::errors::{Error, ErrorKind, Result};

use super::{LockGuard, LockManager};

/// Advisory `flock`-style lock on a well-known file, polled until a deadline.
#[derive(Debug)]
pub struct FileLockManager {
    path: PathBuf,
}

impl FileLockManager {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

struct FileGuard {
    file: File,
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

impl LockGuard for FileGuard {}

impl LockManager for FileLockManager {
    fn acquire_process_lock(&self, timeout_ms: u64) -> Result<Box<dyn LockGuard>> {
        let t0 = Instant::now();
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|e| Error::io(format!("could not open lock file {}", self.path.display()), &e))?;
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Box::new(FileGuard { file })),
                Err(_) if t0.elapsed() >= Duration::from_millis(timeout_ms) => {
                    return Err(Error::new(
                        ErrorKind::Locking,
                        format!(
                            "timeout after {timeout_ms}ms acquiring {}",
                            self.path.display()
                        ),
                    ));
                }
                Err(_) => thread::sleep(Duration::from_millis(LOCK_POLL_MS)),
            }
        }
    }
}
