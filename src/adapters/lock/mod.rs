pub mod file;

use crate::types::errors::Result;

/// Held for as long as the process lock should stay taken; dropping releases it.
pub trait LockGuard: Send {}

pub trait LockManager: Send + Sync {
    /// Acquire the process lock, waiting at most `timeout_ms`.
    /// # Errors
    /// Returns a `Locking` error if the lock cannot be acquired in time.
    fn acquire_process_lock(&self, timeout_ms: u64) -> Result<Box<dyn LockGuard>>;
}
