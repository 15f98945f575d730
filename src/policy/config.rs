use serde::Deserialize;

use crate::constants::DEFAULT_LOCK_TIMEOUT_MS;
use crate::types::errors::{Error, Result};

use super::types::{FetchPolicy, LockingPolicy};

/// Policy governs durability, remote fetch behavior, and locking for a
/// [`Materializer`](crate::Materializer).
///
/// Every field has a default, so a partial JSON document is a valid policy.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// fsync written files and their parent directories.
    pub durability: bool,
    pub fetch: FetchPolicy,
    pub locking: LockingPolicy,
    pub lock_timeout_ms: u64,
    /// Redact facts before they reach the emitter (timestamps, run ids, credentials).
    pub redact_facts: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            durability: true,
            fetch: FetchPolicy::default(),
            locking: LockingPolicy::Optional,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            redact_facts: false,
        }
    }
}

impl Policy {
    /// Construct a Policy with production defaults: durability on and a
    /// process lock required for every apply.
    ///
    /// # Example
    /// ```rust
    /// use materialize::policy::Policy;
    /// use materialize::{Materializer, logging::JsonlSink};
    /// use materialize::adapters::FileLockManager;
    ///
    /// let api = Materializer::new(JsonlSink::default(), JsonlSink::default(), Policy::production_preset())
    ///     .with_lock_manager(Box::new(FileLockManager::new(std::path::PathBuf::from("/tmp/materialize.lock"))));
    /// # let _ = api;
    /// ```
    #[must_use]
    pub fn production_preset() -> Self {
        Self {
            durability: true,
            locking: LockingPolicy::Required,
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns a configuration error when the document does not match the policy schema.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::config(format!("invalid policy: {e}")))
    }
}
