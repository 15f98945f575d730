use std::time::Duration;

use serde::Deserialize;

use crate::constants::{
    DEFAULT_FETCH_ATTEMPTS, DEFAULT_FETCH_BACKOFF_MS, DEFAULT_FETCH_MAX_BACKOFF_MS,
    DEFAULT_FETCH_TIMEOUT_MS, DEFAULT_USER_AGENT,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockingPolicy {
    /// `apply` fails when no lock manager is configured.
    Required,
    #[default]
    Optional,
}

/// Retry and timeout knobs for the HTTP transport.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FetchPolicy {
    /// Attempts per URL, including the first one.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_FETCH_ATTEMPTS,
            initial_backoff_ms: DEFAULT_FETCH_BACKOFF_MS,
            max_backoff_ms: DEFAULT_FETCH_MAX_BACKOFF_MS,
            timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl FetchPolicy {
    /// Delay before retry number `attempt` (1-based): doubling, capped.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let ms = self.initial_backoff_ms.saturating_mul(factor).min(self.max_backoff_ms);
        Duration::from_millis(ms)
    }
}
