//! Runtime configuration for apply runs.
//!
//! Consumers construct a [`Policy`](crate::policy::Policy) via `Default`,
//! `production_preset`, or a JSON document, then customize fields before
//! creating a [`Materializer`](crate::Materializer).

pub mod config;
pub mod types;

pub use config::Policy;
pub use types::{FetchPolicy, LockingPolicy};
