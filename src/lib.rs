#![forbid(unsafe_code)]
//! Materialize: converge files on disk to a declarative desired state.
//!
//! Safety model highlights:
//! - Every path is written inside a backup transaction: the previous occupant moves to
//!   `<path>.bak` (and an older `.bak` to `<path>.bak2`) before anything is written, and
//!   is moved back if the write fails.
//! - Renames and unlinks go through directory handles (open parent O_DIRECTORY, following
//!   links in the parent path → *at on the final component → fsync(parent)).
//! - Entries are applied in ascending path order and the first failure stops the run.
//! - This crate forbids `unsafe` and uses `rustix` for syscalls.

pub mod constants;
pub mod adapters;
pub mod api;
pub mod content;
pub mod fs;
pub mod logging;
pub mod policy;
pub mod types;

pub use api::*;
