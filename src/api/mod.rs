// Facade for the API module; delegates to submodules under src/api/

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::adapters::{HttpTransport, IdentityProvider, LockManager, SystemIdentity, Transport};
use crate::logging::audit::{new_run_id, AuditCtx};
use crate::logging::{now_iso, AuditSink, FactsEmitter};
use crate::policy::Policy;
use crate::types::errors::{Error, Result};
use crate::types::{ApplyReport, AuthConfig, DesiredState, GroupSpec, SafePath, UserSpec};

mod apply;
pub mod errors;
mod users;

pub use errors::ApiError;

/// Converges files on disk to a desired state, one backup transaction per path.
pub struct Materializer<E: FactsEmitter, A: AuditSink> {
    facts: E,
    audit: A,
    policy: Policy,
    transport: Box<dyn Transport>,
    identity: Box<dyn IdentityProvider>,
    lock: Option<Box<dyn LockManager>>, // None unless callers need to serialize runs
    root: Option<PathBuf>,
}

impl<E: FactsEmitter, A: AuditSink> Materializer<E, A> {
    /// Build with the HTTP transport configured from `policy.fetch` and the
    /// system identity provider.
    pub fn new(facts: E, audit: A, policy: Policy) -> Self {
        let transport = Box::new(HttpTransport::new(policy.fetch.clone()));
        Self {
            facts,
            audit,
            policy,
            transport,
            identity: Box::new(SystemIdentity::default()),
            lock: None,
            root: None,
        }
    }

    #[must_use]
    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    #[must_use]
    pub fn with_identity(mut self, identity: Box<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    #[must_use]
    pub fn with_lock_manager(mut self, lock: Box<dyn LockManager>) -> Self {
        self.lock = Some(lock);
        self
    }

    /// Resolve every desired path under `root` instead of the filesystem root.
    #[must_use]
    pub fn with_root(mut self, root: PathBuf) -> Self {
        self.root = Some(root);
        self
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Converge every entry of `state`, in ascending path order, stopping at
    /// the first failure. Paths committed before the failure stay committed.
    ///
    /// # Errors
    ///
    /// The first entry error, or a locking error before any path is touched.
    pub fn apply(&self, state: &DesiredState, auth: &AuthConfig) -> std::result::Result<ApplyReport, ApiError> {
        apply::run(self, state, auth)
    }

    /// Create missing groups, in name order. Returns the names that were created.
    ///
    /// # Errors
    ///
    /// The first error reported by the identity provider.
    pub fn create_groups(
        &self,
        groups: &BTreeMap<String, GroupSpec>,
    ) -> std::result::Result<Vec<String>, ApiError> {
        users::create_groups(self, groups)
    }

    /// Create or update users, in name order. Returns the names that were
    /// created or modified.
    ///
    /// # Errors
    ///
    /// The first error reported by the identity provider.
    pub fn create_users(
        &self,
        users: &BTreeMap<String, UserSpec>,
    ) -> std::result::Result<Vec<String>, ApiError> {
        users::create_users(self, users)
    }

    pub(crate) fn audit_ctx(&self, run_id: String) -> AuditCtx<'_> {
        let mut ctx = AuditCtx::new(&self.facts, run_id, now_iso());
        ctx.redact = self.policy.redact_facts;
        ctx
    }

    pub(crate) fn fresh_ctx(&self) -> AuditCtx<'_> {
        self.audit_ctx(new_run_id())
    }

    /// On-disk location of a desired-state key.
    pub(crate) fn resolve(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty() {
            return Err(Error::config("empty path in desired state"));
        }
        match &self.root {
            Some(root) => Ok(SafePath::from_rooted(root, Path::new(key))?.as_path()),
            None => Ok(PathBuf::from(key)),
        }
    }
}
