//! Shared test helpers for the materialize integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use flate2::write::GzEncoder;
use flate2::Compression;
use log::Level;
use serde_json::Value;

use materialize::adapters::{FetchResponse, IdentityProvider, Transport};
use materialize::logging::{AuditSink, FactsEmitter};
use materialize::policy::Policy;
use materialize::types::errors::{Error, ErrorKind, Result};
use materialize::types::{Credentials, UserSpec};
use materialize::Materializer;

/// A simple in-memory emitter to capture facts during tests.
#[derive(Clone, Default, Debug)]
pub struct TestEmitter {
    pub events: Arc<Mutex<Vec<(String, String, String, Value)>>>,
}

impl FactsEmitter for TestEmitter {
    fn emit(&self, subsystem: &str, event: &str, decision: &str, fields: Value) {
        self.events
            .lock()
            .unwrap()
            .push((subsystem.into(), event.into(), decision.into(), fields));
    }
}

impl TestEmitter {
    /// Fields of every fact emitted for `event`, in emission order.
    pub fn of(&self, event: &str) -> Vec<(String, Value)> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, e, _, _)| e == event)
            .map(|(_, _, d, f)| (d.clone(), f.clone()))
            .collect()
    }
}

/// An audit sink that keeps every line.
#[derive(Clone, Default)]
pub struct TestAudit {
    pub lines: Arc<Mutex<Vec<(Level, String)>>>,
}

impl AuditSink for TestAudit {
    fn log(&self, level: Level, msg: &str) {
        self.lines.lock().unwrap().push((level, msg.to_string()));
    }
}

#[derive(Clone)]
pub struct Canned {
    pub gzip: bool,
    pub body: Vec<u8>,
}

/// Transport serving canned bodies by URL and recording each request.
#[derive(Clone, Default)]
pub struct FakeTransport {
    pub responses: Arc<Mutex<BTreeMap<String, Canned>>>,
    pub requests: Arc<Mutex<Vec<(String, Vec<(String, String)>, Option<String>)>>>,
}

impl FakeTransport {
    pub fn serve(&self, url: &str, body: &[u8]) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.into(), Canned { gzip: false, body: body.to_vec() });
    }

    pub fn serve_gzip(&self, url: &str, logical: &[u8]) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.into(), Canned { gzip: true, body: gzip(logical) });
    }
}

impl Transport for FakeTransport {
    fn fetch(&self, url: &str, headers: &[(&str, &str)], credentials: Option<&Credentials>) -> Result<FetchResponse> {
        let user = credentials.map(|c| match c {
            Credentials::Basic { username, .. } => username.clone(),
            Credentials::Bearer { .. } => "bearer".to_string(),
        });
        self.requests.lock().unwrap().push((
            url.to_string(),
            headers.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            user,
        ));
        let Some(c) = self.responses.lock().unwrap().get(url).cloned() else {
            return Err(Error::new(ErrorKind::Transport, format!("{url}: HTTP 404")));
        };
        let headers: Vec<(&str, &str)> = if c.gzip { vec![("Content-Encoding", "gzip")] } else { vec![] };
        Ok(FetchResponse::new(200, headers, Box::new(std::io::Cursor::new(c.body))))
    }
}

/// Identity provider that records calls and can be told to refuse an owner.
#[derive(Clone, Default)]
pub struct RecordingIdentity {
    pub existing_groups: Arc<Mutex<BTreeSet<String>>>,
    pub existing_users: Arc<Mutex<BTreeSet<String>>>,
    pub ownership_calls: Arc<Mutex<Vec<(PathBuf, Option<String>, Option<String>)>>>,
    pub refuse_owner: Option<String>,
}

impl IdentityProvider for RecordingIdentity {
    fn create_group(&self, name: &str, _gid: Option<&str>) -> Result<bool> {
        if name.contains(' ') {
            return Err(Error::new(ErrorKind::Identity, format!("groupadd: invalid name {name}")));
        }
        Ok(self.existing_groups.lock().unwrap().insert(name.to_string()))
    }

    fn create_or_modify_user(&self, name: &str, spec: &UserSpec) -> Result<bool> {
        let created = self.existing_users.lock().unwrap().insert(name.to_string());
        Ok(created || !spec.groups.is_empty())
    }

    fn set_owner_and_group(&self, path: &Path, owner: Option<&str>, group: Option<&str>) -> Result<()> {
        if owner.is_some() && owner == self.refuse_owner.as_deref() {
            return Err(Error::new(
                ErrorKind::Identity,
                format!("unknown user: {}", owner.unwrap_or_default()),
            ));
        }
        self.ownership_calls.lock().unwrap().push((
            path.to_path_buf(),
            owner.map(str::to_string),
            group.map(str::to_string),
        ));
        Ok(())
    }
}

pub struct Harness {
    pub root: tempfile::TempDir,
    pub facts: TestEmitter,
    pub audit: TestAudit,
    pub transport: FakeTransport,
    pub identity: RecordingIdentity,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("tempdir"),
            facts: TestEmitter::default(),
            audit: TestAudit::default(),
            transport: FakeTransport::default(),
            identity: RecordingIdentity::default(),
        }
    }

    /// Path under the temporary root for a desired-state key.
    pub fn at(&self, key: &str) -> PathBuf {
        self.root.path().join(key.trim_start_matches('/'))
    }

    pub fn materializer(&self) -> Materializer<TestEmitter, TestAudit> {
        self.materializer_with(Policy {
            durability: false,
            ..Policy::default()
        })
    }

    pub fn materializer_with(&self, policy: Policy) -> Materializer<TestEmitter, TestAudit> {
        Materializer::new(self.facts.clone(), self.audit.clone(), policy)
            .with_root(self.root.path().to_path_buf())
            .with_transport(Box::new(self.transport.clone()))
            .with_identity(Box::new(self.identity.clone()))
    }
}

pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(bytes).unwrap();
    enc.finish().unwrap()
}
