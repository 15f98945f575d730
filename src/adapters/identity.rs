//! Identity collaborator: group/user provisioning and path ownership.
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::constants::{GROUP_FILE, PASSWD_FILE};
use crate::types::entry::UserSpec;
use crate::types::errors::{Error, ErrorKind, Result};

/// OS identity operations the core delegates to. Implementations must be
/// idempotent: repeating a call with the same input reports no change.
pub trait IdentityProvider {
    /// Create `name` unless it exists. Returns true when created.
    fn create_group(&self, name: &str, gid: Option<&str>) -> Result<bool>;

    /// Create `name`, or bring an existing account in line with `spec`.
    /// Returns true when anything was created or modified.
    fn create_or_modify_user(&self, name: &str, spec: &UserSpec) -> Result<bool>;

    /// Change ownership of `path` (links not followed). Either side may be absent.
    fn set_owner_and_group(&self, path: &Path, owner: Option<&str>, group: Option<&str>) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswdEntry {
    pub name: String,
    pub uid: u32,
    pub gid: u32,
    pub home: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupEntry {
    pub name: String,
    pub gid: u32,
    pub members: Vec<String>,
}

/// Parse `/etc/passwd` content; malformed lines are skipped.
pub fn parse_passwd(s: &str) -> Vec<PasswdEntry> {
    s.lines()
        .filter(|l| !l.trim().is_empty() && !l.starts_with('#'))
        .filter_map(|l| {
            let f: Vec<&str> = l.split(':').collect();
            if f.len() < 6 {
                return None;
            }
            Some(PasswdEntry {
                name: f[0].to_string(),
                uid: f[2].parse().ok()?,
                gid: f[3].parse().ok()?,
                home: f[5].to_string(),
            })
        })
        .collect()
}

/// Parse `/etc/group` content; malformed lines are skipped.
pub fn parse_group(s: &str) -> Vec<GroupEntry> {
    s.lines()
        .filter(|l| !l.trim().is_empty() && !l.starts_with('#'))
        .filter_map(|l| {
            let f: Vec<&str> = l.split(':').collect();
            if f.len() < 4 {
                return None;
            }
            Some(GroupEntry {
                name: f[0].to_string(),
                gid: f[2].parse().ok()?,
                members: f[3]
                    .split(',')
                    .filter(|m| !m.is_empty())
                    .map(str::to_string)
                    .collect(),
            })
        })
        .collect()
}

/// Identity provider backed by the local account databases and shadow-utils.
#[derive(Clone, Debug)]
pub struct SystemIdentity {
    passwd: PathBuf,
    group: PathBuf,
}

impl Default for SystemIdentity {
    fn default() -> Self {
        Self {
            passwd: PathBuf::from(PASSWD_FILE),
            group: PathBuf::from(GROUP_FILE),
        }
    }
}

impl SystemIdentity {
    /// Use alternate account databases (e.g. inside an image root).
    #[must_use]
    pub fn with_databases(passwd: PathBuf, group: PathBuf) -> Self {
        Self { passwd, group }
    }

    fn users(&self) -> Result<Vec<PasswdEntry>> {
        let s = std::fs::read_to_string(&self.passwd)
            .map_err(|e| Error::io(format!("could not read {}", self.passwd.display()), &e))?;
        Ok(parse_passwd(&s))
    }

    fn groups(&self) -> Result<Vec<GroupEntry>> {
        let s = std::fs::read_to_string(&self.group)
            .map_err(|e| Error::io(format!("could not read {}", self.group.display()), &e))?;
        Ok(parse_group(&s))
    }

    /// Numeric ids are taken as-is; names are looked up in the passwd database.
    pub fn resolve_uid(&self, owner: &str) -> Result<u32> {
        if let Ok(n) = owner.parse::<u32>() {
            return Ok(n);
        }
        self.users()?
            .into_iter()
            .find(|u| u.name == owner)
            .map(|u| u.uid)
            .ok_or_else(|| Error::new(ErrorKind::Identity, format!("unknown user: {owner}")))
    }

    /// Numeric ids are taken as-is; names are looked up in the group database.
    pub fn resolve_gid(&self, group: &str) -> Result<u32> {
        if let Ok(n) = group.parse::<u32>() {
            return Ok(n);
        }
        self.groups()?
            .into_iter()
            .find(|g| g.name == group)
            .map(|g| g.gid)
            .ok_or_else(|| Error::new(ErrorKind::Identity, format!("unknown group: {group}")))
    }
}

pub(crate) fn groupadd_args(name: &str, gid: Option<&str>) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(g) = gid {
        args.extend(["-g".to_string(), g.to_string()]);
    }
    args.push(name.to_string());
    args
}

pub(crate) fn useradd_args(name: &str, spec: &UserSpec) -> Vec<String> {
    let mut args = vec!["-M".to_string()];
    if let Some(uid) = &spec.uid {
        args.extend(["-u".to_string(), uid.clone()]);
    }
    if !spec.groups.is_empty() {
        args.extend(["-G".to_string(), spec.groups.join(",")]);
    }
    if let Some(home) = &spec.home_dir {
        args.extend(["-d".to_string(), home.clone()]);
    }
    args.push(name.to_string());
    args
}

/// Flags needed to bring `current` in line with `spec`; empty when nothing differs.
pub(crate) fn usermod_args(
    current: &PasswdEntry,
    memberships: &BTreeSet<String>,
    spec: &UserSpec,
) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(uid) = &spec.uid {
        if uid.parse::<u32>().ok() != Some(current.uid) {
            args.extend(["-u".to_string(), uid.clone()]);
        }
    }
    let wanted: BTreeSet<String> = spec.groups.iter().cloned().collect();
    if !spec.groups.is_empty() && &wanted != memberships {
        args.extend(["-G".to_string(), spec.groups.join(",")]);
    }
    if let Some(home) = &spec.home_dir {
        if home != &current.home {
            args.extend(["-d".to_string(), home.clone()]);
        }
    }
    if !args.is_empty() {
        args.push(current.name.clone());
    }
    args
}

fn run(program: &str, args: &[String]) -> Result<()> {
    log::debug!("running {program} {}", args.join(" "));
    let out = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| Error::new(ErrorKind::Identity, format!("could not run {program}: {e}")))?;
    if out.status.success() {
        Ok(())
    } else {
        Err(Error::new(
            ErrorKind::Identity,
            format!(
                "{program} failed with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            ),
        ))
    }
}

impl IdentityProvider for SystemIdentity {
    fn create_group(&self, name: &str, gid: Option<&str>) -> Result<bool> {
        if self.groups()?.iter().any(|g| g.name == name) {
            log::debug!("group {name} already exists");
            return Ok(false);
        }
        run("groupadd", &groupadd_args(name, gid))?;
        Ok(true)
    }

    fn create_or_modify_user(&self, name: &str, spec: &UserSpec) -> Result<bool> {
        let Some(current) = self.users()?.into_iter().find(|u| u.name == name) else {
            run("useradd", &useradd_args(name, spec))?;
            return Ok(true);
        };
        let memberships: BTreeSet<String> = self
            .groups()?
            .into_iter()
            .filter(|g| g.members.iter().any(|m| m == name))
            .map(|g| g.name)
            .collect();
        let args = usermod_args(&current, &memberships, spec);
        if args.is_empty() {
            return Ok(false);
        }
        run("usermod", &args)?;
        Ok(true)
    }

    fn set_owner_and_group(&self, path: &Path, owner: Option<&str>, group: Option<&str>) -> Result<()> {
        if owner.is_none() && group.is_none() {
            return Ok(());
        }
        let uid = owner.map(|o| self.resolve_uid(o)).transpose()?;
        let gid = group.map(|g| self.resolve_gid(g)).transpose()?;
        log::debug!("setting owner {uid:?} and group {gid:?} for {}", path.display());
        std::os::unix::fs::lchown(path, uid, gid)
            .map_err(|e| Error::io(format!("could not change ownership of {}", path.display()), &e))
    }
}
