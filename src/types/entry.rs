//! Desired-state input model: one [`FileEntry`] per path, plus group/user specs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::errors::{Error, Result};
use crate::constants::{MODE_PERM_MASK, MODE_SYMLINK, MODE_TYPE_MASK};

/// Desired state for a batch of paths, iterated in lexicographic path order.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct DesiredState {
    pub files: BTreeMap<String, FileEntry>,
}

impl DesiredState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert used by callers and tests.
    #[must_use]
    pub fn with(mut self, path: impl Into<String>, entry: FileEntry) -> Self {
        self.files.insert(path.into(), entry);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FileEntry)> {
        self.files.iter()
    }

    /// Parse a JSON object mapping path to entry.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the document does not match the entry schema.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::config(format!("invalid desired state: {e}")))
    }

    /// Parse a YAML mapping of path to entry.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the document does not match the entry schema.
    pub fn from_yaml_str(s: &str) -> Result<Self> {
        serde_yaml::from_str(s).map_err(|e| Error::config(format!("invalid desired state: {e}")))
    }
}

/// Target attributes of a single path.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileEntry {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub encoding: Encoding,
    #[serde(default)]
    pub mode: Option<FileMode>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub authentication: Option<String>,
}

impl FileEntry {
    /// Regular file with literal text content.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(Content::Text(content.into())),
            ..Self::default()
        }
    }

    /// Regular file fetched from `url`.
    pub fn remote(url: impl Into<String>) -> Self {
        Self {
            source: Some(url.into()),
            ..Self::default()
        }
    }

    /// Symbolic link pointing at `target`.
    pub fn symlink(target: impl Into<String>) -> Self {
        Self {
            content: Some(Content::Text(target.into())),
            mode: Some(FileMode(MODE_SYMLINK | 0o777)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: FileMode) -> Self {
        self.mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    #[must_use]
    pub fn with_owner(mut self, owner: Option<&str>, group: Option<&str>) -> Self {
        self.owner = owner.map(str::to_string);
        self.group = group.map(str::to_string);
        self
    }

    /// The only difference between a file and a symlink is hidden in the mode.
    pub fn is_symlink(&self) -> bool {
        self.mode.is_some_and(FileMode::is_symlink)
    }

    /// Link target of a symlink entry.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the entry carries no textual destination.
    pub fn link_target(&self) -> Result<&str> {
        match &self.content {
            Some(Content::Text(t)) if !t.is_empty() => Ok(t.as_str()),
            Some(_) => Err(Error::config("symbolic link destination must be a non-empty string")),
            None => Err(Error::config("symbolic link specified without a destination")),
        }
    }
}

/// Inline content of an entry.
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    Text(String),
    Bytes(Vec<u8>),
    /// Any non-string value from the desired-state document; serialized as JSON.
    Structured(Value),
}

impl Content {
    /// True for content that counts as absent: empty text or bytes, and the
    /// values `null`, `false`, `0`, `""`, `[]` and `{}`. Such an entry falls
    /// through to its `source`.
    pub fn is_empty_like(&self) -> bool {
        match self {
            Content::Text(s) => s.is_empty(),
            Content::Bytes(b) => b.is_empty(),
            Content::Structured(v) => match v {
                Value::Null => true,
                Value::Bool(b) => !b,
                Value::Number(n) => n.as_f64() == Some(0.0),
                Value::String(s) => s.is_empty(),
                Value::Array(a) => a.is_empty(),
                Value::Object(o) => o.is_empty(),
            },
        }
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Content::Text(s),
            other => Content::Structured(other),
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Plain,
    Base64,
}

/// Octal mode word, optionally carrying file-type bits (e.g. `0120777` for a symlink).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct FileMode(pub u32);

impl FileMode {
    /// Parse an octal string such as `"0644"` or `"0120777"`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for empty or non-octal input.
    pub fn parse(s: &str) -> Result<Self> {
        let t = s.trim();
        if t.is_empty() {
            return Err(Error::config("empty mode"));
        }
        u32::from_str_radix(t, 8)
            .map(FileMode)
            .map_err(|_| Error::config(format!("invalid octal mode: {s}")))
    }

    pub fn is_symlink(self) -> bool {
        self.0 & MODE_TYPE_MASK == MODE_SYMLINK
    }

    /// Permission bits with any file-type bits masked out.
    pub fn permissions(self) -> u32 {
        self.0 & MODE_PERM_MASK
    }
}

impl fmt::Debug for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileMode({:o})", self.0)
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

impl<'de> Deserialize<'de> for FileMode {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        // YAML authors often write `mode: 644` unquoted; read the digits as octal.
        let raw = string_or_number(d)?;
        FileMode::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Attributes of a group to provision.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GroupSpec {
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub gid: Option<String>,
}

/// Attributes of a user to provision.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserSpec {
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default, rename = "homeDir")]
    pub home_dir: Option<String>,
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub uid: Option<String>,
}

fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<String>, D::Error> {
    match Value::deserialize(d)? {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
