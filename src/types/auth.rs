use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

use super::errors::{Error, Result};

/// Credentials a desired-state entry may reference by name through its
/// `authentication` attribute.
#[derive(Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Credentials {
    Basic { username: String, password: String },
    Bearer { token: String },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"***")
                .finish(),
            Credentials::Bearer { .. } => f.debug_struct("Bearer").field("token", &"***").finish(),
        }
    }
}

/// Named credentials available to remote fetches during one apply call.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(transparent)]
pub struct AuthConfig {
    sources: BTreeMap<String, Credentials>,
}

impl AuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, creds: Credentials) -> Self {
        self.sources.insert(name.into(), creds);
        self
    }

    /// Look up the credentials an entry asked for.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when `name` is set but unknown.
    pub fn resolve(&self, name: Option<&str>) -> Result<Option<&Credentials>> {
        match name {
            None => Ok(None),
            Some(n) => self
                .sources
                .get(n)
                .map(Some)
                .ok_or_else(|| Error::config(format!("unknown authentication source: {n}"))),
        }
    }

    /// # Errors
    ///
    /// Returns a configuration error when the document is not a name → credentials map.
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| Error::config(format!("invalid authentication config: {e}")))
    }
}
