//! Transport collaborator: blocking retrieval of remote content.
use std::collections::BTreeMap;
use std::io::Read;
use std::thread;
use std::time::Duration;

use base64::Engine;

use crate::logging::redact_url;
use crate::policy::FetchPolicy;
use crate::types::auth::Credentials;
use crate::types::errors::{Error, ErrorKind, Result};

/// Response metadata plus a streaming body.
pub struct FetchResponse {
    pub status: u16,
    headers: BTreeMap<String, String>,
    pub body: Box<dyn Read>,
}

impl FetchResponse {
    /// Header names are matched case-insensitively.
    pub fn new<K, V>(status: u16, headers: impl IntoIterator<Item = (K, V)>, body: Box<dyn Read>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        Self {
            status,
            headers: headers
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_lowercase(), v.into()))
                .collect(),
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// The transport compressed the payload with gzip.
    pub fn is_gzip(&self) -> bool {
        self.header("content-encoding")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("gzip"))
    }
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Fetch bytes for a URL. Implementations own their retry policy; an error
/// means retries are exhausted.
pub trait Transport {
    fn fetch(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        credentials: Option<&Credentials>,
    ) -> Result<FetchResponse>;
}

/// `Authorization` header value for the given credentials.
pub fn authorization_header(creds: &Credentials) -> String {
    match creds {
        Credentials::Basic { username, password } => format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"))
        ),
        Credentials::Bearer { token } => format!("Bearer {token}"),
    }
}

enum Attempt {
    Retry(Error),
    Fatal(Error),
}

/// Blocking HTTP(S) transport on `ureq`, retrying transport errors and 5xx
/// responses with exponential backoff.
pub struct HttpTransport {
    agent: ureq::Agent,
    policy: FetchPolicy,
}

impl HttpTransport {
    #[must_use]
    pub fn new(policy: FetchPolicy) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_millis(policy.timeout_ms)))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent, policy }
    }

    fn attempt(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        credentials: Option<&Credentials>,
    ) -> std::result::Result<FetchResponse, Attempt> {
        let mut req = self
            .agent
            .get(url)
            .header("User-Agent", self.policy.user_agent.as_str());
        for (k, v) in headers {
            req = req.header(*k, *v);
        }
        if let Some(c) = credentials {
            req = req.header("Authorization", authorization_header(c));
        }
        let resp = req.call().map_err(|e| {
            Attempt::Retry(Error::new(
                ErrorKind::Transport,
                format!("{}: {e}", redact_url(url)),
            ))
        })?;

        let status = resp.status().as_u16();
        if status >= 400 {
            let err = Error::new(
                ErrorKind::Transport,
                format!("{}: HTTP {status}", redact_url(url)),
            );
            return Err(if status >= 500 { Attempt::Retry(err) } else { Attempt::Fatal(err) });
        }
        let headers: Vec<(String, String)> = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = resp.into_body().into_reader();
        Ok(FetchResponse::new(status, headers, Box::new(body)))
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(FetchPolicy::default())
    }
}

impl Transport for HttpTransport {
    fn fetch(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        credentials: Option<&Credentials>,
    ) -> Result<FetchResponse> {
        let max = self.policy.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.attempt(url, headers, credentials) {
                Ok(resp) => return Ok(resp),
                Err(Attempt::Fatal(e)) => return Err(e),
                Err(Attempt::Retry(e)) if attempt >= max => return Err(e),
                Err(Attempt::Retry(e)) => {
                    let delay = self.policy.backoff_for(attempt);
                    log::warn!("{e}; retrying in {}ms ({attempt}/{max})", delay.as_millis());
                    thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}
