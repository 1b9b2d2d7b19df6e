//! Bridge configuration supplied by the host process.

use serde::Deserialize;

use crate::common::error::{Error, Result};

/// Authentication method used against the DAV server.
///
/// Whatever the mode, the resulting header is re-applied on **every** outgoing
/// request (including manual redirect follows); credentials are never handed
/// to the HTTP stack as client-wide state.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthMethod {
    /// Basic authentication (username/password).
    Basic { username: String, password: String },
    /// Bearer token authentication (OAuth).
    Bearer { token: String },
    /// Site-specific session token sent as a named header.
    Header { name: String, value: String },
}

/// Configuration for one bridged DAV account pair.
#[derive(Debug, Clone, Deserialize)]
pub struct BridgeConfig {
    /// Base URL of the DAV server (scheme + host, optionally a path prefix).
    pub server_url: String,
    /// Authentication method.
    pub auth: AuthMethod,
    /// Calendar to target when a tool call names none.
    #[serde(default)]
    pub default_calendar: Option<String>,
    /// Address book to target when a tool call names none.
    #[serde(default)]
    pub default_address_book: Option<String>,
    /// IANA timezone name of the user, e.g. `Europe/Paris`.
    #[serde(default)]
    pub timezone: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

const fn default_timeout() -> u64 {
    20
}

impl BridgeConfig {
    /// Validate the configuration before any network use.
    ///
    /// Failures name the offending field and how to fix it; they are fatal at
    /// startup.
    pub fn validate(&self) -> Result<()> {
        if self.server_url.is_empty() {
            return Err(Error::Config(
                "server_url is empty; set it to your DAV server base URL, e.g. https://dav.example.com".into(),
            ));
        }
        if !self.server_url.starts_with("http://") && !self.server_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "server_url {:?} must start with http:// or https://",
                self.server_url
            )));
        }
        match &self.auth {
            AuthMethod::Basic { username, .. } if username.is_empty() => Err(Error::Config(
                "auth.username is empty; basic auth needs a username".into(),
            )),
            AuthMethod::Bearer { token } if token.is_empty() => Err(Error::Config(
                "auth.token is empty; bearer auth needs a token".into(),
            )),
            AuthMethod::Header { name, .. } if name.is_empty() => Err(Error::Config(
                "auth.name is empty; header auth needs a header name, e.g. X-Session-Token".into(),
            )),
            _ => Ok(()),
        }
    }
}
