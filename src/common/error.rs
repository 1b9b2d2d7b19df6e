//! Error taxonomy for the bridge core.
//!
//! Three categories leave the crate: typed conflicts (optimistic-concurrency
//! losses), semantic not-found, and everything else wrapped as a generic
//! error after retry exhaustion. Each variant carries text suitable for
//! relaying to the agent and, transitively, the user.

use hyper::StatusCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Kind of resource involved in a write conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Event,
    Contact,
    Invitation,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Event => "event",
            ResourceKind::Contact => "contact",
            ResourceKind::Invitation => "invitation",
        }
    }
}

/// Category assigned to a startup validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupErrorKind {
    Dns,
    Auth,
    Tls,
    Timeout,
    Refused,
    Other,
}

impl StartupErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StartupErrorKind::Dns => "dns",
            StartupErrorKind::Auth => "auth",
            StartupErrorKind::Tls => "tls",
            StartupErrorKind::Timeout => "timeout",
            StartupErrorKind::Refused => "refused",
            StartupErrorKind::Other => "other",
        }
    }

    /// Best-effort categorization of a transport failure into a startup kind.
    pub fn classify(err: &anyhow::Error) -> Self {
        let text = format!("{err:#}").to_ascii_lowercase();
        if text.contains("dns") || text.contains("name resolution") || text.contains("no such host")
        {
            StartupErrorKind::Dns
        } else if text.contains("certificate") || text.contains("tls") || text.contains("handshake")
        {
            StartupErrorKind::Tls
        } else if text.contains("timed out") || text.contains("timeout") {
            StartupErrorKind::Timeout
        } else if text.contains("connection refused") {
            StartupErrorKind::Refused
        } else if text.contains("401") || text.contains("403") || text.contains("unauthorized") {
            StartupErrorKind::Auth
        } else {
            StartupErrorKind::Other
        }
    }
}

/// Bridge core errors.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid configuration; fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// The server rejected our credentials (401/403).
    #[error("authentication failed: {0}; check the configured credentials and their permissions")]
    Auth(String),

    /// Optimistic-concurrency conflict (HTTP 412). Recoverable: re-read and retry.
    #[error("{} changed on the server since it was read; fetch it again before writing", resource.as_str())]
    Conflict { resource: ResourceKind },

    /// The named resource does not exist on the server.
    #[error("not found: {0}")]
    NotFound(String),

    /// Alarm index outside `[0, count)`.
    #[error("alarm index {index} is out of range; this event has {count} alarm(s)")]
    AlarmIndex { index: usize, count: usize },

    /// The event has no recurrence rule, so occurrence-level operations do not apply.
    #[error("event is not recurring; occurrence operations need an RRULE")]
    NotRecurring,

    /// The editor dropped a recurrence rule. Always a bug, never expected.
    #[error("internal error: recurrence rule lost while updating an event")]
    RruleLost,

    /// An iCalendar or vCard body could not be parsed.
    #[error("could not parse object: {0}")]
    Parse(String),

    /// Startup validation failure, categorized for the host.
    #[error("startup validation failed ({}): {message}", kind.as_str())]
    Startup {
        kind: StartupErrorKind,
        message: String,
    },

    /// Any other network or server failure, surfaced after retry exhaustion.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Map a non-success HTTP status into the outward taxonomy.
    pub fn from_status(status: StatusCode, context: &str, resource: ResourceKind) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth(context.to_string()),
            StatusCode::NOT_FOUND | StatusCode::GONE => Error::NotFound(context.to_string()),
            StatusCode::PRECONDITION_FAILED => Error::Conflict { resource },
            _ => Error::Other(anyhow::anyhow!("{context} failed with HTTP {status}")),
        }
    }
}
