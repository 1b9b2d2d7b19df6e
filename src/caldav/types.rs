use chrono::{DateTime, Utc};

/// A calendar collection discovered on the server.
#[derive(Debug, Clone)]
pub struct Calendar {
    pub url: String,
    pub display_name: String,
    /// Collection change tag. Absent means the collection cannot be cached.
    pub ctag: Option<String>,
    /// Component kinds the collection accepts (`VEVENT`, `VTODO`, …). Empty
    /// when the server does not advertise the property.
    pub supported_components: Vec<String>,
}

impl Calendar {
    /// `true` unless the server advertises a component set without `VEVENT`.
    pub fn accepts_events(&self) -> bool {
        self.supported_components.is_empty()
            || self
                .supported_components
                .iter()
                .any(|c| c.eq_ignore_ascii_case("VEVENT"))
    }
}

/// One calendar object resource: raw iCalendar body plus its concurrency
/// handles. The raw body travels with the object through every mutable code
/// path.
#[derive(Debug, Clone)]
pub struct CalendarObject {
    pub url: String,
    pub etag: Option<String>,
    pub data: String,
}

/// Half-open query window, UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// CalDAV time-range format, e.g. `20260315T140000Z`.
    pub fn format_start(&self) -> String {
        format_caldav_utc(self.start)
    }

    pub fn format_end(&self) -> String {
        format_caldav_utc(self.end)
    }
}

pub(crate) fn format_caldav_utc(dt: DateTime<Utc>) -> String {
    // Basic ISO-8601 per RFC 5545; the extended form trips some servers.
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Derive a display name from a collection URL when the server omits
/// `displayname`: last non-empty path segment.
pub(crate) fn display_name_from_href(href: &str) -> String {
    href.trim_end_matches('/')
        .rsplit('/')
        .find(|segment| !segment.is_empty())
        .unwrap_or(href)
        .to_string()
}
