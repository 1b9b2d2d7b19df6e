//! CalDAV (RFC 4791) protocol client: discovery, calendar queries, the CTag
//! dirty-check probe, and the free-busy REPORT.

pub mod client;
pub mod types;

pub use client::{CalDavClient, build_calendar_multiget_body, build_calendar_query_body};
pub use types::{Calendar, CalendarObject, TimeRange};
