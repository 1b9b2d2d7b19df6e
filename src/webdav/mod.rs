//! Generic WebDAV plumbing shared by the CalDAV and CardDAV accounts:
//! the HTTP client with per-request auth injection, and the multistatus
//! response parser.

pub mod client;
pub mod types;
pub mod xml;

pub use client::DavClient;
pub use types::{AccountType, DavItem, Depth};
pub use xml::{escape_xml, parse_multistatus};
