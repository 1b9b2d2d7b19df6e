//! CardDAV (RFC 6352) protocol client: discovery, addressbook queries, and
//! the multiget path with a per-item GET fallback for servers that do not
//! implement `addressbook-multiget`.

pub mod client;
pub mod types;

pub use client::{CardDavClient, build_addressbook_multiget_body, build_addressbook_query_body};
pub use types::{AddressBook, AddressObject};
