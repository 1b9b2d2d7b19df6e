//! CalDAV/CardDAV bridge core for conversational assistants.
//!
//! This library sits between an AI agent's tool handlers and a user's DAV
//! server. It owns the hard parts — discovery, caching, optimistic
//! concurrency, and lossless iCalendar/vCard editing — and leaves the tool
//! protocol, natural-language parsing, and process bootstrap to the host.
//!
//! # Features
//!
//! - Paired CalDAV + CardDAV accounts over one hyper 1.x + rustls pool,
//!   with auth re-injected on every request (redirect-safe)
//! - Well-known URL discovery for calendars and address books
//! - CTag-keyed collection cache with a server-side dirty-check fallback
//! - `If-Match` / `If-None-Match` writes with typed conflict outcomes
//! - Parse-modify-serialize editors that preserve alarms, attendees,
//!   X-properties, grouped vCard properties, and recurrence rules
//! - Recurrence expansion honoring EXDATE and RECURRENCE-ID overrides
//! - Dual-path free/busy with interval merging
//! - Exponential backoff with jitter around every network operation
//!
//! # Examples
//!
//! ## Connect, validate, list events
//!
//! ```no_run
//! use dav_bridge_rs::{Accounts, AuthMethod, BridgeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BridgeConfig {
//!         server_url: "https://dav.example.com".to_string(),
//!         auth: AuthMethod::Basic {
//!             username: "user01".to_string(),
//!             password: "secret".to_string(),
//!         },
//!         default_calendar: None,
//!         default_address_book: None,
//!         timezone: None,
//!         timeout_secs: 20,
//!     };
//!
//!     let accounts = Accounts::connect(&config)?;
//!     let (calendars, address_books) = accounts.validate().await?;
//!     println!("{calendars} calendars, {address_books} address books");
//!
//!     for calendar in accounts.calendars.list_calendars().await? {
//!         let events = accounts.calendars.fetch_events(&calendar, None).await?;
//!         println!("{}: {} objects", calendar.display_name, events.len());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Create, edit, delete an event
//!
//! ```no_run
//! use chrono::{TimeZone, Utc};
//! use dav_bridge_rs::ical::{EventDraft, EventPatch, build_ical, update_ical};
//! # async fn example(accounts: &dav_bridge_rs::Accounts) -> dav_bridge_rs::Result<()> {
//! let built = build_ical(&EventDraft {
//!     title: "Review".to_string(),
//!     start: Utc.with_ymd_and_hms(2026, 3, 15, 14, 0, 0).unwrap(),
//!     end: Utc.with_ymd_and_hms(2026, 3, 15, 15, 0, 0).unwrap(),
//!     all_day: false,
//!     description: None,
//!     location: None,
//!     rrule: None,
//! });
//! let created = accounts.calendars.create_event(&built.ical, None).await?;
//!
//! let event = accounts
//!     .calendars
//!     .find_event_by_uid(&built.uid, None)
//!     .await?
//!     .expect("just created");
//!
//! // Touch only the title; alarms, attendees, and X- properties survive.
//! let patch = EventPatch {
//!     summary: Some("Review v2".to_string()),
//!     ..Default::default()
//! };
//! let updated = update_ical(&event.raw, &patch)?;
//! let etag = event.etag.as_deref().expect("server reported an etag");
//! accounts.calendars.update_event(&event.url, &updated, etag).await?;
//!
//! accounts.calendars.delete_event(&created.url, None).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Free/busy
//!
//! ```no_run
//! use chrono::{Duration, Utc};
//! use dav_bridge_rs::caldav::TimeRange;
//! use dav_bridge_rs::service::free_busy;
//! # async fn example(accounts: &dav_bridge_rs::Accounts) -> dav_bridge_rs::Result<()> {
//! let range = TimeRange::new(Utc::now(), Utc::now() + Duration::days(7));
//! let calendar = accounts
//!     .calendars
//!     .find_calendar(None)
//!     .await?
//!     .expect("at least one calendar");
//! for period in free_busy(&accounts.calendars, &calendar, &range).await? {
//!     println!("busy {} → {}", period.start, period.end);
//! }
//! # Ok(())
//! # }
//! ```

pub mod caldav;
pub mod carddav;
pub mod common;
pub mod ical;
pub mod service;
pub mod vcard;
pub mod vobject;
pub mod webdav;

pub use caldav::{CalDavClient, Calendar, CalendarObject, TimeRange};
pub use carddav::{AddressBook, AddressObject, CardDavClient};
pub use common::cache::CollectionCache;
pub use common::config::{AuthMethod, BridgeConfig};
pub use common::error::{Error, ResourceKind, Result, StartupErrorKind};
pub use common::retry::{RetryConfig, with_retries};
pub use ical::{
    Attendee, BuiltEvent, EventDraft, EventPatch, EventRecord, EventStatus, Occurrence,
    add_alarm, add_exdate, build_ical, expand_window, parse_trigger, remove_alarm,
    remove_all_alarms, update_ical,
};
pub use service::{
    Accounts, AddressBookService, BusyPeriod, CalendarService, CreatedObject, Invitation,
    Partstat, free_busy, list_pending_invitations, merge_busy_periods,
};
pub use vcard::{BuiltContact, ContactDraft, ContactPatch, ContactRecord, build_vcard,
    transform_vcard, update_vcard};
pub use webdav::{AccountType, DavClient, Depth};
