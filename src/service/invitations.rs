//! Pending invitations: events where the user's own ATTENDEE line still says
//! NEEDS-ACTION.
//!
//! When the server exposes a scheduling inbox it is the authoritative place
//! for incoming invitations, but plenty of servers do not; scanning the
//! calendars themselves works everywhere, so that is the baseline path.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::common::error::Result;
use crate::ical::event::{EventStatus, transform_calendar_object};
use crate::service::calendars::CalendarService;

/// Participation status used when answering an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Partstat {
    Accepted,
    Declined,
    Tentative,
}

impl Partstat {
    pub fn as_str(self) -> &'static str {
        match self {
            Partstat::Accepted => "ACCEPTED",
            Partstat::Declined => "DECLINED",
            Partstat::Tentative => "TENTATIVE",
        }
    }
}

/// An event the user was invited to but has not answered. Carries the raw
/// body so the response can be re-serialized from it.
#[derive(Debug, Clone)]
pub struct Invitation {
    pub uid: String,
    pub summary: String,
    pub organizer: Option<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub partstat: Option<String>,
    pub raw: String,
    pub etag: Option<String>,
    pub url: String,
}

/// List events where `user_email` appears as an attendee with
/// `PARTSTAT=NEEDS-ACTION` (or no PARTSTAT at all).
///
/// Reads the scheduling inbox when the server has one; otherwise, or when
/// the inbox cannot be read, scans every calendar.
pub async fn list_pending_invitations(
    service: &CalendarService,
    user_email: &str,
) -> Result<Vec<Invitation>> {
    let objects = match service.discover_scheduling_inbox().await {
        Ok(Some(inbox)) => match service.fetch_objects_at(&inbox).await {
            Ok(objects) => objects,
            Err(err) => {
                debug!(inbox = %inbox, error = %err, "inbox unreadable, scanning calendars");
                service.fetch_all_events(None).await?
            }
        },
        _ => service.fetch_all_events(None).await?,
    };

    let mut invitations = Vec::new();
    for record in objects.iter().filter_map(transform_calendar_object) {
        if record.status == EventStatus::Cancelled {
            continue;
        }
        let Some(me) = record
            .attendees
            .iter()
            .find(|attendee| attendee.matches_email(user_email))
        else {
            continue;
        };
        if !me.needs_action() {
            continue;
        }
        invitations.push(Invitation {
            uid: record.uid,
            summary: record.summary,
            organizer: record.organizer,
            start: record.start,
            end: record.end,
            partstat: me.partstat.clone(),
            raw: record.raw,
            etag: record.etag,
            url: record.url,
        });
    }
    invitations.sort_by_key(|invitation| invitation.start);
    Ok(invitations)
}
