//! Building fresh calendar objects.
//!
//! Creation is the one place a typed builder is appropriate: there is no
//! existing body to preserve, so the object is assembled with the
//! `icalendar` crate rather than the editor's content-line model.

use chrono::{DateTime, Utc};
use icalendar::{Calendar, Component, Event, EventLike};
use uuid::Uuid;

/// Input for [`build_ical`].
#[derive(Debug, Clone)]
pub struct EventDraft {
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Emit DTSTART/DTEND as DATE values (no time component).
    pub all_day: bool,
    pub description: Option<String>,
    pub location: Option<String>,
    /// RRULE text, e.g. `FREQ=WEEKLY;BYDAY=MO`.
    pub rrule: Option<String>,
}

/// A freshly built object and the UID minted for it.
#[derive(Debug, Clone)]
pub struct BuiltEvent {
    pub uid: String,
    pub ical: String,
}

/// Emit a new VCALENDAR with exactly one VEVENT: generated v4 UID, current
/// DTSTAMP, SUMMARY, DTSTART/DTEND, and the provided optional fields.
pub fn build_ical(draft: &EventDraft) -> BuiltEvent {
    let uid = Uuid::new_v4().to_string();

    let mut event = Event::new();
    event.uid(&uid);
    event.timestamp(Utc::now());
    event.summary(&draft.title);

    if draft.all_day {
        event.starts(draft.start.date_naive());
        event.ends(draft.end.date_naive());
    } else {
        event.starts(draft.start);
        event.ends(draft.end);
    }

    if let Some(description) = &draft.description {
        event.description(description);
    }
    if let Some(location) = &draft.location {
        event.location(location);
    }
    if let Some(rrule) = &draft.rrule {
        event.add_property("RRULE", rrule);
    }

    let mut calendar = Calendar::new();
    calendar.push(event);

    BuiltEvent {
        uid,
        ical: calendar.to_string(),
    }
}
