//! Parse-modify-serialize editing of existing calendar objects.
//!
//! The contract: touch only the fields the patch names, refresh the
//! bookkeeping (SEQUENCE, DTSTAMP, LAST-MODIFIED when already present), and
//! keep everything else — alarms, attendees, X-properties, VERSION, the
//! recurrence rule — stable through the parser.

use chrono::{DateTime, Utc};

use crate::common::error::{Error, Result};
use crate::ical::event::{EventStatus, format_date, format_utc};
use crate::ical::trigger::parse_trigger;
use crate::vobject::{Component, Param, Property, escape_text, parse_component};

/// Field changes for [`update_ical`]. `None` leaves the corresponding
/// property untouched.
#[derive(Debug, Clone, Default)]
pub struct EventPatch {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    /// Switch the event between all-day (DATE) and timed (DATE-TIME) form.
    /// Without it, a start/end change keeps the existing form.
    pub all_day: Option<bool>,
    pub status: Option<EventStatus>,
    pub rrule: Option<String>,
}

/// Apply `patch` to a raw iCalendar body and re-serialize it.
///
/// SEQUENCE is incremented, DTSTAMP refreshed, LAST-MODIFIED refreshed iff
/// present. A recurring input that would come out without its RRULE raises
/// [`Error::RruleLost`] — that is a bug in the editor, never a server state.
pub fn update_ical(raw: &str, patch: &EventPatch) -> Result<String> {
    let mut calendar = parse_component(raw)?;
    let event = event_component_mut(&mut calendar)?;
    let had_rrule = event.prop("RRULE").is_some();

    if let Some(summary) = &patch.summary {
        event.upsert_value("SUMMARY", escape_text(summary));
    }
    if let Some(description) = &patch.description {
        event.upsert_value("DESCRIPTION", escape_text(description));
    }
    if let Some(location) = &patch.location {
        event.upsert_value("LOCATION", escape_text(location));
    }
    if let Some(status) = patch.status {
        event.upsert_value("STATUS", status.as_str());
    }
    if let Some(rrule) = &patch.rrule {
        event.upsert_value("RRULE", rrule.clone());
    }

    let all_day = patch.all_day.unwrap_or_else(|| {
        event
            .prop("DTSTART")
            .and_then(|p| p.param_value("VALUE"))
            .is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
    });
    if let Some(start) = patch.start {
        set_datetime(event, "DTSTART", start, all_day);
    }
    if let Some(end) = patch.end {
        set_datetime(event, "DTEND", end, all_day);
    }

    let sequence: u32 = event
        .prop_value("SEQUENCE")
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);
    event.upsert_value("SEQUENCE", (sequence + 1).to_string());

    let now = format_utc(Utc::now());
    event.upsert_value("DTSTAMP", now.clone());
    if event.prop("LAST-MODIFIED").is_some() {
        event.upsert_value("LAST-MODIFIED", now);
    }

    let serialized = calendar.serialize();
    if had_rrule {
        let check = parse_component(&serialized)?;
        let still_recurring = check
            .component("VEVENT")
            .and_then(|e| e.prop("RRULE"))
            .is_some();
        if !still_recurring {
            return Err(Error::RruleLost);
        }
    }
    Ok(serialized)
}

fn set_datetime(event: &mut Component, name: &str, value: DateTime<Utc>, all_day: bool) {
    if all_day {
        event.upsert_with_params(name, format_date(value), vec![Param::new("VALUE", "DATE")]);
    } else {
        event.upsert_with_params(name, format_utc(value), Vec::new());
    }
}

/// Append a `VALARM` to the event. `trigger` accepts the grammar of
/// [`parse_trigger`]; `action` defaults to `DISPLAY` and `description` to
/// `Reminder`.
pub fn add_alarm(
    raw: &str,
    trigger: &str,
    action: Option<&str>,
    description: Option<&str>,
) -> Result<String> {
    let normalized = parse_trigger(trigger)?;
    let mut calendar = parse_component(raw)?;
    let event = event_component_mut(&mut calendar)?;

    let mut alarm = Component::new("VALARM");
    alarm.push_property(Property::new("TRIGGER", normalized));
    alarm.push_property(Property::new("ACTION", action.unwrap_or("DISPLAY")));
    alarm.push_property(Property::new(
        "DESCRIPTION",
        escape_text(description.unwrap_or("Reminder")),
    ));
    event.push_component(alarm);

    Ok(calendar.serialize())
}

/// Remove the alarm at a 0-based position. An index outside `[0, count)` is
/// a typed range error carrying the actual count so the caller can name the
/// valid indices.
pub fn remove_alarm(raw: &str, index: usize) -> Result<String> {
    let mut calendar = parse_component(raw)?;
    let event = event_component_mut(&mut calendar)?;

    let count = event.components_named("VALARM").count();
    if index >= count {
        return Err(Error::AlarmIndex { index, count });
    }

    let mut seen = 0usize;
    event.components.retain(|component| {
        if !component.is_named("VALARM") {
            return true;
        }
        let keep = seen != index;
        seen += 1;
        keep
    });

    Ok(calendar.serialize())
}

/// Remove every alarm. A no-op (other than re-serialization) when none exist.
pub fn remove_all_alarms(raw: &str) -> Result<String> {
    let mut calendar = parse_component(raw)?;
    let event = event_component_mut(&mut calendar)?;
    event.components.retain(|c| !c.is_named("VALARM"));
    Ok(calendar.serialize())
}

/// Exclude a single occurrence of a recurring event by adding an `EXDATE` to
/// the master, leaving the resource itself in place.
pub fn add_exdate(raw: &str, instance: DateTime<Utc>) -> Result<String> {
    let mut calendar = parse_component(raw)?;
    let event = event_component_mut(&mut calendar)?;

    if event.prop("RRULE").is_none() {
        return Err(Error::NotRecurring);
    }

    // Match the DTSTART value form so servers treat the exclusion as the
    // same instant the rule generated.
    let date_form = event
        .prop("DTSTART")
        .and_then(|p| p.param_value("VALUE"))
        .is_some_and(|v| v.eq_ignore_ascii_case("DATE"));
    let property = if date_form {
        Property::with_params(
            "EXDATE",
            format_date(instance),
            vec![Param::new("VALUE", "DATE")],
        )
    } else {
        Property::new("EXDATE", format_utc(instance))
    };
    event.push_property(property);

    Ok(calendar.serialize())
}

/// Rewrite the `PARTSTAT` of the attendee matching `email` and re-serialize.
/// Used to answer invitations.
pub fn update_partstat(raw: &str, email: &str, partstat: &str) -> Result<String> {
    let mut calendar = parse_component(raw)?;
    let event = event_component_mut(&mut calendar)?;

    let mut updated = false;
    for prop in event
        .properties
        .iter_mut()
        .filter(|p| p.is_named("ATTENDEE"))
    {
        let attendee_email = crate::ical::event::strip_mailto(&prop.value);
        if attendee_email.eq_ignore_ascii_case(email) {
            prop.set_param("PARTSTAT", partstat.to_uppercase());
            updated = true;
        }
    }
    if !updated {
        return Err(Error::NotFound(format!(
            "no attendee with email {email} on this event"
        )));
    }

    Ok(calendar.serialize())
}

fn event_component_mut(calendar: &mut Component) -> Result<&mut Component> {
    calendar
        .component_mut("VEVENT")
        .ok_or_else(|| Error::Parse("calendar object has no VEVENT".into()))
}
