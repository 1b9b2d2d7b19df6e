//! VEVENT → domain record transformation.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::debug;

use crate::caldav::types::CalendarObject;
use crate::ical::trigger::parse_ical_duration;
use crate::vobject::{Property, parse_component, unescape_text};

/// Event status per RFC 5545 `STATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventStatus {
    #[default]
    Confirmed,
    Tentative,
    Cancelled,
}

impl EventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            EventStatus::Confirmed => "CONFIRMED",
            EventStatus::Tentative => "TENTATIVE",
            EventStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("TENTATIVE") {
            EventStatus::Tentative
        } else if value.eq_ignore_ascii_case("CANCELLED") {
            EventStatus::Cancelled
        } else {
            EventStatus::Confirmed
        }
    }
}

/// One `ATTENDEE` line with the parameters tool handlers care about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attendee {
    pub email: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub partstat: Option<String>,
}

impl Attendee {
    /// `true` when this attendee has not answered the invitation yet.
    pub fn needs_action(&self) -> bool {
        self.partstat
            .as_deref()
            .is_none_or(|p| p.eq_ignore_ascii_case("NEEDS-ACTION"))
    }

    pub fn matches_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }
}

/// Parsed calendar event. The raw body, ETag, and URL always travel with the
/// record so it can be edited and written back.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub uid: String,
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    pub description: Option<String>,
    pub location: Option<String>,
    pub timezone: Option<String>,
    pub attendees: Vec<Attendee>,
    pub organizer: Option<String>,
    pub status: EventStatus,
    pub is_recurring: bool,
    pub rrule: Option<String>,
    /// Set on override events: which occurrence of the series this replaces.
    pub recurrence_id: Option<DateTime<Utc>>,
    pub sequence: u32,
    /// `TRANSP:TRANSPARENT`; such events do not block time.
    pub transparent: bool,
    pub raw: String,
    pub etag: Option<String>,
    pub url: String,
}

/// Turn a fetched calendar object into an [`EventRecord`].
///
/// Returns `None` (logged at debug) for bodies without a parseable VEVENT,
/// UID, or DTSTART; callers skip such objects and keep going.
pub fn transform_calendar_object(object: &CalendarObject) -> Option<EventRecord> {
    let calendar = match parse_component(&object.data) {
        Ok(calendar) => calendar,
        Err(err) => {
            debug!(url = %object.url, error = %err, "skipping unparseable calendar object");
            return None;
        }
    };
    let Some(event) = calendar.component("VEVENT") else {
        debug!(url = %object.url, "calendar object has no VEVENT");
        return None;
    };

    let Some(uid) = event.prop_value("UID").filter(|uid| !uid.is_empty()) else {
        debug!(url = %object.url, "VEVENT is missing a UID");
        return None;
    };
    let Some(dtstart) = event.prop("DTSTART") else {
        debug!(url = %object.url, uid, "VEVENT is missing DTSTART");
        return None;
    };
    let Some((start, all_day)) = parse_datetime_property(dtstart) else {
        debug!(url = %object.url, uid, value = %dtstart.value, "unparseable DTSTART");
        return None;
    };

    let end = event
        .prop("DTEND")
        .and_then(|p| parse_datetime_property(p).map(|(dt, _)| dt))
        .or_else(|| {
            event
                .prop("DURATION")
                .and_then(|p| parse_ical_duration(&p.value))
                .map(|duration| start + duration)
        })
        .unwrap_or_else(|| default_end(start, all_day));

    let attendees = event.props("ATTENDEE").map(parse_attendee).collect();
    let rrule = event.prop("RRULE").map(|p| p.value.clone());

    Some(EventRecord {
        summary: event.prop_value("SUMMARY").unwrap_or_default(),
        description: event.prop_value("DESCRIPTION"),
        location: event.prop_value("LOCATION"),
        timezone: dtstart.param_value("TZID").map(str::to_string),
        attendees,
        organizer: event
            .prop("ORGANIZER")
            .map(|p| strip_mailto(&p.value).to_string()),
        status: event
            .prop_value("STATUS")
            .map(|s| EventStatus::parse(&s))
            .unwrap_or_default(),
        is_recurring: rrule.is_some(),
        rrule,
        recurrence_id: event
            .prop("RECURRENCE-ID")
            .and_then(|p| parse_datetime_property(p).map(|(dt, _)| dt)),
        sequence: event
            .prop_value("SEQUENCE")
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0),
        transparent: event
            .prop_value("TRANSP")
            .is_some_and(|t| t.eq_ignore_ascii_case("TRANSPARENT")),
        uid,
        start,
        end,
        all_day,
        raw: object.data.clone(),
        etag: object.etag.clone(),
        url: object.url.clone(),
    })
}

fn parse_attendee(prop: &Property) -> Attendee {
    Attendee {
        email: strip_mailto(&prop.value).to_string(),
        name: prop.param_value("CN").map(unescape_text),
        role: prop.param_value("ROLE").map(str::to_string),
        partstat: prop.param_value("PARTSTAT").map(str::to_string),
    }
}

pub(crate) fn strip_mailto(value: &str) -> &str {
    let value = value.trim();
    if value.len() >= 7 && value[..7].eq_ignore_ascii_case("mailto:") {
        &value[7..]
    } else {
        value
    }
}

fn default_end(start: DateTime<Utc>, all_day: bool) -> DateTime<Utc> {
    if all_day {
        start + Duration::days(1)
    } else {
        start
    }
}

/// Parse a date or date-time property value into UTC, reporting whether it
/// was a DATE (all-day) value.
///
/// Accepted forms: `19980118` (with or without `VALUE=DATE`),
/// `19980118T230000Z`, and floating `19980118T230000` which is interpreted in
/// the property's `TZID` when present and resolvable, UTC otherwise.
pub(crate) fn parse_datetime_property(prop: &Property) -> Option<(DateTime<Utc>, bool)> {
    let value = prop.value.trim();
    let is_date = prop
        .param_value("VALUE")
        .is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
        || (value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()));

    if is_date {
        let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some((Utc.from_utc_datetime(&midnight), true));
    }

    if let Some(stripped) = value.strip_suffix('Z').or(value.strip_suffix('z')) {
        let naive = NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S").ok()?;
        return Some((Utc.from_utc_datetime(&naive), false));
    }

    let naive = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()?;
    if let Some(tz) = prop
        .param_value("TZID")
        .and_then(|tzid| tzid.parse::<Tz>().ok())
        && let Some(local) = tz.from_local_datetime(&naive).earliest()
    {
        return Some((local.with_timezone(&Utc), false));
    }
    Some((Utc.from_utc_datetime(&naive), false))
}

/// RFC 5545 basic UTC form, e.g. `20260315T140000Z`.
pub(crate) fn format_utc(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%dT%H%M%SZ").to_string()
}

/// RFC 5545 DATE form, e.g. `20260315`.
pub(crate) fn format_date(dt: DateTime<Utc>) -> String {
    dt.format("%Y%m%d").to_string()
}
