//! Recurrence expansion with exception handling.
//!
//! A recurring series arrives from the server as a master VEVENT plus zero
//! or more override VEVENTs sharing its UID, each carrying a RECURRENCE-ID.
//! Expansion honors both exception mechanisms seen in the wild: EXDATE on
//! the master, and overrides (`STATUS:CANCELLED` drops the occurrence, any
//! other override replaces it).

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rrule::RRuleSet;
use tracing::{debug, warn};

use crate::caldav::types::TimeRange;
use crate::ical::event::{
    EventRecord, EventStatus, format_utc, parse_datetime_property,
};
use crate::vobject::parse_component;

/// Cap on RRULE expansion per master; runaway rules stop here.
pub const MAX_OCCURRENCES_PER_MASTER: u16 = 100;

/// Cap on the total occurrences handed back to the caller.
pub const DISPLAY_CAP: usize = 50;

/// One concrete occurrence inside a query window.
#[derive(Debug, Clone)]
pub struct Occurrence {
    pub uid: String,
    pub summary: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub status: EventStatus,
    /// `true` when this occurrence came from an override VEVENT.
    pub is_override: bool,
}

impl Occurrence {
    fn from_master(master: &EventRecord, start: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            uid: master.uid.clone(),
            summary: master.summary.clone(),
            start,
            end: start + duration,
            location: master.location.clone(),
            description: master.description.clone(),
            status: master.status,
            is_override: false,
        }
    }

    fn from_override(record: &EventRecord) -> Self {
        Self {
            uid: record.uid.clone(),
            summary: record.summary.clone(),
            start: record.start,
            end: record.end,
            location: record.location.clone(),
            description: record.description.clone(),
            status: record.status,
            is_override: true,
        }
    }
}

/// Expand a set of event records into ordered occurrences within `window`.
///
/// Non-recurring events pass through when they intersect the window;
/// recurring masters are expanded against their overrides. Output is sorted
/// by start and truncated to [`DISPLAY_CAP`].
pub fn expand_window(records: &[EventRecord], window: &TimeRange) -> Vec<Occurrence> {
    let mut overrides: HashMap<&str, Vec<&EventRecord>> = HashMap::new();
    for record in records {
        if record.recurrence_id.is_some() {
            overrides.entry(record.uid.as_str()).or_default().push(record);
        }
    }

    let mut occurrences = Vec::new();
    for record in records {
        if record.recurrence_id.is_some() {
            continue;
        }
        if !record.is_recurring {
            if record.start < window.end && record.end > window.start {
                occurrences.push(Occurrence::from_master(
                    record,
                    record.start,
                    record.end - record.start,
                ));
            }
            continue;
        }
        let series_overrides = overrides
            .get(record.uid.as_str())
            .map(|v| v.as_slice())
            .unwrap_or(&[]);
        match expand_master(record, series_overrides, window) {
            Ok(expanded) => occurrences.extend(expanded),
            Err(err) => {
                debug!(uid = %record.uid, error = %err, "skipping unexpandable recurring event");
            }
        }
    }

    occurrences.sort_by_key(|o| o.start);
    if occurrences.len() > DISPLAY_CAP {
        warn!(
            total = occurrences.len(),
            cap = DISPLAY_CAP,
            "truncating expanded occurrences"
        );
        occurrences.truncate(DISPLAY_CAP);
    }
    occurrences
}

fn expand_master(
    master: &EventRecord,
    overrides: &[&EventRecord],
    window: &TimeRange,
) -> anyhow::Result<Vec<Occurrence>> {
    let rrule = master
        .rrule
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("recurring event without an RRULE"))?;

    let set_text = format!("DTSTART:{}\nRRULE:{}", format_utc(master.start), rrule);
    let rrule_set: RRuleSet = set_text
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid RRULE {rrule:?}: {e}"))?;

    let exdates = collect_exdates(master);
    let duration = master.end - master.start;

    // `after` is exclusive; nudge back one second so an occurrence exactly at
    // the window start is kept.
    let tz = rrule_set.get_dt_start().timezone();
    let search_start = (window.start - Duration::seconds(1)).with_timezone(&tz);

    let mut out = Vec::new();
    let dates = rrule_set
        .after(search_start)
        .all(MAX_OCCURRENCES_PER_MASTER)
        .dates;
    for date in dates {
        let start = date.with_timezone(&Utc);
        if start >= window.end {
            break;
        }
        if exdates.contains(&start) {
            continue;
        }
        match overrides.iter().find(|o| o.recurrence_id == Some(start)) {
            Some(over) if over.status == EventStatus::Cancelled => continue,
            Some(over) => out.push(Occurrence::from_override(over)),
            None => out.push(Occurrence::from_master(master, start, duration)),
        }
    }
    Ok(out)
}

/// EXDATE values from the master's raw body, normalized to UTC. Values may
/// repeat across several EXDATE lines or be comma-separated on one.
fn collect_exdates(master: &EventRecord) -> Vec<DateTime<Utc>> {
    let Ok(calendar) = parse_component(&master.raw) else {
        return Vec::new();
    };
    let Some(event) = calendar.component("VEVENT") else {
        return Vec::new();
    };

    let mut exdates = Vec::new();
    for prop in event.props("EXDATE") {
        for value in prop.value.split(',') {
            let mut single = prop.clone();
            single.value = value.trim().to_string();
            if let Some((dt, _)) = parse_datetime_property(&single) {
                exdates.push(dt);
            }
        }
    }
    exdates
}
