//! Dual-path free/busy queries.
//!
//! The `free-busy-query` REPORT is underdeployed; when the server cannot
//! answer it (or answers it unusably), busy intervals are reconstructed
//! client-side from the events in the window. Both paths end in the same
//! interval merge, so callers always see a sorted, non-overlapping list.
//! An empty answer is a valid one: the range is free.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::caldav::types::{Calendar, TimeRange};
use crate::common::error::{Error, Result};
use crate::ical::event::transform_calendar_object;
use crate::ical::trigger::parse_ical_duration;
use crate::service::calendars::CalendarService;
use crate::vobject::{Component, Property, parse_components};
use crate::webdav::xml::parse_multistatus;

/// One busy interval. `kind` carries the server's FBTYPE (`BUSY`,
/// `BUSY-TENTATIVE`, …); merged output is always plain `BUSY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusyPeriod {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub kind: String,
}

/// Busy periods for one calendar within `range`: server-side VFREEBUSY
/// first, client-side reconstruction as the fallback, merged either way.
pub async fn free_busy(
    service: &CalendarService,
    calendar: &Calendar,
    range: &TimeRange,
) -> Result<Vec<BusyPeriod>> {
    match server_side(service, calendar, range).await {
        Ok(periods) => Ok(merge_busy_periods(periods)),
        Err(err) => {
            warn!(
                calendar = %calendar.url,
                error = %err,
                "free-busy REPORT unusable, reconstructing from events"
            );
            let periods = client_side(service, calendar, range).await?;
            Ok(merge_busy_periods(periods))
        }
    }
}

async fn server_side(
    service: &CalendarService,
    calendar: &Calendar,
    range: &TimeRange,
) -> Result<Vec<BusyPeriod>> {
    let body = service.free_busy_query(&calendar.url, range).await?;
    let periods = parse_vfreebusy(&body)?;
    debug!(calendar = %calendar.url, count = periods.len(), "VFREEBUSY parsed");
    Ok(periods)
}

/// Fetch the window's events and turn every opaque one into a busy interval.
/// `TRANSP:TRANSPARENT` events do not block time; absence of TRANSP means
/// opaque.
async fn client_side(
    service: &CalendarService,
    calendar: &Calendar,
    range: &TimeRange,
) -> Result<Vec<BusyPeriod>> {
    let objects = service.fetch_events(calendar, Some(range)).await?;
    Ok(objects
        .iter()
        .filter_map(transform_calendar_object)
        .filter(|record| !record.transparent)
        .map(|record| BusyPeriod {
            start: record.start,
            end: record.end,
            kind: "BUSY".to_string(),
        })
        .collect())
}

/// Parse a free-busy REPORT response body.
///
/// Servers answer either with a raw iCalendar body or with a multistatus
/// envelope wrapping it in `calendar-data`; both are accepted.
pub fn parse_vfreebusy(body: &str) -> Result<Vec<BusyPeriod>> {
    let trimmed = body.trim();

    let calendars: Vec<Component> = if trimmed.starts_with('<') {
        let items = parse_multistatus(trimmed.as_bytes()).map_err(|e| Error::Parse(e.to_string()))?;
        let mut parsed = Vec::new();
        for item in items {
            if let Some(data) = item.calendar_data {
                parsed.extend(parse_components(&data)?);
            }
        }
        parsed
    } else {
        parse_components(trimmed)?
    };

    let mut periods = Vec::new();
    for calendar in &calendars {
        for vfreebusy in calendar.components_named("VFREEBUSY") {
            for prop in vfreebusy.props("FREEBUSY") {
                periods.extend(parse_freebusy_property(prop));
            }
        }
    }
    Ok(periods)
}

/// A FREEBUSY value is a comma-separated list of periods, each
/// `start/end` or `start/duration`.
fn parse_freebusy_property(prop: &Property) -> Vec<BusyPeriod> {
    let kind = prop
        .param_value("FBTYPE")
        .unwrap_or("BUSY")
        .to_ascii_uppercase();

    prop.value
        .split(',')
        .filter_map(|period| {
            let (start_text, end_text) = period.trim().split_once('/')?;
            let start = parse_utc(start_text)?;
            let end = match parse_utc(end_text) {
                Some(end) => end,
                None => start + parse_ical_duration(end_text)?,
            };
            Some(BusyPeriod {
                start,
                end,
                kind: kind.clone(),
            })
        })
        .collect()
}

fn parse_utc(text: &str) -> Option<DateTime<Utc>> {
    let stripped = text.trim().strip_suffix('Z')?;
    let naive = chrono::NaiveDateTime::parse_from_str(stripped, "%Y%m%dT%H%M%S").ok()?;
    Some(DateTime::from_naive_utc_and_offset(naive, Utc))
}

/// Merge overlapping or touching periods into a sorted, non-overlapping
/// sequence of plain `BUSY` intervals.
pub fn merge_busy_periods(mut periods: Vec<BusyPeriod>) -> Vec<BusyPeriod> {
    periods.sort_by_key(|p| p.start);

    let mut merged: Vec<BusyPeriod> = Vec::with_capacity(periods.len());
    for period in periods {
        match merged.last_mut() {
            Some(last) if period.start <= last.end => {
                last.end = last.end.max(period.end);
            }
            _ => merged.push(BusyPeriod {
                start: period.start,
                end: period.end,
                kind: "BUSY".to_string(),
            }),
        }
    }
    merged
}
