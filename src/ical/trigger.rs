//! Reminder trigger parsing.
//!
//! Tool calls describe reminder offsets in whatever form the agent produced:
//! an iCalendar duration literal (`-PT15M`, `PT30M`, `-P1D`), a short form
//! (`15m`, `1h`, `1d`, `2w`, `30s`), or a long form (`15 minutes`, `1 hour`,
//! `1 day`). Short and long forms mean "that long before the event starts"
//! and normalize to a negative trigger.

use chrono::Duration;

use crate::common::error::{Error, Result};

/// Parse user-supplied trigger text into a normalized iCalendar duration
/// suitable for a `TRIGGER` property value.
pub fn parse_trigger(input: &str) -> Result<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(Error::Parse("reminder time is empty".into()));
    }

    if let Some(duration) = parse_ical_duration(trimmed) {
        return Ok(format_ical_duration(duration));
    }
    if let Some(duration) = parse_short_form(trimmed).or_else(|| parse_long_form(trimmed)) {
        // Offsets given without a sign count backwards from the event start.
        return Ok(format_ical_duration(-duration));
    }

    Err(Error::Parse(format!(
        "unrecognized reminder time {trimmed:?}; use forms like \"15m\", \"1 hour\", or \"-PT15M\""
    )))
}

/// Parse an RFC 5545 duration literal into a signed [`Duration`].
///
/// Returns `None` for anything that is not a well-formed duration.
pub(crate) fn parse_ical_duration(input: &str) -> Option<Duration> {
    let mut rest = input.trim();
    let mut negative = false;
    if let Some(stripped) = rest.strip_prefix('-') {
        negative = true;
        rest = stripped;
    } else if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    }
    rest = rest.strip_prefix('P').or(rest.strip_prefix('p'))?;

    let mut seconds: i64 = 0;
    let mut in_time = false;
    let mut digits = String::new();
    let mut saw_unit = false;

    for ch in rest.chars() {
        match ch {
            'T' | 't' => {
                if !digits.is_empty() {
                    return None;
                }
                in_time = true;
            }
            '0'..='9' => digits.push(ch),
            unit => {
                let amount: i64 = digits.parse().ok()?;
                digits.clear();
                let factor = match (unit.to_ascii_uppercase(), in_time) {
                    ('W', false) => 7 * 86_400,
                    ('D', false) => 86_400,
                    ('H', true) => 3_600,
                    ('M', true) => 60,
                    ('S', true) => 1,
                    _ => return None,
                };
                seconds = seconds.checked_add(amount.checked_mul(factor)?)?;
                saw_unit = true;
            }
        }
    }

    if !digits.is_empty() || !saw_unit {
        return None;
    }
    Some(if negative {
        Duration::seconds(-seconds)
    } else {
        Duration::seconds(seconds)
    })
}

/// Canonical iCalendar rendering of a signed duration.
pub(crate) fn format_ical_duration(duration: Duration) -> String {
    let total = duration.num_seconds();
    let negative = total < 0;
    let mut seconds = total.abs();

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push('P');

    if seconds > 0 && seconds % (7 * 86_400) == 0 {
        out.push_str(&format!("{}W", seconds / (7 * 86_400)));
        return out;
    }

    let days = seconds / 86_400;
    seconds %= 86_400;
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    if seconds > 0 || days == 0 {
        out.push('T');
        let hours = seconds / 3_600;
        let minutes = (seconds % 3_600) / 60;
        let secs = seconds % 60;
        if hours > 0 {
            out.push_str(&format!("{hours}H"));
        }
        if minutes > 0 {
            out.push_str(&format!("{minutes}M"));
        }
        if secs > 0 || (hours == 0 && minutes == 0) {
            out.push_str(&format!("{secs}S"));
        }
    }
    out
}

fn parse_short_form(input: &str) -> Option<Duration> {
    let (idx, unit) = input.char_indices().last()?;
    let amount: i64 = input[..idx].parse().ok()?;
    if amount < 0 {
        return None;
    }
    match unit.to_ascii_lowercase() {
        's' => Some(Duration::seconds(amount)),
        'm' => Some(Duration::minutes(amount)),
        'h' => Some(Duration::hours(amount)),
        'd' => Some(Duration::days(amount)),
        'w' => Some(Duration::weeks(amount)),
        _ => None,
    }
}

fn parse_long_form(input: &str) -> Option<Duration> {
    let mut parts = input.split_whitespace();
    let amount: i64 = parts.next()?.parse().ok()?;
    let unit = parts.next()?.to_ascii_lowercase();
    if parts.next().is_some() || amount < 0 {
        return None;
    }
    match unit.trim_end_matches('s') {
        "second" | "sec" => Some(Duration::seconds(amount)),
        "minute" | "min" => Some(Duration::minutes(amount)),
        "hour" | "hr" => Some(Duration::hours(amount)),
        "day" => Some(Duration::days(amount)),
        "week" => Some(Duration::weeks(amount)),
        _ => None,
    }
}
