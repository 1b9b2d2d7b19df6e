use chrono::{TimeZone, Utc};
use dav_bridge_rs::Error;
use dav_bridge_rs::ical::{
    EventPatch, add_alarm, add_exdate, remove_alarm, remove_all_alarms, update_ical,
};
use dav_bridge_rs::vobject::parse_component;

const RAW: &str = concat!(
    "BEGIN:VCALENDAR\r\n",
    "VERSION:2.0\r\n",
    "PRODID:-//Example//Sync//EN\r\n",
    "BEGIN:VEVENT\r\n",
    "UID:evt-1\r\n",
    "DTSTAMP:20260101T000000Z\r\n",
    "DTSTART:20260315T140000Z\r\n",
    "DTEND:20260315T150000Z\r\n",
    "SUMMARY:Review\r\n",
    "SEQUENCE:0\r\n",
    "LAST-MODIFIED:20260101T000000Z\r\n",
    "X-APPLE-TRAVEL-ADVISORY-BEHAVIOR:AUTOMATIC\r\n",
    "ATTENDEE;CN=Jane Doe;ROLE=REQ-PARTICIPANT;PARTSTAT=NEEDS-ACTION;RSVP=TRUE:mailto:jane@example.com\r\n",
    "BEGIN:VALARM\r\n",
    "TRIGGER:-PT10M\r\n",
    "ACTION:DISPLAY\r\n",
    "DESCRIPTION:Reminder\r\n",
    "END:VALARM\r\n",
    "END:VEVENT\r\n",
    "END:VCALENDAR\r\n",
);

fn event_of(raw: &str) -> dav_bridge_rs::vobject::Component {
    let calendar = parse_component(raw).expect("output parses");
    calendar.component("VEVENT").expect("VEVENT present").clone()
}

#[test]
fn title_change_touches_only_the_title_and_bookkeeping() {
    let patch = EventPatch {
        summary: Some("Review v2".to_string()),
        ..Default::default()
    };
    let updated = update_ical(RAW, &patch).unwrap();
    let event = event_of(&updated);

    assert_eq!(event.prop_value("SUMMARY").as_deref(), Some("Review v2"));
    assert_eq!(event.prop_value("SEQUENCE").as_deref(), Some("1"));
    // DTSTAMP refreshed to call time.
    let dtstamp = event.prop_value("DTSTAMP").unwrap();
    assert_ne!(dtstamp, "20260101T000000Z");
    assert!(dtstamp.ends_with('Z'));
    // LAST-MODIFIED was present, so it gets refreshed too.
    let last_modified = event.prop_value("LAST-MODIFIED").unwrap();
    assert_ne!(last_modified, "20260101T000000Z");

    // Untouched fields are untouched.
    assert_eq!(
        event.prop_value("DTSTART").as_deref(),
        Some("20260315T140000Z")
    );
    assert_eq!(
        event.prop_value("DTEND").as_deref(),
        Some("20260315T150000Z")
    );
    let calendar = parse_component(&updated).unwrap();
    assert_eq!(calendar.prop_value("VERSION").as_deref(), Some("2.0"));
}

#[test]
fn empty_patch_preserves_alarms_attendees_and_x_properties() {
    let updated = update_ical(RAW, &EventPatch::default()).unwrap();
    let event = event_of(&updated);

    assert_eq!(event.prop_value("SEQUENCE").as_deref(), Some("1"));
    assert_eq!(event.prop_value("SUMMARY").as_deref(), Some("Review"));

    assert_eq!(event.components_named("VALARM").count(), 1);
    let alarm = event.component("VALARM").unwrap();
    assert_eq!(alarm.prop_value("TRIGGER").as_deref(), Some("-PT10M"));

    let attendee = event.prop("ATTENDEE").unwrap();
    assert_eq!(attendee.value, "mailto:jane@example.com");
    assert_eq!(attendee.param_value("CN"), Some("Jane Doe"));
    assert_eq!(attendee.param_value("PARTSTAT"), Some("NEEDS-ACTION"));
    assert_eq!(attendee.param_value("RSVP"), Some("TRUE"));

    assert_eq!(
        event
            .prop_value("X-APPLE-TRAVEL-ADVISORY-BEHAVIOR")
            .as_deref(),
        Some("AUTOMATIC")
    );
}

#[test]
fn last_modified_is_not_invented() {
    let raw = RAW.replace("LAST-MODIFIED:20260101T000000Z\r\n", "");
    let updated = update_ical(&raw, &EventPatch::default()).unwrap();
    let event = event_of(&updated);
    assert!(event.prop_value("LAST-MODIFIED").is_none());
}

#[test]
fn sequence_keeps_counting() {
    let once = update_ical(RAW, &EventPatch::default()).unwrap();
    let twice = update_ical(&once, &EventPatch::default()).unwrap();
    assert_eq!(
        event_of(&twice).prop_value("SEQUENCE").as_deref(),
        Some("2")
    );
}

#[test]
fn rrule_survives_an_update() {
    let raw = RAW.replace(
        "SUMMARY:Review\r\n",
        "SUMMARY:Review\r\nRRULE:FREQ=WEEKLY;BYDAY=MO\r\n",
    );
    let patch = EventPatch {
        summary: Some("X".to_string()),
        ..Default::default()
    };
    let updated = update_ical(&raw, &patch).unwrap();
    let event = event_of(&updated);

    let rrule = event.prop("RRULE").expect("RRULE still present");
    assert!(rrule.value.contains("FREQ=WEEKLY"));
    assert!(rrule.value.contains("BYDAY=MO"));
}

#[test]
fn switching_to_all_day_emits_date_values() {
    let patch = EventPatch {
        start: Some(Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()),
        end: Some(Utc.with_ymd_and_hms(2026, 4, 2, 0, 0, 0).unwrap()),
        all_day: Some(true),
        ..Default::default()
    };
    let updated = update_ical(RAW, &patch).unwrap();
    let event = event_of(&updated);

    let dtstart = event.prop("DTSTART").unwrap();
    assert_eq!(dtstart.value, "20260401");
    assert_eq!(dtstart.param_value("VALUE"), Some("DATE"));
    assert_eq!(event.prop("DTEND").unwrap().value, "20260402");
}

#[test]
fn add_alarm_appends_without_disturbing_existing_ones() {
    let updated = add_alarm(RAW, "15m", None, None).unwrap();
    let event = event_of(&updated);

    let alarms: Vec<_> = event.components_named("VALARM").collect();
    assert_eq!(alarms.len(), 2);
    assert_eq!(alarms[0].prop_value("TRIGGER").as_deref(), Some("-PT10M"));
    assert_eq!(alarms[1].prop_value("TRIGGER").as_deref(), Some("-PT15M"));
    assert_eq!(alarms[1].prop_value("ACTION").as_deref(), Some("DISPLAY"));
    assert_eq!(
        alarms[1].prop_value("DESCRIPTION").as_deref(),
        Some("Reminder")
    );
}

#[test]
fn add_alarm_rejects_garbage_triggers() {
    assert!(add_alarm(RAW, "whenever", None, None).is_err());
}

#[test]
fn remove_alarm_out_of_range_reports_the_count() {
    match remove_alarm(RAW, 5) {
        Err(Error::AlarmIndex { index, count }) => {
            assert_eq!(index, 5);
            assert_eq!(count, 1);
        }
        other => panic!("expected AlarmIndex error, got {other:?}"),
    }
}

#[test]
fn remove_alarm_drops_exactly_the_indexed_one() {
    let two = add_alarm(RAW, "1h", None, None).unwrap();
    let one = remove_alarm(&two, 0).unwrap();
    let event = event_of(&one);
    let alarms: Vec<_> = event.components_named("VALARM").collect();
    assert_eq!(alarms.len(), 1);
    assert_eq!(alarms[0].prop_value("TRIGGER").as_deref(), Some("-PT1H"));
}

#[test]
fn remove_all_alarms_is_a_noop_when_none_exist() {
    let cleared = remove_all_alarms(RAW).unwrap();
    assert_eq!(event_of(&cleared).components_named("VALARM").count(), 0);
    let cleared_again = remove_all_alarms(&cleared).unwrap();
    assert_eq!(
        event_of(&cleared_again).components_named("VALARM").count(),
        0
    );
}

#[test]
fn add_exdate_requires_a_recurring_event() {
    let when = Utc.with_ymd_and_hms(2026, 3, 22, 14, 0, 0).unwrap();
    match add_exdate(RAW, when) {
        Err(Error::NotRecurring) => {}
        other => panic!("expected NotRecurring, got {other:?}"),
    }
}

#[test]
fn add_exdate_matches_the_dtstart_form() {
    let raw = RAW.replace(
        "SUMMARY:Review\r\n",
        "SUMMARY:Review\r\nRRULE:FREQ=WEEKLY\r\n",
    );
    let when = Utc.with_ymd_and_hms(2026, 3, 22, 14, 0, 0).unwrap();
    let updated = add_exdate(&raw, when).unwrap();
    let event = event_of(&updated);
    assert_eq!(
        event.prop("EXDATE").unwrap().value,
        "20260322T140000Z"
    );
}

#[test]
fn respond_rewrites_partstat_and_keeps_other_params() {
    let updated =
        dav_bridge_rs::ical::update_partstat(RAW, "jane@example.com", "ACCEPTED").unwrap();
    let event = event_of(&updated);
    let attendee = event.prop("ATTENDEE").unwrap();
    assert_eq!(attendee.param_value("PARTSTAT"), Some("ACCEPTED"));
    assert_eq!(attendee.param_value("RSVP"), Some("TRUE"));
    assert_eq!(attendee.param_value("CN"), Some("Jane Doe"));
    assert_eq!(attendee.param_value("ROLE"), Some("REQ-PARTICIPANT"));
}

#[test]
fn respond_for_unknown_attendee_is_not_found() {
    match dav_bridge_rs::ical::update_partstat(RAW, "nobody@example.com", "ACCEPTED") {
        Err(Error::NotFound(_)) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}
