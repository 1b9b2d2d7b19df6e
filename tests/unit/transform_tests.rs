use chrono::{TimeZone, Utc};
use dav_bridge_rs::ical::{EventDraft, EventStatus, build_ical, transform_calendar_object};
use dav_bridge_rs::vcard::{ContactDraft, build_vcard, transform_vcard};
use dav_bridge_rs::{AddressObject, CalendarObject};

fn object(data: &str) -> CalendarObject {
    CalendarObject {
        url: "/cal/personal/evt-1.ics".to_string(),
        etag: Some("\"v3\"".to_string()),
        data: data.to_string(),
    }
}

#[test]
fn transforms_a_full_event() {
    let raw = concat!(
        "BEGIN:VCALENDAR\r\n",
        "VERSION:2.0\r\n",
        "BEGIN:VEVENT\r\n",
        "UID:evt-1\r\n",
        "DTSTAMP:20260101T000000Z\r\n",
        "DTSTART:20260315T140000Z\r\n",
        "DTEND:20260315T150000Z\r\n",
        "SUMMARY:Quarterly review\r\n",
        "DESCRIPTION:Bring the numbers\r\n",
        "LOCATION:Room 4\r\n",
        "STATUS:TENTATIVE\r\n",
        "SEQUENCE:2\r\n",
        "TRANSP:TRANSPARENT\r\n",
        "ORGANIZER;CN=Boss:mailto:boss@example.com\r\n",
        "ATTENDEE;CN=Jane Doe;ROLE=REQ-PARTICIPANT;PARTSTAT=ACCEPTED:mailto:jane@example.com\r\n",
        "ATTENDEE;CN=Joe Bloggs;PARTSTAT=NEEDS-ACTION:mailto:joe@example.com\r\n",
        "END:VEVENT\r\n",
        "END:VCALENDAR\r\n",
    );

    let record = transform_calendar_object(&object(raw)).expect("event parses");
    assert_eq!(record.uid, "evt-1");
    assert_eq!(record.summary, "Quarterly review");
    assert_eq!(
        record.start,
        Utc.with_ymd_and_hms(2026, 3, 15, 14, 0, 0).unwrap()
    );
    assert_eq!(
        record.end,
        Utc.with_ymd_and_hms(2026, 3, 15, 15, 0, 0).unwrap()
    );
    assert_eq!(record.description.as_deref(), Some("Bring the numbers"));
    assert_eq!(record.location.as_deref(), Some("Room 4"));
    assert_eq!(record.status, EventStatus::Tentative);
    assert_eq!(record.sequence, 2);
    assert!(record.transparent);
    assert!(!record.is_recurring);
    assert_eq!(record.organizer.as_deref(), Some("boss@example.com"));

    assert_eq!(record.attendees.len(), 2);
    let jane = &record.attendees[0];
    assert_eq!(jane.email, "jane@example.com");
    assert_eq!(jane.name.as_deref(), Some("Jane Doe"));
    assert_eq!(jane.role.as_deref(), Some("REQ-PARTICIPANT"));
    assert_eq!(jane.partstat.as_deref(), Some("ACCEPTED"));
    assert!(record.attendees[1].needs_action());

    // Raw body, ETag, and URL ride along for the write path.
    assert_eq!(record.raw, raw);
    assert_eq!(record.etag.as_deref(), Some("\"v3\""));
    assert_eq!(record.url, "/cal/personal/evt-1.ics");
}

#[test]
fn missing_uid_or_dtstart_yields_none() {
    let no_uid = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nDTSTART:20260315T140000Z\r\nSUMMARY:x\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
    assert!(transform_calendar_object(&object(no_uid)).is_none());

    let no_start = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:evt\r\nSUMMARY:x\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
    assert!(transform_calendar_object(&object(no_start)).is_none());

    let bad_start = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:evt\r\nDTSTART:tomorrow\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
    assert!(transform_calendar_object(&object(bad_start)).is_none());

    assert!(transform_calendar_object(&object("not an icalendar body")).is_none());
}

#[test]
fn all_day_events_use_date_values() {
    let raw = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:evt-2\r\nDTSTART;VALUE=DATE:20260401\r\nDTEND;VALUE=DATE:20260402\r\nSUMMARY:Offsite\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
    let record = transform_calendar_object(&object(raw)).unwrap();
    assert!(record.all_day);
    assert_eq!(
        record.start,
        Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()
    );
    assert_eq!(record.end, Utc.with_ymd_and_hms(2026, 4, 2, 0, 0, 0).unwrap());
}

#[test]
fn tzid_start_is_converted_to_utc() {
    let raw = "BEGIN:VCALENDAR\r\nBEGIN:VEVENT\r\nUID:evt-3\r\nDTSTART;TZID=Europe/Paris:20260715T100000\r\nDTEND;TZID=Europe/Paris:20260715T110000\r\nSUMMARY:Café\r\nEND:VEVENT\r\nEND:VCALENDAR\r\n";
    let record = transform_calendar_object(&object(raw)).unwrap();
    // Paris is UTC+2 in July.
    assert_eq!(
        record.start,
        Utc.with_ymd_and_hms(2026, 7, 15, 8, 0, 0).unwrap()
    );
    assert_eq!(record.timezone.as_deref(), Some("Europe/Paris"));
}

#[test]
fn built_event_round_trips_through_the_transformer() {
    let built = build_ical(&EventDraft {
        title: "Review".to_string(),
        start: Utc.with_ymd_and_hms(2026, 3, 15, 14, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2026, 3, 15, 15, 0, 0).unwrap(),
        all_day: false,
        description: Some("Quarterly numbers".to_string()),
        location: Some("Room 4".to_string()),
        rrule: None,
    });

    assert!(built.ical.contains("VERSION:2.0"));
    // UUIDv4-shaped: 36 chars, 5 dash-separated groups.
    assert_eq!(built.uid.len(), 36);
    assert_eq!(built.uid.split('-').count(), 5);

    let record = transform_calendar_object(&object(&built.ical)).expect("built event parses");
    assert_eq!(record.uid, built.uid);
    assert_eq!(record.summary, "Review");
    assert_eq!(
        record.start,
        Utc.with_ymd_and_hms(2026, 3, 15, 14, 0, 0).unwrap()
    );
    assert_eq!(
        record.end,
        Utc.with_ymd_and_hms(2026, 3, 15, 15, 0, 0).unwrap()
    );
    assert_eq!(record.description.as_deref(), Some("Quarterly numbers"));
    assert_eq!(record.location.as_deref(), Some("Room 4"));
    assert!(!record.all_day);
}

#[test]
fn built_all_day_event_emits_date_only_values() {
    let built = build_ical(&EventDraft {
        title: "Offsite".to_string(),
        start: Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2026, 4, 2, 0, 0, 0).unwrap(),
        all_day: true,
        description: None,
        location: None,
        rrule: None,
    });

    assert!(built.ical.contains("20260401"));
    assert!(!built.ical.contains("DTSTART:20260401T"));

    let record = transform_calendar_object(&object(&built.ical)).unwrap();
    assert!(record.all_day);
}

#[test]
fn built_recurring_event_keeps_its_rule() {
    let built = build_ical(&EventDraft {
        title: "Standup".to_string(),
        start: Utc.with_ymd_and_hms(2026, 3, 16, 9, 0, 0).unwrap(),
        end: Utc.with_ymd_and_hms(2026, 3, 16, 9, 15, 0).unwrap(),
        all_day: false,
        description: None,
        location: None,
        rrule: Some("FREQ=WEEKLY;BYDAY=MO".to_string()),
    });

    let record = transform_calendar_object(&object(&built.ical)).unwrap();
    assert!(record.is_recurring);
    assert_eq!(record.rrule.as_deref(), Some("FREQ=WEEKLY;BYDAY=MO"));
}

#[test]
fn built_vcard_has_a_v4_uid() {
    let built = build_vcard(&ContactDraft {
        name: "Ada Lovelace".to_string(),
        emails: vec![],
        phones: vec![],
        organization: None,
    });
    assert_eq!(built.uid.len(), 36);
    assert_eq!(built.uid.split('-').count(), 5);

    let record = transform_vcard(&AddressObject {
        url: "/ab/x.vcf".to_string(),
        etag: None,
        data: built.vcf.clone(),
    })
    .unwrap();
    assert_eq!(record.uid, built.uid);
}
