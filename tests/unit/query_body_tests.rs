use chrono::{TimeZone, Utc};
use dav_bridge_rs::TimeRange;
use dav_bridge_rs::caldav::{build_calendar_multiget_body, build_calendar_query_body};
use dav_bridge_rs::carddav::{build_addressbook_multiget_body, build_addressbook_query_body};

fn march_range() -> TimeRange {
    TimeRange::new(
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap(),
    )
}

#[test]
fn calendar_query_includes_time_range_when_given() {
    let body = build_calendar_query_body(Some(&march_range()));
    assert!(body.contains(r#"<C:comp-filter name="VEVENT">"#));
    assert!(body.contains(r#"start="20260301T000000Z""#));
    assert!(body.contains(r#"end="20260401T000000Z""#));
    assert!(body.contains("<C:calendar-data/>"));
}

#[test]
fn calendar_query_without_range_has_no_time_filter() {
    let body = build_calendar_query_body(None);
    assert!(!body.contains("time-range"));
    assert!(body.contains(r#"<C:comp-filter name="VCALENDAR">"#));
}

#[test]
fn calendar_multiget_escapes_hrefs_and_skips_empties() {
    let body = build_calendar_multiget_body(["/cal/a&b.ics", "", "/cal/c.ics"]).unwrap();
    assert!(body.contains("<D:href>/cal/a&amp;b.ics</D:href>"));
    assert!(body.contains("<D:href>/cal/c.ics</D:href>"));
    assert_eq!(body.matches("<D:href>").count(), 2);
}

#[test]
fn calendar_multiget_with_no_hrefs_is_none() {
    assert!(build_calendar_multiget_body(Vec::<String>::new()).is_none());
    assert!(build_calendar_multiget_body([""]).is_none());
}

#[test]
fn addressbook_query_toggles_address_data() {
    let with_data = build_addressbook_query_body(true);
    assert!(with_data.contains("<A:address-data/>"));
    let without = build_addressbook_query_body(false);
    assert!(!without.contains("<A:address-data/>"));
    assert!(without.contains("<D:getetag/>"));
}

#[test]
fn addressbook_multiget_lists_every_href() {
    let body = build_addressbook_multiget_body(["/ab/1.vcf", "/ab/2.vcf"]).unwrap();
    assert_eq!(body.matches("<D:href>").count(), 2);
    assert!(body.contains("<A:address-data/>"));
}
