use dav_bridge_rs::webdav::parse_multistatus;

#[test]
fn extracts_calendar_collections_with_ctag() {
    let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav" xmlns:CS="http://calendarserver.org/ns/">
  <D:response>
    <D:href>/dav/user01/</D:href>
    <D:propstat>
      <D:prop>
        <C:calendar-home-set>
          <D:href>/dav/user01/</D:href>
        </C:calendar-home-set>
        <D:resourcetype>
          <D:collection/>
        </D:resourcetype>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/dav/user01/personal/</D:href>
    <D:propstat>
      <D:prop>
        <D:displayname>Personal</D:displayname>
        <CS:getctag>ctag-41</CS:getctag>
        <D:resourcetype>
          <D:collection/>
          <C:calendar/>
        </D:resourcetype>
        <C:supported-calendar-component-set>
          <C:comp name="VEVENT"/>
          <C:comp name="VTODO"/>
        </C:supported-calendar-component-set>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    let items = parse_multistatus(xml.as_bytes()).expect("xml parses");
    assert_eq!(items.len(), 2);

    let home = &items[0];
    assert!(home.is_collection);
    assert!(!home.is_calendar);
    assert_eq!(home.calendar_home_set, vec!["/dav/user01/"]);

    let calendar = &items[1];
    assert!(calendar.is_calendar);
    assert_eq!(calendar.href, "/dav/user01/personal/");
    assert_eq!(calendar.displayname.as_deref(), Some("Personal"));
    assert_eq!(calendar.ctag.as_deref(), Some("ctag-41"));
    assert_eq!(
        calendar.supported_components,
        vec!["VEVENT".to_string(), "VTODO".to_string()]
    );
}

#[test]
fn extracts_calendar_data_and_etag_verbatim() {
    let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>/dav/user01/personal/evt-1.ics</D:href>
    <D:propstat>
      <D:prop>
        <D:getetag>"etag-123"</D:getetag>
        <C:calendar-data><![CDATA[BEGIN:VCALENDAR
BEGIN:VEVENT
UID:evt-1
SUMMARY:Lunch
END:VEVENT
END:VCALENDAR
]]></C:calendar-data>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    let items = parse_multistatus(xml.as_bytes()).expect("xml parses");
    assert_eq!(items.len(), 1);
    // The ETag keeps its quotes; it is echoed back exactly on If-Match.
    assert_eq!(items[0].etag.as_deref(), Some("\"etag-123\""));
    let data = items[0].calendar_data.as_ref().expect("data present");
    assert!(data.contains("BEGIN:VEVENT"));
    assert!(data.contains("SUMMARY:Lunch"));
}

#[test]
fn extracts_addressbook_collections_and_address_data() {
    let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:" xmlns:A="urn:ietf:params:xml:ns:carddav" xmlns:CS="http://calendarserver.org/ns/">
  <D:response>
    <D:href>/dav/user01/contacts/</D:href>
    <D:propstat>
      <D:prop>
        <D:displayname>Contacts</D:displayname>
        <CS:getctag>ctag-7</CS:getctag>
        <D:resourcetype>
          <D:collection/>
          <A:addressbook/>
        </D:resourcetype>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/dav/user01/contacts/c1.vcf</D:href>
    <D:propstat>
      <D:prop>
        <D:getetag>"v9"</D:getetag>
        <A:address-data>BEGIN:VCARD
VERSION:3.0
FN:Ada Lovelace
END:VCARD
</A:address-data>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    let items = parse_multistatus(xml.as_bytes()).expect("xml parses");
    assert!(items[0].is_addressbook);
    assert_eq!(items[0].ctag.as_deref(), Some("ctag-7"));
    let card = items[1].address_data.as_ref().expect("vcard present");
    assert!(card.contains("FN:Ada Lovelace"));
}

#[test]
fn extracts_principal_and_scheduling_inbox() {
    let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<D:multistatus xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:response>
    <D:href>/principals/user01/</D:href>
    <D:propstat>
      <D:prop>
        <D:current-user-principal>
          <D:href>/principals/user01/</D:href>
        </D:current-user-principal>
        <C:schedule-inbox-URL>
          <D:href>/dav/user01/inbox/</D:href>
        </C:schedule-inbox-URL>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
</D:multistatus>"#;

    let items = parse_multistatus(xml.as_bytes()).expect("xml parses");
    assert_eq!(items[0].current_user_principal, vec!["/principals/user01/"]);
    assert_eq!(items[0].schedule_inbox.as_deref(), Some("/dav/user01/inbox/"));
}

#[test]
fn malformed_xml_is_an_error() {
    assert!(parse_multistatus(b"<D:multistatus><unclosed").is_err());
}

#[test]
fn empty_multistatus_yields_no_items() {
    let xml = r#"<D:multistatus xmlns:D="DAV:"></D:multistatus>"#;
    assert!(parse_multistatus(xml.as_bytes()).unwrap().is_empty());
}
