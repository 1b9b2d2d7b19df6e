use anyhow::{Result, anyhow};
use tracing::{debug, info};

use crate::caldav::types::{Calendar, CalendarObject, TimeRange, display_name_from_href};
use crate::webdav::client::DavClient;
use crate::webdav::types::{DavItem, Depth};
use crate::webdav::xml::{escape_xml, parse_multistatus};

/// CalDAV protocol client for one account.
#[derive(Clone)]
pub struct CalDavClient {
    dav: DavClient,
}

impl CalDavClient {
    pub fn new(dav: DavClient) -> Self {
        Self { dav }
    }

    pub fn dav(&self) -> &DavClient {
        &self.dav
    }

    /// Full discovery chain: principal, calendar home set(s), then a Depth-1
    /// listing of each home.
    pub async fn discover_calendars(&self) -> Result<Vec<Calendar>> {
        let principal = self
            .dav
            .discover_principal()
            .await?
            .ok_or_else(|| anyhow!("server did not report a current-user-principal"))?;
        let homes = self.dav.discover_home_set(&principal).await?;
        if homes.is_empty() {
            return Err(anyhow!("no calendar-home-set found for {principal}"));
        }

        let mut calendars = Vec::new();
        for home in &homes {
            calendars.extend(self.list_calendars(home).await?);
        }
        calendars.sort_by(|a, b| a.url.cmp(&b.url));
        calendars.dedup_by(|a, b| a.url == b.url);

        info!(count = calendars.len(), "discovered calendars");
        for calendar in &calendars {
            debug!(
                url = %calendar.url,
                name = %calendar.display_name,
                ctag = calendar.ctag.as_deref().unwrap_or(""),
                "calendar"
            );
        }
        Ok(calendars)
    }

    /// List calendar collections under a home set (`Depth: 1` PROPFIND).
    pub async fn list_calendars(&self, home_set_path: &str) -> Result<Vec<Calendar>> {
        let body = r#"<D:propfind xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav" xmlns:CS="http://calendarserver.org/ns/">
  <D:prop>
    <D:displayname/>
    <D:resourcetype/>
    <CS:getctag/>
    <C:supported-calendar-component-set/>
  </D:prop>
</D:propfind>"#;

        let resp = self.dav.propfind(home_set_path, Depth::One, body).await?;
        if !resp.status().is_success() {
            return Err(anyhow!("PROPFIND calendars failed with {}", resp.status()));
        }
        Ok(map_calendars(parse_multistatus(resp.body())?))
    }

    /// Depth-0 CTag probe: "has this collection changed since I cached it?"
    pub async fn current_ctag(&self, calendar_url: &str) -> Result<Option<String>> {
        let body = r#"<D:propfind xmlns:D="DAV:" xmlns:CS="http://calendarserver.org/ns/">
  <D:prop>
    <CS:getctag/>
  </D:prop>
</D:propfind>"#;

        let resp = self.dav.propfind(calendar_url, Depth::Zero, body).await?;
        if !resp.status().is_success() {
            return Err(anyhow!("PROPFIND getctag failed with {}", resp.status()));
        }
        let items = parse_multistatus(resp.body())?;
        Ok(items.into_iter().find_map(|item| item.ctag))
    }

    /// `calendar-query` REPORT with an optional time-range filter, returning
    /// objects with their bodies.
    pub async fn calendar_query(
        &self,
        calendar_url: &str,
        range: Option<&TimeRange>,
    ) -> Result<Vec<CalendarObject>> {
        let xml = build_calendar_query_body(range);
        let resp = self.dav.report(calendar_url, Depth::One, &xml).await?;
        if !resp.status().is_success() {
            return Err(anyhow!(
                "REPORT calendar-query failed with {}",
                resp.status()
            ));
        }
        Ok(map_objects(parse_multistatus(resp.body())?))
    }

    /// Fetch specific calendar objects via `calendar-multiget`.
    pub async fn calendar_multiget<I, S>(
        &self,
        calendar_url: &str,
        hrefs: I,
    ) -> Result<Vec<CalendarObject>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Some(body) = build_calendar_multiget_body(hrefs) else {
            return Ok(Vec::new());
        };
        let resp = self.dav.report(calendar_url, Depth::One, &body).await?;
        if !resp.status().is_success() {
            return Err(anyhow!(
                "REPORT calendar-multiget failed with {}",
                resp.status()
            ));
        }
        Ok(map_objects(parse_multistatus(resp.body())?))
    }

    /// Server-side `free-busy-query` REPORT. Returns the raw response body;
    /// callers parse it and fall back to event reconstruction on any failure.
    pub async fn free_busy_query(&self, calendar_url: &str, range: &TimeRange) -> Result<String> {
        let body = format!(
            r#"<C:free-busy-query xmlns:C="urn:ietf:params:xml:ns:caldav"><C:time-range start="{}" end="{}"/></C:free-busy-query>"#,
            range.format_start(),
            range.format_end()
        );
        let resp = self.dav.report(calendar_url, Depth::Zero, &body).await?;
        if !resp.status().is_success() {
            return Err(anyhow!(
                "REPORT free-busy-query failed with {}",
                resp.status()
            ));
        }
        let text = String::from_utf8_lossy(resp.body()).into_owned();
        if text.trim().is_empty() {
            return Err(anyhow!("REPORT free-busy-query returned an empty body"));
        }
        Ok(text)
    }

    /// Locate the per-user scheduling inbox, if the server has one.
    ///
    /// Absence (404, permission denied, missing property) is not an error:
    /// invitation listing downgrades to calendar scanning.
    pub async fn discover_scheduling_inbox(&self, principal_url: &str) -> Result<Option<String>> {
        let body = r#"<D:propfind xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav">
  <D:prop>
    <C:schedule-inbox-URL/>
  </D:prop>
</D:propfind>"#;

        let resp = self.dav.propfind(principal_url, Depth::Zero, body).await?;
        if !resp.status().is_success() {
            debug!(
                status = %resp.status(),
                "scheduling inbox discovery unsupported, invitations downgrade"
            );
            return Ok(None);
        }
        let items = parse_multistatus(resp.body())?;
        Ok(items.into_iter().find_map(|item| item.schedule_inbox))
    }
}

fn map_calendars(items: Vec<DavItem>) -> Vec<Calendar> {
    items
        .into_iter()
        .filter(|item| item.is_calendar)
        .map(|item| {
            let display_name = item
                .displayname
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| display_name_from_href(&item.href));
            Calendar {
                url: item.href,
                display_name,
                ctag: item.ctag,
                supported_components: item.supported_components,
            }
        })
        .filter(Calendar::accepts_events)
        .collect()
}

fn map_objects(items: Vec<DavItem>) -> Vec<CalendarObject> {
    items
        .into_iter()
        .filter(|item| item.is_ok())
        .filter_map(|item| {
            item.calendar_data.map(|data| CalendarObject {
                url: item.href,
                etag: item.etag,
                data,
            })
        })
        .collect()
}

pub fn build_calendar_query_body(range: Option<&TimeRange>) -> String {
    let mut filter = String::from(
        "<C:filter><C:comp-filter name=\"VCALENDAR\"><C:comp-filter name=\"VEVENT\">",
    );
    if let Some(range) = range {
        filter.push_str(&format!(
            "<C:time-range start=\"{}\" end=\"{}\"/>",
            range.format_start(),
            range.format_end()
        ));
    }
    filter.push_str("</C:comp-filter></C:comp-filter></C:filter>");

    format!(
        r#"<C:calendar-query xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav"><D:prop><D:getetag/><C:calendar-data/></D:prop>{filter}</C:calendar-query>"#
    )
}

pub fn build_calendar_multiget_body<I, S>(hrefs: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut href_xml = String::new();
    let mut total = 0usize;
    for href in hrefs {
        let href = href.as_ref();
        if href.is_empty() {
            continue;
        }
        total += 1;
        href_xml.push_str("<D:href>");
        href_xml.push_str(&escape_xml(href));
        href_xml.push_str("</D:href>");
    }
    if total == 0 {
        return None;
    }

    Some(format!(
        r#"<C:calendar-multiget xmlns:D="DAV:" xmlns:C="urn:ietf:params:xml:ns:caldav"><D:prop><D:getetag/><C:calendar-data/></D:prop>{href_xml}</C:calendar-multiget>"#
    ))
}
