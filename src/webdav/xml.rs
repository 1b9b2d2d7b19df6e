//! Multistatus (RFC 4918 `207`) parsing.
//!
//! One incremental, namespace-agnostic parser serves both protocols: element
//! names are matched on their local part, and the element stack decides which
//! field of the current [`DavItem`] a text node belongs to. `calendar-data`
//! and `address-data` payloads are accumulated verbatim, everything else is
//! trimmed.

use anyhow::{Result, anyhow};
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, Event};

use crate::webdav::types::DavItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ElementName {
    Multistatus,
    Response,
    Propstat,
    Prop,
    Href,
    Status,
    Displayname,
    Getetag,
    Getctag,
    Resourcetype,
    Collection,
    Calendar,
    Addressbook,
    SupportedCalendarComponentSet,
    Comp,
    CalendarData,
    AddressData,
    CalendarHomeSet,
    AddressbookHomeSet,
    CurrentUserPrincipal,
    ScheduleInboxUrl,
    Getcontenttype,
    Other,
}

fn element_from_bytes(raw: &[u8]) -> ElementName {
    let local = match raw.iter().position(|b| *b == b':') {
        Some(idx) => &raw[idx + 1..],
        None => raw,
    };

    if local.eq_ignore_ascii_case(b"multistatus") {
        ElementName::Multistatus
    } else if local.eq_ignore_ascii_case(b"response") {
        ElementName::Response
    } else if local.eq_ignore_ascii_case(b"propstat") {
        ElementName::Propstat
    } else if local.eq_ignore_ascii_case(b"prop") {
        ElementName::Prop
    } else if local.eq_ignore_ascii_case(b"href") {
        ElementName::Href
    } else if local.eq_ignore_ascii_case(b"status") {
        ElementName::Status
    } else if local.eq_ignore_ascii_case(b"displayname") {
        ElementName::Displayname
    } else if local.eq_ignore_ascii_case(b"getetag") {
        ElementName::Getetag
    } else if local.eq_ignore_ascii_case(b"getctag") {
        ElementName::Getctag
    } else if local.eq_ignore_ascii_case(b"resourcetype") {
        ElementName::Resourcetype
    } else if local.eq_ignore_ascii_case(b"collection") {
        ElementName::Collection
    } else if local.eq_ignore_ascii_case(b"calendar") {
        ElementName::Calendar
    } else if local.eq_ignore_ascii_case(b"addressbook") {
        ElementName::Addressbook
    } else if local.eq_ignore_ascii_case(b"supported-calendar-component-set") {
        ElementName::SupportedCalendarComponentSet
    } else if local.eq_ignore_ascii_case(b"comp") {
        ElementName::Comp
    } else if local.eq_ignore_ascii_case(b"calendar-data") {
        ElementName::CalendarData
    } else if local.eq_ignore_ascii_case(b"address-data") {
        ElementName::AddressData
    } else if local.eq_ignore_ascii_case(b"calendar-home-set") {
        ElementName::CalendarHomeSet
    } else if local.eq_ignore_ascii_case(b"addressbook-home-set") {
        ElementName::AddressbookHomeSet
    } else if local.eq_ignore_ascii_case(b"current-user-principal") {
        ElementName::CurrentUserPrincipal
    } else if local.eq_ignore_ascii_case(b"schedule-inbox-URL") {
        ElementName::ScheduleInboxUrl
    } else if local.eq_ignore_ascii_case(b"getcontenttype") {
        ElementName::Getcontenttype
    } else {
        ElementName::Other
    }
}

struct MultistatusParser {
    stack: Vec<ElementName>,
    current: DavItem,
    items: Vec<DavItem>,
}

impl MultistatusParser {
    fn new() -> Self {
        Self {
            stack: Vec::with_capacity(16),
            current: DavItem::new(),
            items: Vec::new(),
        }
    }

    fn path_ends_with(&self, needle: &[ElementName]) -> bool {
        self.stack.len() >= needle.len()
            && self.stack[self.stack.len() - needle.len()..] == needle[..]
    }

    fn on_start(&mut self, event: &BytesStart<'_>) {
        let element = element_from_bytes(event.name().as_ref());
        self.stack.push(element);

        match element {
            ElementName::Response => {
                self.current = DavItem::new();
            }
            ElementName::Collection => {
                if self.path_ends_with(&[ElementName::Resourcetype, ElementName::Collection]) {
                    self.current.is_collection = true;
                }
            }
            ElementName::Calendar => {
                if self.path_ends_with(&[ElementName::Resourcetype, ElementName::Calendar]) {
                    self.current.is_calendar = true;
                }
            }
            ElementName::Addressbook => {
                if self.path_ends_with(&[ElementName::Resourcetype, ElementName::Addressbook]) {
                    self.current.is_addressbook = true;
                }
            }
            ElementName::Comp => {
                if self.path_ends_with(&[
                    ElementName::SupportedCalendarComponentSet,
                    ElementName::Comp,
                ]) {
                    for attr in event.attributes().with_checks(false).flatten() {
                        let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
                        if key == "name"
                            && let Ok(value) = attr.unescape_value()
                        {
                            let value = value.into_owned();
                            if !value.is_empty()
                                && !self
                                    .current
                                    .supported_components
                                    .iter()
                                    .any(|c| c.eq_ignore_ascii_case(&value))
                            {
                                self.current.supported_components.push(value);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn on_end(&mut self, name: &[u8]) {
        let element = element_from_bytes(name);
        self.stack.pop();
        if element == ElementName::Response {
            let finished = std::mem::take(&mut self.current);
            self.items.push(finished);
        }
    }

    fn on_text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }

        // Object payloads are multi-line and may arrive in chunks; keep them exact.
        if self.path_ends_with(&[ElementName::Prop, ElementName::CalendarData]) {
            match self.current.calendar_data.as_mut() {
                Some(existing) => existing.push_str(&text),
                None => self.current.calendar_data = Some(text),
            }
            return;
        }
        if self.path_ends_with(&[ElementName::Prop, ElementName::AddressData]) {
            match self.current.address_data.as_mut() {
                Some(existing) => existing.push_str(&text),
                None => self.current.address_data = Some(text),
            }
            return;
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }

        if self.path_ends_with(&[ElementName::Response, ElementName::Href]) {
            self.current.href = trimmed.to_string();
        } else if self.path_ends_with(&[ElementName::Response, ElementName::Status])
            || self.path_ends_with(&[
                ElementName::Response,
                ElementName::Propstat,
                ElementName::Status,
            ])
        {
            self.current.status = Some(trimmed.to_string());
        } else if self.path_ends_with(&[ElementName::Prop, ElementName::Displayname]) {
            self.current.displayname = Some(trimmed.to_string());
        } else if self.path_ends_with(&[ElementName::Prop, ElementName::Getetag]) {
            self.current.etag = Some(trimmed.to_string());
        } else if self.path_ends_with(&[ElementName::Prop, ElementName::Getctag]) {
            self.current.ctag = Some(trimmed.to_string());
        } else if self.path_ends_with(&[
            ElementName::Prop,
            ElementName::CalendarHomeSet,
            ElementName::Href,
        ]) {
            self.current.calendar_home_set.push(trimmed.to_string());
        } else if self.path_ends_with(&[
            ElementName::Prop,
            ElementName::AddressbookHomeSet,
            ElementName::Href,
        ]) {
            self.current.addressbook_home_set.push(trimmed.to_string());
        } else if self.path_ends_with(&[
            ElementName::Prop,
            ElementName::CurrentUserPrincipal,
            ElementName::Href,
        ]) {
            self.current
                .current_user_principal
                .push(trimmed.to_string());
        } else if self.path_ends_with(&[
            ElementName::Prop,
            ElementName::ScheduleInboxUrl,
            ElementName::Href,
        ]) {
            self.current.schedule_inbox = Some(trimmed.to_string());
        } else if self.path_ends_with(&[ElementName::Prop, ElementName::Getcontenttype]) {
            self.current.content_type = Some(trimmed.to_string());
        }
    }
}

/// Parse an aggregated multistatus body into one [`DavItem`] per response.
pub fn parse_multistatus(body: &[u8]) -> Result<Vec<DavItem>> {
    let mut xml = Reader::from_reader(body);
    xml.config_mut().trim_text(false);

    let mut buf = Vec::with_capacity(8 * 1024);
    let mut parser = MultistatusParser::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => parser.on_start(&e),
            Ok(Event::Empty(e)) => {
                parser.on_start(&e);
                parser.on_end(e.name().as_ref());
            }
            Ok(Event::Text(e)) => {
                let text = decode_text(e.as_ref())?;
                parser.on_text(text);
            }
            Ok(Event::CData(e)) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                parser.on_text(text);
            }
            Ok(Event::End(e)) => parser.on_end(e.name().as_ref()),
            Ok(Event::Eof) => break,
            Err(e) => return Err(anyhow!("XML error: {e}")),
            _ => {}
        }
        buf.clear();
    }

    Ok(parser.items)
}

fn decode_text(raw: &[u8]) -> Result<String> {
    match std::str::from_utf8(raw) {
        Ok(s) => Ok(unescape(s)
            .map_err(|err| anyhow!("XML decode error: {err}"))?
            .into_owned()),
        Err(_) => Ok(String::from_utf8_lossy(raw).into_owned()),
    }
}

/// Escape text for embedding in an XML request body.
pub fn escape_xml(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
