use anyhow::{Result, anyhow};
use tracing::{debug, info, warn};

use crate::caldav::types::display_name_from_href;
use crate::carddav::types::{AddressBook, AddressObject};
use crate::webdav::client::DavClient;
use crate::webdav::types::{DavItem, Depth};
use crate::webdav::xml::{escape_xml, parse_multistatus};

/// CardDAV protocol client for one account.
#[derive(Clone)]
pub struct CardDavClient {
    dav: DavClient,
}

impl CardDavClient {
    pub fn new(dav: DavClient) -> Self {
        Self { dav }
    }

    pub fn dav(&self) -> &DavClient {
        &self.dav
    }

    /// Full discovery chain: principal, addressbook home set(s), then a
    /// Depth-1 listing of each home.
    pub async fn discover_address_books(&self) -> Result<Vec<AddressBook>> {
        let principal = self
            .dav
            .discover_principal()
            .await?
            .ok_or_else(|| anyhow!("server did not report a current-user-principal"))?;
        let homes = self.dav.discover_home_set(&principal).await?;
        if homes.is_empty() {
            return Err(anyhow!("no addressbook-home-set found for {principal}"));
        }

        let mut books = Vec::new();
        for home in &homes {
            books.extend(self.list_address_books(home).await?);
        }
        books.sort_by(|a, b| a.url.cmp(&b.url));
        books.dedup_by(|a, b| a.url == b.url);

        info!(count = books.len(), "discovered address books");
        for book in &books {
            debug!(
                url = %book.url,
                name = %book.display_name,
                ctag = book.ctag.as_deref().unwrap_or(""),
                "address book"
            );
        }
        Ok(books)
    }

    /// List addressbook collections under a home set (`Depth: 1` PROPFIND).
    pub async fn list_address_books(&self, home_set_path: &str) -> Result<Vec<AddressBook>> {
        let body = r#"<D:propfind xmlns:D="DAV:" xmlns:CS="http://calendarserver.org/ns/">
  <D:prop>
    <D:displayname/>
    <D:resourcetype/>
    <CS:getctag/>
  </D:prop>
</D:propfind>"#;

        let resp = self.dav.propfind(home_set_path, Depth::One, body).await?;
        if !resp.status().is_success() {
            return Err(anyhow!(
                "PROPFIND addressbooks failed with {}",
                resp.status()
            ));
        }
        Ok(map_address_books(parse_multistatus(resp.body())?))
    }

    /// Depth-0 CTag probe for an addressbook collection.
    pub async fn current_ctag(&self, addressbook_url: &str) -> Result<Option<String>> {
        let body = r#"<D:propfind xmlns:D="DAV:" xmlns:CS="http://calendarserver.org/ns/">
  <D:prop>
    <CS:getctag/>
  </D:prop>
</D:propfind>"#;

        let resp = self.dav.propfind(addressbook_url, Depth::Zero, body).await?;
        if !resp.status().is_success() {
            return Err(anyhow!("PROPFIND getctag failed with {}", resp.status()));
        }
        let items = parse_multistatus(resp.body())?;
        Ok(items.into_iter().find_map(|item| item.ctag))
    }

    /// Fetch every vCard in a collection.
    ///
    /// Primary path is an `addressbook-query` for hrefs followed by one
    /// `addressbook-multiget` for the bodies. Some servers implement the
    /// query but not multiget and answer it with an empty multistatus; when
    /// that happens the bodies are fetched with per-item GETs instead.
    pub async fn fetch_address_objects(&self, addressbook_url: &str) -> Result<Vec<AddressObject>> {
        let listing = self.addressbook_query(addressbook_url, false).await?;
        let hrefs: Vec<String> = listing.iter().map(|o| o.url.clone()).collect();
        if hrefs.is_empty() {
            return Ok(Vec::new());
        }

        let via_multiget = self.addressbook_multiget(addressbook_url, &hrefs).await?;
        if !via_multiget.is_empty() {
            return Ok(via_multiget);
        }

        warn!(
            addressbook = %addressbook_url,
            count = hrefs.len(),
            "multiget returned no results, falling back to per-item GETs"
        );
        let mut out = Vec::with_capacity(listing.len());
        for object in listing {
            let resp = self.dav.get(&object.url).await?;
            if !resp.status().is_success() {
                debug!(url = %object.url, status = %resp.status(), "skipping unreadable vcard");
                continue;
            }
            let etag = DavClient::etag_from_headers(resp.headers()).or(object.etag);
            out.push(AddressObject {
                url: object.url,
                etag,
                data: String::from_utf8_lossy(resp.body()).into_owned(),
            });
        }
        Ok(out)
    }

    /// `addressbook-query` REPORT; with `include_data` the vCard bodies are
    /// returned inline, otherwise only hrefs and ETags.
    pub async fn addressbook_query(
        &self,
        addressbook_url: &str,
        include_data: bool,
    ) -> Result<Vec<AddressObject>> {
        let xml = build_addressbook_query_body(include_data);
        let resp = self.dav.report(addressbook_url, Depth::One, &xml).await?;
        if !resp.status().is_success() {
            return Err(anyhow!(
                "REPORT addressbook-query failed with {}",
                resp.status()
            ));
        }
        Ok(map_address_objects(
            parse_multistatus(resp.body())?,
            include_data,
        ))
    }

    /// Fetch specific address objects via `addressbook-multiget`.
    pub async fn addressbook_multiget<I, S>(
        &self,
        addressbook_url: &str,
        hrefs: I,
    ) -> Result<Vec<AddressObject>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Some(body) = build_addressbook_multiget_body(hrefs) else {
            return Ok(Vec::new());
        };
        let resp = self.dav.report(addressbook_url, Depth::One, &body).await?;
        if !resp.status().is_success() {
            return Err(anyhow!(
                "REPORT addressbook-multiget failed with {}",
                resp.status()
            ));
        }
        Ok(map_address_objects(parse_multistatus(resp.body())?, true))
    }
}

fn map_address_books(items: Vec<DavItem>) -> Vec<AddressBook> {
    items
        .into_iter()
        .filter(|item| item.is_addressbook)
        .map(|item| {
            let display_name = item
                .displayname
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| display_name_from_href(&item.href));
            AddressBook {
                url: item.href,
                display_name,
                ctag: item.ctag,
            }
        })
        .collect()
}

fn map_address_objects(items: Vec<DavItem>, require_data: bool) -> Vec<AddressObject> {
    items
        .into_iter()
        .filter(|item| item.is_ok() && !item.href.is_empty())
        .filter(|item| !item.is_collection && !item.is_addressbook)
        .filter_map(|item| {
            if require_data {
                item.address_data.map(|data| AddressObject {
                    url: item.href,
                    etag: item.etag,
                    data,
                })
            } else {
                Some(AddressObject {
                    url: item.href,
                    etag: item.etag,
                    data: String::new(),
                })
            }
        })
        .collect()
}

pub fn build_addressbook_query_body(include_data: bool) -> String {
    let mut prop = String::from("<D:prop><D:getetag/>");
    if include_data {
        prop.push_str("<A:address-data/>");
    }
    prop.push_str("</D:prop>");

    format!(
        r#"<A:addressbook-query xmlns:D="DAV:" xmlns:A="urn:ietf:params:xml:ns:carddav">{prop}<A:filter><A:prop-filter name="FN"/></A:filter></A:addressbook-query>"#
    )
}

pub fn build_addressbook_multiget_body<I, S>(hrefs: I) -> Option<String>
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
        r#"<A:addressbook-multiget xmlns:D="DAV:" xmlns:A="urn:ietf:params:xml:ns:carddav"><D:prop><D:getetag/><A:address-data/></D:prop>{href_xml}</A:addressbook-multiget>"#
    ))
}
