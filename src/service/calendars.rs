//! Calendar read/write operations with CTag-aware caching.

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use hyper::header::{HeaderName, HeaderValue};
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::caldav::client::CalDavClient;
use crate::caldav::types::{Calendar, CalendarObject, TimeRange};
use crate::common::FANOUT_CONCURRENCY;
use crate::common::cache::CollectionCache;
use crate::common::error::{Error, ResourceKind, Result};
use crate::common::retry::{RetryConfig, with_retries};
use crate::ical::event::{EventRecord, transform_calendar_object};
use crate::service::invitations::Partstat;
use crate::webdav::client::DavClient;

/// Outcome of a create: where the object landed and the ETag the server
/// reported for it (absent on servers that omit it from PUT responses).
#[derive(Debug, Clone)]
pub struct CreatedObject {
    pub url: String,
    pub etag: Option<String>,
}

/// Calendar operations for one account. Owns the collection cache; shared
/// across tool handlers behind an `Arc`.
pub struct CalendarService {
    client: CalDavClient,
    cache: CollectionCache<CalendarObject>,
    calendars: RwLock<Option<Vec<Calendar>>>,
    retry: RetryConfig,
    default_calendar: Option<String>,
}

impl CalendarService {
    pub fn new(client: CalDavClient, retry: RetryConfig, default_calendar: Option<String>) -> Self {
        Self {
            client,
            cache: CollectionCache::new(),
            calendars: RwLock::new(None),
            retry,
            default_calendar,
        }
    }

    pub fn cache(&self) -> &CollectionCache<CalendarObject> {
        &self.cache
    }

    /// Discovered calendars, fetching them on first use.
    pub async fn list_calendars(&self) -> Result<Vec<Calendar>> {
        if let Some(calendars) = self.calendars.read().await.as_ref() {
            return Ok(calendars.clone());
        }

        let mut slot = self.calendars.write().await;
        // Another caller may have filled the slot while we waited.
        if let Some(calendars) = slot.as_ref() {
            return Ok(calendars.clone());
        }
        let discovered =
            with_retries(&self.retry, "discover_calendars", || {
                self.client.discover_calendars()
            })
            .await?;
        *slot = Some(discovered.clone());
        Ok(discovered)
    }

    /// Re-discover calendars and drop the object cache (collection URLs may
    /// have changed).
    pub async fn refresh_calendars(&self) -> Result<Vec<Calendar>> {
        let discovered =
            with_retries(&self.retry, "discover_calendars", || {
                self.client.discover_calendars()
            })
            .await?;
        *self.calendars.write().await = Some(discovered.clone());
        self.cache.clear();
        Ok(discovered)
    }

    /// Fetch the objects of one calendar.
    ///
    /// With a time range the server is always consulted (the cache stores
    /// unfiltered collections; a window subsets differently). Without one,
    /// the CTag fast path applies: a fresh cache entry is returned without a
    /// network call, a stale entry is re-validated with a server-side CTag
    /// probe and promoted when the collection turns out unchanged.
    pub async fn fetch_events(
        &self,
        calendar: &Calendar,
        range: Option<&TimeRange>,
    ) -> Result<Vec<CalendarObject>> {
        if let Some(range) = range {
            return Ok(with_retries(&self.retry, "calendar_query", || {
                self.client.calendar_query(&calendar.url, Some(range))
            })
            .await?);
        }

        let advertised = calendar.ctag.clone().unwrap_or_default();
        if self.cache.is_fresh(&calendar.url, &advertised)
            && let Some(entry) = self.cache.get(&calendar.url)
        {
            debug!(calendar = %calendar.url, "returning cached objects (ctag fresh)");
            return Ok(entry.objects);
        }

        let mut probed: Option<String> = None;
        if let Some(stale) = self.cache.get(&calendar.url) {
            probed = with_retries(&self.retry, "ctag_probe", || {
                self.client.current_ctag(&calendar.url)
            })
            .await
            .unwrap_or_default();
            if probed.as_deref() == Some(stale.ctag.as_str()) {
                debug!(calendar = %calendar.url, "dirty-check reports no change, promoting stale entry");
                self.cache.set(&calendar.url, &stale.ctag, stale.objects.clone());
                return Ok(stale.objects);
            }
        }

        let objects = with_retries(&self.retry, "calendar_query", || {
            self.client.calendar_query(&calendar.url, None)
        })
        .await?;

        let new_ctag = match probed {
            Some(tag) => Some(tag),
            None => with_retries(&self.retry, "ctag_probe", || {
                self.client.current_ctag(&calendar.url)
            })
            .await
            .unwrap_or_default(),
        };
        match new_ctag {
            Some(tag) if !tag.is_empty() => self.cache.set(&calendar.url, &tag, objects.clone()),
            // No CTag means no caching for this collection.
            _ => self.cache.invalidate(&calendar.url),
        }
        Ok(objects)
    }

    /// Fetch from the calendar whose display name matches, case-insensitively.
    /// An unknown name is not an error: warn and return nothing.
    pub async fn fetch_events_by_name(
        &self,
        name: &str,
        range: Option<&TimeRange>,
    ) -> Result<Vec<CalendarObject>> {
        match self.find_calendar(Some(name)).await? {
            Some(calendar) => self.fetch_events(&calendar, range).await,
            None => {
                warn!(name, "no calendar with that name, returning no events");
                Ok(Vec::new())
            }
        }
    }

    /// Concurrent fan-out over every discovered calendar.
    pub async fn fetch_all_events(&self, range: Option<&TimeRange>) -> Result<Vec<CalendarObject>> {
        let calendars = self.list_calendars().await?;
        let sem = Arc::new(Semaphore::new(FANOUT_CONCURRENCY));
        let mut tasks = FuturesUnordered::new();

        for calendar in calendars {
            let sem = sem.clone();
            tasks.push(async move {
                let _permit = sem.acquire_owned().await.expect("semaphore closed");
                self.fetch_events(&calendar, range).await
            });
        }

        let mut objects = Vec::new();
        while let Some(result) = tasks.next().await {
            objects.extend(result?);
        }
        Ok(objects)
    }

    /// Create a new event object in the named (or default, or first)
    /// calendar. The resource name is a fresh UUID; `If-None-Match: *` turns
    /// a name collision into a typed conflict instead of an overwrite.
    pub async fn create_event(
        &self,
        ical: &str,
        calendar_name: Option<&str>,
    ) -> Result<CreatedObject> {
        let calendar = self
            .find_calendar(calendar_name)
            .await?
            .ok_or_else(|| match calendar_name {
                Some(name) => Error::NotFound(format!("no calendar named {name:?}")),
                None => Error::NotFound("no calendars discovered on this server".into()),
            })?;

        let url = format!(
            "{}/{}.ics",
            calendar.url.trim_end_matches('/'),
            Uuid::new_v4()
        );
        let body = Bytes::from(ical.to_owned());

        let resp = with_retries(&self.retry, "create_event", || {
            self.client.dav().put_if_none_match(&url, body.clone())
        })
        .await?;
        let status = resp.status();
        if !status.is_success() {
            // 412 here means the generated name already exists server-side.
            return Err(Error::from_status(status, "create event", ResourceKind::Event));
        }

        self.cache.invalidate(&calendar.url);
        Ok(CreatedObject {
            url,
            etag: DavClient::etag_from_headers(resp.headers()),
        })
    }

    /// Overwrite an existing event, guarded by its ETag. Returns the new
    /// ETag when the server reports one.
    pub async fn update_event(&self, url: &str, ical: &str, etag: &str) -> Result<Option<String>> {
        let body = Bytes::from(ical.to_owned());
        let resp = with_retries(&self.retry, "update_event", || {
            self.client.dav().put_if_match(url, body.clone(), etag)
        })
        .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::from_status(status, "update event", ResourceKind::Event));
        }

        self.cache.invalidate(&collection_of(url));
        Ok(DavClient::etag_from_headers(resp.headers()))
    }

    /// Delete an event. Without an ETag the containing collection is listed
    /// to recover one; an event that is not there (or carries no ETag) is a
    /// NotFound, not a conflict.
    pub async fn delete_event(&self, url: &str, etag: Option<&str>) -> Result<()> {
        let collection = collection_of(url);

        let etag = match etag {
            Some(etag) => etag.to_string(),
            None => {
                let objects = with_retries(&self.retry, "calendar_query", || {
                    self.client.calendar_query(&collection, None)
                })
                .await?;
                objects
                    .into_iter()
                    .find(|object| object.url == url)
                    .ok_or_else(|| Error::NotFound(format!("no event at {url}")))?
                    .etag
                    .ok_or_else(|| {
                        Error::Other(anyhow::anyhow!(
                            "event at {url} has no ETag; cannot delete safely"
                        ))
                    })?
            }
        };

        let resp = with_retries(&self.retry, "delete_event", || {
            self.client.dav().delete_if_match(url, &etag)
        })
        .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::from_status(status, "delete event", ResourceKind::Event));
        }

        self.cache.invalidate(&collection);
        Ok(())
    }

    /// First event whose UID matches, searching one calendar or all of them.
    pub async fn find_event_by_uid(
        &self,
        uid: &str,
        calendar_name: Option<&str>,
    ) -> Result<Option<EventRecord>> {
        let objects = match calendar_name {
            Some(name) => self.fetch_events_by_name(name, None).await?,
            None => self.fetch_all_events(None).await?,
        };
        Ok(objects
            .iter()
            .filter_map(transform_calendar_object)
            .find(|record| record.uid == uid))
    }

    /// Objects of an arbitrary collection URL (used for the scheduling
    /// inbox, which is not one of the discovered calendars).
    pub async fn fetch_objects_at(&self, collection_url: &str) -> Result<Vec<CalendarObject>> {
        Ok(with_retries(&self.retry, "calendar_query", || {
            self.client.calendar_query(collection_url, None)
        })
        .await?)
    }

    /// The per-user scheduling inbox, when the server exposes one. `None`
    /// on servers without scheduling support; never an error for that case.
    pub async fn discover_scheduling_inbox(&self) -> Result<Option<String>> {
        let principal = with_retries(&self.retry, "discover_principal", || {
            self.client.dav().discover_principal()
        })
        .await?;
        let Some(principal) = principal else {
            return Ok(None);
        };
        Ok(with_retries(&self.retry, "discover_scheduling_inbox", || {
            self.client.discover_scheduling_inbox(&principal)
        })
        .await?)
    }

    /// Server-side VFREEBUSY REPORT. Errors propagate so the caller can run
    /// the client-side fallback.
    pub async fn free_busy_query(&self, calendar_url: &str, range: &TimeRange) -> Result<String> {
        Ok(with_retries(&self.retry, "free_busy_query", || {
            self.client.free_busy_query(calendar_url, range)
        })
        .await?)
    }

    /// Answer an invitation: rewrite our attendee's PARTSTAT in the raw body
    /// and write it back under `If-Match`.
    pub async fn respond_to_invitation(
        &self,
        url: &str,
        etag: &str,
        user_email: &str,
        partstat: Partstat,
        raw: &str,
    ) -> Result<Option<String>> {
        let updated = crate::ical::edit::update_partstat(raw, user_email, partstat.as_str())?;
        let body = Bytes::from(updated);

        let resp = with_retries(&self.retry, "respond_to_invitation", || {
            self.client.dav().put_if_match(url, body.clone(), etag)
        })
        .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::from_status(
                status,
                "respond to invitation",
                ResourceKind::Invitation,
            ));
        }

        self.cache.invalidate(&collection_of(url));
        Ok(DavClient::etag_from_headers(resp.headers()))
    }

    /// The auth headers the underlying transport injects, for callers that
    /// issue standalone server operations.
    pub fn get_auth_headers(&self) -> Result<Vec<(HeaderName, HeaderValue)>> {
        Ok(self.client.dav().auth_headers()?)
    }

    /// Resolve a calendar by name (case-insensitive), falling back to the
    /// configured default and then to the first discovered calendar.
    pub async fn find_calendar(&self, name: Option<&str>) -> Result<Option<Calendar>> {
        let calendars = self.list_calendars().await?;
        let by_name = |wanted: &str| {
            calendars
                .iter()
                .find(|c| c.display_name.eq_ignore_ascii_case(wanted))
                .cloned()
        };
        Ok(match name {
            Some(wanted) => by_name(wanted),
            None => self
                .default_calendar
                .as_deref()
                .and_then(by_name)
                .or_else(|| calendars.first().cloned()),
        })
    }
}

/// Containing collection of an object URL: everything up to the last path
/// segment, trailing slash kept.
pub(crate) fn collection_of(url: &str) -> String {
    match url.trim_end_matches('/').rfind('/') {
        Some(idx) => url[..=idx].to_string(),
        None => url.to_string(),
    }
}
