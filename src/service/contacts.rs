//! Address-book read/write operations, symmetric to the calendar service.

use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::{RwLock, Semaphore};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::carddav::client::CardDavClient;
use crate::carddav::types::{AddressBook, AddressObject};
use crate::common::FANOUT_CONCURRENCY;
use crate::common::cache::CollectionCache;
use crate::common::error::{Error, ResourceKind, Result};
use crate::common::retry::{RetryConfig, with_retries};
use crate::service::calendars::{CreatedObject, collection_of};
use crate::vcard::{ContactRecord, transform_vcard};
use crate::webdav::client::DavClient;

/// Contact operations for one account. Owns its own collection cache.
pub struct AddressBookService {
    client: CardDavClient,
    cache: CollectionCache<AddressObject>,
    address_books: RwLock<Option<Vec<AddressBook>>>,
    retry: RetryConfig,
    default_address_book: Option<String>,
}

impl AddressBookService {
    pub fn new(
        client: CardDavClient,
        retry: RetryConfig,
        default_address_book: Option<String>,
    ) -> Self {
        Self {
            client,
            cache: CollectionCache::new(),
            address_books: RwLock::new(None),
            retry,
            default_address_book,
        }
    }

    pub fn cache(&self) -> &CollectionCache<AddressObject> {
        &self.cache
    }

    /// Discovered address books, fetching them on first use.
    pub async fn list_address_books(&self) -> Result<Vec<AddressBook>> {
        if let Some(books) = self.address_books.read().await.as_ref() {
            return Ok(books.clone());
        }

        let mut slot = self.address_books.write().await;
        if let Some(books) = slot.as_ref() {
            return Ok(books.clone());
        }
        let discovered = with_retries(&self.retry, "discover_address_books", || {
            self.client.discover_address_books()
        })
        .await?;
        *slot = Some(discovered.clone());
        Ok(discovered)
    }

    /// Re-discover address books and drop the object cache.
    pub async fn refresh_address_books(&self) -> Result<Vec<AddressBook>> {
        let discovered = with_retries(&self.retry, "discover_address_books", || {
            self.client.discover_address_books()
        })
        .await?;
        *self.address_books.write().await = Some(discovered.clone());
        self.cache.clear();
        Ok(discovered)
    }

    /// Fetch the vCards of one address book, CTag fast path included.
    pub async fn fetch_contacts(&self, book: &AddressBook) -> Result<Vec<AddressObject>> {
        let advertised = book.ctag.clone().unwrap_or_default();
        if self.cache.is_fresh(&book.url, &advertised)
            && let Some(entry) = self.cache.get(&book.url)
        {
            debug!(address_book = %book.url, "returning cached objects (ctag fresh)");
            return Ok(entry.objects);
        }

        let mut probed: Option<String> = None;
        if let Some(stale) = self.cache.get(&book.url) {
            probed = with_retries(&self.retry, "ctag_probe", || {
                self.client.current_ctag(&book.url)
            })
            .await
            .unwrap_or_default();
            if probed.as_deref() == Some(stale.ctag.as_str()) {
                debug!(address_book = %book.url, "dirty-check reports no change, promoting stale entry");
                self.cache.set(&book.url, &stale.ctag, stale.objects.clone());
                return Ok(stale.objects);
            }
        }

        let objects = with_retries(&self.retry, "fetch_address_objects", || {
            self.client.fetch_address_objects(&book.url)
        })
        .await?;

        let new_ctag = match probed {
            Some(tag) => Some(tag),
            None => with_retries(&self.retry, "ctag_probe", || {
                self.client.current_ctag(&book.url)
            })
            .await
            .unwrap_or_default(),
        };
        match new_ctag {
            Some(tag) if !tag.is_empty() => self.cache.set(&book.url, &tag, objects.clone()),
            _ => self.cache.invalidate(&book.url),
        }
        Ok(objects)
    }

    /// Fetch from the address book whose display name matches,
    /// case-insensitively. An unknown name warns and returns nothing.
    pub async fn fetch_contacts_by_name(&self, name: &str) -> Result<Vec<AddressObject>> {
        match self.find_address_book(Some(name)).await? {
            Some(book) => self.fetch_contacts(&book).await,
            None => {
                warn!(name, "no address book with that name, returning no contacts");
                Ok(Vec::new())
            }
        }
    }

    /// Concurrent fan-out over every discovered address book.
    pub async fn fetch_all_contacts(&self) -> Result<Vec<AddressObject>> {
        let books = self.list_address_books().await?;
        let sem = Arc::new(Semaphore::new(FANOUT_CONCURRENCY));
        let mut tasks = FuturesUnordered::new();

        for book in books {
            let sem = sem.clone();
            tasks.push(async move {
                let _permit = sem.acquire_owned().await.expect("semaphore closed");
                self.fetch_contacts(&book).await
            });
        }

        let mut objects = Vec::new();
        while let Some(result) = tasks.next().await {
            objects.extend(result?);
        }
        Ok(objects)
    }

    /// Create a new vCard in the named (or default, or first) address book.
    pub async fn create_contact(
        &self,
        vcf: &str,
        book_name: Option<&str>,
    ) -> Result<CreatedObject> {
        let book = self
            .find_address_book(book_name)
            .await?
            .ok_or_else(|| match book_name {
                Some(name) => Error::NotFound(format!("no address book named {name:?}")),
                None => Error::NotFound("no address books discovered on this server".into()),
            })?;

        let url = format!("{}/{}.vcf", book.url.trim_end_matches('/'), Uuid::new_v4());
        let body = Bytes::from(vcf.to_owned());

        let resp = with_retries(&self.retry, "create_contact", || {
            self.client.dav().put_if_none_match(&url, body.clone())
        })
        .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::from_status(
                status,
                "create contact",
                ResourceKind::Contact,
            ));
        }

        self.cache.invalidate(&book.url);
        Ok(CreatedObject {
            url,
            etag: DavClient::etag_from_headers(resp.headers()),
        })
    }

    /// Overwrite an existing vCard, guarded by its ETag.
    pub async fn update_contact(&self, url: &str, vcf: &str, etag: &str) -> Result<Option<String>> {
        let body = Bytes::from(vcf.to_owned());
        let resp = with_retries(&self.retry, "update_contact", || {
            self.client.dav().put_if_match(url, body.clone(), etag)
        })
        .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::from_status(
                status,
                "update contact",
                ResourceKind::Contact,
            ));
        }

        self.cache.invalidate(&collection_of(url));
        Ok(DavClient::etag_from_headers(resp.headers()))
    }

    /// Delete a vCard, recovering its ETag from the collection when the
    /// caller has none.
    pub async fn delete_contact(&self, url: &str, etag: Option<&str>) -> Result<()> {
        let collection = collection_of(url);

        let etag = match etag {
            Some(etag) => etag.to_string(),
            None => {
                let objects = with_retries(&self.retry, "addressbook_query", || {
                    self.client.addressbook_query(&collection, false)
                })
                .await?;
                objects
                    .into_iter()
                    .find(|object| object.url == url)
                    .ok_or_else(|| Error::NotFound(format!("no contact at {url}")))?
                    .etag
                    .ok_or_else(|| {
                        Error::Other(anyhow::anyhow!(
                            "contact at {url} has no ETag; cannot delete safely"
                        ))
                    })?
            }
        };

        let resp = with_retries(&self.retry, "delete_contact", || {
            self.client.dav().delete_if_match(url, &etag)
        })
        .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::from_status(
                status,
                "delete contact",
                ResourceKind::Contact,
            ));
        }

        self.cache.invalidate(&collection);
        Ok(())
    }

    /// First contact whose UID matches, searching one address book or all.
    pub async fn find_contact_by_uid(
        &self,
        uid: &str,
        book_name: Option<&str>,
    ) -> Result<Option<ContactRecord>> {
        let objects = match book_name {
            Some(name) => self.fetch_contacts_by_name(name).await?,
            None => self.fetch_all_contacts().await?,
        };
        Ok(objects
            .iter()
            .filter_map(transform_vcard)
            .find(|record| record.uid == uid))
    }

    /// Resolve an address book by name, falling back to the configured
    /// default and then to the first discovered one.
    pub async fn find_address_book(&self, name: Option<&str>) -> Result<Option<AddressBook>> {
        let books = self.list_address_books().await?;
        let by_name = |wanted: &str| {
            books
                .iter()
                .find(|b| b.display_name.eq_ignore_ascii_case(wanted))
                .cloned()
        };
        Ok(match name {
            Some(wanted) => by_name(wanted),
            None => self
                .default_address_book
                .as_deref()
                .and_then(by_name)
                .or_else(|| books.first().cloned()),
        })
    }
}
