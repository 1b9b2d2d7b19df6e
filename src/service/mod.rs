//! Service layer: the paired CalDAV/CardDAV accounts and the operations the
//! tool handlers call.

pub mod calendars;
pub mod contacts;
pub mod freebusy;
pub mod invitations;

use std::time::Duration;

use tracing::info;

use crate::caldav::client::CalDavClient;
use crate::carddav::client::CardDavClient;
use crate::common::config::BridgeConfig;
use crate::common::error::{Error, Result, StartupErrorKind};
use crate::common::retry::RetryConfig;
use crate::webdav::client::DavClient;
use crate::webdav::types::AccountType;

pub use calendars::{CalendarService, CreatedObject};
pub use contacts::AddressBookService;
pub use freebusy::{BusyPeriod, free_busy, merge_busy_periods};
pub use invitations::{Invitation, Partstat, list_pending_invitations};

/// Overall deadline for validating both accounts at startup.
pub const STARTUP_DEADLINE: Duration = Duration::from_secs(15);

/// Deadline for validating a single account.
pub const ACCOUNT_DEADLINE: Duration = Duration::from_secs(10);

/// The two logical accounts of one bridged user: same server and
/// credentials, different discovery paths.
pub struct Accounts {
    pub calendars: CalendarService,
    pub contacts: AddressBookService,
}

impl Accounts {
    /// Build both accounts from one configuration. No network traffic
    /// happens here; call [`Accounts::validate`] to exercise discovery.
    pub fn connect(config: &BridgeConfig) -> Result<Self> {
        config.validate()?;

        let caldav = CalDavClient::new(DavClient::new(config, AccountType::CalDav)?);
        let carddav = CardDavClient::new(DavClient::new(config, AccountType::CardDav)?);

        Ok(Self {
            calendars: CalendarService::new(
                caldav,
                RetryConfig::default(),
                config.default_calendar.clone(),
            ),
            contacts: AddressBookService::new(
                carddav,
                RetryConfig::default(),
                config.default_address_book.clone(),
            ),
        })
    }

    /// Run discovery on both accounts concurrently under [`STARTUP_DEADLINE`].
    ///
    /// Success yields `(calendar count, address book count)`; failure is
    /// categorized into a [`StartupErrorKind`].
    pub async fn validate(&self) -> Result<(usize, usize)> {
        let run = async {
            tokio::try_join!(
                self.calendars.list_calendars(),
                self.contacts.list_address_books()
            )
        };
        match tokio::time::timeout(STARTUP_DEADLINE, run).await {
            Err(_) => Err(Error::Startup {
                kind: StartupErrorKind::Timeout,
                message: format!(
                    "discovery did not finish within {}s; is the server reachable?",
                    STARTUP_DEADLINE.as_secs()
                ),
            }),
            Ok(Err(err)) => Err(into_startup(err)),
            Ok(Ok((calendars, books))) => {
                info!(
                    calendars = calendars.len(),
                    address_books = books.len(),
                    "startup validation succeeded"
                );
                Ok((calendars.len(), books.len()))
            }
        }
    }

    /// Validate only the calendar account, under [`ACCOUNT_DEADLINE`].
    pub async fn validate_calendar_account(&self) -> Result<usize> {
        match tokio::time::timeout(ACCOUNT_DEADLINE, self.calendars.list_calendars()).await {
            Err(_) => Err(Error::Startup {
                kind: StartupErrorKind::Timeout,
                message: "calendar discovery timed out".into(),
            }),
            Ok(Err(err)) => Err(into_startup(err)),
            Ok(Ok(calendars)) => Ok(calendars.len()),
        }
    }

    /// Validate only the address-book account, under [`ACCOUNT_DEADLINE`].
    pub async fn validate_addressbook_account(&self) -> Result<usize> {
        match tokio::time::timeout(ACCOUNT_DEADLINE, self.contacts.list_address_books()).await {
            Err(_) => Err(Error::Startup {
                kind: StartupErrorKind::Timeout,
                message: "address book discovery timed out".into(),
            }),
            Ok(Err(err)) => Err(into_startup(err)),
            Ok(Ok(books)) => Ok(books.len()),
        }
    }
}

fn into_startup(err: Error) -> Error {
    let kind = match &err {
        Error::Auth(_) => StartupErrorKind::Auth,
        Error::Config(_) => StartupErrorKind::Other,
        Error::Other(inner) => StartupErrorKind::classify(inner),
        _ => StartupErrorKind::Other,
    };
    Error::Startup {
        kind,
        message: err.to_string(),
    }
}
