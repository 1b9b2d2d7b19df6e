/// WebDAV Depth
#[derive(Copy, Clone)]
pub enum Depth {
    Zero,
    One,
    Infinity,
}

impl Depth {
    pub fn as_str(self) -> &'static str {
        match self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "infinity",
        }
    }
}

/// Which DAV flavor an account speaks.
///
/// The two accounts share server URL and credentials; the flavor decides the
/// well-known discovery path, the home-set property, and the object media
/// type.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AccountType {
    CalDav,
    CardDav,
}

impl AccountType {
    pub fn well_known_path(self) -> &'static str {
        match self {
            AccountType::CalDav => "/.well-known/caldav",
            AccountType::CardDav => "/.well-known/carddav",
        }
    }

    pub fn object_content_type(self) -> &'static str {
        match self {
            AccountType::CalDav => "text/calendar; charset=utf-8",
            AccountType::CardDav => "text/vcard; charset=utf-8",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::CalDav => "caldav",
            AccountType::CardDav => "carddav",
        }
    }
}

/// Item extracted from one `<D:response>` of a multistatus body.
///
/// Calendar- and addressbook-specific properties live side by side; each
/// protocol client picks out the fields it cares about.
#[derive(Debug, Clone, Default)]
pub struct DavItem {
    pub href: String,
    pub status: Option<String>,
    pub displayname: Option<String>,
    pub etag: Option<String>,
    pub ctag: Option<String>,
    pub is_collection: bool,
    pub is_calendar: bool,
    pub is_addressbook: bool,
    pub supported_components: Vec<String>,
    pub calendar_data: Option<String>,
    pub address_data: Option<String>,
    pub calendar_home_set: Vec<String>,
    pub addressbook_home_set: Vec<String>,
    pub current_user_principal: Vec<String>,
    pub schedule_inbox: Option<String>,
    pub content_type: Option<String>,
}

impl DavItem {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` when the propstat status for this response reports success.
    pub fn is_ok(&self) -> bool {
        self.status
            .as_deref()
            .is_none_or(|s| s.contains("200") || s.contains("207"))
    }
}
