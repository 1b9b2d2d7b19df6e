/// An addressbook collection discovered on the server.
#[derive(Debug, Clone)]
pub struct AddressBook {
    pub url: String,
    pub display_name: String,
    /// Collection change tag. Absent means the collection cannot be cached.
    pub ctag: Option<String>,
}

/// One address object resource: raw vCard body plus its concurrency handles.
#[derive(Debug, Clone)]
pub struct AddressObject {
    pub url: String,
    pub etag: Option<String>,
    pub data: String,
}
