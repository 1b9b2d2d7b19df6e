//! vCard transformation layer: records, a VERSION:3.0 builder, and a
//! preserving editor.
//!
//! No typed vCard model exists that keeps Apple-style grouped properties
//! (`item1.EMAIL` + `item1.X-ABLabel`), PHOTO blobs with their encoding
//! parameters, and arbitrary X-properties intact, so the editor works on the
//! same content-line tree as the calendar editor. Parsed cards may be 3.0 or
//! 4.0; their VERSION is never rewritten.

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::carddav::types::AddressObject;
use crate::common::error::{Error, Result};
use crate::vobject::{Component, Property, escape_text, parse_component, unescape_text};

/// Parsed contact. The raw body, ETag, and URL travel with the record.
#[derive(Debug, Clone)]
pub struct ContactRecord {
    pub uid: String,
    pub formatted_name: String,
    pub given: Option<String>,
    pub family: Option<String>,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub organization: Option<String>,
    pub raw: String,
    pub etag: Option<String>,
    pub url: String,
}

/// Input for [`build_vcard`].
#[derive(Debug, Clone)]
pub struct ContactDraft {
    /// Full display name; the structured name is derived from it.
    pub name: String,
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub organization: Option<String>,
}

/// Field changes for [`update_vcard`]. `None` leaves the corresponding
/// properties untouched; `Some(vec![])` clears a list.
#[derive(Debug, Clone, Default)]
pub struct ContactPatch {
    pub name: Option<String>,
    pub emails: Option<Vec<String>>,
    pub phones: Option<Vec<String>>,
    pub organization: Option<String>,
}

/// A freshly built card and the UID minted for it.
#[derive(Debug, Clone)]
pub struct BuiltContact {
    pub uid: String,
    pub vcf: String,
}

/// Turn a fetched address object into a [`ContactRecord`].
///
/// Returns `None` (logged at debug) when the body is not a parseable vCard
/// with a formatted name; callers skip such objects and keep going.
pub fn transform_vcard(object: &AddressObject) -> Option<ContactRecord> {
    let card = match parse_component(&object.data) {
        Ok(card) if card.is_named("VCARD") => card,
        Ok(_) => {
            debug!(url = %object.url, "address object is not a VCARD");
            return None;
        }
        Err(err) => {
            debug!(url = %object.url, error = %err, "skipping unparseable vcard");
            return None;
        }
    };

    let formatted_name = card.prop_value("FN").unwrap_or_default();
    if formatted_name.is_empty() {
        debug!(url = %object.url, "vCard has no FN");
        return None;
    }

    let uid = card
        .prop_value("UID")
        .filter(|uid| !uid.is_empty())
        .or_else(|| uid_from_url(&object.url))?;

    let (family, given) = card
        .prop("N")
        .map(|n| {
            let mut parts = n.value.split(';');
            let family = parts.next().map(unescape_text).filter(|s| !s.is_empty());
            let given = parts.next().map(unescape_text).filter(|s| !s.is_empty());
            (family, given)
        })
        .unwrap_or((None, None));

    Some(ContactRecord {
        uid,
        formatted_name,
        given,
        family,
        emails: card.props("EMAIL").map(|p| unescape_text(&p.value)).collect(),
        phones: card.props("TEL").map(|p| unescape_text(&p.value)).collect(),
        organization: card
            .prop("ORG")
            .map(|p| unescape_text(p.value.split(';').next().unwrap_or("")))
            .filter(|org| !org.is_empty()),
        raw: object.data.clone(),
        etag: object.etag.clone(),
        url: object.url.clone(),
    })
}

/// Emit a new VERSION:3.0 vCard: generated v4 UID, FN, and an N derived from
/// the display name (family = last whitespace-separated word, given = the
/// rest).
pub fn build_vcard(draft: &ContactDraft) -> BuiltContact {
    let uid = Uuid::new_v4().to_string();
    let (family, given) = split_name(&draft.name);

    let mut card = Component::new("VCARD");
    card.push_property(Property::new("VERSION", "3.0"));
    card.push_property(Property::new("UID", uid.clone()));
    card.push_property(Property::new("FN", escape_text(&draft.name)));
    card.push_property(Property::new(
        "N",
        format!("{};{};;;", escape_text(&family), escape_text(&given)),
    ));
    for email in &draft.emails {
        card.push_property(Property::new("EMAIL", escape_text(email)));
    }
    for phone in &draft.phones {
        card.push_property(Property::new("TEL", escape_text(phone)));
    }
    if let Some(org) = &draft.organization {
        card.push_property(Property::new("ORG", escape_text(org)));
    }

    BuiltContact {
        uid,
        vcf: card.serialize(),
    }
}

/// Apply `patch` to a raw vCard and re-serialize it.
///
/// PHOTO (with its encoding parameters), grouped properties, X-properties,
/// and the original VERSION pass through untouched. REV is refreshed iff
/// already present.
pub fn update_vcard(raw: &str, patch: &ContactPatch) -> Result<String> {
    let mut card = parse_component(raw)?;
    if !card.is_named("VCARD") {
        return Err(Error::Parse("object is not a VCARD".into()));
    }

    if let Some(name) = &patch.name {
        let (family, given) = split_name(name);
        card.upsert_value("FN", escape_text(name));
        card.upsert_value("N", format!("{};{};;;", escape_text(&family), escape_text(&given)));
    }
    if let Some(emails) = &patch.emails {
        card.remove_properties("EMAIL");
        for email in emails {
            card.push_property(Property::new("EMAIL", escape_text(email)));
        }
    }
    if let Some(phones) = &patch.phones {
        card.remove_properties("TEL");
        for phone in phones {
            card.push_property(Property::new("TEL", escape_text(phone)));
        }
    }
    if let Some(org) = &patch.organization {
        card.upsert_value("ORG", escape_text(org));
    }

    if card.prop("REV").is_some() {
        card.upsert_value("REV", Utc::now().format("%Y%m%dT%H%M%SZ").to_string());
    }

    Ok(card.serialize())
}

/// family = last whitespace-separated word, given = everything before it.
fn split_name(name: &str) -> (String, String) {
    match name.trim().rsplit_once(char::is_whitespace) {
        Some((given, family)) => (family.to_string(), given.trim().to_string()),
        None => (name.trim().to_string(), String::new()),
    }
}

fn uid_from_url(url: &str) -> Option<String> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(|segment| segment.trim_end_matches(".vcf"))
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(data: &str) -> AddressObject {
        AddressObject {
            url: "/contacts/card-1.vcf".to_string(),
            etag: Some("\"v1\"".to_string()),
            data: data.to_string(),
        }
    }

    #[test]
    fn build_then_transform_recovers_fields() {
        let built = build_vcard(&ContactDraft {
            name: "Ada Lovelace".to_string(),
            emails: vec!["ada@example.com".to_string()],
            phones: vec!["+44 20 7946 0000".to_string()],
            organization: Some("Analytical Engines".to_string()),
        });

        assert!(built.vcf.contains("VERSION:3.0"));
        assert!(built.vcf.contains("N:Lovelace;Ada;;;"));

        let record = transform_vcard(&object(&built.vcf)).unwrap();
        assert_eq!(record.uid, built.uid);
        assert_eq!(record.formatted_name, "Ada Lovelace");
        assert_eq!(record.family.as_deref(), Some("Lovelace"));
        assert_eq!(record.given.as_deref(), Some("Ada"));
        assert_eq!(record.emails, vec!["ada@example.com"]);
        assert_eq!(record.phones, vec!["+44 20 7946 0000"]);
        assert_eq!(record.organization.as_deref(), Some("Analytical Engines"));
    }

    #[test]
    fn update_preserves_photo_groups_and_version() {
        let raw = "BEGIN:VCARD\r\nVERSION:4.0\r\nUID:abc\r\nFN:Grace Hopper\r\nN:Hopper;Grace;;;\r\nPHOTO;ENCODING=b;TYPE=JPEG:AAAA//88\r\nitem1.EMAIL:grace@example.com\r\nitem1.X-ABLabel:Work\r\nX-CUSTOM;X-FLAG=1:keep-me\r\nEND:VCARD\r\n";

        let patch = ContactPatch {
            name: Some("Grace B. Hopper".to_string()),
            ..Default::default()
        };
        let updated = update_vcard(raw, &patch).unwrap();

        assert!(updated.contains("VERSION:4.0"));
        assert!(updated.contains("PHOTO;ENCODING=b;TYPE=JPEG:AAAA//88"));
        assert!(updated.contains("item1.X-ABLabel:Work"));
        assert!(updated.contains("X-CUSTOM;X-FLAG=1:keep-me"));
        assert!(updated.contains("FN:Grace B. Hopper"));
        assert!(updated.contains("N:Hopper;Grace B.;;;"));
    }

    #[test]
    fn email_patch_replaces_emails_only() {
        let raw = "BEGIN:VCARD\r\nVERSION:3.0\r\nUID:abc\r\nFN:Joan Clarke\r\nEMAIL:old@example.com\r\nTEL:+1 555 0100\r\nEND:VCARD\r\n";
        let patch = ContactPatch {
            emails: Some(vec!["new@example.com".to_string()]),
            ..Default::default()
        };
        let updated = update_vcard(raw, &patch).unwrap();
        assert!(!updated.contains("old@example.com"));
        assert!(updated.contains("EMAIL:new@example.com"));
        assert!(updated.contains("TEL:+1 555 0100"));
    }

    #[test]
    fn missing_fn_is_skipped() {
        let raw = "BEGIN:VCARD\r\nVERSION:3.0\r\nUID:abc\r\nEND:VCARD\r\n";
        assert!(transform_vcard(&object(raw)).is_none());
    }

    #[test]
    fn single_word_name_becomes_family() {
        let (family, given) = split_name("Prince");
        assert_eq!(family, "Prince");
        assert_eq!(given, "");
    }
}
