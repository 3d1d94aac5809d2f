//! Contacts API: the remote side of the migration.
//!
//! `ContactDirectory` is the seam the pipeline talks to. The HTTP
//! implementation lives in `http`; tests plug in stubs.

pub mod http;

pub use http::HttpContactDirectory;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::ContactError;

/// The part of a remote contact this migration needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteContact {
    #[serde(rename = "contactID", alias = "contactId", alias = "id")]
    pub contact_id: String,
    #[serde(default)]
    pub email: String,
}

/// Raw answer to an update request. Interpreting the status is up to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateResponse {
    pub status: u16,
    pub body: String,
}

impl UpdateResponse {
    pub fn is_applied(&self) -> bool {
        self.status == 200
    }
}

/// Lookup and update of existing contacts. Never creates contacts.
#[async_trait]
pub trait ContactDirectory: Send + Sync {
    /// Display name of the remote system ("Omnisend").
    fn name(&self) -> &str;

    /// Find the contact with this exact email.
    ///
    /// `Ok(None)` means the remote answered and has no such contact. When
    /// several contacts match, the first one returned wins.
    async fn lookup(&self, email: &str) -> Result<Option<RemoteContact>, ContactError>;

    /// Replace the contact's `interests` custom property with `interests`.
    ///
    /// Non-2xx responses are returned, not raised.
    async fn update(
        &self,
        contact_id: &str,
        interests: &[String],
    ) -> Result<UpdateResponse, ContactError>;
}

/// Lookup response envelope: `{"contacts": [...]}`.
#[derive(Debug, Deserialize)]
pub(crate) struct ContactSearch {
    #[serde(default)]
    pub contacts: Vec<RemoteContact>,
}

/// Build the PATCH body for an interests update.
pub fn interests_patch(interests: &[String]) -> serde_json::Value {
    serde_json::json!({
        "customProperties": {
            "interests": interests,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_contact_accepts_wire_field_names() {
        let omnisend: RemoteContact =
            serde_json::from_str(r#"{"contactID": "abc", "email": "a@x.com"}"#).unwrap();
        assert_eq!(omnisend.contact_id, "abc");

        let camel: RemoteContact = serde_json::from_str(r#"{"contactId": "def"}"#).unwrap();
        assert_eq!(camel.contact_id, "def");
        assert_eq!(camel.email, "");
    }

    #[test]
    fn search_envelope_tolerates_missing_list() {
        let search: ContactSearch = serde_json::from_str("{}").unwrap();
        assert!(search.contacts.is_empty());

        let body = r#"{
            "contacts": [{"contactID": "1", "email": "a@x.com", "firstName": "A"}],
            "paging": {}
        }"#;
        let search: ContactSearch = serde_json::from_str(body).unwrap();
        assert_eq!(search.contacts.len(), 1);
    }

    #[test]
    fn patch_body_replaces_interests() {
        let body = interests_patch(&["Ladies".to_string(), "Gentlemen".to_string()]);
        assert_eq!(
            body,
            serde_json::json!({"customProperties": {"interests": ["Ladies", "Gentlemen"]}})
        );
    }

    #[test]
    fn patch_body_with_no_interests_sends_empty_array() {
        let body = interests_patch(&[]);
        assert_eq!(body["customProperties"]["interests"], serde_json::json!([]));
    }

    #[test]
    fn only_200_counts_as_applied() {
        let ok = UpdateResponse { status: 200, body: String::new() };
        let created = UpdateResponse { status: 201, body: String::new() };
        assert!(ok.is_applied());
        assert!(!created.is_applied());
    }
}
