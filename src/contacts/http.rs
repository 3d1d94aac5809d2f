//! reqwest-backed contacts API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::config::MigrationConfig;
use crate::contacts::{
    ContactDirectory, ContactSearch, RemoteContact, UpdateResponse, interests_patch,
};
use crate::error::ContactError;
use crate::retry::{RetryPolicy, is_retryable_status};

const API_KEY_HEADER: &str = "X-API-KEY";

/// Contacts API over HTTP, one request per call (plus retries if enabled).
pub struct HttpContactDirectory {
    api_base: String,
    api_key: SecretString,
    remote_name: String,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl HttpContactDirectory {
    pub fn new(
        api_base: impl Into<String>,
        api_key: SecretString,
        remote_name: impl Into<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, ContactError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ContactError::Client(e.to_string()))?;

        Ok(Self {
            api_base: api_base.into().trim_end_matches('/').to_string(),
            api_key,
            remote_name: remote_name.into(),
            retry,
            client,
        })
    }

    pub fn from_config(config: &MigrationConfig) -> Result<Self, ContactError> {
        Self::new(
            config.api_base.clone(),
            config.api_key.clone(),
            config.remote_name.clone(),
            config.request_timeout,
            config.retry,
        )
    }

    fn contacts_url(&self) -> String {
        format!("{}/contacts", self.api_base)
    }

    fn contact_url(&self, contact_id: &str) -> String {
        format!("{}/contacts/{contact_id}", self.api_base)
    }

    /// One search request. Returns the status and, on 200, the parsed body.
    async fn search_once(
        &self,
        email: &str,
    ) -> Result<(StatusCode, Vec<RemoteContact>), ContactError> {
        let resp = self
            .client
            .get(self.contacts_url())
            .query(&[("email", email)])
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| ContactError::Request {
                operation: "lookup".into(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if status != StatusCode::OK {
            return Ok((status, Vec::new()));
        }

        let search: ContactSearch = resp.json().await.map_err(|e| ContactError::InvalidResponse {
            operation: "lookup".into(),
            reason: e.to_string(),
        })?;
        Ok((status, search.contacts))
    }

    async fn patch_once(
        &self,
        contact_id: &str,
        body: &serde_json::Value,
    ) -> Result<UpdateResponse, ContactError> {
        let resp = self
            .client
            .patch(self.contact_url(contact_id))
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|e| ContactError::Request {
                operation: "update".into(),
                reason: e.to_string(),
            })?;

        let status = resp.status().as_u16();
        let body = match resp.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!(contact_id, status, error = %e, "Failed to read update response body");
                String::new()
            }
        };
        Ok(UpdateResponse { status, body })
    }
}

/// Transport failures and throttling/server statuses are worth another try.
/// An unparseable body is not.
fn retryable<T>(result: &Result<T, ContactError>, status: impl Fn(&T) -> u16) -> bool {
    match result {
        Err(ContactError::Request { .. }) => true,
        Err(_) => false,
        Ok(value) => is_retryable_status(status(value)),
    }
}

#[async_trait]
impl ContactDirectory for HttpContactDirectory {
    fn name(&self) -> &str {
        &self.remote_name
    }

    async fn lookup(&self, email: &str) -> Result<Option<RemoteContact>, ContactError> {
        let status_of = |(status, _): &(StatusCode, Vec<RemoteContact>)| status.as_u16();
        let (status, contacts) = self
            .retry
            .run(
                "lookup",
                || self.search_once(email),
                |r| retryable(r, status_of),
            )
            .await?;

        if is_retryable_status(status.as_u16()) {
            return Err(ContactError::Unavailable {
                operation: "lookup".into(),
                status: status.as_u16(),
            });
        }
        if status != StatusCode::OK {
            debug!(
                email,
                status = status.as_u16(),
                "Lookup returned non-200, treating as not found"
            );
            return Ok(None);
        }

        if contacts.len() > 1 {
            debug!(email, matches = contacts.len(), "Multiple contacts matched, using the first");
        }
        Ok(contacts.into_iter().next())
    }

    async fn update(
        &self,
        contact_id: &str,
        interests: &[String],
    ) -> Result<UpdateResponse, ContactError> {
        let body = interests_patch(interests);
        self.retry
            .run(
                "update",
                || self.patch_once(contact_id, &body),
                |r| retryable(r, |resp: &UpdateResponse| resp.status),
            )
            .await
    }
}
