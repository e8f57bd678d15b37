//! OAuth client credentials
//!
//! An [`OAuthClient`] pairs the public client id with an optional client
//! secret. The secret lives in a [`Secret`], skipped by `serde` and redacted
//! by `Debug`/`Display`, so logging or serializing a client never leaks it.
//!
//! Clients are compared by identity, not value. Share one client through an
//! `Arc` for the lifetime of an authorization attempt: a different `Arc`
//! counts as a different client even when the values match.

use std::fmt;

use common::Secret;
use serde::Serialize;

/// OAuth 2.0 client credentials.
#[derive(Debug, Serialize)]
pub struct OAuthClient {
    client_id: String,
    #[serde(skip)]
    secret: Option<Secret<String>>,
}

impl OAuthClient {
    pub fn new(client_id: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            client_id: client_id.into(),
            secret: secret.map(Secret::new),
        }
    }

    /// A confidential client, authenticating token requests with its secret.
    pub fn confidential(client_id: impl Into<String>, secret: impl Into<String>) -> Self {
        Self::new(client_id, Some(secret.into()))
    }

    /// A non-confidential client, relying on PKCE alone.
    pub fn public(client_id: impl Into<String>) -> Self {
        Self::new(client_id, None)
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn is_confidential(&self) -> bool {
        self.secret.is_some()
    }

    /// The client secret. Only token requests should call this.
    pub fn expose_secret(&self) -> Option<&str> {
        self.secret.as_ref().map(|s| s.expose().as_str())
    }
}

impl fmt::Display for OAuthClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.client_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_absent_from_every_representation() {
        let client = OAuthClient::confidential("CLIENTID", "CLIENTSECRET");

        let debug = format!("{client:?}");
        let pretty = format!("{client:#?}");
        let display = client.to_string();
        let json = serde_json::to_string(&client).unwrap();
        let value = serde_json::to_value(&client).unwrap();

        for rendered in [&debug, &pretty, &display, &json] {
            assert!(!rendered.contains("CLIENTSECRET"), "leaked in: {rendered}");
        }
        assert!(debug.contains("CLIENTID"));
        assert_eq!(display, "CLIENTID");
        assert_eq!(value, serde_json::json!({"client_id": "CLIENTID"}));
    }

    #[test]
    fn secret_only_through_explicit_accessor() {
        let client = OAuthClient::confidential("CLIENTID", "CLIENTSECRET");
        assert!(client.is_confidential());
        assert_eq!(client.client_id(), "CLIENTID");
        assert_eq!(client.expose_secret(), Some("CLIENTSECRET"));
    }

    #[test]
    fn public_client_has_no_secret() {
        let client = OAuthClient::public("CLIENTID");
        assert!(!client.is_confidential());
        assert_eq!(client.expose_secret(), None);
    }
}
