//! OAuth token exchange and refresh
//!
//! Handles the two token endpoint interactions:
//! 1. Authorization code exchange (completing the authorization flow)
//! 2. Token refresh (on request, or from the refresh-retry handler)
//!
//! Both POST a form body to `<rest.php>/oauth2/access_token` through the
//! session's raw POST primitive, so they bypass default parameters, the
//! bearer header and the handler chain.

use api_session::{ApiError, Params, Session};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::OAuthClient;
use crate::constants::ACCESS_TOKEN_PATH;
use crate::error::{Error, Result};

/// Response from the token endpoint for both exchange and refresh.
///
/// Only `access_token` is guaranteed; some grants omit the refresh token.
#[derive(Debug, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
}

/// Token endpoint of the session's wiki.
pub fn access_token_url(session: &Session) -> String {
    format!("{}{}", session.rest_url(), ACCESS_TOKEN_PATH)
}

/// Exchange an authorization code for tokens.
///
/// `verifier` is the PKCE verifier of the attempt that produced the code. It
/// may be absent when authorization was started out of band.
pub async fn exchange_code(
    session: &Session,
    client: &OAuthClient,
    code: &str,
    verifier: Option<&str>,
    user_agent: &str,
) -> Result<TokenResponse> {
    let mut body = Params::new();
    body.insert("grant_type".into(), "authorization_code".into());
    body.insert("code".into(), code.into());
    add_client_credentials(&mut body, client);
    if let Some(verifier) = verifier {
        body.insert("code_verifier".into(), verifier.into());
    }
    post_token_request(session, &body, user_agent).await
}

/// Exchange a refresh token for a new access token.
pub async fn exchange_refresh_token(
    session: &Session,
    client: &OAuthClient,
    refresh_token: &str,
    user_agent: &str,
) -> Result<TokenResponse> {
    let mut body = Params::new();
    body.insert("grant_type".into(), "refresh_token".into());
    body.insert("refresh_token".into(), refresh_token.into());
    add_client_credentials(&mut body, client);
    post_token_request(session, &body, user_agent).await
}

/// `client_id` always; `client_secret` only for confidential clients.
fn add_client_credentials(body: &mut Params, client: &OAuthClient) {
    body.insert("client_id".into(), client.client_id().into());
    if let Some(secret) = client.expose_secret() {
        body.insert("client_secret".into(), secret.into());
    }
}

async fn post_token_request(
    session: &Session,
    body: &Params,
    user_agent: &str,
) -> Result<TokenResponse> {
    let url = access_token_url(session);
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent)
            .map_err(|e| Error::Api(ApiError::InvalidHeader(format!("user-agent: {e}"))))?,
    );

    debug!(
        url = %url,
        grant_type = body.get("grant_type").map(String::as_str),
        "requesting token"
    );
    let response = session
        .internal_post(&url, &Params::new(), body, &headers)
        .await?;

    if response.status != 200 {
        return Err(Error::UnexpectedStatus {
            status: response.status,
        });
    }

    serde_json::from_value(response.body)
        .map_err(|e| Error::InvalidTokenResponse(format!("token endpoint response: {e}")))
}
