//! OAuth endpoint paths and protocol constants
//!
//! Endpoints are relative to the REST entry point of the API session
//! (`.../w/rest.php`), so the same constants work for every wiki.

/// Authorization endpoint the user is sent to.
pub const AUTHORIZE_PATH: &str = "/oauth2/authorize";

/// Token endpoint for code exchange and token refresh.
pub const ACCESS_TOKEN_PATH: &str = "/oauth2/access_token";

/// API error codes meaning the access token was rejected (usually expired).
/// Only these trigger the automatic refresh-and-replay.
pub const INVALID_AUTHORIZATION_CODES: &[&str] = &["mwoauth-invalid-authorization"];

/// Random bytes behind a PKCE code verifier. 32 bytes encode to exactly 43
/// base64url characters, the minimum verifier length.
pub const VERIFIER_BYTES: usize = 32;
