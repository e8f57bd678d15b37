//! Serialized form of the OAuth session state
//!
//! The only state that survives a process restart. It holds tokens or the
//! pending PKCE verifier, never the client or the endpoint: the caller
//! supplies both again when deserializing into a fresh session. Storage
//! (file, cookie, database cell) is up to the caller.

use api_session::Session;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::options::{OAuthOptions, resolve};
use crate::retry;
use crate::state::{self, Phase, phase};

/// Flat mapping with at most the keys `codeVerifier` (authorization pending)
/// or `accessToken` and `refreshToken` (authorization complete).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedSession {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

/// Project the session's OAuth state into its serialized form.
pub fn serialize(session: &Session) -> SerializedSession {
    match phase(session) {
        Phase::Absent => SerializedSession::default(),
        Phase::Initialized { verifier, .. } => SerializedSession {
            code_verifier: Some(verifier),
            ..SerializedSession::default()
        },
        Phase::Complete {
            access_token,
            refresh_token,
        } => SerializedSession {
            access_token: Some(access_token),
            refresh_token,
            ..SerializedSession::default()
        },
    }
}

/// Restore OAuth state into a session, typically a fresh one.
///
/// Keys decide the phase: `accessToken` means complete, otherwise
/// `codeVerifier` means pending, otherwise absent. A complete session gets
/// its bearer header, `assert=user` (unless disabled in `options`) and the
/// refresh-retry handler, which refreshes with `options` from now on. Any
/// other phase takes back the bearer header and `assert=user` a previous
/// complete state put there. Makes no requests and does not refresh.
pub fn deserialize(session: &mut Session, serialized: &SerializedSession, options: &OAuthOptions) {
    let restored = match serialized {
        SerializedSession {
            access_token: Some(access_token),
            refresh_token,
            ..
        } => Phase::Complete {
            access_token: access_token.clone(),
            refresh_token: refresh_token.clone(),
        },
        SerializedSession {
            code_verifier: Some(verifier),
            ..
        } => Phase::Initialized {
            verifier: verifier.clone(),
            client: None,
        },
        _ => Phase::Absent,
    };

    let complete = matches!(restored, Phase::Complete { .. });
    let assert_user = resolve(session, options).assert_user;
    state::restore(session, restored, assert_user);
    if complete {
        retry::install(session, options.clone());
        debug!("restored complete OAuth session");
    }
}
