//! OAuth session state machine
//!
//! The state lives in the API session's extension slot and is only reached
//! through the accessors in this module, which keep the phase moving forward:
//!
//! - `Absent` → `Initialized` (`init`, or `deserialize` with a verifier)
//! - `Initialized` → `Complete` (`complete`, or `deserialize` with tokens)
//! - `Complete` → `Complete` (`refresh`)
//!
//! `complete` also works from `Absent` when authorization happened out of
//! band, in which case the exchange carries no PKCE verifier.

use std::sync::Arc;

use api_session::{Session, SessionData};
use reqwest::Url;
use tracing::{debug, info};

use crate::client::OAuthClient;
use crate::constants::AUTHORIZE_PATH;
use crate::error::{Error, Result};
use crate::options::{OAuthOptions, resolve};
use crate::pkce::{self, PkceMaterial};
use crate::retry;
use crate::token;

#[derive(Debug, Clone, Default)]
pub(crate) enum Phase {
    #[default]
    Absent,
    /// Authorization started; waiting for the callback.
    Initialized {
        verifier: String,
        /// Client the attempt was started with. `None` after deserializing,
        /// until the next `init` binds one.
        client: Option<Arc<OAuthClient>>,
    },
    Complete {
        access_token: String,
        refresh_token: Option<String>,
    },
}

/// Per-session OAuth bookkeeping.
#[derive(Debug, Clone, Default)]
pub(crate) struct OAuthState {
    phase: Phase,
    /// Options the refresh-retry handler refreshes with. `Some` once the
    /// handler is installed; the latest installation wins.
    retry_options: Option<OAuthOptions>,
    /// `assert=user` in the default parameters was put there by this crate.
    assert_installed: bool,
}

fn state_mut(data: &mut SessionData) -> &mut OAuthState {
    data.extension_or_default::<OAuthState>()
}

fn read_state<R>(session: &Session, f: impl FnOnce(&OAuthState) -> R) -> Option<R> {
    session.read(|data| data.extension::<OAuthState>().map(f))
}

pub(crate) fn phase(session: &Session) -> Phase {
    read_state(session, |state| state.phase.clone()).unwrap_or_default()
}

/// Replace the phase wholesale. Only the codec restores state this way.
///
/// Restoring a complete phase authorizes the session. Any other phase
/// removes the bearer header and the `assert` parameter this crate added.
pub(crate) fn restore(session: &Session, phase: Phase, assert_user: bool) {
    session.write(|data| match phase {
        Phase::Complete {
            access_token,
            refresh_token,
        } => authorize(data, access_token, refresh_token, assert_user),
        other => {
            deauthorize(data);
            state_mut(data).phase = other;
        }
    });
}

/// Record the options the refresh-retry handler uses. Returns true if no
/// handler was installed yet.
pub(crate) fn set_retry_options(session: &Session, options: OAuthOptions) -> bool {
    session.write(|data| state_mut(data).retry_options.replace(options).is_none())
}

pub(crate) fn retry_options(session: &Session) -> OAuthOptions {
    read_state(session, |state| state.retry_options.clone())
        .flatten()
        .unwrap_or_default()
}

/// Whether a refresh token is held.
pub(crate) fn has_refresh_token(session: &Session) -> bool {
    read_state(session, |state| {
        matches!(
            state.phase,
            Phase::Complete {
                refresh_token: Some(_),
                ..
            }
        )
    })
    .unwrap_or(false)
}

/// Enter the complete phase: bearer header, and `assert=user` unless disabled.
fn authorize(
    data: &mut SessionData,
    access_token: String,
    refresh_token: Option<String>,
    assert_user: bool,
) {
    data.default_options.authorization = Some(format!("Bearer {access_token}"));
    let installed = state_mut(data).assert_installed;
    if assert_user {
        data.default_params.insert("assert".into(), "user".into());
    } else if installed {
        data.default_params.remove("assert");
    }

    let state = state_mut(data);
    state.assert_installed = assert_user;
    state.phase = Phase::Complete {
        access_token,
        refresh_token,
    };
}

fn deauthorize(data: &mut SessionData) {
    let state = state_mut(data);
    let was_complete = matches!(state.phase, Phase::Complete { .. });
    let assert_installed = std::mem::take(&mut state.assert_installed);
    if was_complete {
        data.default_options.authorization = None;
    }
    if assert_installed {
        data.default_params.remove("assert");
    }
}

/// Start (or resume) authorization and return the URL to send the user to.
///
/// Calling this again before completion returns the same URL: the verifier
/// is reused as long as the client is the same `Arc`. A different client
/// discards the pending attempt and starts a new one.
pub fn init(session: &mut Session, options: &OAuthOptions) -> Result<String> {
    let resolved = resolve(session, options);
    let client = resolved.client.ok_or(Error::MissingClient)?;

    let pending = match phase(session) {
        Phase::Absent => None,
        Phase::Initialized {
            verifier,
            client: bound,
        } => match bound {
            Some(bound) if !Arc::ptr_eq(&bound, &client) => {
                debug!(
                    client_id = client.client_id(),
                    "client changed, discarding pending authorization"
                );
                None
            }
            _ => Some(verifier),
        },
        Phase::Complete { .. } => return Err(Error::AlreadyComplete),
    };

    let material = match pending {
        Some(verifier) => PkceMaterial::from_verifier(verifier),
        None => {
            let material = pkce::generate();
            debug!(method = material.method.as_str(), "generated PKCE material");
            material
        }
    };

    let url = authorize_url(session, &client, &material)?;
    session.write(|data| {
        state_mut(data).phase = Phase::Initialized {
            verifier: material.verifier,
            client: Some(client),
        };
    });
    Ok(url)
}

/// Complete authorization with the URL the user was redirected back to.
///
/// Exchanges the `code` from the callback for tokens, then sets up the
/// session for authenticated requests: bearer header, `assert=user` (unless
/// disabled) and the refresh-retry handler.
pub async fn complete(
    session: &mut Session,
    callback_url: &str,
    options: &OAuthOptions,
) -> Result<()> {
    let resolved = resolve(session, options);
    let client = resolved.client.ok_or(Error::MissingClient)?;
    let code = callback_code(session, callback_url)?;

    let verifier = match phase(session) {
        Phase::Initialized { verifier, .. } => Some(verifier),
        _ => None,
    };
    let user_agent = session.user_agent(&resolved.request);
    let token =
        token::exchange_code(session, &client, &code, verifier.as_deref(), &user_agent).await?;

    session.write(|data| {
        authorize(
            data,
            token.access_token,
            token.refresh_token,
            resolved.assert_user,
        );
    });
    retry::install(session, options.clone());

    info!(client_id = client.client_id(), "OAuth authorization complete");
    Ok(())
}

/// Get a new access token with the stored refresh token.
///
/// The refresh token is replaced only if the server sent a new one. On
/// failure the stored tokens are left as they were. Takes a shared session
/// so the refresh-retry handler can call it while other requests are in
/// flight.
pub async fn refresh(session: &Session, options: &OAuthOptions) -> Result<()> {
    let refresh_token = match phase(session) {
        Phase::Complete {
            refresh_token: Some(refresh_token),
            ..
        } => refresh_token,
        _ => return Err(Error::RefreshUnavailable),
    };

    let resolved = resolve(session, options);
    let client = resolved.client.ok_or(Error::MissingClient)?;
    let user_agent = session.user_agent(&resolved.request);
    let token =
        token::exchange_refresh_token(session, &client, &refresh_token, &user_agent).await?;

    let rotated = token.refresh_token.is_some();
    session.write(|data| {
        data.default_options.authorization = Some(format!("Bearer {}", token.access_token));
        state_mut(data).phase = Phase::Complete {
            access_token: token.access_token,
            refresh_token: token.refresh_token.or(Some(refresh_token)),
        };
    });

    info!(rotated, "OAuth access token refreshed");
    Ok(())
}

/// Whether this crate completed authorization for the session.
///
/// An `authorization` option set by hand does not count.
pub fn is_complete(session: &Session) -> bool {
    matches!(phase(session), Phase::Complete { .. })
}

fn authorize_url(session: &Session, client: &OAuthClient, pkce: &PkceMaterial) -> Result<String> {
    let endpoint = format!("{}{}", session.rest_url(), AUTHORIZE_PATH);
    let mut url =
        Url::parse(&endpoint).map_err(|e| Error::InvalidUrl(format!("{endpoint}: {e}")))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", client.client_id())
        .append_pair("code_challenge", &pkce.challenge)
        .append_pair("code_challenge_method", pkce.method.as_str());
    Ok(url.into())
}

/// Extract the authorization code. Relative callback URLs are resolved
/// against the API origin.
fn callback_code(session: &Session, callback_url: &str) -> Result<String> {
    let origin = Url::parse(session.api_url())
        .and_then(|api| api.join("/"))
        .map_err(|e| Error::InvalidUrl(format!("{}: {e}", session.api_url())))?;
    let url = origin
        .join(callback_url)
        .map_err(|e| Error::InvalidCallback(format!("{callback_url}: {e}")))?;

    let mut code = None;
    let mut provider_error = None;
    for (key, value) in url.query_pairs() {
        match &*key {
            "code" if !value.is_empty() => code = Some(value.into_owned()),
            "error" => provider_error = Some(value.into_owned()),
            _ => {}
        }
    }

    code.ok_or_else(|| match provider_error {
        Some(error) => Error::InvalidCallback(format!("authorization server returned {error}")),
        None => Error::InvalidCallback(format!("no code in {callback_url}")),
    })
}
