//! OAuth request options and their resolution
//!
//! Three tiers, resolved once at the start of each public operation:
//! per-call options, then the session defaults set with
//! [`set_default_options`], then the library defaults. The embedded
//! [`RequestOptions`] are resolved the same way by the session itself.

use std::sync::Arc;

use api_session::{RequestOptions, Session};

use crate::client::OAuthClient;

/// Options understood by this crate. Anything in `request` is passed
/// through to the API session.
#[derive(Debug, Clone, Default)]
pub struct OAuthOptions {
    /// The OAuth client. Required by `init`, `complete` and `refresh`.
    pub client: Option<Arc<OAuthClient>>,
    /// Whether to add `assert=user` to every request once authorized, so
    /// requests fail instead of silently running anonymously. Defaults to true.
    pub assert_user: Option<bool>,
    pub request: RequestOptions,
}

impl OAuthOptions {
    pub fn with_client(client: Arc<OAuthClient>) -> Self {
        Self {
            client: Some(client),
            ..Self::default()
        }
    }

    pub fn assert_user(mut self, assert_user: bool) -> Self {
        self.assert_user = Some(assert_user);
        self
    }

    fn library_default() -> Self {
        Self {
            client: None,
            assert_user: Some(true),
            request: RequestOptions::default(),
        }
    }
}

/// Session tier, kept in the session's extension slot.
#[derive(Debug, Clone)]
struct SessionDefaults(OAuthOptions);

/// Set the session-default OAuth options, typically the client.
pub fn set_default_options(session: &mut Session, options: OAuthOptions) {
    session.write(|data| data.insert_extension(SessionDefaults(options)));
}

/// Options after resolution.
#[derive(Debug, Clone)]
pub(crate) struct Resolved {
    pub client: Option<Arc<OAuthClient>>,
    pub assert_user: bool,
    pub request: RequestOptions,
}

pub(crate) fn resolve(session: &Session, call: &OAuthOptions) -> Resolved {
    let library = OAuthOptions::library_default();
    let defaults = session
        .read(|data| data.extension::<SessionDefaults>().map(|d| d.0.clone()))
        .unwrap_or_else(OAuthOptions::library_default);

    let client = call
        .client
        .clone()
        .or_else(|| defaults.client.clone())
        .or_else(|| library.client.clone());
    let assert_user = call
        .assert_user
        .or(defaults.assert_user)
        .or(library.assert_user)
        .unwrap_or(true);
    let request = session.resolve_options(&call.request.or(&defaults.request));

    Resolved {
        client,
        assert_user,
        request,
    }
}
