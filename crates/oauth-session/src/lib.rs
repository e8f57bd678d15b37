//! OAuth 2.0 authorization for API sessions
//!
//! Drives the Authorization Code flow with PKCE against a MediaWiki-style
//! OAuth provider and keeps the resulting tokens fresh. The state is attached
//! to an [`api_session::Session`] and survives restarts through
//! [`serialize`]/[`deserialize`].
//!
//! Flow:
//! 1. Caller sets the client with `set_default_options` (or per call)
//! 2. `init()` returns the authorize URL; the user authorizes out of band
//! 3. `complete()` exchanges the callback's code for tokens
//! 4. `serialize()` produces the blob the caller stores
//! 5. A later process calls `deserialize()` on a fresh session
//! 6. Requests rejected with an invalid access token are refreshed and
//!    replayed once by the handler installed in steps 3 and 5

pub mod client;
pub mod codec;
pub mod constants;
pub mod error;
pub mod options;
pub mod pkce;
pub mod retry;
pub mod state;
pub mod token;

#[cfg(test)]
pub(crate) mod testing;

pub use client::OAuthClient;
pub use codec::{SerializedSession, deserialize, serialize};
pub use constants::*;
pub use error::{Error, Result};
pub use options::{OAuthOptions, set_default_options};
pub use pkce::{ChallengeMethod, PkceMaterial};
pub use retry::is_invalid_authorization;
pub use state::{complete, init, is_complete, refresh};
pub use token::{TokenResponse, exchange_code, exchange_refresh_token};
