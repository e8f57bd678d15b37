//! Minimal MediaWiki-style API session
//!
//! Provides the pieces an authentication layer needs from an API client and
//! nothing more: the API URL, session-wide default parameters and request
//! options shared by concurrent requests, a raw POST primitive, the
//! user-agent convention, and a generic request entry point that dispatches
//! through a chain of [`RequestHandler`]s.
//!
//! Authentication crates keep their own state in the session's typed
//! extension slot and decorate the request entry point with
//! [`Session::wrap_handler`] instead of replacing it.

pub mod error;
pub mod options;
pub mod session;
pub mod transport;

pub use error::{ApiError, Result};
pub use options::{Method, RequestOptions};
pub use session::{ApiRequest, BoxFuture, Params, RequestHandler, Session, SessionData};
pub use transport::{RawResponse, ReqwestTransport, Transport};
