//! Refresh-and-replay request handler
//!
//! Decorates the session's request path once authorization is complete. When
//! the API rejects the access token, the handler refreshes it and replays the
//! request, at most once per request. Every other outcome, including a
//! second rejection, reaches the caller unchanged.

use std::sync::Arc;

use api_session::{ApiError, ApiRequest, BoxFuture, RequestHandler, Session};
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use crate::constants::INVALID_AUTHORIZATION_CODES;
use crate::options::OAuthOptions;
use crate::state;

/// Whether an API error means the access token was rejected.
pub fn is_invalid_authorization(error: &ApiError) -> bool {
    error
        .code()
        .is_some_and(|code| INVALID_AUTHORIZATION_CODES.contains(&code))
}

/// Put the refresh-retry handler in front of the session's request path.
///
/// The handler refreshes with `options`; the client falls back to the
/// session defaults as usual. Installing again only replaces the options, so
/// a session never gets a second handler.
pub(crate) fn install(session: &mut Session, options: OAuthOptions) {
    if state::set_retry_options(session, options) {
        session.wrap_handler(|inner| Arc::new(RefreshRetry { inner }));
    }
}

struct RefreshRetry {
    inner: Arc<dyn RequestHandler>,
}

impl RequestHandler for RefreshRetry {
    fn handle<'a>(
        &'a self,
        session: &'a Session,
        request: ApiRequest,
    ) -> BoxFuture<'a, api_session::Result<Value>> {
        Box::pin(async move {
            let replay = request.clone();
            let error = match self.inner.handle(session, request).await {
                Err(error) if is_invalid_authorization(&error) => error,
                result => return result,
            };

            if !state::has_refresh_token(session) {
                debug!("access token rejected, no refresh token to recover with");
                return Err(error);
            }
            // Checked only before retrying: the first attempt always runs
            let deadline = session.resolve_options(&replay.options).retry_until;
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                debug!("access token rejected after retry deadline, not refreshing");
                return Err(error);
            }

            debug!(code = error.code(), "access token rejected, refreshing and replaying");
            let options = state::retry_options(session);
            state::refresh(session, &options)
                .await
                .map_err(|e| ApiError::Middleware(Box::new(e)))?;
            self.inner.handle(session, replay).await
        })
    }
}
