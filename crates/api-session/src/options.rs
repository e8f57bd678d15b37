//! Request options and their layered resolution
//!
//! Options come from three tiers, resolved once at the start of each
//! operation with the precedence per-call > session default > library
//! default. Every field is optional so an unset field falls through to the
//! next tier.

use std::fmt;

use tokio::time::Instant;

/// HTTP method used for an API request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    #[default]
    Get,
    Post,
}

/// Options recognized by the session. Unset fields fall through to the next
/// tier during resolution.
#[derive(Clone, Default)]
pub struct RequestOptions {
    pub method: Option<Method>,
    /// Value of the `Authorization` header, e.g. `Bearer <token>`.
    pub authorization: Option<String>,
    /// Caller-specific user agent, prefixed to the library's own.
    pub user_agent: Option<String>,
    /// Absolute deadline after which decorators must not retry a request.
    pub retry_until: Option<Instant>,
}

impl RequestOptions {
    /// The library default tier.
    pub fn library_default() -> Self {
        Self {
            method: Some(Method::Get),
            ..Self::default()
        }
    }

    /// Overlay `self` on top of `base`: fields set on `self` win.
    pub fn or(&self, base: &RequestOptions) -> RequestOptions {
        RequestOptions {
            method: self.method.or(base.method),
            authorization: self
                .authorization
                .clone()
                .or_else(|| base.authorization.clone()),
            user_agent: self.user_agent.clone().or_else(|| base.user_agent.clone()),
            retry_until: self.retry_until.or(base.retry_until),
        }
    }

    /// Resolve the three tiers into one set of options.
    pub fn resolve(
        call: &RequestOptions,
        session: &RequestOptions,
        library: &RequestOptions,
    ) -> RequestOptions {
        call.or(&session.or(library))
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("method", &self.method)
            .field(
                "authorization",
                &self.authorization.as_ref().map(|_| "[REDACTED]"),
            )
            .field("user_agent", &self.user_agent)
            .field("retry_until", &self.retry_until)
            .finish()
    }
}
