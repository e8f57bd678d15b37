//! The API session and its request handler chain
//!
//! A [`Session`] owns everything that is shared between requests: the API
//! URL, default parameters and options, the transport, and a typed extension
//! slot where other crates keep per-session state. Requests go through
//! [`Session::request`], which dispatches to the outermost
//! [`RequestHandler`]. The innermost handler sends the request over the
//! transport; decorators added with [`Session::wrap_handler`] sit in front of
//! it.
//!
//! Requests only need `&Session`, so several can be in flight at once. The
//! mutable part of the session ([`SessionData`]) sits behind a lock that is
//! only reachable through [`Session::read`] and [`Session::write`]; their
//! closures are synchronous, so a guard is never held across an await.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, PoisonError, RwLock};

use http::Extensions;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::options::{Method, RequestOptions};
use crate::transport::{RawResponse, ReqwestTransport, Transport};

/// Request parameters, sorted by name.
pub type Params = BTreeMap<String, String>;

/// Boxed `Send` future used by the dyn-compatible traits of this crate.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Library component of every user agent.
const LIBRARY_USER_AGENT: &str = concat!("api-session/", env!("CARGO_PKG_VERSION"));

/// One invocation of the generic request entry point.
///
/// Carries only the per-call parameters and options; session defaults are
/// merged in when the request is finally sent, so a decorator that replays a
/// request picks up defaults changed in between.
#[derive(Debug, Clone, Default)]
pub struct ApiRequest {
    pub params: Params,
    pub options: RequestOptions,
}

/// A step in the request path.
///
/// Decorators receive the handler they wrap at construction time and call it
/// with the same session they were given.
pub trait RequestHandler: Send + Sync {
    fn handle<'a>(&'a self, session: &'a Session, request: ApiRequest)
    -> BoxFuture<'a, Result<Value>>;
}

/// Innermost handler: sends the request over the session's transport.
struct TransportHandler;

impl RequestHandler for TransportHandler {
    fn handle<'a>(
        &'a self,
        session: &'a Session,
        request: ApiRequest,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(session.send(request))
    }
}

/// Mutable per-session state shared by all requests.
#[derive(Debug, Default)]
pub struct SessionData {
    /// Parameters added to every request (per-call parameters win).
    pub default_params: Params,
    /// Session tier of the request options.
    pub default_options: RequestOptions,
    extensions: Extensions,
}

impl SessionData {
    pub fn extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions.get::<T>()
    }

    /// Get the extension of type `T`, inserting `T::default()` first if absent.
    pub fn extension_or_default<T>(&mut self) -> &mut T
    where
        T: Default + Clone + Send + Sync + 'static,
    {
        self.extensions.get_or_insert_default::<T>()
    }

    pub fn insert_extension<T>(&mut self, value: T) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.extensions.insert(value)
    }
}

/// A session against one API endpoint.
pub struct Session {
    api_url: String,
    transport: Arc<dyn Transport>,
    handler: Arc<dyn RequestHandler>,
    data: RwLock<SessionData>,
}

impl Session {
    /// Create a session using the `reqwest` transport.
    ///
    /// `api` is either a full API URL or a bare domain such as
    /// `en.wikipedia.org`, which expands to `https://en.wikipedia.org/w/api.php`.
    pub fn new(api: &str, default_params: Params, default_options: RequestOptions) -> Self {
        Self::with_transport(
            api,
            default_params,
            default_options,
            Arc::new(ReqwestTransport::default()),
        )
    }

    pub fn with_transport(
        api: &str,
        default_params: Params,
        default_options: RequestOptions,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            api_url: expand_api_url(api),
            transport,
            handler: Arc::new(TransportHandler),
            data: RwLock::new(SessionData {
                default_params,
                default_options,
                extensions: Extensions::new(),
            }),
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// REST entry point next to the action API (`.../api.php` → `.../rest.php`).
    pub fn rest_url(&self) -> String {
        match self.api_url.strip_suffix("api.php") {
            Some(base) => format!("{base}rest.php"),
            None => self.api_url.clone(),
        }
    }

    /// Run `f` with shared access to the session data.
    pub fn read<R>(&self, f: impl FnOnce(&SessionData) -> R) -> R {
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        f(&data)
    }

    /// Run `f` with exclusive access to the session data. Everything `f`
    /// changes becomes visible to other requests at once.
    pub fn write<R>(&self, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut data)
    }

    pub fn default_params(&self) -> Params {
        self.read(|data| data.default_params.clone())
    }

    pub fn default_options(&self) -> RequestOptions {
        self.read(|data| data.default_options.clone())
    }

    /// Resolve per-call options against the session and library tiers.
    pub fn resolve_options(&self, call: &RequestOptions) -> RequestOptions {
        self.read(|data| {
            RequestOptions::resolve(
                call,
                &data.default_options,
                &RequestOptions::library_default(),
            )
        })
    }

    /// User agent for a request made with the given options.
    pub fn user_agent(&self, options: &RequestOptions) -> String {
        match self.resolve_options(options).user_agent {
            Some(user_agent) => format!("{user_agent} {LIBRARY_USER_AGENT}"),
            None => LIBRARY_USER_AGENT.to_string(),
        }
    }

    /// Raw POST, bypassing default parameters and the handler chain.
    pub async fn internal_post(
        &self,
        url: &str,
        url_params: &Params,
        body_params: &Params,
        headers: &HeaderMap,
    ) -> Result<RawResponse> {
        self.transport
            .post(url, url_params, body_params, headers)
            .await
    }

    /// Make an API request through the handler chain.
    pub async fn request(&self, params: Params, options: RequestOptions) -> Result<Value> {
        let handler = Arc::clone(&self.handler);
        handler.handle(self, ApiRequest { params, options }).await
    }

    /// Put a decorator in front of the current request handler.
    ///
    /// `wrap` receives the current outermost handler and returns its
    /// replacement, which should delegate to the handler it was given.
    pub fn wrap_handler<F>(&mut self, wrap: F)
    where
        F: FnOnce(Arc<dyn RequestHandler>) -> Arc<dyn RequestHandler>,
    {
        let inner = Arc::clone(&self.handler);
        self.handler = wrap(inner);
    }

    /// Merge defaults into the request and send it over the transport.
    async fn send(&self, request: ApiRequest) -> Result<Value> {
        let (params, options) = self.prepare(request);
        let headers = self.request_headers(&options)?;
        let method = options.method.unwrap_or_default();
        debug!(
            ?method,
            action = params.get("action").map(String::as_str),
            "sending API request"
        );

        let response = match method {
            Method::Get => self.transport.get(&self.api_url, &params, &headers).await?,
            Method::Post => {
                self.transport
                    .post(&self.api_url, &Params::new(), &params, &headers)
                    .await?
            }
        };

        if let Some(error) = response.body.get("error") {
            let code = error
                .get("code")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string();
            let info = error
                .get("info")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Err(ApiError::Api { code, info });
        }
        if response.status != 200 {
            return Err(ApiError::Status(response.status));
        }
        Ok(response.body)
    }

    /// Snapshot of the merged parameters and resolved options for one send.
    fn prepare(&self, request: ApiRequest) -> (Params, RequestOptions) {
        self.read(|data| {
            let mut params = data.default_params.clone();
            params.extend(request.params);
            params.insert("format".into(), "json".into());
            let options = RequestOptions::resolve(
                &request.options,
                &data.default_options,
                &RequestOptions::library_default(),
            );
            (params, options)
        })
    }

    fn request_headers(&self, options: &RequestOptions) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent(options))
                .map_err(|e| ApiError::InvalidHeader(format!("user-agent: {e}")))?,
        );
        if let Some(authorization) = &options.authorization {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(authorization)
                    .map_err(|e| ApiError::InvalidHeader(format!("authorization: {e}")))?,
            );
        }
        Ok(headers)
    }
}

fn expand_api_url(api: &str) -> String {
    if api.contains("://") {
        api.to_string()
    } else {
        format!("https://{api}/w/api.php")
    }
}
