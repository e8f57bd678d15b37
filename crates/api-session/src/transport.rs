//! HTTP transport behind the session
//!
//! The session never talks to `reqwest` directly; it goes through the
//! [`Transport`] trait so tests and embedders can substitute their own
//! transport. [`ReqwestTransport`] is the production implementation.

use std::collections::HashMap;

use reqwest::header::HeaderMap;
use tracing::debug;

use crate::error::{ApiError, Result};
use crate::session::{BoxFuture, Params};

/// A raw HTTP response with the body decoded as JSON.
///
/// Bodies that are empty or not JSON decode to `Value::Null`; callers decide
/// from `status` whether that matters.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: serde_json::Value,
}

/// Raw GET/POST primitives.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility (`Arc<dyn Transport>`).
pub trait Transport: Send + Sync {
    /// GET `url` with `params` in the query string.
    fn get<'a>(
        &'a self,
        url: &'a str,
        params: &'a Params,
        headers: &'a HeaderMap,
    ) -> BoxFuture<'a, Result<RawResponse>>;

    /// POST `url` with `url_params` in the query string and `body_params`
    /// form-encoded in the body.
    fn post<'a>(
        &'a self,
        url: &'a str,
        url_params: &'a Params,
        body_params: &'a Params,
        headers: &'a HeaderMap,
    ) -> BoxFuture<'a, Result<RawResponse>>;
}

/// Transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn get<'a>(
        &'a self,
        url: &'a str,
        params: &'a Params,
        headers: &'a HeaderMap,
    ) -> BoxFuture<'a, Result<RawResponse>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .query(params)
                .headers(headers.clone())
                .send()
                .await
                .map_err(|e| ApiError::Http(format!("GET {url} failed: {e}")))?;
            into_raw(response).await
        })
    }

    fn post<'a>(
        &'a self,
        url: &'a str,
        url_params: &'a Params,
        body_params: &'a Params,
        headers: &'a HeaderMap,
    ) -> BoxFuture<'a, Result<RawResponse>> {
        Box::pin(async move {
            let response = self
                .client
                .post(url)
                .query(url_params)
                .form(body_params)
                .headers(headers.clone())
                .send()
                .await
                .map_err(|e| ApiError::Http(format!("POST {url} failed: {e}")))?;
            into_raw(response).await
        })
    }
}

async fn into_raw(response: reqwest::Response) -> Result<RawResponse> {
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let text = response
        .text()
        .await
        .map_err(|e| ApiError::Http(format!("reading response body: {e}")))?;
    let body = match serde_json::from_str(&text) {
        Ok(body) => body,
        Err(e) => {
            debug!(status, error = %e, "response body is not JSON");
            serde_json::Value::Null
        }
    };
    Ok(RawResponse {
        status,
        headers,
        body,
    })
}
