//! Recording transport shared by the unit tests of this crate.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use api_session::{
    ApiError, BoxFuture, Params, RawResponse, RequestOptions, Result, Session, Transport,
};
use reqwest::header::HeaderMap;
use serde_json::Value;

pub(crate) const API_URL: &str = "https://test.wikipedia.org/w/api.php";

/// One request seen by the transport.
#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub method: &'static str,
    pub url: String,
    pub url_params: Params,
    pub body_params: Params,
    pub headers: HeaderMap,
}

/// Transport with separate response queues for API requests (GET) and token
/// requests (POST). An empty queue answers with an HTTP error, so a test
/// that forgets to queue a response fails loudly instead of hanging.
///
/// Responses are taken from the queue when a request is made, not when its
/// future completes.
#[derive(Default)]
pub(crate) struct RecordingTransport {
    gets: Mutex<VecDeque<RawResponse>>,
    posts: Mutex<VecDeque<RawResponse>>,
    calls: Mutex<Vec<Call>>,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue a token endpoint (POST) response.
    pub fn respond(&self, status: u16, body: Value) {
        self.posts.lock().unwrap().push_back(raw(status, body));
    }

    /// Queue an API (GET) response.
    pub fn respond_api(&self, status: u16, body: Value) {
        self.gets.lock().unwrap().push_back(raw(status, body));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == "POST")
            .collect()
    }

    pub fn gets(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.method == "GET")
            .collect()
    }

    fn record(
        &self,
        method: &'static str,
        url: &str,
        url_params: &Params,
        body_params: &Params,
        headers: &HeaderMap,
    ) {
        self.calls.lock().unwrap().push(Call {
            method,
            url: url.to_string(),
            url_params: url_params.clone(),
            body_params: body_params.clone(),
            headers: headers.clone(),
        });
    }
}

impl Transport for RecordingTransport {
    fn get<'a>(
        &'a self,
        url: &'a str,
        params: &'a Params,
        headers: &'a HeaderMap,
    ) -> BoxFuture<'a, Result<RawResponse>> {
        self.record("GET", url, params, &Params::new(), headers);
        let next = self.gets.lock().unwrap().pop_front();
        Box::pin(async move {
            // Let concurrent requests interleave at the network boundary
            tokio::task::yield_now().await;
            next.ok_or_else(|| ApiError::Http("no GET response queued".into()))
        })
    }

    fn post<'a>(
        &'a self,
        url: &'a str,
        url_params: &'a Params,
        body_params: &'a Params,
        headers: &'a HeaderMap,
    ) -> BoxFuture<'a, Result<RawResponse>> {
        self.record("POST", url, url_params, body_params, headers);
        let next = self.posts.lock().unwrap().pop_front();
        Box::pin(async move {
            // Let concurrent requests interleave at the network boundary
            tokio::task::yield_now().await;
            next.ok_or_else(|| ApiError::Http("no POST response queued".into()))
        })
    }
}

fn raw(status: u16, body: Value) -> RawResponse {
    RawResponse {
        status,
        headers: Default::default(),
        body,
    }
}

pub(crate) fn params(pairs: &[(&str, &str)]) -> Params {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub(crate) fn test_session(transport: &Arc<RecordingTransport>) -> Session {
    Session::with_transport(
        API_URL,
        params(&[("formatversion", "2")]),
        RequestOptions {
            user_agent: Some("oauth-session-unit-test".into()),
            ..RequestOptions::default()
        },
        transport.clone(),
    )
}
