#![allow(dead_code)]

pub mod models;
pub mod sites;

use async_trait::async_trait;
use bytes::Bytes;
use odata_http::client::{
    ErrorMapping, HttpRequestAdapter, HttpTransport, RequestAdapter, StatusSelector,
};
use odata_http::models::create_odata_error_from_discriminator_value;
use odata_http::types::PathParameters;
use odata_http::Result;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// A canned response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: Option<&'static str>,
    pub body: &'static str,
    pub delay: Option<Duration>,
}

impl MockResponse {
    pub fn json(status: u16, body: &'static str) -> Self {
        MockResponse {
            status,
            content_type: Some("application/json"),
            body,
            delay: None,
        }
    }

    pub fn text(status: u16, body: &'static str) -> Self {
        MockResponse {
            status,
            content_type: Some("text/plain; charset=utf-8"),
            body,
            delay: None,
        }
    }

    pub fn empty(status: u16) -> Self {
        MockResponse {
            status,
            content_type: None,
            body: "",
            delay: None,
        }
    }

    pub fn with_content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// What the transport received.
#[derive(Debug, Clone)]
pub struct SentRequest {
    pub method: http::Method,
    pub uri: String,
    pub headers: http::HeaderMap,
    pub body: Bytes,
}

impl SentRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// In-memory transport answering from a queue; 200 `{}` once it runs dry.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<MockResponse>>,
    requests: Mutex<Vec<SentRequest>>,
}

impl MockTransport {
    pub fn new(responses: Vec<MockResponse>) -> Arc<Self> {
        Arc::new(MockTransport {
            responses: Mutex::new(responses.into()),
            requests: Mutex::default(),
        })
    }

    pub fn requests(&self) -> Vec<SentRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> SentRequest {
        self.requests.lock().last().cloned().expect("no request was sent")
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let (parts, body) = request.into_parts();
        self.requests.lock().push(SentRequest {
            method: parts.method,
            uri: parts.uri.to_string(),
            headers: parts.headers,
            body,
        });

        let response = self
            .responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| MockResponse::json(200, "{}"));
        if let Some(delay) = response.delay {
            tokio::time::sleep(delay).await;
        }

        let mut builder = http::Response::builder().status(response.status);
        if let Some(content_type) = response.content_type {
            builder = builder.header("content-type", content_type);
        }
        Ok(builder.body(Bytes::from_static(response.body.as_bytes())).unwrap())
    }
}

/// Adapter with no base URL of its own, so bindings' `baseurl` is used.
pub fn adapter(transport: &Arc<MockTransport>) -> Arc<dyn RequestAdapter> {
    Arc::new(HttpRequestAdapter::new(transport.clone()))
}

pub fn path_parameters(pairs: &[(&str, &str)]) -> PathParameters {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// The mapping generated bindings attach to every call.
pub fn odata_error_mapping() -> ErrorMapping {
    ErrorMapping::new().with(StatusSelector::Any, create_odata_error_from_discriminator_value)
}

/// Install a test subscriber once; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
