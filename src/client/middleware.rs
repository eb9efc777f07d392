//! Middleware pipeline around an [`HttpTransport`].
//!
//! A [`Pipeline`] runs its middlewares in order, then the transport, and is
//! itself a transport. Each middleware receives the request and a [`Next`]
//! continuation; it may rewrite the request, call `next.run` any number of
//! times, or answer on its own.
//!
//! Request options attached to a `RequestInformation` arrive in the request
//! extensions as a [`RequestOptions`] list. Each shipped middleware looks up its
//! option there and falls back to the default it was built with.
//!
//! | Middleware | Option | Effect |
//! |------------|--------|--------|
//! | [`RetryHandler`] | `RetryHandlerOption` | Retries 408/425/429/502/503/504 with backoff |
//! | [`RedirectHandler`] | `RedirectHandlerOption` | Follows 301/302/303/307/308 |
//! | [`ParametersNameDecodingHandler`] | `ParametersNameDecodingOption` | `%24select` becomes `$select` |
//! | [`UserAgentHandler`] | `UserAgentHandlerOption` | Appends a product token to `User-Agent` |
//! | [`HeadersInspectionHandler`] | `HeadersInspectionOption` | Copies headers out for the caller |
//!
//! # Examples
//!
//! ```
//! use odata_http::client::{Pipeline, RetryHandler, UserAgentHandler, ReqwestTransport};
//!
//! # fn build() -> odata_http::Result<Pipeline> {
//! let pipeline = Pipeline::new(ReqwestTransport::new()?)
//!     .with(RetryHandler::default())
//!     .with(UserAgentHandler::default());
//! # Ok(pipeline)
//! # }
//! ```

use crate::client::retry::{is_retryable_status, retry_delay};
use crate::client::transport::HttpTransport;
use crate::error::{Error, Result};
use crate::protocol::constants::headers;
use crate::protocol::HeaderCollection;
use crate::request::{
    HeadersInspectionOption, ParametersNameDecodingOption, RedirectHandlerOption, RequestOptions,
    RetryHandlerOption, UserAgentHandlerOption,
};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{HeaderValue, AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION, USER_AGENT};
use http::{Method, StatusCode};
use std::sync::Arc;

/// One stage of the pipeline.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn handle(&self, request: http::Request<Bytes>, next: Next<'_>) -> Result<http::Response<Bytes>>;
}

/// The rest of the pipeline after the current middleware.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    middlewares: &'a [Arc<dyn Middleware>],
    transport: &'a dyn HttpTransport,
}

impl<'a> Next<'a> {
    pub async fn run(self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        match self.middlewares.split_first() {
            Some((current, rest)) => {
                let next = Next {
                    middlewares: rest,
                    transport: self.transport,
                };
                current.handle(request, next).await
            }
            None => self.transport.send(request).await,
        }
    }
}

/// Middlewares composed over a transport.
#[derive(Clone)]
pub struct Pipeline {
    middlewares: Vec<Arc<dyn Middleware>>,
    transport: Arc<dyn HttpTransport>,
}

impl Pipeline {
    /// A pipeline with no middleware.
    pub fn new<T: HttpTransport + 'static>(transport: T) -> Self {
        Pipeline {
            middlewares: Vec::new(),
            transport: Arc::new(transport),
        }
    }

    /// Retry, redirect, parameter name decoding, user agent and headers
    /// inspection, in that order.
    pub fn with_default_middleware<T: HttpTransport + 'static>(transport: T, enable_logging: bool) -> Self {
        Pipeline::new(transport)
            .with(RetryHandler::new(RetryHandlerOption::default()).with_logging(enable_logging))
            .with(RedirectHandler::default())
            .with(ParametersNameDecodingHandler::default())
            .with(UserAgentHandler::default())
            .with(HeadersInspectionHandler)
    }

    /// Append a middleware; it runs after those already added.
    #[must_use]
    pub fn with<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }
}

#[async_trait]
impl HttpTransport for Pipeline {
    async fn send(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        Next {
            middlewares: &self.middlewares,
            transport: self.transport.as_ref(),
        }
        .run(request)
        .await
    }
}

/// The latest option of type `O` attached to `request`.
pub fn request_option<O: std::any::Any + Clone>(request: &http::Request<Bytes>) -> Option<O> {
    request
        .extensions()
        .get::<RequestOptions>()
        .and_then(|options| options.get::<O>())
        .cloned()
}

/// Copy a request so it can be sent again.
pub fn clone_request(request: &http::Request<Bytes>) -> http::Request<Bytes> {
    let mut copy = http::Request::new(request.body().clone());
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    *copy.extensions_mut() = request.extensions().clone();
    copy
}

/// Retries throttled and unavailable responses.
///
/// Waits for `Retry-After` when the server sends one, otherwise backs off
/// exponentially, and numbers retries in a `Retry-Attempt` header.
#[derive(Debug, Clone, Default)]
pub struct RetryHandler {
    default: RetryHandlerOption,
    enable_logging: bool,
}

impl RetryHandler {
    pub fn new(default: RetryHandlerOption) -> Self {
        RetryHandler {
            default,
            enable_logging: false,
        }
    }

    #[must_use]
    pub fn with_logging(mut self, enable_logging: bool) -> Self {
        self.enable_logging = enable_logging;
        self
    }
}

#[async_trait]
impl Middleware for RetryHandler {
    async fn handle(&self, mut request: http::Request<Bytes>, next: Next<'_>) -> Result<http::Response<Bytes>> {
        let option = request_option::<RetryHandlerOption>(&request).unwrap_or_else(|| self.default.clone());
        let max_retries = option.max_retries.min(RetryHandlerOption::MAX_RETRIES_LIMIT);
        let mut attempt = 0;

        loop {
            let response = next.run(clone_request(&request)).await?;
            let status = response.status().as_u16();
            if !is_retryable_status(status) || attempt >= max_retries {
                return Ok(response);
            }

            let delay = retry_delay(&response, attempt, option.delay);
            if !option.allows(attempt, delay, &response) {
                return Ok(response);
            }

            attempt += 1;
            if self.enable_logging {
                tracing::warn!(
                    "Request failed with {} (attempt {}), retrying after {:?}",
                    status,
                    attempt,
                    delay
                );
            }
            tokio::time::sleep(delay).await;
            request
                .headers_mut()
                .insert(headers::RETRY_ATTEMPT, HeaderValue::from(attempt));
        }
    }
}

/// Follows redirects up to `RedirectHandlerOption::max_redirects`.
///
/// A 303, or a 301/302 answering a `POST`, is followed with a bodiless `GET`.
/// `Authorization` is dropped when the redirect leaves the original host.
#[derive(Debug, Clone, Default)]
pub struct RedirectHandler {
    default: RedirectHandlerOption,
}

impl RedirectHandler {
    pub fn new(default: RedirectHandlerOption) -> Self {
        RedirectHandler { default }
    }
}

#[async_trait]
impl Middleware for RedirectHandler {
    async fn handle(&self, mut request: http::Request<Bytes>, next: Next<'_>) -> Result<http::Response<Bytes>> {
        let option = request_option::<RedirectHandlerOption>(&request).unwrap_or(self.default);
        let mut redirects = 0u8;

        loop {
            let response = next.run(clone_request(&request)).await?;
            let status = response.status();
            if !option.follow_redirects || !is_redirect(status) {
                return Ok(response);
            }
            let Some(location) = response.headers().get(LOCATION).and_then(|v| v.to_str().ok()) else {
                return Ok(response);
            };
            if redirects >= option.max_redirects {
                return Err(Error::transport(format!("too many redirects ({})", redirects)));
            }

            let target = url::Url::parse(&request.uri().to_string())
                .and_then(|base| base.join(location))
                .map_err(|e| Error::transport(format!("invalid redirect location '{}': {}", location, e)))?;
            let target: http::Uri = target
                .as_str()
                .parse()
                .map_err(|e| Error::transport(format!("invalid redirect location '{}': {}", location, e)))?;

            if target.authority() != request.uri().authority() {
                request.headers_mut().remove(AUTHORIZATION);
            }
            if status == StatusCode::SEE_OTHER
                || (*request.method() == Method::POST
                    && matches!(status, StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND))
            {
                *request.method_mut() = Method::GET;
                *request.body_mut() = Bytes::new();
                request.headers_mut().remove(CONTENT_TYPE);
                request.headers_mut().remove(CONTENT_LENGTH);
            }
            *request.uri_mut() = target;
            redirects += 1;
        }
    }
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(status.as_u16(), 301 | 302 | 303 | 307 | 308)
}

/// Decodes percent-encoded characters in query parameter names.
#[derive(Debug, Clone, Default)]
pub struct ParametersNameDecodingHandler {
    default: ParametersNameDecodingOption,
}

impl ParametersNameDecodingHandler {
    pub fn new(default: ParametersNameDecodingOption) -> Self {
        ParametersNameDecodingHandler { default }
    }
}

#[async_trait]
impl Middleware for ParametersNameDecodingHandler {
    async fn handle(&self, mut request: http::Request<Bytes>, next: Next<'_>) -> Result<http::Response<Bytes>> {
        let option = request_option::<ParametersNameDecodingOption>(&request)
            .unwrap_or_else(|| self.default.clone());

        if option.enable && !option.characters.is_empty() {
            let original = request.uri().to_string();
            if original.contains('%') {
                let decoded = decode_parameter_names(&original, &option.characters);
                if decoded != original {
                    *request.uri_mut() = decoded
                        .parse()
                        .map_err(|e| Error::Config(format!("invalid URI '{}': {}", decoded, e)))?;
                }
            }
        }
        next.run(request).await
    }
}

/// Decode `%XX` sequences standing for one of `characters` in the names of
/// the query parameters of `uri`. Values are left alone.
pub fn decode_parameter_names(uri: &str, characters: &[char]) -> String {
    let Some((base, query)) = uri.split_once('?') else {
        return uri.to_string();
    };
    let (query, fragment) = match query.split_once('#') {
        Some((q, f)) => (q, Some(f)),
        None => (query, None),
    };

    let pairs: Vec<String> = query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) => format!("{}={}", decode_name(name, characters), value),
            None => decode_name(pair, characters),
        })
        .collect();

    let mut out = format!("{}?{}", base, pairs.join("&"));
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

fn decode_name(name: &str, characters: &[char]) -> String {
    let mut out = name.to_string();
    for c in characters {
        if !c.is_ascii() {
            continue;
        }
        let encoded = format!("%{:02X}", *c as u32);
        out = out.replace(&encoded, &c.to_string());
        out = out.replace(&encoded.to_ascii_lowercase(), &c.to_string());
    }
    out
}

/// Appends the product token of `UserAgentHandlerOption` to `User-Agent`.
#[derive(Debug, Clone, Default)]
pub struct UserAgentHandler {
    default: UserAgentHandlerOption,
}

impl UserAgentHandler {
    pub fn new(default: UserAgentHandlerOption) -> Self {
        UserAgentHandler { default }
    }
}

#[async_trait]
impl Middleware for UserAgentHandler {
    async fn handle(&self, mut request: http::Request<Bytes>, next: Next<'_>) -> Result<http::Response<Bytes>> {
        let option = request_option::<UserAgentHandlerOption>(&request).unwrap_or_else(|| self.default.clone());

        if option.enabled {
            let token = option.token();
            let current = request
                .headers()
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            if !current.split_whitespace().any(|t| t == token) {
                let value = if current.is_empty() {
                    token
                } else {
                    format!("{} {}", current, token)
                };
                let value = HeaderValue::from_str(&value)
                    .map_err(|e| Error::Config(format!("invalid User-Agent '{}': {}", value, e)))?;
                request.headers_mut().insert(USER_AGENT, value);
            }
        }
        next.run(request).await
    }
}

/// Copies request and/or response headers into a `HeadersInspectionOption`.
///
/// Does nothing unless the request carries the option.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadersInspectionHandler;

#[async_trait]
impl Middleware for HeadersInspectionHandler {
    async fn handle(&self, request: http::Request<Bytes>, next: Next<'_>) -> Result<http::Response<Bytes>> {
        let Some(option) = request_option::<HeadersInspectionOption>(&request) else {
            return next.run(request).await;
        };

        if option.inspect_request_headers {
            option.record_request(HeaderCollection::from_header_map(request.headers()));
        }
        let response = next.run(request).await?;
        if option.inspect_response_headers {
            option.record_response(HeaderCollection::from_header_map(response.headers()));
        }
        Ok(response)
    }
}
