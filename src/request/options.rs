//! Type-keyed request options consumed by middleware.
//!
//! Options are identified by their Rust type. Adding a second option of a type
//! already present keeps both entries; lookups return the most recently added.
//! The whole list is cheap to clone and travels to middleware inside the
//! `http::Request` extensions.
//!
//! | Option | Consumed by |
//! |--------|-------------|
//! | [`RetryHandlerOption`] | `RetryHandler` |
//! | [`ParametersNameDecodingOption`] | `ParametersNameDecodingHandler` |
//! | [`HeadersInspectionOption`] | `HeadersInspectionHandler` |
//! | [`UserAgentHandlerOption`] | `UserAgentHandler` |
//! | [`RedirectHandlerOption`] | `RedirectHandler` |
//! | [`ResponseHandlerOption`] | the request adapter |
//! | [`ChaosHandlerOption`], [`TelemetryHandlerOption`] | carried for custom middleware |

use crate::client::ErrorMapping;
use crate::error::Result;
use crate::protocol::{RequestHeaders, ResponseHeaders};
use async_trait::async_trait;
use bytes::Bytes;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A type-erased request option.
#[derive(Clone)]
pub struct RequestOption {
    type_id: TypeId,
    type_name: &'static str,
    value: Arc<dyn Any + Send + Sync>,
}

impl RequestOption {
    pub fn new<O: Any + Send + Sync>(option: O) -> Self {
        RequestOption {
            type_id: TypeId::of::<O>(),
            type_name: std::any::type_name::<O>(),
            value: Arc::new(option),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn downcast_ref<O: Any>(&self) -> Option<&O> {
        self.value.downcast_ref::<O>()
    }
}

impl fmt::Debug for RequestOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Ordered list of request options.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    entries: Vec<RequestOption>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<O: Any + Send + Sync>(&mut self, option: O) {
        self.entries.push(RequestOption::new(option));
    }

    pub fn push(&mut self, option: RequestOption) {
        self.entries.push(option);
    }

    /// Latest option of type `O`.
    pub fn get<O: Any>(&self) -> Option<&O> {
        let id = TypeId::of::<O>();
        self.entries
            .iter()
            .rev()
            .find(|e| e.type_id == id)
            .and_then(|e| e.downcast_ref::<O>())
    }

    /// Remove every option of type `O`; returns whether any was present.
    pub fn remove<O: Any>(&mut self) -> bool {
        let id = TypeId::of::<O>();
        let before = self.entries.len();
        self.entries.retain(|e| e.type_id != id);
        before != self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequestOption> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Extend<RequestOption> for RequestOptions {
    fn extend<I: IntoIterator<Item = RequestOption>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

/// Decides whether a failed attempt is retried: `(attempt, delay, response)`.
pub type ShouldRetry = Arc<dyn Fn(u32, Duration, &http::Response<Bytes>) -> bool + Send + Sync>;

/// Retry policy for the `RetryHandler` middleware.
///
/// | Field | Default |
/// |-------|---------|
/// | `max_retries` | 3 (capped at 10) |
/// | `delay` | 3 seconds, doubled each attempt |
/// | `should_retry` | always |
#[derive(Clone)]
pub struct RetryHandlerOption {
    pub max_retries: u32,
    pub delay: Duration,
    pub should_retry: Option<ShouldRetry>,
}

impl RetryHandlerOption {
    /// Hard upper bound on attempts regardless of configuration.
    pub const MAX_RETRIES_LIMIT: u32 = 10;

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.min(Self::MAX_RETRIES_LIMIT);
        self
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn with_should_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(u32, Duration, &http::Response<Bytes>) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Some(Arc::new(f));
        self
    }

    pub(crate) fn allows(&self, attempt: u32, delay: Duration, response: &http::Response<Bytes>) -> bool {
        self.should_retry
            .as_ref()
            .map_or(true, |f| f(attempt, delay, response))
    }
}

impl Default for RetryHandlerOption {
    fn default() -> Self {
        RetryHandlerOption {
            max_retries: 3,
            delay: Duration::from_secs(3),
            should_retry: None,
        }
    }
}

impl fmt::Debug for RetryHandlerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryHandlerOption")
            .field("max_retries", &self.max_retries)
            .field("delay", &self.delay)
            .field("should_retry", &self.should_retry.is_some())
            .finish()
    }
}

/// Redirect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RedirectHandlerOption {
    pub max_redirects: u8,
    pub follow_redirects: bool,
}

impl Default for RedirectHandlerOption {
    fn default() -> Self {
        RedirectHandlerOption {
            max_redirects: 5,
            follow_redirects: true,
        }
    }
}

/// Fault injection for testing: answer `percentage`% of requests with `status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChaosHandlerOption {
    pub percentage: u8,
    pub status: u16,
    pub body: Option<String>,
}

impl Default for ChaosHandlerOption {
    fn default() -> Self {
        ChaosHandlerOption {
            percentage: 10,
            status: 503,
            body: None,
        }
    }
}

/// Free-form telemetry attributes attached to a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryHandlerOption {
    pub attributes: IndexMap<String, String>,
}

/// Characters decoded in query parameter names by `ParametersNameDecodingHandler`.
///
/// Templates carry `%24select`; the service expects `$select`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParametersNameDecodingOption {
    pub enable: bool,
    pub characters: Vec<char>,
}

impl Default for ParametersNameDecodingOption {
    fn default() -> Self {
        ParametersNameDecodingOption {
            enable: true,
            characters: vec!['$', '.', '-', '~'],
        }
    }
}

/// Product token appended to `User-Agent` by `UserAgentHandler`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserAgentHandlerOption {
    pub enabled: bool,
    pub product_name: String,
    pub product_version: String,
}

impl UserAgentHandlerOption {
    pub fn token(&self) -> String {
        format!("{}/{}", self.product_name, self.product_version)
    }
}

impl Default for UserAgentHandlerOption {
    fn default() -> Self {
        UserAgentHandlerOption {
            enabled: true,
            product_name: env!("CARGO_PKG_NAME").to_string(),
            product_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Shared slots receiving the headers of one exchange.
#[derive(Debug, Clone, Default)]
pub struct HeadersInspectionOption {
    pub inspect_request_headers: bool,
    pub inspect_response_headers: bool,
    request_headers: Arc<Mutex<RequestHeaders>>,
    response_headers: Arc<Mutex<ResponseHeaders>>,
}

impl HeadersInspectionOption {
    pub fn new(inspect_request_headers: bool, inspect_response_headers: bool) -> Self {
        HeadersInspectionOption {
            inspect_request_headers,
            inspect_response_headers,
            ..Default::default()
        }
    }

    /// Headers that went out, as captured by the middleware.
    pub fn request_headers(&self) -> RequestHeaders {
        self.request_headers.lock().clone()
    }

    /// Headers that came back.
    pub fn response_headers(&self) -> ResponseHeaders {
        self.response_headers.lock().clone()
    }

    pub(crate) fn record_request(&self, headers: RequestHeaders) {
        *self.request_headers.lock() = headers;
    }

    pub(crate) fn record_response(&self, headers: ResponseHeaders) {
        *self.response_headers.lock() = headers;
    }
}

/// Takes over response processing from the adapter.
///
/// The returned value is handed back to the caller of `send*`. It is matched
/// against `Option<T>`, then `T` (or `Vec<T>` for collections); `()` means
/// "no value".
#[async_trait]
pub trait ResponseHandler: Send + Sync {
    async fn handle_response(
        &self,
        response: http::Response<Bytes>,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Box<dyn Any + Send>>;
}

/// Attaches a [`ResponseHandler`] to a request.
#[derive(Clone)]
pub struct ResponseHandlerOption {
    handler: Arc<dyn ResponseHandler>,
}

impl ResponseHandlerOption {
    pub fn new(handler: Arc<dyn ResponseHandler>) -> Self {
        ResponseHandlerOption { handler }
    }

    pub fn handler(&self) -> &Arc<dyn ResponseHandler> {
        &self.handler
    }
}

impl fmt::Debug for ResponseHandlerOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ResponseHandlerOption")
    }
}

/// A [`ResponseHandler`] that keeps the raw response for the caller.
///
/// ```
/// use odata_http::request::{NativeResponseHandler, RequestInformation};
/// use http::Method;
///
/// let native = NativeResponseHandler::new();
/// let mut info = RequestInformation::new(Method::GET, "{+baseurl}/me", Default::default());
/// info.add_request_option(native.option());
/// // after `adapter.send_no_content(info, None).await?`, `native.take()` holds the response
/// assert!(native.take().is_none());
/// ```
#[derive(Clone, Default)]
pub struct NativeResponseHandler {
    slot: Arc<Mutex<Option<http::Response<Bytes>>>>,
}

impl NativeResponseHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// The option to attach to a request.
    pub fn option(&self) -> ResponseHandlerOption {
        ResponseHandlerOption::new(Arc::new(self.clone()))
    }

    /// Take the captured response.
    pub fn take(&self) -> Option<http::Response<Bytes>> {
        self.slot.lock().take()
    }
}

#[async_trait]
impl ResponseHandler for NativeResponseHandler {
    async fn handle_response(
        &self,
        response: http::Response<Bytes>,
        _error_mapping: Option<&ErrorMapping>,
    ) -> Result<Box<dyn Any + Send>> {
        *self.slot.lock() = Some(response);
        Ok(Box::new(()))
    }
}
