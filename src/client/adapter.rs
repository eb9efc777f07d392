//! The request adapter: turns a [`RequestInformation`] into a typed result.
//!
//! # Dispatch
//!
//! 1. Resolve the URL (`{+baseurl}` from the adapter when configured).
//! 2. Add the default `User-Agent` and, for bodies, `Content-Type: application/json`
//!    when the request carries none.
//! 3. Run the transport under the request's cancellation token.
//! 4. Hand the response to a `ResponseHandlerOption` if one is attached.
//! 5. Non-2xx: map to an error (see [`ErrorMapping`]).
//! 6. 2xx with an empty body or `Content-Length: 0`: no value.
//! 7. Otherwise parse with the factory registered for the response `Content-Type`.
//!
//! | Operation | Success | Empty 2xx |
//! |-----------|---------|-----------|
//! | [`send`](RequestAdapterExt::send) | `Option<T>` | `None` |
//! | [`send_collection`](RequestAdapterExt::send_collection) | `Vec<T>` | empty |
//! | [`send_primitive`](RequestAdapterExt::send_primitive) | `Option<P>` | `None` |
//! | [`send_primitive_collection`](RequestAdapterExt::send_primitive_collection) | `Vec<P>` | empty |
//! | [`send_enum`](RequestAdapterExt::send_enum) | `Option<E>` | `None` |
//! | [`send_enum_collection`](RequestAdapterExt::send_enum_collection) | `Vec<E>` | empty |
//! | [`send_bytes`](RequestAdapterExt::send_bytes) | `Option<Bytes>` | `None` |
//! | [`send_no_content`](RequestAdapter::send_no_content) | `()` | `()` |
//!
//! The adapter never retries on its own; retries are a middleware concern.

use crate::client::config::{AdapterConfig, TransportConfig};
use crate::client::error_mapping::ErrorMapping;
use crate::client::middleware::Pipeline;
use crate::client::transport::{HttpTransport, ReqwestTransport};
use crate::error::{ApiError, Error, Result};
use crate::protocol::constants::{headers, media_types, BASE_URL_KEY};
use crate::protocol::{append_query, ResponseHeaders, UriTemplate};
use crate::request::{RequestInformation, ResponseHandlerOption};
use crate::serialization::{ParsableFactory, ParseNode, ParseNodeExt, Primitive, SerializationRegistry};
use crate::types::RequestTarget;
use async_trait::async_trait;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::StatusCode;
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What a dispatched request produced, before typing.
pub enum Dispatch {
    /// 204, or a 2xx with an empty body.
    NoContent,
    /// A 2xx body with its media type.
    Content {
        content_type: Option<String>,
        body: Bytes,
    },
    /// The value returned by a `ResponseHandlerOption`.
    Handled(Box<dyn Any + Send>),
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatch::NoContent => f.write_str("NoContent"),
            Dispatch::Content { content_type, body } => f
                .debug_struct("Content")
                .field("content_type", content_type)
                .field("len", &body.len())
                .finish(),
            Dispatch::Handled(_) => f.write_str("Handled"),
        }
    }
}

/// Object-safe core of a request adapter, shared as `Arc<dyn RequestAdapter>`.
///
/// The typed `send*` operations live on [`RequestAdapterExt`], implemented for
/// every adapter.
#[async_trait]
pub trait RequestAdapter: Send + Sync {
    /// Run the request and classify the response.
    ///
    /// # Errors
    ///
    /// - `Error::Template` if the URL cannot be resolved
    /// - `Error::Transport` if no response arrived
    /// - `Error::Cancelled` if the request's token fired first
    /// - `Error::Api` for non-2xx responses
    async fn dispatch(
        &self,
        info: RequestInformation,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Dispatch>;

    /// Build the `http::Request` the transport would receive, without sending it.
    fn convert_to_native_request(&self, info: RequestInformation) -> Result<http::Request<Bytes>>;

    /// Registry used for request bodies and responses.
    fn serialization_registry(&self) -> &SerializationRegistry;

    /// Current base URL; empty when bindings supply their own.
    fn base_url(&self) -> String;

    fn set_base_url(&self, base_url: &str);

    /// Send a request whose response carries no value.
    async fn send_no_content(
        &self,
        info: RequestInformation,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<()> {
        self.dispatch(info, error_mapping).await.map(|_| ())
    }
}

/// Typed operations over any [`RequestAdapter`].
#[async_trait]
pub trait RequestAdapterExt: RequestAdapter {
    /// Send and read one object; `None` on an empty 2xx.
    async fn send<T: Send + 'static>(
        &self,
        info: RequestInformation,
        factory: ParsableFactory<T>,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Option<T>>;

    /// Send and read a collection of objects; empty on an empty 2xx.
    async fn send_collection<T: Send + 'static>(
        &self,
        info: RequestInformation,
        factory: ParsableFactory<T>,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Vec<T>>;

    /// Send and read a primitive, e.g. `send_primitive::<i64>` for `$count`.
    async fn send_primitive<P: Primitive>(
        &self,
        info: RequestInformation,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Option<P>>;

    /// Send and read a collection of primitives.
    async fn send_primitive_collection<P: Primitive>(
        &self,
        info: RequestInformation,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Vec<P>>;

    /// Send and read an enumeration member by its wire name.
    ///
    /// ```
    /// # use std::str::FromStr;
    /// #[derive(Debug, PartialEq)]
    /// enum Importance { Low, Normal, High }
    ///
    /// impl FromStr for Importance {
    ///     type Err = ();
    ///     fn from_str(s: &str) -> Result<Self, ()> {
    ///         match s {
    ///             "low" => Ok(Importance::Low),
    ///             "normal" => Ok(Importance::Normal),
    ///             "high" => Ok(Importance::High),
    ///             _ => Err(()),
    ///         }
    ///     }
    /// }
    /// assert_eq!(Importance::from_str("high"), Ok(Importance::High));
    /// // let importance = adapter.send_enum::<Importance>(info, Some(&mapping)).await?;
    /// ```
    async fn send_enum<E: FromStr + Send + 'static>(
        &self,
        info: RequestInformation,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Option<E>>;

    /// Send and read a collection of enumeration members; nulls are skipped.
    async fn send_enum_collection<E: FromStr + Send + 'static>(
        &self,
        info: RequestInformation,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Vec<E>>;

    /// Send and return the raw 2xx body, for binary content endpoints.
    async fn send_bytes(
        &self,
        info: RequestInformation,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Option<Bytes>>;
}

#[async_trait]
impl<A: RequestAdapter + ?Sized> RequestAdapterExt for A {
    async fn send<T: Send + 'static>(
        &self,
        info: RequestInformation,
        factory: ParsableFactory<T>,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Option<T>> {
        match self.dispatch(info, error_mapping).await? {
            Dispatch::NoContent => Ok(None),
            Dispatch::Handled(value) => handled_value::<T>(value),
            Dispatch::Content { content_type, body } => {
                let node = root_node(self.serialization_registry(), content_type.as_deref(), &body)?;
                node.get_object_value(factory)
            }
        }
    }

    async fn send_collection<T: Send + 'static>(
        &self,
        info: RequestInformation,
        factory: ParsableFactory<T>,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Vec<T>> {
        match self.dispatch(info, error_mapping).await? {
            Dispatch::NoContent => Ok(Vec::new()),
            Dispatch::Handled(value) => Ok(handled_value::<Vec<T>>(value)?.unwrap_or_default()),
            Dispatch::Content { content_type, body } => {
                let node = root_node(self.serialization_registry(), content_type.as_deref(), &body)?;
                node.get_collection_of_object_values(factory)
            }
        }
    }

    async fn send_primitive<P: Primitive>(
        &self,
        info: RequestInformation,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Option<P>> {
        match self.dispatch(info, error_mapping).await? {
            Dispatch::NoContent => Ok(None),
            Dispatch::Handled(value) => handled_value::<P>(value),
            Dispatch::Content { content_type, body } => {
                let node = root_node(self.serialization_registry(), content_type.as_deref(), &body)?;
                P::read(node.as_ref())
            }
        }
    }

    async fn send_primitive_collection<P: Primitive>(
        &self,
        info: RequestInformation,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Vec<P>> {
        match self.dispatch(info, error_mapping).await? {
            Dispatch::NoContent => Ok(Vec::new()),
            Dispatch::Handled(value) => Ok(handled_value::<Vec<P>>(value)?.unwrap_or_default()),
            Dispatch::Content { content_type, body } => {
                let node = root_node(self.serialization_registry(), content_type.as_deref(), &body)?;
                node.get_collection_of_primitive_values()
            }
        }
    }

    async fn send_enum<E: FromStr + Send + 'static>(
        &self,
        info: RequestInformation,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Option<E>> {
        match self.dispatch(info, error_mapping).await? {
            Dispatch::NoContent => Ok(None),
            Dispatch::Handled(value) => handled_value::<E>(value),
            Dispatch::Content { content_type, body } => {
                let node = root_node(self.serialization_registry(), content_type.as_deref(), &body)?;
                node.get_enum()
            }
        }
    }

    async fn send_enum_collection<E: FromStr + Send + 'static>(
        &self,
        info: RequestInformation,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Vec<E>> {
        match self.dispatch(info, error_mapping).await? {
            Dispatch::NoContent => Ok(Vec::new()),
            Dispatch::Handled(value) => Ok(handled_value::<Vec<E>>(value)?.unwrap_or_default()),
            Dispatch::Content { content_type, body } => {
                let node = root_node(self.serialization_registry(), content_type.as_deref(), &body)?;
                let mut values = Vec::new();
                for element in node.get_collection_nodes()? {
                    if let Some(value) = element.get_enum()? {
                        values.push(value);
                    }
                }
                Ok(values)
            }
        }
    }

    async fn send_bytes(
        &self,
        info: RequestInformation,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Option<Bytes>> {
        match self.dispatch(info, error_mapping).await? {
            Dispatch::NoContent => Ok(None),
            Dispatch::Handled(value) => handled_value::<Bytes>(value),
            Dispatch::Content { body, .. } => Ok(Some(body)),
        }
    }
}

fn root_node(
    registry: &SerializationRegistry,
    content_type: Option<&str>,
    body: &[u8],
) -> Result<Box<dyn ParseNode>> {
    let content_type = content_type.ok_or_else(|| {
        Error::Deserialization("response has a body but no Content-Type".to_string())
    })?;
    registry.get_root_parse_node(content_type, body)
}

/// Type a response handler's value: `Option<T>`, `T`, or `()` for none.
fn handled_value<T: 'static>(value: Box<dyn Any + Send>) -> Result<Option<T>> {
    let value = match value.downcast::<Option<T>>() {
        Ok(value) => return Ok(*value),
        Err(value) => value,
    };
    let value = match value.downcast::<T>() {
        Ok(value) => return Ok(Some(*value)),
        Err(value) => value,
    };
    if value.is::<()>() {
        return Ok(None);
    }
    Err(Error::Deserialization(format!(
        "response handler did not return a {}",
        std::any::type_name::<T>()
    )))
}

/// The default [`RequestAdapter`]: an [`HttpTransport`] plus a serialization
/// registry.
///
/// # Examples
///
/// ```ignore
/// use odata_http::client::{AdapterConfig, HttpRequestAdapter, TransportConfig};
/// use std::sync::Arc;
///
/// let adapter = HttpRequestAdapter::with_reqwest(
///     AdapterConfig {
///         base_url: "https://graph.microsoft.com/v1.0".to_string(),
///         ..Default::default()
///     },
///     TransportConfig::default(),
/// )?;
/// let adapter: Arc<dyn odata_http::client::RequestAdapter> = Arc::new(adapter);
/// ```
pub struct HttpRequestAdapter {
    transport: Arc<dyn HttpTransport>,
    registry: Arc<SerializationRegistry>,
    config: AdapterConfig,
    base_url: RwLock<String>,
    templates: Option<Mutex<LruCache<String, Arc<UriTemplate>>>>,
}

impl HttpRequestAdapter {
    /// Adapter over `transport` with default configuration and the JSON and
    /// text factories registered.
    pub fn new<T: HttpTransport + 'static>(transport: T) -> Self {
        Self::with_config(transport, AdapterConfig::default())
    }

    pub fn with_config<T: HttpTransport + 'static>(transport: T, config: AdapterConfig) -> Self {
        let templates = NonZeroUsize::new(config.template_cache_size).map(|n| Mutex::new(LruCache::new(n)));
        HttpRequestAdapter {
            transport: Arc::new(transport),
            registry: Arc::new(SerializationRegistry::with_defaults()),
            base_url: RwLock::new(normalize_base_url(&config.base_url)),
            config,
            templates,
        }
    }

    /// Adapter over reqwest with the default middleware pipeline.
    pub fn with_reqwest(config: AdapterConfig, transport: TransportConfig) -> Result<Self> {
        let pipeline = Pipeline::with_default_middleware(
            ReqwestTransport::with_config(transport)?,
            config.enable_logging,
        );
        Ok(Self::with_config(pipeline, config))
    }

    /// Replace the serialization registry.
    #[must_use]
    pub fn with_serialization_registry(mut self, registry: Arc<SerializationRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Get the adapter configuration
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    fn template(&self, source: &str) -> Result<Arc<UriTemplate>> {
        let Some(cache) = &self.templates else {
            return Ok(Arc::new(UriTemplate::parse(source)?));
        };
        if let Some(template) = cache.lock().get(source) {
            if self.config.enable_logging {
                tracing::trace!("Template cache hit for {}", source);
            }
            return Ok(template.clone());
        }
        let template = Arc::new(UriTemplate::parse(source)?);
        cache.lock().put(source.to_string(), template.clone());
        Ok(template)
    }

    fn resolve_url(&self, info: &RequestInformation) -> Result<String> {
        match info.target() {
            RequestTarget::Raw(raw) => Ok(append_query(raw, &info.query_parameters)),
            RequestTarget::Template { template, params } => {
                Ok(self.template(template)?.expand(params, &info.query_parameters))
            }
        }
    }

    fn to_native(&self, mut info: RequestInformation) -> Result<http::Request<Bytes>> {
        let base_url = self.base_url();
        if !base_url.is_empty() {
            info.path_parameters.insert(BASE_URL_KEY.to_string(), base_url);
        }
        if let Some(user_agent) = &self.config.user_agent {
            info.headers.try_add(headers::USER_AGENT, user_agent.clone());
        }
        if info.content.is_some() {
            info.headers.try_add(headers::CONTENT_TYPE, media_types::JSON);
        }

        let url = self.resolve_url(&info)?;
        url::Url::parse(&url)
            .map_err(|e| Error::Template(format!("resolved URL '{}' is not absolute: {}", url, e)))?;
        let uri: http::Uri = url
            .parse()
            .map_err(|e| Error::Template(format!("resolved URL '{}' is invalid: {}", url, e)))?;

        let mut request = http::Request::new(info.content.clone().unwrap_or_default());
        *request.method_mut() = info.method.clone();
        *request.uri_mut() = uri;
        *request.headers_mut() = info.headers.to_header_map()?;
        request.extensions_mut().insert(info.request_options().clone());
        Ok(request)
    }

    async fn execute(
        &self,
        request: http::Request<Bytes>,
        token: Option<CancellationToken>,
    ) -> Result<http::Response<Bytes>> {
        let Some(token) = token else {
            return self.transport.send(request).await;
        };
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                if self.config.enable_logging {
                    tracing::debug!("Request cancelled by caller");
                }
                Err(Error::Cancelled)
            }
            response = self.transport.send(request) => response,
        }
    }

    fn error_for(&self, response: http::Response<Bytes>, error_mapping: Option<&ErrorMapping>) -> Error {
        let (parts, body) = response.into_parts();
        let status = parts.status;
        let content_type = parts
            .headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let error = ApiError::new(status, ResponseHeaders::from_header_map(&parts.headers), body.clone());

        let Some((selector, factory)) = error_mapping.and_then(|m| m.resolve_with_selector(status.as_u16())) else {
            if self.config.enable_logging {
                tracing::debug!("No error mapping for status {}", status);
            }
            return error.into();
        };
        if self.config.enable_logging {
            tracing::debug!("Mapping status {} through '{}'", status, selector);
        }

        let (Some(content_type), false) = (content_type, body.is_empty()) else {
            return error.into();
        };
        match self
            .registry
            .get_root_parse_node(&content_type, &body)
            .and_then(|node| factory(node.as_ref()))
        {
            Ok(payload) => error.with_payload(payload).into(),
            Err(e) => {
                if self.config.enable_logging {
                    tracing::warn!("Could not decode error body for status {}: {}", status, e);
                }
                error.into()
            }
        }
    }
}

#[async_trait]
impl RequestAdapter for HttpRequestAdapter {
    async fn dispatch(
        &self,
        info: RequestInformation,
        error_mapping: Option<&ErrorMapping>,
    ) -> Result<Dispatch> {
        let token = info.cancellation_token().cloned();
        if token.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Err(Error::Cancelled);
        }
        let handler = info
            .get_request_option::<ResponseHandlerOption>()
            .map(|option| option.handler().clone());

        let request = self.to_native(info)?;
        if self.config.enable_logging {
            tracing::debug!("Dispatching {} {}", request.method(), request.uri());
        }

        let response = self.execute(request, token).await?;
        if let Some(handler) = handler {
            return handler
                .handle_response(response, error_mapping)
                .await
                .map(Dispatch::Handled);
        }

        let status = response.status();
        if self.config.enable_logging {
            tracing::debug!("Received {} ({} bytes)", status, response.body().len());
        }
        if !status.is_success() {
            return Err(self.error_for(response, error_mapping));
        }
        if status == StatusCode::NO_CONTENT || is_empty_body(&response) {
            return Ok(Dispatch::NoContent);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Ok(Dispatch::Content {
            content_type,
            body: response.into_body(),
        })
    }

    fn convert_to_native_request(&self, info: RequestInformation) -> Result<http::Request<Bytes>> {
        self.to_native(info)
    }

    fn serialization_registry(&self) -> &SerializationRegistry {
        &self.registry
    }

    fn base_url(&self) -> String {
        self.base_url.read().clone()
    }

    fn set_base_url(&self, base_url: &str) {
        *self.base_url.write() = normalize_base_url(base_url);
    }
}

impl std::fmt::Debug for HttpRequestAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRequestAdapter")
            .field("base_url", &*self.base_url.read())
            .field("config", &self.config)
            .field("registry", &self.registry)
            .finish()
    }
}

fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

fn is_empty_body(response: &http::Response<Bytes>) -> bool {
    response.body().is_empty()
        || response
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "0")
}
