//! Request descriptions built by endpoint bindings.
//!
//! A [`RequestInformation`] is the frozen description of one HTTP call before
//! the transport runs: method, URL template and parameters, headers, body and
//! middleware options. Bindings produce one per call and hand it to a
//! [`RequestAdapter`](crate::client::RequestAdapter), which consumes it.
//!
//! # Examples
//!
//! ```
//! use odata_http::request::{RequestConfiguration, RequestInformation};
//! use odata_http::types::PathParameters;
//! use http::Method;
//! use serde::Serialize;
//!
//! #[derive(Serialize, Default)]
//! struct LastSevenDaysQuery {
//!     #[serde(rename = "$select", skip_serializing_if = "Option::is_none")]
//!     select: Option<Vec<String>>,
//! }
//!
//! let mut params = PathParameters::new();
//! params.insert("baseurl".into(), "https://g.example".into());
//! params.insert("site%2Did".into(), "abc".into());
//!
//! let mut info = RequestInformation::new(
//!     Method::GET,
//!     "{+baseurl}/sites/{site%2Did}/analytics/lastSevenDays{?%24expand,%24select}",
//!     params,
//! );
//! let config = RequestConfiguration::new().with_query(LastSevenDaysQuery {
//!     select: Some(vec!["id".into(), "startDateTime".into()]),
//! });
//! info.configure(Some(&config)).unwrap();
//! assert_eq!(
//!     info.uri().unwrap(),
//!     "https://g.example/sites/abc/analytics/lastSevenDays?$select=id,startDateTime"
//! );
//! ```

mod builder;
mod options;

pub use builder::BaseRequestBuilder;
pub use options::{
    ChaosHandlerOption, HeadersInspectionOption, NativeResponseHandler,
    ParametersNameDecodingOption, RedirectHandlerOption, RequestOption, RequestOptions,
    ResponseHandler, ResponseHandlerOption, RetryHandlerOption, ShouldRetry,
    TelemetryHandlerOption, UserAgentHandlerOption,
};

use crate::error::Result;
use crate::protocol::constants::{headers, media_types, RAW_URL_KEY};
use crate::protocol::{resolve, to_query_parameters, RequestHeaders};
use crate::serialization::{
    Parsable, Primitive, SerializationRegistry, SerializationWriterExt,
};
use crate::types::{PathParameters, QueryParameters, QueryValue, RequestTarget};
use bytes::Bytes;
use http::Method;
use serde::Serialize;
use std::any::Any;
use tokio_util::sync::CancellationToken;

/// Description of one outgoing HTTP call.
#[derive(Debug, Clone)]
pub struct RequestInformation {
    pub method: Method,
    pub url_template: String,
    pub path_parameters: PathParameters,
    pub query_parameters: QueryParameters,
    pub headers: RequestHeaders,
    pub content: Option<Bytes>,
    options: RequestOptions,
    cancellation: Option<CancellationToken>,
}

impl RequestInformation {
    pub fn new(method: Method, url_template: impl Into<String>, path_parameters: PathParameters) -> Self {
        RequestInformation {
            method,
            url_template: url_template.into(),
            path_parameters,
            query_parameters: QueryParameters::new(),
            headers: RequestHeaders::new(),
            content: None,
            options: RequestOptions::new(),
            cancellation: None,
        }
    }

    /// Where this request goes: the template or a raw URL override.
    pub fn target(&self) -> RequestTarget<'_> {
        RequestTarget::classify(&self.url_template, &self.path_parameters)
    }

    /// The resolved URL.
    ///
    /// # Errors
    ///
    /// `Error::Template` when the template is malformed.
    pub fn uri(&self) -> Result<String> {
        resolve(&self.url_template, &self.path_parameters, &self.query_parameters)
    }

    /// Point the request at an absolute URL, discarding path and query parameters.
    pub fn set_uri(&mut self, url: impl Into<String>) {
        self.path_parameters.clear();
        self.query_parameters.clear();
        self.path_parameters.insert(RAW_URL_KEY.to_string(), url.into());
    }

    /// Merge the populated fields of a query-parameters value.
    ///
    /// Field names come from serde (`#[serde(rename = "$select")]`); `None`
    /// fields are skipped, sequences become lists.
    pub fn add_query_parameters<Q: Serialize + ?Sized>(&mut self, query: &Q) -> Result<()> {
        for (name, value) in to_query_parameters(query)? {
            self.query_parameters.insert(name, value);
        }
        Ok(())
    }

    pub fn add_query_parameter(&mut self, name: impl Into<String>, value: impl Into<QueryValue>) {
        self.query_parameters.insert(name.into(), value.into());
    }

    /// Append options; lookups prefer later entries of the same type.
    pub fn add_request_options<I: IntoIterator<Item = RequestOption>>(&mut self, options: I) {
        self.options.extend(options);
    }

    pub fn add_request_option<O: Any + Send + Sync>(&mut self, option: O) {
        self.options.add(option);
    }

    pub fn get_request_option<O: Any>(&self) -> Option<&O> {
        self.options.get::<O>()
    }

    pub fn request_options(&self) -> &RequestOptions {
        &self.options
    }

    /// Attach a cancellation token observed by the adapter during dispatch.
    pub fn set_cancellation_token(&mut self, token: CancellationToken) {
        self.cancellation = Some(token);
    }

    #[must_use]
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn cancellation_token(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// Apply caller-supplied headers, options and query parameters.
    pub fn configure<Q: Serialize>(&mut self, config: Option<&RequestConfiguration<Q>>) -> Result<()> {
        let Some(config) = config else {
            return Ok(());
        };
        self.headers.add_all(&config.headers);
        self.add_request_options(config.options.iter().cloned());
        if let Some(query) = &config.query_parameters {
            self.add_query_parameters(query)?;
        }
        Ok(())
    }

    /// Serialize `value` as the body.
    pub fn set_content_from_parsable<T: Parsable>(
        &mut self,
        registry: &SerializationRegistry,
        content_type: &str,
        value: &T,
    ) -> Result<()> {
        let mut writer = registry.get_serialization_writer(content_type)?;
        writer.write_object_value(None, value)?;
        self.set_content(writer.get_serialized_content()?, content_type);
        Ok(())
    }

    /// Serialize `values` as a collection body.
    pub fn set_content_from_parsable_collection<T: Parsable>(
        &mut self,
        registry: &SerializationRegistry,
        content_type: &str,
        values: &[T],
    ) -> Result<()> {
        let mut writer = registry.get_serialization_writer(content_type)?;
        writer.write_collection_of_object_values(None, values)?;
        self.set_content(writer.get_serialized_content()?, content_type);
        Ok(())
    }

    /// Serialize a single primitive as the body.
    pub fn set_content_from_scalar<P: Primitive>(
        &mut self,
        registry: &SerializationRegistry,
        content_type: &str,
        value: &P,
    ) -> Result<()> {
        let mut writer = registry.get_serialization_writer(content_type)?;
        writer.write_primitive_value(None, value)?;
        self.set_content(writer.get_serialized_content()?, content_type);
        Ok(())
    }

    /// Serialize a collection of primitives as the body.
    pub fn set_content_from_scalar_collection<P: Primitive>(
        &mut self,
        registry: &SerializationRegistry,
        content_type: &str,
        values: &[P],
    ) -> Result<()> {
        let mut writer = registry.get_serialization_writer(content_type)?;
        writer.write_collection_of_primitive_values(None, values)?;
        self.set_content(writer.get_serialized_content()?, content_type);
        Ok(())
    }

    /// Use raw bytes as the body; the content type defaults to
    /// `application/octet-stream`.
    pub fn set_stream_content(&mut self, content: impl Into<Bytes>, content_type: Option<&str>) {
        self.set_content(content.into(), content_type.unwrap_or(media_types::OCTET_STREAM));
    }

    fn set_content(&mut self, content: Bytes, content_type: &str) {
        self.headers.remove(headers::CONTENT_TYPE);
        self.headers.add(headers::CONTENT_TYPE, content_type);
        self.content = Some(content);
    }
}

/// Caller configuration for one call: extra headers, options and typed query
/// parameters.
///
/// `Q` is the binding's query-parameters struct; endpoints without query
/// options use `()`.
#[derive(Debug, Clone)]
pub struct RequestConfiguration<Q = ()> {
    pub headers: RequestHeaders,
    pub options: Vec<RequestOption>,
    pub query_parameters: Option<Q>,
}

impl<Q> RequestConfiguration<Q> {
    pub fn new() -> Self {
        RequestConfiguration {
            headers: RequestHeaders::new(),
            options: Vec::new(),
            query_parameters: None,
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    #[must_use]
    pub fn with_option<O: Any + Send + Sync>(mut self, option: O) -> Self {
        self.options.push(RequestOption::new(option));
        self
    }

    #[must_use]
    pub fn with_query(mut self, query: Q) -> Self {
        self.query_parameters = Some(query);
        self
    }
}

impl<Q> Default for RequestConfiguration<Q> {
    fn default() -> Self {
        Self::new()
    }
}
