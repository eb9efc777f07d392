//! Request dispatch for OData bindings.
//!
//! This module turns a [`RequestInformation`](crate::request::RequestInformation)
//! into a typed value:
//!
//! - **Resolve** the URL template against the path-parameter snapshot
//! - **Send** through a middleware pipeline over an injected transport
//! - **Map** non-2xx statuses to typed errors
//! - **Deserialize** 2xx bodies through the serialization registry
//! - **Page** through `@odata.nextLink` collections
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── adapter       - RequestAdapter trait and HttpRequestAdapter
//! ├── config        - Adapter and transport configuration
//! ├── error_mapping - Status selectors and error factories
//! ├── middleware    - Pipeline and the default handlers
//! ├── paging        - PageIterator over next links
//! ├── retry         - Backoff and Retry-After helpers
//! └── transport     - HttpTransport trait and the reqwest transport
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RequestAdapter`] | Object-safe dispatcher shared by every binding |
//! | [`RequestAdapterExt`] | Typed `send*` operations |
//! | [`HttpRequestAdapter`] | Default adapter over an [`HttpTransport`] |
//! | [`ErrorMapping`] | Status selector to error factory |
//! | [`Pipeline`] | Middleware chain ending in a transport |
//! | [`PageIterator`] | Item iteration across pages |
//!
//! # Examples
//!
//! ## Creating an Adapter
//!
//! ```no_run
//! use odata_http::client::{AdapterConfig, HttpRequestAdapter, TransportConfig};
//!
//! let adapter = HttpRequestAdapter::with_reqwest(
//!     AdapterConfig {
//!         base_url: "https://graph.microsoft.com/v1.0".to_string(),
//!         enable_logging: true,
//!         ..Default::default()
//!     },
//!     TransportConfig::default(),
//! )
//! .unwrap();
//! ```
//!
//! ## Utility Functions
//!
//! ```
//! use odata_http::client::{exponential_backoff, is_retryable_status};
//! use std::time::Duration;
//!
//! assert!(is_retryable_status(503));
//! assert!(!is_retryable_status(404));
//!
//! let delay = exponential_backoff(2, 100);
//! assert_eq!(delay, Duration::from_millis(400));
//! ```

mod adapter;
mod config;
mod error_mapping;
mod middleware;
mod paging;
mod retry;
mod transport;

pub use adapter::{Dispatch, HttpRequestAdapter, RequestAdapter, RequestAdapterExt};
pub use config::{AdapterConfig, TransportConfig};
pub use error_mapping::{ErrorFactory, ErrorMapping, StatusSelector};
pub use middleware::{
    clone_request, decode_parameter_names, request_option, HeadersInspectionHandler, Middleware,
    Next, ParametersNameDecodingHandler, Pipeline, RedirectHandler, RetryHandler, UserAgentHandler,
};
pub use paging::{CollectionPage, PageIterator};
pub use retry::{exponential_backoff, is_retryable_status, retry_delay, MAX_RETRY_DELAY};
pub use transport::{HttpTransport, ReqwestTransport};
