#![doc = include_str!("../README.md")]

//! # OData HTTP: the runtime under generated OData clients
//!
//! Generated endpoint bindings describe each call (verb, URL template, path
//! parameters, query options, body) and hand it to this crate, which sends it
//! and returns a typed value or a typed error.
//!
//! ## Overview
//!
//! The runtime is composed of independent layers:
//!
//! 1. **URL templates** - RFC 6570 subset with a raw-URL override
//! 2. **Request description** - [`RequestInformation`](request::RequestInformation),
//!    headers, query parameters and middleware options
//! 3. **Serialization** - format-agnostic parse nodes and writers, JSON and text built in
//! 4. **Dispatch** - [`RequestAdapter`](client::RequestAdapter) over an injected transport,
//!    with status-based error mapping
//!
//! ## Key Features
//!
//! - **Typed query options**: any `serde::Serialize` struct; `#[serde(rename = "$select")]`
//!   carries the wire name
//! - **Polymorphic models**: `@odata.type` discriminator dispatch
//! - **Error mapping**: exact status, `4XX`/`5XX` class, `XXX` catch-all
//! - **Middleware**: retry with `Retry-After`, parameter-name decoding, user agent,
//!   headers inspection
//! - **Cancellation**: a `CancellationToken` per request
//! - **Paging**: follow `@odata.nextLink` as items or as a stream
//!
//! ## Client Usage
//!
//! ```ignore
//! use odata_http::client::{AdapterConfig, ErrorMapping, HttpRequestAdapter, RequestAdapterExt,
//!     StatusSelector, TransportConfig};
//! use odata_http::models::create_odata_error_from_discriminator_value;
//! use odata_http::request::RequestInformation;
//! use http::Method;
//!
//! #[tokio::main]
//! async fn main() -> odata_http::Result<()> {
//!     let adapter = HttpRequestAdapter::with_reqwest(
//!         AdapterConfig {
//!             base_url: "https://graph.microsoft.com/v1.0".to_string(),
//!             ..Default::default()
//!         },
//!         TransportConfig::default(),
//!     )?;
//!
//!     let mut info = RequestInformation::new(Method::GET, "{+baseurl}/sites/{site%2Did}/termStore/sets/$count", params);
//!     info.headers.add("Accept", "text/plain;q=0.9");
//!     let errors = ErrorMapping::new().with(StatusSelector::Any, create_odata_error_from_discriminator_value);
//!     let count: Option<i64> = adapter.send_primitive(info, Some(&errors)).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Path and query parameter maps, request targets
//! - **[error]** - Error types and result handling
//! - **[protocol]** - URL templates, query encoding, headers, constants
//! - **[serialization]** - Parse nodes, writers, registry, discriminators
//! - **[request]** - Request information, options, base request builder
//! - **[client]** - Adapter, middleware, transport, error mapping, paging
//! - **[models]** - `ODataError` and `CollectionResponse`

pub mod client;
pub mod error;
pub mod models;
pub mod protocol;
pub mod request;
pub mod serialization;
pub mod types;

pub use client::{HttpRequestAdapter, RequestAdapter, RequestAdapterExt};
pub use error::{ApiError, BoxError, Error, Result};
pub use request::{BaseRequestBuilder, RequestConfiguration, RequestInformation};
