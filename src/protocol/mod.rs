//! Wire-level building blocks: constants, headers, URL templates and query encoding.
//!
//! # Module Organization
//!
//! ```text
//! protocol/
//! ├── headers  - case-insensitive multi-value header collection
//! ├── template - RFC 6570 subset: {var}, {+var}, {?a,b}, {&a}
//! └── query    - serde-driven query option encoding
//! ```

mod headers;
mod query;
mod template;

pub use headers::{
    parse_media_type, parse_retry_after, HeaderCollection, RequestHeaders, ResponseHeaders,
};
pub use query::to_query_parameters;
pub use template::{append_query, resolve, Operator, UriTemplate};

/// Protocol constants.
pub mod constants {
    /// Path-parameter key whose value replaces template expansion.
    pub const RAW_URL_KEY: &str = "request-raw-url";

    /// Path-parameter key filled from the adapter's base URL.
    pub const BASE_URL_KEY: &str = "baseurl";

    /// Header names.
    pub mod headers {
        pub const ACCEPT: &str = "Accept";
        pub const CONTENT_TYPE: &str = "Content-Type";
        pub const CONTENT_LENGTH: &str = "Content-Length";
        pub const USER_AGENT: &str = "User-Agent";
        pub const RETRY_AFTER: &str = "Retry-After";
        pub const RETRY_ATTEMPT: &str = "Retry-Attempt";
    }

    /// Media types negotiated by bindings.
    pub mod media_types {
        pub const JSON: &str = "application/json";
        pub const TEXT_PLAIN: &str = "text/plain";
        /// `Accept` value for primitive responses such as `$count`.
        pub const TEXT_PLAIN_ACCEPT: &str = "text/plain;q=0.9";
        pub const OCTET_STREAM: &str = "application/octet-stream";
    }

    /// OData control annotations.
    pub mod odata {
        pub const TYPE: &str = "@odata.type";
        pub const NEXT_LINK: &str = "@odata.nextLink";
        pub const DELTA_LINK: &str = "@odata.deltaLink";
        pub const COUNT: &str = "@odata.count";
        /// Namespace prefix stripped from discriminator values by convention.
        pub const DEFAULT_NAMESPACE: &str = "microsoft.graph.";
    }
}
