//! Configuration for the request adapter and the reqwest transport.
//!
//! # Adapter Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `base_url` | empty | Substituted for `{+baseurl}` when set |
//! | `user_agent` | `odata_http/<version>` | Added when a request carries none |
//! | `enable_logging` | false | Per-request `tracing` events |
//! | `template_cache_size` | 256 | Parsed URL templates kept; 0 disables the cache |
//!
//! # Transport Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `connect_timeout_ms` | 30000 | TCP/TLS connect timeout |
//! | `pool_idle_timeout_secs` | 90 | Idle connection lifetime |
//! | `pool_max_idle_per_host` | 100 | Idle connections kept per host |
//! | `proxy_url` | empty | Route all traffic through this proxy |
//!
//! The transport has no request timeout: deadlines are the caller's, expressed
//! through a cancellation token on the request.
//!
//! # Examples
//!
//! ```
//! use odata_http::client::AdapterConfig;
//!
//! let config = AdapterConfig {
//!     base_url: "https://graph.microsoft.com/v1.0".to_string(),
//!     ..Default::default()
//! };
//! assert!(!config.enable_logging);
//! assert_eq!(config.template_cache_size, 256);
//! ```

/// Configuration for [`HttpRequestAdapter`](super::HttpRequestAdapter).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Base URL for `{+baseurl}`.
    ///
    /// When empty, the `baseurl` path parameter set by the binding is kept.
    /// A trailing `/` is trimmed.
    pub base_url: String,

    /// Default `User-Agent`, added only when the request has none.
    pub user_agent: Option<String>,

    /// Enable per-request logging.
    ///
    /// When enabled, dispatch, response status and error mapping are logged
    /// using the `tracing` crate.
    pub enable_logging: bool,

    /// Number of parsed URL templates kept in the LRU cache.
    pub template_cache_size: usize,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            base_url: String::new(),
            user_agent: Some(format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))),
            enable_logging: false,
            template_cache_size: 256,
        }
    }
}

/// Configuration for [`ReqwestTransport`](super::ReqwestTransport).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportConfig {
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,

    /// How long idle pooled connections are kept, in seconds.
    pub pool_idle_timeout_secs: u64,

    /// Maximum idle connections kept per host.
    pub pool_max_idle_per_host: usize,

    /// Proxy URL (optional).
    ///
    /// If set, requests will be routed through this proxy.
    pub proxy_url: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            connect_timeout_ms: 30_000,
            pool_idle_timeout_secs: 90,
            pool_max_idle_per_host: 100,
            proxy_url: String::new(),
        }
    }
}
