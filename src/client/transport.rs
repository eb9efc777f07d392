//! HTTP transports.
//!
//! The adapter talks to the network only through [`HttpTransport`]: one
//! `http::Request<Bytes>` in, one fully-read `http::Response<Bytes>` out.
//! Authentication, proxies and connection pooling belong to the transport.
//!
//! ```ignore
//! use odata_http::client::{ReqwestTransport, TransportConfig, HttpTransport};
//!
//! let transport = ReqwestTransport::with_config(TransportConfig::default())?;
//! let request = http::Request::get("https://g.example/sites/abc").body(bytes::Bytes::new())?;
//! let response = transport.send(request).await?;
//! println!("Status: {}", response.status());
//! ```

use crate::client::config::TransportConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

/// Sends a request and reads the whole response.
///
/// Implementations return `Error::Transport` for failures that happened before
/// a response arrived; any response, whatever its status, is `Ok`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>>;
}

#[async_trait]
impl<T: HttpTransport + ?Sized> HttpTransport for Arc<T> {
    async fn send(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        (**self).send(request).await
    }
}

/// [`HttpTransport`] over a pooled `reqwest::Client`.
///
/// Redirects are returned as-is; following them is the `RedirectHandler`
/// middleware's job.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    config: Arc<TransportConfig>,
}

impl ReqwestTransport {
    /// Transport with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(TransportConfig::default())
    }

    /// Transport with custom configuration.
    ///
    /// # Errors
    ///
    /// `Error::Config` when the proxy URL is invalid or the TLS backend cannot
    /// be initialized.
    pub fn with_config(config: TransportConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .redirect(reqwest::redirect::Policy::none());

        if !config.proxy_url.is_empty() {
            let proxy = reqwest::Proxy::all(&config.proxy_url)
                .map_err(|e| Error::Config(format!("invalid proxy '{}': {}", config.proxy_url, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("cannot build HTTP client: {}", e)))?;

        Ok(ReqwestTransport {
            client,
            config: Arc::new(config),
        })
    }

    /// Wrap an existing client, e.g. one with authentication middleware.
    pub fn from_client(client: reqwest::Client) -> Self {
        ReqwestTransport {
            client,
            config: Arc::new(TransportConfig::default()),
        }
    }

    /// Get the transport configuration
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let request = reqwest::Request::try_from(request)
            .map_err(|e| Error::Config(format!("cannot convert request: {}", e)))?;

        let response = self.client.execute(request).await?;

        let mut builder = http::Response::builder()
            .status(response.status())
            .version(response.version());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(response.headers().iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let body = response.bytes().await?;
        Ok(builder.body(body)?)
    }
}
