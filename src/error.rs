//! Error types for request building and dispatch.
//!
//! Every fallible operation in the crate returns [`Result`]. The variants map one
//! to one onto the stages of a call:
//!
//! | Variant | Raised when | Retryable |
//! |---------|-------------|-----------|
//! | `Template` | URL template malformed | No |
//! | `Serialization` | Request body or query options cannot be written | No |
//! | `Deserialization` | Response body unreadable, or no parser for its content type | No |
//! | `Transport` | Network, TLS, DNS failure, connection reset | Yes |
//! | `Cancelled` | Caller cancelled before completion | No |
//! | `Api` | Service answered with a non-2xx status | 408, 425, 429, 502, 503, 504 |
//! | `Config` | Adapter or header setup is invalid | No |
//!
//! A 204 or an empty 2xx body is never an error; it yields `None` or an empty
//! collection.
//!
//! # Examples
//!
//! ```
//! use odata_http::{ApiError, Error};
//! use http::StatusCode;
//!
//! let err = Error::from(ApiError::new(StatusCode::SERVICE_UNAVAILABLE, Default::default(), Default::default()));
//! assert!(err.is_retryable());
//! assert!(!Error::Cancelled.is_retryable());
//! ```

use crate::protocol::ResponseHeaders;
use bytes::Bytes;
use http::StatusCode;
use std::fmt;
use thiserror::Error;

/// Result type for request building and dispatch.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed, thread-safe error used for transport causes and typed error payloads.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced to callers.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Ill-formed URL template.
    #[error("Template error: {0}")]
    Template(String),

    /// A request body or query-options value could not be written.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A response body could not be read, or no parse node factory is
    /// registered for its content type.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// The transport failed before a response was received.
    ///
    /// The error map is never consulted for these.
    #[error("Transport error: {0}")]
    Transport(#[source] BoxError),

    /// The caller's cancellation token fired before the call completed.
    #[error("Request cancelled")]
    Cancelled,

    /// The service answered with a non-2xx status.
    #[error(transparent)]
    Api(Box<ApiError>),

    /// Invalid adapter, registry or header configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Wrap any error as a transport failure.
    pub fn transport<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Error::Transport(err.into())
    }

    /// Check whether repeating the call may succeed.
    ///
    /// Transport failures and the throttling/unavailable statuses
    /// (408, 425, 429, 502, 503, 504) are retryable.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(_) => true,
            Error::Api(api) => crate::client::is_retryable_status(api.status().as_u16()),
            _ => false,
        }
    }

    /// Check whether the call was cancelled by the caller.
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// The API error, when the service answered with a non-2xx status.
    pub fn as_api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api(api) => Some(&**api),
            _ => None,
        }
    }
}

impl From<ApiError> for Error {
    fn from(err: ApiError) -> Self {
        Error::Api(Box::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Deserialization(err.to_string())
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(Box::new(err))
    }
}

impl serde::ser::Error for Error {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Serialization(msg.to_string())
    }
}

/// A non-2xx response, carrying status, headers, raw body and, when the error
/// mapping could parse it, the typed error payload.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    headers: ResponseHeaders,
    body: Bytes,
    payload: Option<BoxError>,
}

impl ApiError {
    /// A generic error with no typed payload.
    pub fn new(status: StatusCode, headers: ResponseHeaders, body: Bytes) -> Self {
        ApiError {
            status,
            headers,
            body,
            payload: None,
        }
    }

    /// Attach the typed payload produced by an error mapping factory.
    #[must_use]
    pub fn with_payload(mut self, payload: BoxError) -> Self {
        self.payload = Some(payload);
        self
    }

    /// HTTP status of the response.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &ResponseHeaders {
        &self.headers
    }

    /// Raw response body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// The typed payload, if it is an `E`.
    ///
    /// ```
    /// use odata_http::ApiError;
    /// use odata_http::models::{MainError, ODataError};
    /// use http::StatusCode;
    ///
    /// let payload = ODataError::new(MainError::new("itemNotFound", "gone"));
    /// let err = ApiError::new(StatusCode::NOT_FOUND, Default::default(), Default::default())
    ///     .with_payload(Box::new(payload));
    /// assert_eq!(err.payload::<ODataError>().unwrap().code(), Some("itemNotFound"));
    /// ```
    pub fn payload<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.payload.as_ref().and_then(|p| p.downcast_ref::<E>())
    }

    /// Whether a typed payload was parsed.
    pub fn has_payload(&self) -> bool {
        self.payload.is_some()
    }

    /// Take the typed payload out of the error.
    pub fn into_payload(self) -> Option<BoxError> {
        self.payload
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.payload {
            Some(payload) => write!(f, "API error {}: {}", self.status, payload),
            None if !self.body.is_empty() && self.body.len() <= 256 => {
                write!(f, "API error {}: {}", self.status, String::from_utf8_lossy(&self.body))
            }
            None => write!(f, "API error {}", self.status),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.payload
            .as_ref()
            .map(|p| p.as_ref() as &(dyn std::error::Error + 'static))
    }
}
