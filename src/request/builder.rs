use crate::client::RequestAdapter;
use crate::error::Result;
use crate::protocol::constants::{headers, RAW_URL_KEY};
use crate::request::{RequestConfiguration, RequestInformation};
use crate::types::PathParameters;
use http::Method;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Shared state of every endpoint binding: URL template, path-parameter
/// snapshot and the adapter requests are sent through.
///
/// Bindings wrap one of these and add typed `get`/`post`/... methods. Cloning
/// is cheap and performs no I/O.
///
/// # Examples
///
/// ```ignore
/// pub struct RestoreVersionRequestBuilder {
///     base: BaseRequestBuilder,
/// }
///
/// impl RestoreVersionRequestBuilder {
///     pub fn new(adapter: Arc<dyn RequestAdapter>, path_parameters: PathParameters) -> Self {
///         Self {
///             base: BaseRequestBuilder::new(
///                 adapter,
///                 "{+baseurl}/drives/{drive%2Did}/items/{driveItem%2Did}/versions/{driveItemVersion%2Did}/restoreVersion",
///                 path_parameters,
///             ),
///         }
///     }
///
///     pub async fn post(&self, config: Option<&RequestConfiguration>) -> Result<()> {
///         let info = self.base.to_request_information_with(Method::POST, Some("application/json"), config)?;
///         self.base.request_adapter.send_no_content(info, Some(&odata_error_mapping())).await
///     }
/// }
/// ```
#[derive(Clone)]
pub struct BaseRequestBuilder {
    pub url_template: String,
    pub path_parameters: PathParameters,
    pub request_adapter: Arc<dyn RequestAdapter>,
}

impl BaseRequestBuilder {
    pub fn new(
        request_adapter: Arc<dyn RequestAdapter>,
        url_template: impl Into<String>,
        path_parameters: PathParameters,
    ) -> Self {
        BaseRequestBuilder {
            url_template: url_template.into(),
            path_parameters,
            request_adapter,
        }
    }

    /// Builder whose snapshot holds only the raw URL; the template is kept but
    /// never expanded.
    pub fn with_raw_url(
        request_adapter: Arc<dyn RequestAdapter>,
        url_template: impl Into<String>,
        raw_url: impl Into<String>,
    ) -> Self {
        let mut path_parameters = PathParameters::new();
        path_parameters.insert(RAW_URL_KEY.to_string(), raw_url.into());
        Self::new(request_adapter, url_template, path_parameters)
    }

    /// Snapshot for a child builder: this builder's parameters plus `name`.
    pub fn path_parameters_with(&self, name: &str, value: impl Into<String>) -> PathParameters {
        let mut path_parameters = self.path_parameters.clone();
        path_parameters.insert(name.to_string(), value.into());
        path_parameters
    }

    pub fn to_request_information(&self, method: Method) -> RequestInformation {
        RequestInformation::new(method, self.url_template.clone(), self.path_parameters.clone())
    }

    /// Request information with caller configuration applied and `Accept`
    /// defaulted to `accept` unless the caller set one.
    pub fn to_request_information_with<Q: Serialize>(
        &self,
        method: Method,
        accept: Option<&str>,
        config: Option<&RequestConfiguration<Q>>,
    ) -> Result<RequestInformation> {
        let mut info = self.to_request_information(method);
        info.configure(config)?;
        if let Some(accept) = accept {
            info.headers.try_add(headers::ACCEPT, accept);
        }
        Ok(info)
    }

    /// The adapter requests go through.
    pub fn request_adapter(&self) -> &Arc<dyn RequestAdapter> {
        &self.request_adapter
    }
}

impl fmt::Debug for BaseRequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BaseRequestBuilder")
            .field("url_template", &self.url_template)
            .field("path_parameters", &self.path_parameters)
            .finish_non_exhaustive()
    }
}
