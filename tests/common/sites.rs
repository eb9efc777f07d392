//! Hand-written stand-ins for generated endpoint bindings.

#![allow(deprecated)]

use super::models::*;
use super::odata_error_mapping;
use http::Method;
use odata_http::client::RequestAdapterExt;
use odata_http::models::CollectionResponse;
use odata_http::protocol::constants::media_types;
use odata_http::request::{BaseRequestBuilder, RequestConfiguration, RequestInformation};
use odata_http::types::PathParameters;
use odata_http::{RequestAdapter, Result};
use serde::Serialize;
use std::sync::Arc;

/// `$expand`/`$select` options shared by item reads.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExpandSelectQueryParameters {
    #[serde(rename = "$expand", skip_serializing_if = "Option::is_none")]
    pub expand: Option<Vec<String>>,
    #[serde(rename = "$select", skip_serializing_if = "Option::is_none")]
    pub select: Option<Vec<String>>,
}

/// `/sites/{site-id}/analytics/lastSevenDays`
#[derive(Debug, Clone)]
pub struct LastSevenDaysRequestBuilder {
    base: BaseRequestBuilder,
}

pub type LastSevenDaysRequestBuilderGetRequestConfiguration = RequestConfiguration<ExpandSelectQueryParameters>;

impl LastSevenDaysRequestBuilder {
    const URL_TEMPLATE: &'static str = "{+baseurl}/sites/{site%2Did}/analytics/lastSevenDays{?%24expand,%24select}";

    pub fn new(adapter: Arc<dyn RequestAdapter>, path_parameters: PathParameters) -> Self {
        LastSevenDaysRequestBuilder {
            base: BaseRequestBuilder::new(adapter, Self::URL_TEMPLATE, path_parameters),
        }
    }

    pub fn to_get_request_information(
        &self,
        config: Option<&LastSevenDaysRequestBuilderGetRequestConfiguration>,
    ) -> Result<RequestInformation> {
        self.base
            .to_request_information_with(Method::GET, Some(media_types::JSON), config)
    }

    pub async fn get(
        &self,
        config: Option<&LastSevenDaysRequestBuilderGetRequestConfiguration>,
    ) -> Result<Option<CollectionResponse<ItemActivityStat>>> {
        let info = self.to_get_request_information(config)?;
        self.base
            .request_adapter
            .send(
                info,
                create_item_activity_stat_collection_response_from_discriminator_value,
                Some(&odata_error_mapping()),
            )
            .await
    }
}

/// `$filter`/`$search` options of `$count` endpoints.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CountQueryParameters {
    #[serde(rename = "$filter", skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(rename = "$search", skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
}

/// `/sites/{site-id}/termStore/sets/{set-id}/children/$count`
#[derive(Debug, Clone)]
pub struct ChildrenCountRequestBuilder {
    base: BaseRequestBuilder,
}

impl ChildrenCountRequestBuilder {
    const URL_TEMPLATE: &'static str =
        "{+baseurl}/sites/{site%2Did}/termStore/sets/{set%2Did}/children/$count{?%24filter,%24search}";

    pub fn new(adapter: Arc<dyn RequestAdapter>, path_parameters: PathParameters) -> Self {
        ChildrenCountRequestBuilder {
            base: BaseRequestBuilder::new(adapter, Self::URL_TEMPLATE, path_parameters),
        }
    }

    pub fn to_get_request_information(
        &self,
        config: Option<&RequestConfiguration<CountQueryParameters>>,
    ) -> Result<RequestInformation> {
        self.base
            .to_request_information_with(Method::GET, Some(media_types::TEXT_PLAIN_ACCEPT), config)
    }

    pub async fn get(&self, config: Option<&RequestConfiguration<CountQueryParameters>>) -> Result<Option<i32>> {
        let info = self.to_get_request_information(config)?;
        self.base
            .request_adapter
            .send_primitive(info, Some(&odata_error_mapping()))
            .await
    }
}

/// `/drives/{drive-id}/items/{driveItem-id}/versions/{driveItemVersion-id}/restoreVersion`
#[derive(Debug, Clone)]
pub struct RestoreVersionRequestBuilder {
    base: BaseRequestBuilder,
}

impl RestoreVersionRequestBuilder {
    const URL_TEMPLATE: &'static str =
        "{+baseurl}/drives/{drive%2Did}/items/{driveItem%2Did}/versions/{driveItemVersion%2Did}/restoreVersion";

    pub fn new(adapter: Arc<dyn RequestAdapter>, path_parameters: PathParameters) -> Self {
        RestoreVersionRequestBuilder {
            base: BaseRequestBuilder::new(adapter, Self::URL_TEMPLATE, path_parameters),
        }
    }

    pub fn to_post_request_information(&self, config: Option<&RequestConfiguration>) -> Result<RequestInformation> {
        self.base
            .to_request_information_with(Method::POST, Some(media_types::JSON), config)
    }

    pub async fn post(&self, config: Option<&RequestConfiguration>) -> Result<()> {
        let info = self.to_post_request_information(config)?;
        self.base
            .request_adapter
            .send_no_content(info, Some(&odata_error_mapping()))
            .await
    }
}

/// `/sites/{site-id}/items/{baseItem-id}`
#[derive(Debug, Clone)]
pub struct BaseItemItemRequestBuilder {
    base: BaseRequestBuilder,
}

impl BaseItemItemRequestBuilder {
    const URL_TEMPLATE: &'static str = "{+baseurl}/sites/{site%2Did}/items/{baseItem%2Did}{?%24expand,%24select}";

    pub fn new(adapter: Arc<dyn RequestAdapter>, path_parameters: PathParameters) -> Self {
        BaseItemItemRequestBuilder {
            base: BaseRequestBuilder::new(adapter, Self::URL_TEMPLATE, path_parameters),
        }
    }

    /// Builder bound to `raw_url` instead of the template.
    pub fn with_url(&self, raw_url: &str) -> Self {
        BaseItemItemRequestBuilder {
            base: BaseRequestBuilder::with_raw_url(
                self.base.request_adapter.clone(),
                Self::URL_TEMPLATE,
                raw_url,
            ),
        }
    }

    pub fn to_get_request_information(
        &self,
        config: Option<&RequestConfiguration<ExpandSelectQueryParameters>>,
    ) -> Result<RequestInformation> {
        self.base
            .to_request_information_with(Method::GET, Some(media_types::JSON), config)
    }

    pub async fn get(
        &self,
        config: Option<&RequestConfiguration<ExpandSelectQueryParameters>>,
    ) -> Result<Option<BaseItem>> {
        let info = self.to_get_request_information(config)?;
        self.base
            .request_adapter
            .send(info, create_base_item_from_discriminator_value, Some(&odata_error_mapping()))
            .await
    }
}

/// `/shares/{sharedDriveItem-id}/permission/grant`
#[derive(Debug, Clone)]
pub struct GrantRequestBuilder {
    base: BaseRequestBuilder,
}

impl GrantRequestBuilder {
    const URL_TEMPLATE: &'static str = "{+baseurl}/shares/{sharedDriveItem%2Did}/permission/grant";

    pub fn new(adapter: Arc<dyn RequestAdapter>, path_parameters: PathParameters) -> Self {
        GrantRequestBuilder {
            base: BaseRequestBuilder::new(adapter, Self::URL_TEMPLATE, path_parameters),
        }
    }

    pub fn to_post_request_information(
        &self,
        body: &GrantPostRequestBody,
        config: Option<&RequestConfiguration>,
    ) -> Result<RequestInformation> {
        let mut info = self
            .base
            .to_request_information_with(Method::POST, Some(media_types::JSON), config)?;
        info.set_content_from_parsable(
            self.base.request_adapter.serialization_registry(),
            media_types::JSON,
            body,
        )?;
        Ok(info)
    }

    #[deprecated(note = "use post_as_grant_post_response")]
    pub async fn post(
        &self,
        body: &GrantPostRequestBody,
        config: Option<&RequestConfiguration>,
    ) -> Result<Option<GrantResponse>> {
        let info = self.to_post_request_information(body, config)?;
        self.base
            .request_adapter
            .send(info, create_grant_response_from_discriminator_value, Some(&odata_error_mapping()))
            .await
    }

    pub async fn post_as_grant_post_response(
        &self,
        body: &GrantPostRequestBody,
        config: Option<&RequestConfiguration>,
    ) -> Result<Option<GrantPostResponse>> {
        let info = self.to_post_request_information(body, config)?;
        self.base
            .request_adapter
            .send(
                info,
                create_grant_post_response_from_discriminator_value,
                Some(&odata_error_mapping()),
            )
            .await
    }
}
