//! Hand-written stand-ins for generated models.

use chrono::{DateTime, FixedOffset};
use odata_http::models::CollectionResponse;
use odata_http::serialization::{
    DiscriminatorRegistry, Parsable, ParseNode, ParseNodeExt, SerializationWriter,
    SerializationWriterExt,
};
use odata_http::Result;
use std::ops::Deref;
use std::sync::OnceLock;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemActionStat {
    pub action_count: Option<i32>,
    pub actor_count: Option<i32>,
}

impl Parsable for ItemActionStat {
    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<()> {
        writer.write_optional("actionCount", self.action_count.as_ref())?;
        writer.write_optional("actorCount", self.actor_count.as_ref())
    }
}

pub fn create_item_action_stat_from_discriminator_value(node: &dyn ParseNode) -> Result<ItemActionStat> {
    Ok(ItemActionStat {
        action_count: node.child("actionCount")?,
        actor_count: node.child("actorCount")?,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemActivityStat {
    pub id: Option<String>,
    pub odata_type: Option<String>,
    pub start_date_time: Option<DateTime<FixedOffset>>,
    pub end_date_time: Option<DateTime<FixedOffset>>,
    pub is_trending: Option<bool>,
    pub access: Option<ItemActionStat>,
    pub edit: Option<ItemActionStat>,
}

impl Parsable for ItemActivityStat {
    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<()> {
        writer.write_optional("@odata.type", self.odata_type.as_ref())?;
        writer.write_optional("id", self.id.as_ref())?;
        writer.write_optional("startDateTime", self.start_date_time.as_ref())?;
        writer.write_optional("endDateTime", self.end_date_time.as_ref())?;
        writer.write_optional("isTrending", self.is_trending.as_ref())?;
        writer.write_optional_object("access", self.access.as_ref())?;
        writer.write_optional_object("edit", self.edit.as_ref())
    }
}

pub fn create_item_activity_stat_from_discriminator_value(node: &dyn ParseNode) -> Result<ItemActivityStat> {
    Ok(ItemActivityStat {
        id: node.child("id")?,
        odata_type: node.child("@odata.type")?,
        start_date_time: node.child("startDateTime")?,
        end_date_time: node.child("endDateTime")?,
        is_trending: node.child("isTrending")?,
        access: node.child_object("access", create_item_action_stat_from_discriminator_value)?,
        edit: node.child_object("edit", create_item_action_stat_from_discriminator_value)?,
    })
}

pub fn create_item_activity_stat_collection_response_from_discriminator_value(
    node: &dyn ParseNode,
) -> Result<CollectionResponse<ItemActivityStat>> {
    CollectionResponse::parse(node, create_item_activity_stat_from_discriminator_value)
}

/// Fields shared by every `baseItem`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BaseItemFields {
    pub id: Option<String>,
    pub name: Option<String>,
    pub web_url: Option<String>,
}

impl BaseItemFields {
    fn parse(node: &dyn ParseNode) -> Result<Self> {
        Ok(BaseItemFields {
            id: node.child("id")?,
            name: node.child("name")?,
            web_url: node.child("webUrl")?,
        })
    }

    fn write(&self, writer: &mut dyn SerializationWriter) -> Result<()> {
        writer.write_optional("id", self.id.as_ref())?;
        writer.write_optional("name", self.name.as_ref())?;
        writer.write_optional("webUrl", self.web_url.as_ref())
    }
}

/// The `baseItem` family, closed over the subtypes these tests use.
#[derive(Debug, Clone, PartialEq)]
pub enum BaseItem {
    DriveItem { base: BaseItemFields, size: Option<i64> },
    ListItem { base: BaseItemFields, content_type: Option<String> },
    Base(BaseItemFields),
}

impl BaseItem {
    pub fn base(&self) -> &BaseItemFields {
        match self {
            BaseItem::DriveItem { base, .. } | BaseItem::ListItem { base, .. } | BaseItem::Base(base) => base,
        }
    }
}

impl Parsable for BaseItem {
    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<()> {
        match self {
            BaseItem::DriveItem { base, size } => {
                writer.write_string_value(Some("@odata.type"), "#microsoft.graph.driveItem")?;
                base.write(writer)?;
                writer.write_optional("size", size.as_ref())
            }
            BaseItem::ListItem { base, content_type } => {
                writer.write_string_value(Some("@odata.type"), "#microsoft.graph.listItem")?;
                base.write(writer)?;
                writer.write_optional("contentTypeName", content_type.as_ref())
            }
            BaseItem::Base(base) => base.write(writer),
        }
    }
}

fn create_drive_item(node: &dyn ParseNode) -> Result<BaseItem> {
    Ok(BaseItem::DriveItem {
        base: BaseItemFields::parse(node)?,
        size: node.child("size")?,
    })
}

fn create_list_item(node: &dyn ParseNode) -> Result<BaseItem> {
    Ok(BaseItem::ListItem {
        base: BaseItemFields::parse(node)?,
        content_type: node.child("contentTypeName")?,
    })
}

fn create_base(node: &dyn ParseNode) -> Result<BaseItem> {
    BaseItemFields::parse(node).map(BaseItem::Base)
}

pub fn create_base_item_from_discriminator_value(node: &dyn ParseNode) -> Result<BaseItem> {
    static REGISTRY: OnceLock<DiscriminatorRegistry<BaseItem>> = OnceLock::new();
    REGISTRY
        .get_or_init(|| {
            DiscriminatorRegistry::new(create_base)
                .register("#microsoft.graph.driveItem", create_drive_item)
                .register("#microsoft.graph.listItem", create_list_item)
        })
        .create_from_discriminator_value(node)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriveRecipient {
    pub email: Option<String>,
}

impl Parsable for DriveRecipient {
    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<()> {
        writer.write_optional("email", self.email.as_ref())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrantPostRequestBody {
    pub recipients: Vec<DriveRecipient>,
    pub roles: Vec<String>,
}

impl Parsable for GrantPostRequestBody {
    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<()> {
        writer.write_collection_of_object_values(Some("recipients"), &self.recipients)?;
        writer.write_collection_of_primitive_values(Some("roles"), &self.roles)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Permission {
    pub id: Option<String>,
    pub roles: Vec<String>,
}

pub fn create_permission_from_discriminator_value(node: &dyn ParseNode) -> Result<Permission> {
    Ok(Permission {
        id: node.child("id")?,
        roles: node.child_primitive_collection("roles")?,
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrantPostResponse {
    pub value: Vec<Permission>,
    pub next_link: Option<String>,
}

pub fn create_grant_post_response_from_discriminator_value(node: &dyn ParseNode) -> Result<GrantPostResponse> {
    let page = CollectionResponse::parse(node, create_permission_from_discriminator_value)?;
    Ok(GrantPostResponse {
        value: page.value,
        next_link: page.next_link,
    })
}

/// Old name of [`GrantPostResponse`], kept for existing callers.
#[deprecated(note = "use GrantPostResponse")]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrantResponse(pub GrantPostResponse);

#[allow(deprecated)]
impl Deref for GrantResponse {
    type Target = GrantPostResponse;

    fn deref(&self) -> &GrantPostResponse {
        &self.0
    }
}

#[allow(deprecated)]
pub fn create_grant_response_from_discriminator_value(node: &dyn ParseNode) -> Result<GrantResponse> {
    create_grant_post_response_from_discriminator_value(node).map(GrantResponse)
}
