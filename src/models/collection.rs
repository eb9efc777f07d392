use crate::error::Result;
use crate::protocol::constants::odata;
use crate::serialization::{
    Parsable, ParsableFactory, ParseNode, ParseNodeExt, SerializationWriter, SerializationWriterExt,
};

/// One page of an OData collection: `{"value": [...], "@odata.nextLink": "..."}`.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionResponse<T> {
    pub value: Vec<T>,
    pub next_link: Option<String>,
    pub delta_link: Option<String>,
    pub count: Option<i64>,
}

impl<T> Default for CollectionResponse<T> {
    fn default() -> Self {
        CollectionResponse {
            value: Vec::new(),
            next_link: None,
            delta_link: None,
            count: None,
        }
    }
}

impl<T> CollectionResponse<T> {
    /// Read a page, building items with `item_factory`.
    ///
    /// Generated code wraps this in a named factory per item type:
    ///
    /// ```
    /// use odata_http::models::CollectionResponse;
    /// use odata_http::serialization::{ParseNode, ParseNodeExt};
    /// use odata_http::Result;
    ///
    /// fn create_name(node: &dyn ParseNode) -> Result<String> {
    ///     Ok(node.child("name")?.unwrap_or_default())
    /// }
    ///
    /// fn create_name_collection_response(node: &dyn ParseNode) -> Result<CollectionResponse<String>> {
    ///     CollectionResponse::parse(node, create_name)
    /// }
    /// ```
    pub fn parse(node: &dyn ParseNode, item_factory: ParsableFactory<T>) -> Result<Self> {
        Ok(CollectionResponse {
            value: node.child_collection("value", item_factory)?,
            next_link: node.child(odata::NEXT_LINK)?,
            delta_link: node.child(odata::DELTA_LINK)?,
            count: node.child(odata::COUNT)?,
        })
    }
}

impl<T: Parsable> Parsable for CollectionResponse<T> {
    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<()> {
        writer.write_optional(odata::COUNT, self.count.as_ref())?;
        writer.write_optional(odata::NEXT_LINK, self.next_link.as_ref())?;
        writer.write_optional(odata::DELTA_LINK, self.delta_link.as_ref())?;
        writer.write_collection_of_object_values(Some("value"), &self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::JsonParseNode;
    use serde_json::json;

    fn create_id(node: &dyn ParseNode) -> Result<String> {
        Ok(node.child("id")?.unwrap_or_default())
    }

    #[test]
    fn test_parse_page() {
        let node = JsonParseNode::new(json!({
            "@odata.count": 3,
            "@odata.nextLink": "https://g.example/next",
            "value": [{"id": "a"}, {"id": "b"}]
        }));
        let page = CollectionResponse::parse(&node, create_id).unwrap();
        assert_eq!(page.value, vec!["a", "b"]);
        assert_eq!(page.next_link.as_deref(), Some("https://g.example/next"));
        assert_eq!(page.count, Some(3));
        assert!(page.delta_link.is_none());
    }

    #[test]
    fn test_parse_empty_page() {
        let page = CollectionResponse::parse(&JsonParseNode::new(json!({})), create_id).unwrap();
        assert!(page.value.is_empty());
        assert!(page.next_link.is_none());
    }
}
