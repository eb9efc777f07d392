//! `application/json` parse nodes and writers backed by `serde_json`.

use super::{
    ParseNode, ParseNodeFactory, SerializationWriter, SerializationWriterFactory, UntypedValue,
};
use crate::error::{Error, Result};
use crate::protocol::constants::media_types;
use bytes::Bytes;
use serde_json::{Map, Number, Value};

/// A node of a parsed JSON document.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonParseNode {
    value: Value,
}

impl JsonParseNode {
    pub fn new(value: Value) -> Self {
        JsonParseNode { value }
    }

    /// Parse a JSON document.
    pub fn from_slice(content: &[u8]) -> Result<Self> {
        let value = serde_json::from_slice(content)
            .map_err(|e| Error::Deserialization(format!("invalid JSON: {}", e)))?;
        Ok(JsonParseNode { value })
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::Deserialization(format!("expected {}, found {}", expected, kind(&self.value)))
    }
}

impl ParseNode for JsonParseNode {
    fn get_child_node(&self, name: &str) -> Option<Box<dyn ParseNode>> {
        self.value
            .as_object()
            .and_then(|map| map.get(name))
            .map(|child| Box::new(JsonParseNode::new(child.clone())) as Box<dyn ParseNode>)
    }

    fn get_child_names(&self) -> Vec<String> {
        self.value
            .as_object()
            .map(|map| map.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn get_collection_nodes(&self) -> Result<Vec<Box<dyn ParseNode>>> {
        match &self.value {
            Value::Array(items) => Ok(items
                .iter()
                .map(|item| Box::new(JsonParseNode::new(item.clone())) as Box<dyn ParseNode>)
                .collect()),
            Value::Null => Ok(Vec::new()),
            _ => Err(self.mismatch("array")),
        }
    }

    fn is_null(&self) -> bool {
        self.value.is_null()
    }

    fn get_string_value(&self) -> Result<Option<String>> {
        match &self.value {
            Value::String(s) => Ok(Some(s.clone())),
            Value::Null => Ok(None),
            _ => Err(self.mismatch("string")),
        }
    }

    fn get_bool_value(&self) -> Result<Option<bool>> {
        match &self.value {
            Value::Bool(b) => Ok(Some(*b)),
            Value::Null => Ok(None),
            _ => Err(self.mismatch("boolean")),
        }
    }

    fn get_i64_value(&self) -> Result<Option<i64>> {
        match &self.value {
            Value::Number(n) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| self.mismatch("integer")),
            // IEEE754Compatible payloads carry Int64 as strings.
            Value::String(s) => s.parse().map(Some).map_err(|_| self.mismatch("integer")),
            Value::Null => Ok(None),
            _ => Err(self.mismatch("integer")),
        }
    }

    fn get_f64_value(&self) -> Result<Option<f64>> {
        match &self.value {
            Value::Number(n) => n.as_f64().map(Some).ok_or_else(|| self.mismatch("number")),
            Value::String(s) => match s.as_str() {
                "INF" => Ok(Some(f64::INFINITY)),
                "-INF" => Ok(Some(f64::NEG_INFINITY)),
                "NaN" => Ok(Some(f64::NAN)),
                _ => s.parse().map(Some).map_err(|_| self.mismatch("number")),
            },
            Value::Null => Ok(None),
            _ => Err(self.mismatch("number")),
        }
    }

    fn get_untyped_value(&self) -> Result<Option<UntypedValue>> {
        match &self.value {
            Value::Null => Ok(None),
            other => Ok(Some(other.clone())),
        }
    }
}

/// Parse node factory for `application/json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonParseNodeFactory;

impl ParseNodeFactory for JsonParseNodeFactory {
    fn valid_content_type(&self) -> &str {
        media_types::JSON
    }

    fn get_root_parse_node(&self, _content_type: &str, content: &[u8]) -> Result<Box<dyn ParseNode>> {
        Ok(Box::new(JsonParseNode::from_slice(content)?))
    }
}

enum Scope {
    Object(Map<String, Value>, Option<String>),
    Array(Vec<Value>, Option<String>),
}

/// Builds a JSON document from writer calls.
#[derive(Default)]
pub struct JsonSerializationWriter {
    scopes: Vec<Scope>,
    root: Option<Value>,
}

impl JsonSerializationWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, key: Option<&str>, value: Value) -> Result<()> {
        match self.scopes.last_mut() {
            Some(Scope::Object(map, _)) => {
                let key = key.ok_or_else(|| {
                    Error::Serialization("object members must have a key".to_string())
                })?;
                map.insert(key.to_string(), value);
            }
            Some(Scope::Array(items, _)) => items.push(value),
            None => {
                if self.root.is_some() {
                    return Err(Error::Serialization(
                        "a JSON document has exactly one root value".to_string(),
                    ));
                }
                self.root = Some(value);
            }
        }
        Ok(())
    }
}

impl SerializationWriter for JsonSerializationWriter {
    fn write_string_value(&mut self, key: Option<&str>, value: &str) -> Result<()> {
        self.put(key, Value::String(value.to_string()))
    }

    fn write_bool_value(&mut self, key: Option<&str>, value: bool) -> Result<()> {
        self.put(key, Value::Bool(value))
    }

    fn write_i64_value(&mut self, key: Option<&str>, value: i64) -> Result<()> {
        self.put(key, Value::Number(value.into()))
    }

    fn write_f64_value(&mut self, key: Option<&str>, value: f64) -> Result<()> {
        let number = Number::from_f64(value).ok_or_else(|| {
            Error::Serialization(format!("{} cannot be represented in JSON", value))
        })?;
        self.put(key, Value::Number(number))
    }

    fn write_null_value(&mut self, key: Option<&str>) -> Result<()> {
        self.put(key, Value::Null)
    }

    fn write_untyped_value(&mut self, key: Option<&str>, value: &UntypedValue) -> Result<()> {
        self.put(key, value.clone())
    }

    fn start_object(&mut self, key: Option<&str>) -> Result<()> {
        self.scopes.push(Scope::Object(Map::new(), key.map(str::to_string)));
        Ok(())
    }

    fn end_object(&mut self) -> Result<()> {
        match self.scopes.pop() {
            Some(Scope::Object(map, key)) => self.put(key.as_deref(), Value::Object(map)),
            _ => Err(Error::Serialization("end_object without start_object".to_string())),
        }
    }

    fn start_collection(&mut self, key: Option<&str>) -> Result<()> {
        self.scopes.push(Scope::Array(Vec::new(), key.map(str::to_string)));
        Ok(())
    }

    fn end_collection(&mut self) -> Result<()> {
        match self.scopes.pop() {
            Some(Scope::Array(items, key)) => self.put(key.as_deref(), Value::Array(items)),
            _ => Err(Error::Serialization("end_collection without start_collection".to_string())),
        }
    }

    fn get_serialized_content(&mut self) -> Result<Bytes> {
        if !self.scopes.is_empty() {
            return Err(Error::Serialization(format!("{} scope(s) left open", self.scopes.len())));
        }
        let root = self.root.take().unwrap_or(Value::Null);
        serde_json::to_vec(&root)
            .map(Bytes::from)
            .map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Writer factory for `application/json`.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializationWriterFactory;

impl SerializationWriterFactory for JsonSerializationWriterFactory {
    fn valid_content_type(&self) -> &str {
        media_types::JSON
    }

    fn get_serialization_writer(&self, _content_type: &str) -> Result<Box<dyn SerializationWriter>> {
        Ok(Box::new(JsonSerializationWriter::new()))
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::{Parsable, ParseNodeExt, SerializationWriterExt};
    use chrono::{NaiveDate, TimeDelta};
    use serde_json::json;

    struct Stat {
        count: Option<i32>,
        tags: Vec<String>,
    }

    impl Parsable for Stat {
        fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<()> {
            writer.write_optional("count", self.count.as_ref())?;
            writer.write_collection_of_primitive_values(Some("tags"), &self.tags)
        }
    }

    fn create_stat(node: &dyn ParseNode) -> Result<Stat> {
        Ok(Stat {
            count: node.child("count")?,
            tags: node.child_primitive_collection("tags")?,
        })
    }

    fn node(value: Value) -> JsonParseNode {
        JsonParseNode::new(value)
    }

    #[test]
    fn test_read_object() {
        let n = node(json!({"count": 3, "tags": ["a", "b"], "extra": true}));
        let stat = n.get_object_value(create_stat).unwrap().unwrap();
        assert_eq!(stat.count, Some(3));
        assert_eq!(stat.tags, vec!["a", "b"]);
        assert_eq!(n.additional_data(&["count", "tags"]).unwrap()["extra"], json!(true));
    }

    #[test]
    fn test_null_object_is_none() {
        assert!(node(Value::Null).get_object_value(create_stat).unwrap().is_none());
    }

    #[test]
    fn test_missing_child_is_none() {
        let n = node(json!({}));
        assert_eq!(n.child::<i32>("count").unwrap(), None);
        assert!(n.child_primitive_collection::<String>("tags").unwrap().is_empty());
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let n = node(json!({"count": "many"}));
        let err = n.child::<i32>("count").unwrap_err();
        assert!(err.to_string().contains("count"));
    }

    #[test]
    fn test_int64_as_string() {
        assert_eq!(node(json!("9007199254740993")).get_i64_value().unwrap(), Some(9007199254740993));
    }

    #[test]
    fn test_narrowing_overflow() {
        assert!(node(json!(300)).get_u8_value().is_err());
        assert_eq!(node(json!(200)).get_u8_value().unwrap(), Some(200));
    }

    #[test]
    fn test_special_floats() {
        assert_eq!(node(json!("INF")).get_f64_value().unwrap(), Some(f64::INFINITY));
        assert!(node(json!("NaN")).get_f64_value().unwrap().unwrap().is_nan());
    }

    #[test]
    fn test_typed_scalars() {
        let n = node(json!({
            "day": "2024-02-29",
            "wait": "PT1M",
            "bytes": "aGk=",
            "id": "5f3c6a2e-8e0b-4c7e-9a1d-2b4f6c8e0a13"
        }));
        assert_eq!(n.child::<NaiveDate>("day").unwrap(), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(n.child::<TimeDelta>("wait").unwrap(), Some(TimeDelta::minutes(1)));
        assert_eq!(n.child::<Vec<u8>>("bytes").unwrap(), Some(b"hi".to_vec()));
        assert!(n.child::<uuid::Uuid>("id").unwrap().is_some());
    }

    #[test]
    fn test_collection_of_objects_skips_nulls() {
        let n = node(json!([{"count": 1}, null, {"count": 2}]));
        let stats = n.get_collection_of_object_values(create_stat).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[1].count, Some(2));
    }

    #[test]
    fn test_write_object() {
        let mut writer = JsonSerializationWriter::new();
        let stat = Stat { count: Some(7), tags: vec!["x".into()] };
        writer.write_object_value(None, &stat).unwrap();
        let body = writer.get_serialized_content().unwrap();
        let value: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({"count": 7, "tags": ["x"]}));
    }

    #[test]
    fn test_write_omits_absent_optional() {
        let mut writer = JsonSerializationWriter::new();
        writer.write_object_value(None, &Stat { count: None, tags: vec![] }).unwrap();
        let value: Value = serde_json::from_slice(&writer.get_serialized_content().unwrap()).unwrap();
        assert_eq!(value, json!({"tags": []}));
    }

    #[test]
    fn test_write_collection_root() {
        let mut writer = JsonSerializationWriter::new();
        let stats = vec![
            Stat { count: Some(1), tags: vec![] },
            Stat { count: Some(2), tags: vec![] },
        ];
        writer.write_collection_of_object_values(None, &stats).unwrap();
        let value: Value = serde_json::from_slice(&writer.get_serialized_content().unwrap()).unwrap();
        assert_eq!(value, json!([{"count": 1, "tags": []}, {"count": 2, "tags": []}]));
    }

    #[test]
    fn test_write_scalar_root() {
        let mut writer = JsonSerializationWriter::new();
        writer.write_string_value(None, "hello").unwrap();
        assert_eq!(writer.get_serialized_content().unwrap(), Bytes::from("\"hello\""));
    }

    #[test]
    fn test_unbalanced_scopes_rejected() {
        let mut writer = JsonSerializationWriter::new();
        writer.start_object(None).unwrap();
        assert!(writer.get_serialized_content().is_err());
        assert!(JsonSerializationWriter::new().end_collection().is_err());
    }

    #[test]
    fn test_keyless_member_rejected() {
        let mut writer = JsonSerializationWriter::new();
        writer.start_object(None).unwrap();
        assert!(writer.write_bool_value(None, true).is_err());
    }

    #[test]
    fn test_factory_rejects_malformed() {
        assert!(JsonParseNodeFactory.get_root_parse_node("application/json", b"{oops").is_err());
    }
}
