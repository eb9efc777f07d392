//! `text/plain` parse nodes and writers for single primitive values.
//!
//! Used for `$count` and other primitive endpoints. A text body holds exactly
//! one scalar; objects and collections are rejected.

use super::{
    ParseNode, ParseNodeFactory, SerializationWriter, SerializationWriterFactory, UntypedValue,
};
use crate::error::{Error, Result};
use crate::protocol::constants::media_types;
use bytes::Bytes;

/// A text body read as a single scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextParseNode {
    text: String,
}

impl TextParseNode {
    /// Wrap a text body; surrounding whitespace and one pair of double quotes are stripped.
    pub fn new(text: impl AsRef<str>) -> Self {
        let trimmed = text.as_ref().trim();
        let unquoted = trimmed
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .unwrap_or(trimmed);
        TextParseNode { text: unquoted.to_string() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn parse<T: std::str::FromStr>(&self, kind: &str) -> Result<Option<T>> {
        if self.text.is_empty() {
            return Ok(None);
        }
        self.text
            .parse()
            .map(Some)
            .map_err(|_| Error::Deserialization(format!("'{}' is not a valid {}", self.text, kind)))
    }

    fn unsupported(what: &str) -> Error {
        Error::Deserialization(format!("text/plain does not support {}", what))
    }
}

impl ParseNode for TextParseNode {
    fn get_child_node(&self, _name: &str) -> Option<Box<dyn ParseNode>> {
        None
    }

    fn get_child_names(&self) -> Vec<String> {
        Vec::new()
    }

    fn get_collection_nodes(&self) -> Result<Vec<Box<dyn ParseNode>>> {
        Err(Self::unsupported("collections"))
    }

    fn is_null(&self) -> bool {
        self.text.is_empty() || self.text == "null"
    }

    fn get_string_value(&self) -> Result<Option<String>> {
        Ok(Some(self.text.clone()))
    }

    fn get_bool_value(&self) -> Result<Option<bool>> {
        self.parse("boolean")
    }

    fn get_i64_value(&self) -> Result<Option<i64>> {
        self.parse("integer")
    }

    fn get_f64_value(&self) -> Result<Option<f64>> {
        self.parse("number")
    }

    fn get_untyped_value(&self) -> Result<Option<UntypedValue>> {
        Ok(Some(UntypedValue::String(self.text.clone())))
    }
}

/// Parse node factory for `text/plain`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextParseNodeFactory;

impl ParseNodeFactory for TextParseNodeFactory {
    fn valid_content_type(&self) -> &str {
        media_types::TEXT_PLAIN
    }

    fn get_root_parse_node(&self, _content_type: &str, content: &[u8]) -> Result<Box<dyn ParseNode>> {
        let text = std::str::from_utf8(content)
            .map_err(|e| Error::Deserialization(format!("text body is not UTF-8: {}", e)))?;
        Ok(Box::new(TextParseNode::new(text)))
    }
}

/// Writes one scalar as a text body.
#[derive(Debug, Default)]
pub struct TextSerializationWriter {
    text: Option<String>,
}

impl TextSerializationWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn put(&mut self, key: Option<&str>, value: String) -> Result<()> {
        if key.is_some() {
            return Err(Error::Serialization("text/plain values cannot have a key".to_string()));
        }
        if self.text.is_some() {
            return Err(Error::Serialization("text/plain holds a single value".to_string()));
        }
        self.text = Some(value);
        Ok(())
    }

    fn unsupported(what: &str) -> Error {
        Error::Serialization(format!("text/plain does not support {}", what))
    }
}

impl SerializationWriter for TextSerializationWriter {
    fn write_string_value(&mut self, key: Option<&str>, value: &str) -> Result<()> {
        self.put(key, value.to_string())
    }

    fn write_bool_value(&mut self, key: Option<&str>, value: bool) -> Result<()> {
        self.put(key, value.to_string())
    }

    fn write_i64_value(&mut self, key: Option<&str>, value: i64) -> Result<()> {
        self.put(key, value.to_string())
    }

    fn write_f64_value(&mut self, key: Option<&str>, value: f64) -> Result<()> {
        self.put(key, value.to_string())
    }

    fn write_null_value(&mut self, key: Option<&str>) -> Result<()> {
        self.put(key, "null".to_string())
    }

    fn write_untyped_value(&mut self, key: Option<&str>, value: &UntypedValue) -> Result<()> {
        match value {
            UntypedValue::String(s) => self.put(key, s.clone()),
            UntypedValue::Object(_) | UntypedValue::Array(_) => Err(Self::unsupported("structured values")),
            other => self.put(key, other.to_string()),
        }
    }

    fn start_object(&mut self, _key: Option<&str>) -> Result<()> {
        Err(Self::unsupported("objects"))
    }

    fn end_object(&mut self) -> Result<()> {
        Err(Self::unsupported("objects"))
    }

    fn start_collection(&mut self, _key: Option<&str>) -> Result<()> {
        Err(Self::unsupported("collections"))
    }

    fn end_collection(&mut self) -> Result<()> {
        Err(Self::unsupported("collections"))
    }

    fn get_serialized_content(&mut self) -> Result<Bytes> {
        Ok(self.text.take().map(Bytes::from).unwrap_or_default())
    }
}

/// Writer factory for `text/plain`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextSerializationWriterFactory;

impl SerializationWriterFactory for TextSerializationWriterFactory {
    fn valid_content_type(&self) -> &str {
        media_types::TEXT_PLAIN
    }

    fn get_serialization_writer(&self, _content_type: &str) -> Result<Box<dyn SerializationWriter>> {
        Ok(Box::new(TextSerializationWriter::new()))
    }
}
