//! Media type to factory lookup.
//!
//! The registry is owned by a request adapter and shared with every request it
//! builds. Lookup ignores media type parameters and case, then falls back in
//! this order:
//!
//! | Step | Example request | Matches registration |
//! |------|-----------------|----------------------|
//! | exact | `application/json` | `application/json` |
//! | vendor suffix | `application/vnd.api+json` | `application/json` |
//! | subtype wildcard | `text/csv` | `text/*` |
//! | full wildcard | anything | `*/*` |

use super::{
    JsonParseNodeFactory, JsonSerializationWriterFactory, ParseNode, ParseNodeFactory,
    SerializationWriter, SerializationWriterFactory, TextParseNodeFactory,
    TextSerializationWriterFactory,
};
use crate::error::{Error, Result};
use crate::protocol::parse_media_type;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::sync::Arc;

/// Thread-safe registry of parse node and serialization writer factories.
///
/// Registering a factory for a media type that already has one replaces it.
#[derive(Default)]
pub struct SerializationRegistry {
    parse_node_factories: RwLock<IndexMap<String, Arc<dyn ParseNodeFactory>>>,
    writer_factories: RwLock<IndexMap<String, Arc<dyn SerializationWriterFactory>>>,
}

impl SerializationRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with JSON and text factories in both directions.
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register_parse_node_factory(Arc::new(JsonParseNodeFactory));
        registry.register_parse_node_factory(Arc::new(TextParseNodeFactory));
        registry.register_serialization_writer_factory(Arc::new(JsonSerializationWriterFactory));
        registry.register_serialization_writer_factory(Arc::new(TextSerializationWriterFactory));
        registry
    }

    /// Register a parse node factory under its own media type.
    pub fn register_parse_node_factory(&self, factory: Arc<dyn ParseNodeFactory>) {
        let key = parse_media_type(factory.valid_content_type());
        self.parse_node_factories.write().insert(key, factory);
    }

    /// Register a writer factory under its own media type.
    pub fn register_serialization_writer_factory(&self, factory: Arc<dyn SerializationWriterFactory>) {
        let key = parse_media_type(factory.valid_content_type());
        self.writer_factories.write().insert(key, factory);
    }

    pub fn parse_node_factory(&self, content_type: &str) -> Option<Arc<dyn ParseNodeFactory>> {
        lookup(&*self.parse_node_factories.read(), content_type)
    }

    pub fn serialization_writer_factory(&self, content_type: &str) -> Option<Arc<dyn SerializationWriterFactory>> {
        lookup(&*self.writer_factories.read(), content_type)
    }

    /// Parse `content` with the factory registered for `content_type`.
    ///
    /// # Errors
    ///
    /// `Error::Deserialization` when no factory matches or the body is malformed.
    pub fn get_root_parse_node(&self, content_type: &str, content: &[u8]) -> Result<Box<dyn ParseNode>> {
        let factory = self.parse_node_factory(content_type).ok_or_else(|| {
            Error::Deserialization(format!(
                "no parse node factory registered for content type '{}'",
                content_type
            ))
        })?;
        factory.get_root_parse_node(&parse_media_type(content_type), content)
    }

    /// A fresh writer for `content_type`.
    ///
    /// # Errors
    ///
    /// `Error::Serialization` when no factory matches.
    pub fn get_serialization_writer(&self, content_type: &str) -> Result<Box<dyn SerializationWriter>> {
        let factory = self.serialization_writer_factory(content_type).ok_or_else(|| {
            Error::Serialization(format!(
                "no serialization writer factory registered for content type '{}'",
                content_type
            ))
        })?;
        factory.get_serialization_writer(&parse_media_type(content_type))
    }

    /// Media types with a registered parse node factory.
    pub fn parse_node_content_types(&self) -> Vec<String> {
        self.parse_node_factories.read().keys().cloned().collect()
    }
}

impl std::fmt::Debug for SerializationRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializationRegistry")
            .field("parse_nodes", &self.parse_node_content_types())
            .field("writers", &self.writer_factories.read().keys().collect::<Vec<_>>())
            .finish()
    }
}

fn lookup<F: ?Sized>(map: &IndexMap<String, Arc<F>>, content_type: &str) -> Option<Arc<F>> {
    let media_type = parse_media_type(content_type);
    if let Some(found) = map.get(&media_type) {
        return Some(found.clone());
    }

    let (kind, subtype) = media_type.split_once('/')?;
    if let Some((_, suffix)) = subtype.rsplit_once('+') {
        if let Some(found) = map.get(&format!("application/{}", suffix)) {
            return Some(found.clone());
        }
    }

    map.get(&format!("{}/*", kind))
        .or_else(|| map.get("*/*"))
        .cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::{TextParseNode, UntypedValue};

    struct Fixed(&'static str, &'static str);

    impl ParseNodeFactory for Fixed {
        fn valid_content_type(&self) -> &str {
            self.0
        }

        fn get_root_parse_node(&self, _: &str, _: &[u8]) -> Result<Box<dyn ParseNode>> {
            Ok(Box::new(TextParseNode::new(self.1)))
        }
    }

    fn tag(registry: &SerializationRegistry, content_type: &str) -> Option<String> {
        registry
            .get_root_parse_node(content_type, b"")
            .ok()
            .and_then(|n| n.get_string_value().ok().flatten())
    }

    #[test]
    fn test_exact_match_ignores_params_and_case() {
        let registry = SerializationRegistry::with_defaults();
        let node = registry
            .get_root_parse_node("Application/JSON; charset=utf-8", br#"{"a":1}"#)
            .unwrap();
        assert_eq!(node.get_child_node("a").unwrap().get_i64_value().unwrap(), Some(1));
    }

    #[test]
    fn test_vendor_suffix_falls_back_to_json() {
        let registry = SerializationRegistry::with_defaults();
        let node = registry.get_root_parse_node("application/vnd.api+json", b"[1,2]").unwrap();
        assert_eq!(node.get_collection_nodes().unwrap().len(), 2);
    }

    #[test]
    fn test_wildcards() {
        let registry = SerializationRegistry::new();
        registry.register_parse_node_factory(Arc::new(Fixed("text/*", "text-any")));
        registry.register_parse_node_factory(Arc::new(Fixed("*/*", "any")));
        assert_eq!(tag(&registry, "text/csv").as_deref(), Some("text-any"));
        assert_eq!(tag(&registry, "image/png").as_deref(), Some("any"));
    }

    #[test]
    fn test_register_replaces() {
        let registry = SerializationRegistry::new();
        registry.register_parse_node_factory(Arc::new(Fixed("text/plain", "first")));
        registry.register_parse_node_factory(Arc::new(Fixed("text/plain", "second")));
        assert_eq!(tag(&registry, "text/plain").as_deref(), Some("second"));
        assert_eq!(registry.parse_node_content_types(), vec!["text/plain"]);
    }

    #[test]
    fn test_unknown_content_type() {
        let registry = SerializationRegistry::with_defaults();
        let err = registry.get_root_parse_node("application/xml", b"<a/>").err().unwrap();
        assert!(matches!(err, Error::Deserialization(_)));
        let err = registry.get_serialization_writer("application/xml").err().unwrap();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_writer_lookup() {
        let registry = SerializationRegistry::with_defaults();
        let mut writer = registry.get_serialization_writer("application/json").unwrap();
        writer.write_untyped_value(None, &UntypedValue::Bool(true)).unwrap();
        assert_eq!(writer.get_serialized_content().unwrap(), bytes::Bytes::from("true"));
    }
}
