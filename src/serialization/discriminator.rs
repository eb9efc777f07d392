//! `@odata.type` dispatch.
//!
//! A polymorphic response carries its concrete type in the `@odata.type`
//! annotation, e.g. `#microsoft.graph.driveItem`. Generated code declares one
//! [`DiscriminatorRegistry`] per base type and uses its
//! [`create_from_discriminator_value`](DiscriminatorRegistry::create_from_discriminator_value)
//! as the base type's [`ParsableFactory`].
//!
//! ```
//! use odata_http::serialization::{DiscriminatorRegistry, JsonParseNode, ParseNode};
//! use odata_http::Result;
//! use serde_json::json;
//!
//! #[derive(Debug, PartialEq)]
//! enum BaseItem { Generic, Drive }
//!
//! fn generic(_: &dyn ParseNode) -> Result<BaseItem> { Ok(BaseItem::Generic) }
//! fn drive(_: &dyn ParseNode) -> Result<BaseItem> { Ok(BaseItem::Drive) }
//!
//! let registry = DiscriminatorRegistry::new(generic).register("drive", drive);
//! let node = JsonParseNode::new(json!({"@odata.type": "#microsoft.graph.drive"}));
//! assert_eq!(registry.create_from_discriminator_value(&node).unwrap(), BaseItem::Drive);
//! ```

use super::{ParsableFactory, ParseNode};
use crate::error::Result;
use crate::protocol::constants::odata;
use std::collections::HashMap;

/// Maps discriminator values to constructors of one base type.
pub struct DiscriminatorRegistry<T> {
    namespace: String,
    default: ParsableFactory<T>,
    factories: HashMap<String, ParsableFactory<T>>,
}

impl<T> DiscriminatorRegistry<T> {
    /// A registry whose unknown or absent discriminators fall back to `default`.
    pub fn new(default: ParsableFactory<T>) -> Self {
        DiscriminatorRegistry {
            namespace: odata::DEFAULT_NAMESPACE.to_string(),
            default,
            factories: HashMap::new(),
        }
    }

    /// Use a namespace prefix other than `microsoft.graph.`.
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        let mut namespace = namespace.into();
        if !namespace.is_empty() && !namespace.ends_with('.') {
            namespace.push('.');
        }
        self.namespace = namespace;
        self
    }

    /// Register a constructor. `type_name` may be given bare (`driveItem`) or
    /// qualified (`#microsoft.graph.driveItem`).
    #[must_use]
    pub fn register(mut self, type_name: &str, factory: ParsableFactory<T>) -> Self {
        let key = normalize_discriminator(type_name, &self.namespace).to_string();
        self.factories.insert(key, factory);
        self
    }

    /// The constructor for a raw discriminator value.
    pub fn resolve(&self, discriminator: Option<&str>) -> ParsableFactory<T> {
        discriminator
            .map(|d| normalize_discriminator(d, &self.namespace))
            .and_then(|key| self.factories.get(key))
            .copied()
            .unwrap_or(self.default)
    }

    /// Read `@odata.type` from `node` and construct the matching variant.
    pub fn create_from_discriminator_value(&self, node: &dyn ParseNode) -> Result<T> {
        let discriminator = discriminator_value(node)?;
        (self.resolve(discriminator.as_deref()))(node)
    }

    /// Registered discriminator keys, normalized.
    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

impl<T> std::fmt::Debug for DiscriminatorRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscriminatorRegistry")
            .field("namespace", &self.namespace)
            .field("types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// The raw `@odata.type` value of an object node, if any.
pub fn discriminator_value(node: &dyn ParseNode) -> Result<Option<String>> {
    match node.get_child_node(odata::TYPE) {
        Some(child) => child.get_string_value(),
        None => Ok(None),
    }
}

/// Strip the leading `#` and the namespace prefix from a discriminator.
pub fn normalize_discriminator<'a>(value: &'a str, namespace: &str) -> &'a str {
    let value = value.trim().trim_start_matches('#');
    if namespace.is_empty() {
        return value;
    }
    value.strip_prefix(namespace).unwrap_or(value)
}
