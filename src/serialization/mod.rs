//! Format-independent serialization traits and the content-type registry.
//!
//! The request pipeline never touches a wire format directly. Responses are read
//! through a [`ParseNode`] tree produced by a [`ParseNodeFactory`]; request bodies
//! are produced by a [`SerializationWriter`] from a [`SerializationWriterFactory`].
//! Both factories are looked up by media type in a [`SerializationRegistry`].
//!
//! # Module Organization
//!
//! ```text
//! serialization/
//! ├── registry      - media type -> factory lookup
//! ├── discriminator - @odata.type dispatch to concrete constructors
//! ├── json          - application/json parse node and writer
//! ├── text          - text/plain parse node and writer
//! └── duration      - ISO 8601 durations
//! ```
//!
//! # Model Code
//!
//! A generated model implements [`Parsable`] for writing and ships a
//! [`ParsableFactory`] for reading:
//!
//! ```
//! use odata_http::serialization::{
//!     Parsable, ParseNode, ParseNodeExt, SerializationWriter, SerializationWriterExt,
//! };
//! use odata_http::Result;
//!
//! struct ItemActionStat {
//!     action_count: Option<i32>,
//!     actor_count: Option<i32>,
//! }
//!
//! impl Parsable for ItemActionStat {
//!     fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<()> {
//!         writer.write_optional("actionCount", self.action_count.as_ref())?;
//!         writer.write_optional("actorCount", self.actor_count.as_ref())
//!     }
//! }
//!
//! fn create_item_action_stat(node: &dyn ParseNode) -> Result<ItemActionStat> {
//!     Ok(ItemActionStat {
//!         action_count: node.child("actionCount")?,
//!         actor_count: node.child("actorCount")?,
//!     })
//! }
//! ```

mod discriminator;
mod duration;
mod json;
mod registry;
mod text;

pub use discriminator::{discriminator_value, normalize_discriminator, DiscriminatorRegistry};
pub use duration::{format_iso8601_duration, parse_iso8601_duration};
pub use json::{JsonParseNode, JsonParseNodeFactory, JsonSerializationWriter, JsonSerializationWriterFactory};
pub use registry::SerializationRegistry;
pub use text::{TextParseNode, TextParseNodeFactory, TextSerializationWriter, TextSerializationWriterFactory};

use crate::error::{Error, Result};
use base64::Engine;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta};
use indexmap::IndexMap;
use std::str::FromStr;
use uuid::Uuid;

/// Format-neutral representation of values the model does not type, such as
/// `innerError` or additional data.
pub type UntypedValue = serde_json::Value;

/// Constructor reading a `T` from a parse node.
///
/// Discriminator-aware factories pick the concrete variant before reading.
pub type ParsableFactory<T> = fn(&dyn ParseNode) -> Result<T>;

/// A model that can write itself through a [`SerializationWriter`].
pub trait Parsable: Send + Sync + 'static {
    /// Write this value's fields into the current object scope of `writer`.
    fn serialize(&self, writer: &mut dyn SerializationWriter) -> Result<()>;
}

/// A node of a parsed response body.
///
/// Accessors return `Ok(None)` for an explicit null and an error when the node
/// holds a value of an incompatible kind.
pub trait ParseNode: Send + Sync {
    /// Child property `name` of an object node. Missing properties yield `None`.
    fn get_child_node(&self, name: &str) -> Option<Box<dyn ParseNode>>;

    /// Property names of an object node, in document order.
    fn get_child_names(&self) -> Vec<String>;

    /// Elements of a collection node. Null yields an empty vector.
    fn get_collection_nodes(&self) -> Result<Vec<Box<dyn ParseNode>>>;

    /// Whether the node is an explicit null.
    fn is_null(&self) -> bool;

    fn get_string_value(&self) -> Result<Option<String>>;
    fn get_bool_value(&self) -> Result<Option<bool>>;
    fn get_i64_value(&self) -> Result<Option<i64>>;
    fn get_f64_value(&self) -> Result<Option<f64>>;

    /// The node as an untyped value.
    fn get_untyped_value(&self) -> Result<Option<UntypedValue>>;

    fn get_i32_value(&self) -> Result<Option<i32>> {
        narrow(self.get_i64_value()?, "i32")
    }

    fn get_i8_value(&self) -> Result<Option<i8>> {
        narrow(self.get_i64_value()?, "i8")
    }

    fn get_u8_value(&self) -> Result<Option<u8>> {
        narrow(self.get_i64_value()?, "u8")
    }

    fn get_f32_value(&self) -> Result<Option<f32>> {
        Ok(self.get_f64_value()?.map(|v| v as f32))
    }

    fn get_uuid_value(&self) -> Result<Option<Uuid>> {
        parse_string(self.get_string_value()?, "GUID", |s| Uuid::parse_str(s).ok())
    }

    /// RFC 3339 timestamp with offset.
    fn get_date_time_value(&self) -> Result<Option<DateTime<FixedOffset>>> {
        parse_string(self.get_string_value()?, "timestamp", |s| {
            DateTime::parse_from_rfc3339(s).ok()
        })
    }

    /// `YYYY-MM-DD`.
    fn get_date_only_value(&self) -> Result<Option<NaiveDate>> {
        parse_string(self.get_string_value()?, "date", |s| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
        })
    }

    /// `HH:MM:SS[.fffffff]`.
    fn get_time_only_value(&self) -> Result<Option<NaiveTime>> {
        parse_string(self.get_string_value()?, "time", |s| {
            NaiveTime::parse_from_str(s, "%H:%M:%S%.f").ok()
        })
    }

    /// ISO 8601 duration such as `PT1H30M`.
    fn get_duration_value(&self) -> Result<Option<TimeDelta>> {
        match self.get_string_value()? {
            Some(s) => parse_iso8601_duration(&s).map(Some),
            None => Ok(None),
        }
    }

    /// Base64 encoded binary.
    fn get_byte_array_value(&self) -> Result<Option<Vec<u8>>> {
        parse_string(self.get_string_value()?, "base64", |s| {
            base64::engine::general_purpose::STANDARD.decode(s).ok()
        })
    }

    /// Raw enumeration member name.
    fn get_enum_value(&self) -> Result<Option<String>> {
        self.get_string_value()
    }
}

/// Writes a request body.
///
/// Inside an object scope every value needs a key; inside a collection scope
/// keys are ignored; at the top level a single keyless value becomes the body.
pub trait SerializationWriter: Send {
    fn write_string_value(&mut self, key: Option<&str>, value: &str) -> Result<()>;
    fn write_bool_value(&mut self, key: Option<&str>, value: bool) -> Result<()>;
    fn write_i64_value(&mut self, key: Option<&str>, value: i64) -> Result<()>;
    fn write_f64_value(&mut self, key: Option<&str>, value: f64) -> Result<()>;
    fn write_null_value(&mut self, key: Option<&str>) -> Result<()>;
    fn write_untyped_value(&mut self, key: Option<&str>, value: &UntypedValue) -> Result<()>;

    fn start_object(&mut self, key: Option<&str>) -> Result<()>;
    fn end_object(&mut self) -> Result<()>;
    fn start_collection(&mut self, key: Option<&str>) -> Result<()>;
    fn end_collection(&mut self) -> Result<()>;

    /// Finish writing and return the encoded body.
    fn get_serialized_content(&mut self) -> Result<Bytes>;

    fn write_i32_value(&mut self, key: Option<&str>, value: i32) -> Result<()> {
        self.write_i64_value(key, i64::from(value))
    }

    fn write_i8_value(&mut self, key: Option<&str>, value: i8) -> Result<()> {
        self.write_i64_value(key, i64::from(value))
    }

    fn write_u8_value(&mut self, key: Option<&str>, value: u8) -> Result<()> {
        self.write_i64_value(key, i64::from(value))
    }

    fn write_f32_value(&mut self, key: Option<&str>, value: f32) -> Result<()> {
        self.write_f64_value(key, f64::from(value))
    }

    fn write_uuid_value(&mut self, key: Option<&str>, value: &Uuid) -> Result<()> {
        self.write_string_value(key, &value.hyphenated().to_string())
    }

    fn write_date_time_value(&mut self, key: Option<&str>, value: &DateTime<FixedOffset>) -> Result<()> {
        self.write_string_value(key, &value.to_rfc3339())
    }

    fn write_date_only_value(&mut self, key: Option<&str>, value: &NaiveDate) -> Result<()> {
        self.write_string_value(key, &value.format("%Y-%m-%d").to_string())
    }

    fn write_time_only_value(&mut self, key: Option<&str>, value: &NaiveTime) -> Result<()> {
        self.write_string_value(key, &value.format("%H:%M:%S%.f").to_string())
    }

    fn write_duration_value(&mut self, key: Option<&str>, value: &TimeDelta) -> Result<()> {
        self.write_string_value(key, &format_iso8601_duration(value))
    }

    fn write_byte_array_value(&mut self, key: Option<&str>, value: &[u8]) -> Result<()> {
        self.write_string_value(key, &base64::engine::general_purpose::STANDARD.encode(value))
    }
}

/// Reads a [`ParseNode`] tree out of a response body of one media type.
pub trait ParseNodeFactory: Send + Sync {
    /// Media type this factory handles, e.g. `application/json`.
    fn valid_content_type(&self) -> &str;

    fn get_root_parse_node(&self, content_type: &str, content: &[u8]) -> Result<Box<dyn ParseNode>>;
}

/// Creates [`SerializationWriter`]s for one media type.
pub trait SerializationWriterFactory: Send + Sync {
    /// Media type this factory handles.
    fn valid_content_type(&self) -> &str;

    fn get_serialization_writer(&self, content_type: &str) -> Result<Box<dyn SerializationWriter>>;
}

/// A scalar that can be read from and written to any format.
///
/// This is the type tag of `send_primitive`: `adapter.send_primitive::<i64>(..)`
/// reads a `$count`.
pub trait Primitive: Sized + Send + 'static {
    fn read(node: &dyn ParseNode) -> Result<Option<Self>>;
    fn write(&self, writer: &mut dyn SerializationWriter, key: Option<&str>) -> Result<()>;
}

macro_rules! primitive {
    ($ty:ty, $get:ident, |$w:ident, $k:ident, $v:ident| $write:expr) => {
        impl Primitive for $ty {
            fn read(node: &dyn ParseNode) -> Result<Option<Self>> {
                node.$get()
            }

            fn write(&self, $w: &mut dyn SerializationWriter, $k: Option<&str>) -> Result<()> {
                let $v = self;
                $write
            }
        }
    };
}

primitive!(bool, get_bool_value, |w, k, v| w.write_bool_value(k, *v));
primitive!(i8, get_i8_value, |w, k, v| w.write_i8_value(k, *v));
primitive!(u8, get_u8_value, |w, k, v| w.write_u8_value(k, *v));
primitive!(i32, get_i32_value, |w, k, v| w.write_i32_value(k, *v));
primitive!(i64, get_i64_value, |w, k, v| w.write_i64_value(k, *v));
primitive!(f32, get_f32_value, |w, k, v| w.write_f32_value(k, *v));
primitive!(f64, get_f64_value, |w, k, v| w.write_f64_value(k, *v));
primitive!(String, get_string_value, |w, k, v| w.write_string_value(k, v));
primitive!(Uuid, get_uuid_value, |w, k, v| w.write_uuid_value(k, v));
primitive!(DateTime<FixedOffset>, get_date_time_value, |w, k, v| w.write_date_time_value(k, v));
primitive!(NaiveDate, get_date_only_value, |w, k, v| w.write_date_only_value(k, v));
primitive!(NaiveTime, get_time_only_value, |w, k, v| w.write_time_only_value(k, v));
primitive!(TimeDelta, get_duration_value, |w, k, v| w.write_duration_value(k, v));
primitive!(Vec<u8>, get_byte_array_value, |w, k, v| w.write_byte_array_value(k, v));

/// Generic readers layered over [`ParseNode`].
pub trait ParseNodeExt {
    /// Read this node as a `T`, `None` for null.
    fn get_object_value<T>(&self, factory: ParsableFactory<T>) -> Result<Option<T>>;

    /// Read every element of this collection node with `factory`.
    fn get_collection_of_object_values<T>(&self, factory: ParsableFactory<T>) -> Result<Vec<T>>;

    /// Read this node as a primitive.
    fn get_primitive_value<P: Primitive>(&self) -> Result<Option<P>>;

    /// Read every element of this collection node as a primitive; nulls are skipped.
    fn get_collection_of_primitive_values<P: Primitive>(&self) -> Result<Vec<P>>;

    /// Read and parse an enumeration member.
    fn get_enum<E: FromStr>(&self) -> Result<Option<E>>;

    /// Primitive property `name`.
    fn child<P: Primitive>(&self, name: &str) -> Result<Option<P>>;

    /// Object property `name`.
    fn child_object<T>(&self, name: &str, factory: ParsableFactory<T>) -> Result<Option<T>>;

    /// Collection-of-objects property `name`; missing or null yields empty.
    fn child_collection<T>(&self, name: &str, factory: ParsableFactory<T>) -> Result<Vec<T>>;

    /// Collection-of-primitives property `name`; missing or null yields empty.
    fn child_primitive_collection<P: Primitive>(&self, name: &str) -> Result<Vec<P>>;

    /// Enumeration property `name`.
    fn child_enum<E: FromStr>(&self, name: &str) -> Result<Option<E>>;

    /// Properties other than `known`, kept as untyped values.
    fn additional_data(&self, known: &[&str]) -> Result<IndexMap<String, UntypedValue>>;
}

impl<N: ParseNode + AsParseNode + ?Sized> ParseNodeExt for N {
    fn get_object_value<T>(&self, factory: ParsableFactory<T>) -> Result<Option<T>> {
        if self.is_null() {
            return Ok(None);
        }
        factory(self.as_parse_node()).map(Some)
    }

    fn get_collection_of_object_values<T>(&self, factory: ParsableFactory<T>) -> Result<Vec<T>> {
        self.get_collection_nodes()?
            .iter()
            .filter(|node| !node.is_null())
            .map(|node| factory(node.as_ref()))
            .collect()
    }

    fn get_primitive_value<P: Primitive>(&self) -> Result<Option<P>> {
        P::read(self.as_parse_node())
    }

    fn get_collection_of_primitive_values<P: Primitive>(&self) -> Result<Vec<P>> {
        let mut values = Vec::new();
        for node in self.get_collection_nodes()? {
            if let Some(value) = P::read(node.as_ref())? {
                values.push(value);
            }
        }
        Ok(values)
    }

    fn get_enum<E: FromStr>(&self) -> Result<Option<E>> {
        match self.get_enum_value()? {
            Some(raw) => E::from_str(&raw)
                .map(Some)
                .map_err(|_| Error::Deserialization(format!("unknown enum member '{}'", raw))),
            None => Ok(None),
        }
    }

    fn child<P: Primitive>(&self, name: &str) -> Result<Option<P>> {
        match self.get_child_node(name) {
            Some(node) => P::read(node.as_ref())
                .map_err(|e| Error::Deserialization(format!("property '{}': {}", name, e))),
            None => Ok(None),
        }
    }

    fn child_object<T>(&self, name: &str, factory: ParsableFactory<T>) -> Result<Option<T>> {
        match self.get_child_node(name) {
            Some(node) => node.get_object_value(factory),
            None => Ok(None),
        }
    }

    fn child_collection<T>(&self, name: &str, factory: ParsableFactory<T>) -> Result<Vec<T>> {
        match self.get_child_node(name) {
            Some(node) => node.get_collection_of_object_values(factory),
            None => Ok(Vec::new()),
        }
    }

    fn child_primitive_collection<P: Primitive>(&self, name: &str) -> Result<Vec<P>> {
        match self.get_child_node(name) {
            Some(node) => node.get_collection_of_primitive_values(),
            None => Ok(Vec::new()),
        }
    }

    fn child_enum<E: FromStr>(&self, name: &str) -> Result<Option<E>> {
        match self.get_child_node(name) {
            Some(node) => node.get_enum(),
            None => Ok(None),
        }
    }

    fn additional_data(&self, known: &[&str]) -> Result<IndexMap<String, UntypedValue>> {
        let mut data = IndexMap::new();
        for name in self.get_child_names() {
            if known.contains(&name.as_str()) {
                continue;
            }
            if let Some(value) = self
                .get_child_node(&name)
                .map(|node| node.get_untyped_value())
                .transpose()?
                .flatten()
            {
                data.insert(name, value);
            }
        }
        Ok(data)
    }
}

/// Generic writers layered over [`SerializationWriter`].
pub trait SerializationWriterExt {
    /// Write `value` as an object under `key`.
    fn write_object_value<T: Parsable>(&mut self, key: Option<&str>, value: &T) -> Result<()>;

    /// Write `values` as a collection of objects under `key`.
    fn write_collection_of_object_values<T: Parsable>(&mut self, key: Option<&str>, values: &[T]) -> Result<()>;

    /// Write a primitive under `key`.
    fn write_primitive_value<P: Primitive>(&mut self, key: Option<&str>, value: &P) -> Result<()>;

    /// Write `values` as a collection of primitives under `key`.
    fn write_collection_of_primitive_values<P: Primitive>(&mut self, key: Option<&str>, values: &[P]) -> Result<()>;

    /// Write a primitive property when present; absent values are skipped.
    fn write_optional<P: Primitive>(&mut self, key: &str, value: Option<&P>) -> Result<()>;

    /// Write an object property when present.
    fn write_optional_object<T: Parsable>(&mut self, key: &str, value: Option<&T>) -> Result<()>;

    /// Write an enumeration member by its wire name.
    fn write_enum_value<E: std::fmt::Display>(&mut self, key: Option<&str>, value: &E) -> Result<()>;

    /// Write untyped additional properties into the current object.
    fn write_additional_data(&mut self, data: &IndexMap<String, UntypedValue>) -> Result<()>;
}

impl<W: SerializationWriter + AsSerializationWriter + ?Sized> SerializationWriterExt for W {
    fn write_object_value<T: Parsable>(&mut self, key: Option<&str>, value: &T) -> Result<()> {
        self.start_object(key)?;
        value.serialize(self.as_serialization_writer())?;
        self.end_object()
    }

    fn write_collection_of_object_values<T: Parsable>(&mut self, key: Option<&str>, values: &[T]) -> Result<()> {
        self.start_collection(key)?;
        for value in values {
            self.write_object_value(None, value)?;
        }
        self.end_collection()
    }

    fn write_primitive_value<P: Primitive>(&mut self, key: Option<&str>, value: &P) -> Result<()> {
        value.write(self.as_serialization_writer(), key)
    }

    fn write_collection_of_primitive_values<P: Primitive>(&mut self, key: Option<&str>, values: &[P]) -> Result<()> {
        self.start_collection(key)?;
        for value in values {
            value.write(self.as_serialization_writer(), None)?;
        }
        self.end_collection()
    }

    fn write_optional<P: Primitive>(&mut self, key: &str, value: Option<&P>) -> Result<()> {
        match value {
            Some(value) => value.write(self.as_serialization_writer(), Some(key)),
            None => Ok(()),
        }
    }

    fn write_optional_object<T: Parsable>(&mut self, key: &str, value: Option<&T>) -> Result<()> {
        match value {
            Some(value) => self.write_object_value(Some(key), value),
            None => Ok(()),
        }
    }

    fn write_enum_value<E: std::fmt::Display>(&mut self, key: Option<&str>, value: &E) -> Result<()> {
        self.write_string_value(key, &value.to_string())
    }

    fn write_additional_data(&mut self, data: &IndexMap<String, UntypedValue>) -> Result<()> {
        for (key, value) in data {
            self.write_untyped_value(Some(key), value)?;
        }
        Ok(())
    }
}

/// Upcast to `&dyn ParseNode`, for both concrete nodes and trait objects.
pub trait AsParseNode {
    fn as_parse_node(&self) -> &dyn ParseNode;
}

impl<N: ParseNode> AsParseNode for N {
    fn as_parse_node(&self) -> &dyn ParseNode {
        self
    }
}

impl<'a> AsParseNode for dyn ParseNode + 'a {
    fn as_parse_node(&self) -> &dyn ParseNode {
        self
    }
}

/// Upcast to `&mut dyn SerializationWriter`.
pub trait AsSerializationWriter {
    fn as_serialization_writer(&mut self) -> &mut dyn SerializationWriter;
}

impl<W: SerializationWriter> AsSerializationWriter for W {
    fn as_serialization_writer(&mut self) -> &mut dyn SerializationWriter {
        self
    }
}

impl<'a> AsSerializationWriter for dyn SerializationWriter + 'a {
    fn as_serialization_writer(&mut self) -> &mut dyn SerializationWriter {
        self
    }
}

fn narrow<T: TryFrom<i64>>(value: Option<i64>, target: &str) -> Result<Option<T>> {
    value
        .map(|v| {
            T::try_from(v)
                .map_err(|_| Error::Deserialization(format!("{} is out of range for {}", v, target)))
        })
        .transpose()
}

fn parse_string<T>(value: Option<String>, kind: &str, parse: impl FnOnce(&str) -> Option<T>) -> Result<Option<T>> {
    match value {
        Some(s) => parse(&s)
            .map(Some)
            .ok_or_else(|| Error::Deserialization(format!("'{}' is not a valid {}", s, kind))),
        None => Ok(None),
    }
}
