//! Typed query-parameter encoding.
//!
//! Generated bindings describe their query options as plain structs. The field
//! metadata that decides the external name is the `serde` rename attribute, so
//! an OData system option is declared once and encoded everywhere:
//!
//! ```
//! use odata_http::protocol::to_query_parameters;
//! use odata_http::types::QueryValue;
//! use serde::Serialize;
//!
//! #[derive(Serialize, Default)]
//! struct LastSevenDaysQuery {
//!     #[serde(rename = "$expand")]
//!     expand: Option<Vec<String>>,
//!     #[serde(rename = "$select")]
//!     select: Option<Vec<String>>,
//! }
//!
//! let query = LastSevenDaysQuery {
//!     select: Some(vec!["id".into(), "startDateTime".into()]),
//!     ..Default::default()
//! };
//! let params = to_query_parameters(&query).unwrap();
//! assert_eq!(params.len(), 1);
//! assert_eq!(params["$select"], QueryValue::List(vec!["id".into(), "startDateTime".into()]));
//! ```
//!
//! # Encoding Rules
//!
//! | Field value | Result |
//! |-------------|--------|
//! | `None` / unit | omitted |
//! | scalar (`bool`, integers, floats, strings, unit enum variants) | [`QueryValue::Scalar`] |
//! | sequence of scalars | [`QueryValue::List`], emitted `k=a,b,c` |
//! | nested struct or map | [`Error::Serialization`] |
//!
//! Percent-encoding happens later, when the URL template is expanded.

use crate::error::{Error, Result};
use crate::types::{QueryParameters, QueryValue};
use serde::ser::{self, Impossible, Serialize};

/// Encode a query-options value into ordered query parameters.
pub fn to_query_parameters<T: Serialize + ?Sized>(value: &T) -> Result<QueryParameters> {
    let mut out = QueryParameters::new();
    value.serialize(QuerySerializer { out: &mut out })?;
    Ok(out)
}

macro_rules! forward_scalars {
    ($($method:ident: $ty:ty),* $(,)?) => {
        $(
            fn $method(self, v: $ty) -> Result<Self::Ok> {
                self.scalar(v.to_string())
            }
        )*
    };
}

/// Top level: accepts structs, string-keyed maps, and `Option`s of those.
struct QuerySerializer<'a> {
    out: &'a mut QueryParameters,
}

impl QuerySerializer<'_> {
    fn scalar(self, _value: String) -> Result<()> {
        Err(Error::Serialization(
            "query parameters must be a struct or map, not a scalar".into(),
        ))
    }
}

impl<'a> ser::Serializer for QuerySerializer<'a> {
    type Ok = ();
    type Error = Error;
    type SerializeSeq = Impossible<(), Error>;
    type SerializeTuple = Impossible<(), Error>;
    type SerializeTupleStruct = Impossible<(), Error>;
    type SerializeTupleVariant = Impossible<(), Error>;
    type SerializeMap = MapCollector<'a>;
    type SerializeStruct = StructCollector<'a>;
    type SerializeStructVariant = Impossible<(), Error>;

    forward_scalars! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_f32: f32,
        serialize_f64: f64,
        serialize_char: char,
        serialize_str: &str,
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<()> {
        Err(Error::Serialization("query parameters cannot be raw bytes".into()))
    }

    fn serialize_none(self) -> Result<()> {
        Ok(())
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<()> {
        Ok(())
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<()> {
        Ok(())
    }

    fn serialize_unit_variant(self, _name: &'static str, _index: u32, variant: &'static str) -> Result<()> {
        self.scalar(variant.to_string())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(self, _name: &'static str, value: &T) -> Result<()> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<()> {
        Err(unsupported(name))
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(Error::Serialization("query parameters must be a struct or map, not a sequence".into()))
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(Error::Serialization("query parameters must be a struct or map, not a tuple".into()))
    }

    fn serialize_tuple_struct(self, name: &'static str, _len: usize) -> Result<Self::SerializeTupleStruct> {
        Err(unsupported(name))
    }

    fn serialize_tuple_variant(
        self,
        name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(unsupported(name))
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Ok(MapCollector {
            out: self.out,
            pending_key: None,
        })
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Ok(StructCollector { out: self.out })
    }

    fn serialize_struct_variant(
        self,
        name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(unsupported(name))
    }
}

struct StructCollector<'a> {
    out: &'a mut QueryParameters,
}

impl ser::SerializeStruct for StructCollector<'_> {
    type Ok = ();
    type Error = Error;

    fn serialize_field<T: ?Sized + Serialize>(&mut self, key: &'static str, value: &T) -> Result<()> {
        if let Some(value) = value.serialize(FieldSerializer { name: key })? {
            self.out.insert(key.to_string(), value);
        }
        Ok(())
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

struct MapCollector<'a> {
    out: &'a mut QueryParameters,
    pending_key: Option<String>,
}

impl ser::SerializeMap for MapCollector<'_> {
    type Ok = ();
    type Error = Error;

    fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<()> {
        self.pending_key = key.serialize(ItemSerializer)?;
        Ok(())
    }

    fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        let key = self
            .pending_key
            .take()
            .ok_or_else(|| Error::Serialization("map value without a key".into()))?;
        if let Some(value) = value.serialize(FieldSerializer { name: "map value" })? {
            self.out.insert(key, value);
        }
        Ok(())
    }

    fn end(self) -> Result<()> {
        Ok(())
    }
}

/// One field: a scalar, a list of scalars, or nothing.
struct FieldSerializer {
    name: &'static str,
}

impl FieldSerializer {
    fn scalar(self, value: String) -> Result<Option<QueryValue>> {
        Ok(Some(QueryValue::Scalar(value)))
    }

    fn nested(&self) -> Error {
        Error::Serialization(format!(
            "query parameter '{}' must be a scalar or a list of scalars",
            self.name
        ))
    }
}

impl ser::Serializer for FieldSerializer {
    type Ok = Option<QueryValue>;
    type Error = Error;
    type SerializeSeq = ListCollector;
    type SerializeTuple = ListCollector;
    type SerializeTupleStruct = Impossible<Option<QueryValue>, Error>;
    type SerializeTupleVariant = Impossible<Option<QueryValue>, Error>;
    type SerializeMap = Impossible<Option<QueryValue>, Error>;
    type SerializeStruct = Impossible<Option<QueryValue>, Error>;
    type SerializeStructVariant = Impossible<Option<QueryValue>, Error>;

    forward_scalars! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_f32: f32,
        serialize_f64: f64,
        serialize_char: char,
        serialize_str: &str,
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Self::Ok> {
        Err(self.nested())
    }

    fn serialize_none(self) -> Result<Self::Ok> {
        Ok(None)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Self::Ok> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok> {
        Ok(None)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok> {
        Ok(None)
    }

    fn serialize_unit_variant(self, _name: &'static str, _index: u32, variant: &'static str) -> Result<Self::Ok> {
        self.scalar(variant.to_string())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(self, _name: &'static str, value: &T) -> Result<Self::Ok> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Self::Ok> {
        Err(self.nested())
    }

    fn serialize_seq(self, len: Option<usize>) -> Result<Self::SerializeSeq> {
        Ok(ListCollector {
            items: Vec::with_capacity(len.unwrap_or(0)),
        })
    }

    fn serialize_tuple(self, len: usize) -> Result<Self::SerializeTuple> {
        Ok(ListCollector {
            items: Vec::with_capacity(len),
        })
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeTupleStruct> {
        Err(self.nested())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(self.nested())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(self.nested())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(self.nested())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(self.nested())
    }
}

struct ListCollector {
    items: Vec<String>,
}

impl ListCollector {
    fn push<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        if let Some(item) = value.serialize(ItemSerializer)? {
            self.items.push(item);
        }
        Ok(())
    }
}

impl ser::SerializeSeq for ListCollector {
    type Ok = Option<QueryValue>;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok> {
        Ok(Some(QueryValue::List(self.items)))
    }
}

impl ser::SerializeTuple for ListCollector {
    type Ok = Option<QueryValue>;
    type Error = Error;

    fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<()> {
        self.push(value)
    }

    fn end(self) -> Result<Self::Ok> {
        Ok(Some(QueryValue::List(self.items)))
    }
}

/// A list item or map key; `None` items are dropped.
struct ItemSerializer;

impl ItemSerializer {
    fn scalar(self, value: String) -> Result<Option<String>> {
        Ok(Some(value))
    }
}

impl ser::Serializer for ItemSerializer {
    type Ok = Option<String>;
    type Error = Error;
    type SerializeSeq = Impossible<Option<String>, Error>;
    type SerializeTuple = Impossible<Option<String>, Error>;
    type SerializeTupleStruct = Impossible<Option<String>, Error>;
    type SerializeTupleVariant = Impossible<Option<String>, Error>;
    type SerializeMap = Impossible<Option<String>, Error>;
    type SerializeStruct = Impossible<Option<String>, Error>;
    type SerializeStructVariant = Impossible<Option<String>, Error>;

    forward_scalars! {
        serialize_bool: bool,
        serialize_i8: i8,
        serialize_i16: i16,
        serialize_i32: i32,
        serialize_i64: i64,
        serialize_u8: u8,
        serialize_u16: u16,
        serialize_u32: u32,
        serialize_u64: u64,
        serialize_f32: f32,
        serialize_f64: f64,
        serialize_char: char,
        serialize_str: &str,
    }

    fn serialize_bytes(self, _v: &[u8]) -> Result<Self::Ok> {
        Err(list_item_error())
    }

    fn serialize_none(self) -> Result<Self::Ok> {
        Ok(None)
    }

    fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<Self::Ok> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<Self::Ok> {
        Ok(None)
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok> {
        Ok(None)
    }

    fn serialize_unit_variant(self, _name: &'static str, _index: u32, variant: &'static str) -> Result<Self::Ok> {
        self.scalar(variant.to_string())
    }

    fn serialize_newtype_struct<T: ?Sized + Serialize>(self, _name: &'static str, value: &T) -> Result<Self::Ok> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: ?Sized + Serialize>(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Self::Ok> {
        Err(list_item_error())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq> {
        Err(list_item_error())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple> {
        Err(list_item_error())
    }

    fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeTupleStruct> {
        Err(list_item_error())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant> {
        Err(list_item_error())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap> {
        Err(list_item_error())
    }

    fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self::SerializeStruct> {
        Err(list_item_error())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant> {
        Err(list_item_error())
    }
}

fn unsupported(name: &str) -> Error {
    Error::Serialization(format!("'{}' cannot be encoded as query parameters", name))
}

fn list_item_error() -> Error {
    Error::Serialization("query list items must be scalars".into())
}
