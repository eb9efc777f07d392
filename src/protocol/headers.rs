//! Multi-valued, case-insensitive header collections and header value helpers.
//!
//! [`HeaderCollection`] backs both the headers a binding attaches to a
//! [`RequestInformation`](crate::request::RequestInformation) and the headers
//! returned with a response. Lookups ignore ASCII case; emission order follows
//! the order in which distinct names were first added.
//!
//! # Operations
//!
//! | Operation | Behavior |
//! |-----------|----------|
//! | `add` | Append a value, keeping existing values |
//! | `try_add` | Set only if the name is absent |
//! | `add_all` | Merge another collection value by value |
//! | `remove` | Drop a name and all its values |
//!
//! # Examples
//!
//! ```
//! use odata_http::protocol::HeaderCollection;
//!
//! let mut headers = HeaderCollection::new();
//! headers.add("Accept", "application/json");
//! assert!(!headers.try_add("accept", "text/plain"));
//! assert_eq!(headers.first("ACCEPT"), Some("application/json"));
//! ```

use crate::error::{Error, Result};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use indexmap::IndexMap;
use std::time::Duration;

/// Headers attached to an outgoing request.
pub type RequestHeaders = HeaderCollection;

/// Headers received with a response.
pub type ResponseHeaders = HeaderCollection;

#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    /// Name as first added, used on emission
    name: String,
    values: Vec<String>,
}

/// An ordered, case-insensitive, multi-valued header map.
///
/// Identical values under one name are stored once; adding `"gzip"` twice to
/// `Accept-Encoding` leaves a single entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderCollection {
    entries: IndexMap<String, HeaderEntry>,
}

impl HeaderCollection {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `value` under `name`, preserving values already present.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        let entry = self
            .entries
            .entry(name.to_ascii_lowercase())
            .or_insert_with(|| HeaderEntry {
                name,
                values: Vec::new(),
            });
        if !entry.values.contains(&value) {
            entry.values.push(value);
        }
    }

    /// Append every value in `values` under `name`.
    pub fn add_values<I, V>(&mut self, name: &str, values: I)
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        for value in values {
            self.add(name, value);
        }
    }

    /// Set `name` to `value` only if `name` is absent.
    ///
    /// Returns `true` when the value was stored.
    pub fn try_add(&mut self, name: impl Into<String>, value: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.add(name, value);
        true
    }

    /// Merge every name and value of `other` into this collection.
    pub fn add_all(&mut self, other: &HeaderCollection) {
        for entry in other.entries.values() {
            self.add_values(&entry.name, entry.values.iter().cloned());
        }
    }

    /// Remove `name` and return its values.
    pub fn remove(&mut self, name: &str) -> Option<Vec<String>> {
        self.entries
            .shift_remove(&name.to_ascii_lowercase())
            .map(|entry| entry.values)
    }

    /// Remove one value under `name`. The name is dropped with its last value.
    pub fn remove_value(&mut self, name: &str, value: &str) -> bool {
        let key = name.to_ascii_lowercase();
        let Some(entry) = self.entries.get_mut(&key) else {
            return false;
        };
        let before = entry.values.len();
        entry.values.retain(|v| v != value);
        let removed = entry.values.len() != before;
        if entry.values.is_empty() {
            self.entries.shift_remove(&key);
        }
        removed
    }

    /// All values stored under `name`.
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|entry| entry.values.as_slice())
    }

    /// The first value stored under `name`.
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    /// Whether `name` is present, ignoring case.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    /// Iterate `(name, values)` in insertion order of distinct names.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .values()
            .map(|entry| (entry.name.as_str(), entry.values.as_slice()))
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection holds no names.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every name.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Convert into an [`http::HeaderMap`], one header line per value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a name or value is not valid on the wire.
    pub fn to_header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for entry in self.entries.values() {
            let name = HeaderName::from_bytes(entry.name.as_bytes())
                .map_err(|e| Error::Config(format!("invalid header name '{}': {}", entry.name, e)))?;
            for value in &entry.values {
                let value = HeaderValue::from_str(value).map_err(|e| {
                    Error::Config(format!("invalid value for header '{}': {}", entry.name, e))
                })?;
                map.append(name.clone(), value);
            }
        }
        Ok(map)
    }

    /// Build a collection from an [`http::HeaderMap`].
    ///
    /// Values that are not visible ASCII are decoded lossily.
    pub fn from_header_map(map: &HeaderMap) -> Self {
        let mut headers = HeaderCollection::new();
        for (name, value) in map {
            let value = match value.to_str() {
                Ok(v) => v.to_string(),
                Err(_) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
            };
            headers.add(name.as_str(), value);
        }
        headers
    }
}

impl<'a> IntoIterator for &'a HeaderCollection {
    type Item = (&'a str, &'a [String]);
    type IntoIter = Box<dyn Iterator<Item = (&'a str, &'a [String])> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// Extract the media type of a `Content-Type` or `Accept` value.
///
/// Parameters are dropped and the result is lowercased, so
/// `"application/JSON; charset=utf-8"` becomes `"application/json"`.
///
/// # Examples
///
/// ```
/// use odata_http::protocol::parse_media_type;
///
/// assert_eq!(parse_media_type("text/plain;q=0.9"), "text/plain");
/// ```
pub fn parse_media_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Parse a `Retry-After` header value.
///
/// Accepts delta-seconds (`"120"`) or an HTTP date; dates in the past yield
/// a zero delay.
///
/// # Examples
///
/// ```
/// use odata_http::protocol::parse_retry_after;
/// use std::time::Duration;
///
/// assert_eq!(parse_retry_after("5").unwrap(), Duration::from_secs(5));
/// assert!(parse_retry_after("soon").is_err());
/// ```
pub fn parse_retry_after(value: &str) -> Result<Duration> {
    let trimmed = value.trim();

    if let Ok(seconds) = trimmed.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let date = chrono::DateTime::parse_from_rfc2822(trimmed)
        .map_err(|_| Error::Deserialization(format!("Invalid Retry-After: {}", value)))?;
    let delta = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
    Ok(delta.to_std().unwrap_or(Duration::ZERO))
}
