//! Status code to error factory mapping.
//!
//! Bindings pass an [`ErrorMapping`] with every call. When the service answers
//! with a non-2xx status the adapter picks a factory by precedence:
//!
//! 1. the exact code (`404`)
//! 2. the class (`4XX`, `5XX`)
//! 3. the catch-all (`XXX`)
//!
//! and, failing all three, raises a plain [`ApiError`](crate::ApiError).
//!
//! # Examples
//!
//! ```
//! use odata_http::client::{ErrorMapping, StatusSelector};
//! use odata_http::models::create_odata_error_from_discriminator_value;
//!
//! let mapping = ErrorMapping::new()
//!     .with(StatusSelector::Any, create_odata_error_from_discriminator_value);
//! assert!(mapping.resolve(404).is_some());
//!
//! let selector: StatusSelector = "5XX".parse().unwrap();
//! assert_eq!(selector, StatusSelector::Class(5));
//! ```

use crate::error::{BoxError, Error, Result};
use crate::serialization::{ParsableFactory, ParseNode};
use indexmap::IndexMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Which statuses an error factory applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusSelector {
    /// One status code, e.g. `404`.
    Exact(u16),
    /// A status class: `4` for `4XX`, `5` for `5XX`.
    Class(u8),
    /// `XXX`: any status.
    Any,
}

impl FromStr for StatusSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("XXX") {
            return Ok(StatusSelector::Any);
        }
        let bytes = s.as_bytes();
        if bytes.len() == 3 && bytes[1..].eq_ignore_ascii_case(b"XX") && (b'1'..=b'5').contains(&bytes[0]) {
            return Ok(StatusSelector::Class(bytes[0] - b'0'));
        }
        match s.parse::<u16>() {
            Ok(code) if (100..=599).contains(&code) => Ok(StatusSelector::Exact(code)),
            _ => Err(Error::Config(format!("invalid status selector '{}'", s))),
        }
    }
}

impl fmt::Display for StatusSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusSelector::Exact(code) => write!(f, "{}", code),
            StatusSelector::Class(class) => write!(f, "{}XX", class),
            StatusSelector::Any => f.write_str("XXX"),
        }
    }
}

/// Builds a typed error payload from an error response body.
pub type ErrorFactory = Arc<dyn Fn(&dyn ParseNode) -> Result<BoxError> + Send + Sync>;

/// Ordered mapping from status selectors to error factories.
#[derive(Clone, Default)]
pub struct ErrorMapping {
    entries: IndexMap<StatusSelector, ErrorFactory>,
}

impl ErrorMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map `selector` to the model factory of an error type.
    #[must_use]
    pub fn with<E>(mut self, selector: StatusSelector, factory: ParsableFactory<E>) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.insert_parsable(selector, factory);
        self
    }

    pub fn insert_parsable<E>(&mut self, selector: StatusSelector, factory: ParsableFactory<E>)
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.insert(
            selector,
            Arc::new(move |node: &dyn ParseNode| factory(node).map(|e| Box::new(e) as BoxError)),
        );
    }

    /// Map `selector` to an arbitrary factory; replaces an existing entry.
    pub fn insert(&mut self, selector: StatusSelector, factory: ErrorFactory) {
        self.entries.insert(selector, factory);
    }

    /// The factory for `status`, by precedence exact, class, any.
    pub fn resolve(&self, status: u16) -> Option<&ErrorFactory> {
        self.resolve_with_selector(status).map(|(_, factory)| factory)
    }

    /// Like [`resolve`](Self::resolve), also reporting which selector matched.
    pub fn resolve_with_selector(&self, status: u16) -> Option<(StatusSelector, &ErrorFactory)> {
        let class = u8::try_from(status / 100).ok();
        [
            Some(StatusSelector::Exact(status)),
            class.map(StatusSelector::Class),
            Some(StatusSelector::Any),
        ]
        .into_iter()
        .flatten()
        .find_map(|selector| self.entries.get(&selector).map(|factory| (selector, factory)))
    }

    pub fn selectors(&self) -> impl Iterator<Item = &StatusSelector> {
        self.entries.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for ErrorMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.entries.keys().map(ToString::to_string))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialization::TextParseNode;

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct Tagged(&'static str);

    fn exact(_: &dyn ParseNode) -> Result<Tagged> {
        Ok(Tagged("exact"))
    }

    fn class(_: &dyn ParseNode) -> Result<Tagged> {
        Ok(Tagged("class"))
    }

    fn any(_: &dyn ParseNode) -> Result<Tagged> {
        Ok(Tagged("any"))
    }

    fn run(mapping: &ErrorMapping, status: u16) -> Option<String> {
        let node = TextParseNode::new("");
        mapping
            .resolve(status)
            .map(|factory| factory(&node).unwrap().to_string())
    }

    #[test]
    fn test_parse_selectors() {
        assert_eq!("404".parse::<StatusSelector>().unwrap(), StatusSelector::Exact(404));
        assert_eq!("4XX".parse::<StatusSelector>().unwrap(), StatusSelector::Class(4));
        assert_eq!("5xx".parse::<StatusSelector>().unwrap(), StatusSelector::Class(5));
        assert_eq!("XXX".parse::<StatusSelector>().unwrap(), StatusSelector::Any);
        for bad in ["", "4X", "6XX", "99", "abc", "1000"] {
            assert!(bad.parse::<StatusSelector>().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_display_round_trips_selectors() {
        for s in ["404", "4XX", "XXX"] {
            assert_eq!(s.parse::<StatusSelector>().unwrap().to_string(), s);
        }
    }

    #[test]
    fn test_precedence() {
        let mapping = ErrorMapping::new()
            .with(StatusSelector::Any, any)
            .with(StatusSelector::Class(4), class)
            .with(StatusSelector::Exact(404), exact);
        assert_eq!(run(&mapping, 404).as_deref(), Some("exact"));
        assert_eq!(run(&mapping, 403).as_deref(), Some("class"));
        assert_eq!(run(&mapping, 503).as_deref(), Some("any"));
    }

    #[test]
    fn test_no_match() {
        let mapping = ErrorMapping::new().with(StatusSelector::Class(5), class);
        assert!(run(&mapping, 404).is_none());
        assert!(ErrorMapping::new().resolve(500).is_none());
    }

    #[test]
    fn test_resolve_reports_selector() {
        let mapping = ErrorMapping::new().with(StatusSelector::Class(5), class);
        assert_eq!(mapping.resolve_with_selector(502).map(|(s, _)| s), Some(StatusSelector::Class(5)));
        assert_eq!(format!("{:?}", mapping), r#"["5XX"]"#);
    }
}
