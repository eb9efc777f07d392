//! Plain data types shared across the request pipeline.

use crate::protocol::constants::RAW_URL_KEY;
use indexmap::IndexMap;
use std::fmt;

/// Path-parameter snapshot: template variable name to its string value.
///
/// Insertion order is kept so a snapshot prints the way it was built.
pub type PathParameters = IndexMap<String, String>;

/// Query parameters in insertion order.
pub type QueryParameters = IndexMap<String, QueryValue>;

/// A query parameter value: one scalar or a list emitted comma-joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Scalar(String),
    List(Vec<String>),
}

impl QueryValue {
    /// The value as it appears after `=`, before percent-encoding.
    pub fn joined(&self) -> String {
        match self {
            QueryValue::Scalar(value) => value.clone(),
            QueryValue::List(values) => values.join(","),
        }
    }

    /// `true` for [`QueryValue::List`].
    pub fn is_list(&self) -> bool {
        matches!(self, QueryValue::List(_))
    }

    /// An empty list carries no value and is omitted like `None`.
    pub fn is_empty_list(&self) -> bool {
        matches!(self, QueryValue::List(values) if values.is_empty())
    }
}

impl fmt::Display for QueryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Scalar(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Scalar(value.to_string())
    }
}

impl From<bool> for QueryValue {
    fn from(value: bool) -> Self {
        QueryValue::Scalar(value.to_string())
    }
}

impl From<i32> for QueryValue {
    fn from(value: i32) -> Self {
        QueryValue::Scalar(value.to_string())
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Scalar(value.to_string())
    }
}

impl<S: Into<String>> From<Vec<S>> for QueryValue {
    fn from(values: Vec<S>) -> Self {
        QueryValue::List(values.into_iter().map(Into::into).collect())
    }
}

/// Where a request goes, decided from a path-parameter snapshot at dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestTarget<'a> {
    /// Expand `template` against `params`.
    Template {
        template: &'a str,
        params: &'a PathParameters,
    },
    /// Use this absolute URL verbatim.
    Raw(&'a str),
}

impl<'a> RequestTarget<'a> {
    /// Classify a template and its snapshot. A snapshot carrying
    /// `request-raw-url` always wins over the template.
    pub fn classify(template: &'a str, params: &'a PathParameters) -> Self {
        match params.get(RAW_URL_KEY) {
            Some(raw) => RequestTarget::Raw(raw.as_str()),
            None => RequestTarget::Template { template, params },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_value_joined() {
        let list = QueryValue::from(vec!["id", "name"]);
        assert_eq!(list.joined(), "id,name");
        assert!(list.is_list());
        assert_eq!(QueryValue::from(true).to_string(), "true");
    }

    #[test]
    fn test_classify_prefers_raw_url() {
        let mut params = PathParameters::new();
        params.insert("site-id".into(), "abc".into());
        assert!(matches!(
            RequestTarget::classify("{+baseurl}/sites", &params),
            RequestTarget::Template { .. }
        ));

        params.insert(RAW_URL_KEY.into(), "https://g.example/x".into());
        assert_eq!(
            RequestTarget::classify("{+baseurl}/sites", &params),
            RequestTarget::Raw("https://g.example/x")
        );
    }
}
