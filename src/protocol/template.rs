//! URL template parsing and expansion.
//!
//! Supports the subset of [RFC 6570] that generated OData bindings emit:
//!
//! | Expression | Meaning | Example expansion |
//! |------------|---------|-------------------|
//! | `{var}` | Level 1, unreserved characters only | `a%2Fb` |
//! | `{+var}` | Reserved expansion, keeps `/`, `:`, `%XX` | `https://host/v1.0` |
//! | `{?a,b}` | Form-style query, absent names skipped | `?a=1&b=x,y` |
//! | `{&a,b}` | Query continuation | `&a=1` |
//!
//! Variable names may themselves be percent-encoded: `{site%2Did}` reads the
//! `site-id` parameter and `{?%24select}` reads `$select`.
//!
//! A snapshot holding `request-raw-url` bypasses the template entirely; see
//! [`resolve`].
//!
//! [RFC 6570]: https://datatracker.ietf.org/doc/html/rfc6570

use crate::error::{Error, Result};
use crate::types::{PathParameters, QueryParameters, QueryValue, RequestTarget};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::HashSet;

/// Characters passed through by `{var}` and query expansions (RFC 3986 unreserved).
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Characters passed through by `{+var}`: unreserved plus reserved.
const RESERVED: &AsciiSet = &UNRESERVED
    .remove(b':')
    .remove(b'/')
    .remove(b'?')
    .remove(b'#')
    .remove(b'[')
    .remove(b']')
    .remove(b'@')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=');

/// Expression operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `{var}`
    Simple,
    /// `{+var}`
    Reserved,
    /// `{?var}`
    Query,
    /// `{&var}`
    QueryContinuation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Expression {
        operator: Operator,
        names: Vec<VarName>,
    },
}

/// A variable as written in the template and percent-decoded. Snapshots may
/// key parameters by either form (`site%2Did` or `site-id`).
#[derive(Debug, Clone, PartialEq, Eq)]
struct VarName {
    decoded: String,
    raw: String,
}

/// A parsed URL template, reusable across expansions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriTemplate {
    source: String,
    parts: Vec<Part>,
}

impl UriTemplate {
    /// Parse `source`.
    ///
    /// # Errors
    ///
    /// [`Error::Template`] for unbalanced braces, empty expressions, unsupported
    /// operators or modifiers, and names that do not percent-decode to UTF-8.
    ///
    /// # Examples
    ///
    /// ```
    /// use odata_http::protocol::UriTemplate;
    ///
    /// let template = UriTemplate::parse("{+baseurl}/sites/{site%2Did}{?%24select}").unwrap();
    /// assert_eq!(template.variable_names().count(), 3);
    /// assert!(UriTemplate::parse("/sites/{site-id").is_err());
    /// ```
    pub fn parse(source: &str) -> Result<Self> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices();

        while let Some((start, c)) = chars.next() {
            match c {
                '{' => {
                    let mut body = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => {
                                return Err(template_error(source, start, "nested '{'"));
                            }
                            _ => body.push(c),
                        }
                    }
                    if !closed {
                        return Err(template_error(source, start, "unterminated expression"));
                    }
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(parse_expression(source, start, &body)?);
                }
                '}' => return Err(template_error(source, start, "unmatched '}'")),
                _ => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Ok(UriTemplate {
            source: source.to_string(),
            parts,
        })
    }

    /// The template text as parsed.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Decoded variable names in order of appearance.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().flat_map(|part| match part {
            Part::Expression { names, .. } => names.iter().map(|n| n.decoded.as_str()).collect::<Vec<_>>(),
            Part::Literal(_) => Vec::new(),
        })
    }

    /// Expand against a path-parameter snapshot and query parameters.
    ///
    /// Path parameters are consulted before query parameters for `{var}` and
    /// `{+var}`; query expressions consult query parameters first. Query
    /// parameters the template does not name are appended afterwards so
    /// nothing the caller set is dropped.
    pub fn expand(&self, path: &PathParameters, query: &QueryParameters) -> String {
        let mut out = String::with_capacity(self.source.len() + 32);
        let mut consumed: HashSet<&str> = HashSet::new();

        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Expression { operator, names } => {
                    for name in names {
                        consumed.insert(name.decoded.as_str());
                        consumed.insert(name.raw.as_str());
                    }
                    expand_expression(&mut out, *operator, names, path, query);
                }
            }
        }

        let extra: Vec<_> = query
            .iter()
            .filter(|(name, _)| !consumed.contains(name.as_str()))
            .collect();
        append_pairs(&mut out, extra.into_iter());
        out
    }
}

/// Resolve a template against a snapshot.
///
/// When `path` contains `request-raw-url` the template is never parsed; the raw
/// value is returned with `query` appended.
///
/// # Examples
///
/// ```
/// use odata_http::protocol::resolve;
/// use odata_http::types::{PathParameters, QueryParameters, QueryValue};
///
/// let mut path = PathParameters::new();
/// path.insert("baseurl".into(), "https://g.example".into());
/// path.insert("site-id".into(), "abc".into());
/// let mut query = QueryParameters::new();
/// query.insert("$select".into(), QueryValue::from(vec!["id", "startDateTime"]));
///
/// let url = resolve(
///     "{+baseurl}/sites/{site%2Did}/analytics/lastSevenDays{?%24expand,%24select}",
///     &path,
///     &query,
/// ).unwrap();
/// assert_eq!(url, "https://g.example/sites/abc/analytics/lastSevenDays?$select=id,startDateTime");
/// ```
pub fn resolve(template: &str, path: &PathParameters, query: &QueryParameters) -> Result<String> {
    match RequestTarget::classify(template, path) {
        RequestTarget::Raw(raw) => Ok(append_query(raw, query)),
        RequestTarget::Template { template, params } => {
            Ok(UriTemplate::parse(template)?.expand(params, query))
        }
    }
}

/// Append `query` to an already-built URL, ahead of any `#fragment`.
pub fn append_query(url: &str, query: &QueryParameters) -> String {
    let (base, fragment) = match url.find('#') {
        Some(at) => url.split_at(at),
        None => (url, ""),
    };
    let mut out = base.to_string();
    append_pairs(&mut out, query.iter());
    out.push_str(fragment);
    out
}

fn append_pairs<'a, I>(out: &mut String, pairs: I)
where
    I: Iterator<Item = (&'a String, &'a QueryValue)>,
{
    for (name, value) in pairs.filter(|(_, value)| !value.is_empty_list()) {
        out.push(if out.contains('?') { '&' } else { '?' });
        out.push_str(name);
        out.push('=');
        out.push_str(&encode_query_value(value));
    }
}

fn parse_expression(source: &str, start: usize, body: &str) -> Result<Part> {
    let (operator, rest) = match body.chars().next() {
        Some('+') => (Operator::Reserved, &body[1..]),
        Some('?') => (Operator::Query, &body[1..]),
        Some('&') => (Operator::QueryContinuation, &body[1..]),
        Some('#' | '.' | '/' | ';' | '=' | ',' | '!' | '@' | '|') => {
            return Err(template_error(source, start, "unsupported operator"));
        }
        Some(_) => (Operator::Simple, body),
        None => return Err(template_error(source, start, "empty expression")),
    };

    let mut names = Vec::new();
    for raw in rest.split(',') {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(template_error(source, start, "empty variable name"));
        }
        if raw.ends_with('*') || raw.contains(':') {
            return Err(template_error(source, start, "modifiers are not supported"));
        }
        let name = percent_decode_str(raw)
            .decode_utf8()
            .map_err(|_| template_error(source, start, "variable name is not UTF-8"))?;
        names.push(VarName {
            decoded: name.into_owned(),
            raw: raw.to_string(),
        });
    }

    Ok(Part::Expression { operator, names })
}

fn expand_expression(
    out: &mut String,
    operator: Operator,
    names: &[VarName],
    path: &PathParameters,
    query: &QueryParameters,
) {
    match operator {
        Operator::Simple | Operator::Reserved => {
            let values: Vec<String> = names
                .iter()
                .filter_map(|name| lookup_path_first(name, path, query))
                .map(|value| match operator {
                    Operator::Reserved => encode_reserved(&value.joined()),
                    _ => encode_query_value(&value),
                })
                .collect();
            out.push_str(&values.join(","));
        }
        Operator::Query | Operator::QueryContinuation => {
            let mut first = operator == Operator::Query;
            for name in names {
                let Some(value) = lookup_query_first(name, path, query) else {
                    continue;
                };
                out.push(if first { '?' } else { '&' });
                first = false;
                out.push_str(&name.decoded);
                out.push('=');
                out.push_str(&encode_query_value(&value));
            }
        }
    }
}

fn lookup_path_first(name: &VarName, path: &PathParameters, query: &QueryParameters) -> Option<QueryValue> {
    from_path(name, path).or_else(|| from_query(name, query))
}

fn lookup_query_first(name: &VarName, path: &PathParameters, query: &QueryParameters) -> Option<QueryValue> {
    from_query(name, query).or_else(|| from_path(name, path))
}

fn from_path(name: &VarName, path: &PathParameters) -> Option<QueryValue> {
    path.get(&name.decoded)
        .or_else(|| path.get(&name.raw))
        .map(|v| QueryValue::Scalar(v.clone()))
}

fn from_query(name: &VarName, query: &QueryParameters) -> Option<QueryValue> {
    query
        .get(&name.decoded)
        .or_else(|| query.get(&name.raw))
        .filter(|value| !value.is_empty_list())
        .cloned()
}

/// Encode a value for `{var}` or query expansion. List items are encoded
/// individually and joined by a literal comma.
fn encode_query_value(value: &QueryValue) -> String {
    match value {
        QueryValue::Scalar(v) => utf8_percent_encode(v, UNRESERVED).to_string(),
        QueryValue::List(items) => items
            .iter()
            .map(|v| utf8_percent_encode(v, UNRESERVED).to_string())
            .collect::<Vec<_>>()
            .join(","),
    }
}

/// Encode for `{+var}`, keeping reserved characters and valid `%XX` triplets.
fn encode_reserved(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = String::with_capacity(value.len());
    let mut segment_start = 0;
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%'
            && i + 2 < bytes.len()
            && bytes[i + 1].is_ascii_hexdigit()
            && bytes[i + 2].is_ascii_hexdigit()
        {
            out.extend(utf8_percent_encode(&value[segment_start..i], RESERVED));
            out.push_str(&value[i..i + 3]);
            i += 3;
            segment_start = i;
        } else {
            i += 1;
        }
    }
    out.extend(utf8_percent_encode(&value[segment_start..], RESERVED));
    out
}

fn template_error(source: &str, offset: usize, reason: &str) -> Error {
    Error::Template(format!("{} at offset {} in '{}'", reason, offset, source))
}
