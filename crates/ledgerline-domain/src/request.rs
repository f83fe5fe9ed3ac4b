//! Request model shared by the transport, coordinator and façade.
//!
//! # Key Design
//!
//! Requests are identified for deduplication by a structured
//! [`RequestKey`] of `(method, url, body)`. Equality and hashing are derived
//! field by field, so no separator character inside a body or URL can make
//! two different requests collide.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// HTTP method supported by the Ledgerline API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Returns the upper-case wire name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }

    /// Returns true for methods that change server state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unsupported method name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported HTTP method: {0}")]
pub struct UnknownMethod(pub String);

impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            _ => Err(UnknownMethod(s.to_string())),
        }
    }
}

/// Header map with case-insensitive names.
///
/// Names are stored lower-cased. Merging returns a new map and never
/// mutates either input, so a set of defaults can be reused across calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, String>,
}

impl Headers {
    /// Creates an empty header map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a header, replacing any existing value with the same name.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.entries
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    /// Builder form of [`Headers::insert`].
    pub fn with(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    /// Looks up a header by name, ignoring case.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns `self` overlaid with `overrides`; entries in `overrides` win.
    pub fn merged_with(&self, overrides: &Headers) -> Headers {
        let mut entries = self.entries.clone();
        for (name, value) in &overrides.entries {
            entries.insert(name.clone(), value.clone());
        }
        Headers { entries }
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Options recognized by the fetch façade.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// HTTP method. Defaults to GET.
    pub method: Method,
    /// Caller headers, layered over the client defaults.
    pub headers: Headers,
    /// Serialized request body.
    pub body: Option<String>,
    /// Route the call through the single-flight coordinator.
    pub dedupe: bool,
    /// Skip cached responses (the call still joins an in-flight request).
    pub no_cache: bool,
}

impl RequestOptions {
    /// Creates options for a plain GET.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options for the given method.
    pub fn with_method(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the JSON body.
    pub fn json_body<T: Serialize + ?Sized>(self, value: &T) -> serde_json::Result<Self> {
        Ok(self.body(serde_json::to_string(value)?))
    }

    pub fn dedupe(mut self, dedupe: bool) -> Self {
        self.dedupe = dedupe;
        self
    }

    pub fn no_cache(mut self, no_cache: bool) -> Self {
        self.no_cache = no_cache;
        self
    }
}

/// Identity of a logically equivalent request.
///
/// A missing body is stored as the empty string, so `GET /x` with no body
/// and `GET /x` with body `""` are the same request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub method: Method,
    pub url: String,
    pub body: String,
}

impl RequestKey {
    /// Creates a new request key.
    pub fn new(method: Method, url: impl Into<String>, body: Option<&str>) -> Self {
        Self {
            method,
            url: url.into(),
            body: body.unwrap_or_default().to_string(),
        }
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)?;
        if !self.body.is_empty() {
            write!(f, " ({} byte body)", self.body.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_method_parses_case_insensitively() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("Patch".parse::<Method>().unwrap(), Method::Patch);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
        assert!("TRACE".parse::<Method>().is_err());
    }

    #[test]
    fn test_only_get_is_not_a_mutation() {
        assert!(!Method::Get.is_mutation());
        for method in [Method::Post, Method::Put, Method::Patch, Method::Delete] {
            assert!(method.is_mutation(), "{method} should be a mutation");
        }
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let headers = Headers::new().with("X-Client-TZ", "UTC");

        assert_eq!(headers.get("x-client-tz"), Some("UTC"));
        assert_eq!(headers.get("X-CLIENT-TZ"), Some("UTC"));
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn test_merge_prefers_overrides_and_leaves_inputs_untouched() {
        // Arrange
        let defaults = Headers::new()
            .with("Accept", "application/json")
            .with("X-Client-TZ", "UTC");
        let overrides = Headers::new().with("accept", "text/csv");

        // Act
        let merged = defaults.merged_with(&overrides);

        // Assert
        assert_eq!(merged.get("accept"), Some("text/csv"));
        assert_eq!(merged.get("x-client-tz"), Some("UTC"));
        assert_eq!(defaults.get("accept"), Some("application/json"));
        assert_eq!(overrides.len(), 1);
    }

    #[test]
    fn test_missing_body_and_empty_body_share_a_key() {
        let a = RequestKey::new(Method::Get, "/api/goals", None);
        let b = RequestKey::new(Method::Get, "/api/goals", Some(""));
        assert_eq!(a, b);
    }

    #[test]
    fn test_separator_characters_do_not_collide() {
        // With naive "{method} {url} {body}" concatenation these two would
        // both render as "GET /a b c".
        let a = RequestKey::new(Method::Get, "/a b", Some("c"));
        let b = RequestKey::new(Method::Get, "/a", Some("b c"));

        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_distinct_bodies_produce_distinct_keys() {
        let a = RequestKey::new(Method::Post, "/api/todo", Some(r#"{"title":"x"}"#));
        let b = RequestKey::new(Method::Post, "/api/todo", Some(r#"{"title":"y"}"#));
        assert_ne!(a, b);
    }

    #[test]
    fn test_json_body_serializes_value() {
        let options = RequestOptions::with_method(Method::Post)
            .json_body(&serde_json::json!({ "title": "x" }))
            .unwrap();
        assert_eq!(options.body.as_deref(), Some(r#"{"title":"x"}"#));
        assert_eq!(options.method, Method::Post);
    }
}
