//! # Request Decoding
//!
//! Transport-level validation of an inbound request: the content type, the
//! `/{service}/{method}` path and the JSON body. Everything here runs before the registry or
//! the backend are touched.
use crate::dispatch::RoutingError;
use http::{HeaderMap, header::CONTENT_TYPE};
use std::collections::HashMap;

/// The only media type the gateway accepts.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Body key that turns a request into a schema reload.
pub const RELOAD_KEY: &str = "file";

/// The request is not shaped the way the gateway expects.
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Unsupported content type '{0}', expected 'application/json'")]
    UnsupportedContentType(String),
    #[error("Malformed JSON body: {0}")]
    MalformedBody(#[source] serde_json::Error),
}

/// Returns whether the `Content-Type` header names `application/json`.
///
/// The media type is compared case-insensitively and parameters such as `charset` are
/// ignored. A missing or non-UTF-8 header is invalid.
pub fn validate_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|media_type| media_type.trim().eq_ignore_ascii_case(JSON_MEDIA_TYPE))
}

/// Like [`validate_content_type`], but reports what was received.
pub fn require_json(headers: &HeaderMap) -> Result<(), InputError> {
    if validate_content_type(headers) {
        return Ok(());
    }

    let received = match headers.get(CONTENT_TYPE) {
        Some(value) => String::from_utf8_lossy(value.as_bytes()).into_owned(),
        None => "<missing>".to_string(),
    };
    Err(InputError::UnsupportedContentType(received))
}

/// Splits a request path on `/`, keeping the leading empty segment.
///
/// ```
/// assert_eq!(hotgate_core::decode::split_path("/foo/bar"), ["", "foo", "bar"]);
/// ```
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/').collect()
}

/// The service and method a request is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route<'a> {
    pub service: &'a str,
    pub method: &'a str,
}

/// Reads the service and method from the first two non-empty path segments.
///
/// Extra segments are ignored.
///
/// # Errors
///
/// [`RoutingError::MalformedPath`] when the path has fewer than two non-empty segments.
pub fn route(path: &str) -> Result<Route<'_>, RoutingError> {
    let mut names = split_path(path)
        .into_iter()
        .skip(1)
        .filter(|segment| !segment.is_empty());

    match (names.next(), names.next()) {
        (Some(service), Some(method)) => Ok(Route { service, method }),
        _ => Err(RoutingError::MalformedPath(path.to_string())),
    }
}

/// A JSON object body whose values are all strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatPayload(HashMap<String, String>);

impl FlatPayload {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The IDL document path when this body asks for a schema reload.
    pub fn reload_target(&self) -> Option<&str> {
        self.get(RELOAD_KEY)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<HashMap<String, String>> for FlatPayload {
    fn from(value: HashMap<String, String>) -> Self {
        Self(value)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FlatPayload {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Decodes a body into a [`FlatPayload`].
///
/// # Errors
///
/// [`InputError::MalformedBody`] when the body is empty, is not valid JSON, is not an
/// object, or holds any value that is not a string.
pub fn parse_body(bytes: &[u8]) -> Result<FlatPayload, InputError> {
    serde_json::from_slice::<HashMap<String, String>>(bytes)
        .map(FlatPayload)
        .map_err(InputError::MalformedBody)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn accepts_json_content_type() {
        assert!(validate_content_type(&headers("application/json")));
        assert!(validate_content_type(&headers("Application/JSON")));
        assert!(validate_content_type(&headers("application/json; charset=utf-8")));
    }

    #[test]
    fn rejects_other_content_types() {
        for value in ["text/plain", "application/jsonp", "application/x-www-form-urlencoded", ""] {
            assert!(!validate_content_type(&headers(value)), "{value} should be rejected");
        }
        assert!(!validate_content_type(&HeaderMap::new()));
    }

    #[test]
    fn require_json_reports_the_received_value() {
        let err = require_json(&headers("text/plain")).unwrap_err();
        assert!(matches!(err, InputError::UnsupportedContentType(v) if v == "text/plain"));

        let err = require_json(&HeaderMap::new()).unwrap_err();
        assert!(matches!(err, InputError::UnsupportedContentType(v) if v == "<missing>"));
    }

    #[test]
    fn splits_paths() {
        assert_eq!(split_path("/foo/bar"), ["", "foo", "bar"]);
        assert_eq!(split_path("/"), ["", ""]);
    }

    #[test]
    fn routes_on_first_two_segments() {
        assert_eq!(
            route("/ServiceA/methodA/extra").unwrap(),
            Route {
                service: "ServiceA",
                method: "methodA"
            }
        );
        assert_eq!(route("//ServiceA//methodA").unwrap().method, "methodA");
    }

    #[test]
    fn short_paths_are_routing_errors() {
        for path in ["/", "/ServiceA", "/ServiceA/"] {
            assert!(matches!(route(path), Err(RoutingError::MalformedPath(_))));
        }
    }

    #[test]
    fn parses_flat_objects() {
        let payload = parse_body(br#"{"key":"value"}"#).unwrap();
        assert_eq!(payload, FlatPayload::from_iter([("key", "value")]));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(parse_body(br#"{"hello""#), Err(InputError::MalformedBody(_))));
        assert!(matches!(parse_body(b""), Err(InputError::MalformedBody(_))));
    }

    #[test]
    fn rejects_non_string_values() {
        for body in [
            r#"{"a": 1}"#,
            r#"{"a": true}"#,
            r#"{"a": null}"#,
            r#"{"a": {"b": "c"}}"#,
            r#"{"a": ["b"]}"#,
            r#"["a"]"#,
        ] {
            assert!(parse_body(body.as_bytes()).is_err(), "{body} should be rejected");
        }
    }

    #[test]
    fn finds_reload_target() {
        let payload = parse_body(br#"{"userId":"x","file":"idl/next.thrift"}"#).unwrap();
        assert_eq!(payload.reload_target(), Some("idl/next.thrift"));
        assert_eq!(payload.len(), 2);
    }
}
