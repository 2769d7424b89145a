//! # Response Encoding
//!
//! Maps the outcome of a request to an HTTP status, a content type and a body. Successful
//! calls are JSON; every other outcome is a fixed plain-text line so clients can match on it.
use crate::{
    decode::{InputError, JSON_MEDIA_TYPE},
    dispatch::RoutingError,
    gateway::{GatewayError, Outcome},
};
use http::{StatusCode, header::CONTENT_TYPE};
use tracing::error;

pub const TEXT_MEDIA_TYPE: &str = "text/plain; charset=utf-8";

pub const RELOADED: &str = "Updated IDL";
pub const INVALID_CONTENT_TYPE: &str = "Invalid content type, expected application/json";
pub const INVALID_BODY: &str = "Invalid request body, expected a flat JSON object of strings";
pub const INVALID_PATH: &str = "Invalid path, expected /{service}/{method}";
pub const UNKNOWN_SERVICE: &str = "Invalid service name, service undefined";
pub const UNKNOWN_METHOD: &str = "Invalid method name, method undefined";
pub const INVALID_FIELD_PREFIX: &str = "Invalid field value, ";
pub const RELOAD_FAILED: &str = "Internal server error, fail to update IDL";
pub const CALL_FAILED: &str = "Internal server error, RPC call failed";

/// A fully encoded reply, independent of the HTTP server in front of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayResponse {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl GatewayResponse {
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: TEXT_MEDIA_TYPE,
            body: body.into().into_bytes(),
        }
    }

    pub fn json(status: StatusCode, body: Vec<u8>) -> Self {
        Self {
            status,
            content_type: JSON_MEDIA_TYPE,
            body,
        }
    }

    /// Encodes the result of handling one request.
    pub fn encode(result: Result<Outcome, GatewayError>) -> Self {
        match result {
            Ok(Outcome::Called(fields)) => match serde_json::to_vec(&fields) {
                Ok(body) => Self::json(StatusCode::OK, body),
                Err(e) => {
                    error!(error = %e, "failed to serialize backend result");
                    Self::text(StatusCode::INTERNAL_SERVER_ERROR, CALL_FAILED)
                }
            },
            Ok(Outcome::Reloaded { .. }) => Self::text(StatusCode::ACCEPTED, RELOADED),
            Err(err) => Self::from_error(&err),
        }
    }

    fn from_error(err: &GatewayError) -> Self {
        let bad_request = |body: &str| Self::text(StatusCode::BAD_REQUEST, body);

        match err {
            GatewayError::Input(InputError::UnsupportedContentType(_)) => {
                bad_request(INVALID_CONTENT_TYPE)
            }
            GatewayError::Input(InputError::MalformedBody(_)) => bad_request(INVALID_BODY),
            GatewayError::Routing(RoutingError::MalformedPath(_)) => bad_request(INVALID_PATH),
            GatewayError::Routing(RoutingError::UnknownService(_)) => bad_request(UNKNOWN_SERVICE),
            GatewayError::Routing(RoutingError::UnknownMethod { .. }) => {
                bad_request(UNKNOWN_METHOD)
            }
            GatewayError::Mapping(e) => bad_request(&format!("{INVALID_FIELD_PREFIX}{e}")),
            GatewayError::Reload(_) => Self::text(StatusCode::INTERNAL_SERVER_ERROR, RELOAD_FAILED),
            GatewayError::Backend(_) => Self::text(StatusCode::INTERNAL_SERVER_ERROR, CALL_FAILED),
        }
    }

    /// Converts into an `http::Response`, leaving the body type to the caller.
    pub fn into_http(self) -> http::Response<Vec<u8>> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, http::HeaderValue::from_static(self.content_type));
        response
    }
}
