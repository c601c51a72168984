#![deny(missing_docs)]

//! # Error Handling
//!
//! Provides the unified `OapiError` enum returned by every tester operation.

use crate::response::CapturedResponse;
use actix_web::http::uri::InvalidUri;
use derive_more::{Display, From};
use std::fmt;

/// The Global Error Enum.
///
/// We use `derive_more` for boilerplate.
/// Note: String payloads never convert implicitly; each variant is built explicitly.
#[derive(Debug, Display, From)]
pub enum OapiError {
    /// The OpenAPI document could not be parsed or failed structural validation.
    #[from(ignore)]
    #[display("Spec Error: {_0}")]
    Spec(String),

    /// The request path is not a valid HTTP request target.
    #[display("URI Error: {_0}")]
    Uri(InvalidUri),

    /// The route-resolution URL (base URL + request path) could not be parsed.
    #[display("URL Error: {_0}")]
    Url(url::ParseError),

    /// The request does not map onto a declared operation.
    #[display("Routing Error: {_0}")]
    Routing(RoutingError),

    /// The captured response does not conform to the declared response.
    #[display("Response Error: {_0}")]
    Response(ResponseError),

    /// The handler's response body stream failed while being collected.
    #[from(ignore)]
    #[display("Handler Body Error: {_0}")]
    HandlerBody(String),

    /// The tester configuration could not be loaded.
    #[from(ignore)]
    #[display("Config Error: {_0}")]
    Config(String),
}

/// Manual implementation of the standard Error trait.
impl std::error::Error for OapiError {}

impl OapiError {
    /// Returns the captured response when the handler ran before the failure.
    pub fn response(&self) -> Option<&CapturedResponse> {
        match self {
            OapiError::Response(err) => Some(&err.response),
            _ => None,
        }
    }
}

/// Helper type alias for Result using OapiError.
pub type OapiResult<T> = Result<T, OapiError>;

/// Reasons a request could not be resolved to a declared operation.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum RoutingError {
    /// None of the declared servers is a prefix of the request URL.
    #[display("no server matches '{url}'")]
    NoMatchingServer {
        /// The route-resolution URL.
        url: String,
    },

    /// No path template matches the request path.
    #[display("no path matches '{path}'")]
    PathNotFound {
        /// Request path after the server prefix was stripped.
        path: String,
    },

    /// A path template matched but does not declare the method.
    #[display("method {method} is not declared for '{path_template}'")]
    MethodNotAllowed {
        /// Request method.
        method: String,
        /// The matched path template.
        path_template: String,
    },

    /// A bound path parameter does not satisfy its declared schema.
    #[display("path parameter '{name}' value '{value}' is invalid: {reason}")]
    InvalidPathParameter {
        /// Declared parameter name.
        name: String,
        /// Decoded value bound from the request path.
        value: String,
        /// Schema violation description.
        reason: String,
    },
}

impl std::error::Error for RoutingError {}

/// The individual ways a captured response can fail conformance.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum ResponseMismatch {
    /// The operation declares no response for the status (and no `default`).
    #[display("status {status} is not declared for {method} {path_template}")]
    StatusNotDeclared {
        /// Captured status code.
        status: u16,
        /// Request method.
        method: String,
        /// Matched path template.
        path_template: String,
    },

    /// None of the declared media types matches the validated content type.
    #[display(
        "response Content-Type '{content_type}' is not among declared content types [{declared}]"
    )]
    UnsupportedContentType {
        /// Content type used for lookup.
        content_type: String,
        /// Comma separated declared media types.
        declared: String,
    },

    /// The body could not be decoded for the matched media type.
    #[display("response body is not valid {media_type}: {reason}")]
    InvalidBody {
        /// Matched media type.
        media_type: String,
        /// Decoder error.
        reason: String,
    },

    /// The body does not satisfy the declared schema.
    #[display(
        "response body doesn't match the schema for {media_type}:\n{}",
        violations.join("\n")
    )]
    SchemaViolation {
        /// Matched media type.
        media_type: String,
        /// One entry per schema violation.
        violations: Vec<String>,
    },

    /// A required response header is missing.
    #[display("required response header '{name}' is missing")]
    MissingHeader {
        /// Declared header name.
        name: String,
    },

    /// A response header value does not satisfy its declared schema.
    #[display("response header '{name}' value '{value}' is invalid: {reason}")]
    InvalidHeader {
        /// Declared header name.
        name: String,
        /// Captured value.
        value: String,
        /// Violation description.
        reason: String,
    },

    /// The declared response could not be turned into a validator.
    #[display("response definition is unusable: {_0}")]
    Definition(String),
}

/// A conformance failure together with the response that caused it.
#[derive(Debug)]
pub struct ResponseError {
    /// What did not conform.
    pub mismatch: ResponseMismatch,
    /// The response captured from the handler.
    pub response: CapturedResponse,
}

impl ResponseError {
    /// Pairs a mismatch with the captured response.
    pub fn new(mismatch: ResponseMismatch, response: CapturedResponse) -> Self {
        Self { mismatch, response }
    }
}

impl fmt::Display for ResponseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}; ResponseBody: {}",
            self.mismatch,
            self.response.text()
        )
    }
}

impl std::error::Error for ResponseError {}
