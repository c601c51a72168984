#![deny(missing_docs)]

//! # Request Descriptors
//!
//! `OapiRequest` describes one test case: what to send to the handler and
//! whether undeclared statuses are tolerated.

use crate::error::OapiResult;
use actix_web::http::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use actix_web::http::{Method, Uri};
use actix_web::test::TestRequest;
use actix_web::web::Bytes;
use serde_json::Value;

/// A request to drive through the handler under test.
#[derive(Debug, Clone)]
pub struct OapiRequest {
    /// HTTP method.
    pub method: Method,
    /// Path plus optional query string, relative to the base URL.
    pub path: String,
    /// Request payload.
    pub body: Option<Bytes>,
    /// Extra request headers.
    pub headers: Vec<(HeaderName, HeaderValue)>,
    /// Accept response statuses the operation does not declare.
    pub skip_status: bool,
}

impl OapiRequest {
    /// Creates a request without body or extra headers.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            headers: Vec::new(),
            skip_status: false,
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Shorthand for a `POST` request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// Shorthand for a `PUT` request.
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    /// Shorthand for a `DELETE` request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Sets the raw payload.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a JSON payload and its `Content-Type`.
    pub fn json(self, value: &Value) -> Self {
        self.header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(value.to_string())
    }

    /// Adds a request header; an existing header with the same name is replaced.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.retain(|(existing, _)| *existing != name);
        self.headers.push((name, value));
        self
    }

    /// Tolerates statuses without a declared response.
    pub fn skip_status(mut self, skip: bool) -> Self {
        self.skip_status = skip;
        self
    }

    /// Builds the actix request delivered to the handler.
    ///
    /// The path is parsed as a URI first so malformed input fails instead of panicking.
    pub fn to_test_request(&self) -> OapiResult<TestRequest> {
        let uri: Uri = self.path.parse()?;

        let mut req = TestRequest::default()
            .method(self.method.clone())
            .uri(&uri.to_string());
        for (name, value) in &self.headers {
            req = req.insert_header((name.clone(), value.clone()));
        }
        if let Some(body) = &self.body {
            req = req.set_payload(body.clone());
        }
        Ok(req)
    }
}
