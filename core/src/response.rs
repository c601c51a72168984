#![deny(missing_docs)]

//! # Captured Responses
//!
//! In-memory record of what the handler under test produced for one request.

use crate::error::{OapiError, OapiResult};
use actix_web::body::{self, MessageBody};
use actix_web::dev::ServiceResponse;
use actix_web::http::header::HeaderMap;
use actix_web::http::StatusCode;
use actix_web::web::Bytes;
use actix_web::HttpResponse;
use serde::de::DeserializeOwned;
use std::borrow::Cow;

/// Status, headers and body emitted by the handler for one invocation.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl CapturedResponse {
    /// Builds a captured response from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Drains a service response produced by the handler.
    pub(crate) async fn from_service_response<B>(res: ServiceResponse<B>) -> OapiResult<Self>
    where
        B: MessageBody,
    {
        let status = res.status();
        let headers = res.headers().clone();
        Self::collect(status, headers, res.into_body()).await
    }

    /// Drains an error rendered into a response, as actix would serve it.
    pub(crate) async fn from_http_response(res: HttpResponse) -> OapiResult<Self> {
        let status = res.status();
        let headers = res.headers().clone();
        Self::collect(status, headers, res.into_body()).await
    }

    async fn collect<B>(status: StatusCode, headers: HeaderMap, payload: B) -> OapiResult<Self>
    where
        B: MessageBody,
    {
        let bytes = body::to_bytes(payload).await.map_err(|e| {
            let err: Box<dyn std::error::Error> = e.into();
            OapiError::HandlerBody(err.to_string())
        })?;
        Ok(Self::new(status, headers, bytes))
    }

    /// Response status.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Numeric response status.
    pub fn code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Raw body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Deserializes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Returns all values of a header that are valid visible ASCII.
    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(name)
            .filter_map(|value| value.to_str().ok().map(|s| s.to_string()))
            .collect()
    }
}
