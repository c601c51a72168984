#![deny(missing_docs)]

//! # Conformance Runner
//!
//! `OapiTester` binds an OpenAPI document to a handler under test. Each
//! `validate_api` call builds the request, resolves the route against the
//! document, invokes the handler and checks the response it produced.

use crate::config::TesterConfig;
use crate::conformance::validate_response;
use crate::error::{OapiResult, ResponseError};
use crate::oas::document::ApiDocument;
use crate::oas::validation::validate_document;
use crate::observe::{Checkpoint, Observer, TracingObserver};
use crate::request::OapiRequest;
use crate::response::CapturedResponse;
use crate::router::{parse_route_url, ResolvedRoute, Router};
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::Method;
use std::cell::Cell;
use url::Url;

/// An OpenAPI document bound to the handler it describes.
pub struct OapiTester<S> {
    handler: S,
    document: ApiDocument,
    base_url: String,
    config: TesterConfig,
    observer: Box<dyn Observer>,
    validated: Cell<bool>,
}

impl<S> OapiTester<S> {
    /// Binds `document` to `handler`. The base URL is derived from the first server.
    pub fn new(document: ApiDocument, handler: S) -> Self {
        let base_url = document.base_url();
        Self {
            handler,
            document,
            base_url,
            config: TesterConfig::default(),
            observer: Box::new(TracingObserver),
            validated: Cell::new(false),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: TesterConfig) -> Self {
        self.config = config;
        self.validated.set(false);
        self
    }

    /// Replaces the observer (a [`TracingObserver`] by default).
    pub fn with_observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Base URL computed at construction.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The bound document.
    pub fn document(&self) -> &ApiDocument {
        &self.document
    }

    /// Mutable access to the document; forces the next call to revalidate it.
    ///
    /// The base URL is not recomputed.
    pub fn document_mut(&mut self) -> &mut ApiDocument {
        self.validated.set(false);
        &mut self.document
    }

    /// The handler under test.
    pub fn handler(&self) -> &S {
        &self.handler
    }

    /// Active configuration.
    pub fn config(&self) -> &TesterConfig {
        &self.config
    }

    /// URL used for route resolution: base URL joined with `path`.
    pub fn route_url(&self, path: &str) -> OapiResult<Url> {
        parse_route_url(&format!("{}{}", self.base_url, path))
    }

    /// Validates the document, then resolves `url` to a declared operation.
    pub fn resolve(&self, method: &Method, url: &Url) -> OapiResult<ResolvedRoute<'_>> {
        self.ensure_valid()?;
        Router::new(&self.document)?.find_route(method, url)
    }

    fn ensure_valid(&self) -> OapiResult<()> {
        if !self.config.revalidate_each_call && self.validated.get() {
            return Ok(());
        }
        validate_document(&self.document)?;
        self.validated.set(true);
        Ok(())
    }
}

impl<S, B> OapiTester<S>
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    /// Runs one request through the handler and checks the response against the document.
    ///
    /// Routing failures are reported before the handler runs. On success the
    /// captured response is returned; conformance failures carry it in the error.
    pub async fn validate_api(&self, request: &OapiRequest) -> OapiResult<CapturedResponse> {
        let result = self.run(request).await;

        let rendered = result.as_ref().err().map(|e| e.to_string());
        self.observer.observe(&Checkpoint::Validated {
            method: &request.method,
            path: &request.path,
            error: rendered.as_deref(),
        });
        result
    }

    async fn run(&self, request: &OapiRequest) -> OapiResult<CapturedResponse> {
        let test_request = request.to_test_request()?;

        let url = self.route_url(&request.path)?;
        self.observer.observe(&Checkpoint::RouteUrl {
            method: &request.method,
            url: url.as_str(),
        });

        let route = self.resolve(&request.method, &url)?;
        self.observer.observe(&Checkpoint::RouteResolved {
            method: &request.method,
            path_template: route.path_template,
            operation_id: route.operation_id(),
        });

        let response = match self.handler.call(test_request.to_request()).await {
            Ok(res) => CapturedResponse::from_service_response(res).await?,
            Err(err) => CapturedResponse::from_http_response(err.error_response()).await?,
        };
        self.observer.observe(&Checkpoint::HandlerResponded {
            status: response.code(),
            body_len: response.body().len(),
        });

        let options = self.config.conformance_options(request.skip_status);
        match validate_response(&self.document, &route, &response, options) {
            Ok(()) => Ok(response),
            Err(mismatch) => Err(ResponseError::new(mismatch, response).into()),
        }
    }
}
