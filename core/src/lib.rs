#![deny(missing_docs)]

//! # oapitest
//!
//! Request/response conformance testing of actix-web handlers against an
//! OpenAPI 3.x document.
//!
//! ```no_run
//! use actix_web::{test, web, App, HttpResponse};
//! use oapitest::{ApiDocument, OapiRequest, OapiTester};
//!
//! # async fn run() -> oapitest::OapiResult<()> {
//! let document = ApiDocument::from_yaml_str(
//!     r#"
//! openapi: 3.1.0
//! info: { title: Search, version: "1" }
//! paths:
//!   /search:
//!     get:
//!       responses:
//!         "200":
//!           description: results
//!           content:
//!             application/json:
//!               schema: { type: array, items: { type: string } }
//! "#,
//! )?;
//! let app = test::init_service(
//!     App::new().route("/search", web::get().to(|| async { HttpResponse::Ok().json(["r"]) })),
//! )
//! .await;
//!
//! let tester = OapiTester::new(document, app);
//! let response = tester
//!     .validate_api(&OapiRequest::get("/search?page=1&per_page=1&vendor=r"))
//!     .await?;
//! assert_eq!(response.code(), 200);
//! # Ok(())
//! # }
//! ```

/// Shared error types.
pub mod error;

/// Tester configuration.
pub mod config;

/// OpenAPI document model and structural validation.
pub mod oas;

/// Observability hook.
pub mod observe;

/// Request descriptors.
pub mod request;

/// Captured handler responses.
pub mod response;

/// Route resolution.
pub mod router;

/// Response conformance checks.
pub mod conformance;

/// The conformance runner.
pub mod tester;

pub use config::TesterConfig;
pub use conformance::{select_response_key, validate_response, ConformanceOptions};
pub use error::{OapiError, OapiResult, ResponseError, ResponseMismatch, RoutingError};
pub use oas::{validate_document, ApiDocument};
pub use observe::{Checkpoint, NoopObserver, Observer, TracingObserver};
pub use request::OapiRequest;
pub use response::CapturedResponse;
pub use router::{ResolvedRoute, Router};
pub use tester::OapiTester;
