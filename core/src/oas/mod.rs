#![deny(missing_docs)]

//! # OpenAPI Module
//!
//! - **document**: Serde model of the routed parts of an OpenAPI document.
//! - **validation**: Structural checks run before any route resolution.
//! - **schema**: JSON Schema compilation with `components` in scope.
//! - **media**: Media type normalization and wildcard matching.
//! - **normalization**: OpenAPI 3.0 schema dialect rewrites.

pub mod document;
pub mod media;
pub(crate) mod normalization;
pub(crate) mod ref_utils;
pub mod schema;
pub mod validation;

pub use document::{
    ApiDocument, ApiHeader, ApiInfo, ApiMediaType, ApiOperation, ApiParameter, ApiPathItem,
    ApiPaths, ApiResponse, ApiServer, ApiServerVariable,
};
pub use validation::validate_document;
