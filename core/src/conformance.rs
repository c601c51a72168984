#![deny(missing_docs)]

//! # Response Conformance
//!
//! Checks a captured response against the response an operation declares for
//! its status code: status selection, optional header checks, then media type
//! lookup and schema validation of the body.

use crate::error::ResponseMismatch;
use crate::oas::document::{ApiDocument, ApiOperation, ApiResponse};
use crate::oas::media::{is_json_media_type, is_text_media_type, select_media_type};
use crate::oas::schema::{compile_schema, dereference_schema, schema_type_hint, schema_violations};
use crate::response::CapturedResponse;
use crate::router::{coerce_parameter, ResolvedRoute};
use serde_json::Value;

/// Knobs applied to a single conformance check.
#[derive(Debug, Clone, Copy)]
pub struct ConformanceOptions<'c> {
    /// Content type used to look up the declared media type.
    pub content_type: &'c str,
    /// Check declared response headers.
    pub validate_headers: bool,
    /// Skip media type lookup and body validation entirely.
    pub exclude_body: bool,
    /// Accept statuses the operation does not declare.
    pub skip_status: bool,
}

impl Default for ConformanceOptions<'_> {
    fn default() -> Self {
        Self {
            content_type: "application/json",
            validate_headers: false,
            exclude_body: false,
            skip_status: false,
        }
    }
}

/// Returns the declared response key for `status`: exact code, `NXX` range, then `default`.
pub fn select_response_key(operation: &ApiOperation, status: u16) -> Option<&str> {
    let exact = status.to_string();
    if let Some((key, _)) = operation.responses.get_key_value(exact.as_str()) {
        return Some(key.as_str());
    }

    let class = status / 100;
    let range = operation.responses.keys().find(|key| {
        key.len() == 3
            && key.is_ascii()
            && key[1..].eq_ignore_ascii_case("xx")
            && key[..1].parse::<u16>().ok() == Some(class)
    });
    if let Some(key) = range {
        return Some(key.as_str());
    }

    operation
        .responses
        .get_key_value("default")
        .map(|(key, _)| key.as_str())
}

/// Redirect statuses that pass conformance unconditionally.
fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 304 | 307 | 308)
}

/// Validates `response` against what `route` declares.
pub fn validate_response(
    doc: &ApiDocument,
    route: &ResolvedRoute<'_>,
    response: &CapturedResponse,
    options: ConformanceOptions<'_>,
) -> Result<(), ResponseMismatch> {
    let status = response.code();
    // Redirects are accepted without selecting a declared response.
    if is_redirect(status) {
        return Ok(());
    }
    let Some(key) = select_response_key(route.operation, status) else {
        if options.skip_status {
            return Ok(());
        }
        return Err(ResponseMismatch::StatusNotDeclared {
            status,
            method: route.method.to_string(),
            path_template: route.path_template.to_string(),
        });
    };

    let declared = route
        .operation
        .responses
        .get(key)
        .map(|item| doc.resolve_response(item))
        .transpose()
        .map_err(|e| ResponseMismatch::Definition(e.to_string()))?
        .unwrap_or_default();

    if options.validate_headers {
        validate_headers(doc, &declared, response)?;
    }

    // Empty bodies are never checked against the declared content.
    if options.exclude_body || response.body().is_empty() {
        return Ok(());
    }

    validate_body(doc, &declared, response, options.content_type)
}

fn validate_headers(
    doc: &ApiDocument,
    declared: &ApiResponse,
    response: &CapturedResponse,
) -> Result<(), ResponseMismatch> {
    for (name, item) in &declared.headers {
        if name.eq_ignore_ascii_case("content-type") {
            continue;
        }
        let header = doc
            .resolve_header(item)
            .map_err(|e| ResponseMismatch::Definition(e.to_string()))?;

        let values = response.header_values(name);
        let Some(value) = values.first() else {
            if header.required {
                return Err(ResponseMismatch::MissingHeader { name: name.clone() });
            }
            continue;
        };

        let Some(schema) = header.schema.as_ref() else {
            continue;
        };
        let instance = coerce_parameter(value, schema_type_hint(dereference_schema(schema, doc)));
        let validator =
            compile_schema(schema, doc).map_err(|e| ResponseMismatch::Definition(e.to_string()))?;
        let violations = schema_violations(&validator, &instance);
        if !violations.is_empty() {
            return Err(ResponseMismatch::InvalidHeader {
                name: name.clone(),
                value: value.clone(),
                reason: violations.join("; "),
            });
        }
    }
    Ok(())
}

fn validate_body(
    doc: &ApiDocument,
    declared: &ApiResponse,
    response: &CapturedResponse,
    content_type: &str,
) -> Result<(), ResponseMismatch> {
    if declared.content.is_empty() {
        return Ok(());
    }

    let Some((media_type, media)) = select_media_type(&declared.content, content_type) else {
        return Err(ResponseMismatch::UnsupportedContentType {
            content_type: content_type.to_string(),
            declared: declared
                .content
                .keys()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", "),
        });
    };

    let Some(schema) = media.schema.as_ref() else {
        return Ok(());
    };

    let instance = if is_json_media_type(content_type) {
        serde_json::from_slice::<Value>(response.body()).map_err(|e| {
            ResponseMismatch::InvalidBody {
                media_type: media_type.to_string(),
                reason: e.to_string(),
            }
        })?
    } else if is_text_media_type(content_type) {
        let text = std::str::from_utf8(response.body()).map_err(|e| {
            ResponseMismatch::InvalidBody {
                media_type: media_type.to_string(),
                reason: e.to_string(),
            }
        })?;
        Value::String(text.to_string())
    } else {
        // Binary payloads have no JSON representation to validate.
        return Ok(());
    };

    let validator =
        compile_schema(schema, doc).map_err(|e| ResponseMismatch::Definition(e.to_string()))?;
    let violations = schema_violations(&validator, &instance);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(ResponseMismatch::SchemaViolation {
            media_type: media_type.to_string(),
            violations,
        })
    }
}
