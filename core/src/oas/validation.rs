#![deny(missing_docs)]

//! # OpenAPI Validation
//!
//! Structural checks run before a router is built from a document.
//!
//! Validations include:
//! - `openapi` must be a 3.x version and `info` must carry a title and version.
//! - Server URLs must not carry query or fragment, and every placeholder must be defined.
//! - Path templates must start with `/` and declare exactly the path parameters they use.
//! - Responses must define at least one entry with a valid status key.
//! - Every `$ref` the tester follows must resolve, and every schema must compile.

use crate::error::{OapiError, OapiResult};
use crate::oas::document::{
    placeholder_regex, template_variables, ApiDocument, ApiOperation, ApiPathItem, ApiServer,
};
use crate::oas::schema::compile_schema;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;
use utoipa::openapi::path::ParameterIn;

const COMPONENT_KEY_PATTERN: &str = r"^[a-zA-Z0-9._-]+$";

/// Explicit status codes (`200`) and ranges (`2XX`).
const STATUS_KEY_PATTERN: &str = r"^[1-5](?:[0-9]{2}|[xX]{2})$";

fn component_key_regex() -> &'static Regex {
    static COMPONENT_KEY_RE: OnceLock<Regex> = OnceLock::new();
    COMPONENT_KEY_RE
        .get_or_init(|| Regex::new(COMPONENT_KEY_PATTERN).expect("Invalid regex constant"))
}

fn status_key_regex() -> &'static Regex {
    static STATUS_KEY_RE: OnceLock<Regex> = OnceLock::new();
    STATUS_KEY_RE
        .get_or_init(|| Regex::new(STATUS_KEY_PATTERN).expect("Invalid regex constant"))
}

/// Route matching supports at most this many variables per template.
const MAX_TEMPLATE_VARIABLES: usize = 16;

/// Validates the whole document.
pub fn validate_document(doc: &ApiDocument) -> OapiResult<()> {
    validate_version(doc)?;
    validate_info(doc)?;
    validate_servers(&doc.servers)?;
    validate_component_keys(doc)?;
    validate_component_schemas(doc)?;

    for (template, path_item) in &doc.paths.items {
        validate_path_item(doc, template, path_item)?;
    }

    Ok(())
}

fn validate_version(doc: &ApiDocument) -> OapiResult<()> {
    match doc.openapi.as_deref() {
        Some(version) if version.starts_with("3.") => Ok(()),
        Some(version) => Err(OapiError::Spec(format!(
            "Unsupported OpenAPI version: {}. Only 3.x is supported.",
            version
        ))),
        None => Err(OapiError::Spec(
            "Invalid OpenAPI document: missing 'openapi' version field.".into(),
        )),
    }
}

fn validate_info(doc: &ApiDocument) -> OapiResult<()> {
    let Some(info) = &doc.info else {
        return Err(OapiError::Spec(
            "OpenAPI document missing required 'info' object".into(),
        ));
    };

    if info.title.trim().is_empty() {
        return Err(OapiError::Spec("Info.title must be a non-empty string".into()));
    }
    if info.version.trim().is_empty() {
        return Err(OapiError::Spec("Info.version must be a non-empty string".into()));
    }

    Ok(())
}

fn validate_servers(servers: &[ApiServer]) -> OapiResult<()> {
    let placeholder_re = placeholder_regex();

    for (idx, server) in servers.iter().enumerate() {
        let context = format!("servers[{}]", idx);

        if server.url.contains('?') || server.url.contains('#') {
            return Err(OapiError::Spec(format!(
                "Server URL '{}' in {} MUST NOT include query or fragment",
                server.url, context
            )));
        }

        for cap in placeholder_re.captures_iter(&server.url) {
            if !server.variables.contains_key(&cap[1]) {
                return Err(OapiError::Spec(format!(
                    "Server URL '{}' in {} references undefined variable '{}'",
                    server.url, context, &cap[1]
                )));
            }
        }

        for (name, var) in &server.variables {
            if let Some(values) = &var.enum_values {
                if values.is_empty() {
                    return Err(OapiError::Spec(format!(
                        "Server variable '{}' in {} must not declare an empty enum",
                        name, context
                    )));
                }
                if !values.contains(&var.default_value) {
                    return Err(OapiError::Spec(format!(
                        "Server variable '{}' in {} has default '{}' outside its enum",
                        name, context, var.default_value
                    )));
                }
            }
        }

        let resolved = server.resolved_url();
        if resolved.contains("://") {
            Url::parse(&resolved).map_err(|e| {
                OapiError::Spec(format!(
                    "Server URL '{}' in {} is not a valid URL: {}",
                    server.url, context, e
                ))
            })?;
        }
    }

    Ok(())
}

fn validate_component_keys(doc: &ApiDocument) -> OapiResult<()> {
    let Some(components) = doc.components.as_ref().and_then(|c| c.as_object()) else {
        return Ok(());
    };

    let key_re = component_key_regex();
    for (section, entries) in components {
        if section.starts_with("x-") {
            continue;
        }
        let Some(entries) = entries.as_object() else {
            continue;
        };
        for key in entries.keys() {
            if !key_re.is_match(key) {
                return Err(OapiError::Spec(format!(
                    "Component key '{}' in components.{} must match {}",
                    key, section, COMPONENT_KEY_PATTERN
                )));
            }
        }
    }

    Ok(())
}

fn validate_component_schemas(doc: &ApiDocument) -> OapiResult<()> {
    let Some(schemas) = doc
        .components
        .as_ref()
        .and_then(|c| c.get("schemas"))
        .and_then(|s| s.as_object())
    else {
        return Ok(());
    };

    for (name, schema) in schemas {
        compile_schema(schema, doc).map_err(|e| {
            OapiError::Spec(format!("components.schemas.{}: {}", name, e))
        })?;
    }

    Ok(())
}

fn validate_path_item(
    doc: &ApiDocument,
    template: &str,
    path_item: &ApiPathItem,
) -> OapiResult<()> {
    let context = format!("paths.{}", template);

    if !template.starts_with('/') {
        return Err(OapiError::Spec(format!(
            "Path '{}' must begin with '/'",
            template
        )));
    }
    if path_item.reference.is_some() {
        return Err(OapiError::Spec(format!(
            "{}: Path Item '$ref' is not supported",
            context
        )));
    }
    validate_template_syntax(template)?;

    for (method, operation) in path_item.operations() {
        let op_context = format!("{}.{}", context, method.as_str().to_lowercase());
        validate_operation_parameters(doc, template, path_item, operation, &op_context)?;
        validate_operation_responses(doc, operation, &op_context)?;
    }

    Ok(())
}

fn validate_template_syntax(template: &str) -> OapiResult<()> {
    let unbalanced = || {
        OapiError::Spec(format!(
            "Path '{}' has unbalanced template braces",
            template
        ))
    };

    let mut open = false;
    for ch in template.chars() {
        match ch {
            '{' if open => return Err(unbalanced()),
            '{' => open = true,
            '}' if !open => return Err(unbalanced()),
            '}' => open = false,
            _ => {}
        }
    }
    if open {
        return Err(unbalanced());
    }

    let variables = template_variables(template);
    if variables.len() > MAX_TEMPLATE_VARIABLES {
        return Err(OapiError::Spec(format!(
            "Path '{}' declares more than {} template variables",
            template, MAX_TEMPLATE_VARIABLES
        )));
    }

    let mut seen = HashSet::new();
    for name in variables {
        if name.trim().is_empty() {
            return Err(OapiError::Spec(format!(
                "Path '{}' contains an empty template variable",
                template
            )));
        }
        if !seen.insert(name.clone()) {
            return Err(OapiError::Spec(format!(
                "Path '{}' repeats template variable '{}'",
                template, name
            )));
        }
    }

    Ok(())
}

fn validate_operation_parameters(
    doc: &ApiDocument,
    template: &str,
    path_item: &ApiPathItem,
    operation: &ApiOperation,
    context: &str,
) -> OapiResult<()> {
    for (label, list) in [
        ("path-level", &path_item.parameters),
        ("operation", &operation.parameters),
    ] {
        let mut seen: Vec<(String, ParameterIn)> = Vec::new();
        for item in list {
            let param = doc.resolve_parameter(item)?;
            if seen
                .iter()
                .any(|(name, location)| *name == param.name && *location == param.location)
            {
                return Err(OapiError::Spec(format!(
                    "{}: duplicate {} parameter '{}'",
                    context, label, param.name
                )));
            }
            seen.push((param.name, param.location));
        }
    }

    let params = doc.operation_parameters(path_item, operation)?;
    let declared: HashSet<&str> = params
        .iter()
        .filter(|p| p.location == ParameterIn::Path)
        .map(|p| p.name.as_str())
        .collect();
    let used: HashSet<String> = template_variables(template).into_iter().collect();

    for name in &used {
        if !declared.contains(name.as_str()) {
            return Err(OapiError::Spec(format!(
                "{}: path parameter '{}' is used in the template but not declared",
                context, name
            )));
        }
    }

    for param in &params {
        if let Some(schema) = &param.schema {
            compile_schema(schema, doc).map_err(|e| {
                OapiError::Spec(format!("{}: parameter '{}': {}", context, param.name, e))
            })?;
        }
        if param.location != ParameterIn::Path {
            continue;
        }
        if !used.contains(&param.name) {
            return Err(OapiError::Spec(format!(
                "{}: path parameter '{}' is declared but missing from the template",
                context, param.name
            )));
        }
        if !param.required {
            return Err(OapiError::Spec(format!(
                "{}: path parameter '{}' must be required",
                context, param.name
            )));
        }
    }

    Ok(())
}

fn validate_operation_responses(
    doc: &ApiDocument,
    operation: &ApiOperation,
    context: &str,
) -> OapiResult<()> {
    let status_re = status_key_regex();

    if operation.responses.is_empty() {
        return Err(OapiError::Spec(format!(
            "{}.responses must define at least one response",
            context
        )));
    }

    for (key, item) in &operation.responses {
        if key != "default" && !status_re.is_match(key) {
            return Err(OapiError::Spec(format!(
                "{}.responses has invalid status key '{}'",
                context, key
            )));
        }

        let response = doc.resolve_response(item)?;
        for header in response.headers.values() {
            doc.resolve_header(header)?;
        }
        for (media_type, media) in &response.content {
            if let Some(schema) = &media.schema {
                compile_schema(schema, doc).map_err(|e| {
                    OapiError::Spec(format!(
                        "{}.responses.{}.content.{}: {}",
                        context, key, media_type, e
                    ))
                })?;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ApiDocument {
        ApiDocument::from_yaml_str(yaml).unwrap()
    }

    fn spec_error(yaml: &str) -> String {
        match validate_document(&parse(yaml)) {
            Err(OapiError::Spec(msg)) => msg,
            other => panic!("expected spec error, got {:?}", other),
        }
    }

    const VALID: &str = r#"
openapi: 3.0.3
info: { title: Users, version: "1" }
servers:
  - url: /api
paths:
  /users/{id}:
    get:
      parameters:
        - { name: id, in: path, required: true, schema: { type: integer } }
      responses:
        "200":
          description: ok
          content:
            application/json:
              schema: { $ref: '#/components/schemas/User' }
        4XX: { description: client error }
        default: { description: other }
components:
  schemas:
    User:
      type: object
      properties:
        id: { type: integer }
"#;

    #[test]
    fn test_valid_document_passes() {
        validate_document(&parse(VALID)).unwrap();
    }

    #[test]
    fn test_missing_version() {
        let msg = spec_error("info: { title: t, version: '1' }\npaths: {}\n");
        assert!(msg.contains("missing 'openapi'"));
    }

    #[test]
    fn test_swagger_rejected() {
        let msg = spec_error("openapi: '2.0'\ninfo: { title: t, version: '1' }\n");
        assert!(msg.contains("Unsupported OpenAPI version"));
    }

    #[test]
    fn test_empty_title() {
        let msg = spec_error("openapi: 3.1.0\ninfo: { title: '', version: '1' }\n");
        assert!(msg.contains("Info.title"));
    }

    #[test]
    fn test_server_undefined_variable() {
        let msg = spec_error(
            "openapi: 3.1.0\ninfo: { title: t, version: '1' }\n\
             servers:\n  - url: 'https://{env}.example.com'\n",
        );
        assert!(msg.contains("undefined variable 'env'"));
    }

    #[test]
    fn test_server_default_outside_enum() {
        let msg = spec_error(
            r#"
openapi: 3.1.0
info: { title: t, version: '1' }
servers:
  - url: 'https://{env}.example.com'
    variables:
      env: { default: prod, enum: [dev, staging] }
"#,
        );
        assert!(msg.contains("outside its enum"));
    }

    #[test]
    fn test_undeclared_path_parameter() {
        let msg = spec_error(
            r#"
openapi: 3.1.0
info: { title: t, version: '1' }
paths:
  /users/{id}:
    get:
      responses:
        "200": { description: ok }
"#,
        );
        assert!(msg.contains("'id' is used in the template but not declared"));
    }

    #[test]
    fn test_extra_path_parameter() {
        let msg = spec_error(
            r#"
openapi: 3.1.0
info: { title: t, version: '1' }
paths:
  /users:
    get:
      parameters:
        - { name: id, in: path, required: true, schema: { type: string } }
      responses:
        "200": { description: ok }
"#,
        );
        assert!(msg.contains("missing from the template"));
    }

    #[test]
    fn test_optional_path_parameter() {
        let msg = spec_error(
            r#"
openapi: 3.1.0
info: { title: t, version: '1' }
paths:
  /users/{id}:
    get:
      parameters:
        - { name: id, in: path, schema: { type: string } }
      responses:
        "200": { description: ok }
"#,
        );
        assert!(msg.contains("must be required"));
    }

    #[test]
    fn test_duplicate_parameter() {
        let msg = spec_error(
            r#"
openapi: 3.1.0
info: { title: t, version: '1' }
paths:
  /users:
    get:
      parameters:
        - { name: q, in: query }
        - { name: q, in: query }
      responses:
        "200": { description: ok }
"#,
        );
        assert!(msg.contains("duplicate operation parameter 'q'"));
    }

    #[test]
    fn test_empty_responses() {
        let msg = spec_error(
            r#"
openapi: 3.1.0
info: { title: t, version: '1' }
paths:
  /users:
    get:
      responses: {}
"#,
        );
        assert!(msg.contains("at least one response"));
    }

    #[test]
    fn test_invalid_status_key() {
        let msg = spec_error(
            r#"
openapi: 3.1.0
info: { title: t, version: '1' }
paths:
  /users:
    get:
      responses:
        "600": { description: nope }
"#,
        );
        assert!(msg.contains("invalid status key '600'"));
    }

    #[test]
    fn test_unbalanced_template() {
        let msg = spec_error(
            r#"
openapi: 3.1.0
info: { title: t, version: '1' }
paths:
  /users/{id:
    get:
      responses:
        "200": { description: ok }
"#,
        );
        assert!(msg.contains("unbalanced"));
    }

    #[test]
    fn test_hyphenated_template_variable_accepted() {
        validate_document(&parse(
            r#"
openapi: 3.1.0
info: { title: t, version: '1' }
paths:
  /users/{user-id}:
    get:
      parameters:
        - { name: user-id, in: path, required: true, schema: { type: integer } }
      responses:
        "200": { description: ok }
"#,
        ))
        .unwrap();
    }

    #[test]
    fn test_status_key_patterns() {
        let re = status_key_regex();
        for key in ["200", "404", "2XX", "5xx"] {
            assert!(re.is_match(key), "{}", key);
        }
        for key in ["600", "20X", "2XXX", "xx"] {
            assert!(!re.is_match(key), "{}", key);
        }
    }

    #[test]
    fn test_path_must_start_with_slash() {
        let msg = spec_error(
            r#"
openapi: 3.1.0
info: { title: t, version: '1' }
paths:
  users:
    get:
      responses:
        "200": { description: ok }
"#,
        );
        assert!(msg.contains("must begin with '/'"));
    }

    #[test]
    fn test_invalid_component_key() {
        let msg = spec_error(
            r#"
openapi: 3.1.0
info: { title: t, version: '1' }
components:
  schemas:
    "Bad Key": { type: string }
"#,
        );
        assert!(msg.contains("Bad Key"));
    }

    #[test]
    fn test_invalid_component_schema() {
        let msg = spec_error(
            r#"
openapi: 3.1.0
info: { title: t, version: '1' }
components:
  schemas:
    Broken: { type: 12 }
"#,
        );
        assert!(msg.contains("components.schemas.Broken"));
    }

    #[test]
    fn test_unresolved_response_ref() {
        let msg = spec_error(
            r#"
openapi: 3.1.0
info: { title: t, version: '1' }
paths:
  /users:
    get:
      responses:
        "200": { $ref: '#/components/responses/Missing' }
"#,
        );
        assert!(msg.contains("Unresolved reference"));
    }
}
