#![deny(missing_docs)]

//! # Schema Compilation
//!
//! Turns OpenAPI Schema Objects into `jsonschema` validators. The document's
//! `components` are embedded next to the schema so local `$ref`s such as
//! `#/components/schemas/Pet` resolve without any retrieval.

use crate::error::{OapiError, OapiResult};
use crate::oas::document::ApiDocument;
use crate::oas::normalization::{normalize_boolean_schemas, normalize_nullable_schemas};
use crate::oas::ref_utils::extract_component_name;
use jsonschema::{Draft, Validator};
use serde_json::{json, Value};

/// Maps a `$schema` / `jsonSchemaDialect` URI onto a supported draft.
pub fn schema_draft_from_uri(uri: &str) -> Option<Draft> {
    let normalized = uri.trim_end_matches('#');
    match normalized {
        "https://spec.openapis.org/oas/3.1/dialect/base" => Some(Draft::Draft202012),
        "https://json-schema.org/draft/2020-12/schema" => Some(Draft::Draft202012),
        "https://json-schema.org/draft/2019-09/schema" => Some(Draft::Draft201909),
        "http://json-schema.org/draft-07/schema" => Some(Draft::Draft7),
        "http://json-schema.org/draft-04/schema" => Some(Draft::Draft4),
        _ => None,
    }
}

/// Picks the draft for `schema`: its own `$schema`, then the document dialect,
/// then the OpenAPI version (3.0 → Draft 4, otherwise Draft 2020-12).
pub fn resolve_schema_draft(schema: &Value, doc: &ApiDocument) -> Draft {
    if let Some(draft) = schema
        .get("$schema")
        .and_then(|v| v.as_str())
        .and_then(schema_draft_from_uri)
    {
        return draft;
    }

    if let Some(draft) = doc
        .json_schema_dialect
        .as_deref()
        .and_then(schema_draft_from_uri)
    {
        return draft;
    }

    if doc.is_oas30() {
        Draft::Draft4
    } else {
        Draft::Draft202012
    }
}

/// Returns the primary non-null `type` of a schema, if declared.
pub fn schema_type_hint(schema: &Value) -> Option<&str> {
    match schema.get("type") {
        Some(Value::String(s)) => Some(s.as_str()),
        Some(Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str())
            .find(|s| *s != "null"),
        _ => None,
    }
}

/// Follows a single `#/components/schemas` reference, returning `schema` itself otherwise.
pub(crate) fn dereference_schema<'s>(schema: &'s Value, doc: &'s ApiDocument) -> &'s Value {
    schema
        .get("$ref")
        .and_then(|r| r.as_str())
        .and_then(|r| extract_component_name(r, "schemas"))
        .and_then(|name| doc.component("schemas", &name))
        .unwrap_or(schema)
}

/// Compiles `schema` in the context of `doc`.
pub fn compile_schema(schema: &Value, doc: &ApiDocument) -> OapiResult<Validator> {
    let draft = resolve_schema_draft(schema, doc);
    let root = embed_components(schema, doc);

    jsonschema::options()
        .with_draft(draft)
        .build(&root)
        .map_err(|e| OapiError::Spec(format!("Failed to compile JSON Schema: {}", e)))
}

/// Validates `instance` and returns one rendered message per violation.
pub fn schema_violations(validator: &Validator, instance: &Value) -> Vec<String> {
    validator
        .iter_errors(instance)
        .map(|err| {
            let path = err.instance_path.to_string();
            if path.is_empty() {
                err.to_string()
            } else {
                format!("{} (at '{}')", err, path)
            }
        })
        .collect()
}

fn embed_components(schema: &Value, doc: &ApiDocument) -> Value {
    let mut subject = schema.clone();
    if let Value::Object(map) = &mut subject {
        map.remove("$schema");
    }

    let mut root = json!({ "allOf": [subject] });
    if let Some(components) = &doc.components {
        root["components"] = components.clone();
    }

    if doc.is_oas30() {
        normalize_nullable_schemas(&mut root);
    }
    normalize_boolean_schemas(&mut root);
    if let Some(schemas) = root
        .get_mut("components")
        .and_then(|c| c.get_mut("schemas"))
        .and_then(|s| s.as_object_mut())
    {
        for value in schemas.values_mut() {
            if value.is_boolean() {
                let flag = value.as_bool().unwrap_or(true);
                *value = if flag { json!({}) } else { json!({ "not": {} }) };
            } else {
                normalize_boolean_schemas(value);
            }
        }
    }
    root
}
