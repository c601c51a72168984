#![deny(missing_docs)]

//! # Schema Normalization
//!
//! Rewrites OpenAPI schema dialect quirks into plain JSON Schema before a
//! schema is handed to the validator. Only known compatibility gaps are touched.

use serde_json::{json, Map, Value};

/// Normalizes `nullable` / `x-nullable` schema flags into JSON Schema null unions.
///
/// OpenAPI 3.0 uses `nullable: true` (and Swagger 2.0 often uses `x-nullable: true`).
/// JSON Schema encodes nullability via `type: [T, "null"]`.
///
/// This helper rewrites `nullable` and `x-nullable` into a `type` union where possible,
/// or wraps the schema in `anyOf` when no explicit `type` is present.
pub(crate) fn normalize_nullable_schemas(value: &mut Value) {
    if let Value::Object(map) = value {
        if let Some(replacement) = apply_nullable_flag(map) {
            *value = replacement;
        }
    }

    match value {
        Value::Object(map) => {
            for (key, v) in map.iter_mut() {
                if matches!(key.as_str(), "example" | "examples" | "default" | "enum") {
                    continue;
                }
                normalize_nullable_schemas(v);
            }
        }
        Value::Array(items) => {
            for v in items.iter_mut() {
                normalize_nullable_schemas(v);
            }
        }
        _ => {}
    }
}

/// Normalizes boolean schemas (`true` / `false`) in subschema positions.
///
/// - `true` becomes `{}` (accepts any instance)
/// - `false` becomes `{"not": {}}` (rejects every instance)
///
/// Draft 4 has no boolean schemas, so OAS 3.0 documents need this rewrite.
pub(crate) fn normalize_boolean_schemas(value: &mut Value) {
    let Value::Object(map) = value else {
        return;
    };

    for key in ["items", "not", "contains", "propertyNames", "if", "then", "else"] {
        if let Some(v) = map.get_mut(key) {
            normalize_schema_node(v);
        }
    }
    for key in ["allOf", "anyOf", "oneOf", "prefixItems"] {
        if let Some(items) = map.get_mut(key).and_then(|v| v.as_array_mut()) {
            for v in items.iter_mut() {
                normalize_schema_node(v);
            }
        }
    }
    for key in ["properties", "patternProperties", "dependentSchemas", "definitions", "$defs"] {
        if let Some(props) = map.get_mut(key).and_then(|v| v.as_object_mut()) {
            for v in props.values_mut() {
                normalize_schema_node(v);
            }
        }
    }
    for key in ["additionalProperties", "unevaluatedProperties", "unevaluatedItems"] {
        if let Some(v) = map.get_mut(key) {
            if !v.is_boolean() {
                normalize_boolean_schemas(v);
            }
        }
    }
}

fn normalize_schema_node(value: &mut Value) {
    match value {
        Value::Bool(flag) => *value = bool_schema_replacement(*flag),
        Value::Object(_) => normalize_boolean_schemas(value),
        _ => {}
    }
}

fn bool_schema_replacement(flag: bool) -> Value {
    if flag {
        Value::Object(Map::new())
    } else {
        json!({ "not": {} })
    }
}

fn apply_nullable_flag(map: &mut Map<String, Value>) -> Option<Value> {
    let nullable = map
        .get("nullable")
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
        || map
            .get("x-nullable")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

    if !nullable {
        if matches!(map.get("nullable"), Some(Value::Bool(false))) {
            map.remove("nullable");
        }
        return None;
    }

    map.remove("nullable");
    map.remove("x-nullable");

    if let Some(type_val) = map.get_mut("type") {
        match type_val {
            Value::String(s) => {
                if s != "null" {
                    *type_val = Value::Array(vec![
                        Value::String(s.clone()),
                        Value::String("null".to_string()),
                    ]);
                }
            }
            Value::Array(arr) => {
                let has_null = arr.iter().any(|v| v.as_str() == Some("null"));
                if !has_null {
                    arr.push(Value::String("null".to_string()));
                }
            }
            _ => {}
        }
        if let Some(Value::Array(values)) = map.get_mut("enum") {
            if !values.iter().any(Value::is_null) {
                values.push(Value::Null);
            }
        }
        return None;
    }

    let original = Value::Object(map.clone());
    Some(json!({ "anyOf": [original, { "type": "null" }] }))
}
