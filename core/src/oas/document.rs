#![deny(missing_docs)]

//! # OpenAPI Document Model
//!
//! Serde structures mapping the parts of an OpenAPI 3.x document that routing
//! and response conformance need. Schemas stay loosely typed (`serde_json::Value`)
//! so they can be handed to the JSON Schema engine untouched.

use crate::error::{OapiError, OapiResult};
use crate::oas::ref_utils::extract_component_name;
use actix_web::http::Method;
use indexmap::IndexMap;
use regex::Regex;
use serde::de::{DeserializeOwned, Error as DeError};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::OnceLock;
use utoipa::openapi::path::ParameterIn;
use utoipa::openapi::RefOr;

/// Matches `{name}` placeholders in server URLs and path templates.
const PLACEHOLDER_PATTERN: &str = r"\{([^{}]*)\}";

/// Compiled [`PLACEHOLDER_PATTERN`], shared across calls.
pub(crate) fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_RE
        .get_or_init(|| Regex::new(PLACEHOLDER_PATTERN).expect("Invalid regex constant"))
}

/// Maximum number of chained `$ref` hops followed before giving up.
const MAX_REF_DEPTH: usize = 16;

/// Parsed OpenAPI document.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiDocument {
    /// OpenAPI version (e.g. "3.0.3").
    pub openapi: Option<String>,

    /// Metadata about the API.
    pub info: Option<ApiInfo>,

    /// Default `$schema` for Schema Objects (OAS 3.1+).
    #[serde(rename = "jsonSchemaDialect", skip_serializing_if = "Option::is_none")]
    pub json_schema_dialect: Option<String>,

    /// Declared servers; the first one defines the tester's base URL.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub servers: Vec<ApiServer>,

    /// Path items keyed by path template.
    #[serde(default)]
    pub paths: ApiPaths,

    /// Raw `components` object, used for `$ref` lookups and schema resolution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Value>,

    /// Everything else (tags, security, extensions...).
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// Metadata about the API.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiInfo {
    /// API title.
    #[serde(default)]
    pub title: String,
    /// API version.
    #[serde(default)]
    pub version: String,
    /// Remaining info fields.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// An object representing a Server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiServer {
    /// A URL to the target host, optionally containing `{variable}` placeholders.
    pub url: String,
    /// An optional string describing the host.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// A map between a variable name and its value.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub variables: BTreeMap<String, ApiServerVariable>,
}

impl ApiServer {
    /// Returns the URL with every known variable replaced by its default value.
    ///
    /// Unknown placeholders are left untouched.
    pub fn resolved_url(&self) -> String {
        placeholder_regex()
            .replace_all(&self.url, |caps: &regex::Captures<'_>| {
                match self.variables.get(&caps[1]) {
                    Some(var) => var.default_value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

/// An object representing a Server Variable.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiServerVariable {
    /// The default value to use for substitution.
    #[serde(rename = "default")]
    pub default_value: String,
    /// Allowed substitution values.
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// An optional description for the server variable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The Paths Object, preserving declaration order.
#[derive(Debug, Clone, Default)]
pub struct ApiPaths {
    /// Parsed path items keyed by path template.
    pub items: IndexMap<String, ApiPathItem>,
    /// Spec extensions attached to the Paths Object (x-...).
    pub extensions: BTreeMap<String, Value>,
}

impl ApiPaths {
    /// Returns true when no concrete path items are present.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<'de> Deserialize<'de> for ApiPaths {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = IndexMap::<String, Value>::deserialize(deserializer)?;
        let mut items = IndexMap::new();
        let mut extensions = BTreeMap::new();

        for (key, value) in raw {
            if key.starts_with("x-") {
                extensions.insert(key, value);
                continue;
            }
            let path_item = serde_json::from_value::<ApiPathItem>(value).map_err(|e| {
                DeError::custom(format!("Failed to parse path item '{}': {}", key, e))
            })?;
            items.insert(key, path_item);
        }

        Ok(Self { items, extensions })
    }
}

impl Serialize for ApiPaths {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.items.len() + self.extensions.len()))?;
        for (key, value) in &self.items {
            map.serialize_entry(key, value)?;
        }
        for (key, value) in &self.extensions {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// A Path Item: the operations available on a single path template.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiPathItem {
    /// Reference to a Path Item defined elsewhere (not supported for routing).
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Parameters shared by every operation on this path.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<RefOr<ApiParameter>>,
    /// GET operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub get: Option<ApiOperation>,
    /// PUT operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub put: Option<ApiOperation>,
    /// POST operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post: Option<ApiOperation>,
    /// DELETE operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete: Option<ApiOperation>,
    /// OPTIONS operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ApiOperation>,
    /// HEAD operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub head: Option<ApiOperation>,
    /// PATCH operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<ApiOperation>,
    /// TRACE operation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<ApiOperation>,
    /// Summary, description, servers and extensions.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl ApiPathItem {
    /// Returns the operation declared for `method`, if any.
    pub fn operation(&self, method: &Method) -> Option<&ApiOperation> {
        match method.as_str() {
            "GET" => self.get.as_ref(),
            "PUT" => self.put.as_ref(),
            "POST" => self.post.as_ref(),
            "DELETE" => self.delete.as_ref(),
            "OPTIONS" => self.options.as_ref(),
            "HEAD" => self.head.as_ref(),
            "PATCH" => self.patch.as_ref(),
            "TRACE" => self.trace.as_ref(),
            _ => None,
        }
    }

    /// Iterates over declared operations as `(method, operation)` pairs.
    pub fn operations(&self) -> impl Iterator<Item = (Method, &ApiOperation)> {
        [
            (Method::GET, &self.get),
            (Method::PUT, &self.put),
            (Method::POST, &self.post),
            (Method::DELETE, &self.delete),
            (Method::OPTIONS, &self.options),
            (Method::HEAD, &self.head),
            (Method::PATCH, &self.patch),
            (Method::TRACE, &self.trace),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.as_ref().map(|op| (method, op)))
    }
}

/// An Operation Object.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiOperation {
    /// Unique operation identifier.
    #[serde(rename = "operationId", skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    /// Operation-level parameters; these override path-level ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<RefOr<ApiParameter>>,
    /// Request body definition, kept raw because requests are not validated.
    #[serde(rename = "requestBody", skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    /// Responses keyed by status code, `NXX` range or `default`.
    #[serde(default)]
    pub responses: IndexMap<String, RefOr<ApiResponse>>,
    /// Summary, tags, security and extensions.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// A Parameter Object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiParameter {
    /// Parameter name.
    pub name: String,
    /// Parameter location.
    #[serde(rename = "in")]
    pub location: ParameterIn,
    /// Whether the parameter must be present.
    #[serde(default)]
    pub required: bool,
    /// Parameter schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Description, style, explode and extensions.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// A Response Object.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiResponse {
    /// Response description.
    #[serde(default)]
    pub description: String,
    /// Declared response headers.
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub headers: IndexMap<String, RefOr<ApiHeader>>,
    /// Declared content keyed by media type (possibly with wildcards).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub content: IndexMap<String, ApiMediaType>,
}

/// A Header Object.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiHeader {
    /// Whether the header must be present.
    #[serde(default)]
    pub required: bool,
    /// Header schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Description, style, explode and extensions.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

/// A Media Type Object.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ApiMediaType {
    /// Schema of the payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
    /// Examples, encoding and extensions.
    #[serde(flatten)]
    pub extensions: BTreeMap<String, Value>,
}

impl ApiDocument {
    /// Parses a YAML (or JSON) OpenAPI document.
    pub fn from_yaml_str(content: &str) -> OapiResult<Self> {
        let value: Value = serde_yaml::from_str(content)
            .map_err(|e| OapiError::Spec(format!("Failed to parse OpenAPI YAML: {}", e)))?;
        Self::from_value(value)
    }

    /// Parses a JSON OpenAPI document.
    pub fn from_json_str(content: &str) -> OapiResult<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| OapiError::Spec(format!("Failed to parse OpenAPI JSON: {}", e)))?;
        Self::from_value(value)
    }

    /// Builds a document from an already parsed JSON value.
    pub fn from_value(value: Value) -> OapiResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| OapiError::Spec(format!("Invalid OpenAPI document: {}", e)))
    }

    /// Returns true when the document uses the OAS 3.0 schema dialect.
    pub fn is_oas30(&self) -> bool {
        self.openapi
            .as_deref()
            .map(|v| v.starts_with("3.0"))
            .unwrap_or(false)
    }

    /// Base URL derived from the first declared server.
    ///
    /// Variables are substituted with their defaults and a trailing `/` is dropped.
    /// Empty when no server is declared.
    pub fn base_url(&self) -> String {
        self.servers
            .first()
            .map(|server| server.resolved_url().trim_end_matches('/').to_string())
            .unwrap_or_default()
    }

    /// Looks up `components.{section}.{name}` in the raw components object.
    pub fn component(&self, section: &str, name: &str) -> Option<&Value> {
        self.components.as_ref()?.get(section)?.get(name)
    }

    /// Resolves a parameter, following `#/components/parameters` references.
    pub fn resolve_parameter(&self, item: &RefOr<ApiParameter>) -> OapiResult<ApiParameter> {
        self.resolve_ref(item, "parameters", 0)
    }

    /// Resolves a response, following `#/components/responses` references.
    pub fn resolve_response(&self, item: &RefOr<ApiResponse>) -> OapiResult<ApiResponse> {
        self.resolve_ref(item, "responses", 0)
    }

    /// Resolves a header, following `#/components/headers` references.
    pub fn resolve_header(&self, item: &RefOr<ApiHeader>) -> OapiResult<ApiHeader> {
        self.resolve_ref(item, "headers", 0)
    }

    /// Merges path-level and operation-level parameters.
    ///
    /// Operation parameters replace path-level ones with the same `(name, in)`.
    pub fn operation_parameters(
        &self,
        path_item: &ApiPathItem,
        operation: &ApiOperation,
    ) -> OapiResult<Vec<ApiParameter>> {
        let mut merged: Vec<ApiParameter> = Vec::new();
        for item in path_item.parameters.iter().chain(operation.parameters.iter()) {
            let param = self.resolve_parameter(item)?;
            match merged
                .iter_mut()
                .find(|p| p.name == param.name && p.location == param.location)
            {
                Some(existing) => *existing = param,
                None => merged.push(param),
            }
        }
        Ok(merged)
    }

    fn resolve_ref<T>(&self, item: &RefOr<T>, section: &str, depth: usize) -> OapiResult<T>
    where
        T: DeserializeOwned + Clone,
    {
        let reference = match item {
            RefOr::T(value) => return Ok(value.clone()),
            RefOr::Ref(r) => &r.ref_location,
        };

        if depth >= MAX_REF_DEPTH {
            return Err(OapiError::Spec(format!(
                "Reference chain too deep while resolving '{}'",
                reference
            )));
        }

        let name = extract_component_name(reference, section).ok_or_else(|| {
            OapiError::Spec(format!(
                "Unsupported reference '{}': expected '#/components/{}/<name>'",
                reference, section
            ))
        })?;
        let raw = self.component(section, &name).ok_or_else(|| {
            OapiError::Spec(format!("Unresolved reference '{}'", reference))
        })?;
        let next: RefOr<T> = serde_json::from_value(raw.clone()).map_err(|e| {
            OapiError::Spec(format!("Invalid component '{}': {}", reference, e))
        })?;
        self.resolve_ref(&next, section, depth + 1)
    }
}

/// Returns the `{name}` variables of a path template in order of appearance.
pub(crate) fn template_variables(template: &str) -> Vec<String> {
    placeholder_regex()
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect()
}
