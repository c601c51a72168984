#![deny(missing_docs)]

//! # Route Resolution
//!
//! Matches a concrete request URL against the path templates of a validated
//! document. Server prefixes are stripped first, literal templates win over
//! templated ones, and bound path parameters are checked against their schemas.

use crate::error::{OapiError, OapiResult, RoutingError};
use crate::oas::document::{
    placeholder_regex, ApiDocument, ApiOperation, ApiParameter, ApiPathItem,
};
use crate::oas::schema::{compile_schema, dereference_schema, schema_type_hint, schema_violations};
use actix_web::dev::{Path, ResourceDef};
use actix_web::http::Method;
use indexmap::IndexMap;
use percent_encoding::percent_decode_str;
use regex::Captures;
use serde_json::{Number, Value};
use url::{Origin, Url};
use utoipa::openapi::path::ParameterIn;

/// Origin used to resolve relative server URLs and request paths.
pub const PLACEHOLDER_ORIGIN: &str = "http://localhost";

/// A request matched to a declared operation.
#[derive(Debug, Clone)]
pub struct ResolvedRoute<'a> {
    /// Request method.
    pub method: Method,
    /// The matched path template, e.g. `/users/{id}`.
    pub path_template: &'a str,
    /// Path item holding the operation.
    pub path_item: &'a ApiPathItem,
    /// The matched operation.
    pub operation: &'a ApiOperation,
    /// Path-level and operation-level parameters, merged and resolved.
    pub parameters: Vec<ApiParameter>,
    /// Decoded path parameters keyed by template variable name.
    pub path_params: IndexMap<String, String>,
    /// Decoded query parameters; repeated keys keep every value.
    pub query_params: IndexMap<String, Vec<String>>,
}

impl ResolvedRoute<'_> {
    /// The operation's `operationId`, if declared.
    pub fn operation_id(&self) -> Option<&str> {
        self.operation.operation_id.as_deref()
    }

    /// First value of a query parameter.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params
            .get(name)
            .and_then(|values| values.first())
            .map(|value| value.as_str())
    }
}

struct ServerPrefix {
    origin: Option<Origin>,
    path: String,
}

struct RouteEntry<'a> {
    template: &'a str,
    resource: ResourceDef,
    /// Declared variable names; the matcher captures them as `p0`, `p1`, ...
    variables: Vec<String>,
    item: &'a ApiPathItem,
}

impl<'a> RouteEntry<'a> {
    fn new(template: &'a str, item: &'a ApiPathItem) -> Self {
        let mut variables = Vec::new();
        let pattern = placeholder_regex()
            .replace_all(template, |caps: &Captures<'_>| {
                variables.push(caps[1].to_string());
                format!("{{p{}}}", variables.len() - 1)
            })
            .into_owned();

        Self {
            template,
            resource: ResourceDef::new(pattern),
            variables,
            item,
        }
    }
}

/// Route matcher built from one document.
pub struct Router<'a> {
    doc: &'a ApiDocument,
    servers: Vec<ServerPrefix>,
    routes: Vec<RouteEntry<'a>>,
}

impl<'a> Router<'a> {
    /// Builds a router; the document is expected to have passed validation.
    pub fn new(doc: &'a ApiDocument) -> OapiResult<Self> {
        let servers = doc
            .servers
            .iter()
            .map(|server| server_prefix(&server.resolved_url()))
            .collect::<OapiResult<Vec<_>>>()?;

        let (literal, templated): (Vec<_>, Vec<_>) = doc
            .paths
            .items
            .iter()
            .map(|(template, item)| RouteEntry::new(template, item))
            .partition(|entry| !entry.template.contains('{'));

        let mut routes = literal;
        routes.extend(templated);

        Ok(Self {
            doc,
            servers,
            routes,
        })
    }

    /// Finds the operation serving `method` on `url`.
    pub fn find_route(&self, method: &Method, url: &Url) -> OapiResult<ResolvedRoute<'a>> {
        let request_path = self.strip_server(url)?;
        let mut method_mismatch: Option<&str> = None;

        for entry in &self.routes {
            let mut path = Path::new(request_path.clone());
            if !entry.resource.capture_match_info(&mut path) {
                continue;
            }

            let Some(operation) = entry.item.operation(method) else {
                method_mismatch.get_or_insert(entry.template);
                continue;
            };

            let bound: Vec<(String, String)> = entry
                .variables
                .iter()
                .enumerate()
                .map(|(idx, name)| {
                    let raw = path.get(&format!("p{}", idx)).unwrap_or_default();
                    (name.clone(), decode(raw))
                })
                .collect();
            return self.bind(method, entry, operation, bound, url);
        }

        let err = match method_mismatch {
            Some(template) => RoutingError::MethodNotAllowed {
                method: method.to_string(),
                path_template: template.to_string(),
            },
            None => RoutingError::PathNotFound { path: request_path },
        };
        Err(err.into())
    }

    fn strip_server(&self, url: &Url) -> Result<String, RoutingError> {
        let path = url.path();
        if self.servers.is_empty() {
            return Ok(path.to_string());
        }

        for server in &self.servers {
            if let Some(origin) = &server.origin {
                if *origin != url.origin() {
                    continue;
                }
            }
            if server.path.is_empty() {
                return Ok(path.to_string());
            }
            if path == server.path {
                return Ok("/".to_string());
            }
            if let Some(rest) = path.strip_prefix(server.path.as_str()) {
                if rest.starts_with('/') {
                    return Ok(rest.to_string());
                }
            }
        }

        Err(RoutingError::NoMatchingServer {
            url: url.to_string(),
        })
    }

    fn bind(
        &self,
        method: &Method,
        entry: &RouteEntry<'a>,
        operation: &'a ApiOperation,
        bound: Vec<(String, String)>,
        url: &Url,
    ) -> OapiResult<ResolvedRoute<'a>> {
        let parameters = self.doc.operation_parameters(entry.item, operation)?;

        let mut path_params = IndexMap::new();
        for (name, value) in bound {
            let declared = parameters
                .iter()
                .find(|p| p.location == ParameterIn::Path && p.name == name);
            if let Some(schema) = declared.and_then(|p| p.schema.as_ref()) {
                self.check_path_value(&name, &value, schema)?;
            }
            path_params.insert(name, value);
        }

        let mut query_params: IndexMap<String, Vec<String>> = IndexMap::new();
        for (key, value) in url.query_pairs() {
            query_params
                .entry(key.into_owned())
                .or_default()
                .push(value.into_owned());
        }

        Ok(ResolvedRoute {
            method: method.clone(),
            path_template: entry.template,
            path_item: entry.item,
            operation,
            parameters,
            path_params,
            query_params,
        })
    }

    fn check_path_value(&self, name: &str, value: &str, schema: &Value) -> OapiResult<()> {
        let hint_source = dereference_schema(schema, self.doc);
        let instance = coerce_parameter(value, schema_type_hint(hint_source));
        let validator = compile_schema(schema, self.doc)?;
        let violations = schema_violations(&validator, &instance);
        if violations.is_empty() {
            return Ok(());
        }
        Err(RoutingError::InvalidPathParameter {
            name: name.to_string(),
            value: value.to_string(),
            reason: violations.join("; "),
        }
        .into())
    }
}

fn server_prefix(resolved: &str) -> OapiResult<ServerPrefix> {
    let (origin, url) = if resolved.contains("://") {
        let url = Url::parse(resolved)?;
        (Some(url.origin()), url)
    } else {
        (None, Url::parse(PLACEHOLDER_ORIGIN)?.join(resolved)?)
    };

    Ok(ServerPrefix {
        origin,
        path: url.path().trim_end_matches('/').to_string(),
    })
}

/// Resolves `raw` into an absolute URL, anchoring relative input at [`PLACEHOLDER_ORIGIN`].
pub fn parse_route_url(raw: &str) -> OapiResult<Url> {
    match Url::parse(raw) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            Ok(Url::parse(PLACEHOLDER_ORIGIN)?.join(raw)?)
        }
        Err(e) => Err(OapiError::Url(e)),
    }
}

fn decode(value: &str) -> String {
    percent_decode_str(value).decode_utf8_lossy().into_owned()
}

/// Converts a raw path value into the JSON type its schema expects.
///
/// Values that do not parse stay strings so the schema reports the mismatch.
pub(crate) fn coerce_parameter(value: &str, type_hint: Option<&str>) -> Value {
    let fallback = || Value::String(value.to_string());
    match type_hint {
        Some("integer") => value.parse::<i64>().map(Value::from).unwrap_or_else(|_| fallback()),
        Some("number") => value
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(fallback),
        Some("boolean") => match value {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => fallback(),
        },
        _ => fallback(),
    }
}
