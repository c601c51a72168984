#![deny(missing_docs)]

//! # Tester Configuration
//!
//! Behavioural switches for `OapiTester`, loadable from YAML or JSON.
//!
//! ```yaml
//! revalidate_each_call: false
//! response_content_type: application/problem+json
//! validate_response_headers: true
//! ```

use crate::conformance::ConformanceOptions;
use crate::error::{OapiError, OapiResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default content type used to look up declared response media types.
pub const DEFAULT_RESPONSE_CONTENT_TYPE: &str = "application/json";

/// Settings applied to every `validate_api` call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct TesterConfig {
    /// Re-run structural document validation on every call.
    /// When false the outcome is cached until the document is borrowed mutably.
    pub revalidate_each_call: bool,
    /// Content type used to select the declared response media type.
    pub response_content_type: String,
    /// Check declared response headers (presence and scalar type).
    pub validate_response_headers: bool,
    /// Skip content-level validation of response bodies.
    pub exclude_response_body: bool,
}

impl Default for TesterConfig {
    fn default() -> Self {
        Self {
            revalidate_each_call: true,
            response_content_type: DEFAULT_RESPONSE_CONTENT_TYPE.to_string(),
            validate_response_headers: false,
            exclude_response_body: false,
        }
    }
}

impl TesterConfig {
    /// Parses a YAML (or JSON) configuration; missing fields take their defaults.
    pub fn from_yaml_str(content: &str) -> OapiResult<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| OapiError::Config(format!("Failed to parse tester config: {}", e)))
    }

    /// Reads and parses a configuration file.
    pub fn from_path(path: impl AsRef<Path>) -> OapiResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            OapiError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    /// Conformance options for one request.
    pub(crate) fn conformance_options(&self, skip_status: bool) -> ConformanceOptions<'_> {
        ConformanceOptions {
            content_type: &self.response_content_type,
            validate_headers: self.validate_response_headers,
            exclude_body: self.exclude_response_body,
            skip_status,
        }
    }
}
