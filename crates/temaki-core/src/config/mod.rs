//! Project configuration (sushi-config.yaml)
//!
//! The importer only consumes the `canonical` URL prefix, but the loader
//! accepts the usual IG metadata fields so real project configurations
//! parse without modification.
//!
//! ## Example Configuration
//!
//! ```yaml
//! canonical: http://example.org/fhir/example-ig
//! name: ExampleIG
//! id: example.fhir.ig
//! version: 1.0.0
//! fhirVersion: 4.0.1
//! status: draft
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::TemakiError;
use crate::result::Result;

/// Project configuration supplying the canonical URL prefix used when
/// synthesising entity URLs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    /// Canonical URL for the project (required)
    pub canonical: String,

    /// Unique identifier for the project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Computer-friendly name (PascalCase recommended)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Human-friendly title
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Version string (semver recommended)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Target FHIR version
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fhir_version: Option<String>,

    /// Publication status (draft | active | retired | unknown)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ProjectConfig {
    /// Create a configuration carrying only the canonical URL
    pub fn with_canonical(canonical: impl Into<String>) -> Self {
        Self {
            canonical: canonical.into(),
            id: None,
            name: None,
            title: None,
            version: None,
            fhir_version: None,
            status: None,
        }
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| TemakiError::config_error(format!("invalid configuration: {e}")))
    }

    /// Load configuration from a YAML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| TemakiError::io_error(path, e))?;
        Self::from_yaml(&content)
    }

    /// Validate the configuration, collecting human-readable field errors
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.canonical.is_empty() {
            errors.push("canonical is required".to_string());
        } else if !self.canonical.starts_with("http://") && !self.canonical.starts_with("https://")
        {
            errors.push(format!(
                "canonical must be a valid URL: {}",
                self.canonical
            ));
        }

        errors
    }

    /// Canonical prefix with any trailing slash removed
    pub fn canonical_base(&self) -> &str {
        self.canonical.trim_end_matches('/')
    }
}
