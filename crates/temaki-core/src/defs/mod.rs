//! External FHIR definition lookups
//!
//! The importer resolves symbolic references first against locally declared
//! entities, then against an external, read-only index of FHIR definitions
//! supplied by the caller. [`DefinitionProvider`] is that lookup surface:
//! one generic `find` plus one finder per definition kind, each returning
//! at most one record.
//!
//! The importer is synchronous end to end, so the surface is synchronous;
//! providers backed by remote package caches are expected to have loaded
//! their indexes up front.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single external definition record
///
/// Only the canonical URL participates in resolution; name and id are
/// carried for logging and debugging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionRecord {
    /// Canonical URL of the definition, when known
    pub url: Option<String>,
    /// Resource name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Resource id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl DefinitionRecord {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            name: None,
            id: None,
        }
    }
}

/// Read-only index of externally supplied FHIR definitions
///
/// Implementations must be thread-safe; the importer may consult the
/// provider from parallel visitor passes.
pub trait DefinitionProvider: Send + Sync {
    /// Unconstrained lookup across every definition kind
    fn find(&self, symbol: &str) -> Option<DefinitionRecord>;

    /// Base resource types (Patient, Observation, ...)
    fn find_resource(&self, symbol: &str) -> Option<DefinitionRecord>;

    /// Data types (Quantity, CodeableConcept, ...)
    fn find_type(&self, symbol: &str) -> Option<DefinitionRecord>;

    /// Profiles (constraining StructureDefinitions)
    fn find_profile(&self, symbol: &str) -> Option<DefinitionRecord>;

    /// Extensions
    fn find_extension(&self, symbol: &str) -> Option<DefinitionRecord>;

    /// Value sets
    fn find_value_set(&self, symbol: &str) -> Option<DefinitionRecord>;

    /// Code systems
    fn find_code_system(&self, symbol: &str) -> Option<DefinitionRecord>;
}

/// A provider with no definitions at all
///
/// Useful when importing documents that only reference local entities.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyDefinitions;

impl DefinitionProvider for EmptyDefinitions {
    fn find(&self, _symbol: &str) -> Option<DefinitionRecord> {
        None
    }

    fn find_resource(&self, _symbol: &str) -> Option<DefinitionRecord> {
        None
    }

    fn find_type(&self, _symbol: &str) -> Option<DefinitionRecord> {
        None
    }

    fn find_profile(&self, _symbol: &str) -> Option<DefinitionRecord> {
        None
    }

    fn find_extension(&self, _symbol: &str) -> Option<DefinitionRecord> {
        None
    }

    fn find_value_set(&self, _symbol: &str) -> Option<DefinitionRecord> {
        None
    }

    fn find_code_system(&self, _symbol: &str) -> Option<DefinitionRecord> {
        None
    }
}

/// In-memory definition index keyed by symbol
///
/// Primarily used by tests; mirrors the per-kind partitioning of the
/// lookup surface. The generic `find` scans kinds in a fixed order:
/// resources, types, profiles, extensions, value sets, code systems.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDefinitions {
    resources: HashMap<String, DefinitionRecord>,
    types: HashMap<String, DefinitionRecord>,
    profiles: HashMap<String, DefinitionRecord>,
    extensions: HashMap<String, DefinitionRecord>,
    value_sets: HashMap<String, DefinitionRecord>,
    code_systems: HashMap<String, DefinitionRecord>,
}

impl InMemoryDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource(&mut self, symbol: impl Into<String>, url: impl Into<String>) -> &mut Self {
        self.resources
            .insert(symbol.into(), DefinitionRecord::with_url(url));
        self
    }

    pub fn add_type(&mut self, symbol: impl Into<String>, url: impl Into<String>) -> &mut Self {
        self.types
            .insert(symbol.into(), DefinitionRecord::with_url(url));
        self
    }

    pub fn add_profile(&mut self, symbol: impl Into<String>, url: impl Into<String>) -> &mut Self {
        self.profiles
            .insert(symbol.into(), DefinitionRecord::with_url(url));
        self
    }

    pub fn add_extension(
        &mut self,
        symbol: impl Into<String>,
        url: impl Into<String>,
    ) -> &mut Self {
        self.extensions
            .insert(symbol.into(), DefinitionRecord::with_url(url));
        self
    }

    pub fn add_value_set(
        &mut self,
        symbol: impl Into<String>,
        url: impl Into<String>,
    ) -> &mut Self {
        self.value_sets
            .insert(symbol.into(), DefinitionRecord::with_url(url));
        self
    }

    pub fn add_code_system(
        &mut self,
        symbol: impl Into<String>,
        url: impl Into<String>,
    ) -> &mut Self {
        self.code_systems
            .insert(symbol.into(), DefinitionRecord::with_url(url));
        self
    }
}

impl DefinitionProvider for InMemoryDefinitions {
    fn find(&self, symbol: &str) -> Option<DefinitionRecord> {
        self.find_resource(symbol)
            .or_else(|| self.find_type(symbol))
            .or_else(|| self.find_profile(symbol))
            .or_else(|| self.find_extension(symbol))
            .or_else(|| self.find_value_set(symbol))
            .or_else(|| self.find_code_system(symbol))
    }

    fn find_resource(&self, symbol: &str) -> Option<DefinitionRecord> {
        self.resources.get(symbol).cloned()
    }

    fn find_type(&self, symbol: &str) -> Option<DefinitionRecord> {
        self.types.get(symbol).cloned()
    }

    fn find_profile(&self, symbol: &str) -> Option<DefinitionRecord> {
        self.profiles.get(symbol).cloned()
    }

    fn find_extension(&self, symbol: &str) -> Option<DefinitionRecord> {
        self.extensions.get(symbol).cloned()
    }

    fn find_value_set(&self, symbol: &str) -> Option<DefinitionRecord> {
        self.value_sets.get(symbol).cloned()
    }

    fn find_code_system(&self, symbol: &str) -> Option<DefinitionRecord> {
        self.code_systems.get(symbol).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_lookup() {
        let mut defs = InMemoryDefinitions::new();
        defs.add_resource("Patient", "http://hl7.org/fhir/StructureDefinition/Patient");

        let record = defs.find_resource("Patient").unwrap();
        assert_eq!(
            record.url.as_deref(),
            Some("http://hl7.org/fhir/StructureDefinition/Patient")
        );
        assert!(defs.find_resource("Observation").is_none());
    }

    #[test]
    fn test_generic_find_scans_kinds() {
        let mut defs = InMemoryDefinitions::new();
        defs.add_value_set("MyVS", "http://example.org/ValueSet/my-vs");

        assert!(defs.find("MyVS").is_some());
        assert!(defs.find_profile("MyVS").is_none());
    }

    #[test]
    fn test_empty_provider() {
        let defs = EmptyDefinitions;
        assert!(defs.find("anything").is_none());
    }
}
