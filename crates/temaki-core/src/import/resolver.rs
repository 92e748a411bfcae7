//! Symbol resolution against local declarations and external definitions
//!
//! Local declarations always win over the external provider; unresolved
//! symbols pass through verbatim so downstream consumers can detect them.

use tracing::trace;

use crate::defs::{DefinitionProvider, DefinitionRecord};

use super::preprocessor::{ResolveKind, SymbolSpace};

/// Resolves symbolic references to canonical URLs
pub struct Resolver<'a> {
    symbols: &'a SymbolSpace,
    defs: &'a dyn DefinitionProvider,
}

impl<'a> Resolver<'a> {
    pub fn new(symbols: &'a SymbolSpace, defs: &'a dyn DefinitionProvider) -> Self {
        Self { symbols, defs }
    }

    /// Resolve `symbol` against the allowed kinds, in caller order
    ///
    /// 1. With no kind constraint: global table, then the provider's
    ///    generic `find`, then the symbol verbatim.
    /// 2. Per-kind local lookup in the caller-supplied order.
    /// 3. Per-kind external lookup in the same order, accepting the first
    ///    record with a non-empty URL. Aliases and instances are never
    ///    resolved externally.
    /// 4. The symbol verbatim.
    pub fn resolve(&self, symbol: &str, kinds: &[ResolveKind]) -> String {
        if kinds.is_empty() {
            if let Some(url) = self.symbols.lookup_global(symbol) {
                return url.to_string();
            }
            if let Some(url) = self.defs.find(symbol).and_then(record_url) {
                return url;
            }
            return symbol.to_string();
        }

        for &kind in kinds {
            if let Some(url) = self.symbols.lookup(kind, symbol) {
                trace!(symbol, ?kind, url, "resolved locally");
                return url.to_string();
            }
        }

        for &kind in kinds {
            if let Some(url) = self.find_external(kind, symbol).and_then(record_url) {
                trace!(symbol, ?kind, %url, "resolved externally");
                return url;
            }
        }

        trace!(symbol, "unresolved, passing through");
        symbol.to_string()
    }

    fn find_external(&self, kind: ResolveKind, symbol: &str) -> Option<DefinitionRecord> {
        match kind {
            // Aliases are purely local; external definitions do not carry
            // end-user instance examples
            ResolveKind::Alias | ResolveKind::Instance => None,
            ResolveKind::Profile => self.defs.find_profile(symbol),
            ResolveKind::Extension => self.defs.find_extension(symbol),
            ResolveKind::ValueSet => self.defs.find_value_set(symbol),
            ResolveKind::CodeSystem => self.defs.find_code_system(symbol),
            ResolveKind::Resource => self.defs.find_resource(symbol),
            ResolveKind::Type => self.defs.find_type(symbol),
        }
    }
}

fn record_url(record: DefinitionRecord) -> Option<String> {
    record.url.filter(|url| !url.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defs::InMemoryDefinitions;
    use crate::diagnostics::{DefaultDiagnosticCollector, Location};

    fn symbols_with(entries: &[(ResolveKind, &str, &str)]) -> SymbolSpace {
        let mut symbols = SymbolSpace::new();
        let mut collector = DefaultDiagnosticCollector::new();
        for (kind, symbol, url) in entries {
            symbols.register(*kind, symbol, url, &Location::default(), &mut collector);
        }
        symbols
    }

    #[test]
    fn test_local_lookup_in_kind_order() {
        let symbols = symbols_with(&[
            (ResolveKind::ValueSet, "X", "http://ex.org/ValueSet/X"),
            (ResolveKind::Profile, "X", "http://ex.org/StructureDefinition/X"),
        ]);
        let defs = InMemoryDefinitions::new();
        let resolver = Resolver::new(&symbols, &defs);

        assert_eq!(
            resolver.resolve("X", &[ResolveKind::Profile, ResolveKind::ValueSet]),
            "http://ex.org/StructureDefinition/X"
        );
        assert_eq!(
            resolver.resolve("X", &[ResolveKind::ValueSet, ResolveKind::Profile]),
            "http://ex.org/ValueSet/X"
        );
    }

    #[test]
    fn test_local_beats_external() {
        let symbols = symbols_with(&[(
            ResolveKind::Profile,
            "Shared",
            "http://local/StructureDefinition/Shared",
        )]);
        let mut defs = InMemoryDefinitions::new();
        defs.add_profile("Shared", "http://external/StructureDefinition/Shared");
        let resolver = Resolver::new(&symbols, &defs);

        assert_eq!(
            resolver.resolve("Shared", &[ResolveKind::Profile]),
            "http://local/StructureDefinition/Shared"
        );
    }

    #[test]
    fn test_external_fallback() {
        let symbols = SymbolSpace::new();
        let mut defs = InMemoryDefinitions::new();
        defs.add_resource("Patient", "http://hl7.org/fhir/StructureDefinition/Patient");
        let resolver = Resolver::new(&symbols, &defs);

        assert_eq!(
            resolver.resolve(
                "Patient",
                &[
                    ResolveKind::Alias,
                    ResolveKind::Profile,
                    ResolveKind::Extension,
                    ResolveKind::Resource,
                    ResolveKind::Type,
                ]
            ),
            "http://hl7.org/fhir/StructureDefinition/Patient"
        );
    }

    #[test]
    fn test_unresolved_passes_through() {
        let symbols = SymbolSpace::new();
        let defs = InMemoryDefinitions::new();
        let resolver = Resolver::new(&symbols, &defs);

        assert_eq!(
            resolver.resolve("Mystery", &[ResolveKind::Profile]),
            "Mystery"
        );
    }

    #[test]
    fn test_instances_never_resolve_externally() {
        let symbols = SymbolSpace::new();
        let mut defs = InMemoryDefinitions::new();
        defs.add_resource("Example", "http://external/Example");
        let resolver = Resolver::new(&symbols, &defs);

        // Instance kind dispatches to no external finder
        assert_eq!(resolver.resolve("Example", &[ResolveKind::Instance]), "Example");
    }

    #[test]
    fn test_empty_kinds_uses_global_then_generic_find() {
        let symbols = symbols_with(&[(ResolveKind::Profile, "Local", "http://local/sd/Local")]);
        let mut defs = InMemoryDefinitions::new();
        defs.add_value_set("External", "http://external/ValueSet/External");
        let resolver = Resolver::new(&symbols, &defs);

        assert_eq!(resolver.resolve("Local", &[]), "http://local/sd/Local");
        assert_eq!(
            resolver.resolve("External", &[]),
            "http://external/ValueSet/External"
        );
        assert_eq!(resolver.resolve("Nothing", &[]), "Nothing");
    }

    #[test]
    fn test_empty_external_url_is_skipped() {
        let symbols = SymbolSpace::new();

        #[derive(Debug)]
        struct EmptyUrlDefs;
        impl crate::defs::DefinitionProvider for EmptyUrlDefs {
            fn find(&self, _: &str) -> Option<crate::defs::DefinitionRecord> {
                None
            }
            fn find_resource(&self, _: &str) -> Option<crate::defs::DefinitionRecord> {
                Some(crate::defs::DefinitionRecord::default())
            }
            fn find_type(&self, _: &str) -> Option<crate::defs::DefinitionRecord> {
                None
            }
            fn find_profile(&self, _: &str) -> Option<crate::defs::DefinitionRecord> {
                None
            }
            fn find_extension(&self, _: &str) -> Option<crate::defs::DefinitionRecord> {
                None
            }
            fn find_value_set(&self, _: &str) -> Option<crate::defs::DefinitionRecord> {
                None
            }
            fn find_code_system(&self, _: &str) -> Option<crate::defs::DefinitionRecord> {
                None
            }
        }

        let defs = EmptyUrlDefs;
        let resolver = Resolver::new(&symbols, &defs);

        // A record without a URL does not count as a hit
        assert_eq!(resolver.resolve("X", &[ResolveKind::Resource]), "X");
    }
}
