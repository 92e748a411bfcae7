//! First import pass: symbol registration
//!
//! Walks every parse tree and records each declared name (and id) with its
//! synthesised canonical URL, partitioned by entity kind plus one global
//! cross-kind table. The resulting [`SymbolSpace`] is shared read-only by
//! the visitor pass and dropped when the import call returns.

use std::collections::HashMap;

use tracing::debug;

use crate::config::ProjectConfig;
use crate::cst::ast::{AstNode, MetadataClause};
use crate::diagnostics::{Diagnostic, DiagnosticCollector, Location};

use super::ParsedSource;

/// The kinds a symbolic reference can be resolved against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolveKind {
    Alias,
    Profile,
    Extension,
    Instance,
    ValueSet,
    CodeSystem,
    Resource,
    Type,
}

/// Symbol table built by the preprocessor
///
/// Maps `(kind, symbol) -> URL` with an additional global `symbol -> URL`
/// table for unconstrained lookups. Conflicting re-registration keeps the
/// first URL; identical re-registration is idempotent.
#[derive(Debug, Default)]
pub struct SymbolSpace {
    by_kind: HashMap<ResolveKind, HashMap<String, String>>,
    global: HashMap<String, String>,
}

impl SymbolSpace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a symbol under a kind, reporting conflicts
    pub fn register(
        &mut self,
        kind: ResolveKind,
        symbol: &str,
        url: &str,
        location: &Location,
        collector: &mut dyn DiagnosticCollector,
    ) {
        let mut conflict = false;

        let kind_table = self.by_kind.entry(kind).or_default();
        match kind_table.get(symbol) {
            Some(existing) if existing != url => {
                conflict = true;
                collector.collect(
                    Diagnostic::error(
                        format!(
                            "Symbol '{symbol}' already registered as {existing}, ignoring {url}."
                        ),
                        location.clone(),
                    )
                    .with_source("preprocessor"),
                );
            }
            Some(_) => {}
            None => {
                kind_table.insert(symbol.to_string(), url.to_string());
            }
        }

        match self.global.get(symbol) {
            Some(existing) if existing != url => {
                if !conflict {
                    collector.collect(
                        Diagnostic::error(
                            format!(
                                "Symbol '{symbol}' already registered as {existing}, ignoring {url}."
                            ),
                            location.clone(),
                        )
                        .with_source("preprocessor"),
                    );
                }
            }
            Some(_) => {}
            None => {
                self.global.insert(symbol.to_string(), url.to_string());
            }
        }
    }

    /// Per-kind lookup
    pub fn lookup(&self, kind: ResolveKind, symbol: &str) -> Option<&str> {
        self.by_kind
            .get(&kind)
            .and_then(|table| table.get(symbol))
            .map(String::as_str)
    }

    /// Cross-kind lookup
    pub fn lookup_global(&self, symbol: &str) -> Option<&str> {
        self.global.get(symbol).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.global.len()
    }

    pub fn is_empty(&self) -> bool {
        self.global.is_empty()
    }
}

/// Run the preprocessing pass over all parsed sources
pub(crate) fn preprocess(
    sources: &[ParsedSource],
    config: &ProjectConfig,
    collector: &mut dyn DiagnosticCollector,
) -> SymbolSpace {
    let mut symbols = SymbolSpace::new();
    let canonical = config.canonical_base();

    for source in sources {
        let doc = &source.document;

        for alias in doc.aliases() {
            let (Some(name), Some(url)) = (alias.name(), alias.value()) else {
                continue;
            };
            let location = source.node_location(alias.syntax());
            symbols.register(ResolveKind::Alias, &name, &url, &location, collector);
        }

        for profile in doc.profiles() {
            let Some(name) = profile.name() else { continue };
            let id = declared_id(profile.clauses());
            let location = source.node_location(profile.syntax());
            register_structure_def(
                &mut symbols,
                ResolveKind::Profile,
                canonical,
                &name,
                id.as_deref(),
                &location,
                collector,
            );
        }

        for extension in doc.extensions() {
            let Some(name) = extension.name() else { continue };
            let id = declared_id(extension.clauses());
            let location = source.node_location(extension.syntax());
            register_structure_def(
                &mut symbols,
                ResolveKind::Extension,
                canonical,
                &name,
                id.as_deref(),
                &location,
                collector,
            );
        }

        for value_set in doc.value_sets() {
            let Some(name) = value_set.name() else { continue };
            let id = declared_id(value_set.clauses());
            let location = source.node_location(value_set.syntax());
            let slug = id.as_deref().unwrap_or(&name);
            let url = format!("{canonical}/ValueSet/{slug}");
            symbols.register(ResolveKind::ValueSet, &name, &url, &location, collector);
            if let Some(id) = id.as_deref() {
                if id != name {
                    symbols.register(ResolveKind::ValueSet, id, &url, &location, collector);
                }
            }
        }

        // Instances and code systems are deliberately not registered:
        // references against those kinds resolve through the external
        // provider or pass through verbatim.
    }

    debug!(symbols = symbols.len(), "preprocessing complete");
    symbols
}

/// URL synthesis and dual name/id registration for profiles and extensions
fn register_structure_def(
    symbols: &mut SymbolSpace,
    kind: ResolveKind,
    canonical: &str,
    name: &str,
    id: Option<&str>,
    location: &Location,
    collector: &mut dyn DiagnosticCollector,
) {
    let slug = id.unwrap_or(name);
    let url = format!("{canonical}/StructureDefinition/{slug}");
    symbols.register(kind, name, &url, location, collector);
    if let Some(id) = id {
        if id != name {
            symbols.register(kind, id, &url, location, collector);
        }
    }
}

/// First Id clause value among an entity's metadata, if any
fn declared_id(clauses: impl Iterator<Item = MetadataClause>) -> Option<String> {
    clauses.into_iter().find_map(|clause| match clause {
        MetadataClause::Id(id) => id.value(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DefaultDiagnosticCollector;

    fn register(
        symbols: &mut SymbolSpace,
        collector: &mut DefaultDiagnosticCollector,
        kind: ResolveKind,
        symbol: &str,
        url: &str,
    ) {
        symbols.register(kind, symbol, url, &Location::default(), collector);
    }

    #[test]
    fn test_register_and_lookup() {
        let mut symbols = SymbolSpace::new();
        let mut collector = DefaultDiagnosticCollector::new();

        register(
            &mut symbols,
            &mut collector,
            ResolveKind::Profile,
            "MyProfile",
            "http://ex.org/StructureDefinition/my-profile",
        );

        assert_eq!(
            symbols.lookup(ResolveKind::Profile, "MyProfile"),
            Some("http://ex.org/StructureDefinition/my-profile")
        );
        assert_eq!(
            symbols.lookup_global("MyProfile"),
            Some("http://ex.org/StructureDefinition/my-profile")
        );
        assert!(symbols.lookup(ResolveKind::ValueSet, "MyProfile").is_none());
        assert!(!collector.has_errors());
    }

    #[test]
    fn test_identical_reregistration_is_idempotent() {
        let mut symbols = SymbolSpace::new();
        let mut collector = DefaultDiagnosticCollector::new();

        register(&mut symbols, &mut collector, ResolveKind::Alias, "X", "http://x");
        register(&mut symbols, &mut collector, ResolveKind::Alias, "X", "http://x");

        assert!(!collector.has_errors());
        assert_eq!(symbols.lookup(ResolveKind::Alias, "X"), Some("http://x"));
    }

    #[test]
    fn test_conflict_keeps_first_and_reports() {
        let mut symbols = SymbolSpace::new();
        let mut collector = DefaultDiagnosticCollector::new();

        register(&mut symbols, &mut collector, ResolveKind::Alias, "X", "http://first");
        register(&mut symbols, &mut collector, ResolveKind::Alias, "X", "http://second");

        assert!(collector.has_errors());
        assert_eq!(collector.diagnostics().len(), 1);
        assert_eq!(symbols.lookup(ResolveKind::Alias, "X"), Some("http://first"));
        assert_eq!(symbols.lookup_global("X"), Some("http://first"));
    }

    #[test]
    fn test_cross_kind_conflict_reports_once() {
        let mut symbols = SymbolSpace::new();
        let mut collector = DefaultDiagnosticCollector::new();

        register(
            &mut symbols,
            &mut collector,
            ResolveKind::Profile,
            "X",
            "http://ex.org/StructureDefinition/X",
        );
        register(
            &mut symbols,
            &mut collector,
            ResolveKind::ValueSet,
            "X",
            "http://ex.org/ValueSet/X",
        );

        assert_eq!(collector.diagnostics().len(), 1);
        // Each kind keeps its own registration; the global table keeps the first
        assert_eq!(
            symbols.lookup(ResolveKind::ValueSet, "X"),
            Some("http://ex.org/ValueSet/X")
        );
        assert_eq!(
            symbols.lookup_global("X"),
            Some("http://ex.org/StructureDefinition/X")
        );
    }
}
