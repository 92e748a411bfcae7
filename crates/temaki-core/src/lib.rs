//! Temaki Core
//!
//! Importer core for FHIR Shorthand (FSH): a two-pass pipeline that parses
//! raw FSH sources into lossless syntax trees, registers every declared
//! entity with its canonical URL, and produces a strongly-typed,
//! location-annotated document IR with all symbolic cross-references
//! normalised against local declarations and an external definition
//! provider.

pub mod config;
pub mod cst; // Concrete Syntax Tree (lossless, Rowan-based)
pub mod defs;
pub mod diagnostics;
pub mod error;
pub mod import;
pub mod ir;
pub mod result;

// Re-export commonly used types
pub use config::ProjectConfig;
pub use cst::{
    CstToken, FshLanguage, FshSyntaxKind, FshSyntaxNode, FshSyntaxToken, LexerError, SyntaxError,
    parse_fsh,
};
pub use defs::{DefinitionProvider, DefinitionRecord, EmptyDefinitions, InMemoryDefinitions};
pub use diagnostics::{
    DefaultDiagnosticCollector, Diagnostic, DiagnosticCollector, Location, Severity, SourceMap,
    format_json,
};
pub use error::{ErrorKind, TemakiError};
pub use import::{ImportOutcome, Importer, RawInput, ResolveKind, Resolver, SymbolSpace};
pub use ir::{
    BindingStrength, FshCode, FshDocument, FshInstance, FshQuantity, FshRatio, FshReference,
    FshValue, FshValueSet, SdRule, StructureDef, VsComponent, VsFilter, VsFilterValue, VsFrom,
    VsOperator,
};
pub use result::Result;

/// Initialize the tracing subscriber for logging
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("temaki=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(true)
                .with_line_number(true),
        )
        .init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
