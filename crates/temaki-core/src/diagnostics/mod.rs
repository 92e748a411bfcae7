//! Structured diagnostics for the importer
//!
//! Every failure surfaced by the import pipeline is a [`Diagnostic`] value
//! pushed into a [`DiagnosticCollector`]; no error ever crosses the public
//! API as a panic or exception. Diagnostics carry precise 1-based,
//! code-point-aware source positions produced through a [`SourceMap`].

mod types;

pub use types::{
    DefaultDiagnosticCollector, Diagnostic, DiagnosticCollector, Location, Severity, SourceMap,
    format_json,
};
