//! The two-pass FSH importer
//!
//! `import` turns a batch of raw sources into typed document IRs:
//!
//! 1. every source is lexed and parsed into a lossless CST (parse errors
//!    become diagnostics, never panics),
//! 2. the preprocessor registers every declared name and id with its
//!    canonical URL in a shared symbol table,
//! 3. the visitor walks each tree and builds the document IR, resolving
//!    symbolic references against the symbol table first and the external
//!    definition provider second.
//!
//! The importer carries no state between calls; the symbol table lives
//! only for the duration of one `import`.

mod preprocessor;
mod resolver;
pub mod text;
mod visitor;

pub use preprocessor::{ResolveKind, SymbolSpace};
pub use resolver::Resolver;

use preprocessor::preprocess;

use std::path::PathBuf;

use tracing::{debug, error, info, warn};

use crate::config::ProjectConfig;
use crate::cst::ast::{AstNode, Document};
use crate::cst::{FshSyntaxNode, FshSyntaxNodeExt, parse_fsh};
use crate::defs::DefinitionProvider;
use crate::diagnostics::{
    DefaultDiagnosticCollector, Diagnostic, DiagnosticCollector, Location, Severity, SourceMap,
};
use crate::ir::FshDocument;

/// One raw source to import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInput {
    /// Originating file path, when known
    pub path: Option<PathBuf>,
    pub content: String,
}

impl RawInput {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            content: content.into(),
        }
    }

    pub fn anonymous(content: impl Into<String>) -> Self {
        Self {
            path: None,
            content: content.into(),
        }
    }
}

/// Result of one import call
#[derive(Debug)]
pub struct ImportOutcome {
    /// One document IR per input, in input order
    pub documents: Vec<FshDocument>,
    /// Every diagnostic produced across all phases
    pub diagnostics: Vec<Diagnostic>,
}

impl ImportOutcome {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

/// A parsed source shared by the preprocessor and visitor passes
pub(crate) struct ParsedSource {
    pub path: PathBuf,
    pub source: String,
    pub map: SourceMap,
    pub document: Document,
}

impl ParsedSource {
    /// Location of a node's trivia-free extent
    pub fn node_location(&self, node: &FshSyntaxNode) -> Location {
        let span = node.trimmed_range().unwrap_or_else(|| {
            let range = node.text_range();
            usize::from(range.start())..usize::from(range.end())
        });
        self.map.span_to_location(&span, &self.source, &self.path)
    }

    /// First line of a node's text, for terse diagnostics
    pub fn node_text_first_line(&self, node: &FshSyntaxNode) -> String {
        let text = node.text().to_string();
        text.trim().lines().next().unwrap_or("").trim().to_string()
    }
}

/// The FSH importer
///
/// Holds only borrowed configuration and definitions; no parser state
/// survives between `import` calls.
pub struct Importer<'a> {
    config: &'a ProjectConfig,
    defs: &'a dyn DefinitionProvider,
}

impl<'a> Importer<'a> {
    pub fn new(config: &'a ProjectConfig, defs: &'a dyn DefinitionProvider) -> Self {
        Self { config, defs }
    }

    /// Import a batch of raw sources into document IRs
    pub fn import(&self, inputs: &[RawInput]) -> ImportOutcome {
        let mut collector = DefaultDiagnosticCollector::new();

        info!(inputs = inputs.len(), "importing FSH sources");

        // Parse every document up front; both passes share the trees
        let mut sources = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            let path = input
                .path
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("input-{index}.fsh")));
            sources.push(parse_source(path, &input.content, &mut collector));
        }

        // Pass 1: register declared names with their canonical URLs
        let symbols = preprocess(&sources, self.config, &mut collector);

        // Pass 2: build the document IRs against the shared table
        let resolver = Resolver::new(&symbols, self.defs);
        let documents: Vec<FshDocument> = sources
            .iter()
            .map(|source| visitor::visit_document(source, &resolver, &mut collector))
            .collect();

        let diagnostics = collector.into_diagnostics();
        for diagnostic in &diagnostics {
            match diagnostic.severity {
                Severity::Error => error!(location = %diagnostic.location, "{}", diagnostic.message),
                Severity::Warning => warn!(location = %diagnostic.location, "{}", diagnostic.message),
                Severity::Info => info!(location = %diagnostic.location, "{}", diagnostic.message),
            }
        }

        debug!(
            documents = documents.len(),
            diagnostics = diagnostics.len(),
            "import complete"
        );

        ImportOutcome {
            documents,
            diagnostics,
        }
    }
}

/// Parse one input, converting lexer and parser errors into diagnostics
fn parse_source(
    path: PathBuf,
    content: &str,
    collector: &mut dyn DiagnosticCollector,
) -> ParsedSource {
    let (cst, lex_errors, parse_errors) = parse_fsh(content);
    let map = SourceMap::new(content);

    for error in lex_errors {
        let location = map.span_to_location(&error.span, content, &path);
        collector.collect(
            Diagnostic::error(error.message, location).with_source("lexer"),
        );
    }
    for error in parse_errors {
        let location = map.span_to_location(&error.span, content, &path);
        collector.collect(
            Diagnostic::error(error.message, location).with_source("parser"),
        );
    }

    let document = Document::cast(cst).expect("parser always produces a document root");

    ParsedSource {
        path,
        source: content.to_string(),
        map,
        document,
    }
}
