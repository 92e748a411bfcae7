//! Concrete Syntax Tree (CST) for FHIR Shorthand
//!
//! A lossless syntax tree built on the Rowan library. The CST preserves
//! all source information including whitespace and comments, which keeps
//! source locations exact for diagnostics and lets tests assert
//! `parse(source).text() == source`.
//!
//! ## Architecture
//!
//! Rowan's green/red tree pattern:
//!
//! - **Green tree**: immutable, position-independent storage; identical
//!   subtrees are deduplicated and clones are cheap.
//! - **Red tree**: on-demand view with parent pointers, wrapped by the
//!   typed AST layer in [`ast`].

mod builder;
mod language;
mod lexer;
mod nodes;
mod parser;
mod syntax_kind;

pub mod ast;

pub use builder::CstBuilder;
pub use language::FshLanguage;
pub use lexer::{CstLexResult, CstSpan, CstToken, LexerError, lex_with_trivia};
pub use nodes::{FshSyntaxElement, FshSyntaxNode, FshSyntaxNodeExt, FshSyntaxToken};
pub use parser::{SyntaxError, parse_fsh};
pub use syntax_kind::FshSyntaxKind;
