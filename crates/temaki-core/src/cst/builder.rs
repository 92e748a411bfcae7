//! Green-tree builder for the FSH CST

use rowan::GreenNodeBuilder;

use super::lexer::CstToken;
use super::{FshSyntaxKind, FshSyntaxNode};

/// Builder assembling a Rowan green tree from parser events
///
/// A thin wrapper over `rowan::GreenNodeBuilder` that accepts our
/// [`CstToken`]s directly, so the parser can forward lexed tokens without
/// re-stating their kinds.
pub struct CstBuilder {
    inner: GreenNodeBuilder<'static>,
}

impl CstBuilder {
    pub fn new() -> Self {
        Self {
            inner: GreenNodeBuilder::new(),
        }
    }

    /// Open a new node of the given kind
    pub fn start_node(&mut self, kind: FshSyntaxKind) {
        self.inner.start_node(kind.into());
    }

    /// Close the most recently opened node
    pub fn finish_node(&mut self) {
        self.inner.finish_node();
    }

    /// Emit a token with explicit kind and text
    pub fn token(&mut self, kind: FshSyntaxKind, text: &str) {
        self.inner.token(kind.into(), text);
    }

    /// Emit a lexed token verbatim
    pub fn add_token(&mut self, token: &CstToken) {
        self.inner.token(token.kind.into(), &token.text);
    }

    /// Finish building and return the root syntax node
    pub fn finish(self) -> FshSyntaxNode {
        FshSyntaxNode::new_root(self.inner.finish())
    }
}

impl Default for CstBuilder {
    fn default() -> Self {
        Self::new()
    }
}
