//! Type aliases and utilities for FSH CST nodes
//!
//! Thin wrappers over Rowan's generic tree types parameterized with
//! [`FshLanguage`].

use super::{FshLanguage, FshSyntaxKind};

/// A node in the FSH concrete syntax tree
///
/// Provides child/parent navigation, lossless text reconstruction, and
/// syntax-kind queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct FshSyntaxNode(rowan::SyntaxNode<FshLanguage>);

impl FshSyntaxNode {
    pub fn new_root(green: rowan::GreenNode) -> Self {
        Self(rowan::SyntaxNode::new_root(green))
    }

    pub fn parent(&self) -> Option<FshSyntaxNode> {
        self.0.parent().map(FshSyntaxNode::from)
    }

    pub fn children(&self) -> impl Iterator<Item = FshSyntaxNode> + '_ {
        self.0.children().map(FshSyntaxNode::from)
    }

    pub fn first_child(&self) -> Option<FshSyntaxNode> {
        self.0.first_child().map(FshSyntaxNode::from)
    }

    pub fn next_sibling(&self) -> Option<FshSyntaxNode> {
        self.0.next_sibling().map(FshSyntaxNode::from)
    }

    pub fn prev_sibling(&self) -> Option<FshSyntaxNode> {
        self.0.prev_sibling().map(FshSyntaxNode::from)
    }

    pub fn descendants(&self) -> impl Iterator<Item = FshSyntaxNode> + '_ {
        self.0.descendants().map(FshSyntaxNode::from)
    }

    pub fn kind(&self) -> FshSyntaxKind {
        self.0.kind()
    }

    pub fn text_range(&self) -> TextRange {
        self.0.text_range()
    }

    pub fn text(&self) -> rowan::SyntaxText {
        self.0.text()
    }

    pub fn children_with_tokens(&self) -> rowan::SyntaxElementChildren<FshLanguage> {
        self.0.children_with_tokens()
    }

    pub fn descendants_with_tokens(&self) -> impl Iterator<Item = FshSyntaxElement> + '_ {
        self.0.descendants_with_tokens()
    }
}

impl From<rowan::SyntaxNode<FshLanguage>> for FshSyntaxNode {
    fn from(node: rowan::SyntaxNode<FshLanguage>) -> Self {
        Self(node)
    }
}

impl AsRef<rowan::SyntaxNode<FshLanguage>> for FshSyntaxNode {
    fn as_ref(&self) -> &rowan::SyntaxNode<FshLanguage> {
        &self.0
    }
}

/// A token in the FSH concrete syntax tree
///
/// Tokens are the leaves of the tree and carry actual source text.
pub type FshSyntaxToken = rowan::SyntaxToken<FshLanguage>;

/// Either a node or a token in the CST
pub type FshSyntaxElement = rowan::SyntaxElement<FshLanguage>;

pub use rowan::{NodeOrToken, TextRange, TextSize};

/// Extension trait for FshSyntaxNode with FSH-specific helpers
pub trait FshSyntaxNodeExt {
    /// Find the first child node of a specific kind
    fn child_of_kind(&self, kind: FshSyntaxKind) -> Option<FshSyntaxNode>;

    /// Find all child nodes of a specific kind
    fn children_of_kind(&self, kind: FshSyntaxKind) -> Vec<FshSyntaxNode>;

    /// Find the first child token of a specific kind
    fn token_of_kind(&self, kind: FshSyntaxKind) -> Option<FshSyntaxToken>;

    /// Trivia-free byte range of this node: from the start of its first
    /// non-trivia token to the end of its last non-trivia token
    fn trimmed_range(&self) -> Option<std::ops::Range<usize>>;
}

impl FshSyntaxNodeExt for FshSyntaxNode {
    fn child_of_kind(&self, kind: FshSyntaxKind) -> Option<FshSyntaxNode> {
        self.children().find(|child| child.kind() == kind)
    }

    fn children_of_kind(&self, kind: FshSyntaxKind) -> Vec<FshSyntaxNode> {
        self.children()
            .filter(|child| child.kind() == kind)
            .collect()
    }

    fn token_of_kind(&self, kind: FshSyntaxKind) -> Option<FshSyntaxToken> {
        self.children_with_tokens()
            .filter_map(|element| element.into_token())
            .find(|token| token.kind() == kind)
    }

    fn trimmed_range(&self) -> Option<std::ops::Range<usize>> {
        let mut start: Option<usize> = None;
        let mut end: Option<usize> = None;

        for element in self.descendants_with_tokens() {
            if let Some(token) = element.as_token() {
                if token.kind().is_trivia() || token.kind() == FshSyntaxKind::Eof {
                    continue;
                }
                let range = token.text_range();
                if start.is_none() {
                    start = Some(usize::from(range.start()));
                }
                end = Some(usize::from(range.end()));
            }
        }

        match (start, end) {
            (Some(s), Some(e)) => Some(s..e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowan::GreenNodeBuilder;

    fn build_test_tree() -> FshSyntaxNode {
        let mut builder = GreenNodeBuilder::new();

        builder.start_node(FshSyntaxKind::Profile.into());
        builder.token(FshSyntaxKind::ProfileKw.into(), "Profile");
        builder.token(FshSyntaxKind::Colon.into(), ":");
        builder.token(FshSyntaxKind::Whitespace.into(), " ");
        builder.token(FshSyntaxKind::Ident.into(), "MyPatient");
        builder.finish_node();

        FshSyntaxNode::new_root(builder.finish())
    }

    #[test]
    fn test_node_kind() {
        let tree = build_test_tree();
        assert_eq!(tree.kind(), FshSyntaxKind::Profile);
    }

    #[test]
    fn test_token_extraction() {
        let tree = build_test_tree();

        let ident = tree.token_of_kind(FshSyntaxKind::Ident);
        assert!(ident.is_some());
        assert_eq!(ident.unwrap().text(), "MyPatient");
    }

    #[test]
    fn test_text_reconstruction() {
        let tree = build_test_tree();
        assert_eq!(tree.text().to_string(), "Profile: MyPatient");
    }

    #[test]
    fn test_trimmed_range_skips_trivia() {
        let mut builder = GreenNodeBuilder::new();
        builder.start_node(FshSyntaxKind::Profile.into());
        builder.token(FshSyntaxKind::Whitespace.into(), "  ");
        builder.token(FshSyntaxKind::Ident.into(), "X");
        builder.token(FshSyntaxKind::Newline.into(), "\n");
        builder.finish_node();

        let tree = FshSyntaxNode::new_root(builder.finish());
        assert_eq!(tree.trimmed_range(), Some(2..3));
    }
}
