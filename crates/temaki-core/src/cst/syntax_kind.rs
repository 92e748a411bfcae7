//! Syntax kind enumeration for the FSH CST
//!
//! This module defines all possible node and token types in the FSH syntax
//! tree: trivia, keywords, punctuation, literal token classes, and the
//! structural nodes produced by the parser.

use std::fmt;

/// Syntax kind for FSH language elements
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
pub enum FshSyntaxKind {
    // ==================
    // Trivia (0-9)
    // ==================
    /// Whitespace (spaces, tabs)
    Whitespace = 0,
    /// Line comment starting with //
    CommentLine = 1,
    /// Block comment /* ... */
    CommentBlock = 2,
    /// Newline character
    Newline = 3,

    // ==================
    // Keywords (10-69)
    // ==================

    // Entity keywords
    /// "Alias" keyword
    AliasKw = 10,
    /// "Profile" keyword
    ProfileKw = 11,
    /// "Extension" keyword
    ExtensionKw = 12,
    /// "Instance" keyword
    InstanceKw = 13,
    /// "ValueSet" keyword
    ValuesetKw = 14,

    // Metadata keywords
    /// "Parent" keyword
    ParentKw = 20,
    /// "Id" keyword
    IdKw = 21,
    /// "Title" keyword
    TitleKw = 22,
    /// "Description" keyword
    DescriptionKw = 23,
    /// "InstanceOf" keyword
    InstanceofKw = 24,

    // Rule keywords
    /// "from" keyword (binding)
    FromKw = 30,
    /// "only" keyword (type constraint)
    OnlyKw = 31,
    /// "contains" keyword (slicing)
    ContainsKw = 32,
    /// "and" keyword (in contains / from clauses)
    AndKw = 33,
    /// "or" keyword (in only)
    OrKw = 34,
    /// "named" keyword (in contains)
    NamedKw = 35,
    /// "include" keyword (ValueSet)
    IncludeKw = 36,
    /// "exclude" keyword (ValueSet)
    ExcludeKw = 37,
    /// "codes" keyword (ValueSet filter)
    CodesKw = 38,
    /// "where" keyword (ValueSet filter)
    WhereKw = 39,
    /// "system" keyword (ValueSet from clause)
    SystemKw = 40,
    /// "valueset" reference keyword (ValueSet from clause)
    ValuesetRefKw = 41,

    // Binding strength
    /// "required" binding strength
    RequiredKw = 50,
    /// "extensible" binding strength
    ExtensibleKw = 51,
    /// "preferred" binding strength
    PreferredKw = 52,
    /// "example" binding strength
    ExampleKw = 53,

    // Boolean
    /// Boolean true
    True = 60,
    /// Boolean false
    False = 61,

    // ==================
    // Flags (70-79)
    // ==================
    /// "MS" (Must Support) flag
    MsFlag = 70,
    /// "SU" (Summary) flag
    SuFlag = 71,
    /// "TU" (Trial Use) flag
    TuFlag = 72,
    /// "N" (Normative) flag
    NFlag = 73,
    /// "D" (Draft) flag
    DFlag = 74,
    /// "?!" (Modifier) flag
    ModifierFlag = 75,

    // ==================
    // Punctuation (100-149)
    // ==================
    /// Colon ":"
    Colon = 100,
    /// Equals "="
    Equals = 101,
    /// Asterisk "*" (rule prefix)
    Asterisk = 102,
    /// Comma ","
    Comma = 103,
    /// Left parenthesis "("
    LParen = 104,
    /// Right parenthesis ")"
    RParen = 105,

    // ==================
    // Literals & Identifiers (150-199)
    // ==================
    /// Identifier-like sequence (names, ids, paths, URLs)
    Ident = 150,
    /// String literal "..."
    String = 151,
    /// Multiline string literal """..."""
    MultilineString = 152,
    /// Numeric literal (integer or decimal)
    Number = 153,
    /// Date/time literal (YYYY[-MM[-DD[Thh:mm:ss...]]])
    DateTime = 154,
    /// Time literal (hh:mm:ss[.frac][zone])
    Time = 155,
    /// Cardinality literal (0..1, 1..*)
    Card = 156,
    /// Regex literal /pattern/
    Regex = 157,
    /// UCUM unit 'unit'
    Unit = 158,
    /// Code literal (SYSTEM#code or #code)
    Code = 159,
    /// Reference literal Reference(A|B|...)
    ReferenceLit = 160,
    /// Caret sequence ^path.to.attr
    CaretSequence = 161,
    /// Comma-delimited list of sequences (path1, path2)
    CommaDelimitedSequences = 162,
    /// Comma-delimited list of codes (#a "d1", #b)
    CommaDelimitedCodes = 163,

    // ==================
    // Structure Nodes (200-399)
    // ==================
    /// Complete FSH document
    Document = 200,

    // Entities
    /// Alias definition
    Alias = 210,
    /// Profile definition
    Profile = 211,
    /// Extension definition
    Extension = 212,
    /// Instance definition
    Instance = 213,
    /// ValueSet definition
    ValueSet = 214,

    // Metadata clauses
    /// Parent clause
    ParentClause = 230,
    /// Id clause
    IdClause = 231,
    /// Title clause
    TitleClause = 232,
    /// Description clause
    DescriptionClause = 233,
    /// InstanceOf clause
    InstanceofClause = 234,

    // Rules
    /// Cardinality rule: * path 0..1 MS?
    CardRule = 250,
    /// Flag rule: * path MS SU
    FlagRule = 251,
    /// ValueSet binding rule: * path from ValueSet (strength)
    ValuesetRule = 252,
    /// Fixed value rule: * path = value
    FixedValueRule = 253,
    /// Only rule: * path only Type or Reference(A|B)
    OnlyRule = 254,
    /// Contains rule: * path contains item 0..1 and item2 1..1
    ContainsRule = 255,
    /// Caret value rule: * path? ^attr = value
    CaretValueRule = 256,
    /// Bare path rule (unrecognised rule bodies land here)
    PathRule = 257,

    // Rule parts
    /// Path expression (single sequence token)
    Path = 270,
    /// Item inside a contains rule (name + card + flags)
    ContainsItem = 271,
    /// Quantity value (NUMBER UNIT)
    Quantity = 272,
    /// Ratio value (part : part)
    Ratio = 273,
    /// One side of a ratio (NUMBER or NUMBER UNIT)
    RatioPart = 274,

    // ValueSet components (300-319)
    /// ValueSet include/exclude component
    VsComponent = 300,
    /// Enumerated-concept component
    VsConceptComponent = 301,
    /// Filter component (codes from ... where ...)
    VsFilterComponent = 302,
    /// "from system X and valueset Y" clause
    VsComponentFrom = 303,
    /// "system X" part of a from clause
    VsFromSystem = 304,
    /// "valueset Y" part of a from clause
    VsFromValueset = 305,
    /// "where" filter list
    VsFilterList = 306,
    /// Single filter definition (property operator value?)
    VsFilterDefinition = 307,
    /// Filter operator
    VsFilterOperator = 308,
    /// Filter value
    VsFilterValue = 309,

    // ==================
    // Special tokens (400+)
    // ==================
    /// Error token (for recovery)
    Error = 400,
    /// End of file
    Eof = 401,
    /// Unknown/invalid kind
    Unknown = 402,

    /// Tombstone marker for deleted nodes
    Tombstone = 999,
}

impl FshSyntaxKind {
    /// Check if this is a trivia kind (whitespace, comments, newlines)
    pub const fn is_trivia(self) -> bool {
        matches!(
            self,
            Self::Whitespace | Self::CommentLine | Self::CommentBlock | Self::Newline
        )
    }

    /// Check if this is a keyword
    pub const fn is_keyword(self) -> bool {
        (self as u16) >= 10 && (self as u16) < 70
    }

    /// Check if this keyword opens an entity declaration
    pub const fn is_entity_keyword(self) -> bool {
        matches!(
            self,
            Self::AliasKw | Self::ProfileKw | Self::ExtensionKw | Self::InstanceKw | Self::ValuesetKw
        )
    }

    /// Check if this is one of the recognised flag tokens
    pub const fn is_flag(self) -> bool {
        matches!(
            self,
            Self::MsFlag
                | Self::SuFlag
                | Self::TuFlag
                | Self::NFlag
                | Self::DFlag
                | Self::ModifierFlag
        )
    }

    /// Check if this is a structural node
    pub const fn is_node(self) -> bool {
        (self as u16) >= 200 && (self as u16) < 400
    }

    /// Resolve a word to its keyword kind, if any
    ///
    /// Entity and metadata keywords are only meaningful when immediately
    /// followed by a colon; the lexer enforces that before calling this.
    pub fn keyword_from_word(word: &str) -> Option<Self> {
        let kind = match word {
            "Alias" => Self::AliasKw,
            "Profile" => Self::ProfileKw,
            "Extension" => Self::ExtensionKw,
            "Instance" => Self::InstanceKw,
            "ValueSet" => Self::ValuesetKw,

            "Parent" => Self::ParentKw,
            "Id" => Self::IdKw,
            "Title" => Self::TitleKw,
            "Description" => Self::DescriptionKw,
            "InstanceOf" => Self::InstanceofKw,

            "from" => Self::FromKw,
            "only" => Self::OnlyKw,
            "contains" => Self::ContainsKw,
            "and" => Self::AndKw,
            "or" => Self::OrKw,
            "named" => Self::NamedKw,
            "include" => Self::IncludeKw,
            "exclude" => Self::ExcludeKw,
            "codes" => Self::CodesKw,
            "where" => Self::WhereKw,
            "system" => Self::SystemKw,
            "valueset" => Self::ValuesetRefKw,

            "required" => Self::RequiredKw,
            "extensible" => Self::ExtensibleKw,
            "preferred" => Self::PreferredKw,
            "example" => Self::ExampleKw,

            "true" => Self::True,
            "false" => Self::False,

            "MS" => Self::MsFlag,
            "SU" => Self::SuFlag,
            "TU" => Self::TuFlag,
            "N" => Self::NFlag,
            "D" => Self::DFlag,
            "?!" => Self::ModifierFlag,

            _ => return None,
        };
        Some(kind)
    }

    /// Check if this keyword requires a following colon to be recognised
    /// (entity and metadata headers)
    pub const fn is_header_keyword(self) -> bool {
        matches!(
            self,
            Self::AliasKw
                | Self::ProfileKw
                | Self::ExtensionKw
                | Self::InstanceKw
                | Self::ValuesetKw
                | Self::ParentKw
                | Self::IdKw
                | Self::TitleKw
                | Self::DescriptionKw
                | Self::InstanceofKw
        )
    }
}

impl fmt::Display for FshSyntaxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl From<FshSyntaxKind> for rowan::SyntaxKind {
    fn from(kind: FshSyntaxKind) -> Self {
        Self(kind as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trivia_classification() {
        assert!(FshSyntaxKind::Whitespace.is_trivia());
        assert!(FshSyntaxKind::CommentLine.is_trivia());
        assert!(FshSyntaxKind::Newline.is_trivia());
        assert!(!FshSyntaxKind::ProfileKw.is_trivia());
    }

    #[test]
    fn test_keyword_classification() {
        assert!(FshSyntaxKind::ProfileKw.is_keyword());
        assert!(FshSyntaxKind::FromKw.is_keyword());
        assert!(!FshSyntaxKind::Ident.is_keyword());
        assert!(FshSyntaxKind::ProfileKw.is_entity_keyword());
        assert!(!FshSyntaxKind::ParentKw.is_entity_keyword());
    }

    #[test]
    fn test_keyword_from_word() {
        assert_eq!(
            FshSyntaxKind::keyword_from_word("Profile"),
            Some(FshSyntaxKind::ProfileKw)
        );
        assert_eq!(
            FshSyntaxKind::keyword_from_word("from"),
            Some(FshSyntaxKind::FromKw)
        );
        assert_eq!(FshSyntaxKind::keyword_from_word("Patient"), None);
    }

    #[test]
    fn test_node_classification() {
        assert!(FshSyntaxKind::Profile.is_node());
        assert!(FshSyntaxKind::CardRule.is_node());
        assert!(!FshSyntaxKind::Ident.is_node());
    }
}
