//! Typed AST layer over the CST
//!
//! Ergonomic, type-safe wrappers over raw CST nodes. Each wrapper
//! implements `cast()` to safely convert from CST nodes. The wrappers
//! expose metadata clauses in declaration order (duplicates included) so
//! the import visitor can report duplicate-metadata diagnostics.
//!
//! # Example
//!
//! ```ignore
//! let (cst, _, _) = parse_fsh("Profile: MyPatient\nParent: Patient");
//! let doc = Document::cast(cst).unwrap();
//! let profile = doc.profiles().next().unwrap();
//! assert_eq!(profile.name().unwrap(), "MyPatient");
//! ```

use super::{FshSyntaxKind, FshSyntaxNode, FshSyntaxToken};

/// Helper trait for casting CST nodes to typed wrappers
pub trait AstNode: Sized {
    fn can_cast(kind: FshSyntaxKind) -> bool;
    fn cast(node: FshSyntaxNode) -> Option<Self>;
    fn syntax(&self) -> &FshSyntaxNode;
}

macro_rules! ast_node {
    ($(#[$doc:meta])* $name:ident, $kind:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            syntax: FshSyntaxNode,
        }

        impl AstNode for $name {
            fn can_cast(kind: FshSyntaxKind) -> bool {
                kind == $kind
            }

            fn cast(node: FshSyntaxNode) -> Option<Self> {
                if Self::can_cast(node.kind()) {
                    Some(Self { syntax: node })
                } else {
                    None
                }
            }

            fn syntax(&self) -> &FshSyntaxNode {
                &self.syntax
            }
        }
    };
}

/// Find first token of a specific kind among direct children
fn token_of_kind(parent: &FshSyntaxNode, kind: FshSyntaxKind) -> Option<FshSyntaxToken> {
    parent
        .children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.kind() == kind)
}

/// Get identifier text from the first Ident token
fn get_ident_text(node: &FshSyntaxNode) -> Option<String> {
    token_of_kind(node, FshSyntaxKind::Ident).map(|t| t.text().to_string())
}

// ============================================================================
// Document
// ============================================================================

ast_node!(
    /// Root document containing all FSH definitions
    Document,
    FshSyntaxKind::Document
);

impl Document {
    pub fn aliases(&self) -> impl Iterator<Item = Alias> + '_ {
        self.syntax.children().filter_map(Alias::cast)
    }

    pub fn profiles(&self) -> impl Iterator<Item = Profile> + '_ {
        self.syntax.children().filter_map(Profile::cast)
    }

    pub fn extensions(&self) -> impl Iterator<Item = Extension> + '_ {
        self.syntax.children().filter_map(Extension::cast)
    }

    pub fn instances(&self) -> impl Iterator<Item = Instance> + '_ {
        self.syntax.children().filter_map(Instance::cast)
    }

    pub fn value_sets(&self) -> impl Iterator<Item = ValueSet> + '_ {
        self.syntax.children().filter_map(ValueSet::cast)
    }
}

// ============================================================================
// Metadata clauses
// ============================================================================

ast_node!(
    /// Parent clause: Parent: ResourceType
    ParentClause,
    FshSyntaxKind::ParentClause
);

ast_node!(
    /// Id clause: Id: resource-id
    IdClause,
    FshSyntaxKind::IdClause
);

ast_node!(
    /// Title clause: Title: "Resource Title"
    TitleClause,
    FshSyntaxKind::TitleClause
);

ast_node!(
    /// Description clause: Description: "Resource description"
    DescriptionClause,
    FshSyntaxKind::DescriptionClause
);

ast_node!(
    /// InstanceOf clause: InstanceOf: ProfileName
    InstanceofClause,
    FshSyntaxKind::InstanceofClause
);

impl ParentClause {
    pub fn value(&self) -> Option<String> {
        get_ident_text(&self.syntax)
    }
}

impl IdClause {
    pub fn value(&self) -> Option<String> {
        get_ident_text(&self.syntax)
    }
}

impl TitleClause {
    pub fn value_token(&self) -> Option<FshSyntaxToken> {
        string_or_multiline_token(&self.syntax)
    }
}

impl DescriptionClause {
    pub fn value_token(&self) -> Option<FshSyntaxToken> {
        string_or_multiline_token(&self.syntax)
    }
}

impl InstanceofClause {
    pub fn value(&self) -> Option<String> {
        get_ident_text(&self.syntax)
    }
}

fn string_or_multiline_token(node: &FshSyntaxNode) -> Option<FshSyntaxToken> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| {
            matches!(
                t.kind(),
                FshSyntaxKind::String | FshSyntaxKind::MultilineString
            )
        })
}

/// A metadata clause in declaration order
///
/// Entities expose *all* their clauses (duplicates included) so the
/// importer can keep the first occurrence and report the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataClause {
    Parent(ParentClause),
    Id(IdClause),
    Title(TitleClause),
    Description(DescriptionClause),
    InstanceOf(InstanceofClause),
}

impl MetadataClause {
    pub fn cast(node: FshSyntaxNode) -> Option<Self> {
        match node.kind() {
            FshSyntaxKind::ParentClause => ParentClause::cast(node).map(Self::Parent),
            FshSyntaxKind::IdClause => IdClause::cast(node).map(Self::Id),
            FshSyntaxKind::TitleClause => TitleClause::cast(node).map(Self::Title),
            FshSyntaxKind::DescriptionClause => {
                DescriptionClause::cast(node).map(Self::Description)
            }
            FshSyntaxKind::InstanceofClause => InstanceofClause::cast(node).map(Self::InstanceOf),
            _ => None,
        }
    }

    /// The metadata key as written in source ("Parent", "Id", ...)
    pub fn key(&self) -> &'static str {
        match self {
            Self::Parent(_) => "Parent",
            Self::Id(_) => "Id",
            Self::Title(_) => "Title",
            Self::Description(_) => "Description",
            Self::InstanceOf(_) => "InstanceOf",
        }
    }

    pub fn syntax(&self) -> &FshSyntaxNode {
        match self {
            Self::Parent(c) => c.syntax(),
            Self::Id(c) => c.syntax(),
            Self::Title(c) => c.syntax(),
            Self::Description(c) => c.syntax(),
            Self::InstanceOf(c) => c.syntax(),
        }
    }
}

fn metadata_clauses(node: &FshSyntaxNode) -> impl Iterator<Item = MetadataClause> + '_ {
    node.children().filter_map(MetadataClause::cast)
}

// ============================================================================
// Alias
// ============================================================================

ast_node!(
    /// Alias definition: Alias: Name = Value
    Alias,
    FshSyntaxKind::Alias
);

impl Alias {
    pub fn name(&self) -> Option<String> {
        get_ident_text(&self.syntax)
    }

    pub fn name_token(&self) -> Option<FshSyntaxToken> {
        token_of_kind(&self.syntax, FshSyntaxKind::Ident)
    }

    /// The right-hand side, exactly as written
    pub fn value(&self) -> Option<String> {
        let mut found_equals = false;
        for element in self.syntax.children_with_tokens() {
            if let Some(token) = element.as_token() {
                if token.kind() == FshSyntaxKind::Equals {
                    found_equals = true;
                    continue;
                }
                if found_equals
                    && matches!(token.kind(), FshSyntaxKind::Ident | FshSyntaxKind::Code)
                {
                    return Some(token.text().to_string());
                }
            }
        }
        None
    }
}

// ============================================================================
// Entities with metadata + rules
// ============================================================================

ast_node!(
    /// Profile definition: Profile: Name
    Profile,
    FshSyntaxKind::Profile
);

ast_node!(
    /// Extension definition: Extension: Name
    Extension,
    FshSyntaxKind::Extension
);

ast_node!(
    /// Instance definition: Instance: Name
    Instance,
    FshSyntaxKind::Instance
);

ast_node!(
    /// ValueSet definition: ValueSet: Name
    ValueSet,
    FshSyntaxKind::ValueSet
);

macro_rules! entity_accessors {
    ($name:ident) => {
        impl $name {
            /// Entity name (the identifier after the keyword)
            pub fn name(&self) -> Option<String> {
                get_ident_text(&self.syntax)
            }

            /// Name token, for precise locations
            pub fn name_token(&self) -> Option<FshSyntaxToken> {
                token_of_kind(&self.syntax, FshSyntaxKind::Ident)
            }

            /// All metadata clauses in declaration order, duplicates included
            pub fn clauses(&self) -> impl Iterator<Item = MetadataClause> + '_ {
                metadata_clauses(&self.syntax)
            }
        }
    };
}

entity_accessors!(Profile);
entity_accessors!(Extension);
entity_accessors!(Instance);
entity_accessors!(ValueSet);

impl Profile {
    pub fn rules(&self) -> impl Iterator<Item = Rule> + '_ {
        self.syntax.children().filter_map(Rule::cast)
    }
}

impl Extension {
    pub fn rules(&self) -> impl Iterator<Item = Rule> + '_ {
        self.syntax.children().filter_map(Rule::cast)
    }
}

impl Instance {
    pub fn rules(&self) -> impl Iterator<Item = Rule> + '_ {
        self.syntax.children().filter_map(Rule::cast)
    }
}

impl ValueSet {
    pub fn components(&self) -> impl Iterator<Item = VsComponent> + '_ {
        self.syntax.children().filter_map(VsComponent::cast)
    }
}

// ============================================================================
// Rules
// ============================================================================

/// Unified rule type (enum over all rule node kinds)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Card(CardRule),
    Flag(FlagRule),
    ValueSet(ValueSetRule),
    FixedValue(FixedValueRule),
    Only(OnlyRule),
    Contains(ContainsRule),
    CaretValue(CaretValueRule),
    Path(PathRule),
}

impl Rule {
    pub fn cast(node: FshSyntaxNode) -> Option<Self> {
        match node.kind() {
            FshSyntaxKind::CardRule => CardRule::cast(node).map(Rule::Card),
            FshSyntaxKind::FlagRule => FlagRule::cast(node).map(Rule::Flag),
            FshSyntaxKind::ValuesetRule => ValueSetRule::cast(node).map(Rule::ValueSet),
            FshSyntaxKind::FixedValueRule => FixedValueRule::cast(node).map(Rule::FixedValue),
            FshSyntaxKind::OnlyRule => OnlyRule::cast(node).map(Rule::Only),
            FshSyntaxKind::ContainsRule => ContainsRule::cast(node).map(Rule::Contains),
            FshSyntaxKind::CaretValueRule => CaretValueRule::cast(node).map(Rule::CaretValue),
            FshSyntaxKind::PathRule => PathRule::cast(node).map(Rule::Path),
            _ => None,
        }
    }

    pub fn syntax(&self) -> &FshSyntaxNode {
        match self {
            Rule::Card(r) => r.syntax(),
            Rule::Flag(r) => r.syntax(),
            Rule::ValueSet(r) => r.syntax(),
            Rule::FixedValue(r) => r.syntax(),
            Rule::Only(r) => r.syntax(),
            Rule::Contains(r) => r.syntax(),
            Rule::CaretValue(r) => r.syntax(),
            Rule::Path(r) => r.syntax(),
        }
    }
}

/// Path text of a rule node (its Path child's token)
fn rule_path(node: &FshSyntaxNode) -> Option<String> {
    node.children()
        .find(|n| n.kind() == FshSyntaxKind::Path)
        .and_then(|path| {
            path.children_with_tokens()
                .filter_map(|e| e.into_token())
                .find(|t| !t.kind().is_trivia())
                .map(|t| t.text().to_string())
        })
}

/// Flag tokens among a rule's direct children
fn rule_flags(node: &FshSyntaxNode) -> Vec<FshSyntaxKind> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(|t| t.kind().is_flag())
        .map(|t| t.kind())
        .collect()
}

ast_node!(
    /// Cardinality rule: * path 0..1 MS
    CardRule,
    FshSyntaxKind::CardRule
);

impl CardRule {
    pub fn path(&self) -> Option<String> {
        rule_path(&self.syntax)
    }

    /// The cardinality token text, e.g. "0..1" or "1..*"
    pub fn cardinality(&self) -> Option<String> {
        token_of_kind(&self.syntax, FshSyntaxKind::Card).map(|t| t.text().to_string())
    }

    pub fn flags(&self) -> Vec<FshSyntaxKind> {
        rule_flags(&self.syntax)
    }
}

ast_node!(
    /// Flag rule: * path MS SU
    FlagRule,
    FshSyntaxKind::FlagRule
);

impl FlagRule {
    pub fn path(&self) -> Option<String> {
        rule_path(&self.syntax)
    }

    pub fn flags(&self) -> Vec<FshSyntaxKind> {
        rule_flags(&self.syntax)
    }
}

ast_node!(
    /// ValueSet binding rule: * path from ValueSetName (required)
    ValueSetRule,
    FshSyntaxKind::ValuesetRule
);

impl ValueSetRule {
    pub fn path(&self) -> Option<String> {
        rule_path(&self.syntax)
    }

    /// The referenced value set, as written
    pub fn value_set(&self) -> Option<String> {
        let mut seen_from = false;
        for element in self.syntax.children_with_tokens() {
            if let Some(token) = element.as_token() {
                if token.kind() == FshSyntaxKind::FromKw {
                    seen_from = true;
                    continue;
                }
                if seen_from && token.kind() == FshSyntaxKind::Ident {
                    return Some(token.text().to_string());
                }
            }
        }
        None
    }

    /// Binding strength keyword, when present
    pub fn strength(&self) -> Option<FshSyntaxKind> {
        self.syntax
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .map(|t| t.kind())
            .find(|k| {
                matches!(
                    k,
                    FshSyntaxKind::RequiredKw
                        | FshSyntaxKind::ExtensibleKw
                        | FshSyntaxKind::PreferredKw
                        | FshSyntaxKind::ExampleKw
                )
            })
    }
}

ast_node!(
    /// Fixed value rule: * path = value
    FixedValueRule,
    FshSyntaxKind::FixedValueRule
);

impl FixedValueRule {
    pub fn path(&self) -> Option<String> {
        rule_path(&self.syntax)
    }

    pub fn value(&self) -> Option<ValueExpr> {
        value_after_equals(&self.syntax)
    }
}

ast_node!(
    /// Only rule: * path only Type1 or Reference(A|B)
    OnlyRule,
    FshSyntaxKind::OnlyRule
);

/// One target of an only rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OnlyTarget {
    /// Bare type sequence
    Type(String),
    /// Reference literal text, e.g. `Reference(A|B)`
    Reference(String),
}

impl OnlyRule {
    pub fn path(&self) -> Option<String> {
        rule_path(&self.syntax)
    }

    pub fn targets(&self) -> Vec<OnlyTarget> {
        let mut seen_only = false;
        let mut targets = Vec::new();
        for element in self.syntax.children_with_tokens() {
            if let Some(token) = element.as_token() {
                match token.kind() {
                    FshSyntaxKind::OnlyKw => seen_only = true,
                    FshSyntaxKind::Ident if seen_only => {
                        targets.push(OnlyTarget::Type(token.text().to_string()));
                    }
                    FshSyntaxKind::ReferenceLit if seen_only => {
                        targets.push(OnlyTarget::Reference(token.text().to_string()));
                    }
                    _ => {}
                }
            }
        }
        targets
    }
}

ast_node!(
    /// Contains rule: * path contains item1 1..1 and item2 0..1 MS
    ContainsRule,
    FshSyntaxKind::ContainsRule
);

ast_node!(
    /// One item of a contains rule
    ContainsItem,
    FshSyntaxKind::ContainsItem
);

impl ContainsRule {
    pub fn path(&self) -> Option<String> {
        rule_path(&self.syntax)
    }

    pub fn items(&self) -> Vec<ContainsItem> {
        self.syntax
            .children()
            .filter_map(ContainsItem::cast)
            .collect()
    }
}

impl ContainsItem {
    /// The item name used for the synthesised slice path; for
    /// `Type named alias` this is the alias
    pub fn name(&self) -> Option<String> {
        let idents: Vec<_> = self
            .syntax
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| t.kind() == FshSyntaxKind::Ident)
            .collect();
        idents.last().map(|t| t.text().to_string())
    }

    pub fn cardinality(&self) -> Option<String> {
        token_of_kind(&self.syntax, FshSyntaxKind::Card).map(|t| t.text().to_string())
    }

    pub fn flags(&self) -> Vec<FshSyntaxKind> {
        rule_flags(&self.syntax)
    }
}

ast_node!(
    /// Caret value rule: * path? ^attr = value
    CaretValueRule,
    FshSyntaxKind::CaretValueRule
);

impl CaretValueRule {
    /// Element path; empty when the rule addresses the artifact itself
    pub fn path(&self) -> Option<String> {
        rule_path(&self.syntax)
    }

    /// Caret path with the leading `^` stripped
    pub fn caret_path(&self) -> Option<String> {
        token_of_kind(&self.syntax, FshSyntaxKind::CaretSequence)
            .map(|t| t.text().trim_start_matches('^').to_string())
    }

    pub fn value(&self) -> Option<ValueExpr> {
        value_after_equals(&self.syntax)
    }
}

ast_node!(
    /// Bare path rule; the importer reports these as unrecognised
    PathRule,
    FshSyntaxKind::PathRule
);

impl PathRule {
    pub fn path(&self) -> Option<String> {
        rule_path(&self.syntax)
    }
}

// ============================================================================
// Values
// ============================================================================

ast_node!(
    /// Quantity value node: NUMBER UNIT
    QuantityValue,
    FshSyntaxKind::Quantity
);

impl QuantityValue {
    pub fn number(&self) -> Option<String> {
        token_of_kind(&self.syntax, FshSyntaxKind::Number).map(|t| t.text().to_string())
    }

    /// Unit with surrounding single quotes still attached
    pub fn unit(&self) -> Option<String> {
        token_of_kind(&self.syntax, FshSyntaxKind::Unit).map(|t| t.text().to_string())
    }
}

ast_node!(
    /// Ratio value node: part : part
    RatioValue,
    FshSyntaxKind::Ratio
);

ast_node!(
    /// One side of a ratio
    RatioPartNode,
    FshSyntaxKind::RatioPart
);

impl RatioValue {
    pub fn parts(&self) -> Vec<RatioPartNode> {
        self.syntax
            .children()
            .filter_map(RatioPartNode::cast)
            .collect()
    }
}

impl RatioPartNode {
    pub fn number(&self) -> Option<String> {
        token_of_kind(&self.syntax, FshSyntaxKind::Number).map(|t| t.text().to_string())
    }

    pub fn unit(&self) -> Option<String> {
        token_of_kind(&self.syntax, FshSyntaxKind::Unit).map(|t| t.text().to_string())
    }
}

/// A value expression on the right-hand side of `=`
///
/// Dispatch follows the token present, in the fixed priority order:
/// string, multiline string, number, datetime, time, reference, code,
/// quantity, ratio, boolean.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueExpr {
    /// Raw string token text (quotes attached)
    Str(String),
    /// Raw multiline string token text (triple quotes attached)
    Multiline(String),
    /// Number token text
    Number(String),
    /// DateTime token text
    DateTime(String),
    /// Time token text
    Time(String),
    /// Reference literal text plus optional display string token text
    Reference { text: String, display: Option<String> },
    /// Code literal text plus optional display string token text
    Code { text: String, display: Option<String> },
    Quantity(QuantityValue),
    Ratio(RatioValue),
    Bool(bool),
}

/// Extract the value expression following the `=` of a rule node
fn value_after_equals(node: &FshSyntaxNode) -> Option<ValueExpr> {
    let mut seen_equals = false;

    for element in node.children_with_tokens() {
        match &element {
            rowan::NodeOrToken::Token(token) => {
                if token.kind() == FshSyntaxKind::Equals {
                    seen_equals = true;
                    continue;
                }
                if !seen_equals || token.kind().is_trivia() {
                    continue;
                }
                let text = token.text().to_string();
                return match token.kind() {
                    FshSyntaxKind::String => Some(ValueExpr::Str(text)),
                    FshSyntaxKind::MultilineString => Some(ValueExpr::Multiline(text)),
                    FshSyntaxKind::Number => Some(ValueExpr::Number(text)),
                    FshSyntaxKind::DateTime => Some(ValueExpr::DateTime(text)),
                    FshSyntaxKind::Time => Some(ValueExpr::Time(text)),
                    FshSyntaxKind::ReferenceLit => Some(ValueExpr::Reference {
                        text,
                        display: following_string(node, token),
                    }),
                    FshSyntaxKind::Code => Some(ValueExpr::Code {
                        text,
                        display: following_string(node, token),
                    }),
                    FshSyntaxKind::True => Some(ValueExpr::Bool(true)),
                    FshSyntaxKind::False => Some(ValueExpr::Bool(false)),
                    _ => None,
                };
            }
            rowan::NodeOrToken::Node(child) => {
                if !seen_equals {
                    continue;
                }
                let child = FshSyntaxNode::from(child.clone());
                return match child.kind() {
                    FshSyntaxKind::Quantity => QuantityValue::cast(child).map(ValueExpr::Quantity),
                    FshSyntaxKind::Ratio => RatioValue::cast(child).map(ValueExpr::Ratio),
                    _ => None,
                };
            }
        }
    }

    None
}

/// The String token following `token` among the node's children, if any
fn following_string(node: &FshSyntaxNode, token: &FshSyntaxToken) -> Option<String> {
    let mut found = false;
    for element in node.children_with_tokens() {
        if let Some(t) = element.as_token() {
            if found && t.kind() == FshSyntaxKind::String {
                return Some(t.text().to_string());
            }
            if found && !t.kind().is_trivia() {
                return None;
            }
            if t.text_range() == token.text_range() {
                found = true;
            }
        }
    }
    None
}

// ============================================================================
// ValueSet components
// ============================================================================

ast_node!(
    /// Include/exclude component of a value set
    VsComponent,
    FshSyntaxKind::VsComponent
);

ast_node!(
    /// Enumerated-concept component body
    VsConceptComponent,
    FshSyntaxKind::VsConceptComponent
);

ast_node!(
    /// Filter component body: codes from ... where ...
    VsFilterComponent,
    FshSyntaxKind::VsFilterComponent
);

ast_node!(
    /// "from system X and valueset Y" clause
    VsComponentFrom,
    FshSyntaxKind::VsComponentFrom
);

ast_node!(
    /// Single filter definition: property operator value?
    VsFilterDefinition,
    FshSyntaxKind::VsFilterDefinition
);

/// Body alternatives of a [`VsComponent`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VsComponentBody {
    Concept(VsConceptComponent),
    Filter(VsFilterComponent),
}

impl VsComponent {
    /// False when the component carries the `exclude` keyword
    pub fn inclusion(&self) -> bool {
        !self
            .syntax
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .any(|t| t.kind() == FshSyntaxKind::ExcludeKw)
    }

    pub fn body(&self) -> Option<VsComponentBody> {
        for child in self.syntax.children() {
            match child.kind() {
                FshSyntaxKind::VsConceptComponent => {
                    return VsConceptComponent::cast(child).map(VsComponentBody::Concept);
                }
                FshSyntaxKind::VsFilterComponent => {
                    return VsFilterComponent::cast(child).map(VsComponentBody::Filter);
                }
                _ => {}
            }
        }
        None
    }
}

impl VsConceptComponent {
    /// The code token: a single Code or a CommaDelimitedCodes list
    pub fn code_token(&self) -> Option<FshSyntaxToken> {
        self.syntax
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .find(|t| {
                matches!(
                    t.kind(),
                    FshSyntaxKind::Code | FshSyntaxKind::CommaDelimitedCodes
                )
            })
    }

    /// Display string (quotes attached) following a single code
    pub fn display(&self) -> Option<String> {
        token_of_kind(&self.syntax, FshSyntaxKind::String).map(|t| t.text().to_string())
    }

    pub fn from_clause(&self) -> Option<VsComponentFrom> {
        self.syntax
            .children()
            .find_map(VsComponentFrom::cast)
    }
}

impl VsFilterComponent {
    pub fn from_clause(&self) -> Option<VsComponentFrom> {
        self.syntax
            .children()
            .find_map(VsComponentFrom::cast)
    }

    pub fn filters(&self) -> Vec<VsFilterDefinition> {
        self.syntax
            .descendants()
            .filter(|n| n.kind() == FshSyntaxKind::VsFilterDefinition)
            .filter_map(VsFilterDefinition::cast)
            .collect()
    }
}

impl VsComponentFrom {
    /// The system reference, as written
    pub fn system(&self) -> Option<String> {
        self.syntax
            .children()
            .find(|n| n.kind() == FshSyntaxKind::VsFromSystem)
            .and_then(|n| get_ident_text(&n))
    }

    /// Value set references, as written (comma lists not yet split)
    pub fn value_sets(&self) -> Vec<String> {
        self.syntax
            .children()
            .filter(|n| n.kind() == FshSyntaxKind::VsFromValueset)
            .filter_map(|n| {
                n.children_with_tokens()
                    .filter_map(|e| e.into_token())
                    .find(|t| {
                        matches!(
                            t.kind(),
                            FshSyntaxKind::Ident | FshSyntaxKind::CommaDelimitedSequences
                        )
                    })
                    .map(|t| t.text().to_string())
            })
            .collect()
    }
}

/// Value alternatives of a filter definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VsFilterValueExpr {
    /// Code literal text
    Code(String),
    /// String token text (quotes attached)
    Str(String),
    /// Regex token text (slashes attached)
    Regex(String),
    Bool(bool),
    /// Anything else (reported as a type error by the importer)
    Other(String),
}

impl VsFilterDefinition {
    pub fn property(&self) -> Option<String> {
        get_ident_text(&self.syntax)
    }

    /// Operator text as written ("=", "is-a", "descendant-of", ...)
    pub fn operator_text(&self) -> Option<String> {
        self.syntax
            .children()
            .find(|n| n.kind() == FshSyntaxKind::VsFilterOperator)
            .and_then(|n| {
                n.children_with_tokens()
                    .filter_map(|e| e.into_token())
                    .find(|t| !t.kind().is_trivia())
                    .map(|t| t.text().to_string())
            })
    }

    pub fn value(&self) -> Option<VsFilterValueExpr> {
        let value_node = self
            .syntax
            .children()
            .find(|n| n.kind() == FshSyntaxKind::VsFilterValue)?;
        let token = value_node
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .find(|t| !t.kind().is_trivia())?;

        let text = token.text().to_string();
        Some(match token.kind() {
            FshSyntaxKind::Code => VsFilterValueExpr::Code(text),
            FshSyntaxKind::String => VsFilterValueExpr::Str(text),
            FshSyntaxKind::Regex => VsFilterValueExpr::Regex(text),
            FshSyntaxKind::True => VsFilterValueExpr::Bool(true),
            FshSyntaxKind::False => VsFilterValueExpr::Bool(false),
            _ => VsFilterValueExpr::Other(text),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cst::parse_fsh;

    fn document(source: &str) -> Document {
        let (cst, lex_errors, parse_errors) = parse_fsh(source);
        assert!(lex_errors.is_empty(), "lexer errors: {lex_errors:?}");
        assert!(parse_errors.is_empty(), "parser errors: {parse_errors:?}");
        Document::cast(cst).expect("document node")
    }

    #[test]
    fn test_profile_accessors() {
        let doc = document("Profile: MyPatient\nParent: Patient\nId: my-patient\n");
        let profile = doc.profiles().next().expect("profile");

        assert_eq!(profile.name().unwrap(), "MyPatient");

        let clauses: Vec<_> = profile.clauses().collect();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].key(), "Parent");
        assert_eq!(clauses[1].key(), "Id");
    }

    #[test]
    fn test_duplicate_clauses_preserved() {
        let doc = document("Profile: P\nParent: Patient\nParent: Observation\n");
        let profile = doc.profiles().next().unwrap();
        let parents: Vec<_> = profile
            .clauses()
            .filter(|c| c.key() == "Parent")
            .collect();
        assert_eq!(parents.len(), 2);
    }

    #[test]
    fn test_card_rule_accessors() {
        let doc = document("Profile: P\nParent: Patient\n* name 1..1 MS\n");
        let profile = doc.profiles().next().unwrap();
        let rule = profile.rules().next().unwrap();

        match rule {
            Rule::Card(card) => {
                assert_eq!(card.path().unwrap(), "name");
                assert_eq!(card.cardinality().unwrap(), "1..1");
                assert_eq!(card.flags(), vec![FshSyntaxKind::MsFlag]);
            }
            other => panic!("expected card rule, got {other:?}"),
        }
    }

    #[test]
    fn test_only_rule_targets() {
        let doc = document("Profile: P\nParent: Patient\n* subject only Patient or Reference(Device|Group)\n");
        let profile = doc.profiles().next().unwrap();
        let rule = profile.rules().next().unwrap();

        match rule {
            Rule::Only(only) => {
                assert_eq!(
                    only.targets(),
                    vec![
                        OnlyTarget::Type("Patient".to_string()),
                        OnlyTarget::Reference("Reference(Device|Group)".to_string()),
                    ]
                );
            }
            other => panic!("expected only rule, got {other:?}"),
        }
    }

    #[test]
    fn test_fixed_value_code_with_display() {
        let doc = document("Instance: I\nInstanceOf: Observation\n* status = #final \"Final\"\n");
        let instance = doc.instances().next().unwrap();
        let rule = instance.rules().next().unwrap();

        match rule {
            Rule::FixedValue(fixed) => match fixed.value().unwrap() {
                ValueExpr::Code { text, display } => {
                    assert_eq!(text, "#final");
                    assert_eq!(display.as_deref(), Some("\"Final\""));
                }
                other => panic!("expected code value, got {other:?}"),
            },
            other => panic!("expected fixed value rule, got {other:?}"),
        }
    }

    #[test]
    fn test_contains_items() {
        let doc = document(
            "Profile: P\nParent: Observation\n* component contains systolic 1..1 MS and diastolic 0..1\n",
        );
        let profile = doc.profiles().next().unwrap();
        let rule = profile.rules().next().unwrap();

        match rule {
            Rule::Contains(contains) => {
                let items = contains.items();
                assert_eq!(items.len(), 2);
                assert_eq!(items[0].name().unwrap(), "systolic");
                assert_eq!(items[0].cardinality().unwrap(), "1..1");
                assert_eq!(items[0].flags(), vec![FshSyntaxKind::MsFlag]);
                assert_eq!(items[1].name().unwrap(), "diastolic");
                assert!(items[1].flags().is_empty());
            }
            other => panic!("expected contains rule, got {other:?}"),
        }
    }

    #[test]
    fn test_caret_rule_without_path() {
        let doc = document("Profile: P\nParent: Patient\n* ^status = #draft\n");
        let profile = doc.profiles().next().unwrap();
        let rule = profile.rules().next().unwrap();

        match rule {
            Rule::CaretValue(caret) => {
                assert!(caret.path().is_none());
                assert_eq!(caret.caret_path().unwrap(), "status");
            }
            other => panic!("expected caret rule, got {other:?}"),
        }
    }

    #[test]
    fn test_vs_component_accessors() {
        let doc = document(
            "ValueSet: VS\n* exclude codes from system http://s where concept is-a #123\n",
        );
        let vs = doc.value_sets().next().unwrap();
        let component = vs.components().next().unwrap();

        assert!(!component.inclusion());
        match component.body().unwrap() {
            VsComponentBody::Filter(filter) => {
                assert_eq!(filter.from_clause().unwrap().system().unwrap(), "http://s");
                let filters = filter.filters();
                assert_eq!(filters.len(), 1);
                assert_eq!(filters[0].property().unwrap(), "concept");
                assert_eq!(filters[0].operator_text().unwrap(), "is-a");
                assert_eq!(
                    filters[0].value().unwrap(),
                    VsFilterValueExpr::Code("#123".to_string())
                );
            }
            other => panic!("expected filter component, got {other:?}"),
        }
    }
}
