//! Hierarchical parser for FSH constructs
//!
//! Builds a structured, lossless CST from the token stream: entity nodes
//! for aliases, profiles, extensions, instances and value sets, clause
//! nodes for metadata lines, and rule nodes for every `*`-prefixed rule.
//! Parsing never fails: unexpected input becomes `Error` nodes and every
//! problem is reported as a structured [`SyntaxError`] carrying its span.

use super::lexer::{CstSpan, LexerError};
use super::{CstBuilder, CstToken, FshSyntaxKind, FshSyntaxNode};

/// A parser-level error with a source span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub span: CstSpan,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, span: CstSpan) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

/// Parse FSH source into a hierarchical CST
///
/// Returns the root node together with lexer and parser errors. The tree
/// is lossless: `cst.text() == source`.
///
/// # Example
///
/// ```rust,ignore
/// let (cst, lex_errors, parse_errors) = parse_fsh("Profile: MyPatient\nParent: Patient");
/// assert!(lex_errors.is_empty() && parse_errors.is_empty());
/// ```
pub fn parse_fsh(source: &str) -> (FshSyntaxNode, Vec<LexerError>, Vec<SyntaxError>) {
    let (tokens, lex_errors) = super::lex_with_trivia(source);
    let mut parser = Parser::new(&tokens);
    parser.parse_document();
    let (cst, parse_errors) = parser.finish();
    (cst, lex_errors, parse_errors)
}

/// Token stream parser
struct Parser<'a> {
    tokens: &'a [CstToken],
    pos: usize,
    builder: CstBuilder,
    errors: Vec<SyntaxError>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [CstToken]) -> Self {
        Self {
            tokens,
            pos: 0,
            builder: CstBuilder::new(),
            errors: Vec::new(),
        }
    }

    fn finish(self) -> (FshSyntaxNode, Vec<SyntaxError>) {
        (self.builder.finish(), self.errors)
    }

    /// Parse the top-level document
    fn parse_document(&mut self) {
        self.builder.start_node(FshSyntaxKind::Document);

        while !self.at_end() {
            match self.current_kind() {
                FshSyntaxKind::AliasKw => self.parse_alias(),
                FshSyntaxKind::ProfileKw => self.parse_profile(),
                FshSyntaxKind::ExtensionKw => self.parse_extension(),
                FshSyntaxKind::InstanceKw => self.parse_instance(),
                FshSyntaxKind::ValuesetKw => self.parse_valueset(),

                FshSyntaxKind::Whitespace
                | FshSyntaxKind::CommentLine
                | FshSyntaxKind::CommentBlock
                | FshSyntaxKind::Newline => {
                    self.add_current_token();
                    self.advance();
                }
                FshSyntaxKind::Eof => break,
                _ => {
                    self.error_and_recover("expected an entity declaration");
                }
            }
        }

        self.builder.finish_node(); // DOCUMENT
    }

    /// Parse an Alias declaration
    ///
    /// Grammar: Alias: <name> = <url>
    fn parse_alias(&mut self) {
        self.builder.start_node(FshSyntaxKind::Alias);

        self.expect(FshSyntaxKind::AliasKw);
        self.consume_trivia();
        self.expect(FshSyntaxKind::Colon);
        self.consume_trivia();
        self.expect(FshSyntaxKind::Ident);
        self.consume_trivia();

        if self.at(FshSyntaxKind::Equals) {
            self.add_current_token();
            self.advance();
            self.consume_trivia();

            // Alias value: a single sequence token (URLs lex whole)
            if self.at(FshSyntaxKind::Ident) || self.at(FshSyntaxKind::Code) {
                self.add_current_token();
                self.advance();
            } else {
                self.unexpected("expected alias value");
            }
        } else {
            self.unexpected("expected '=' in alias declaration");
        }

        self.consume_trivia_and_newlines();
        self.builder.finish_node(); // ALIAS
    }

    /// Parse a Profile declaration
    ///
    /// Grammar: Profile: <name> <metadata>* <rule>*
    fn parse_profile(&mut self) {
        self.builder.start_node(FshSyntaxKind::Profile);
        self.parse_entity_header(FshSyntaxKind::ProfileKw);
        self.parse_sd_body();
        self.builder.finish_node(); // PROFILE
    }

    /// Parse an Extension declaration (same body shape as Profile)
    fn parse_extension(&mut self) {
        self.builder.start_node(FshSyntaxKind::Extension);
        self.parse_entity_header(FshSyntaxKind::ExtensionKw);
        self.parse_sd_body();
        self.builder.finish_node(); // EXTENSION
    }

    /// Parse an Instance declaration
    fn parse_instance(&mut self) {
        self.builder.start_node(FshSyntaxKind::Instance);
        self.parse_entity_header(FshSyntaxKind::InstanceKw);
        self.parse_sd_body();
        self.builder.finish_node(); // INSTANCE
    }

    /// Parse a ValueSet declaration
    fn parse_valueset(&mut self) {
        self.builder.start_node(FshSyntaxKind::ValueSet);
        self.parse_entity_header(FshSyntaxKind::ValuesetKw);

        while !self.at_end() && !self.at_entity_keyword() {
            if self.at_trivia() || self.at(FshSyntaxKind::Newline) {
                self.add_current_token();
                self.advance();
                continue;
            }

            match self.current_kind() {
                FshSyntaxKind::IdKw => self.parse_value_clause(FshSyntaxKind::IdClause),
                FshSyntaxKind::TitleKw => self.parse_string_clause(FshSyntaxKind::TitleClause),
                FshSyntaxKind::DescriptionKw => {
                    self.parse_string_clause(FshSyntaxKind::DescriptionClause)
                }
                FshSyntaxKind::Asterisk => self.parse_vs_component(),
                _ => self.error_and_recover("expected metadata or value set component"),
            }
        }

        self.builder.finish_node(); // VALUE_SET
    }

    /// Parse `<Keyword>: <name>` at the start of an entity
    fn parse_entity_header(&mut self, keyword: FshSyntaxKind) {
        self.expect(keyword);
        self.consume_trivia();
        self.expect(FshSyntaxKind::Colon);
        self.consume_trivia();
        self.expect(FshSyntaxKind::Ident);
        self.consume_trivia_and_newlines();
    }

    /// Parse the metadata + rule body shared by Profile/Extension/Instance
    fn parse_sd_body(&mut self) {
        while !self.at_end() && !self.at_entity_keyword() {
            if self.at_trivia() || self.at(FshSyntaxKind::Newline) {
                self.add_current_token();
                self.advance();
                continue;
            }

            match self.current_kind() {
                FshSyntaxKind::ParentKw => self.parse_value_clause(FshSyntaxKind::ParentClause),
                FshSyntaxKind::IdKw => self.parse_value_clause(FshSyntaxKind::IdClause),
                FshSyntaxKind::InstanceofKw => {
                    self.parse_value_clause(FshSyntaxKind::InstanceofClause)
                }
                FshSyntaxKind::TitleKw => self.parse_string_clause(FshSyntaxKind::TitleClause),
                FshSyntaxKind::DescriptionKw => {
                    self.parse_string_clause(FshSyntaxKind::DescriptionClause)
                }
                FshSyntaxKind::Asterisk => self.parse_sd_rule(),
                _ => self.error_and_recover("expected metadata or rule"),
            }
        }
    }

    /// Parse a clause whose value is a sequence: Parent, Id, InstanceOf
    fn parse_value_clause(&mut self, node_kind: FshSyntaxKind) {
        self.builder.start_node(node_kind);
        self.add_current_token(); // keyword
        self.advance();
        self.consume_trivia();
        self.expect(FshSyntaxKind::Colon);
        self.consume_trivia();
        self.expect(FshSyntaxKind::Ident);
        self.consume_trivia_and_newlines();
        self.builder.finish_node();
    }

    /// Parse a clause whose value is a string: Title, Description
    fn parse_string_clause(&mut self, node_kind: FshSyntaxKind) {
        self.builder.start_node(node_kind);
        self.add_current_token(); // keyword
        self.advance();
        self.consume_trivia();
        self.expect(FshSyntaxKind::Colon);
        self.consume_trivia();
        if self.at(FshSyntaxKind::String) || self.at(FshSyntaxKind::MultilineString) {
            self.add_current_token();
            self.advance();
        } else {
            self.unexpected("expected string value");
        }
        self.consume_trivia_and_newlines();
        self.builder.finish_node();
    }

    /// Parse a `*`-prefixed rule inside a Profile/Extension/Instance
    fn parse_sd_rule(&mut self) {
        self.expect(FshSyntaxKind::Asterisk);
        self.consume_trivia();

        // Caret rule with no path: * ^attr = value
        if self.at(FshSyntaxKind::CaretSequence) {
            self.builder.start_node(FshSyntaxKind::CaretValueRule);
            self.add_current_token();
            self.advance();
            self.consume_trivia();
            self.parse_assignment();
            self.consume_trivia_and_newlines();
            self.builder.finish_node();
            return;
        }

        if !self.at_path_token() {
            self.error_and_recover("expected rule path");
            return;
        }

        // Determine the rule kind from the token after the path
        let rule_kind = match self.peek_after_path() {
            FshSyntaxKind::Card => FshSyntaxKind::CardRule,
            k if k.is_flag() => FshSyntaxKind::FlagRule,
            FshSyntaxKind::FromKw => FshSyntaxKind::ValuesetRule,
            FshSyntaxKind::Equals => FshSyntaxKind::FixedValueRule,
            FshSyntaxKind::OnlyKw => FshSyntaxKind::OnlyRule,
            FshSyntaxKind::ContainsKw => FshSyntaxKind::ContainsRule,
            FshSyntaxKind::CaretSequence => FshSyntaxKind::CaretValueRule,
            _ => FshSyntaxKind::PathRule,
        };

        self.builder.start_node(rule_kind);

        // Path as first child of the rule node
        self.builder.start_node(FshSyntaxKind::Path);
        self.add_current_token();
        self.advance();
        self.builder.finish_node(); // PATH
        self.consume_trivia();

        match rule_kind {
            FshSyntaxKind::CardRule => {
                self.expect(FshSyntaxKind::Card);
                self.consume_trivia();
                self.parse_flag_sequence();
            }
            FshSyntaxKind::FlagRule => {
                self.parse_flag_sequence();
            }
            FshSyntaxKind::ValuesetRule => {
                self.expect(FshSyntaxKind::FromKw);
                self.consume_trivia();
                if self.at(FshSyntaxKind::Ident) {
                    self.add_current_token();
                    self.advance();
                } else {
                    self.unexpected("expected value set reference");
                }
                self.consume_trivia();
                // Optional binding strength: (required)
                if self.at(FshSyntaxKind::LParen) {
                    self.add_current_token();
                    self.advance();
                    self.consume_trivia();
                    if matches!(
                        self.current_kind(),
                        FshSyntaxKind::RequiredKw
                            | FshSyntaxKind::ExtensibleKw
                            | FshSyntaxKind::PreferredKw
                            | FshSyntaxKind::ExampleKw
                    ) {
                        self.add_current_token();
                        self.advance();
                    } else {
                        self.unexpected("expected binding strength");
                    }
                    self.consume_trivia();
                    self.expect(FshSyntaxKind::RParen);
                }
            }
            FshSyntaxKind::FixedValueRule => {
                self.parse_assignment();
            }
            FshSyntaxKind::OnlyRule => {
                self.expect(FshSyntaxKind::OnlyKw);
                self.consume_trivia();
                self.parse_only_target();
                while self.at(FshSyntaxKind::OrKw) {
                    self.add_current_token();
                    self.advance();
                    self.consume_trivia();
                    self.parse_only_target();
                }
            }
            FshSyntaxKind::ContainsRule => {
                self.expect(FshSyntaxKind::ContainsKw);
                self.consume_trivia_and_newlines();
                self.parse_contains_item();
                while self.at(FshSyntaxKind::AndKw) {
                    self.add_current_token();
                    self.advance();
                    self.consume_trivia_and_newlines();
                    self.parse_contains_item();
                }
            }
            FshSyntaxKind::CaretValueRule => {
                self.expect(FshSyntaxKind::CaretSequence);
                self.consume_trivia();
                self.parse_assignment();
            }
            _ => {
                // Unrecognised rule body: keep its tokens for the visitor
                while !self.at_end()
                    && !self.at(FshSyntaxKind::Newline)
                    && !self.at(FshSyntaxKind::CommentLine)
                {
                    self.add_current_token();
                    self.advance();
                }
            }
        }

        self.consume_trivia_and_newlines();
        self.builder.finish_node();
    }

    /// Parse `= value` (fixed value and caret value rules)
    fn parse_assignment(&mut self) {
        if self.at(FshSyntaxKind::Equals) {
            self.add_current_token();
            self.advance();
            self.consume_trivia();
            self.parse_value_expression();
        } else {
            self.unexpected("expected '='");
        }
    }

    /// Parse a value expression (right-hand side of an assignment)
    fn parse_value_expression(&mut self) {
        match self.current_kind() {
            FshSyntaxKind::String
            | FshSyntaxKind::MultilineString
            | FshSyntaxKind::DateTime
            | FshSyntaxKind::Time
            | FshSyntaxKind::Regex
            | FshSyntaxKind::True
            | FshSyntaxKind::False => {
                self.add_current_token();
                self.advance();
            }
            FshSyntaxKind::Code => {
                self.add_current_token();
                self.advance();
                self.consume_trivia();
                // Optional display string
                if self.at(FshSyntaxKind::String) {
                    self.add_current_token();
                    self.advance();
                }
            }
            FshSyntaxKind::ReferenceLit => {
                self.add_current_token();
                self.advance();
                self.consume_trivia();
                // Optional display string
                if self.at(FshSyntaxKind::String) {
                    self.add_current_token();
                    self.advance();
                }
            }
            FshSyntaxKind::Number => {
                self.parse_number_value();
            }
            FshSyntaxKind::Ident => {
                // Symbolic value (e.g. an alias to a URL)
                self.add_current_token();
                self.advance();
                self.consume_trivia();
                if self.at(FshSyntaxKind::String) {
                    self.add_current_token();
                    self.advance();
                }
            }
            _ => {
                self.unexpected("expected value");
            }
        }
    }

    /// Parse a numeric value which may extend into a Quantity or Ratio
    fn parse_number_value(&mut self) {
        // Lookahead (past trivia) to classify
        let after_number = self.peek_past(1);
        if after_number == FshSyntaxKind::Colon {
            self.parse_ratio();
            return;
        }
        if after_number == FshSyntaxKind::Unit {
            // NUMBER UNIT, possibly the numerator of a ratio
            let after_unit = self.peek_past(2);
            if after_unit == FshSyntaxKind::Colon {
                self.parse_ratio();
                return;
            }
            self.builder.start_node(FshSyntaxKind::Quantity);
            self.add_current_token(); // number
            self.advance();
            self.consume_trivia();
            self.add_current_token(); // unit
            self.advance();
            self.builder.finish_node(); // QUANTITY
            self.consume_trivia();
            // Optional display string
            if self.at(FshSyntaxKind::String) {
                self.add_current_token();
                self.advance();
            }
            return;
        }

        self.add_current_token();
        self.advance();
    }

    /// Parse a Ratio: part : part
    fn parse_ratio(&mut self) {
        self.builder.start_node(FshSyntaxKind::Ratio);
        self.parse_ratio_part();
        self.consume_trivia();
        self.expect(FshSyntaxKind::Colon);
        self.consume_trivia();
        self.parse_ratio_part();
        self.builder.finish_node(); // RATIO
    }

    /// Parse one side of a ratio: NUMBER or NUMBER UNIT
    fn parse_ratio_part(&mut self) {
        self.builder.start_node(FshSyntaxKind::RatioPart);
        if self.at(FshSyntaxKind::Number) {
            self.add_current_token();
            self.advance();
            self.consume_trivia();
            if self.at(FshSyntaxKind::Unit) {
                self.add_current_token();
                self.advance();
            }
        } else {
            self.unexpected("expected ratio part");
        }
        self.builder.finish_node(); // RATIO_PART
    }

    /// Parse an only-rule target: a type sequence or a Reference(...)
    fn parse_only_target(&mut self) {
        if self.at(FshSyntaxKind::Ident) || self.at(FshSyntaxKind::ReferenceLit) {
            self.add_current_token();
            self.advance();
            self.consume_trivia();
        } else {
            self.unexpected("expected type or Reference target");
        }
    }

    /// Parse a contains item: name (named alias)? CARD flags*
    fn parse_contains_item(&mut self) {
        self.builder.start_node(FshSyntaxKind::ContainsItem);

        if self.at(FshSyntaxKind::Ident) {
            self.add_current_token();
            self.advance();
            self.consume_trivia();
        } else {
            self.unexpected("expected contains item name");
        }

        if self.at(FshSyntaxKind::NamedKw) {
            self.add_current_token();
            self.advance();
            self.consume_trivia();
            if self.at(FshSyntaxKind::Ident) {
                self.add_current_token();
                self.advance();
                self.consume_trivia();
            } else {
                self.unexpected("expected slice name after 'named'");
            }
        }

        if self.at(FshSyntaxKind::Card) {
            self.add_current_token();
            self.advance();
            self.consume_trivia();
        }

        self.parse_flag_sequence();

        self.builder.finish_node(); // CONTAINS_ITEM
    }

    fn parse_flag_sequence(&mut self) {
        while self.current_kind().is_flag() {
            self.add_current_token();
            self.advance();
            self.consume_trivia();
        }
    }

    /// Parse a value set component: * (include|exclude)? ...
    fn parse_vs_component(&mut self) {
        self.builder.start_node(FshSyntaxKind::VsComponent);

        self.expect(FshSyntaxKind::Asterisk);
        self.consume_trivia();

        if self.at(FshSyntaxKind::IncludeKw) || self.at(FshSyntaxKind::ExcludeKw) {
            self.add_current_token();
            self.advance();
            self.consume_trivia();
        }

        if self.at(FshSyntaxKind::CodesKw) {
            self.parse_vs_filter_component();
        } else {
            self.parse_vs_concept_component();
        }

        self.consume_trivia_and_newlines();
        self.builder.finish_node(); // VS_COMPONENT
    }

    /// Parse an enumerated-concept component: code(s) ("display")? (from ...)?
    fn parse_vs_concept_component(&mut self) {
        self.builder.start_node(FshSyntaxKind::VsConceptComponent);

        if self.at(FshSyntaxKind::Code) || self.at(FshSyntaxKind::CommaDelimitedCodes) {
            self.add_current_token();
            self.advance();
            self.consume_trivia();
        } else {
            self.unexpected("expected code");
        }

        // Optional display string
        if self.at(FshSyntaxKind::String) {
            self.add_current_token();
            self.advance();
            self.consume_trivia();
        }

        if self.at(FshSyntaxKind::FromKw) {
            self.parse_vs_component_from();
        }

        self.builder.finish_node(); // VS_CONCEPT_COMPONENT
    }

    /// Parse a filter component: codes from ... (where ...)?
    fn parse_vs_filter_component(&mut self) {
        self.builder.start_node(FshSyntaxKind::VsFilterComponent);

        self.expect(FshSyntaxKind::CodesKw);
        self.consume_trivia();

        if self.at(FshSyntaxKind::FromKw) {
            self.parse_vs_component_from();
        } else {
            self.unexpected("expected 'from' clause");
        }

        self.consume_trivia();
        if self.at(FshSyntaxKind::WhereKw) {
            self.parse_vs_where_clause();
        }

        self.builder.finish_node(); // VS_FILTER_COMPONENT
    }

    /// Parse "from system X and valueset Y" clause
    fn parse_vs_component_from(&mut self) {
        self.builder.start_node(FshSyntaxKind::VsComponentFrom);

        self.expect(FshSyntaxKind::FromKw);
        self.consume_trivia();

        loop {
            if self.at(FshSyntaxKind::SystemKw) {
                self.builder.start_node(FshSyntaxKind::VsFromSystem);
                self.add_current_token();
                self.advance();
                self.consume_trivia();
                if self.at(FshSyntaxKind::Ident) {
                    self.add_current_token();
                    self.advance();
                } else {
                    self.unexpected("expected system reference");
                }
                self.builder.finish_node(); // VS_FROM_SYSTEM
            } else if self.at(FshSyntaxKind::ValuesetRefKw) {
                self.builder.start_node(FshSyntaxKind::VsFromValueset);
                self.add_current_token();
                self.advance();
                self.consume_trivia();
                if self.at(FshSyntaxKind::Ident)
                    || self.at(FshSyntaxKind::CommaDelimitedSequences)
                {
                    self.add_current_token();
                    self.advance();
                } else {
                    self.unexpected("expected value set reference");
                }
                self.builder.finish_node(); // VS_FROM_VALUESET
            } else {
                self.unexpected("expected 'system' or 'valueset'");
                break;
            }

            self.consume_trivia();
            if self.at(FshSyntaxKind::AndKw) {
                self.add_current_token();
                self.advance();
                self.consume_trivia();
            } else {
                break;
            }
        }

        self.builder.finish_node(); // VS_COMPONENT_FROM
    }

    /// Parse "where" filter list: filter (and filter)*
    fn parse_vs_where_clause(&mut self) {
        self.builder.start_node(FshSyntaxKind::VsFilterList);

        self.expect(FshSyntaxKind::WhereKw);
        self.consume_trivia();

        loop {
            self.parse_vs_filter_definition();
            self.consume_trivia();

            if self.at(FshSyntaxKind::AndKw) {
                self.add_current_token();
                self.advance();
                self.consume_trivia();
            } else {
                break;
            }
        }

        self.builder.finish_node(); // VS_FILTER_LIST
    }

    /// Parse single filter: property operator value?
    fn parse_vs_filter_definition(&mut self) {
        self.builder.start_node(FshSyntaxKind::VsFilterDefinition);

        if self.at(FshSyntaxKind::Ident) {
            self.add_current_token();
            self.advance();
            self.consume_trivia();
        } else {
            self.unexpected("expected filter property");
        }

        // Operator: "=" or a hyphenated word such as is-a, descendent-of
        self.builder.start_node(FshSyntaxKind::VsFilterOperator);
        if self.at(FshSyntaxKind::Equals) || self.at(FshSyntaxKind::Ident) {
            self.add_current_token();
            self.advance();
        } else {
            self.unexpected("expected filter operator");
        }
        self.builder.finish_node(); // VS_FILTER_OPERATOR
        self.consume_trivia();

        // Value is optional (the exists operator takes none when malformed;
        // the visitor reports missing values)
        if !self.at_end()
            && !self.at(FshSyntaxKind::AndKw)
            && !self.at(FshSyntaxKind::Newline)
            && !self.at(FshSyntaxKind::CommentLine)
            && !self.at(FshSyntaxKind::Eof)
        {
            self.builder.start_node(FshSyntaxKind::VsFilterValue);
            self.add_current_token();
            self.advance();
            self.builder.finish_node(); // VS_FILTER_VALUE
        }

        self.builder.finish_node(); // VS_FILTER_DEFINITION
    }

    // Helper methods

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len() || self.at(FshSyntaxKind::Eof)
    }

    fn current(&self) -> Option<&CstToken> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> FshSyntaxKind {
        self.current().map(|t| t.kind).unwrap_or(FshSyntaxKind::Eof)
    }

    fn current_span(&self) -> CstSpan {
        self.current().map(|t| t.span.clone()).unwrap_or(0..0)
    }

    fn at(&self, kind: FshSyntaxKind) -> bool {
        self.current_kind() == kind
    }

    fn at_trivia(&self) -> bool {
        matches!(
            self.current_kind(),
            FshSyntaxKind::Whitespace | FshSyntaxKind::CommentLine | FshSyntaxKind::CommentBlock
        )
    }

    fn at_entity_keyword(&self) -> bool {
        self.current_kind().is_entity_keyword()
    }

    fn at_path_token(&self) -> bool {
        match self.current_kind() {
            FshSyntaxKind::Ident | FshSyntaxKind::CommaDelimitedSequences => true,
            // Paths may collide with rule keywords (e.g. an element named
            // "system"); accept them when they lead a rule
            k if k.is_keyword() => true,
            _ => false,
        }
    }

    /// Kind of the first non-trivia token after the current path token
    fn peek_after_path(&self) -> FshSyntaxKind {
        self.peek_past(1)
    }

    /// Kind of the nth non-trivia token from the current position
    /// (0 = current)
    fn peek_past(&self, n: usize) -> FshSyntaxKind {
        let mut remaining = n;
        let mut idx = self.pos;
        while idx < self.tokens.len() {
            let kind = self.tokens[idx].kind;
            if kind == FshSyntaxKind::Whitespace
                || kind == FshSyntaxKind::CommentLine
                || kind == FshSyntaxKind::CommentBlock
            {
                idx += 1;
                continue;
            }
            if remaining == 0 {
                return kind;
            }
            remaining -= 1;
            idx += 1;
        }
        FshSyntaxKind::Eof
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn add_current_token(&mut self) {
        if let Some(token) = self.tokens.get(self.pos) {
            self.builder.add_token(token);
        }
    }

    fn expect(&mut self, kind: FshSyntaxKind) {
        if self.at(kind) {
            self.add_current_token();
            self.advance();
        } else {
            self.unexpected(&format!("expected {kind}"));
        }
    }

    /// Record a syntax error at the current token without consuming it
    fn unexpected(&mut self, message: &str) {
        let found = self.current_kind();
        self.errors.push(SyntaxError::new(
            format!("{message}, found {found}"),
            self.current_span(),
        ));
        self.builder.token(FshSyntaxKind::Error, "");
    }

    /// Record an error, then consume the rest of the line into an Error node
    fn error_and_recover(&mut self, message: &str) {
        self.errors.push(SyntaxError::new(
            format!("{message}, found {}", self.current_kind()),
            self.current_span(),
        ));

        self.builder.start_node(FshSyntaxKind::Error);
        while !self.at_end()
            && !self.at(FshSyntaxKind::Newline)
            && !self.at_entity_keyword()
        {
            self.add_current_token();
            self.advance();
        }
        self.builder.finish_node();
    }

    fn consume_trivia(&mut self) {
        while self.at_trivia() {
            self.add_current_token();
            self.advance();
        }
    }

    fn consume_trivia_and_newlines(&mut self) {
        while self.at_trivia() || self.at(FshSyntaxKind::Newline) {
            self.add_current_token();
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> FshSyntaxNode {
        let (cst, lex_errors, parse_errors) = parse_fsh(source);
        assert!(lex_errors.is_empty(), "lexer errors: {lex_errors:?}");
        assert!(parse_errors.is_empty(), "parser errors: {parse_errors:?}");
        cst
    }

    #[test]
    fn test_parse_simple_profile() {
        let source = "Profile: MyPatient\nParent: Patient";
        let cst = parse_ok(source);

        assert_eq!(cst.text().to_string(), source);

        let profile = cst
            .children()
            .find(|n| n.kind() == FshSyntaxKind::Profile)
            .expect("profile node");
        assert!(
            profile
                .children()
                .any(|n| n.kind() == FshSyntaxKind::ParentClause)
        );
    }

    #[test]
    fn test_parse_profile_with_metadata_and_rules() {
        let source = r#"Profile: MyPatient
Parent: Patient
Id: my-patient
Title: "My Patient Profile"
Description: "A test profile"
* name 1..1 MS
* birthDate 0..1"#;

        let cst = parse_ok(source);
        assert_eq!(cst.text().to_string(), source);

        let profile = cst
            .children()
            .find(|n| n.kind() == FshSyntaxKind::Profile)
            .unwrap();

        let card_rules: Vec<_> = profile
            .children()
            .filter(|n| n.kind() == FshSyntaxKind::CardRule)
            .collect();
        assert_eq!(card_rules.len(), 2);
    }

    #[test]
    fn test_rule_kind_dispatch() {
        let source = r#"Extension: E
* value[x] only Quantity or Reference(Device)
* status from StatusVS (required)
* code = #final
* category MS SU
* component contains systolic 1..1 and diastolic 0..1
* ^short = "short text"
"#;
        let cst = parse_ok(source);
        let ext = cst
            .children()
            .find(|n| n.kind() == FshSyntaxKind::Extension)
            .unwrap();

        let kinds: Vec<_> = ext
            .children()
            .filter(|n| n.kind().is_node() && n.kind() != FshSyntaxKind::Path)
            .map(|n| n.kind())
            .collect();
        assert_eq!(
            kinds,
            vec![
                FshSyntaxKind::OnlyRule,
                FshSyntaxKind::ValuesetRule,
                FshSyntaxKind::FixedValueRule,
                FshSyntaxKind::FlagRule,
                FshSyntaxKind::ContainsRule,
                FshSyntaxKind::CaretValueRule,
            ]
        );
    }

    #[test]
    fn test_alias_parses_url() {
        let source = "Alias: LNC = http://loinc.org";
        let cst = parse_ok(source);
        let alias = cst
            .children()
            .find(|n| n.kind() == FshSyntaxKind::Alias)
            .unwrap();
        let text = alias.text().to_string();
        assert!(text.contains("http://loinc.org"));
    }

    #[test]
    fn test_valueset_components() {
        let source = r#"ValueSet: VS
* include codes from system http://loinc.org where concept is-a #1234
* http://s#a "Alpha"
* exclude SYS#b
"#;
        let cst = parse_ok(source);
        let vs = cst
            .children()
            .find(|n| n.kind() == FshSyntaxKind::ValueSet)
            .unwrap();

        let components: Vec<_> = vs
            .children()
            .filter(|n| n.kind() == FshSyntaxKind::VsComponent)
            .collect();
        assert_eq!(components.len(), 3);

        let first = &components[0];
        assert!(
            first
                .children()
                .any(|n| n.kind() == FshSyntaxKind::VsFilterComponent)
        );
    }

    #[test]
    fn test_instance_parses() {
        let source = r#"Instance: MyExample
InstanceOf: Patient
Title: "Example"
* name.family = "Chalmers"
"#;
        let cst = parse_ok(source);
        let instance = cst
            .children()
            .find(|n| n.kind() == FshSyntaxKind::Instance)
            .unwrap();
        assert!(
            instance
                .children()
                .any(|n| n.kind() == FshSyntaxKind::InstanceofClause)
        );
        assert!(
            instance
                .children()
                .any(|n| n.kind() == FshSyntaxKind::FixedValueRule)
        );
    }

    #[test]
    fn test_quantity_and_ratio_values() {
        let source = "Instance: I\nInstanceOf: Observation\n* valueQuantity = 5.4 'mg'\n* valueRatio = 1 : 128\n";
        let cst = parse_ok(source);
        let instance = cst
            .children()
            .find(|n| n.kind() == FshSyntaxKind::Instance)
            .unwrap();

        let quantity = instance
            .descendants()
            .find(|n| n.kind() == FshSyntaxKind::Quantity);
        assert!(quantity.is_some());

        let ratio = instance
            .descendants()
            .find(|n| n.kind() == FshSyntaxKind::Ratio);
        assert!(ratio.is_some());
    }

    #[test]
    fn test_garbage_produces_error_not_panic() {
        let source = "Profile MyPatient\n???\n";
        let (cst, _lex, parse_errors) = parse_fsh(source);
        assert!(!parse_errors.is_empty());
        // Best-effort tree still reproduces the source
        assert_eq!(cst.text().to_string(), source);
    }

    #[test]
    fn test_lossless_with_comments() {
        let source = "// header\nProfile: P // trailing\nParent: Patient\n";
        let cst = parse_ok(source);
        assert_eq!(cst.text().to_string(), source);
    }
}
