//! Typed document IR produced by the importer
//!
//! One [`FshDocument`] per raw input, holding its entities in declaration
//! order. Rules, literal values, and value-set components are closed sum
//! types with exhaustive matching; every produced node carries the
//! [`Location`] it was built from, so downstream tooling can emit
//! file/line/column diagnostics without re-parsing.

use indexmap::IndexMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use crate::diagnostics::Location;

/// The document IR: entities of one source file, keyed by name in
/// insertion order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FshDocument {
    /// Originating file path
    pub file: PathBuf,
    /// Alias name -> URL, exactly as written
    pub aliases: IndexMap<String, String>,
    pub profiles: IndexMap<String, StructureDef>,
    pub extensions: IndexMap<String, StructureDef>,
    pub instances: IndexMap<String, FshInstance>,
    pub value_sets: IndexMap<String, FshValueSet>,
}

impl FshDocument {
    pub fn new(file: PathBuf) -> Self {
        Self {
            file,
            ..Default::default()
        }
    }
}

/// Shared shape of Profile and Extension entities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureDef {
    pub name: String,
    /// Defaults to `name` when no Id clause is present
    pub id: String,
    /// Resolved parent URL, or the default literal when absent
    pub parent: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub rules: Vec<SdRule>,
    pub source: Location,
}

/// An instance entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FshInstance {
    pub name: String,
    /// Resolved InstanceOf URL (required in source)
    pub instance_of: String,
    pub title: Option<String>,
    pub rules: Vec<FixedValueRule>,
    pub source: Location,
}

/// A value set entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FshValueSet {
    pub name: String,
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub components: Vec<VsComponent>,
    pub source: Location,
}

// ============================================================================
// Rules
// ============================================================================

/// A structure definition rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SdRule {
    Card(CardRule),
    Flag(FlagRule),
    ValueSet(ValueSetRule),
    FixedValue(FixedValueRule),
    Only(OnlyRule),
    Contains(ContainsRule),
    CaretValue(CaretValueRule),
}

impl SdRule {
    pub fn path(&self) -> &str {
        match self {
            SdRule::Card(r) => &r.path,
            SdRule::Flag(r) => &r.path,
            SdRule::ValueSet(r) => &r.path,
            SdRule::FixedValue(r) => &r.path,
            SdRule::Only(r) => &r.path,
            SdRule::Contains(r) => &r.path,
            SdRule::CaretValue(r) => &r.path,
        }
    }

    pub fn source(&self) -> &Location {
        match self {
            SdRule::Card(r) => &r.source,
            SdRule::Flag(r) => &r.source,
            SdRule::ValueSet(r) => &r.source,
            SdRule::FixedValue(r) => &r.source,
            SdRule::Only(r) => &r.source,
            SdRule::Contains(r) => &r.source,
            SdRule::CaretValue(r) => &r.source,
        }
    }
}

/// Cardinality constraint; `max` stays a string because `*` is a legal
/// upper bound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRule {
    pub path: String,
    pub min: u32,
    pub max: String,
    pub source: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagRule {
    pub path: String,
    pub must_support: bool,
    pub summary: bool,
    pub modifier: bool,
    pub source: Location,
}

/// Binding strength of a value set reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingStrength {
    Example,
    Preferred,
    Extensible,
    Required,
}

impl Default for BindingStrength {
    fn default() -> Self {
        Self::Required
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueSetRule {
    pub path: String,
    /// Resolved value set URL (or the symbol verbatim when unresolved)
    pub value_set: String,
    pub strength: BindingStrength,
    pub source: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixedValueRule {
    pub path: String,
    pub value: FshValue,
    pub source: Location,
}

/// One permitted type of an only rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnlyRuleType {
    /// Resolved type URL (or the symbol verbatim)
    pub r#type: String,
    pub is_reference: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlyRule {
    pub path: String,
    pub types: Vec<OnlyRuleType>,
    pub source: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainsRule {
    pub path: String,
    pub items: Vec<String>,
    pub source: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaretValueRule {
    /// Element path; empty when the rule addresses the artifact itself
    pub path: String,
    /// Caret path with the leading `^` stripped
    pub caret_path: String,
    pub value: FshValue,
    pub source: Location,
}

// ============================================================================
// Literal values
// ============================================================================

/// A literal value on the right-hand side of an assignment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum FshValue {
    String(String),
    MultilineString(String),
    Number(Decimal),
    /// Raw datetime text as written
    DateTime(String),
    /// Raw time text as written
    Time(String),
    Boolean(bool),
    Code(FshCode),
    Quantity(FshQuantity),
    Ratio(FshRatio),
    Reference(FshReference),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FshCode {
    pub code: String,
    /// Resolved system URL, when one was written or adopted
    pub system: Option<String>,
    pub display: Option<String>,
}

impl FshCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            system: None,
            display: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FshQuantity {
    pub value: Decimal,
    /// UCUM-coded unit; absent for bare-number ratio parts
    pub unit: Option<FshCode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FshRatio {
    pub numerator: FshQuantity,
    pub denominator: FshQuantity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FshReference {
    /// Resolved reference URL (or the symbol verbatim)
    pub reference: String,
    pub display: Option<String>,
}

// ============================================================================
// ValueSet components
// ============================================================================

/// Source clause of a value set component
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VsFrom {
    pub system: Option<String>,
    pub value_sets: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum VsComponent {
    Concept(VsConceptComponent),
    Filter(VsFilterComponent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VsConceptComponent {
    pub inclusion: bool,
    pub from: VsFrom,
    pub concepts: Vec<FshCode>,
}

impl VsConceptComponent {
    /// Components merge when inclusion, system and value-set list agree
    /// (value sets compared order-insensitively)
    pub fn same_scope(&self, other: &Self) -> bool {
        if self.inclusion != other.inclusion || self.from.system != other.from.system {
            return false;
        }
        let mut left = self.from.value_sets.clone();
        let mut right = other.from.value_sets.clone();
        left.sort();
        right.sort();
        left == right
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VsFilterComponent {
    pub inclusion: bool,
    pub from: VsFrom,
    pub filters: Vec<VsFilter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VsFilter {
    pub property: String,
    pub operator: VsOperator,
    pub value: Option<VsFilterValue>,
}

/// Filter operators of the value set composition grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VsOperator {
    #[serde(rename = "=")]
    Equals,
    IsA,
    DescendentOf,
    IsNotA,
    Regex,
    In,
    NotIn,
    Generalizes,
    Exists,
}

impl VsOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            VsOperator::Equals => "=",
            VsOperator::IsA => "is-a",
            VsOperator::DescendentOf => "descendent-of",
            VsOperator::IsNotA => "is-not-a",
            VsOperator::Regex => "regex",
            VsOperator::In => "in",
            VsOperator::NotIn => "not-in",
            VsOperator::Generalizes => "generalizes",
            VsOperator::Exists => "exists",
        }
    }
}

impl FromStr for VsOperator {
    type Err = ();

    /// Case-insensitive; folds the British spelling `descendant-of`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.to_lowercase().replace("descendant", "descendent");
        match lowered.as_str() {
            "=" => Ok(VsOperator::Equals),
            "is-a" => Ok(VsOperator::IsA),
            "descendent-of" => Ok(VsOperator::DescendentOf),
            "is-not-a" => Ok(VsOperator::IsNotA),
            "regex" => Ok(VsOperator::Regex),
            "in" => Ok(VsOperator::In),
            "not-in" => Ok(VsOperator::NotIn),
            "generalizes" => Ok(VsOperator::Generalizes),
            "exists" => Ok(VsOperator::Exists),
            _ => Err(()),
        }
    }
}

/// Value of a value set filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum VsFilterValue {
    String(String),
    Code(FshCode),
    /// Regex body without the surrounding slashes
    Regex(String),
    Boolean(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_parsing() {
        assert_eq!("is-a".parse::<VsOperator>(), Ok(VsOperator::IsA));
        assert_eq!("=".parse::<VsOperator>(), Ok(VsOperator::Equals));
        assert_eq!(
            "descendant-of".parse::<VsOperator>(),
            Ok(VsOperator::DescendentOf)
        );
        assert_eq!("IS-A".parse::<VsOperator>(), Ok(VsOperator::IsA));
        assert!("near-of".parse::<VsOperator>().is_err());
    }

    #[test]
    fn test_concept_component_scope() {
        let a = VsConceptComponent {
            inclusion: true,
            from: VsFrom {
                system: Some("http://s".to_string()),
                value_sets: vec!["b".to_string(), "a".to_string()],
            },
            concepts: vec![],
        };
        let b = VsConceptComponent {
            inclusion: true,
            from: VsFrom {
                system: Some("http://s".to_string()),
                value_sets: vec!["a".to_string(), "b".to_string()],
            },
            concepts: vec![],
        };
        let c = VsConceptComponent {
            inclusion: false,
            ..a.clone()
        };

        assert!(a.same_scope(&b));
        assert!(!a.same_scope(&c));
    }

    #[test]
    fn test_document_preserves_insertion_order() {
        let mut doc = FshDocument::new("test.fsh".into());
        doc.aliases.insert("Z".to_string(), "http://z".to_string());
        doc.aliases.insert("A".to_string(), "http://a".to_string());

        let keys: Vec<_> = doc.aliases.keys().cloned().collect();
        assert_eq!(keys, vec!["Z", "A"]);
    }
}
