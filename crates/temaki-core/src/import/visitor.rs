//! Second import pass: typed IR construction
//!
//! Walks each parse tree through the typed AST layer and produces the
//! document IR, resolving every symbolic cross-reference through the
//! [`Resolver`], deduplicating metadata keys, expanding contains rules,
//! and merging equivalent value-set concept components. All failures are
//! diagnostics; nothing is thrown.

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::cst::FshSyntaxKind;
use crate::cst::ast::{
    self, AstNode, MetadataClause, OnlyTarget, ValueExpr, VsComponentBody, VsFilterValueExpr,
};
use crate::diagnostics::{Diagnostic, DiagnosticCollector, Location};
use crate::ir::{
    BindingStrength, CardRule, CaretValueRule, ContainsRule, FixedValueRule, FlagRule, FshCode,
    FshDocument, FshInstance, FshQuantity, FshRatio, FshReference, FshValue, FshValueSet,
    OnlyRule, OnlyRuleType, SdRule, StructureDef, VsComponent, VsConceptComponent, VsFilter,
    VsFilterComponent, VsFilterValue, VsFrom, VsOperator,
};

use super::ParsedSource;
use super::preprocessor::ResolveKind;
use super::resolver::Resolver;
use super::text;

/// Canonical URL of the UCUM code system, used for quantity units
const UCUM_SYSTEM: &str = "http://unitsofmeasure.org";

/// Allowed kinds when resolving Parent and InstanceOf references
const PARENT_KINDS: &[ResolveKind] = &[
    ResolveKind::Alias,
    ResolveKind::Profile,
    ResolveKind::Extension,
    ResolveKind::Resource,
    ResolveKind::Type,
];

/// Allowed kinds when resolving only-rule targets
const TYPE_KINDS: &[ResolveKind] = &[
    ResolveKind::Alias,
    ResolveKind::Profile,
    ResolveKind::Extension,
];

/// Allowed kinds when resolving reference literals
const REFERENCE_KINDS: &[ResolveKind] = &[
    ResolveKind::Alias,
    ResolveKind::Profile,
    ResolveKind::Extension,
    ResolveKind::ValueSet,
    ResolveKind::CodeSystem,
    ResolveKind::Instance,
];

/// Allowed kinds when resolving code systems
const CODE_SYSTEM_KINDS: &[ResolveKind] = &[ResolveKind::Alias, ResolveKind::CodeSystem];

/// Allowed kinds when resolving value set references
const VALUE_SET_KINDS: &[ResolveKind] = &[ResolveKind::Alias, ResolveKind::ValueSet];

/// Visit one parsed source and build its document IR
pub fn visit_document(
    source: &ParsedSource,
    resolver: &Resolver<'_>,
    collector: &mut dyn DiagnosticCollector,
) -> FshDocument {
    let visitor = DocumentVisitor { source, resolver };
    visitor.visit(collector)
}

struct DocumentVisitor<'a> {
    source: &'a ParsedSource,
    resolver: &'a Resolver<'a>,
}

enum SdKind {
    Profile,
    Extension,
}

impl SdKind {
    fn display(&self) -> &'static str {
        match self {
            SdKind::Profile => "Profile",
            SdKind::Extension => "Extension",
        }
    }

    /// Default parent when no Parent clause is declared
    fn default_parent(&self) -> &'static str {
        match self {
            SdKind::Profile => "Resource",
            SdKind::Extension => "Extension",
        }
    }
}

impl<'a> DocumentVisitor<'a> {
    fn visit(&self, collector: &mut dyn DiagnosticCollector) -> FshDocument {
        let mut doc = FshDocument::new(self.source.path.clone());
        let document = &self.source.document;

        for alias in document.aliases() {
            let (Some(name), Some(url)) = (alias.name(), alias.value()) else {
                continue;
            };
            if doc.aliases.contains_key(&name) {
                collector.collect(
                    Diagnostic::error(
                        format!("Alias named '{name}' is already defined in this document."),
                        self.source.node_location(alias.syntax()),
                    )
                    .with_source("visitor"),
                );
                continue;
            }
            doc.aliases.insert(name, url);
        }

        for profile in document.profiles() {
            let clauses: Vec<_> = profile.clauses().collect();
            let rules: Vec<_> = profile.rules().collect();
            if let Some(sd) = self.visit_structure_def(
                SdKind::Profile,
                profile.name(),
                profile.syntax(),
                clauses,
                rules,
                collector,
            ) {
                self.insert_entity(&mut doc.profiles, sd.name.clone(), sd, "Profile", collector);
            }
        }

        for extension in document.extensions() {
            let clauses: Vec<_> = extension.clauses().collect();
            let rules: Vec<_> = extension.rules().collect();
            if let Some(sd) = self.visit_structure_def(
                SdKind::Extension,
                extension.name(),
                extension.syntax(),
                clauses,
                rules,
                collector,
            ) {
                self.insert_entity(
                    &mut doc.extensions,
                    sd.name.clone(),
                    sd,
                    "Extension",
                    collector,
                );
            }
        }

        for instance in document.instances() {
            if let Some(built) = self.visit_instance(&instance, collector) {
                self.insert_entity(
                    &mut doc.instances,
                    built.name.clone(),
                    built,
                    "Instance",
                    collector,
                );
            }
        }

        for value_set in document.value_sets() {
            if let Some(built) = self.visit_value_set(&value_set, collector) {
                self.insert_entity(
                    &mut doc.value_sets,
                    built.name.clone(),
                    built,
                    "ValueSet",
                    collector,
                );
            }
        }

        doc
    }

    /// Insert an entity, keeping the first on (kind, name) collisions
    fn insert_entity<T>(
        &self,
        map: &mut indexmap::IndexMap<String, T>,
        name: String,
        entity: T,
        kind: &str,
        collector: &mut dyn DiagnosticCollector,
    ) where
        T: EntityLocation,
    {
        if map.contains_key(&name) {
            collector.collect(
                Diagnostic::error(
                    format!("{kind} named '{name}' is already defined in this document."),
                    entity.location().clone(),
                )
                .with_source("visitor"),
            );
            return;
        }
        map.insert(name, entity);
    }

    // ========================================================================
    // Structure definitions (Profile / Extension)
    // ========================================================================

    fn visit_structure_def(
        &self,
        kind: SdKind,
        name: Option<String>,
        node: &crate::cst::FshSyntaxNode,
        clauses: Vec<MetadataClause>,
        rules: Vec<ast::Rule>,
        collector: &mut dyn DiagnosticCollector,
    ) -> Option<StructureDef> {
        let name = name?;
        let location = self.source.node_location(node);

        let mut id: Option<String> = None;
        let mut parent: Option<String> = None;
        let mut title: Option<String> = None;
        let mut description: Option<String> = None;
        let mut seen: Vec<(&'static str, String)> = Vec::new();

        for clause in clauses {
            let key = clause.key();
            let Some(raw) = self.clause_raw_value(&clause) else {
                continue;
            };

            if let Some((_, prior)) = seen.iter().find(|(k, _)| *k == key) {
                self.report_duplicate_metadata(key, prior, clause.syntax(), collector);
                continue;
            }

            match &clause {
                MetadataClause::Id(_) => id = Some(raw.clone()),
                MetadataClause::Parent(_) => {
                    parent = Some(self.resolver.resolve(&raw, PARENT_KINDS));
                }
                MetadataClause::Title(_) => title = Some(raw.clone()),
                MetadataClause::Description(_) => description = Some(raw.clone()),
                MetadataClause::InstanceOf(_) => {
                    debug!(
                        entity = %name,
                        "ignoring InstanceOf metadata on a {}",
                        kind.display()
                    );
                    continue;
                }
            }
            seen.push((key, raw));
        }

        let mut out_rules = Vec::new();
        for rule in rules {
            self.visit_sd_rule(&rule, &mut out_rules, collector);
        }

        Some(StructureDef {
            id: id.unwrap_or_else(|| name.clone()),
            parent: parent.unwrap_or_else(|| kind.default_parent().to_string()),
            name,
            title,
            description,
            rules: out_rules,
            source: location,
        })
    }

    /// Raw (unescaped) clause value used for dedup bookkeeping
    fn clause_raw_value(&self, clause: &MetadataClause) -> Option<String> {
        match clause {
            MetadataClause::Parent(c) => c.value(),
            MetadataClause::Id(c) => c.value(),
            MetadataClause::InstanceOf(c) => c.value(),
            MetadataClause::Title(c) => c.value_token().map(|t| self.string_token_value(&t)),
            MetadataClause::Description(c) => {
                c.value_token().map(|t| self.string_token_value(&t))
            }
        }
    }

    fn string_token_value(&self, token: &crate::cst::FshSyntaxToken) -> String {
        match token.kind() {
            FshSyntaxKind::MultilineString => text::trim_multiline_string(token.text()),
            _ => text::unescape_string(token.text()),
        }
    }

    fn report_duplicate_metadata(
        &self,
        key: &str,
        prior: &str,
        node: &crate::cst::FshSyntaxNode,
        collector: &mut dyn DiagnosticCollector,
    ) {
        collector.collect(
            Diagnostic::error(
                format!("Metadata field '{key}' already declared with value '{prior}'."),
                self.source.node_location(node),
            )
            .with_source("visitor"),
        );
    }

    // ========================================================================
    // Rules
    // ========================================================================

    fn visit_sd_rule(
        &self,
        rule: &ast::Rule,
        out: &mut Vec<SdRule>,
        collector: &mut dyn DiagnosticCollector,
    ) {
        let location = self.source.node_location(rule.syntax());

        match rule {
            ast::Rule::Card(card) => {
                let Some(path) = card.path() else {
                    return self.unrecognized_rule(rule, collector);
                };
                let Some((min, max)) = card.cardinality().and_then(|c| parse_card(&c)) else {
                    return self.unrecognized_rule(rule, collector);
                };
                out.push(SdRule::Card(CardRule {
                    path: path.clone(),
                    min,
                    max,
                    source: location.clone(),
                }));
                if let Some(flags) = build_flag_rule(&path, &card.flags(), &location) {
                    out.push(SdRule::Flag(flags));
                }
            }

            ast::Rule::Flag(flag) => {
                let Some(path_text) = flag.path() else {
                    return self.unrecognized_rule(rule, collector);
                };
                let flags = flag.flags();
                for path in text::split_sequences(&path_text) {
                    if let Some(built) = build_flag_rule(&path, &flags, &location) {
                        out.push(SdRule::Flag(built));
                    }
                }
            }

            ast::Rule::ValueSet(binding) => {
                let (Some(path), Some(value_set)) = (binding.path(), binding.value_set()) else {
                    return self.unrecognized_rule(rule, collector);
                };
                let strength = match binding.strength() {
                    Some(FshSyntaxKind::ExampleKw) => BindingStrength::Example,
                    Some(FshSyntaxKind::PreferredKw) => BindingStrength::Preferred,
                    Some(FshSyntaxKind::ExtensibleKw) => BindingStrength::Extensible,
                    _ => BindingStrength::Required,
                };
                out.push(SdRule::ValueSet(crate::ir::ValueSetRule {
                    path,
                    value_set: self.resolver.resolve(&value_set, VALUE_SET_KINDS),
                    strength,
                    source: location,
                }));
            }

            ast::Rule::FixedValue(fixed) => {
                let Some(path) = fixed.path() else {
                    return self.unrecognized_rule(rule, collector);
                };
                let Some(value) = fixed.value().and_then(|v| self.build_value(v)) else {
                    // The missing value was already reported as a syntax error
                    debug!(%path, "skipping fixed value rule with undefined value");
                    return;
                };
                out.push(SdRule::FixedValue(FixedValueRule {
                    path,
                    value,
                    source: location,
                }));
            }

            ast::Rule::Only(only) => {
                let Some(path) = only.path() else {
                    return self.unrecognized_rule(rule, collector);
                };
                let mut types = Vec::new();
                for target in only.targets() {
                    match target {
                        OnlyTarget::Type(symbol) => types.push(OnlyRuleType {
                            r#type: self.resolver.resolve(&symbol, TYPE_KINDS),
                            is_reference: false,
                        }),
                        OnlyTarget::Reference(literal) => {
                            for symbol in reference_targets(&literal) {
                                types.push(OnlyRuleType {
                                    r#type: self.resolver.resolve(&symbol, TYPE_KINDS),
                                    is_reference: true,
                                });
                            }
                        }
                    }
                }
                if types.is_empty() {
                    return self.unrecognized_rule(rule, collector);
                }
                out.push(SdRule::Only(OnlyRule {
                    path,
                    types,
                    source: location,
                }));
            }

            ast::Rule::Contains(contains) => {
                let Some(path) = contains.path() else {
                    return self.unrecognized_rule(rule, collector);
                };
                let items = contains.items();
                let names: Vec<String> = items.iter().filter_map(|item| item.name()).collect();
                if names.is_empty() {
                    return self.unrecognized_rule(rule, collector);
                }
                out.push(SdRule::Contains(ContainsRule {
                    path: path.clone(),
                    items: names,
                    source: location,
                }));

                // Synthesised per-item rules, in declaration order
                for item in &items {
                    let Some(name) = item.name() else { continue };
                    let item_path = format!("{path}[{name}]");
                    let item_location = self.source.node_location(item.syntax());

                    match item.cardinality().and_then(|c| parse_card(&c)) {
                        Some((min, max)) => out.push(SdRule::Card(CardRule {
                            path: item_path.clone(),
                            min,
                            max,
                            source: item_location.clone(),
                        })),
                        None => {
                            collector.collect(
                                Diagnostic::warning(
                                    format!("Contains item '{name}' is missing a cardinality."),
                                    item_location.clone(),
                                )
                                .with_source("visitor"),
                            );
                        }
                    }

                    if let Some(flags) = build_flag_rule(&item_path, &item.flags(), &item_location)
                    {
                        out.push(SdRule::Flag(flags));
                    }
                }
            }

            ast::Rule::CaretValue(caret) => {
                let Some(caret_path) = caret.caret_path() else {
                    return self.unrecognized_rule(rule, collector);
                };
                let Some(value) = caret.value().and_then(|v| self.build_value(v)) else {
                    debug!(%caret_path, "skipping caret rule with undefined value");
                    return;
                };
                out.push(SdRule::CaretValue(CaretValueRule {
                    path: caret.path().unwrap_or_default(),
                    caret_path,
                    value,
                    source: location,
                }));
            }

            ast::Rule::Path(_) => self.unrecognized_rule(rule, collector),
        }
    }

    fn unrecognized_rule(&self, rule: &ast::Rule, collector: &mut dyn DiagnosticCollector) {
        let location = self.source.node_location(rule.syntax());
        let text = self.source.node_text_first_line(rule.syntax());
        warn!(rule = %text, "unrecognized rule");
        collector.collect(
            Diagnostic::warning(format!("Unrecognized rule: {text}"), location)
                .with_source("visitor"),
        );
    }

    // ========================================================================
    // Values
    // ========================================================================

    fn build_value(&self, expr: ValueExpr) -> Option<FshValue> {
        match expr {
            ValueExpr::Str(raw) => Some(FshValue::String(text::unescape_string(&raw))),
            ValueExpr::Multiline(raw) => {
                Some(FshValue::MultilineString(text::trim_multiline_string(&raw)))
            }
            ValueExpr::Number(raw) => raw.parse::<Decimal>().ok().map(FshValue::Number),
            ValueExpr::DateTime(raw) => Some(FshValue::DateTime(raw)),
            ValueExpr::Time(raw) => Some(FshValue::Time(raw)),
            ValueExpr::Reference { text: literal, display } => {
                let first = reference_targets(&literal).into_iter().next()?;
                Some(FshValue::Reference(FshReference {
                    reference: self.resolver.resolve(&first, REFERENCE_KINDS),
                    display: display.map(|d| text::unescape_string(&d)),
                }))
            }
            ValueExpr::Code { text: literal, display } => {
                let code = self.build_code(&literal, display.as_deref())?;
                Some(FshValue::Code(code))
            }
            ValueExpr::Quantity(quantity) => {
                let value = quantity.number()?.parse::<Decimal>().ok()?;
                let quantity_unit = quantity.unit()?;
                let unit = unwrap_unit(&quantity_unit);
                Some(FshValue::Quantity(FshQuantity {
                    value,
                    unit: Some(ucum_code(unit)),
                }))
            }
            ValueExpr::Ratio(ratio) => {
                let parts = ratio.parts();
                if parts.len() != 2 {
                    return None;
                }
                let numerator = self.build_ratio_part(&parts[0])?;
                let denominator = self.build_ratio_part(&parts[1])?;
                Some(FshValue::Ratio(FshRatio {
                    numerator,
                    denominator,
                }))
            }
            ValueExpr::Bool(b) => Some(FshValue::Boolean(b)),
        }
    }

    fn build_ratio_part(&self, part: &ast::RatioPartNode) -> Option<FshQuantity> {
        let value = part.number()?.parse::<Decimal>().ok()?;
        let unit = part.unit().map(|u| ucum_code(unwrap_unit(&u)));
        Some(FshQuantity { value, unit })
    }

    /// Build a code from its literal text: `[SYSTEM]#code ["display"]`
    fn build_code(&self, literal: &str, display: Option<&str>) -> Option<FshCode> {
        let (system_part, code_part) = literal.split_once('#')?;

        let code = if code_part.starts_with('"') {
            text::unescape_string(code_part)
        } else {
            code_part.to_string()
        };

        let system = if system_part.is_empty() {
            None
        } else {
            Some(self.resolver.resolve(system_part, CODE_SYSTEM_KINDS))
        };

        Some(FshCode {
            code,
            system,
            display: display.map(|d| text::unescape_string(d)),
        })
    }

    // ========================================================================
    // Instances
    // ========================================================================

    fn visit_instance(
        &self,
        instance: &ast::Instance,
        collector: &mut dyn DiagnosticCollector,
    ) -> Option<FshInstance> {
        let name = instance.name()?;
        let location = self.source.node_location(instance.syntax());

        let mut instance_of: Option<String> = None;
        let mut title: Option<String> = None;
        let mut seen: Vec<(&'static str, String)> = Vec::new();

        for clause in instance.clauses() {
            let key = clause.key();
            let Some(raw) = self.clause_raw_value(&clause) else {
                continue;
            };

            if let Some((_, prior)) = seen.iter().find(|(k, _)| *k == key) {
                self.report_duplicate_metadata(key, prior, clause.syntax(), collector);
                continue;
            }

            match &clause {
                MetadataClause::InstanceOf(_) => {
                    instance_of = Some(self.resolver.resolve(&raw, PARENT_KINDS));
                }
                MetadataClause::Title(_) => title = Some(raw.clone()),
                _ => {
                    debug!(instance = %name, key, "ignoring metadata on an Instance");
                    continue;
                }
            }
            seen.push((key, raw));
        }

        let Some(instance_of) = instance_of else {
            tracing::error!(instance = %name, "missing InstanceOf");
            collector.collect(
                Diagnostic::error(
                    format!("Instance '{name}' is missing required metadata field 'InstanceOf'."),
                    location,
                )
                .with_code("RequiredMetadataError")
                .with_source("visitor"),
            );
            return None;
        };

        let mut rules = Vec::new();
        for rule in instance.rules() {
            match &rule {
                ast::Rule::FixedValue(fixed) => {
                    let Some(path) = fixed.path() else {
                        self.unrecognized_rule(&rule, collector);
                        continue;
                    };
                    let Some(value) = fixed.value().and_then(|v| self.build_value(v)) else {
                        debug!(%path, "skipping fixed value rule with undefined value");
                        continue;
                    };
                    rules.push(FixedValueRule {
                        path,
                        value,
                        source: self.source.node_location(rule.syntax()),
                    });
                }
                _ => self.unrecognized_rule(&rule, collector),
            }
        }

        Some(FshInstance {
            name,
            instance_of,
            title,
            rules,
            source: self.source.node_location(instance.syntax()),
        })
    }

    // ========================================================================
    // Value sets
    // ========================================================================

    fn visit_value_set(
        &self,
        value_set: &ast::ValueSet,
        collector: &mut dyn DiagnosticCollector,
    ) -> Option<FshValueSet> {
        let name = value_set.name()?;
        let location = self.source.node_location(value_set.syntax());

        let mut id: Option<String> = None;
        let mut title: Option<String> = None;
        let mut description: Option<String> = None;
        let mut seen: Vec<(&'static str, String)> = Vec::new();

        for clause in value_set.clauses() {
            let key = clause.key();
            let Some(raw) = self.clause_raw_value(&clause) else {
                continue;
            };

            if let Some((_, prior)) = seen.iter().find(|(k, _)| *k == key) {
                self.report_duplicate_metadata(key, prior, clause.syntax(), collector);
                continue;
            }

            match &clause {
                MetadataClause::Id(_) => id = Some(raw.clone()),
                MetadataClause::Title(_) => title = Some(raw.clone()),
                MetadataClause::Description(_) => description = Some(raw.clone()),
                _ => {
                    debug!(value_set = %name, key, "ignoring metadata on a ValueSet");
                    continue;
                }
            }
            seen.push((key, raw));
        }

        let mut components: Vec<VsComponent> = Vec::new();
        for component in value_set.components() {
            self.visit_vs_component(&component, &mut components, collector);
        }

        Some(FshValueSet {
            id: id.unwrap_or_else(|| name.clone()),
            name,
            title,
            description,
            components,
            source: location,
        })
    }

    fn visit_vs_component(
        &self,
        component: &ast::VsComponent,
        components: &mut Vec<VsComponent>,
        collector: &mut dyn DiagnosticCollector,
    ) {
        let inclusion = component.inclusion();
        let location = self.source.node_location(component.syntax());

        match component.body() {
            Some(VsComponentBody::Concept(concept)) => {
                self.visit_vs_concept_component(
                    &concept, inclusion, &location, components, collector,
                );
            }
            Some(VsComponentBody::Filter(filter)) => {
                self.visit_vs_filter_component(
                    &filter, inclusion, &location, components, collector,
                );
            }
            None => {
                collector.collect(
                    Diagnostic::warning("Unrecognized value set component.".to_string(), location)
                        .with_source("visitor"),
                );
            }
        }
    }

    /// Resolve a from clause's system and value set references
    fn build_vs_from(&self, from: Option<ast::VsComponentFrom>) -> VsFrom {
        let Some(from) = from else {
            return VsFrom::default();
        };

        let system = from
            .system()
            .map(|symbol| self.resolver.resolve(&symbol, CODE_SYSTEM_KINDS));

        let mut value_sets = Vec::new();
        for raw in from.value_sets() {
            for symbol in text::split_sequences(&raw) {
                value_sets.push(self.resolver.resolve(&symbol, VALUE_SET_KINDS));
            }
        }

        VsFrom { system, value_sets }
    }

    fn visit_vs_concept_component(
        &self,
        concept: &ast::VsConceptComponent,
        inclusion: bool,
        location: &Location,
        components: &mut Vec<VsComponent>,
        collector: &mut dyn DiagnosticCollector,
    ) {
        let mut from = self.build_vs_from(concept.from_clause());
        let Some(code_token) = concept.code_token() else {
            return;
        };

        let mut concepts: Vec<FshCode> = Vec::new();

        if code_token.kind() == FshSyntaxKind::CommaDelimitedCodes {
            // A list of codes requires the from clause to supply the system
            let Some(system) = from.system.clone() else {
                collector.collect(
                    Diagnostic::error(
                        "Concept list must declare a system with 'from system SYSTEM'."
                            .to_string(),
                        location.clone(),
                    )
                    .with_source("visitor"),
                );
                return;
            };

            for entry in text::split_codes(code_token.text()) {
                let literal = &entry.code;
                let (system_part, code_part) = match literal.split_once('#') {
                    Some(parts) => parts,
                    None => (literal.as_str(), ""),
                };
                if !system_part.is_empty() {
                    collector.collect(
                        Diagnostic::error(
                            format!("Concept {literal} specifies system multiple times."),
                            location.clone(),
                        )
                        .with_source("visitor"),
                    );
                    continue;
                }
                let code = if code_part.starts_with('"') {
                    text::unescape_string(code_part)
                } else {
                    code_part.to_string()
                };
                concepts.push(FshCode {
                    code,
                    system: Some(system.clone()),
                    display: entry.display,
                });
            }
        } else {
            // A single code: reconcile its own system with the from clause
            let literal = code_token.text().to_string();
            let (system_part, code_part) = match literal.split_once('#') {
                Some(parts) => parts,
                None => (literal.as_str(), ""),
            };
            let code = if code_part.starts_with('"') {
                text::unescape_string(code_part)
            } else {
                code_part.to_string()
            };

            let own_system = (!system_part.is_empty())
                .then(|| self.resolver.resolve(system_part, CODE_SYSTEM_KINDS));

            let system = match (own_system, from.system.clone()) {
                (Some(_), Some(_)) => {
                    collector.collect(
                        Diagnostic::error(
                            format!("Concept {literal} specifies system multiple times."),
                            location.clone(),
                        )
                        .with_source("visitor"),
                    );
                    return;
                }
                (Some(own), None) => {
                    // Adopt the code's system into the component scope
                    from.system = Some(own.clone());
                    own
                }
                (None, Some(scope)) => scope,
                (None, None) => {
                    collector.collect(
                        Diagnostic::error(
                            format!(
                                "Concept {literal} must include system as 'SYSTEM#CONCEPT' or \
                                 '#CONCEPT from system SYSTEM'."
                            ),
                            location.clone(),
                        )
                        .with_source("visitor"),
                    );
                    return;
                }
            };

            concepts.push(FshCode {
                code,
                system: Some(system),
                display: concept
                    .display()
                    .map(|raw| text::unescape_string(&raw)),
            });
        }

        if concepts.is_empty() {
            return;
        }

        let built = VsConceptComponent {
            inclusion,
            from,
            concepts,
        };

        // Merge with an equivalent existing concept component
        for existing in components.iter_mut() {
            if let VsComponent::Concept(existing) = existing {
                if existing.same_scope(&built) {
                    existing.concepts.extend(built.concepts);
                    return;
                }
            }
        }
        components.push(VsComponent::Concept(built));
    }

    fn visit_vs_filter_component(
        &self,
        filter: &ast::VsFilterComponent,
        inclusion: bool,
        location: &Location,
        components: &mut Vec<VsComponent>,
        collector: &mut dyn DiagnosticCollector,
    ) {
        let from = self.build_vs_from(filter.from_clause());
        if from.system.is_none() {
            collector.collect(
                Diagnostic::error(
                    "Filter component must declare a system with 'from system SYSTEM'."
                        .to_string(),
                    location.clone(),
                )
                .with_source("visitor"),
            );
            return;
        }

        let mut filters = Vec::new();
        for definition in filter.filters() {
            if let Some(built) = self.visit_vs_filter(&definition, collector) {
                filters.push(built);
            }
        }

        components.push(VsComponent::Filter(VsFilterComponent {
            inclusion,
            from,
            filters,
        }));
    }

    fn visit_vs_filter(
        &self,
        definition: &ast::VsFilterDefinition,
        collector: &mut dyn DiagnosticCollector,
    ) -> Option<VsFilter> {
        let location = self.source.node_location(definition.syntax());
        let property = definition.property()?;
        let operator_text = definition.operator_text()?;

        let Ok(operator) = operator_text.parse::<VsOperator>() else {
            collector.collect(
                Diagnostic::error(
                    format!("Unknown value set filter operator '{operator_text}'."),
                    location,
                )
                .with_code("ValueSetFilterOperatorError")
                .with_source("visitor"),
            );
            return None;
        };

        let value = definition.value();

        if value.is_none() {
            if operator == VsOperator::Exists {
                return Some(VsFilter {
                    property,
                    operator,
                    value: None,
                });
            }
            collector.collect(
                Diagnostic::error(
                    format!(
                        "Value set filter on property '{property}' with operator \
                         '{}' requires a value.",
                        operator.as_str()
                    ),
                    location,
                )
                .with_code("ValueSetFilterMissingValueError")
                .with_source("visitor"),
            );
            return None;
        }

        let value = value.unwrap();
        let built = match (operator, &value) {
            (VsOperator::Equals | VsOperator::In | VsOperator::NotIn, VsFilterValueExpr::Str(raw)) => {
                VsFilterValue::String(text::unescape_string(raw))
            }
            (
                VsOperator::IsA
                | VsOperator::DescendentOf
                | VsOperator::IsNotA
                | VsOperator::Generalizes,
                VsFilterValueExpr::Code(raw),
            ) => {
                let code = self.build_code(raw, None)?;
                VsFilterValue::Code(code)
            }
            (VsOperator::Regex, VsFilterValueExpr::Regex(raw)) => {
                VsFilterValue::Regex(raw.trim_matches('/').to_string())
            }
            (VsOperator::Exists, VsFilterValueExpr::Bool(b)) => VsFilterValue::Boolean(*b),
            _ => {
                collector.collect(
                    Diagnostic::error(
                        format!(
                            "Value set filter on property '{property}' has the wrong value \
                             type for operator '{}'.",
                            operator.as_str()
                        ),
                        location,
                    )
                    .with_code("ValueSetFilterValueTypeError")
                    .with_source("visitor"),
                );
                return None;
            }
        };

        Some(VsFilter {
            property,
            operator,
            value: Some(built),
        })
    }
}

/// Location accessor shared by the entity types for duplicate reporting
trait EntityLocation {
    fn location(&self) -> &Location;
}

impl EntityLocation for StructureDef {
    fn location(&self) -> &Location {
        &self.source
    }
}

impl EntityLocation for FshInstance {
    fn location(&self) -> &Location {
        &self.source
    }
}

impl EntityLocation for FshValueSet {
    fn location(&self) -> &Location {
        &self.source
    }
}

/// Parse "min..max" into its parts
fn parse_card(card: &str) -> Option<(u32, String)> {
    let (min, max) = card.split_once("..")?;
    let min = min.parse::<u32>().ok()?;
    if max.is_empty() {
        return None;
    }
    Some((min, max.to_string()))
}

/// Build a flag rule when any recognised flag is present
///
/// Unknown flags (TU, N, D) were filtered at the lexer layer and are
/// silently skipped here.
fn build_flag_rule(path: &str, flags: &[FshSyntaxKind], location: &Location) -> Option<FlagRule> {
    if flags.is_empty() {
        return None;
    }

    let mut rule = FlagRule {
        path: path.to_string(),
        must_support: false,
        summary: false,
        modifier: false,
        source: location.clone(),
    };

    for flag in flags {
        match flag {
            FshSyntaxKind::MsFlag => rule.must_support = true,
            FshSyntaxKind::SuFlag => rule.summary = true,
            FshSyntaxKind::ModifierFlag => rule.modifier = true,
            _ => {}
        }
    }

    if rule.must_support || rule.summary || rule.modifier {
        Some(rule)
    } else {
        None
    }
}

/// Split the body of `Reference(A|B|...)` into its target symbols
fn reference_targets(literal: &str) -> Vec<String> {
    let inner = literal
        .trim_start_matches("Reference")
        .trim_start()
        .trim_start_matches('(')
        .trim_end_matches(')');
    inner
        .split('|')
        .map(|part| part.trim().to_string())
        .filter(|part| !part.is_empty())
        .collect()
}

/// Strip the single quotes of a unit token
fn unwrap_unit(raw: &str) -> &str {
    raw.trim_matches('\'')
}

/// A code in the UCUM system
fn ucum_code(unit: &str) -> FshCode {
    FshCode {
        code: unit.to_string(),
        system: Some(UCUM_SYSTEM.to_string()),
        display: None,
    }
}
