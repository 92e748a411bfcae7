//! Value set composition tests: component construction, concept merging,
//! and filter validation.

use temaki_core::defs::EmptyDefinitions;
use temaki_core::diagnostics::{Diagnostic, Severity};
use temaki_core::import::{Importer, RawInput};
use temaki_core::ir::{FshValueSet, VsComponent, VsFilterValue, VsOperator};
use temaki_core::ProjectConfig;

fn import_vs(source: &str) -> (FshValueSet, Vec<Diagnostic>) {
    let config = ProjectConfig::with_canonical("http://ex.org");
    let defs = EmptyDefinitions;
    let importer = Importer::new(&config, &defs);
    let outcome = importer.import(&[RawInput::new("vs.fsh", source)]);
    let vs = outcome.documents[0]
        .value_sets
        .values()
        .next()
        .expect("a value set")
        .clone();
    (vs, outcome.diagnostics)
}

fn error_codes(diagnostics: &[Diagnostic]) -> Vec<&str> {
    diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .filter_map(|d| d.code.as_deref())
        .collect()
}

#[test]
fn metadata_and_defaults() {
    let (vs, diagnostics) = import_vs("ValueSet: VS\nTitle: \"My Codes\"\n");
    assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");
    assert_eq!(vs.name, "VS");
    assert_eq!(vs.id, "VS");
    assert_eq!(vs.title.as_deref(), Some("My Codes"));
}

#[test]
fn filter_component_without_where_keeps_empty_filters() {
    let (vs, diagnostics) = import_vs("ValueSet: VS\n* codes from system http://s\n");
    assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");

    assert_eq!(vs.components.len(), 1);
    match &vs.components[0] {
        VsComponent::Filter(filter) => {
            assert!(filter.inclusion);
            assert_eq!(filter.from.system.as_deref(), Some("http://s"));
            assert!(filter.filters.is_empty());
        }
        other => panic!("expected filter component, got {other:?}"),
    }
}

#[test]
fn exclude_components_are_not_merged_with_includes() {
    let source = "ValueSet: VS\n* http://s#a\n* exclude http://s#b\n* http://s#c\n";
    let (vs, _) = import_vs(source);

    assert_eq!(vs.components.len(), 2);
    match (&vs.components[0], &vs.components[1]) {
        (VsComponent::Concept(included), VsComponent::Concept(excluded)) => {
            assert!(included.inclusion);
            let codes: Vec<_> = included.concepts.iter().map(|c| c.code.as_str()).collect();
            assert_eq!(codes, vec!["a", "c"]);

            assert!(!excluded.inclusion);
            assert_eq!(excluded.concepts[0].code, "b");
        }
        other => panic!("expected concept components, got {other:?}"),
    }
}

#[test]
fn concept_adopts_system_from_from_clause() {
    let (vs, diagnostics) = import_vs("ValueSet: VS\n* #active from system http://s\n");
    assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");

    match &vs.components[0] {
        VsComponent::Concept(concept) => {
            assert_eq!(concept.from.system.as_deref(), Some("http://s"));
            assert_eq!(concept.concepts[0].code, "active");
            assert_eq!(concept.concepts[0].system.as_deref(), Some("http://s"));
        }
        other => panic!("expected concept component, got {other:?}"),
    }
}

#[test]
fn concept_with_two_systems_is_rejected() {
    let (vs, diagnostics) = import_vs("ValueSet: VS\n* http://a#x from system http://b\n");

    assert!(vs.components.is_empty());
    let messages: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
    assert!(
        messages
            .iter()
            .any(|m| m.contains("specifies system multiple times")),
        "got {messages:?}"
    );
}

#[test]
fn concept_without_any_system_is_rejected() {
    let (vs, diagnostics) = import_vs("ValueSet: VS\n* #lonely\n");

    assert!(vs.components.is_empty());
    assert!(
        diagnostics
            .iter()
            .any(|d| d.message.contains("must include system")),
        "got {diagnostics:?}"
    );
}

#[test]
fn code_list_requires_a_system() {
    let (vs, diagnostics) = import_vs("ValueSet: VS\n* #a, #b\n");

    assert!(vs.components.is_empty());
    assert!(
        diagnostics
            .iter()
            .any(|d| d.message.contains("from system")),
        "got {diagnostics:?}"
    );
}

#[test]
fn code_list_with_displays_builds_concepts() {
    let source = "ValueSet: VS\n* #a \"Alpha\", #b, #\"c c\" \"Gamma\" from system http://s\n";
    let (vs, diagnostics) = import_vs(source);
    assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");

    match &vs.components[0] {
        VsComponent::Concept(concept) => {
            assert_eq!(concept.concepts.len(), 3);
            assert_eq!(concept.concepts[0].code, "a");
            assert_eq!(concept.concepts[0].display.as_deref(), Some("Alpha"));
            assert_eq!(concept.concepts[0].system.as_deref(), Some("http://s"));
            assert_eq!(concept.concepts[1].code, "b");
            assert!(concept.concepts[1].display.is_none());
            assert_eq!(concept.concepts[2].code, "c c");
            assert_eq!(concept.concepts[2].display.as_deref(), Some("Gamma"));
        }
        other => panic!("expected concept component, got {other:?}"),
    }
}

#[test]
fn from_valueset_references_resolve() {
    let source = "ValueSet: Source\nId: source-vs\n\nValueSet: VS\n* codes from system http://cs and valueset Source\n";

    let config = ProjectConfig::with_canonical("http://ex.org");
    let defs = EmptyDefinitions;
    let importer = Importer::new(&config, &defs);
    let outcome = importer.import(&[RawInput::new("vs.fsh", source)]);
    assert!(
        !outcome.has_errors(),
        "unexpected: {:?}",
        outcome.diagnostics
    );
    let vs = outcome.documents[0].value_sets.get("VS").unwrap().clone();

    match &vs.components[0] {
        VsComponent::Filter(filter) => {
            assert_eq!(
                filter.from.value_sets,
                vec!["http://ex.org/ValueSet/source-vs".to_string()]
            );
        }
        other => panic!("expected filter component, got {other:?}"),
    }
}

#[test]
fn filters_type_check_by_operator() {
    let source = r#"ValueSet: VS
* include codes from system http://s where concept is-a #123
* include codes from system http://s where prop = "abc"
* include codes from system http://s where prop regex /^[a-z]+$/
* include codes from system http://s where prop exists true
"#;
    let (vs, diagnostics) = import_vs(source);
    assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");

    let filters: Vec<_> = vs
        .components
        .iter()
        .filter_map(|c| match c {
            VsComponent::Filter(f) => Some(f),
            _ => None,
        })
        .collect();
    assert_eq!(filters.len(), 4);

    assert_eq!(filters[0].filters[0].operator, VsOperator::IsA);
    match filters[0].filters[0].value.as_ref().unwrap() {
        VsFilterValue::Code(code) => assert_eq!(code.code, "123"),
        other => panic!("expected code value, got {other:?}"),
    }

    assert_eq!(filters[1].filters[0].operator, VsOperator::Equals);
    assert_eq!(
        filters[1].filters[0].value,
        Some(VsFilterValue::String("abc".to_string()))
    );

    assert_eq!(filters[2].filters[0].operator, VsOperator::Regex);
    assert_eq!(
        filters[2].filters[0].value,
        Some(VsFilterValue::Regex("^[a-z]+$".to_string()))
    );

    assert_eq!(filters[3].filters[0].operator, VsOperator::Exists);
    assert_eq!(
        filters[3].filters[0].value,
        Some(VsFilterValue::Boolean(true))
    );
}

#[test]
fn british_descendant_spelling_is_folded() {
    let source = "ValueSet: VS\n* include codes from system http://s where concept descendant-of #123\n";
    let (vs, diagnostics) = import_vs(source);
    assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");

    match &vs.components[0] {
        VsComponent::Filter(filter) => {
            assert_eq!(filter.filters[0].operator, VsOperator::DescendentOf);
        }
        other => panic!("expected filter component, got {other:?}"),
    }
}

#[test]
fn unknown_operator_is_reported_and_filter_skipped() {
    let source = "ValueSet: VS\n* include codes from system http://s where concept near-of #123\n";
    let (vs, diagnostics) = import_vs(source);

    assert_eq!(error_codes(&diagnostics), vec!["ValueSetFilterOperatorError"]);
    match &vs.components[0] {
        VsComponent::Filter(filter) => assert!(filter.filters.is_empty()),
        other => panic!("expected filter component, got {other:?}"),
    }
}

#[test]
fn missing_filter_value_is_reported() {
    let source = "ValueSet: VS\n* include codes from system http://s where concept is-a\n";
    let (_, diagnostics) = import_vs(source);

    assert_eq!(
        error_codes(&diagnostics),
        vec!["ValueSetFilterMissingValueError"]
    );
}

#[test]
fn wrong_filter_value_type_is_reported() {
    let source = "ValueSet: VS\n* include codes from system http://s where concept is-a \"not a code\"\n";
    let (_, diagnostics) = import_vs(source);

    assert_eq!(
        error_codes(&diagnostics),
        vec!["ValueSetFilterValueTypeError"]
    );
}

#[test]
fn exists_without_value_is_allowed() {
    let source = "ValueSet: VS\n* include codes from system http://s where concept exists\n";
    let (vs, diagnostics) = import_vs(source);
    assert!(diagnostics.is_empty(), "unexpected: {diagnostics:?}");

    match &vs.components[0] {
        VsComponent::Filter(filter) => {
            assert_eq!(filter.filters[0].operator, VsOperator::Exists);
            assert!(filter.filters[0].value.is_none());
        }
        other => panic!("expected filter component, got {other:?}"),
    }
}

#[test]
fn broken_filter_keeps_surrounding_filters() {
    let source = "ValueSet: VS\n* include codes from system http://s where concept is-a #1 and concept near-of #2 and concept is-a #3\n";
    let (vs, diagnostics) = import_vs(source);

    assert_eq!(error_codes(&diagnostics), vec!["ValueSetFilterOperatorError"]);
    match &vs.components[0] {
        VsComponent::Filter(filter) => {
            assert_eq!(filter.filters.len(), 2);
        }
        other => panic!("expected filter component, got {other:?}"),
    }
}
