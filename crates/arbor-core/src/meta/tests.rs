use super::*;
use crate::{
    obs::{metrics_report, metrics_reset_all},
    test_support::{app_model, registry},
};
use std::fs;

const PEOPLE: &str = r#"{"meta_model": {
    "root": {"name": "root", "package": "app"},
    "packages": [{"name": "app", "entities": [
        {"name": "root", "fields": [
            {"name": "people", "type": "composition", "multiplicity": "set", "target": {"name": "person"}}
        ]},
        {"name": "person", "fields": [
            {"name": "id", "type": "string", "is_key": true},
            {"name": "name", "type": "string", "max_length": 40}
        ]}
    ]}]
}}"#;

fn load_text(text: &str) -> Result<Arc<ResolvedMetaModel>, LoadError> {
    load(&[Source::text("app.json", text)], &registry())
}

fn invalid(text: &str) -> Vec<String> {
    match load_text(text) {
        Err(LoadError::Invalid(errors)) => errors,
        Err(other) => panic!("unexpected load error: {other}"),
        Ok(_) => panic!("expected an invalid meta-model"),
    }
}

#[test]
fn forward_references_resolve() {
    let meta = load_text(PEOPLE).unwrap();
    let person = meta.find_entity("app", "person").unwrap();

    assert_eq!(meta.entity(person).keys().count(), 1);

    let (root, report) = Decoder::default()
        .decode_str(&meta, r#"{"people":[{"id":"p1","name":"Ann"},{"id":"p1","name":"Bo"}]}"#)
        .unwrap();
    assert!(report.is_clean());
    assert_eq!(root.elements("people").len(), 1);
    assert_eq!(root.elements("people")[0].text("name"), Some("Bo"));
}

#[test]
fn documents_naming_one_package_merge() {
    let base = r#"{"meta_model": {
        "root": {"name": "root", "package": "app"},
        "packages": [{"name": "app", "entities": [
            {"name": "root", "fields": [{"name": "settings", "type": "composition", "target": {"name": "settings"}}]}
        ]}]
    }}"#;
    let extra = r#"{"meta_model": {"packages": [{"name": "app", "entities": [
        {"name": "settings", "fields": [{"name": "theme", "type": "enumeration", "target": {"name": "theme"}}]}
    ], "enumerations": [
        {"name": "theme", "values": [{"name": "dark"}, {"name": "light"}]}
    ]}]}}"#;

    let meta = load(
        &[Source::text("base.json", base), Source::text("extra.json", extra)],
        &registry(),
    )
    .unwrap();

    assert_eq!(meta.source().packages.len(), 1);
    assert!(meta.find_entity("app", "settings").is_some());
    assert!(meta.find_enumeration("app", "theme").is_some());
}

#[test]
fn export_then_load_gives_the_same_model() {
    let model = app_model();
    let text = export_string(&model, true).unwrap();
    let meta = load_text(&text).unwrap();

    assert_eq!(meta.source(), &model);
    assert!(meta.revalidate(&registry()).is_ok());
}

#[test]
fn export_builds_a_meta_meta_instance() {
    let document = export(&app_model()).unwrap();
    let meta_model = document.child("meta_model").unwrap();
    let package = &meta_model.elements("packages")[0];
    let person = package
        .elements("entities")
        .iter()
        .find(|e| e.text("name") == Some("person"))
        .unwrap();
    let company = person
        .elements("fields")
        .iter()
        .find(|f| f.text("name") == Some("company"))
        .unwrap();

    assert_eq!(company.text("type"), Some("string"));
    assert_eq!(company.text("exists_if"), Some(r#"kind == "business""#));
    assert!(validate(&document).is_empty());
}

#[test]
fn missing_attributes_are_reported_by_route() {
    let errors = invalid(
        r#"{"meta_model": {"root": {"name": "root", "package": "app"}, "packages": [
            {"name": "app", "entities": [{"name": "root", "fields": [{"name": "a"}]}]}
        ]}}"#,
    );

    assert_eq!(
        errors,
        vec!["meta_model.packages[0].entities[0].fields[0].type: required field is missing"]
    );
}

#[test]
fn unknown_attributes_and_values_are_errors() {
    let errors = invalid(
        r#"{"meta_model": {"root": {"name": "root", "package": "app"}, "packages": [
            {"name": "app", "colour": "red", "entities": [
                {"name": "root", "fields": [{"name": "a", "type": "strin"}]}
            ]}
        ]}}"#,
    );

    assert_eq!(errors.len(), 3, "{errors:?}");
    assert!(errors[0].starts_with("app.json: ") && errors[0].contains("strin"));
    assert!(errors[1].ends_with("colour: unknown meta-model attribute"));
    let route = "meta_model.packages[0].entities[0].fields[0].type";
    assert!(errors[2].starts_with(&format!("{route}: required field is")));
}

#[test]
fn resolver_errors_are_flattened() {
    let errors = invalid(
        r#"{"meta_model": {"root": {"name": "root", "package": "app"}, "packages": [
            {"name": "app", "entities": [{"name": "root", "fields": [
                {"name": "a", "type": "string", "is_key": true, "multiplicity": "optional"},
                {"name": "b", "type": "association", "target": {"name": "nowhere"}}
            ]}]}
        ]}}"#,
    );

    assert!(
        errors.contains(&"app.root.a: key fields must be required, found optional".to_string())
    );
    assert!(errors.iter().any(|e| e.starts_with("app.root.b: ")));
}

#[test]
fn bad_exists_if_is_reported() {
    let errors = invalid(
        r#"{"meta_model": {"root": {"name": "root", "package": "app"}, "packages": [
            {"name": "app", "entities": [{"name": "root", "fields": [
                {"name": "kind", "type": "string"},
                {"name": "b", "type": "string", "exists_if": "kind =="}
            ]}]}
        ]}}"#,
    );

    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("app.root.b: exists_if 'kind ==' does not parse"));
}

#[test]
fn malformed_documents_name_their_source() {
    let err = load(
        &[Source::text("good.json", PEOPLE), Source::text("bad.json", "{\"meta_model\": [")],
        &registry(),
    )
    .unwrap_err();

    assert!(matches!(err, LoadError::Decode { ref name, .. } if name == "bad.json"));
}

#[test]
fn files_are_read_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.json");
    fs::write(&path, PEOPLE).unwrap();

    let meta = load(&[Source::file(&path)], &registry()).unwrap();
    assert!(meta.find_entity("app", "person").is_some());

    let missing = load(&[Source::file(dir.path().join("nope.json"))], &registry()).unwrap_err();
    assert!(matches!(missing, LoadError::Io { .. }));
}

#[test]
fn loads_are_counted() {
    metrics_reset_all();
    load_text(PEOPLE).unwrap();
    let _ = load_text("{}");

    let counters = metrics_report(None).counters.unwrap();
    assert_eq!(counters.ops.schema_loads, 2);
    assert_eq!(counters.ops.schema_sources, 2);
    assert_eq!(counters.ops.schema_load_failures, 1);
}
