use super::*;
use crate::test_support::{ReverseCipher, Sha256Hasher, app, person};
use arbor_schema::provider::Hasher;
use serde_json::json;

#[test]
fn unknown_fields_are_rejected() {
    let mut root = Entity::root(&app());

    assert_eq!(
        root.set("bogus", "x"),
        Err(TreeError::UnknownField {
            entity: "app::root".to_string(),
            field: "bogus".to_string(),
        })
    );
    assert!(root.get("bogus").is_none());
}

#[test]
fn shapes_and_kinds_are_checked() {
    let meta = app();
    let mut root = Entity::root(&meta);

    assert!(matches!(
        root.set("tags", "a"),
        Err(TreeError::WrongShape { multiplicity: "list", .. })
    ));
    assert!(matches!(
        root.push("note", "a"),
        Err(TreeError::WrongShape { multiplicity: "optional", .. })
    ));

    let mut p1 = person(&root, "p1");
    assert_eq!(
        p1.set("age", 300u16),
        Err(TreeError::WrongValue {
            field: "app::person.age".to_string(),
            expected: "uint8".to_string(),
            found: "uint16".to_string(),
        })
    );
    assert!(matches!(
        p1.set("status", Value::enumeration("asleep")),
        Err(TreeError::UnknownEnumValue { .. })
    ));

    let org = root.new_element("orgs").unwrap();
    assert!(matches!(root.insert("people", org), Err(TreeError::WrongValue { .. })));
}

#[test]
fn field_mut_creates_empty_fields() {
    let mut root = Entity::root(&app());

    assert_eq!(root.field_mut("note").unwrap(), &Field::Single(None));
    assert!(root.is_null("note"));
    assert_eq!(root.field_mut("tags").unwrap(), &Field::List(Vec::new()));
    assert_eq!(root.field_mut("people").unwrap(), &Field::Set(Vec::new()));
}

#[test]
fn absent_null_and_present_are_distinct() {
    let mut root = Entity::root(&app());
    assert!(!root.is_present("note"));

    root.set_null("note").unwrap();
    assert!(root.is_present("note"));
    assert!(root.is_null("note"));
    assert_eq!(root.value("note"), None);

    root.set("note", "hi").unwrap();
    assert_eq!(root.text("note"), Some("hi"));

    assert_eq!(root.remove("note").unwrap(), Some(Field::Single(Some("hi".into()))));
    assert!(!root.is_present("note"));
}

#[test]
fn sets_merge_by_key() {
    let meta = app();
    let mut root = Entity::root(&meta);

    let mut first = person(&root, "p1");
    first.set("name", "Ann").unwrap();
    first.set("age", 30u8).unwrap();
    assert_eq!(root.insert("people", first).unwrap(), 0);
    assert_eq!(root.insert("people", person(&root, "p2")).unwrap(), 1);

    let mut again = person(&root, "p1");
    again.set_null("name").unwrap();
    assert_eq!(root.insert("people", again).unwrap(), 0);

    let people = root.elements("people");
    assert_eq!(people.len(), 2);
    assert!(people[0].is_null("name"));
    assert_eq!(people[0].value("age"), Some(&Value::from(30u8)));
}

#[test]
fn keyless_elements_are_not_inserted() {
    let meta = app();
    let mut root = Entity::root(&meta);

    for _ in 0..2 {
        let mut keyless = root.new_element("people").unwrap();
        keyless.set("name", "Ann").unwrap();

        assert_eq!(
            root.insert("people", keyless),
            Err(TreeError::MissingKeys {
                field: "app::root.people".to_string(),
                missing: vec!["id".to_string()],
            })
        );
    }
    assert!(root.elements("people").is_empty());
}

#[test]
fn set_equality_ignores_order() {
    let meta = app();
    let mut a = Entity::root(&meta);
    let mut b = Entity::root(&meta);
    for id in ["p1", "p2"] {
        a.insert("people", person(&a, id)).unwrap();
    }
    for id in ["p2", "p1"] {
        b.insert("people", person(&b, id)).unwrap();
    }
    assert_eq!(a, b);

    b.child_mut("settings").unwrap().set("theme", "dark").unwrap();
    assert_ne!(a, b);
}

#[test]
fn elements_match_on_keys_only() {
    let meta = app();
    let root = Entity::root(&meta);
    let mut x = person(&root, "p1");
    let mut y = person(&root, "p1");
    x.set("name", "Ann").unwrap();
    y.set("name", "Bo").unwrap();

    assert!(x.matches(&y));
    assert!(!x.matches(&person(&root, "p2")));
    assert!(x.has_keys());
    assert_eq!(root.new_element("people").unwrap().missing_keys(), vec!["id"]);
}

#[test]
fn key_stub_and_clone_shape() {
    let meta = app();
    let mut root = Entity::root(&meta);
    let mut p1 = person(&root, "p1");
    p1.set("name", "Ann").unwrap();
    p1.child_mut("address").unwrap().set("city", "Oslo").unwrap();
    root.insert("people", p1.clone()).unwrap();
    root.set("note", "x").unwrap();

    let stub = p1.key_stub();
    assert_eq!(stub, person(&root, "p1"));

    let shape = root.clone_shape();
    assert!(!shape.is_present("note"));
    let element = &shape.elements("people")[0];
    assert_eq!(element.text("id"), Some("p1"));
    assert!(!element.is_present("name"));
    assert!(element.child("address").is_some_and(|a| !a.is_present("city")));
}

#[test]
fn merge_recurses_into_compositions() {
    let meta = app();
    let mut mine = Entity::root(&meta);
    mine.child_mut("settings").unwrap().set("theme", "dark").unwrap();
    mine.set("note", "keep").unwrap();

    let mut theirs = Entity::root(&meta);
    theirs.child_mut("settings").unwrap().set("retries", 3u8).unwrap();
    theirs.set_aux("note", "meta", json!({"by": "sync"})).unwrap();

    mine.merge(theirs);

    let settings = mine.child("settings").unwrap();
    assert_eq!(settings.text("theme"), Some("dark"));
    assert_eq!(settings.value("retries"), Some(&Value::from(3u8)));
    assert_eq!(mine.text("note"), Some("keep"));
    assert_eq!(mine.aux("note").unwrap()["meta"], json!({"by": "sync"}));
}

#[test]
fn associations_must_follow_the_path() {
    let meta = app();
    let mut root = Entity::root(&meta);
    let p1 = person(&root, "p1");
    let org = root.new_element("orgs").unwrap();

    root.set("owner", Association::new(vec![p1.key_stub()])).unwrap();
    assert_eq!(
        root.value("owner")
            .and_then(Value::as_association)
            .and_then(Association::target)
            .and_then(|t| t.text("id")),
        Some("p1")
    );
    assert!(root.set("owner", Association::new(vec![org])).is_err());
    assert!(root.set("owner", Association::default()).is_ok());
}

#[test]
fn passwords_seal_with_their_providers() {
    let meta = app();
    let mut root = Entity::root(&meta);
    let mut p1 = person(&root, "p1");
    p1.set("secret", Password1way::plaintext("pw")).unwrap();
    p1.set("token", Password2way::plaintext("abc")).unwrap();
    root.insert("people", p1).unwrap();

    root.seal_passwords().unwrap();

    let p1 = &root.elements("people")[0];
    let Some(Value::Password1way(secret)) = p1.value("secret") else {
        panic!("secret is not a password");
    };
    assert_eq!(secret.unhashed, None);
    assert_eq!(secret.hash_version, Some(2));
    assert!(secret.verify_with(&Sha256Hasher, "pw").unwrap());
    assert_eq!(secret.hashed, Some(Sha256Hasher.hash("pw").unwrap()));

    let Some(Value::Password2way(token)) = p1.value("token") else {
        panic!("token is not a password");
    };
    assert_eq!(token, &Password2way::encrypted("cba", 1));
    assert_eq!(token.decrypt_with(&ReverseCipher).unwrap(), Some("abc".to_string()));
}

#[test]
fn side_channels_go_with_the_field() {
    let mut root = Entity::root(&app());
    root.set("note", "x").unwrap();
    root.set_aux("note", "errors", json!(["too short"])).unwrap();

    assert_eq!(root.aux("note").unwrap().len(), 1);
    assert!(root.set_aux("bogus", "errors", json!([])).is_err());

    root.remove("note").unwrap();
    assert!(root.aux("note").is_none());
}
