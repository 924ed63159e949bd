use super::*;
use crate::{
    decode::Decoder,
    test_support::{Sha256Hasher, app, person},
    tree::{Association, Password1way, Password2way, Primitive},
};
use arbor_schema::{provider::Hasher, resolved::ResolvedMetaModel};
use chrono::{DateTime, NaiveDate, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;
use std::{collections::BTreeMap, sync::Arc};
use ulid::Ulid;

fn encoder(policy: PasswordPolicy) -> Encoder {
    Encoder::new(EncodeOptions {
        password_policy: policy,
        pretty: false,
    })
}

fn compact(entity: &Entity) -> String {
    Encoder::default().encode_string(entity).unwrap()
}

fn root() -> Entity {
    Entity::root(&app())
}

#[test]
fn fields_follow_declaration_order() {
    let mut root = root();
    root.set("note", "hi").unwrap();
    root.push("tags", "a").unwrap();
    root.push("tags", "b").unwrap();

    assert_eq!(compact(&root), r#"{"tags":["a","b"],"note":"hi"}"#);
}

#[test]
fn explicit_null_is_written() {
    let mut root = root();
    root.set_null("note").unwrap();

    assert_eq!(compact(&root), r#"{"note":null}"#);
}

#[test]
fn wide_integers_are_strings() {
    let mut root = root();
    let mut p1 = person(&root, "p1");
    p1.set("balance", i64::MAX).unwrap();
    p1.set("age", 42u8).unwrap();
    root.insert("people", p1).unwrap();

    assert_eq!(
        compact(&root),
        r#"{"people":[{"id":"p1","age":42,"balance":"9223372036854775807"}]}"#
    );
}

#[test]
fn password_policies_control_what_is_written() {
    let mut root = root();
    let mut p1 = person(&root, "p1");
    p1.set("secret", Password1way::plaintext("pw")).unwrap();
    p1.set("token", Password2way::plaintext("abc")).unwrap();
    root.insert("people", p1).unwrap();

    assert_eq!(
        encoder(PasswordPolicy::None).encode_string(&root).unwrap(),
        r#"{"people":[{"id":"p1"}]}"#
    );

    let hash = Sha256Hasher.hash("pw").unwrap();
    assert_eq!(
        encoder(PasswordPolicy::HashedAndEncrypted)
            .encode_string(&root)
            .unwrap(),
        format!(
            r#"{{"people":[{{"id":"p1","secret":{{"hashed":"{hash}","hash_version":2}},"token":{{"encrypted":"cba","cipher_version":1}}}}]}}"#
        )
    );

    assert_eq!(
        encoder(PasswordPolicy::All).encode_string(&root).unwrap(),
        r#"{"people":[{"id":"p1","secret":{"unhashed":"pw"},"token":{"unencrypted":"abc"}}]}"#
    );
}

#[test]
fn associations_write_path_keys_or_null() {
    let meta = app();
    let mut root = Entity::root(&meta);
    let p1 = person(&root, "p1");
    root.set("owner", Association::new(vec![p1.key_stub()])).unwrap();
    root.insert("people", p1).unwrap();

    let text = compact(&root);
    assert_eq!(
        text,
        r#"{"people":[{"id":"p1"}],"owner":{"path_keys":[{"id":"p1"}]}}"#
    );

    let (decoded, report) = Decoder::default().decode_str(&meta, &text).unwrap();
    assert!(report.is_clean());
    assert_eq!(decoded, root);

    root.set("owner", Association::default()).unwrap();
    assert!(compact(&root).ends_with(r#""owner":null}"#));
}

#[test]
fn side_channels_use_suffixed_keys() {
    let mut root = root();
    root.set("note", "x").unwrap();
    root.set_aux("note", "errors", json!(["too short"])).unwrap();
    root.set_aux("tags", "meta", json!({"a": 1})).unwrap();

    assert_eq!(
        compact(&root),
        r#"{"note":"x","note__errors_":["too short"],"tags__meta_":{"a":1}}"#
    );
}

#[test]
fn redacted_password_keeps_its_side_channel() {
    let mut root = root();
    let mut p1 = person(&root, "p1");
    p1.set("secret", Password1way::plaintext("pw")).unwrap();
    p1.set_aux("secret", "errors", json!(["weak"])).unwrap();
    root.insert("people", p1).unwrap();

    assert_eq!(
        encoder(PasswordPolicy::None).encode_string(&root).unwrap(),
        r#"{"people":[{"id":"p1","secret__errors_":["weak"]}]}"#
    );
}

#[test]
fn pretty_output_decodes_to_the_same_tree() {
    let meta = app();
    let mut root = Entity::root(&meta);
    root.child_mut("settings").unwrap().set("theme", "dark").unwrap();
    root.push("tags", "a").unwrap();

    let pretty = Encoder::new(EncodeOptions {
        pretty: true,
        ..EncodeOptions::default()
    })
    .encode_string(&root)
    .unwrap();
    assert!(pretty.contains('\n'));

    let (decoded, _) = Decoder::default().decode_str(&meta, &pretty).unwrap();
    assert_eq!(decoded, root);
}

#[test]
fn token_sink_receives_the_raw_stream() {
    let mut root = root();
    root.push("tags", "a").unwrap();

    assert_eq!(
        Encoder::default().encode_tokens(&root).unwrap(),
        vec![
            Token::ObjectStart,
            Token::key("tags"),
            Token::ListStart,
            Token::string("a"),
            Token::ListEnd,
            Token::ObjectEnd,
        ]
    );
}

#[test]
fn every_primitive_round_trips() {
    let meta = app();
    let mut root = Entity::root(&meta);
    let mut p1 = person(&root, "p1");
    p1.set("status", Value::enumeration("active")).unwrap();
    p1.set("big", "-98765432109876543210".parse::<num_bigint::BigInt>().unwrap())
        .unwrap();
    p1.set("price", Decimal::new(1050, 2)).unwrap();
    p1.set("born", NaiveDate::from_ymd_opt(1990, 5, 17).unwrap()).unwrap();
    p1.set(
        "seen",
        DateTime::parse_from_rfc3339("2024-03-01T12:30:45.123Z")
            .unwrap()
            .with_timezone(&Utc),
    )
    .unwrap();
    p1.set("avatar", vec![0u8, 255, 7]).unwrap();
    p1.set("serial", Value::from(Primitive::Ulid(Ulid::from(42u128)))).unwrap();
    p1.set("score", f64::INFINITY).unwrap();
    p1.set("ratio", 0.1f32).unwrap();
    p1.set("flag", true).unwrap();
    root.insert("people", p1).unwrap();

    let text = encoder(PasswordPolicy::All).encode_string(&root).unwrap();
    let (decoded, report) = Decoder::default().decode_str(&meta, &text).unwrap();

    assert!(report.is_clean(), "{:?}", report.messages());
    assert_eq!(decoded, root);
}

//
// Round-trip property
//

#[derive(Clone, Debug)]
struct PersonData {
    name: Option<Option<String>>,
    age: Option<u8>,
    balance: i64,
    score: f64,
    nicknames: Vec<String>,
    secret: Option<String>,
}

fn arb_person() -> impl Strategy<Value = PersonData> {
    (
        prop::option::of(prop::option::of("[a-zA-Z ]{1,12}")),
        prop::option::of(any::<u8>()),
        any::<i64>(),
        -1.0e12f64..1.0e12,
        prop::collection::vec("[a-z]{0,5}", 0..4),
        prop::option::of("[ -~]{0,10}"),
    )
        .prop_map(|(name, age, balance, score, nicknames, secret)| PersonData {
            name,
            age,
            balance,
            score,
            nicknames,
            secret,
        })
}

fn build(
    meta: &Arc<ResolvedMetaModel>,
    people: &BTreeMap<String, PersonData>,
    tags: &[String],
) -> Entity {
    let mut root = Entity::root(meta);
    for (id, data) in people {
        let mut p = person(&root, id);
        match &data.name {
            Some(Some(name)) => p.set("name", name.as_str()).unwrap(),
            Some(None) => p.set_null("name").unwrap(),
            None => {}
        }
        if let Some(age) = data.age {
            p.set("age", age).unwrap();
        }
        p.set("balance", data.balance).unwrap();
        p.set("score", data.score).unwrap();
        for nickname in &data.nicknames {
            p.push("nicknames", nickname.as_str()).unwrap();
        }
        if let Some(secret) = &data.secret {
            p.set("secret", Password1way::plaintext(secret)).unwrap();
        }
        root.insert("people", p).unwrap();
    }
    for tag in tags {
        root.push("tags", tag.as_str()).unwrap();
    }

    root
}

proptest! {
    #[test]
    fn decode_inverts_encode(
        people in prop::collection::btree_map("[a-z0-9]{1,6}", arb_person(), 0..4),
        tags in prop::collection::vec("[a-z ]{0,6}", 0..3),
    ) {
        let meta = app();
        let root = build(&meta, &people, &tags);

        let text = encoder(PasswordPolicy::All).encode_string(&root).unwrap();
        let (decoded, report) = Decoder::default().decode_str(&meta, &text).unwrap();

        prop_assert!(report.is_clean());
        prop_assert_eq!(decoded, root);
    }
}
