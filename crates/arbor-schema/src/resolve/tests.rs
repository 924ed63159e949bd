use super::*;
use crate::{
    expr::Expr,
    node::{Entity, Enumeration, Field, Package},
    provider::{Hasher, ProviderError},
    types::FieldType,
};

struct Reverse;

impl Hasher for Reverse {
    fn hash(&self, plaintext: &str) -> Result<String, ProviderError> {
        Ok(plaintext.chars().rev().collect())
    }

    fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool, ProviderError> {
        Ok(self.hash(plaintext)? == hashed)
    }

    fn hash_version(&self) -> u32 {
        1
    }
}

// root { people: set person, org: org }, person { id key, name, status }
fn app() -> MetaModel {
    MetaModel::new().with_root("app", "root").package(
        Package::new("app")
            .entity(
                Entity::new("root")
                    .field(Field::composition("people", "person").set())
                    .field(Field::composition("org", "org")),
            )
            .entity(
                Entity::new("person")
                    .field(Field::string("id").key())
                    .field(Field::string("name").length(Some(1), Some(20)))
                    .field(Field::enumeration("status", "status"))
                    .field(Field::association("manager", "person", &["people"])),
            )
            .entity(Entity::new("org").field(Field::string("title")))
            .enumeration(Enumeration::new("status").values(&["active", "retired"])),
    )
}

fn errors(model: MetaModel) -> Vec<String> {
    resolve(model, &ProviderRegistry::new())
        .map(|_| Vec::new())
        .unwrap_or_else(|errs| errs.flatten())
}

#[test]
fn resolves_a_valid_model() {
    let resolved = resolve(app(), &ProviderRegistry::new()).unwrap();
    let person = resolved.find_entity("app", "person").unwrap();
    let person = resolved.entity(person);

    assert_eq!(person.qualified_name().as_str(), "app::person");
    assert_eq!(
        person.field("name").unwrap().qualified_name.as_str(),
        "app::person.name"
    );
    assert_eq!(person.keys().map(|f| f.name.as_str()).collect::<Vec<_>>(), ["id"]);

    let manager = person.field("manager").unwrap().association_path().unwrap();
    assert_eq!(manager.target, person.id());
    assert_eq!(manager.steps.len(), 1);
    assert!(manager.steps[0].through_set);
}

#[test]
fn forward_reference_resolves() {
    // a composes b, which is declared afterwards
    let model = MetaModel::new().with_root("app", "a").package(
        Package::new("app")
            .entity(Entity::new("a").field(Field::composition("b", "b")))
            .entity(Entity::new("b").field(Field::string("x"))),
    );

    assert_eq!(errors(model), Vec::<String>::new());
}

#[test]
fn cross_package_reference_resolves() {
    let model = MetaModel::new()
        .with_root("app", "root")
        .package(
            Package::new("app")
                .entity(
                    Entity::new("root")
                        .field(Field::composition("item", "item").target_in("lib", "item")),
                ),
        )
        .package(Package::new("lib").entity(Entity::new("item").field(Field::string("x"))));

    assert_eq!(errors(model), Vec::<String>::new());
}

#[test]
fn missing_root_halts() {
    let mut model = app();
    model.root = None;
    // this would also fail reference resolution, but the pipeline stops first
    model.packages[0].entities[0]
        .fields
        .push(Field::composition("ghost", "ghost"));

    assert_eq!(errors(model), vec!["meta-model declares no root entity"]);
}

#[test]
fn key_rules() {
    let model = MetaModel::new().with_root("app", "root").package(
        Package::new("app").entity(
            Entity::new("root")
                .field(Field::string("a").key().optional())
                .field(Field::association("b", "root", &[]).key())
                .field(Field::new("c", FieldType::Password1way).key())
                .field(Field::new("d", FieldType::Float64).key()),
        ),
    );
    let errs = errors(model);

    assert!(errs.contains(&"app.root.a: key fields must be required, found optional".to_string()));
    assert!(errs.contains(&"app.root.b: association fields cannot be keys".to_string()));
    assert!(errs.contains(&"app.root.c: password fields cannot be keys".to_string()));
    assert!(errs.contains(&"app.root.d: float64 fields cannot be keys".to_string()));
}

#[test]
fn multiplicity_rules() {
    let model = MetaModel::new().with_root("app", "root").package(
        Package::new("app")
            .entity(
                Entity::new("root")
                    .field(Field::composition("kids", "kid").list())
                    .field(Field::string("tags").set())
                    .field(Field::string("one").elements(Some(1), None))
                    .field(Field::string("many").list().elements(Some(3), Some(2)))
                    .field(Field::string("bad").list().elements(None, Some(-2))),
            )
            .entity(Entity::new("kid").field(Field::string("id").key())),
    );
    let errs = errors(model);

    assert!(
        errs.iter()
            .any(|e| e.starts_with("app.root.kids: composition fields cannot be lists"))
    );
    assert!(errs.iter().any(|e| e.starts_with("app.root.tags: string fields cannot be sets")));
    assert!(errs.iter().any(|e| e.starts_with("app.root.one: element bounds")));
    assert!(errs.contains(&"app.root.many: min_elements 3 exceeds max_elements 2".to_string()));
    assert!(errs.iter().any(|e| e.starts_with("app.root.bad: max_elements -2 is invalid")));
}

#[test]
fn unbounded_sentinel_is_accepted() {
    let model = MetaModel::new().with_root("app", "root").package(
        Package::new("app").entity(
            Entity::new("root").field(Field::string("tags").list().elements(Some(5), Some(-1))),
        ),
    );

    assert_eq!(errors(model), Vec::<String>::new());
}

#[test]
fn reference_errors_are_all_reported() {
    let model = MetaModel::new().with_root("app", "root").package(
        Package::new("app")
            .entity(
                Entity::new("root")
                    .field(Field::composition("a", "missing"))
                    .field(Field::enumeration("b", "root"))
                    .field(Field::new("c", FieldType::Composition))
                    .field(Field::string("d").target("root")),
            )
            .enumeration(Enumeration::new("color").value("red")),
    );
    let errs = errors(model);

    assert_eq!(errs.len(), 4, "{errs:#?}");
    for expected in [
        "app.root.a: composition target 'app::missing' is not declared",
        "app.root.b: target 'app::root' is not a valid enumeration target",
    ] {
        assert!(errs.iter().any(|e| e == expected), "{errs:?}");
    }
    assert!(errs.contains(&"app.root.c: composition field must declare a target".to_string()));
    assert!(errs.contains(&"app.root.d: string fields cannot declare a target".to_string()));
}

#[test]
fn association_path_errors() {
    let model = MetaModel::new().with_root("app", "root").package(
        Package::new("app")
            .entity(
                Entity::new("root")
                    .field(Field::composition("people", "person").set())
                    .field(Field::string("label"))
                    // walks into a string field
                    .field(Field::association("a", "person", &["label"]))
                    // ends on the wrong entity
                    .field(Field::association("b", "root", &["people"]))
                    // no such segment
                    .field(Field::association("c", "person", &["nobody"])),
            )
            .entity(
                Entity::new("person")
                    .field(Field::string("name"))
                    // list association with no keyed entity on its path
                    .field(Field::association("friends", "person", &["people"]).list()),
            ),
    );
    let errs = errors(model);

    assert!(errs.iter().any(|e| {
        e.starts_with("app.root.a: association path segment 'label' is a string field")
    }));
    assert!(errs.iter().any(|e| e.starts_with("app.root.b: association path ends at")));
    assert!(errs.iter().any(|e| e.starts_with("app.root.c: association path segment 'nobody'")));
    assert!(errs.iter().any(|e| e.starts_with("app.person.friends: association list needs")));
}

#[test]
fn composition_key_needs_primitive_keys() {
    let model = MetaModel::new().with_root("app", "root").package(
        Package::new("app")
            .entity(
                Entity::new("root")
                    .field(Field::composition("items", "item").set()),
            )
            .entity(
                Entity::new("item")
                    .field(Field::composition("code", "code").key()),
            )
            .entity(
                Entity::new("code")
                    .field(Field::composition("inner", "inner").key()),
            )
            .entity(Entity::new("inner").field(Field::string("id").key())),
    );
    let errs = errors(model);

    assert_eq!(
        errs,
        vec!["app.item.code: composition key targets 'code' whose key 'inner' is not primitive"]
    );
}

#[test]
fn providers_are_injected_or_reported() {
    let model = MetaModel::new().with_root("app", "root").package(
        Package::new("app").entity(
            Entity::new("root")
                .field(Field::new("secret", FieldType::Password1way).hasher("reverse"))
                .field(Field::new("token", FieldType::Password2way).cipher("aes")),
        ),
    );
    let registry = ProviderRegistry::new().with_hasher("reverse", Reverse);

    let errs = resolve(model.clone(), &registry).unwrap_err().flatten();
    assert_eq!(errs, vec!["app.root.token: cipher 'aes' is not registered"]);

    let mut model = model;
    model.packages[0].entities[0].fields.pop();
    let resolved = resolve(model, &registry).unwrap();
    let secret = resolved.root_entity().field("secret").unwrap();
    assert_eq!(secret.providers.hasher_name(), Some("reverse"));
    assert_eq!(secret.providers.hasher().unwrap().hash("abc").unwrap(), "cba");
}

#[test]
fn exists_if_must_name_siblings() {
    let model = MetaModel::new().with_root("app", "root").package(
        Package::new("app").entity(
            Entity::new("root")
                .field(Field::string("kind"))
                .field(Field::string("detail").exists_if(Expr::equals("kind", "long")))
                .field(Field::string("other").exists_if(Expr::present("nope"))),
        ),
    );

    assert_eq!(
        errors(model),
        vec!["app.root.other: exists_if refers to unknown field 'nope'"]
    );
}

#[test]
fn naming_errors() {
    let model = MetaModel::new().with_root("app", "root").package(
        Package::new("app")
            .entity(
                Entity::new("root")
                    .field(Field::string("Name"))
                    .field(Field::string("dup"))
                    .field(Field::string("dup")),
            )
            .enumeration(Enumeration::new("root").value("x")),
    );
    let errs = errors(model);

    assert!(errs.iter().any(|e| e.starts_with("app.root.Name: field name 'Name'")));
    assert!(errs.contains(&"app.root.dup: field is declared twice in this entity".to_string()));
    assert!(errs.contains(&"app.root: name is declared twice in this package".to_string()));
}

#[test]
fn maximal_error_set() {
    // independent problems in different elements are all reported
    let model = MetaModel::new().with_root("app", "root").package(
        Package::new("app")
            .entity(
                Entity::new("root")
                    .field(Field::string("a").key().list())
                    .field(Field::composition("b", "nowhere"))
                    .field(Field::string("c").pattern("(unclosed")),
            )
            .enumeration(Enumeration::new("empty")),
    );
    let errs = errors(model);

    assert!(errs.iter().any(|e| e.starts_with("app.root.a:")));
    assert!(errs.iter().any(|e| e.starts_with("app.root.b:")));
    assert!(errs.iter().any(|e| e.starts_with("app.root.c: pattern")));
    assert!(errs.contains(&"app.empty: enumeration declares no values".to_string()));
}

#[test]
fn resolution_is_idempotent() {
    let registry = ProviderRegistry::new();
    let first = resolve(app(), &registry).unwrap();
    let second = first.revalidate(&registry).unwrap();

    assert_eq!(first, second);
}
