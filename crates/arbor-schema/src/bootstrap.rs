//! The meta-meta-model: the schema every meta-model document is an instance
//! of. It is built in code and resolved once per process.

use crate::{
    node::{Entity, Enumeration, Field, MetaModel, Package},
    provider::ProviderRegistry,
    resolve::resolve,
    resolved::ResolvedMetaModel,
    types::{FieldType, Multiplicity},
};
use std::sync::{Arc, LazyLock};

/// Package holding the meta-meta-model.
pub const PACKAGE: &str = "arbor";

/// Root entity of a meta-model document.
pub const DOCUMENT: &str = "document";

///
/// META_META_MODEL
/// frozen after its one-time self-validation
///

static META_META_MODEL: LazyLock<Arc<ResolvedMetaModel>> = LazyLock::new(|| {
    let resolved = resolve(declare(), &ProviderRegistry::new())
        .unwrap_or_else(|errs| panic!("meta-meta-model failed self-validation:\n{errs}"));

    Arc::new(resolved)
});

/// The resolved meta-meta-model.
#[must_use]
pub fn meta_meta_model() -> &'static Arc<ResolvedMetaModel> {
    &META_META_MODEL
}

/// Declared form of the meta-meta-model.
#[must_use]
pub fn declare() -> MetaModel {
    MetaModel::new().with_root(PACKAGE, DOCUMENT).package(
        Package::new(PACKAGE)
            .entity(Entity::new(DOCUMENT).field(Field::composition("meta_model", "meta_model")))
            .entity(
                Entity::new("meta_model")
                    .field(Field::composition("root", "type_ref"))
                    .field(Field::composition("packages", "package").set()),
            )
            .entity(
                Entity::new("package")
                    .field(Field::string("name").key())
                    .field(Field::string("description"))
                    .field(Field::composition("entities", "entity").set())
                    .field(Field::composition("enumerations", "enumeration").set()),
            )
            .entity(
                Entity::new("entity")
                    .field(Field::string("name").key())
                    .field(Field::string("description"))
                    .field(Field::composition("fields", "field").set()),
            )
            .entity(field_entity())
            .entity(
                Entity::new("enumeration")
                    .field(Field::string("name").key())
                    .field(Field::string("description"))
                    .field(Field::composition("values", "enum_value").set()),
            )
            .entity(
                Entity::new("enum_value")
                    .field(Field::string("name").key())
                    .field(Field::string("description")),
            )
            .entity(
                Entity::new("type_ref")
                    .field(Field::string("name").required())
                    .field(Field::string("package")),
            )
            .enumeration(
                Enumeration::new("field_type")
                    .values(&FieldType::ALL.map(FieldType::as_str)),
            )
            .enumeration(
                Enumeration::new("multiplicity")
                    .values(&Multiplicity::ALL.map(Multiplicity::as_str)),
            ),
    )
}

fn field_entity() -> Entity {
    Entity::new("field")
        .field(Field::string("name").key())
        .field(Field::enumeration("type", "field_type").required())
        .field(Field::enumeration("multiplicity", "multiplicity"))
        .field(Field::new("is_key", FieldType::Bool))
        .field(Field::composition("target", "type_ref"))
        .field(Field::string("path").list())
        .field(Field::new("min_length", FieldType::Uint32))
        .field(Field::new("max_length", FieldType::Uint32))
        .field(Field::string("pattern"))
        .field(Field::new("min_elements", FieldType::Uint32))
        .field(Field::new("max_elements", FieldType::Int64))
        .field(Field::string("exists_if"))
        .field(Field::string("hasher"))
        .field(Field::string("cipher"))
        .field(Field::string("description"))
}
