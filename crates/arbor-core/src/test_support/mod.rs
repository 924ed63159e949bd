//! Shared fixtures for the crate's unit tests.

use crate::tree::Entity;
use arbor_schema::{
    expr::Expr,
    node::{Entity as MetaEntity, Enumeration, Field, MetaModel, Package},
    provider::{Cipher, Hasher, ProviderError, ProviderRegistry},
    resolve::resolve,
    resolved::ResolvedMetaModel,
    types::FieldType,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;

///
/// Sha256Hasher
///

pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn hash(&self, plaintext: &str) -> Result<String, ProviderError> {
        Ok(format!("{:x}", Sha256::digest(plaintext.as_bytes())))
    }

    fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool, ProviderError> {
        Ok(self.hash(plaintext)? == hashed)
    }

    fn hash_version(&self) -> u32 {
        2
    }
}

///
/// ReverseCipher
///

pub struct ReverseCipher;

impl Cipher for ReverseCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, ProviderError> {
        Ok(plaintext.chars().rev().collect())
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, ProviderError> {
        if ciphertext.is_empty() {
            return Err(ProviderError::new("reverse", "empty ciphertext"));
        }

        Ok(ciphertext.chars().rev().collect())
    }

    fn cipher_version(&self) -> u32 {
        1
    }
}

pub fn registry() -> ProviderRegistry {
    ProviderRegistry::new()
        .with_hasher("sha256", Sha256Hasher)
        .with_cipher("reverse", ReverseCipher)
}

/// The `app` schema used across the tests.
pub fn app_model() -> MetaModel {
    MetaModel::new().with_root("app", "root").package(
        Package::new("app")
            .entity(
                MetaEntity::new("root")
                    .field(Field::composition("people", "person").set())
                    .field(Field::composition("orgs", "org").set())
                    .field(Field::composition("settings", "settings"))
                    .field(Field::string("tags").list())
                    .field(Field::association("owner", "person", &["people"]))
                    .field(Field::association("favorites", "person", &["people"]).list())
                    .field(Field::association("member_ref", "member", &["orgs", "members"]))
                    .field(Field::string("note")),
            )
            .entity(
                MetaEntity::new("person")
                    .field(Field::string("id").key())
                    .field(Field::string("name").length(Some(1), Some(40)))
                    .field(Field::enumeration("status", "status"))
                    .field(Field::new("age", FieldType::Uint8))
                    .field(Field::new("balance", FieldType::Int64))
                    .field(Field::new("big", FieldType::BigInt))
                    .field(Field::new("price", FieldType::Decimal))
                    .field(Field::new("born", FieldType::Date))
                    .field(Field::new("seen", FieldType::Timestamp))
                    .field(Field::new("avatar", FieldType::Binary))
                    .field(Field::new("serial", FieldType::Ulid))
                    .field(Field::new("score", FieldType::Float64))
                    .field(Field::new("ratio", FieldType::Float32))
                    .field(Field::new("flag", FieldType::Bool))
                    .field(Field::new("secret", FieldType::Password1way).hasher("sha256"))
                    .field(Field::new("token", FieldType::Password2way).cipher("reverse"))
                    .field(Field::composition("address", "address"))
                    .field(Field::string("nicknames").list().elements(Some(0), Some(3)))
                    .field(Field::string("kind"))
                    .field(
                        Field::string("company").exists_if(Expr::equals("kind", "business")),
                    )
                    .field(Field::string("code").pattern("^[A-Z]{3}$")),
            )
            .entity(
                MetaEntity::new("address")
                    .field(Field::string("street"))
                    .field(Field::string("city").required()),
            )
            .entity(
                MetaEntity::new("org")
                    .field(Field::string("code").key())
                    .field(Field::composition("members", "member").set()),
            )
            .entity(
                MetaEntity::new("member")
                    .field(Field::new("id", FieldType::Uint32).key())
                    .field(Field::string("role")),
            )
            .entity(
                MetaEntity::new("settings")
                    .field(Field::string("theme"))
                    .field(Field::new("retries", FieldType::Uint8)),
            )
            .enumeration(Enumeration::new("status").values(&["active", "retired"])),
    )
}

pub fn app() -> Arc<ResolvedMetaModel> {
    match resolve(app_model(), &registry()) {
        Ok(resolved) => Arc::new(resolved),
        Err(errs) => panic!("app model failed to resolve: {:?}", errs.flatten()),
    }
}

pub fn root(meta: &Arc<ResolvedMetaModel>) -> Entity {
    Entity::root(meta)
}

/// A person element with its key set.
pub fn person(root: &Entity, id: &str) -> Entity {
    let mut person = root.new_element("people").unwrap();
    person.set("id", id).unwrap();
    person
}
