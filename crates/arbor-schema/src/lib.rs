//! Meta-model layer for Arbor: schema nodes, field types, the resolver
//! pipeline and the immutable resolved snapshot consumed by `arbor-core`.

pub mod bootstrap;
pub mod error;
pub mod expr;
pub mod node;
pub mod provider;
pub mod resolve;
pub mod resolved;
pub mod types;

/// Maximum length for entity, enumeration and field identifiers.
pub const MAX_NAME_LEN: usize = 64;

/// Separator between a package and an element name in qualified names.
pub const QUALIFIED_SEPARATOR: &str = "::";

use thiserror::Error as ThisError;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        err,
        error::ErrorTree,
        expr::{Expr, ExprContext},
        node::*,
        provider::{Cipher, Hasher, ProviderError, ProviderRegistry},
        resolved::{
            AssociationPath, EntityId, EnumId, PathStep, QualifiedName, ResolvedEntity,
            ResolvedEnumeration, ResolvedField, ResolvedMetaModel, Target,
        },
        types::{FieldType, Multiplicity},
    };
}

///
/// Error
///

#[derive(Debug, ThisError)]
pub enum Error {
    #[error("meta-model validation failed:\n{0}")]
    Validation(error::ErrorTree),
}

impl From<error::ErrorTree> for Error {
    fn from(tree: error::ErrorTree) -> Self {
        Self::Validation(tree)
    }
}
