//! Declared meta-model nodes.
//!
//! Nodes are plain owned data: they are what a document (or a builder) says,
//! before any cross-reference is checked. The resolver turns a [`MetaModel`]
//! into a `ResolvedMetaModel` snapshot.

mod entity;
mod enumeration;
mod field;
mod model;
mod package;

pub use entity::Entity;
pub use enumeration::{EnumValue, Enumeration};
pub use field::{ElementBounds, Field, StringConstraints, UNBOUNDED};
pub use model::{MetaModel, TypeRef};
pub use package::Package;
