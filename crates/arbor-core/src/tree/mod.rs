//! Generic runtime tree.
//!
//! Entities own their fields and values top-down. The only links back into
//! the schema are an `Arc` of the resolved snapshot and an [`EntityId`],
//! neither of which takes part in equality.
//!
//! [`EntityId`]: arbor_schema::resolved::EntityId

mod association;
mod entity;
mod field;
mod password;
mod value;

#[cfg(test)]
mod tests;

pub use association::Association;
pub use entity::{AuxEntries, Entity};
pub use field::Field;
pub use password::{Password1way, Password2way};
pub use value::{Primitive, Value};

pub(crate) use field::merge_element;

use thiserror::Error as ThisError;

///
/// TreeError
/// Programmatic misuse of the tree API: every variant names the field.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[remain::sorted]
pub enum TreeError {
    #[error("set element for '{field}' is missing key fields: {}", missing.join(", "))]
    MissingKeys { field: String, missing: Vec<String> },

    #[error("'{value}' is not a value of enumeration '{enumeration}' (field '{field}')")]
    UnknownEnumValue {
        field: String,
        enumeration: String,
        value: String,
    },

    #[error("entity '{entity}' has no field '{field}'")]
    UnknownField { entity: String, field: String },

    #[error("field '{field}' is {multiplicity}, cannot {operation}")]
    WrongShape {
        field: String,
        multiplicity: &'static str,
        operation: &'static str,
    },

    #[error("field '{field}' expects {expected}, found {found}")]
    WrongValue {
        field: String,
        expected: String,
        found: String,
    },
}
