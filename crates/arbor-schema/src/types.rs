use std::{fmt, str::FromStr};
use thiserror::Error as ThisError;

///
/// UnknownName
///
/// A type or multiplicity name that does not match any declared variant.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
#[error("unknown {kind} '{name}'")]
pub struct UnknownName {
    pub kind: &'static str,
    pub name: String,
}

///
/// FieldType
///

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[remain::sorted]
pub enum FieldType {
    Association,
    BigInt,
    Binary,
    Bool,
    Composition,
    Date,
    Decimal,
    Enumeration,
    Float32,
    Float64,
    Int8,
    Int16,
    Int32,
    Int64,
    Password1way,
    Password2way,
    String,
    Timestamp,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Ulid,
}

impl FieldType {
    pub const ALL: [Self; 23] = [
        Self::Association,
        Self::BigInt,
        Self::Binary,
        Self::Bool,
        Self::Composition,
        Self::Date,
        Self::Decimal,
        Self::Enumeration,
        Self::Float32,
        Self::Float64,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Password1way,
        Self::Password2way,
        Self::String,
        Self::Timestamp,
        Self::Uint8,
        Self::Uint16,
        Self::Uint32,
        Self::Uint64,
        Self::Ulid,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Association => "association",
            Self::BigInt => "big_int",
            Self::Binary => "binary",
            Self::Bool => "bool",
            Self::Composition => "composition",
            Self::Date => "date",
            Self::Decimal => "decimal",
            Self::Enumeration => "enumeration",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Password1way => "password_1way",
            Self::Password2way => "password_2way",
            Self::String => "string",
            Self::Timestamp => "timestamp",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Ulid => "ulid",
        }
    }

    /// Plain scalars: everything except references and passwords.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        !matches!(
            self,
            Self::Association
                | Self::Composition
                | Self::Enumeration
                | Self::Password1way
                | Self::Password2way
        )
    }

    #[must_use]
    pub const fn is_password(self) -> bool {
        matches!(self, Self::Password1way | Self::Password2way)
    }

    /// Types that must name a target element.
    #[must_use]
    pub const fn requires_target(self) -> bool {
        matches!(
            self,
            Self::Association | Self::Composition | Self::Enumeration
        )
    }

    // Range exceeds what an IEEE-754 double represents exactly, so the wire
    // form is always a string literal.
    #[must_use]
    pub const fn exceeds_f64_precision(self) -> bool {
        matches!(
            self,
            Self::BigInt | Self::Decimal | Self::Int64 | Self::Timestamp | Self::Uint64
        )
    }

    #[must_use]
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::BigInt
                | Self::Int8
                | Self::Int16
                | Self::Int32
                | Self::Int64
                | Self::Uint8
                | Self::Uint16
                | Self::Uint32
                | Self::Uint64
        )
    }

    /// Scalars that may participate in entity keys.
    #[must_use]
    pub const fn is_keyable(self) -> bool {
        (self.is_primitive() && !matches!(self, Self::Float32 | Self::Float64))
            || matches!(self, Self::Enumeration | Self::Composition)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| UnknownName {
                kind: "field type",
                name: s.to_string(),
            })
    }
}

///
/// Multiplicity
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Multiplicity {
    Required,
    #[default]
    Optional,
    List,
    Set,
}

impl Multiplicity {
    pub const ALL: [Self; 4] = [Self::Required, Self::Optional, Self::List, Self::Set];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Optional => "optional",
            Self::List => "list",
            Self::Set => "set",
        }
    }

    #[must_use]
    pub const fn is_collection(self) -> bool {
        matches!(self, Self::List | Self::Set)
    }

    #[must_use]
    pub const fn is_single(self) -> bool {
        !self.is_collection()
    }
}

impl fmt::Display for Multiplicity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Multiplicity {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| UnknownName {
                kind: "multiplicity",
                name: s.to_string(),
            })
    }
}
