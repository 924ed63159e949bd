use crate::tree::{Association, Entity, Password1way, Password2way};
use arbor_schema::types::FieldType;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use derive_more::From;
use num_bigint::BigInt;
use rust_decimal::Decimal;
use std::fmt;
use ulid::Ulid;

///
/// Primitive
///
/// A typed scalar. Every variant maps to exactly one primitive
/// [`FieldType`].
///

#[derive(Clone, Debug, From, PartialEq)]
#[remain::sorted]
pub enum Primitive {
    BigInt(BigInt),
    Binary(Vec<u8>),
    Bool(bool),
    Date(NaiveDate),
    Decimal(Decimal),
    Float32(f32),
    Float64(f64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    String(String),
    Timestamp(DateTime<Utc>),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Ulid(Ulid),
}

impl Primitive {
    #[must_use]
    pub const fn field_type(&self) -> FieldType {
        match self {
            Self::BigInt(_) => FieldType::BigInt,
            Self::Binary(_) => FieldType::Binary,
            Self::Bool(_) => FieldType::Bool,
            Self::Date(_) => FieldType::Date,
            Self::Decimal(_) => FieldType::Decimal,
            Self::Float32(_) => FieldType::Float32,
            Self::Float64(_) => FieldType::Float64,
            Self::Int8(_) => FieldType::Int8,
            Self::Int16(_) => FieldType::Int16,
            Self::Int32(_) => FieldType::Int32,
            Self::Int64(_) => FieldType::Int64,
            Self::String(_) => FieldType::String,
            Self::Timestamp(_) => FieldType::Timestamp,
            Self::Uint8(_) => FieldType::Uint8,
            Self::Uint16(_) => FieldType::Uint16,
            Self::Uint32(_) => FieldType::Uint32,
            Self::Uint64(_) => FieldType::Uint64,
            Self::Ulid(_) => FieldType::Ulid,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for Primitive {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

// Canonical text form; the same text the encoder writes for string-encoded
// types.
impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BigInt(v) => write!(f, "{v}"),
            Self::Binary(v) => f.write_str(&STANDARD.encode(v)),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::Float32(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Int8(v) => write!(f, "{v}"),
            Self::Int16(v) => write!(f, "{v}"),
            Self::Int32(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::String(v) => f.write_str(v),
            Self::Timestamp(v) => f.write_str(&v.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Self::Uint8(v) => write!(f, "{v}"),
            Self::Uint16(v) => write!(f, "{v}"),
            Self::Uint32(v) => write!(f, "{v}"),
            Self::Uint64(v) => write!(f, "{v}"),
            Self::Ulid(v) => write!(f, "{v}"),
        }
    }
}

///
/// Value
///
/// What a single field slot or list element holds. Set fields hold
/// entities directly, never values.
///

#[derive(Clone, Debug, From, PartialEq)]
pub enum Value {
    Primitive(Primitive),
    #[from(ignore)]
    Enumeration(String),
    Association(Association),
    Password1way(Password1way),
    Password2way(Password2way),
    Composition(Box<Entity>),
}

impl Value {
    /// Enumeration value by name.
    #[must_use]
    pub fn enumeration(name: &str) -> Self {
        Self::Enumeration(name.to_string())
    }

    #[must_use]
    pub const fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Self::Primitive(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_entity(&self) -> Option<&Entity> {
        match self {
            Self::Composition(e) => Some(e),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_association(&self) -> Option<&Association> {
        match self {
            Self::Association(a) => Some(a),
            _ => None,
        }
    }

    /// Text used by `exists_if` comparisons and diagnostics.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Primitive(p) => Some(p.to_string()),
            Self::Enumeration(name) => Some(name.clone()),
            _ => None,
        }
    }

    /// Short kind label for diagnostics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Primitive(p) => p.field_type().as_str(),
            Self::Enumeration(_) => "enumeration",
            Self::Association(_) => "association",
            Self::Password1way(_) => "password_1way",
            Self::Password2way(_) => "password_2way",
            Self::Composition(_) => "composition",
        }
    }
}

impl From<Entity> for Value {
    fn from(entity: Entity) -> Self {
        Self::Composition(Box::new(entity))
    }
}

macro_rules! impl_value_from_primitive {
    ( $( $ty:ty ),* $(,)? ) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::Primitive(Primitive::from(v))
                }
            }
        )*
    };
}

impl_value_from_primitive!(
    BigInt,
    Vec<u8>,
    bool,
    NaiveDate,
    Decimal,
    f32,
    f64,
    i8,
    i16,
    i32,
    i64,
    String,
    &str,
    DateTime<Utc>,
    u8,
    u16,
    u32,
    u64,
    Ulid,
);
