//! Scalar token to typed value conversion.
//!
//! Types that fit an IEEE-754 double accept JSON numbers only; the wide
//! types accept their canonical string form as well as a number.

use crate::{
    token::Scalar,
    tree::{Primitive, Value},
};
use arbor_schema::{
    resolved::{ResolvedField, ResolvedMetaModel},
    types::FieldType,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, NaiveDate, Utc};
use num_bigint::BigInt;
use rust_decimal::Decimal;
use std::{fmt::Display, str::FromStr};
use ulid::Ulid;

/// Parse a non-null scalar for a primitive or enumeration field.
pub(crate) fn parse_value(
    meta: &ResolvedMetaModel,
    field: &ResolvedField,
    scalar: Scalar,
) -> Result<Value, String> {
    if field.field_type != FieldType::Enumeration {
        return parse_primitive(field.field_type, scalar).map(Value::Primitive);
    }

    let Scalar::String(name) = scalar else {
        return Err(format!("expected enumeration, found {}", scalar.kind()));
    };
    let Some(id) = field.enumeration_target() else {
        return Err("enumeration field has no resolved target".to_string());
    };
    let enumeration = meta.enumeration(id);

    if enumeration.contains(&name) {
        Ok(Value::Enumeration(name))
    } else {
        Err(format!(
            "'{name}' is not a value of enumeration '{}'",
            enumeration.qualified_name()
        ))
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub(crate) fn parse_primitive(ty: FieldType, scalar: Scalar) -> Result<Primitive, String> {
    let found = scalar.kind();

    let primitive = match (ty, scalar) {
        (FieldType::Bool, Scalar::Bool(v)) => Primitive::Bool(v),

        (FieldType::Int8, s) => Primitive::Int8(integer(ty, s)?),
        (FieldType::Int16, s) => Primitive::Int16(integer(ty, s)?),
        (FieldType::Int32, s) => Primitive::Int32(integer(ty, s)?),
        (FieldType::Uint8, s) => Primitive::Uint8(integer(ty, s)?),
        (FieldType::Uint16, s) => Primitive::Uint16(integer(ty, s)?),
        (FieldType::Uint32, s) => Primitive::Uint32(integer(ty, s)?),

        (FieldType::Int64, Scalar::String(text)) => Primitive::Int64(from_text(ty, &text)?),
        (FieldType::Int64, s) => Primitive::Int64(integer(ty, s)?),
        (FieldType::Uint64, Scalar::String(text)) => Primitive::Uint64(from_text(ty, &text)?),
        (FieldType::Uint64, s) => Primitive::Uint64(integer(ty, s)?),

        (FieldType::BigInt, Scalar::String(text)) => Primitive::BigInt(from_text(ty, &text)?),
        (FieldType::BigInt, Scalar::Int(v)) => Primitive::BigInt(BigInt::from(v)),
        (FieldType::BigInt, Scalar::Uint(v)) => Primitive::BigInt(BigInt::from(v)),

        (FieldType::Decimal, Scalar::String(text)) => Primitive::Decimal(from_text(ty, &text)?),
        (FieldType::Decimal, Scalar::Int(v)) => Primitive::Decimal(Decimal::from(v)),
        (FieldType::Decimal, Scalar::Uint(v)) => Primitive::Decimal(Decimal::from(v)),
        (FieldType::Decimal, Scalar::Float(v)) => Primitive::Decimal(
            Decimal::try_from(v).map_err(|err| format!("{v} is not a valid {ty}: {err}"))?,
        ),

        (
            FieldType::Float64,
            s @ (Scalar::Int(_) | Scalar::Uint(_) | Scalar::Float(_) | Scalar::String(_)),
        ) => Primitive::Float64(float(ty, s)?),
        (
            FieldType::Float32,
            s @ (Scalar::Int(_) | Scalar::Uint(_) | Scalar::Float(_) | Scalar::String(_)),
        ) => {
            let v = float(ty, s)?;
            if v.is_finite() && v.abs() > f64::from(f32::MAX) {
                return Err(format!("{v} is out of range for {ty}"));
            }
            Primitive::Float32(v as f32)
        }

        (FieldType::String, Scalar::String(text)) => Primitive::String(text),

        (FieldType::Timestamp, Scalar::String(text)) => Primitive::Timestamp(
            DateTime::parse_from_rfc3339(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|err| invalid(ty, &text, err))?,
        ),
        (FieldType::Date, Scalar::String(text)) => Primitive::Date(
            NaiveDate::parse_from_str(&text, "%Y-%m-%d").map_err(|err| invalid(ty, &text, err))?,
        ),
        (FieldType::Binary, Scalar::String(text)) => {
            Primitive::Binary(STANDARD.decode(&text).map_err(|err| invalid(ty, &text, err))?)
        }
        (FieldType::Ulid, Scalar::String(text)) => {
            Primitive::Ulid(Ulid::from_string(&text).map_err(|err| invalid(ty, &text, err))?)
        }

        _ => return Err(format!("expected {ty}, found {found}")),
    };

    Ok(primitive)
}

fn invalid(ty: FieldType, text: &str, err: impl Display) -> String {
    format!("'{text}' is not a valid {ty}: {err}")
}

fn from_text<T>(ty: FieldType, text: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    text.parse().map_err(|err| invalid(ty, text, err))
}

// Integer from a JSON number, range checked.
fn integer<T>(ty: FieldType, scalar: Scalar) -> Result<T, String>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    match scalar {
        Scalar::Int(v) => {
            <T as TryFrom<i64>>::try_from(v).map_err(|_| format!("{v} is out of range for {ty}"))
        }
        Scalar::Uint(v) => {
            <T as TryFrom<u64>>::try_from(v).map_err(|_| format!("{v} is out of range for {ty}"))
        }
        Scalar::Float(v) => Err(format!("expected an integer for {ty}, found {v}")),
        other => Err(format!("expected {ty}, found {}", other.kind())),
    }
}

#[allow(clippy::cast_precision_loss)]
fn float(ty: FieldType, scalar: Scalar) -> Result<f64, String> {
    match scalar {
        Scalar::Int(v) => Ok(v as f64),
        Scalar::Uint(v) => Ok(v as f64),
        Scalar::Float(v) => Ok(v),
        Scalar::String(text) => match text.as_str() {
            "NaN" => Ok(f64::NAN),
            "Infinity" => Ok(f64::INFINITY),
            "-Infinity" => Ok(f64::NEG_INFINITY),
            _ => from_text(ty, &text),
        },
        other => Err(format!("expected {ty}, found {}", other.kind())),
    }
}
