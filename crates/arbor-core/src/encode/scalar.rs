use crate::{token::Scalar, tree::Primitive};

/// Wire scalar for a primitive. Anything an IEEE-754 double cannot hold
/// exactly travels as its canonical text.
pub(crate) fn primitive_scalar(primitive: &Primitive) -> Scalar {
    match primitive {
        Primitive::Bool(v) => Scalar::Bool(*v),

        Primitive::Int8(v) => Scalar::Int(i64::from(*v)),
        Primitive::Int16(v) => Scalar::Int(i64::from(*v)),
        Primitive::Int32(v) => Scalar::Int(i64::from(*v)),
        Primitive::Uint8(v) => Scalar::Uint(u64::from(*v)),
        Primitive::Uint16(v) => Scalar::Uint(u64::from(*v)),
        Primitive::Uint32(v) => Scalar::Uint(u64::from(*v)),

        Primitive::Float32(v) => float(f64::from(*v)),
        Primitive::Float64(v) => float(*v),

        Primitive::String(v) => Scalar::String(v.clone()),

        Primitive::Int64(_)
        | Primitive::Uint64(_)
        | Primitive::BigInt(_)
        | Primitive::Decimal(_)
        | Primitive::Timestamp(_)
        | Primitive::Date(_)
        | Primitive::Binary(_)
        | Primitive::Ulid(_) => Scalar::String(primitive.to_string()),
    }
}

fn float(v: f64) -> Scalar {
    if v.is_nan() {
        Scalar::String("NaN".to_string())
    } else if v.is_infinite() {
        let text = if v > 0.0 { "Infinity" } else { "-Infinity" };
        Scalar::String(text.to_string())
    } else {
        Scalar::Float(v)
    }
}
