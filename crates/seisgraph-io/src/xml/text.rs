//! Textual representation of archive primitives.
//!
//! Vectors are space separated, complex numbers are written as `(re,im)`,
//! byte arrays as lowercase hex and times as ISO-8601 UTC.

use std::str::FromStr;

use seisgraph_core::{Complex, PrimitiveMut, Time};

pub(crate) fn format(value: PrimitiveMut<'_>) -> String {
    match value {
        PrimitiveMut::Int(v) => v.to_string(),
        PrimitiveMut::Float(v) => v.to_string(),
        PrimitiveMut::Double(v) => v.to_string(),
        PrimitiveMut::Bool(v) => String::from(if *v { "true" } else { "false" }),
        PrimitiveMut::Text(v) => v.clone(),
        PrimitiveMut::Time(v) => v.iso(),
        PrimitiveMut::ComplexFloat(v) => format_complex(v),
        PrimitiveMut::ComplexDouble(v) => format_complex(v),
        PrimitiveMut::Bytes(v) => hex::encode(v),
        PrimitiveMut::IntVec(v) => join(v.iter()),
        PrimitiveMut::FloatVec(v) => join(v.iter()),
        PrimitiveMut::DoubleVec(v) => join(v.iter()),
        PrimitiveMut::ComplexVec(v) => v.iter().map(format_complex).collect::<Vec<_>>().join(" "),
        PrimitiveMut::TextVec(v) => v.join(" "),
        PrimitiveMut::Enum(v) => v.name().to_string(),
    }
}

/// Parse `text` into the slot. Returns `false` and leaves the slot untouched
/// if the text does not fit the type.
pub(crate) fn parse(text: &str, value: PrimitiveMut<'_>) -> bool {
    let trimmed = text.trim();
    match value {
        PrimitiveMut::Int(v) => store(v, trimmed.parse().ok()),
        PrimitiveMut::Float(v) => store(v, trimmed.parse().ok()),
        PrimitiveMut::Double(v) => store(v, trimmed.parse().ok()),
        PrimitiveMut::Bool(v) => {
            *v = trimmed == "true" || trimmed == "1";
            true
        }
        PrimitiveMut::Text(v) => {
            *v = text.to_string();
            true
        }
        PrimitiveMut::Time(v) => store(v, Time::from_iso(trimmed).ok()),
        PrimitiveMut::ComplexFloat(v) => store(v, parse_complex(trimmed)),
        PrimitiveMut::ComplexDouble(v) => store(v, parse_complex(trimmed)),
        PrimitiveMut::Bytes(v) => store(v, hex::decode(trimmed).ok()),
        PrimitiveMut::IntVec(v) => store(v, split(trimmed)),
        PrimitiveMut::FloatVec(v) => store(v, split(trimmed)),
        PrimitiveMut::DoubleVec(v) => store(v, split(trimmed)),
        PrimitiveMut::ComplexVec(v) => store(
            v,
            trimmed
                .split_whitespace()
                .map(parse_complex)
                .collect::<Option<Vec<_>>>(),
        ),
        PrimitiveMut::TextVec(v) => {
            *v = trimmed.split_whitespace().map(str::to_string).collect();
            true
        }
        PrimitiveMut::Enum(v) => v.set_name(trimmed),
    }
}

fn store<T>(slot: &mut T, value: Option<T>) -> bool {
    match value {
        Some(value) => {
            *slot = value;
            true
        }
        None => false,
    }
}

fn join<T: ToString>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(" ")
}

fn split<T: FromStr>(text: &str) -> Option<Vec<T>> {
    text.split_whitespace().map(|t| t.parse().ok()).collect()
}

fn format_complex<T: ToString>(value: &Complex<T>) -> String {
    format!("({},{})", value.re.to_string(), value.im.to_string())
}

fn parse_complex<T: FromStr>(text: &str) -> Option<Complex<T>> {
    let inner = text.trim().strip_prefix('(')?.strip_suffix(')')?;
    let (re, im) = inner.split_once(',')?;
    Some(Complex::new(re.trim().parse().ok()?, im.trim().parse().ok()?))
}
