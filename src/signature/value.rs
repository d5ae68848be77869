//! Canonical Value Module
//!
//! Tagged value type for call arguments and configuration blocks, with a
//! single self-delimiting serializer used for key derivation.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use serde::Serialize;

use crate::error::{CacheError, Result};

/// Largest magnitude at which every integer is exactly representable as f64.
const MAX_EXACT_FLOAT_INT: f64 = 9_007_199_254_740_992.0;

// == Canonical Value ==
/// A normalized argument or configuration value.
///
/// Mappings are always key-sorted (`BTreeMap`); sequences keep their order.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    Null,
    Bool(bool),
    Integer(i128),
    Float(f64),
    Text(String),
    Seq(Vec<CanonicalValue>),
    Map(BTreeMap<String, CanonicalValue>),
}

impl CanonicalValue {
    /// Normalizes any serializable value through its JSON data model.
    ///
    /// Fails with `Serialization` when serde rejects the value (e.g. a map
    /// with non-string keys).
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_value(value)
            .map(Self::from)
            .map_err(|e| CacheError::Serialization(e.to_string()))
    }

    /// Appends the canonical encoding of this value to `out`.
    ///
    /// Every form is self-delimiting: text is length-prefixed and containers
    /// carry their element count, so no two distinct values share an encoding.
    pub fn write_canonical(&self, out: &mut String) {
        match self {
            CanonicalValue::Null => out.push('n'),
            CanonicalValue::Bool(b) => out.push_str(if *b { "b1" } else { "b0" }),
            CanonicalValue::Integer(i) => {
                let _ = write!(out, "i{};", i);
            }
            CanonicalValue::Float(f) => write_float(*f, out),
            CanonicalValue::Text(s) => write_text(s, out),
            CanonicalValue::Seq(items) => {
                let _ = write!(out, "l{}[", items.len());
                for item in items {
                    item.write_canonical(out);
                }
                out.push(']');
            }
            CanonicalValue::Map(map) => {
                let _ = write!(out, "m{}{{", map.len());
                for (key, value) in map {
                    write_text(key, out);
                    value.write_canonical(out);
                }
                out.push('}');
            }
        }
    }

    /// Returns the canonical encoding as a new string.
    pub fn to_canonical_string(&self) -> String {
        let mut out = String::new();
        self.write_canonical(&mut out);
        out
    }
}

fn write_text(s: &str, out: &mut String) {
    let _ = write!(out, "s{}:", s.len());
    out.push_str(s);
}

// Integral floats share the integer encoding so `15` and `15.0` are one call.
// Everything else is fixed at 6 significant digits; a value that rounds to an
// integer (`3.0000000000000004`) is encoded as that integer.
fn write_float(f: f64, out: &mut String) {
    if f.is_nan() {
        out.push_str("fnan;");
        return;
    }
    if f.is_infinite() {
        out.push_str(if f > 0.0 { "f+inf;" } else { "f-inf;" });
        return;
    }
    if is_exact_integer(f) {
        let _ = write!(out, "i{};", f as i128);
        return;
    }

    let rounded = format!("{:.5e}", f);
    match rounded.parse::<f64>() {
        Ok(r) if is_exact_integer(r) => {
            let _ = write!(out, "i{};", r as i128);
        }
        _ => {
            out.push('f');
            out.push_str(&rounded);
            out.push(';');
        }
    }
}

fn is_exact_integer(f: f64) -> bool {
    f.fract() == 0.0 && f.abs() <= MAX_EXACT_FLOAT_INT
}

// == Conversions ==
impl From<serde_json::Value> for CanonicalValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => CanonicalValue::Null,
            Value::Bool(b) => CanonicalValue::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    CanonicalValue::Integer(i128::from(i))
                } else if let Some(u) = n.as_u64() {
                    CanonicalValue::Integer(i128::from(u))
                } else {
                    n.as_f64().map_or(CanonicalValue::Null, CanonicalValue::Float)
                }
            }
            Value::String(s) => CanonicalValue::Text(s),
            Value::Array(items) => {
                CanonicalValue::Seq(items.into_iter().map(CanonicalValue::from).collect())
            }
            Value::Object(map) => CanonicalValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, CanonicalValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for CanonicalValue {
    fn from(value: &str) -> Self {
        CanonicalValue::Text(value.to_string())
    }
}

impl From<String> for CanonicalValue {
    fn from(value: String) -> Self {
        CanonicalValue::Text(value)
    }
}

impl From<bool> for CanonicalValue {
    fn from(value: bool) -> Self {
        CanonicalValue::Bool(value)
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for CanonicalValue {
                fn from(value: $t) -> Self {
                    CanonicalValue::Integer(value as i128)
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f64> for CanonicalValue {
    fn from(value: f64) -> Self {
        CanonicalValue::Float(value)
    }
}

impl From<f32> for CanonicalValue {
    fn from(value: f32) -> Self {
        CanonicalValue::Float(f64::from(value))
    }
}

impl<T: Into<CanonicalValue>> From<Option<T>> for CanonicalValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(CanonicalValue::Null, Into::into)
    }
}

impl<T: Into<CanonicalValue>> From<Vec<T>> for CanonicalValue {
    fn from(value: Vec<T>) -> Self {
        CanonicalValue::Seq(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<CanonicalValue>> From<BTreeMap<String, T>> for CanonicalValue {
    fn from(value: BTreeMap<String, T>) -> Self {
        CanonicalValue::Map(value.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl<T: Into<CanonicalValue>> From<HashMap<String, T>> for CanonicalValue {
    fn from(value: HashMap<String, T>) -> Self {
        CanonicalValue::Map(value.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}
