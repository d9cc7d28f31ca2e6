//! Wire types, shapes and native values.
//!
//! The wire type universe is a fixed closed set of tags. Every native value
//! maps to exactly one tag, and every mapping in this module is an exhaustive
//! match so the compiler rejects a new variant that is not wired through.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Closed set of on-wire type tags.
///
/// These are the MATLAB Production Server type names. The set is fixed;
/// values outside it are rejected with `UnsupportedType` at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireType {
    Char,
    Double,
    Single,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Logical,
}

impl WireType {
    /// The wire tag as it appears in `mwtype` fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            WireType::Char => "char",
            WireType::Double => "double",
            WireType::Single => "single",
            WireType::Int8 => "int8",
            WireType::Int16 => "int16",
            WireType::Int32 => "int32",
            WireType::Int64 => "int64",
            WireType::Uint8 => "uint8",
            WireType::Uint16 => "uint16",
            WireType::Uint32 => "uint32",
            WireType::Uint64 => "uint64",
            WireType::Logical => "logical",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One dimension of a wire shape.
///
/// Discovery schemas leave the length of `char` values symbolic (`"X"`);
/// everywhere else dimensions are concrete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dim {
    Fixed(usize),
    Symbolic,
}

impl Serialize for Dim {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Dim::Fixed(n) => serializer.serialize_u64(*n as u64),
            Dim::Symbolic => serializer.serialize_str("X"),
        }
    }
}

impl<'de> Deserialize<'de> for Dim {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DimVisitor;

        impl<'de> Visitor<'de> for DimVisitor {
            type Value = Dim;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a dimension length or the string \"X\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Dim, E> {
                Ok(Dim::Fixed(v as usize))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Dim, E> {
                if v < 0 {
                    return Err(E::custom("dimension must be non-negative"));
                }
                Ok(Dim::Fixed(v as usize))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Dim, E> {
                if v == "X" {
                    Ok(Dim::Symbolic)
                } else {
                    Err(E::custom(format!("unexpected symbolic dimension: {v}")))
                }
            }
        }

        deserializer.deserialize_any(DimVisitor)
    }
}

/// Declared or computed dimensions of a value for wire purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WireShape(pub Vec<Dim>);

impl WireShape {
    /// Shape of a scalar value: `[1, 1]`.
    pub fn scalar() -> Self {
        WireShape(vec![Dim::Fixed(1), Dim::Fixed(1)])
    }

    /// Discovery shape of a character value: `[1, "X"]`.
    pub fn char_symbolic() -> Self {
        WireShape(vec![Dim::Fixed(1), Dim::Symbolic])
    }

    /// Shape of a row of `len` elements: `[1, len]`.
    pub fn row(len: usize) -> Self {
        WireShape(vec![Dim::Fixed(1), Dim::Fixed(len)])
    }

    /// Concrete dimensions.
    pub fn of(dims: &[usize]) -> Self {
        WireShape(dims.iter().map(|d| Dim::Fixed(*d)).collect())
    }
}

/// Declared type of a parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    /// A single value of the given wire type.
    Scalar(WireType),
    /// An array of elements of one wire type with declared dimensions.
    Array { elem: WireType, shape: Vec<usize> },
}

impl TypeSpec {
    pub fn wire_type(&self) -> WireType {
        match self {
            TypeSpec::Scalar(ty) => *ty,
            TypeSpec::Array { elem, .. } => *elem,
        }
    }
}

/// A native value as seen by registered callables.
///
/// One variant per wire type, plus `Array` for tensor-like values. Arrays
/// hold scalar elements of a single wire type together with their shape.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Char(String),
    Double(f64),
    Single(f32),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Uint8(u8),
    Uint16(u16),
    Uint32(u32),
    Uint64(u64),
    Logical(bool),
    Array {
        elem: WireType,
        shape: Vec<usize>,
        data: Vec<Value>,
    },
}

impl Value {
    /// The wire tag for this value. Total over all variants.
    pub fn wire_type(&self) -> WireType {
        match self {
            Value::Char(_) => WireType::Char,
            Value::Double(_) => WireType::Double,
            Value::Single(_) => WireType::Single,
            Value::Int8(_) => WireType::Int8,
            Value::Int16(_) => WireType::Int16,
            Value::Int32(_) => WireType::Int32,
            Value::Int64(_) => WireType::Int64,
            Value::Uint8(_) => WireType::Uint8,
            Value::Uint16(_) => WireType::Uint16,
            Value::Uint32(_) => WireType::Uint32,
            Value::Uint64(_) => WireType::Uint64,
            Value::Logical(_) => WireType::Logical,
            Value::Array { elem, .. } => *elem,
        }
    }

    /// Measurable length, when the value has one.
    ///
    /// Strings report their character count and arrays their element count;
    /// plain scalars have no length. Drives the `large`-mode shape fallback.
    pub fn measurable_len(&self) -> Option<usize> {
        match self {
            Value::Char(s) => Some(s.chars().count()),
            Value::Array { data, .. } => Some(data.len()),
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Single(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Logical(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Char(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Char(v.to_string())
    }
}
