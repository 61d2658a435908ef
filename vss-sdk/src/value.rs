//! Signal value model.
//!
//! A [`Value`] is a closed tagged union over the eight primitive kinds the
//! broker understands. Exactly one variant is active at a time and numeric
//! variants never convert implicitly: a typed read of an `Int32` signal that
//! receives a `Float` is a decode error, not a lossy cast.

use std::fmt;
use thiserror::Error;

/// The kind of a [`Value`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float,
    Double,
    String,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int32 => "int32",
            Self::Uint32 => "uint32",
            Self::Int64 => "int64",
            Self::Uint64 => "uint64",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
        };
        write!(f, "{}", name)
    }
}

/// A signal value. One variant per wire kind.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Uint32(u32),
    Int64(i64),
    Uint64(u64),
    Float(f32),
    Double(f64),
    String(String),
}

impl Value {
    /// Returns the kind of the active variant.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int32(_) => ValueKind::Int32,
            Self::Uint32(_) => ValueKind::Uint32,
            Self::Int64(_) => ValueKind::Int64,
            Self::Uint64(_) => ValueKind::Uint64,
            Self::Float(_) => ValueKind::Float,
            Self::Double(_) => ValueKind::Double,
            Self::String(_) => ValueKind::String,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int32(v) => write!(f, "{}", v),
            Self::Uint32(v) => write!(f, "{}", v),
            Self::Int64(v) => write!(f, "{}", v),
            Self::Uint64(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::String(v) => write!(f, "{}", v),
        }
    }
}

/// Errors that can occur when decoding a [`Value`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The active variant did not match the expected kind.
    #[error("expected {expected} value, got {actual}")]
    Mismatch {
        expected: ValueKind,
        actual: ValueKind,
    },

    /// A wire frame carried no tagged variant at all.
    #[error("value frame carried no tagged variant")]
    Empty,
}

/// Conversion between Rust primitives and [`Value`] variants.
///
/// Decoding is explicit: [`SignalValue::from_value`] fails with
/// [`ValueError::Mismatch`] when the active variant differs from the
/// expected kind. Nothing substitutes a default value on mismatch.
pub trait SignalValue: Sized + Send + 'static {
    /// The value kind this type maps to.
    const KIND: ValueKind;

    /// Wraps this primitive in its [`Value`] variant.
    fn into_value(self) -> Value;

    /// Extracts this primitive from a [`Value`], failing on kind mismatch.
    fn from_value(value: Value) -> Result<Self, ValueError>;
}

macro_rules! impl_signal_value {
    ($ty:ty, $variant:ident) => {
        impl SignalValue for $ty {
            const KIND: ValueKind = ValueKind::$variant;

            fn into_value(self) -> Value {
                Value::$variant(self)
            }

            fn from_value(value: Value) -> Result<Self, ValueError> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(ValueError::Mismatch {
                        expected: ValueKind::$variant,
                        actual: other.kind(),
                    }),
                }
            }
        }

        impl From<$ty> for Value {
            fn from(v: $ty) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_signal_value!(bool, Bool);
impl_signal_value!(i32, Int32);
impl_signal_value!(u32, Uint32);
impl_signal_value!(i64, Int64);
impl_signal_value!(u64, Uint64);
impl_signal_value!(f32, Float);
impl_signal_value!(f64, Double);
impl_signal_value!(String, String);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
