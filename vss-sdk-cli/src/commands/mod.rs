//! CLI subcommands.

pub mod get;
pub mod probe;
pub mod provide;
pub mod publish;
pub mod set;
pub mod subscribe;

use crate::error::CliError;
use clap::ValueEnum;
use vss_sdk::value::Value;

/// Explicit value kind for `set`/`publish` arguments.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ValueKindArg {
    Bool,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float,
    Double,
    String,
}

/// Parses a value literal, either against an explicit kind or by
/// inference: bool literals, then integers, then floats, else a string.
pub fn parse_value(raw: &str, kind: Option<ValueKindArg>) -> Result<Value, CliError> {
    let invalid = |reason: &str| CliError::InvalidValue {
        raw: raw.to_string(),
        reason: reason.to_string(),
    };

    match kind {
        Some(ValueKindArg::Bool) => raw
            .parse()
            .map(Value::Bool)
            .map_err(|_| invalid("expected true or false")),
        Some(ValueKindArg::Int32) => raw
            .parse()
            .map(Value::Int32)
            .map_err(|_| invalid("expected a 32-bit integer")),
        Some(ValueKindArg::Uint32) => raw
            .parse()
            .map(Value::Uint32)
            .map_err(|_| invalid("expected an unsigned 32-bit integer")),
        Some(ValueKindArg::Int64) => raw
            .parse()
            .map(Value::Int64)
            .map_err(|_| invalid("expected a 64-bit integer")),
        Some(ValueKindArg::Uint64) => raw
            .parse()
            .map(Value::Uint64)
            .map_err(|_| invalid("expected an unsigned 64-bit integer")),
        Some(ValueKindArg::Float) => raw
            .parse()
            .map(Value::Float)
            .map_err(|_| invalid("expected a float")),
        Some(ValueKindArg::Double) => raw
            .parse()
            .map(Value::Double)
            .map_err(|_| invalid("expected a double")),
        Some(ValueKindArg::String) => Ok(Value::String(raw.to_string())),
        None => Ok(infer_value(raw)),
    }
}

fn infer_value(raw: &str) -> Value {
    if let Ok(flag) = raw.parse::<bool>() {
        return Value::Bool(flag);
    }
    if let Ok(int) = raw.parse::<i32>() {
        return Value::Int32(int);
    }
    if let Ok(int) = raw.parse::<i64>() {
        return Value::Int64(int);
    }
    if let Ok(float) = raw.parse::<f64>() {
        return Value::Double(float);
    }
    Value::String(raw.to_string())
}
