//! Column type sniffing.
//!
//! The export endpoint returns no schema, so column types are guessed from the
//! literal JSON of the first row. Later rows are never checked.

use crate::table::ColumnType;
use serde_json::{Number, Value};

/// Smallest nanosecond epoch accepted as a timestamp (late 2020).
pub const TIMESTAMP_MIN_NANOS: i64 = 1_600_000_000_000_000_000;
/// Largest nanosecond epoch accepted as a timestamp (2030).
pub const TIMESTAMP_MAX_NANOS: i64 = 1_900_000_000_000_000_000;

/// Floats rendering this long or longer may have lost precision on the server.
const SAFE_FLOAT_DIGITS: usize = 12;

pub fn sniff_type(value: &Value) -> ColumnType {
    match value {
        Value::Bool(_) => ColumnType::Bool,
        Value::Number(n) => number_type(n),
        Value::String(s) => string_type(s),
        Value::Array(_) => ColumnType::Array,
        Value::Object(_) => ColumnType::Object,
        Value::Null => ColumnType::String,
    }
}

fn number_type(n: &Number) -> ColumnType {
    if n.is_i64() || n.is_u64() {
        return ColumnType::Int64;
    }
    let Some(f) = n.as_f64() else {
        return ColumnType::Float64;
    };
    let rendered = f.to_string();
    if rendered.len() < SAFE_FLOAT_DIGITS && f.fract() == 0.0 {
        ColumnType::Int64
    } else {
        ColumnType::Float64
    }
}

fn string_type(s: &str) -> ColumnType {
    if s.starts_with('[') {
        ColumnType::Array
    } else if s.starts_with('{') {
        ColumnType::Object
    } else if is_timestamp_string(s) {
        ColumnType::Timestamp
    } else {
        ColumnType::String
    }
}

/// Payload timestamps come back as nanosecond epoch strings: plain digits,
/// no sign, no leading zeros.
pub fn is_timestamp_string(s: &str) -> bool {
    if s.starts_with('0') || !s.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    s.parse::<i64>()
        .is_ok_and(|n| (TIMESTAMP_MIN_NANOS..=TIMESTAMP_MAX_NANOS).contains(&n))
}
