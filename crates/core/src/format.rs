//! Display formatting for typed table cells.

use crate::table::ColumnType;
use chrono::{DateTime, Utc};
use serde_json::Value;

const NANOS_PER_MILLI: i64 = 1_000_000;

/// Render one cell according to its column type.
pub fn format_cell(column_type: ColumnType, value: &Value) -> String {
    match (column_type, value) {
        (_, Value::Null) => String::new(),
        (ColumnType::Timestamp, v) => format_timestamp(v),
        (ColumnType::Int64 | ColumnType::Float64, Value::Number(n)) => {
            group_digits(&n.to_string())
        }
        (ColumnType::Int64 | ColumnType::Float64, Value::String(s))
            if s.parse::<f64>().is_ok() =>
        {
            group_digits(s)
        }
        (_, Value::String(s)) => s.clone(),
        (_, v) => v.to_string(),
    }
}

fn format_timestamp(value: &Value) -> String {
    let nanos = match value {
        Value::String(s) => s.parse::<i64>().ok(),
        Value::Number(n) => n.as_i64(),
        _ => None,
    };
    nanos
        .and_then(nanos_to_datetime)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| match value {
            Value::String(s) => s.clone(),
            v => v.to_string(),
        })
}

/// Truncates to whole milliseconds.
pub fn nanos_to_datetime(nanos: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(nanos / NANOS_PER_MILLI)
}

/// Insert `,` every three digits of the integer part (en-US grouping).
pub fn group_digits(number: &str) -> String {
    let (sign, rest) = match number.strip_prefix('-') {
        Some(r) => ("-", r),
        None => ("", number),
    };
    let (int_part, frac_part) = match rest.find(['.', 'e', 'E']) {
        Some(i) => rest.split_at(i),
        None => (rest, ""),
    };
    if !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return number.to_string();
    }

    let mut grouped = String::with_capacity(number.len() + int_part.len() / 3);
    grouped.push_str(sign);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped.push_str(frac_part);
    grouped
}
