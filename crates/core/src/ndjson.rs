//! Decoding of export responses into [`DatasetTable`]s.
//!
//! A successful export is newline-delimited JSON, one object per row:
//! ```jsonl
//! {"timestamp":"1700000000000000000","host":"web-1","count":3}
//! {"timestamp":"1700000000100000000","host":"web-2","count":5}
//! ```
//!
//! The key order of the first row fixes the column order for every row.

use crate::sniff::sniff_type;
use crate::table::{Column, DatasetSchema, DatasetTable};
use serde_json::Value;

pub const NO_DATA_MESSAGE: &str = "No data returned";

/// An HTTP response as seen by the decoder.
#[derive(Debug, Clone, Copy)]
pub struct RawResponse<'a> {
    pub status: u16,
    /// Reason phrase for `status`, used when the body carries no message.
    pub reason: &'a str,
    pub content_type: Option<&'a str>,
    pub body: &'a str,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum DecodeError {
    #[error("Malformed row at line {line}: {source}")]
    Json {
        line: usize,
        source: serde_json::Error,
    },
    #[error("First row is not a JSON object")]
    NotAnObject,
}

/// Turn an export response into a table; every failure becomes
/// [`DatasetTable::Error`].
pub fn decode_response(resp: RawResponse<'_>) -> DatasetTable {
    let body = strip_final_newline(resp.body);
    if resp.status != 200 {
        return DatasetTable::Error(error_message(&resp, body));
    }
    if body.trim().is_empty() {
        return DatasetTable::error(NO_DATA_MESSAGE);
    }
    match decode_rows(body) {
        Ok((schema, rows)) => {
            tracing::debug!(columns = schema.len(), rows = rows.len(), "decoded export");
            DatasetTable::Ready { schema, rows }
        }
        Err(e) => DatasetTable::Error(e.to_string()),
    }
}

/// Parse NDJSON text (without a trailing newline) into schema + rows.
pub fn decode_rows(body: &str) -> Result<(DatasetSchema, Vec<Vec<Value>>), DecodeError> {
    let mut lines = body.split('\n');

    let first = parse_line(lines.next().unwrap_or_default(), 1)?;
    let schema = schema_from_first_row(&first)?;
    let mut rows = vec![project(&schema, &first)];

    for (i, line) in lines.enumerate() {
        let value = parse_line(line, i + 2)?;
        rows.push(project(&schema, &value));
    }

    Ok((schema, rows))
}

fn parse_line(line: &str, line_num: usize) -> Result<Value, DecodeError> {
    serde_json::from_str(line).map_err(|e| DecodeError::Json {
        line: line_num,
        source: e,
    })
}

/// Missing keys (or non-object rows) project to `null`.
fn project(schema: &DatasetSchema, row: &Value) -> Vec<Value> {
    schema
        .names()
        .map(|name| row.get(name).cloned().unwrap_or(Value::Null))
        .collect()
}

fn schema_from_first_row(row: &Value) -> Result<DatasetSchema, DecodeError> {
    let obj = row.as_object().ok_or(DecodeError::NotAnObject)?;
    let columns = obj
        .iter()
        .map(|(name, value)| Column {
            name: name.clone(),
            column_type: sniff_type(value),
        })
        .collect();
    Ok(DatasetSchema { columns })
}

fn strip_final_newline(body: &str) -> &str {
    body.strip_suffix('\n').unwrap_or(body)
}

fn error_message(resp: &RawResponse<'_>, body: &str) -> String {
    let is_json = resp
        .content_type
        .is_some_and(|ct| ct.contains("application/json"));
    if is_json {
        if let Ok(json) = serde_json::from_str::<Value>(body) {
            return json
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(resp.reason)
                .to_string();
        }
    }
    match body.split('\n').next() {
        Some(first) if !first.is_empty() => first.to_string(),
        _ => resp.reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ColumnType;
    use serde_json::json;

    fn ok(body: &str) -> RawResponse<'_> {
        RawResponse {
            status: 200,
            reason: "OK",
            content_type: Some("application/x-ndjson"),
            body,
        }
    }

    #[test]
    fn trailing_newline_does_not_add_a_row() {
        let table = decode_response(ok("{\"a\":1}\n{\"a\":2}\n"));
        assert_eq!(table.rows().len(), 2);
        let table = decode_response(ok("{\"a\":1}\n{\"a\":2}"));
        assert_eq!(table.rows().len(), 2);
    }

    #[test]
    fn first_row_fixes_columns() {
        let body = concat!(
            "{\"ts\":\"1700000000000000000\",\"host\":\"web-1\",\"n\":3,\"ok\":true}\n",
            "{\"host\":\"web-2\",\"extra\":1}\n",
        );
        let table = decode_response(ok(body));
        let schema = table.schema().unwrap();
        let cols: Vec<_> = schema
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.column_type))
            .collect();
        assert_eq!(
            cols,
            [
                ("ts", ColumnType::Timestamp),
                ("host", ColumnType::String),
                ("n", ColumnType::Int64),
                ("ok", ColumnType::Bool),
            ]
        );
        assert_eq!(
            table.rows()[1],
            vec![Value::Null, json!("web-2"), Value::Null, Value::Null]
        );
    }

    #[test]
    fn later_rows_are_not_type_checked() {
        let table = decode_response(ok("{\"v\":1}\n{\"v\":\"text\"}\n"));
        assert_eq!(table.schema().unwrap().columns[0].column_type, ColumnType::Int64);
        assert_eq!(table.rows()[1][0], json!("text"));
    }

    #[test]
    fn empty_success_is_an_error() {
        assert_eq!(
            decode_response(ok("")).error_message(),
            Some(NO_DATA_MESSAGE)
        );
        assert_eq!(
            decode_response(ok("  \n")).error_message(),
            Some(NO_DATA_MESSAGE)
        );
    }

    #[test]
    fn plain_error_uses_first_line() {
        for content_type in [None, Some("text/plain"), Some("application/json")] {
            let table = decode_response(RawResponse {
                status: 500,
                reason: "Internal Server Error",
                content_type,
                body: "boom",
            });
            assert_eq!(table.error_message(), Some("boom"));
        }
        let table = decode_response(RawResponse {
            status: 502,
            reason: "Bad Gateway",
            content_type: None,
            body: "upstream\nsecond line\n",
        });
        assert_eq!(table.error_message(), Some("upstream"));
    }

    #[test]
    fn empty_error_body_uses_reason() {
        let table = decode_response(RawResponse {
            status: 404,
            reason: "Not Found",
            content_type: None,
            body: "",
        });
        assert_eq!(table.error_message(), Some("Not Found"));
    }

    #[test]
    fn json_error_uses_message_field() {
        let table = decode_response(RawResponse {
            status: 400,
            reason: "Bad Request",
            content_type: Some("application/json; charset=utf-8"),
            body: r#"{"ok":false,"message":"unknown verb \"fliter\""}"#,
        });
        assert_eq!(table.error_message(), Some("unknown verb \"fliter\""));

        let table = decode_response(RawResponse {
            status: 400,
            reason: "Bad Request",
            content_type: Some("application/json"),
            body: r#"{"ok":false}"#,
        });
        assert_eq!(table.error_message(), Some("Bad Request"));
    }

    #[test]
    fn malformed_line_is_reported() {
        let table = decode_response(ok("{\"a\":1}\nnot json\n"));
        let msg = table.error_message().unwrap();
        assert!(msg.contains("line 2"), "{msg}");
    }

    #[test]
    fn first_row_must_be_object() {
        let table = decode_response(ok("[1,2]\n"));
        assert_eq!(table.error_message(), Some("First row is not a JSON object"));
    }
}
