use opalview_core::format::format_cell;
use opalview_core::{DatasetInfo, DatasetSchema, DatasetTable};
use serde_json::Value;

/// Render a ready table as aligned text. Numeric columns are right-aligned.
pub fn render_table(schema: &DatasetSchema, rows: &[Vec<Value>]) -> String {
    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            schema
                .columns
                .iter()
                .zip(row)
                .map(|(col, v)| format_cell(col.column_type, v))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = schema
        .columns
        .iter()
        .enumerate()
        .map(|(i, col)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(col.name.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    let header: Vec<String> = schema
        .columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| pad(&col.name, *w, false))
        .collect();
    push_line(&mut out, &header);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_line(&mut out, &rule);

    for row in &cells {
        let line: Vec<String> = row
            .iter()
            .zip(&schema.columns)
            .zip(&widths)
            .map(|((cell, col), w)| pad(cell, *w, col.column_type.is_numeric()))
            .collect();
        push_line(&mut out, &line);
    }
    out
}

/// One-line description of a non-ready table, or `None` when it has data.
pub fn table_status(table: &DatasetTable) -> Option<String> {
    match table {
        DatasetTable::Running => Some("Running…".to_string()),
        DatasetTable::Error(msg) => Some(format!("Query failed: {msg}")),
        DatasetTable::Ready { .. } => None,
    }
}

pub fn render_datasets<'a>(datasets: impl IntoIterator<Item = &'a DatasetInfo>) -> String {
    datasets
        .into_iter()
        .map(|d| format!("{:>12}  {}\n", d.id, d.name))
        .collect()
}

fn pad(text: &str, width: usize, right: bool) -> String {
    if right {
        format!("{text:>width$}")
    } else {
        format!("{text:<width$}")
    }
}

fn push_line(out: &mut String, cells: &[String]) {
    out.push_str(cells.join("  ").trim_end());
    out.push('\n');
}
