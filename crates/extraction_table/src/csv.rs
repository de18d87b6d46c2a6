use std::borrow::Cow;

use core_types::{Column, TableModel, TableRow};
use serde_json::Value;
use tracing::{trace, warn};

use crate::error::ExportError;

pub const CSV_ERROR_PREFIX: &str = "Error generating CSV:";

#[derive(Debug, Clone, Copy)]
pub struct CsvOptions {
    /// Rows rendered per batch before being appended to the output.
    pub batch_size: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self { batch_size: 1_000 }
    }
}

/// Renders `table` as CSV. Every field is quoted.
///
/// Never fails: on error the returned text is an `Error generating CSV: ...`
/// message instead of CSV content. Check with [`is_csv_error`].
pub fn table_to_csv(table: &TableModel, options: &CsvOptions) -> String {
    match try_table_to_csv(table, options) {
        Ok(csv) => csv,
        Err(err) => {
            warn!("csv generation failed: {err}");
            format!("{CSV_ERROR_PREFIX} {err}")
        }
    }
}

pub fn is_csv_error(content: &str) -> bool {
    content.starts_with(CSV_ERROR_PREFIX)
}

pub fn try_table_to_csv(table: &TableModel, options: &CsvOptions) -> Result<String, ExportError> {
    if table.columns.is_empty() {
        return Err(ExportError::NoColumns);
    }

    let mut out = table
        .columns
        .iter()
        .map(|column| quote(&column.label))
        .collect::<Vec<_>>()
        .join(",");

    for (index, batch) in table.rows.chunks(options.batch_size.max(1)).enumerate() {
        let mut block = String::new();
        for row in batch {
            block.push('\n');
            block.push_str(&render_row(row, &table.columns)?);
        }
        out.push_str(&block);
        trace!(batch = index, rows = batch.len(), "rendered csv batch");
    }
    Ok(out)
}

/// Looks a cell up by the column's source field, or by its key when the
/// column has no source field. Only one of the two is ever consulted.
pub fn cell_value<'a>(row: &'a TableRow, column: &Column) -> Option<&'a Value> {
    if column.original_key.is_empty() {
        row.get(&column.key)
    } else {
        row.get(&column.original_key)
    }
}

fn render_row(row: &TableRow, columns: &[Column]) -> Result<String, ExportError> {
    let fields = columns
        .iter()
        .map(|column| cell_text(cell_value(row, column)).map(|text| quote(&text)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(fields.join(","))
}

fn cell_text(value: Option<&Value>) -> Result<Cow<'_, str>, ExportError> {
    Ok(match value {
        None | Some(Value::Null) => Cow::Borrowed(""),
        Some(Value::String(s)) => Cow::Borrowed(s.as_str()),
        Some(Value::Bool(b)) => Cow::Owned(b.to_string()),
        Some(Value::Number(n)) => Cow::Owned(n.to_string()),
        Some(nested) => Cow::Owned(serde_json::to_string(nested)?),
    })
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
