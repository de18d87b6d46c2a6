use core_types::{Column, TableModel, TableRow};
use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::columns::{KeyAllocator, format_label, infer_column_type, table_from_records};
use crate::lines::{
    DESCRIPTION, SECTION, VALUE, is_separator_row, json_fragment, key_value, pipe_cells,
    prepare_text, strip_backticks,
};

/// Shapes of extraction output that can be turned into a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionFormat {
    Json,
    MarkdownSections,
    KeyValue,
    PipeTable,
    EmbeddedJson,
}

type Recognizer = fn(&str) -> Option<TableModel>;

/// Text conventions in priority order. The first one that yields a
/// renderable table wins; results are never merged.
const TEXT_RECOGNIZERS: &[(ExtractionFormat, Recognizer)] = &[
    (ExtractionFormat::MarkdownSections, parse_markdown_sections),
    (ExtractionFormat::KeyValue, parse_key_values),
    (ExtractionFormat::PipeTable, parse_pipe_table),
    (ExtractionFormat::EmbeddedJson, parse_embedded_json),
];

/// Structures an extraction result for display. `None` when nothing
/// tabular could be recovered.
pub fn parse_extraction_data(raw: &str) -> Option<TableModel> {
    parse_with_format(raw).map(|(_, table)| table)
}

/// Like [`parse_extraction_data`], also reporting which shape matched.
pub fn parse_with_format(raw: &str) -> Option<(ExtractionFormat, TableModel)> {
    let text = prepare_text(raw);
    if text.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<Value>(&text) {
        return table_from_json(&value).map(|table| (ExtractionFormat::Json, table));
    }

    let found = TEXT_RECOGNIZERS
        .iter()
        .find_map(|(format, recognize)| recognize(&text).map(|table| (*format, table)));
    match &found {
        Some((format, table)) => debug!(
            ?format,
            columns = table.columns.len(),
            rows = table.rows.len(),
            "structured extraction result"
        ),
        None => debug!(chars = text.len(), "extraction result is not tabular"),
    }
    found
}

pub(crate) fn table_from_json(value: &Value) -> Option<TableModel> {
    let records: Vec<TableRow> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_object)
            .map(|object| object.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .collect(),
        Value::Object(object) => vec![object.iter().map(|(k, v)| (k.clone(), v.clone())).collect()],
        _ => return None,
    };
    table_from_records(records)
}

fn parse_markdown_sections(text: &str) -> Option<TableModel> {
    let mut section: Option<String> = None;
    let mut description: Option<String> = None;
    let mut records = Vec::new();

    for line in text.lines() {
        if let Some(caps) = SECTION.captures(line) {
            section = Some(caps[1].to_string());
            description = None;
        } else if let Some(caps) = DESCRIPTION.captures(line) {
            if section.is_some() {
                description = Some(caps[1].to_string());
            }
        } else if let Some(caps) = VALUE.captures(line)
            && let (Some(section), Some(description)) = (&section, description.take())
        {
            let mut record = TableRow::new();
            record.insert("Section".to_string(), Value::String(section.clone()));
            record.insert("Description".to_string(), Value::String(description));
            record.insert(
                "Value".to_string(),
                Value::String(strip_backticks(&caps[1]).to_string()),
            );
            records.push(record);
        }
    }

    table_from_records(records)
}

fn parse_key_values(text: &str) -> Option<TableModel> {
    let pairs: Vec<(String, String)> = text.lines().filter_map(key_value).collect();
    if pairs.len() < 2 {
        return None;
    }

    // Repeated keys keep their first position; the last value wins.
    let record: TableRow = pairs
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect::<IndexMap<_, _>>();
    table_from_records(vec![record])
}

fn parse_pipe_table(text: &str) -> Option<TableModel> {
    let qualifying: Vec<Vec<String>> = text.lines().filter_map(pipe_cells).collect();
    if qualifying.len() < 2 {
        return None;
    }

    let mut lines = qualifying.into_iter().filter(|cells| !is_separator_row(cells));
    let header = lines.next()?;

    let mut keys = KeyAllocator::default();
    let header: Vec<(String, String)> = header
        .into_iter()
        .enumerate()
        .map(|(index, cell)| {
            let key = keys.allocate(&cell, index);
            let label = if cell.is_empty() {
                format_label(&key)
            } else {
                cell
            };
            (key, label)
        })
        .collect();

    let rows: Vec<TableRow> = lines
        .map(|cells| {
            header
                .iter()
                .zip(cells)
                .map(|((key, _), cell)| (key.clone(), Value::String(cell)))
                .collect()
        })
        .collect();

    let columns = header
        .into_iter()
        .map(|(key, label)| Column {
            column_type: infer_column_type(rows.iter().filter_map(|row| row.get(&key))),
            original_key: key.clone(),
            key,
            label,
        })
        .collect();

    let table = TableModel { columns, rows };
    table.is_renderable().then_some(table)
}

fn parse_embedded_json(text: &str) -> Option<TableModel> {
    text.lines()
        .filter_map(json_fragment)
        .filter_map(|fragment| serde_json::from_str::<Value>(fragment).ok())
        .find_map(|value| table_from_json(&value))
}

#[cfg(test)]
mod tests {
    use core_types::ColumnType;
    use serde_json::json;

    use super::*;

    #[test]
    fn json_array_becomes_one_row_per_object() {
        let text = r#"[{"party":"Alice","amount":100},{"party":"Bob","court":"High"}]"#;
        let (format, table) = parse_with_format(text).expect("table");
        assert_eq!(format, ExtractionFormat::Json);
        assert_eq!(table.rows.len(), 2);
        let keys: Vec<_> = table.columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["party", "amount", "court"]);
        assert_eq!(table.column("amount").map(|c| c.column_type), Some(ColumnType::Number));
    }

    #[test]
    fn colliding_json_keys_stay_distinct() {
        let table = parse_extraction_data(r#"[{"a.b":1},{"a b":2}]"#).expect("table");
        assert_eq!(table.columns.len(), 2);
        assert_ne!(table.columns[0].key, table.columns[1].key);
        assert_eq!(table.columns[1].original_key, "a b");
    }

    #[test]
    fn single_object_is_one_row() {
        let table =
            parse_extraction_data(r#"{"caseNumber":"CS-12","filed":"2024-01-03","sealed":false}"#)
                .expect("table");
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.columns[0].label, "Case Number");
        assert_eq!(table.column("filed").map(|c| c.column_type), Some(ColumnType::Date));
        assert_eq!(table.column("sealed").map(|c| c.column_type), Some(ColumnType::Boolean));
    }

    #[test]
    fn scalar_json_is_not_tabular() {
        assert_eq!(parse_extraction_data("42"), None);
        assert_eq!(parse_extraction_data("[1, 2, 3]"), None);
        assert_eq!(parse_extraction_data("[]"), None);
    }

    #[test]
    fn markdown_sections_become_rows() {
        let text = "## Parties\n- **Description:** Names\n- **Value:** `Alice, Bob`";
        let (format, table) = parse_with_format(text).expect("table");
        assert_eq!(format, ExtractionFormat::MarkdownSections);
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0]["Section"], json!("Parties"));
        assert_eq!(table.rows[0]["Description"], json!("Names"));
        assert_eq!(table.rows[0]["Value"], json!("Alice, Bob"));
        let labels: Vec<_> = table.columns.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Section", "Description", "Value"]);
    }

    #[test]
    fn markdown_value_without_description_is_ignored() {
        let text = "## Parties\n- **Value:** orphan\n- **Description:** Term\n- **Value:** 12 months\n- **Value:** again";
        let table = parse_extraction_data(text).expect("table");
        assert_eq!(table.rows.len(), 1);
        assert_eq!(table.rows[0]["Value"], json!("12 months"));
    }

    #[test]
    fn key_value_lines_become_single_row() {
        let text = "Petitioner: Acme Ltd\nRespondent: State\nFiled On: 2023-05-01";
        let (format, table) = parse_with_format(text).expect("table");
        assert_eq!(format, ExtractionFormat::KeyValue);
        assert_eq!(table.rows.len(), 1);
        let labels: Vec<_> = table.columns.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["Petitioner", "Respondent", "Filed On"]);
        assert_eq!(table.column("filed_on").map(|c| c.column_type), Some(ColumnType::Date));
    }

    #[test]
    fn single_key_value_line_is_not_enough() {
        assert_eq!(parse_extraction_data("Note: nothing else here"), None);
    }

    #[test]
    fn pipe_table_uses_first_line_as_header() {
        let text = "| Case No | Court | Year |\n|---|---|---|\n| 12 | High Court | 2021 | extra |\n| 13 | District |";
        let (format, table) = parse_with_format(text).expect("table");
        assert_eq!(format, ExtractionFormat::PipeTable);
        let keys: Vec<_> = table.columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["case_no", "court", "year"]);
        assert_eq!(table.columns[0].label, "Case No");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].len(), 3);
        assert!(!table.rows[1].contains_key("year"));
        assert_eq!(table.column("case_no").map(|c| c.column_type), Some(ColumnType::Number));
    }

    #[test]
    fn pipe_header_without_rows_is_absent() {
        assert_eq!(parse_extraction_data("| a | b |\n|---|---|"), None);
    }

    #[test]
    fn embedded_json_line_is_used_as_last_resort() {
        let text = "Here is what I found:\n[{\"clause\":\"7.1\",\"risk\":\"high\"}]\nLet me know.";
        let (format, table) = parse_with_format(text).expect("table");
        assert_eq!(format, ExtractionFormat::EmbeddedJson);
        assert_eq!(table.rows.len(), 1);
    }

    #[test]
    fn citation_codes_are_stripped_before_parsing() {
        let table = parse_extraction_data("Judge: R. Rao [[C:4]]\nBench: Division [[C:5]]")
            .expect("table");
        assert_eq!(table.rows[0]["Judge"], json!("R. Rao"));
    }

    #[test]
    fn prose_is_not_tabular() {
        assert_eq!(parse_extraction_data("The contract looks fine overall."), None);
        assert_eq!(parse_extraction_data(""), None);
        assert_eq!(parse_extraction_data("{not json"), None);
    }
}
