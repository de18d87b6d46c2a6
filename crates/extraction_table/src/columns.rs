use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use core_types::{Column, ColumnType, TableModel, TableRow};
use indexmap::IndexSet;
use serde_json::Value;

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// Builds a table from records keyed by their source field names.
///
/// Columns follow first-seen key order across all records; rows keep their
/// source keys, which are exposed as [`Column::original_key`]. Only
/// [`Column::key`] is unique; labels may repeat.
pub fn table_from_records(records: Vec<TableRow>) -> Option<TableModel> {
    let mut field_names = IndexSet::new();
    for record in &records {
        for key in record.keys() {
            field_names.insert(key.clone());
        }
    }

    let mut keys = KeyAllocator::default();
    let columns = field_names
        .iter()
        .enumerate()
        .map(|(index, name)| Column {
            key: keys.allocate(name, index),
            original_key: name.clone(),
            label: format_label(name),
            column_type: infer_column_type(records.iter().filter_map(|row| row.get(name))),
        })
        .collect();

    let table = TableModel {
        columns,
        rows: records,
    };
    table.is_renderable().then_some(table)
}

/// Hands out unique column keys, suffixing the column index on collision.
#[derive(Debug, Default)]
pub struct KeyAllocator {
    used: HashSet<String>,
}

impl KeyAllocator {
    pub fn allocate(&mut self, source: &str, index: usize) -> String {
        let base = normalize_key(source);
        let base = if base.is_empty() {
            format!("column_{}", index + 1)
        } else {
            base
        };

        let mut candidate = base.clone();
        while self.used.contains(&candidate) {
            candidate = format!("{candidate}_{index}");
        }
        self.used.insert(candidate.clone());
        candidate
    }
}

/// Lower-cases and collapses every run of non-alphanumerics to one `_`.
pub fn normalize_key(source: &str) -> String {
    let mut key = String::with_capacity(source.len());
    let mut pending_sep = false;
    for ch in source.chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !key.is_empty() {
                key.push('_');
            }
            pending_sep = false;
            key.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }
    key
}

/// `party_name` → `Party name`, `filingDate` → `Filing Date`.
pub fn format_label(source: &str) -> String {
    let mut spaced = String::with_capacity(source.len() + 4);
    let mut prev: Option<char> = None;
    for ch in source.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        if ch.is_uppercase() && prev.is_some_and(|p| p.is_lowercase() || p.is_ascii_digit()) {
            spaced.push(' ');
        }
        spaced.push(ch);
        prev = Some(ch);
    }

    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => collapsed,
    }
}

/// Infers a column type from its values. Nulls and blank strings are not
/// sampled; a column with no samples is text.
pub fn infer_column_type<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnType {
    let samples: Vec<&Value> = values.filter(|value| !is_blank(value)).collect();
    if samples.is_empty() {
        return ColumnType::Text;
    }

    if samples.iter().all(|v| is_numeric(v)) {
        ColumnType::Number
    } else if samples.iter().all(|v| is_date(v)) {
        ColumnType::Date
    } else if samples.iter().all(|v| is_boolean(v)) {
        ColumnType::Boolean
    } else {
        ColumnType::Text
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => s.trim().parse::<f64>().is_ok_and(f64::is_finite),
        _ => false,
    }
}

fn is_date(value: &Value) -> bool {
    let Value::String(s) = value else {
        return false;
    };
    let s = s.trim();
    DateTime::parse_from_rfc3339(s).is_ok()
        || DateTime::parse_from_rfc2822(s).is_ok()
        || DATE_FORMATS
            .iter()
            .any(|format| NaiveDate::parse_from_str(s, format).is_ok())
        || DATETIME_FORMATS
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(s, format).is_ok())
}

fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "false" | "yes" | "no"
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn colliding_keys_get_index_suffix() {
        let mut keys = KeyAllocator::default();
        assert_eq!(keys.allocate("a.b", 0), "a_b");
        assert_eq!(keys.allocate("a b", 1), "a_b_1");
        assert_eq!(keys.allocate("", 2), "column_3");
    }

    #[test]
    fn formats_programmatic_labels() {
        assert_eq!(format_label("party_name"), "Party name");
        assert_eq!(format_label("filingDate"), "Filing Date");
        assert_eq!(format_label("caseID"), "Case ID");
        assert_eq!(format_label("Section"), "Section");
        assert_eq!(format_label("__x__"), "X");
    }

    #[test]
    fn infers_types_from_all_samples() {
        let numbers = [json!(1), json!("2.5"), Value::Null, json!(" ")];
        assert_eq!(infer_column_type(numbers.iter()), ColumnType::Number);

        let dates = [json!("2024-03-01"), json!("March 5, 2023"), json!("2024-03-01T10:00:00Z")];
        assert_eq!(infer_column_type(dates.iter()), ColumnType::Date);

        let flags = [json!(true), json!("No"), json!("yes")];
        assert_eq!(infer_column_type(flags.iter()), ColumnType::Boolean);

        let mixed = [json!(1), json!("two")];
        assert_eq!(infer_column_type(mixed.iter()), ColumnType::Text);

        assert_eq!(infer_column_type([Value::Null].iter()), ColumnType::Text);
    }

    #[test]
    fn labels_may_repeat_but_keys_do_not() {
        let mut first = TableRow::new();
        first.insert("a b".to_string(), json!(1));
        let mut second = TableRow::new();
        second.insert("a_b".to_string(), json!(2));

        let table = table_from_records(vec![first, second]).expect("table");
        let labels: Vec<_> = table.columns.iter().map(|c| c.label.as_str()).collect();
        let keys: Vec<_> = table.columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(labels, vec!["A b", "A b"]);
        assert_eq!(keys, vec!["a_b", "a_b_1"]);
    }

    #[test]
    fn rejects_records_without_fields() {
        assert_eq!(table_from_records(vec![TableRow::new()]), None);
        assert_eq!(table_from_records(Vec::new()), None);
    }
}
