use extraction_table::{
    CsvOptions, EMPTY_STATE_MESSAGE, is_extraction_response, parse_extraction_data, table_to_csv,
};
use serde_json::{Value, json};

fn key_union(rows: &[Value]) -> Vec<String> {
    let mut keys = Vec::new();
    for row in rows {
        for key in row.as_object().expect("object").keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }
    keys
}

#[test]
fn json_arrays_keep_row_count_and_key_union() {
    let samples = vec![
        vec![json!({"a": 1})],
        vec![json!({"a": 1}), json!({"b": "x"}), json!({"a": 2, "c": true})],
        vec![json!({"party": "A", "role": "buyer"}), json!({}), json!({"role": "seller"})],
    ];

    for rows in samples {
        let text = Value::Array(rows.clone()).to_string();
        assert!(is_extraction_response(&text), "not classified: {text}");

        let table = parse_extraction_data(&text).expect("table");
        assert_eq!(table.rows.len(), rows.len());
        let originals: Vec<_> = table.columns.iter().map(|c| c.original_key.clone()).collect();
        assert_eq!(originals, key_union(&rows));

        let csv = table_to_csv(&table, &CsvOptions::default());
        let lines: Vec<_> = csv.lines().collect();
        assert_eq!(lines.len(), rows.len() + 1);
        assert_eq!(lines[0].split("\",\"").count(), table.columns.len());
    }
}

#[test]
fn column_keys_are_unique() {
    let table = parse_extraction_data(r#"[{"a.b": 1}, {"a b": 2}, {"A-B": 3}]"#).expect("table");
    let mut keys: Vec<_> = table.columns.iter().map(|c| c.key.clone()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), 3);
}

#[test]
fn classification_and_parsing_agree_on_prose() {
    let text = "The lease was reviewed and no issues were found.";
    assert!(!is_extraction_response(text));
    assert!(parse_extraction_data(text).is_none());
    assert!(!EMPTY_STATE_MESSAGE.is_empty());
}
