//! JSON normalizer
//!
//! Scalar fields become key-value pairs with dotted keys; the first array of
//! objects found becomes a table whose columns are the sorted union of the
//! element keys. This mirrors how selector-based templates address JSON
//! sources (dotted paths and per-element records).

use crate::error::NormalizationError;
use serde_json::Value;
use std::collections::BTreeSet;
use tabula_domain::{DocumentModel, KeyValuePair, Table};

/// Flattening depth for nested objects
const MAX_DEPTH: usize = 4;

pub(crate) fn normalize(raw: &[u8]) -> Result<DocumentModel, NormalizationError> {
    let value: Value = serde_json::from_slice(raw).map_err(|e| NormalizationError::Unparsable {
        kind: "json",
        reason: e.to_string(),
    })?;

    let mut key_value_pairs = Vec::new();
    flatten_scalars("", &value, 0, &mut key_value_pairs);

    let tables = find_record_array(&value)
        .map(|records| vec![records_to_table(records)])
        .unwrap_or_default();

    let model = DocumentModel {
        tables,
        key_value_pairs,
        ..Default::default()
    };

    if model.is_empty() {
        return Err(NormalizationError::Unparsable {
            kind: "json",
            reason: "no extractable fields".to_string(),
        });
    }

    Ok(model)
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        _ => None,
    }
}

fn flatten_scalars(prefix: &str, value: &Value, depth: usize, out: &mut Vec<KeyValuePair>) {
    if depth > MAX_DEPTH {
        return;
    }
    if let Value::Object(map) = value {
        for (key, child) in map {
            let path = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}.{}", prefix, key)
            };
            match child {
                Value::Object(_) => flatten_scalars(&path, child, depth + 1, out),
                Value::Array(_) => {} // arrays become tables, not pairs
                scalar => {
                    if let Some(text) = scalar_to_string(scalar) {
                        out.push(KeyValuePair {
                            key: path,
                            value: text,
                            confidence: None,
                            page: 1,
                        });
                    }
                }
            }
        }
    }
}

/// Depth-first search for the first array whose elements are objects
fn find_record_array(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) if items.iter().all(Value::is_object) && !items.is_empty() => {
            Some(items)
        }
        Value::Object(map) => map.values().find_map(find_record_array),
        _ => None,
    }
}

fn records_to_table(records: &[Value]) -> Table {
    let mut columns: BTreeSet<String> = BTreeSet::new();
    for record in records {
        if let Value::Object(map) = record {
            columns.extend(map.keys().cloned());
        }
    }
    let header: Vec<String> = columns.into_iter().collect();

    let mut data = Vec::with_capacity(records.len() + 1);
    data.push(header.clone());
    for record in records {
        let row = header
            .iter()
            .map(|col| {
                record
                    .get(col)
                    .and_then(scalar_to_string)
                    .unwrap_or_default()
            })
            .collect();
        data.push(row);
    }

    Table::from_data(1, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalars_flatten_to_dotted_pairs() {
        let raw = br#"{"report": {"month": "2024-01", "final": true}, "total": 1200}"#;
        let model = normalize(raw).unwrap();

        let get = |key: &str| {
            model
                .key_value_pairs
                .iter()
                .find(|p| p.key == key)
                .map(|p| p.value.clone())
        };
        assert_eq!(get("report.month").as_deref(), Some("2024-01"));
        assert_eq!(get("report.final").as_deref(), Some("true"));
        assert_eq!(get("total").as_deref(), Some("1200"));
    }

    #[test]
    fn test_record_array_becomes_table() {
        let raw = br#"{"rows": [
            {"brand": "Acme", "cases": 120},
            {"brand": "Zenith", "cases": 75, "state": "OR"}
        ]}"#;
        let model = normalize(raw).unwrap();

        let table = &model.tables[0];
        assert_eq!(table.data[0], vec!["brand", "cases", "state"]);
        assert_eq!(table.data[1], vec!["Acme", "120", ""]);
        assert_eq!(table.data[2], vec!["Zenith", "75", "OR"]);
    }

    #[test]
    fn test_top_level_array() {
        let raw = br#"[{"a": 1}, {"a": 2}]"#;
        let model = normalize(raw).unwrap();
        assert_eq!(model.tables[0].rows, 3);
    }

    #[test]
    fn test_invalid_json_is_unparsable() {
        assert!(matches!(
            normalize(b"{not json"),
            Err(NormalizationError::Unparsable { kind: "json", .. })
        ));
    }

    #[test]
    fn test_empty_object_is_rejected() {
        assert!(matches!(
            normalize(b"{}"),
            Err(NormalizationError::Unparsable { .. })
        ));
    }

    #[test]
    fn test_null_values_are_skipped() {
        let raw = br#"{"present": "x", "missing": null}"#;
        let model = normalize(raw).unwrap();
        assert_eq!(model.key_value_pairs.len(), 1);
        assert_eq!(model.key_value_pairs[0].key, "present");
    }
}
