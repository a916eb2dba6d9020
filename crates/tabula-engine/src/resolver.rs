//! Per-strategy field resolvers
//!
//! Each resolver maps `(rule, DocumentModel)` to a raw candidate string.
//! "Not found" is `Ok(None)`, never an error; only malformed locations fail,
//! and only for that field. Resolvers are pure: identical inputs produce
//! identical outputs.

use crate::error::EngineError;
use regex::RegexBuilder;
use std::collections::BTreeMap;
use tabula_domain::{
    DocumentModel, ExtractionRule, KeyValueLocation, Location, PatternLocation, PositionLocation,
    SearchStrategy, Table, TableLocation,
};

/// Text window searched around a pattern anchor, in bytes before/after
const PATTERN_WINDOW_BEFORE: usize = 64;
const PATTERN_WINDOW_AFTER: usize = 256;

/// How many leading rows are considered when detecting the header row
const HEADER_SCAN_ROWS: usize = 5;

/// Minimum fraction of a text block's area inside a position rule's box
const POSITION_OVERLAP_MIN: f64 = 0.5;

/// Resolve a rule to a single raw value
///
/// Returns `Ok(None)` when the document simply doesn't contain the value.
/// A table rule whose only descriptor is a `columnMapping` describes
/// repeating rows, not a scalar, and must go through [`resolve_records`].
pub fn resolve(rule: &ExtractionRule, doc: &DocumentModel) -> Result<Option<String>, EngineError> {
    match &rule.location {
        Location::Table(loc) => resolve_table(loc, doc),
        Location::KeyValue(loc) => resolve_key_value(loc, doc),
        Location::Position(loc) => Ok(resolve_position(loc, doc)),
        Location::Pattern(loc) => resolve_pattern(loc, doc),
    }
}

/// Resolve a repeating table rule into one record per data row
///
/// The rule's `columnMapping` assigns field names to column indices; the
/// header row (densest of the first few rows) is skipped, and an optional
/// `rowRange` bounds the data rows considered.
pub fn resolve_records(
    rule: &ExtractionRule,
    doc: &DocumentModel,
) -> Result<Vec<BTreeMap<String, String>>, EngineError> {
    let loc = match &rule.location {
        Location::Table(loc) => loc,
        other => {
            return Err(EngineError::Resolution(format!(
                "{} rule cannot emit repeating records",
                other.extraction_type()
            )))
        }
    };
    let mapping = loc.column_mapping.as_ref().ok_or_else(|| {
        EngineError::Resolution("table rule has no columnMapping".to_string())
    })?;

    let table = match doc.tables.get(loc.table_index) {
        Some(t) => t,
        None => return Ok(Vec::new()),
    };

    let header_idx = detect_header_row(table);
    let data_rows = &table.data[(header_idx + 1).min(table.data.len())..];
    let data_rows = apply_row_range(data_rows, loc.row_range);

    let mut records = Vec::with_capacity(data_rows.len());
    for row in data_rows {
        let mut record = BTreeMap::new();
        for (field, &column) in mapping {
            let value = row.get(column).map(|c| c.trim().to_string()).unwrap_or_default();
            record.insert(field.clone(), value);
        }
        records.push(record);
    }

    Ok(records)
}

/// Find the header row: the densest row among the first few
///
/// OCR'd tables often carry a sparse title or metadata row above the real
/// header, so the row with the most non-empty cells wins; earlier rows win
/// ties.
pub fn detect_header_row(table: &Table) -> usize {
    let mut header_idx = 0;
    let mut max_non_empty = 0;

    for (idx, row) in table.data.iter().take(HEADER_SCAN_ROWS).enumerate() {
        let non_empty = row
            .iter()
            .filter(|cell| {
                let cell = cell.trim();
                !cell.is_empty() && cell != "'"
            })
            .count();
        if non_empty > max_non_empty {
            max_non_empty = non_empty;
            header_idx = idx;
        }
    }

    header_idx
}

fn apply_row_range(rows: &[Vec<String>], range: Option<(usize, usize)>) -> &[Vec<String>] {
    match range {
        Some((start, end)) => {
            let start = start.min(rows.len());
            let end = (end + 1).min(rows.len());
            &rows[start..end.max(start)]
        }
        None => rows,
    }
}

fn resolve_table(loc: &TableLocation, doc: &DocumentModel) -> Result<Option<String>, EngineError> {
    let table = match doc.tables.get(loc.table_index) {
        Some(t) => t,
        None => return Ok(None),
    };

    match loc.search_strategy {
        Some(SearchStrategy::HeaderMatch) => {
            let header_name = loc.header_name.as_deref().ok_or_else(|| {
                EngineError::Resolution("header_match rule has no headerName".to_string())
            })?;
            Ok(resolve_header_match(table, header_name, loc.row_range))
        }
        Some(SearchStrategy::Position) => {
            let column = loc.column_index.ok_or_else(|| {
                EngineError::Resolution("position strategy rule has no columnIndex".to_string())
            })?;
            let rows = apply_row_range(&table.data, loc.row_range);
            Ok(first_non_empty_cell(rows, column))
        }
        Some(SearchStrategy::FindCellWithText) => {
            let search_text = loc.search_text.as_deref().ok_or_else(|| {
                EngineError::Resolution("find_cell_with_text rule has no searchText".to_string())
            })?;
            Ok(resolve_cell_with_text(table, search_text, loc.column_index))
        }
        None => Err(EngineError::Resolution(
            "table rule with columnMapping resolves repeating rows; use resolve_records"
                .to_string(),
        )),
    }
}

/// First match wins: the column whose header cell contains the name,
/// case-insensitive, then the first non-empty cell below the header
fn resolve_header_match(
    table: &Table,
    header_name: &str,
    row_range: Option<(usize, usize)>,
) -> Option<String> {
    let header_idx = detect_header_row(table);
    let needle = header_name.to_lowercase();

    let column = table.data.get(header_idx)?.iter().position(|cell| {
        cell.to_lowercase().contains(&needle)
    })?;

    let data_rows = &table.data[(header_idx + 1).min(table.data.len())..];
    let data_rows = apply_row_range(data_rows, row_range);
    first_non_empty_cell(data_rows, column)
}

fn first_non_empty_cell(rows: &[Vec<String>], column: usize) -> Option<String> {
    rows.iter()
        .filter_map(|row| row.get(column))
        .map(|cell| cell.trim())
        .find(|cell| !cell.is_empty())
        .map(str::to_string)
}

/// Scan all cells for the search text; the target is either the rule's
/// `columnIndex` within the matched row, or the cell to the right
fn resolve_cell_with_text(
    table: &Table,
    search_text: &str,
    column_index: Option<usize>,
) -> Option<String> {
    let needle = search_text.to_lowercase();

    for row in &table.data {
        if let Some(found_col) = row.iter().position(|c| c.to_lowercase().contains(&needle)) {
            let target = column_index.unwrap_or(found_col + 1);
            if let Some(cell) = row.get(target) {
                let cell = cell.trim();
                if !cell.is_empty() {
                    return Some(cell.to_string());
                }
            }
        }
    }

    None
}

fn resolve_key_value(
    loc: &KeyValueLocation,
    doc: &DocumentModel,
) -> Result<Option<String>, EngineError> {
    if let Some(key_name) = loc.key_name.as_deref() {
        let found = doc
            .key_value_pairs
            .iter()
            .find(|pair| pair.key.trim().eq_ignore_ascii_case(key_name.trim()));
        if let Some(pair) = found {
            return Ok(Some(pair.value.clone()));
        }
    }

    if let Some(pattern) = loc.key_pattern.as_deref() {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| EngineError::Resolution(format!("invalid keyPattern: {}", e)))?;
        let found = doc.key_value_pairs.iter().find(|pair| regex.is_match(&pair.key));
        return Ok(found.map(|pair| pair.value.clone()));
    }

    if loc.key_name.is_some() {
        return Ok(None);
    }
    Err(EngineError::Resolution(
        "keyValue rule has neither keyName nor keyPattern".to_string(),
    ))
}

/// Blocks contained in the rule's box, or overlapping it by at least half
/// their area, concatenated in document order
fn resolve_position(loc: &PositionLocation, doc: &DocumentModel) -> Option<String> {
    let matched: Vec<&str> = doc
        .text_blocks
        .iter()
        .filter(|block| block.page == loc.page)
        .filter(|block| match &block.bounding_box {
            Some(bb) => {
                bb.contained_in(&loc.bounding_box)
                    || bb.overlap_ratio(&loc.bounding_box) >= POSITION_OVERLAP_MIN
            }
            None => false,
        })
        .map(|block| block.text.as_str())
        .collect();

    if matched.is_empty() {
        None
    } else {
        Some(matched.join(" "))
    }
}

fn resolve_pattern(
    loc: &PatternLocation,
    doc: &DocumentModel,
) -> Result<Option<String>, EngineError> {
    let text = doc.text();
    if text.is_empty() {
        return Ok(None);
    }

    let anchor = RegexBuilder::new(&regex::escape(&loc.search_text))
        .case_insensitive(true)
        .build()
        .map_err(|e| EngineError::Resolution(format!("invalid searchText: {}", e)))?;

    let matched = match anchor.find(&text) {
        Some(m) => m,
        None => return Ok(None),
    };

    let start = floor_char_boundary(&text, matched.start().saturating_sub(PATTERN_WINDOW_BEFORE));
    let end = ceil_char_boundary(&text, (matched.end() + PATTERN_WINDOW_AFTER).min(text.len()));
    let window = &text[start..end];

    let pattern = regex::Regex::new(&loc.pattern)
        .map_err(|e| EngineError::Resolution(format!("invalid pattern: {}", e)))?;

    Ok(pattern
        .captures(window)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string()))
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(text: &str, mut index: usize) -> usize {
    while index < text.len() && !text.is_char_boundary(index) {
        index += 1;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_domain::{
        BlockType, BoundingBox, DataType, ExtractionRule, KeyValuePair, KeyValueLocation,
        TextBlock,
    };

    fn sample_doc() -> DocumentModel {
        DocumentModel {
            tables: vec![Table::from_data(
                1,
                vec![
                    vec!["Brand".into(), "Vendor".into(), "Cases".into()],
                    vec!["Acme".into(), "NorthCo".into(), "1,200".into()],
                    vec!["Zenith".into(), "EastCo".into(), "750".into()],
                    vec!["Orbit".into(), "WestCo".into(), "310".into()],
                ],
            )],
            key_value_pairs: vec![KeyValuePair {
                key: "Report Month".into(),
                value: "2024-01".into(),
                confidence: Some(0.99),
                page: 1,
            }],
            text_blocks: vec![
                TextBlock {
                    text: "Monthly Brand Report".into(),
                    block_type: BlockType::Heading,
                    page: 1,
                    bounding_box: Some(BoundingBox {
                        top: 0.02,
                        left: 0.1,
                        width: 0.5,
                        height: 0.05,
                    }),
                },
                TextBlock {
                    text: "Grand Total: 2260 cases".into(),
                    block_type: BlockType::Paragraph,
                    page: 1,
                    bounding_box: Some(BoundingBox {
                        top: 0.9,
                        left: 0.1,
                        width: 0.4,
                        height: 0.04,
                    }),
                },
            ],
            dom_tree: None,
            full_text: String::new(),
        }
    }

    fn table_rule(loc: TableLocation) -> ExtractionRule {
        ExtractionRule::new(Location::Table(loc))
    }

    fn base_table_location() -> TableLocation {
        TableLocation {
            table_index: 0,
            search_strategy: None,
            search_text: None,
            header_name: None,
            row_range: None,
            column_index: None,
            column_mapping: None,
        }
    }

    #[test]
    fn test_header_match_case_insensitive_substring() {
        let rule = table_rule(TableLocation {
            search_strategy: Some(SearchStrategy::HeaderMatch),
            header_name: Some("vendor".into()),
            ..base_table_location()
        });

        let value = resolve(&rule, &sample_doc()).unwrap();
        assert_eq!(value.as_deref(), Some("NorthCo"));
    }

    #[test]
    fn test_header_match_missing_header_is_none() {
        let rule = table_rule(TableLocation {
            search_strategy: Some(SearchStrategy::HeaderMatch),
            header_name: Some("Revenue".into()),
            ..base_table_location()
        });

        assert_eq!(resolve(&rule, &sample_doc()).unwrap(), None);
    }

    #[test]
    fn test_position_strategy_with_row_range() {
        let rule = table_rule(TableLocation {
            search_strategy: Some(SearchStrategy::Position),
            column_index: Some(0),
            row_range: Some((2, 3)),
            ..base_table_location()
        });

        let value = resolve(&rule, &sample_doc()).unwrap();
        assert_eq!(value.as_deref(), Some("Zenith"));
    }

    #[test]
    fn test_find_cell_with_text_returns_right_sibling() {
        let rule = table_rule(TableLocation {
            search_strategy: Some(SearchStrategy::FindCellWithText),
            search_text: Some("zenith".into()),
            ..base_table_location()
        });

        let value = resolve(&rule, &sample_doc()).unwrap();
        assert_eq!(value.as_deref(), Some("EastCo"));
    }

    #[test]
    fn test_find_cell_with_text_explicit_column() {
        let rule = table_rule(TableLocation {
            search_strategy: Some(SearchStrategy::FindCellWithText),
            search_text: Some("Zenith".into()),
            column_index: Some(2),
            ..base_table_location()
        });

        let value = resolve(&rule, &sample_doc()).unwrap();
        assert_eq!(value.as_deref(), Some("750"));
    }

    #[test]
    fn test_out_of_range_table_index_is_none() {
        let rule = table_rule(TableLocation {
            table_index: 7,
            search_strategy: Some(SearchStrategy::HeaderMatch),
            header_name: Some("Brand".into()),
            ..base_table_location()
        });

        assert_eq!(resolve(&rule, &sample_doc()).unwrap(), None);
    }

    #[test]
    fn test_key_value_exact_match() {
        let rule = ExtractionRule::new(Location::KeyValue(KeyValueLocation {
            key_name: Some("Report Month".into()),
            key_pattern: None,
        }));

        let value = resolve(&rule, &sample_doc()).unwrap();
        assert_eq!(value.as_deref(), Some("2024-01"));
    }

    #[test]
    fn test_key_value_match_is_case_insensitive() {
        let rule = ExtractionRule::new(Location::KeyValue(KeyValueLocation {
            key_name: Some("report month".into()),
            key_pattern: None,
        }));

        let value = resolve(&rule, &sample_doc()).unwrap();
        assert_eq!(value.as_deref(), Some("2024-01"));
    }

    #[test]
    fn test_key_value_pattern_fallback() {
        let rule = ExtractionRule::new(Location::KeyValue(KeyValueLocation {
            key_name: None,
            key_pattern: Some(r"report\s+\w+".into()),
        }));

        let value = resolve(&rule, &sample_doc()).unwrap();
        assert_eq!(value.as_deref(), Some("2024-01"));
    }

    #[test]
    fn test_key_value_no_match_is_none() {
        let rule = ExtractionRule::new(Location::KeyValue(KeyValueLocation {
            key_name: Some("Quarter".into()),
            key_pattern: None,
        }));

        assert_eq!(resolve(&rule, &sample_doc()).unwrap(), None);
    }

    #[test]
    fn test_position_concatenates_overlapping_blocks() {
        let rule = ExtractionRule::new(Location::Position(PositionLocation {
            page: 1,
            bounding_box: BoundingBox {
                top: 0.0,
                left: 0.0,
                width: 1.0,
                height: 0.5,
            },
        }));

        let value = resolve(&rule, &sample_doc()).unwrap();
        assert_eq!(value.as_deref(), Some("Monthly Brand Report"));
    }

    #[test]
    fn test_position_wrong_page_is_none() {
        let rule = ExtractionRule::new(Location::Position(PositionLocation {
            page: 2,
            bounding_box: BoundingBox {
                top: 0.0,
                left: 0.0,
                width: 1.0,
                height: 1.0,
            },
        }));

        assert_eq!(resolve(&rule, &sample_doc()).unwrap(), None);
    }

    #[test]
    fn test_pattern_extracts_capture_group() {
        let rule = ExtractionRule::new(Location::Pattern(PatternLocation {
            search_text: "grand total".into(),
            pattern: r"Grand Total:\s*(\d+)".into(),
        }));

        let value = resolve(&rule, &sample_doc()).unwrap();
        assert_eq!(value.as_deref(), Some("2260"));
    }

    #[test]
    fn test_pattern_zero_matches_is_none_not_error() {
        let rule = ExtractionRule::new(Location::Pattern(PatternLocation {
            search_text: "grand total".into(),
            pattern: r"Net Revenue:\s*(\d+)".into(),
        }));

        assert_eq!(resolve(&rule, &sample_doc()).unwrap(), None);
    }

    #[test]
    fn test_pattern_missing_anchor_is_none() {
        let rule = ExtractionRule::new(Location::Pattern(PatternLocation {
            search_text: "no such anchor".into(),
            pattern: r"(\d+)".into(),
        }));

        assert_eq!(resolve(&rule, &sample_doc()).unwrap(), None);
    }

    #[test]
    fn test_pattern_invalid_regex_is_resolution_error() {
        let rule = ExtractionRule::new(Location::Pattern(PatternLocation {
            search_text: "Grand Total".into(),
            pattern: "[unclosed".into(),
        }));

        assert!(matches!(
            resolve(&rule, &sample_doc()),
            Err(EngineError::Resolution(_))
        ));
    }

    #[test]
    fn test_resolver_is_deterministic() {
        let rule = table_rule(TableLocation {
            search_strategy: Some(SearchStrategy::HeaderMatch),
            header_name: Some("Cases".into()),
            ..base_table_location()
        });
        let doc = sample_doc();

        let first = resolve(&rule, &doc).unwrap();
        let second = resolve(&rule, &doc).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("1,200"));
    }

    #[test]
    fn test_column_mapping_emits_one_record_per_row() {
        let mut mapping = BTreeMap::new();
        mapping.insert("brand".to_string(), 0usize);
        mapping.insert("cases".to_string(), 2usize);

        let rule = table_rule(TableLocation {
            column_mapping: Some(mapping),
            ..base_table_location()
        })
        .with_data_type(DataType::String);

        let records = resolve_records(&rule, &sample_doc()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["brand"], "Acme");
        assert_eq!(records[0]["cases"], "1,200");
        assert_eq!(records[2]["brand"], "Orbit");
        assert_eq!(records[2]["cases"], "310");
    }

    #[test]
    fn test_column_mapping_out_of_range_column_is_empty() {
        let mut mapping = BTreeMap::new();
        mapping.insert("missing".to_string(), 9usize);

        let rule = table_rule(TableLocation {
            column_mapping: Some(mapping),
            ..base_table_location()
        });

        let records = resolve_records(&rule, &sample_doc()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["missing"], "");
    }

    #[test]
    fn test_resolve_records_rejects_non_table_rule() {
        let rule = ExtractionRule::new(Location::KeyValue(KeyValueLocation {
            key_name: Some("k".into()),
            key_pattern: None,
        }));

        assert!(matches!(
            resolve_records(&rule, &sample_doc()),
            Err(EngineError::Resolution(_))
        ));
    }

    #[test]
    fn test_scalar_resolve_rejects_mapping_only_rule() {
        let mut mapping = BTreeMap::new();
        mapping.insert("brand".to_string(), 0usize);
        let rule = table_rule(TableLocation {
            column_mapping: Some(mapping),
            ..base_table_location()
        });

        assert!(matches!(
            resolve(&rule, &sample_doc()),
            Err(EngineError::Resolution(_))
        ));
    }

    #[test]
    fn test_detect_header_row_skips_sparse_title_row() {
        let table = Table::from_data(
            1,
            vec![
                vec!["Q1 Summary".into(), "".into(), "".into()],
                vec!["Brand".into(), "Vendor".into(), "Cases".into()],
                vec!["Acme".into(), "NorthCo".into(), "120".into()],
            ],
        );
        assert_eq!(detect_header_row(&table), 1);
    }
}
