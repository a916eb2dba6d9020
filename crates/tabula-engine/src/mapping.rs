//! Fuzzy header-to-field column mapping
//!
//! Multi-page documents repeat their tables with re-printed headers, OCR
//! mangles header text, and some exports ship with empty or duplicated
//! header rows. This module merges continuation tables, maps columns to
//! field names by similarity with a positional fallback, and extracts
//! records with a populated-field threshold so header fragments and ruled
//! lines don't become records.

use crate::resolver::detect_header_row;
use std::collections::BTreeMap;
use tabula_domain::Table;
use tracing::{debug, warn};

/// Minimum similarity for a header cell to claim a field
const SIMILARITY_MIN: f64 = 0.5;

/// Minimum fraction of mapped fields a row must populate to become a record
const ROW_POPULATED_MIN: f64 = 0.5;

/// A field a table column can be mapped to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Canonical field name (the record key)
    pub name: String,
    /// Display name shown to users; matched against headers too
    pub display_name: String,
}

impl FieldSpec {
    /// Field whose display name equals its canonical name
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
        }
    }
}

/// Merge continuation tables into one
///
/// The first table is taken whole. Later tables re-print their header row
/// (and sometimes a metadata row above it), so everything up to and
/// including the detected header is dropped before the data rows are
/// appended.
pub fn merge_continuation_tables(tables: &[Table]) -> Option<Table> {
    let first = tables.first()?;
    let mut data = first.data.clone();

    for table in &tables[1..] {
        let header_idx = detect_header_row(table);
        let data_start = (header_idx + 1).min(table.data.len());
        debug!(
            "Merging continuation table: skipping {} header rows, appending {} data rows",
            data_start,
            table.data.len() - data_start
        );
        data.extend(table.data[data_start..].iter().cloned());
    }

    Some(Table::from_data(first.page, data))
}

/// Map table columns to fields by header similarity
///
/// When the header row is empty, or contains duplicate headers (repeated
/// "Case Sales" spans, for instance), header text cannot disambiguate
/// columns and a positional mapping is used instead - but only when the
/// column count matches the field count exactly. Otherwise each header cell
/// is matched to its most similar field name or display name, accepted
/// above the similarity threshold.
pub fn auto_map_columns(table: &Table, fields: &[FieldSpec]) -> BTreeMap<usize, String> {
    let mut mapping = BTreeMap::new();

    let header_idx = detect_header_row(table);
    let headers = match table.data.get(header_idx) {
        Some(row) => row,
        None => return mapping,
    };

    let headers_empty = headers.iter().all(|h| h.trim().is_empty());
    let distinct = headers
        .iter()
        .map(|h| h.trim().to_lowercase())
        .filter(|h| !h.is_empty())
        .collect::<std::collections::BTreeSet<_>>();
    let has_duplicates =
        distinct.len() != headers.iter().filter(|h| !h.trim().is_empty()).count();

    if headers_empty || has_duplicates {
        if fields.len() == headers.len() {
            for (idx, field) in fields.iter().enumerate() {
                mapping.insert(idx, field.name.clone());
            }
        } else {
            warn!(
                "Positional fallback impossible: {} columns vs {} fields",
                headers.len(),
                fields.len()
            );
        }
        return mapping;
    }

    for (col_idx, header) in headers.iter().enumerate() {
        let header = header.trim();
        if header.is_empty() {
            continue;
        }

        let mut best: Option<(&FieldSpec, f64)> = None;
        for field in fields {
            let score = similarity(&header.to_lowercase(), &field.name.to_lowercase())
                .max(similarity(&header.to_lowercase(), &field.display_name.to_lowercase()));
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((field, score));
            }
        }

        match best {
            Some((field, score)) if score > SIMILARITY_MIN => {
                mapping.insert(col_idx, field.name.clone());
            }
            Some((field, score)) => {
                debug!(
                    "No mapping for header '{}' (best: {} at {:.2})",
                    header, field.name, score
                );
            }
            None => {}
        }
    }

    mapping
}

/// Merge continuation tables, auto-map columns, and extract records
///
/// Rows populating fewer than half of the mapped fields are dropped: these
/// are header fragments, subtotal rules, and page decorations rather than
/// data.
pub fn extract_auto_mapped_records(
    tables: &[Table],
    fields: &[FieldSpec],
) -> Vec<BTreeMap<String, String>> {
    let merged = match merge_continuation_tables(tables) {
        Some(t) => t,
        None => return Vec::new(),
    };

    let mapping = auto_map_columns(&merged, fields);
    if mapping.is_empty() {
        warn!("No columns could be mapped; no records extracted");
        return Vec::new();
    }

    let header_idx = detect_header_row(&merged);
    let data_rows = &merged.data[(header_idx + 1).min(merged.data.len())..];

    let mut records = Vec::new();
    for row in data_rows {
        let mut record = BTreeMap::new();
        for (&col_idx, field_name) in &mapping {
            if let Some(cell) = row.get(col_idx) {
                let cell = cell.trim();
                if !cell.is_empty() {
                    record.insert(field_name.clone(), cell.to_string());
                }
            }
        }

        if record.len() as f64 >= fields.len() as f64 * ROW_POPULATED_MIN {
            records.push(record);
        } else if !record.is_empty() {
            debug!("Dropping sparse row with {} populated fields", record.len());
        }
    }

    records
}

/// Similarity ratio between two strings in 0..1
///
/// Computed as 2M/T where M is the total length of the recursively longest
/// common substrings and T the combined length - the same ratio the original
/// header matcher used.
pub fn similarity(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let matches = matching_chars(&a, &b);
    2.0 * matches as f64 / total as f64
}

/// Total matched characters: longest common substring, then recurse on the
/// pieces to its left and right
fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (a_start, b_start, len) = longest_common_substring(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..a_start], &b[..b_start])
        + matching_chars(&a[a_start + len..], &b[b_start + len..])
}

fn longest_common_substring(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    if a.is_empty() || b.is_empty() {
        return best;
    }

    // lengths[j] = length of common suffix ending at a[i], b[j]
    let mut lengths = vec![0usize; b.len() + 1];
    for (i, &ca) in a.iter().enumerate() {
        let mut prev = 0;
        for (j, &cb) in b.iter().enumerate() {
            let current = lengths[j + 1];
            lengths[j + 1] = if ca == cb { prev + 1 } else { 0 };
            if lengths[j + 1] > best.2 {
                best = (i + 1 - lengths[j + 1], j + 1 - lengths[j + 1], lengths[j + 1]);
            }
            prev = current;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(names: &[&str]) -> Vec<FieldSpec> {
        names.iter().map(|n| FieldSpec::new(*n)).collect()
    }

    #[test]
    fn test_similarity_identical_and_disjoint() {
        assert_eq!(similarity("brand", "brand"), 1.0);
        assert_eq!(similarity("abc", "xyz"), 0.0);
    }

    #[test]
    fn test_similarity_close_headers() {
        // OCR variants of the same header score above the threshold
        assert!(similarity("ytd case sales", "ytd_case_sales") > 0.5);
        assert!(similarity("brand", "vendor") < 0.5);
    }

    #[test]
    fn test_auto_map_by_header_text() {
        let table = Table::from_data(
            1,
            vec![
                vec!["Brand".into(), "YTD Case Sales".into()],
                vec!["Acme".into(), "120".into()],
            ],
        );
        let mapping = auto_map_columns(&table, &specs(&["brand", "ytd_case_sales"]));

        assert_eq!(mapping.get(&0).map(String::as_str), Some("brand"));
        assert_eq!(mapping.get(&1).map(String::as_str), Some("ytd_case_sales"));
    }

    #[test]
    fn test_positional_fallback_on_empty_headers() {
        let table = Table::from_data(
            1,
            vec![
                vec!["".into(), "".into()],
                vec!["Acme".into(), "120".into()],
                vec!["Zenith".into(), "75".into()],
            ],
        );
        let mapping = auto_map_columns(&table, &specs(&["brand", "cases"]));

        assert_eq!(mapping.get(&0).map(String::as_str), Some("brand"));
        assert_eq!(mapping.get(&1).map(String::as_str), Some("cases"));
    }

    #[test]
    fn test_positional_fallback_on_duplicate_headers() {
        let table = Table::from_data(
            1,
            vec![
                vec!["Case Sales".into(), "Case Sales".into()],
                vec!["120".into(), "75".into()],
            ],
        );
        let mapping = auto_map_columns(&table, &specs(&["current", "prior"]));

        assert_eq!(mapping.len(), 2);
        assert_eq!(mapping.get(&0).map(String::as_str), Some("current"));
    }

    #[test]
    fn test_positional_fallback_requires_matching_counts() {
        let table = Table::from_data(1, vec![vec!["".into(), "".into(), "".into()]]);
        let mapping = auto_map_columns(&table, &specs(&["a", "b"]));
        assert!(mapping.is_empty());
    }

    #[test]
    fn test_merge_continuation_tables_drops_repeated_headers() {
        let page1 = Table::from_data(
            1,
            vec![
                vec!["Brand".into(), "Cases".into()],
                vec!["Acme".into(), "120".into()],
            ],
        );
        let page2 = Table::from_data(
            2,
            vec![
                vec!["Brand".into(), "Cases".into()],
                vec!["Zenith".into(), "75".into()],
                vec!["Orbit".into(), "31".into()],
            ],
        );

        let merged = merge_continuation_tables(&[page1, page2]).unwrap();
        assert_eq!(merged.rows, 4); // one header + three data rows
        assert_eq!(merged.data[3], vec!["Orbit", "31"]);
    }

    #[test]
    fn test_extract_records_drops_sparse_rows() {
        let table = Table::from_data(
            1,
            vec![
                vec!["Brand".into(), "Vendor".into(), "Cases".into()],
                vec!["Acme".into(), "NorthCo".into(), "120".into()],
                vec!["Subtotal".into(), "".into(), "".into()],
            ],
        );

        // The subtotal row populates 1 of 3 mapped fields - below the 50%
        // threshold - and is dropped
        let records =
            extract_auto_mapped_records(&[table], &specs(&["brand", "vendor", "cases"]));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["brand"], "Acme");
    }

    #[test]
    fn test_extract_records_across_pages() {
        let page1 = Table::from_data(
            1,
            vec![
                vec!["Brand".into(), "Cases".into()],
                vec!["Acme".into(), "120".into()],
            ],
        );
        let page2 = Table::from_data(
            2,
            vec![
                vec!["Brand".into(), "Cases".into()],
                vec!["Zenith".into(), "75".into()],
            ],
        );

        let records = extract_auto_mapped_records(&[page1, page2], &specs(&["brand", "cases"]));
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["brand"], "Zenith");
    }

    #[test]
    fn test_no_tables_no_records() {
        assert!(extract_auto_mapped_records(&[], &specs(&["a"])).is_empty());
    }
}
