//! Extraction rules - per-field strategy and location descriptors
//!
//! The location payload is a tagged union with one case per extraction type,
//! so a rule whose location fields don't match its declared type is rejected
//! at parse time rather than at resolution time. AI-generated rules pass
//! through exactly the same validation as user-authored ones.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Target data type a resolved raw string is coerced to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// Plain text, trimmed
    String,
    /// Numeric value; thousands separators and percent signs are stripped
    Number,
    /// Calendar date, normalized to ISO-8601 when parseable
    Date,
    /// Boolean from a fixed token set
    Boolean,
    /// A delimited list of values
    Array,
}

impl Default for DataType {
    fn default() -> Self {
        DataType::String
    }
}

/// How a table rule locates its target cell or column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStrategy {
    /// Match the column whose header text contains `headerName`
    HeaderMatch,
    /// Use a fixed `columnIndex` and optional `rowRange`
    Position,
    /// Scan all cells for `searchText` and read a sibling cell
    FindCellWithText,
}

/// Location payload for `table` rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TableLocation {
    /// Index into `DocumentModel.tables`
    pub table_index: usize,

    /// Cell location strategy; optional when `columnMapping` drives the rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_strategy: Option<SearchStrategy>,

    /// Anchor text for `find_cell_with_text`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_text: Option<String>,

    /// Header text for `header_match` (case-insensitive substring)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_name: Option<String>,

    /// Inclusive `[start, end]` row bounds into the table's data rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_range: Option<(usize, usize)>,

    /// Fixed column for `position`, or the target column for
    /// `find_cell_with_text` (defaults to the cell right of the match)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_index: Option<usize>,

    /// Repeating-row mapping: field name to column index. A single table scan
    /// emits one record per data row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_mapping: Option<BTreeMap<String, usize>>,
}

/// Location payload for `keyValue` rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct KeyValueLocation {
    /// Exact key to match, case-insensitive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,

    /// Regex alternative to `keyName`, matched case-insensitively
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_pattern: Option<String>,
}

/// Location payload for `position` rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PositionLocation {
    /// 1-based page to search
    pub page: u32,

    /// Normalized region; blocks contained in it or overlapping it by at
    /// least half their area are concatenated in document order
    pub bounding_box: crate::document::BoundingBox,
}

/// Location payload for `pattern` rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PatternLocation {
    /// Anchor text locating the window to search
    pub search_text: String,

    /// Regex with exactly one capture group, applied to the window
    pub pattern: String,
}

/// Tagged location union - one case per extraction type
///
/// Serializes as a sibling `extractionType` tag plus a `location` object,
/// matching the wire schema templates are stored in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "extractionType", content = "location", rename_all = "camelCase")]
pub enum Location {
    /// A table cell or repeating table column
    Table(TableLocation),
    /// A detected key-value pair
    KeyValue(KeyValueLocation),
    /// A bounding-box region on a page
    Position(PositionLocation),
    /// A regex capture anchored to nearby text
    Pattern(PatternLocation),
}

impl Location {
    /// The wire name of the extraction type this location belongs to
    pub fn extraction_type(&self) -> &'static str {
        match self {
            Location::Table(_) => "table",
            Location::KeyValue(_) => "keyValue",
            Location::Position(_) => "position",
            Location::Pattern(_) => "pattern",
        }
    }

    /// Validate invariants the type system cannot express
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Location::Table(loc) => {
                match loc.search_strategy {
                    Some(SearchStrategy::HeaderMatch) => {
                        if loc.header_name.as_deref().unwrap_or("").is_empty() {
                            return Err("header_match requires headerName".to_string());
                        }
                    }
                    Some(SearchStrategy::Position) => {
                        if loc.column_index.is_none() {
                            return Err("position strategy requires columnIndex".to_string());
                        }
                    }
                    Some(SearchStrategy::FindCellWithText) => {
                        if loc.search_text.as_deref().unwrap_or("").is_empty() {
                            return Err("find_cell_with_text requires searchText".to_string());
                        }
                    }
                    None => {
                        if loc.column_mapping.as_ref().map_or(true, BTreeMap::is_empty) {
                            return Err(
                                "table rule requires a searchStrategy or a non-empty columnMapping"
                                    .to_string(),
                            );
                        }
                    }
                }
                if let Some((start, end)) = loc.row_range {
                    if start > end {
                        return Err(format!("rowRange start {} exceeds end {}", start, end));
                    }
                }
                Ok(())
            }
            Location::KeyValue(loc) => {
                let has_name = loc.key_name.as_deref().map_or(false, |k| !k.is_empty());
                let has_pattern = loc.key_pattern.as_deref().map_or(false, |p| !p.is_empty());
                if !has_name && !has_pattern {
                    return Err("keyValue rule requires keyName or keyPattern".to_string());
                }
                if let Some(pattern) = &loc.key_pattern {
                    regex::Regex::new(pattern)
                        .map_err(|e| format!("invalid keyPattern: {}", e))?;
                }
                Ok(())
            }
            Location::Position(loc) => {
                if loc.page == 0 {
                    return Err("position rule requires a 1-based page".to_string());
                }
                if !loc.bounding_box.is_normalized() {
                    return Err("boundingBox must be normalized to the 0..1 range".to_string());
                }
                Ok(())
            }
            Location::Pattern(loc) => {
                if loc.search_text.is_empty() {
                    return Err("pattern rule requires searchText".to_string());
                }
                let compiled = regex::Regex::new(&loc.pattern)
                    .map_err(|e| format!("invalid pattern: {}", e))?;
                // captures_len counts the implicit whole-match group
                if compiled.captures_len() != 2 {
                    return Err(format!(
                        "pattern must have exactly one capture group, found {}",
                        compiled.captures_len() - 1
                    ));
                }
                Ok(())
            }
        }
    }
}

/// One field's extraction strategy and location descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionRule {
    /// Strategy tag plus location payload
    #[serde(flatten)]
    pub location: Location,

    /// Target data type for coercion
    #[serde(default)]
    pub data_type: DataType,

    /// Whether a missing value must be reported as a failure
    #[serde(default)]
    pub required: bool,

    /// Optional validation regex applied to the resolved value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Example value observed when the rule was authored
    #[serde(default)]
    pub sample_value: String,

    /// Rule confidence (0..1), lowered by the correction merge engine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// Human-readable description of the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ExtractionRule {
    /// Create a rule with the given location and defaults elsewhere
    pub fn new(location: Location) -> Self {
        Self {
            location,
            data_type: DataType::String,
            required: false,
            pattern: None,
            sample_value: String::new(),
            confidence: None,
            description: None,
        }
    }

    /// Set the target data type
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = data_type;
        self
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// The wire name of this rule's extraction type
    pub fn extraction_type(&self) -> &'static str {
        self.location.extraction_type()
    }

    /// Validate the rule: location invariants, confidence bounds, and that
    /// any validation pattern compiles
    pub fn validate(&self) -> Result<(), String> {
        self.location.validate()?;
        if let Some(confidence) = self.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                return Err(format!("confidence {} out of range [0.0, 1.0]", confidence));
            }
        }
        if let Some(pattern) = &self.pattern {
            regex::Regex::new(pattern).map_err(|e| format!("invalid validation pattern: {}", e))?;
        }
        Ok(())
    }
}
