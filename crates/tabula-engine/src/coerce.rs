//! Type coercion for resolved raw strings
//!
//! OCR and HTML sources deliver everything as text; coercion turns the raw
//! string into the rule's declared data type. Numbers lose thousands
//! separators, percent signs, and the leading apostrophes some spreadsheets
//! inject; dates get a locale-agnostic ISO attempt and fail open to the raw
//! string; booleans map a fixed token set.

use crate::error::EngineError;
use chrono::NaiveDate;
use tabula_domain::{DataType, FieldValue};

/// Boolean tokens mapped to `true`
const TRUE_TOKENS: &[&str] = &["yes", "true", "checked", "1"];

/// Boolean tokens mapped to `false`
const FALSE_TOKENS: &[&str] = &["no", "false", "unchecked", "0"];

/// Date formats attempted in order; the first hit wins
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d %b %Y", "%B %d, %Y"];

/// Coerce a raw string to the rule's data type
///
/// Returns [`EngineError::Validation`] only for number and boolean
/// failures; the caller decides whether that becomes a reported failure
/// (required field) or a degradation to the raw string (optional field).
/// Dates never fail: an unparsable date keeps the raw string.
pub fn coerce(raw: &str, data_type: DataType) -> Result<FieldValue, EngineError> {
    let trimmed = raw.trim();
    match data_type {
        DataType::String => Ok(FieldValue::Text(trimmed.to_string())),
        DataType::Number => coerce_number(trimmed),
        DataType::Date => Ok(coerce_date(trimmed)),
        DataType::Boolean => coerce_boolean(trimmed),
        DataType::Array => Ok(coerce_array(trimmed)),
    }
}

/// Strip the noise spreadsheet exports and OCR leave on numeric cells
fn clean_numeric(raw: &str) -> String {
    raw.trim_start_matches('\'')
        .replace(['%', ',', ' '], "")
        .trim()
        .to_string()
}

fn coerce_number(raw: &str) -> Result<FieldValue, EngineError> {
    let cleaned = clean_numeric(raw);
    if cleaned.is_empty() {
        return Err(EngineError::Validation(format!("'{}' is not numeric", raw)));
    }
    cleaned
        .parse::<f64>()
        .map(FieldValue::Number)
        .map_err(|_| EngineError::Validation(format!("'{}' is not numeric", raw)))
}

fn coerce_date(raw: &str) -> FieldValue {
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return FieldValue::Text(date.format("%Y-%m-%d").to_string());
        }
    }
    // Fail open: keep whatever the document said
    FieldValue::Text(raw.to_string())
}

fn coerce_boolean(raw: &str) -> Result<FieldValue, EngineError> {
    let token = raw.to_ascii_lowercase();
    if TRUE_TOKENS.contains(&token.as_str()) {
        Ok(FieldValue::Boolean(true))
    } else if FALSE_TOKENS.contains(&token.as_str()) {
        Ok(FieldValue::Boolean(false))
    } else {
        Err(EngineError::Validation(format!(
            "'{}' is not a recognized boolean token",
            raw
        )))
    }
}

fn coerce_array(raw: &str) -> FieldValue {
    let items = raw
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    FieldValue::List(items)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_strips_thousands_separators() {
        assert_eq!(
            coerce("1,234,567", DataType::Number).unwrap(),
            FieldValue::Number(1_234_567.0)
        );
    }

    #[test]
    fn test_number_strips_spreadsheet_noise() {
        // Leading apostrophe and percent sign, as seen in OCR'd exports
        assert_eq!(
            coerce("'12.5%", DataType::Number).unwrap(),
            FieldValue::Number(12.5)
        );
        assert_eq!(
            coerce("+3.1", DataType::Number).unwrap(),
            FieldValue::Number(3.1)
        );
        assert_eq!(
            coerce("-7", DataType::Number).unwrap(),
            FieldValue::Number(-7.0)
        );
    }

    #[test]
    fn test_number_failure_reports_original_text() {
        let err = coerce("n/a", DataType::Number).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(err.to_string().contains("n/a"));
    }

    #[test]
    fn test_date_iso_passthrough() {
        assert_eq!(
            coerce("2024-01-31", DataType::Date).unwrap(),
            FieldValue::Text("2024-01-31".into())
        );
    }

    #[test]
    fn test_date_us_format_normalizes() {
        assert_eq!(
            coerce("01/31/2024", DataType::Date).unwrap(),
            FieldValue::Text("2024-01-31".into())
        );
        assert_eq!(
            coerce("31 Jan 2024", DataType::Date).unwrap(),
            FieldValue::Text("2024-01-31".into())
        );
    }

    #[test]
    fn test_date_fails_open_to_raw_string() {
        assert_eq!(
            coerce("sometime in Q3", DataType::Date).unwrap(),
            FieldValue::Text("sometime in Q3".into())
        );
    }

    #[test]
    fn test_boolean_token_sets() {
        for token in ["yes", "TRUE", "Checked", "1"] {
            assert_eq!(
                coerce(token, DataType::Boolean).unwrap(),
                FieldValue::Boolean(true),
                "token {}",
                token
            );
        }
        for token in ["no", "False", "unchecked", "0"] {
            assert_eq!(
                coerce(token, DataType::Boolean).unwrap(),
                FieldValue::Boolean(false),
                "token {}",
                token
            );
        }
        assert!(coerce("maybe", DataType::Boolean).is_err());
    }

    #[test]
    fn test_array_splits_and_trims() {
        assert_eq!(
            coerce("a, b; c,,", DataType::Array).unwrap(),
            FieldValue::List(vec!["a".into(), "b".into(), "c".into()])
        );
    }

    #[test]
    fn test_string_trims() {
        assert_eq!(
            coerce("  padded  ", DataType::String).unwrap(),
            FieldValue::Text("padded".into())
        );
    }
}
