//! Parse model output into validated extraction rules
//!
//! The response is untrusted input: the JSON is located (fenced code block
//! first, then the first top-level object), parsed, and every proposed
//! field is run through the same rule validation used for user-authored
//! templates. Invalid fields are dropped and reported rather than rejecting
//! the whole result.

use crate::error::RuleGenerationError;
use crate::types::DroppedField;
use serde_json::Value;
use std::collections::BTreeMap;
use tabula_domain::ExtractionRule;
use tracing::warn;

/// Parse a model response into validated rules plus the dropped fields
pub fn parse_generated_rules(
    response: &str,
) -> Result<(BTreeMap<String, ExtractionRule>, Vec<DroppedField>), RuleGenerationError> {
    let json_str = extract_json(response)?;

    let json: Value = serde_json::from_str(&json_str)
        .map_err(|e| RuleGenerationError::InvalidFormat(format!("JSON parse error: {}", e)))?;

    let fields_json = json
        .get("fields")
        .and_then(Value::as_object)
        .ok_or(RuleGenerationError::MissingFields)?;

    let mut fields = BTreeMap::new();
    let mut dropped = Vec::new();

    for (name, rule_json) in fields_json {
        match serde_json::from_value::<ExtractionRule>(rule_json.clone()) {
            Ok(rule) => match rule.validate() {
                Ok(()) => {
                    fields.insert(name.clone(), rule);
                }
                Err(reason) => {
                    warn!("Generated field '{}' failed validation: {}", name, reason);
                    dropped.push(DroppedField {
                        name: name.clone(),
                        reason,
                    });
                }
            },
            Err(e) => {
                warn!("Generated field '{}' failed to parse: {}", name, e);
                dropped.push(DroppedField {
                    name: name.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok((fields, dropped))
}

/// Locate the JSON payload in a free-form response
///
/// The first fenced code block containing JSON wins; otherwise the first
/// top-level JSON object is brace-matched out of the text.
fn extract_json(response: &str) -> Result<String, RuleGenerationError> {
    if let Some(block) = first_fenced_block(response) {
        if block.contains('{') {
            return Ok(block);
        }
    }

    first_json_object(response).ok_or_else(|| {
        RuleGenerationError::InvalidFormat("no JSON object in response".to_string())
    })
}

fn first_fenced_block(response: &str) -> Option<String> {
    let open = response.find("```")?;
    let after_fence = &response[open + 3..];
    // Skip the language tag line ("json", "jsonc", or empty)
    let content_start = after_fence.find('\n')? + 1;
    let content = &after_fence[content_start..];
    let close = content.find("```")?;
    Some(content[..close].trim().to_string())
}

/// Brace-match the first top-level object, respecting string literals
fn first_json_object(response: &str) -> Option<String> {
    let start = response.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in response[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(response[start..start + offset + 1].to_string());
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_domain::Location;

    const VALID_FIELDS: &str = r#"{
        "fields": {
            "month": {
                "extractionType": "keyValue",
                "location": {"keyName": "Report Month"},
                "dataType": "date",
                "required": true,
                "sampleValue": "2024-01"
            },
            "total": {
                "extractionType": "pattern",
                "location": {"searchText": "Grand Total", "pattern": "Grand Total:\\s*(\\d+)"},
                "dataType": "number",
                "sampleValue": "2260"
            }
        }
    }"#;

    #[test]
    fn test_parse_raw_json() {
        let (fields, dropped) = parse_generated_rules(VALID_FIELDS).unwrap();

        assert_eq!(fields.len(), 2);
        assert!(dropped.is_empty());
        assert!(matches!(fields["month"].location, Location::KeyValue(_)));
        assert!(fields["month"].required);
    }

    #[test]
    fn test_parse_fenced_code_block() {
        let response = format!(
            "Here are the rules I propose:\n\n```json\n{}\n```\n\nLet me know!",
            VALID_FIELDS
        );
        let (fields, _) = parse_generated_rules(&response).unwrap();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_parse_bare_object_in_prose() {
        let response = format!("Sure thing. {} Hope this helps.", VALID_FIELDS);
        let (fields, _) = parse_generated_rules(&response).unwrap();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_invalid_location_pairing_is_dropped_not_fatal() {
        // A pattern rule with zero capture groups fails validation; the
        // valid field survives
        let response = r#"{
            "fields": {
                "good": {
                    "extractionType": "keyValue",
                    "location": {"keyName": "Report Month"},
                    "dataType": "string",
                    "sampleValue": "2024-01"
                },
                "bad": {
                    "extractionType": "pattern",
                    "location": {"searchText": "Total", "pattern": "\\d+"},
                    "dataType": "number",
                    "sampleValue": "42"
                }
            }
        }"#;

        let (fields, dropped) = parse_generated_rules(response).unwrap();
        assert_eq!(fields.len(), 1);
        assert!(fields.contains_key("good"));
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].name, "bad");
        assert!(dropped[0].reason.contains("capture group"));
    }

    #[test]
    fn test_mismatched_location_shape_is_dropped() {
        // keyValue tag with a table-shaped location: parse-time rejection
        let response = r#"{
            "fields": {
                "confused": {
                    "extractionType": "keyValue",
                    "location": {"tableIndex": 0, "searchStrategy": "header_match"},
                    "dataType": "string",
                    "sampleValue": "x"
                }
            }
        }"#;

        let (fields, dropped) = parse_generated_rules(response).unwrap();
        assert!(fields.is_empty());
        assert_eq!(dropped.len(), 1);
    }

    #[test]
    fn test_no_json_is_invalid_format() {
        assert!(matches!(
            parse_generated_rules("I couldn't find any fields, sorry."),
            Err(RuleGenerationError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_missing_fields_mapping() {
        assert!(matches!(
            parse_generated_rules(r#"{"rules": []}"#),
            Err(RuleGenerationError::MissingFields)
        ));
    }

    #[test]
    fn test_braces_inside_string_values_are_ignored() {
        let response = r#"Result: {"fields": {}, "note": "braces { } inside strings"} trailing prose."#;
        let (fields, dropped) = parse_generated_rules(response).unwrap();
        assert!(fields.is_empty());
        assert!(dropped.is_empty());
    }

    #[test]
    fn test_fenced_block_without_language_tag() {
        let response = format!("```\n{}\n```", VALID_FIELDS);
        let (fields, _) = parse_generated_rules(&response).unwrap();
        assert_eq!(fields.len(), 2);
    }
}
