//! OCR analysis pass-through normalizer
//!
//! The upstream analysis service already returns tables, key-value pairs,
//! and text blocks in the shapes the document model uses; this normalizer
//! deserializes the payload and derives the flattened full text. Schema
//! mismatches are the caller's responsibility to fix upstream.

use crate::error::NormalizationError;
use serde::Deserialize;
use tabula_domain::{DocumentModel, KeyValuePair, Table, TextBlock};

/// Wire shape of an analysis-service result
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisPayload {
    #[serde(default)]
    tables: Vec<Table>,
    #[serde(default)]
    key_value_pairs: Vec<KeyValuePair>,
    #[serde(default)]
    text_blocks: Vec<TextBlock>,
}

pub(crate) fn normalize(raw: &[u8]) -> Result<DocumentModel, NormalizationError> {
    let payload: AnalysisPayload =
        serde_json::from_slice(raw).map_err(|e| NormalizationError::Unparsable {
            kind: "ocr",
            reason: e.to_string(),
        })?;

    let full_text = payload
        .text_blocks
        .iter()
        .map(|b| b.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    let model = DocumentModel {
        tables: payload.tables,
        key_value_pairs: payload.key_value_pairs,
        text_blocks: payload.text_blocks,
        dom_tree: None,
        full_text,
    };

    if model.is_empty() {
        return Err(NormalizationError::Unparsable {
            kind: "ocr",
            reason: "analysis payload contains no tables, pairs, or text".to_string(),
        });
    }

    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "tables": [{
            "page": 1,
            "rows": 2,
            "columns": 2,
            "boundingBox": {"top": 0.1, "left": 0.1, "width": 0.8, "height": 0.3},
            "data": [["Brand", "Cases"], ["Acme", "120"]]
        }],
        "keyValuePairs": [
            {"key": "Report Month", "value": "2024-01", "confidence": 0.98, "page": 1}
        ],
        "textBlocks": [
            {"text": "Monthly Brand Report", "blockType": "heading", "page": 1,
             "boundingBox": {"top": 0.02, "left": 0.1, "width": 0.5, "height": 0.04}}
        ]
    }"#;

    #[test]
    fn test_passthrough_preserves_structure() {
        let model = normalize(SAMPLE.as_bytes()).unwrap();

        assert_eq!(model.tables.len(), 1);
        assert_eq!(model.tables[0].data[1], vec!["Acme", "120"]);
        assert_eq!(model.key_value_pairs[0].key, "Report Month");
        assert_eq!(model.key_value_pairs[0].value, "2024-01");
        assert_eq!(model.text_blocks.len(), 1);
        assert_eq!(model.full_text, "Monthly Brand Report");
    }

    #[test]
    fn test_invalid_json_is_unparsable() {
        let err = normalize(b"not json").unwrap_err();
        assert!(matches!(
            err,
            NormalizationError::Unparsable { kind: "ocr", .. }
        ));
    }

    #[test]
    fn test_structurally_empty_payload_is_rejected() {
        let err = normalize(b"{}").unwrap_err();
        assert!(matches!(err, NormalizationError::Unparsable { .. }));
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let raw = r#"{"keyValuePairs": [{"key": "k", "value": "v", "page": 1}]}"#;
        let model = normalize(raw.as_bytes()).unwrap();
        assert!(model.tables.is_empty());
        assert_eq!(model.key_value_pairs.len(), 1);
    }
}
