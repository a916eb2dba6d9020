//! Template module - versioned, reusable field-to-rule mappings

use crate::rule::ExtractionRule;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for a template based on UUIDv7
///
/// UUIDv7 provides chronological sortability and coordination-free
/// generation, so templates created across workers sort by creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(u128);

impl TemplateId {
    /// Generate a new UUIDv7-based TemplateId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a TemplateId from a raw u128 value
    ///
    /// This is primarily for storage layer deserialization.
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a TemplateId from a UUID string
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s)
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid template id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for TemplateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// How a template's fields were authored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
    /// Rules proposed by the rule generation pipeline
    Ai,
    /// Rules authored against structural selectors (CSS/XPath/column)
    Selector,
    /// A mix of generated and hand-edited rules
    Hybrid,
}

/// Lifecycle state of a template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateStatus {
    /// Under construction; not used for extraction runs
    Draft,
    /// Live and applied to incoming documents
    Active,
    /// Retired but retained for history
    Archived,
}

/// Structural descriptor for non-AI strategies
///
/// Selectors carry the source-format-specific addressing a field was
/// authored against (a CSS path, an XPath, a CSV column, a JSON path),
/// plus the sample value observed at authoring time.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selector {
    /// CSS selector for HTML sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,

    /// XPath for HTML/XML sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xpath: Option<String>,

    /// Zero-based column index for tabular sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_index: Option<usize>,

    /// Dotted path for JSON sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_path: Option<String>,

    /// Sample value captured when the selector was authored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample: Option<String>,
}

/// A named, versioned mapping from field names to extraction rules
///
/// Field names are unique (enforced by the map) and are the join key between
/// a template and any structured output record. An update replaces the whole
/// `fields` map atomically from the caller's perspective; the `version` field
/// is the optimistic-concurrency token checked by template stores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    /// Unique identifier
    pub id: TemplateId,

    /// Human-readable template name
    pub name: String,

    /// Field name to extraction rule, iterated in sorted order for
    /// deterministic resolution
    pub fields: BTreeMap<String, ExtractionRule>,

    /// How the fields were authored
    pub extraction_method: ExtractionMethod,

    /// Structural descriptors for non-AI strategies
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub selectors: BTreeMap<String, Selector>,

    /// Lifecycle state
    pub status: TemplateStatus,

    /// Monotonic version for optimistic concurrency
    pub version: u64,
}

impl Template {
    /// Create an empty draft template at version 0
    pub fn new(name: impl Into<String>, extraction_method: ExtractionMethod) -> Self {
        Self {
            id: TemplateId::new(),
            name: name.into(),
            fields: BTreeMap::new(),
            extraction_method,
            selectors: BTreeMap::new(),
            status: TemplateStatus::Draft,
            version: 0,
        }
    }

    /// Add or replace a field rule
    pub fn with_field(mut self, name: impl Into<String>, rule: ExtractionRule) -> Self {
        self.fields.insert(name.into(), rule);
        self
    }

    /// Validate every field rule, returning the offending field on failure
    pub fn validate(&self) -> Result<(), String> {
        for (name, rule) in &self.fields {
            rule.validate()
                .map_err(|e| format!("field '{}': {}", name, e))?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: TemplateId ordering matches u128 ordering
        #[test]
        fn test_id_ordering_property(a: u128, b: u128) {
            let id_a = TemplateId::from_value(a);
            let id_b = TemplateId::from_value(b);

            prop_assert_eq!(id_a < id_b, a < b);
            prop_assert_eq!(id_a == id_b, a == b);
        }

        /// Property: round-trip through string representation preserves the id
        #[test]
        fn test_id_string_roundtrip(value: u128) {
            let id = TemplateId::from_value(value);

            match TemplateId::from_string(&id.to_string()) {
                Ok(parsed) => prop_assert_eq!(id, parsed),
                Err(e) => return Err(TestCaseError::fail(e)),
            }
        }
    }
}
