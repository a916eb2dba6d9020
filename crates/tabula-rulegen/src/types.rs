//! Output types for rule generation

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tabula_domain::{ExtractionMethod, ExtractionRule, Template, TemplateStatus};

/// Output of one rule generation call
///
/// Transient: the caller decides whether to persist it as a `Template`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedRules {
    /// Proposed field rules, all validated
    pub fields: BTreeMap<String, ExtractionRule>,

    /// Fields the model proposed but validation rejected
    #[serde(default)]
    pub dropped: Vec<DroppedField>,

    /// Generation metadata
    pub metadata: GenerationMetadata,
}

impl GeneratedRules {
    /// Turn the proposal into a draft template
    pub fn into_template(self, name: impl Into<String>) -> Template {
        let mut template = Template::new(name, ExtractionMethod::Ai);
        template.fields = self.fields;
        template.status = TemplateStatus::Draft;
        template
    }
}

/// A proposed field that failed validation and was dropped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DroppedField {
    /// Field name as proposed by the model
    pub name: String,

    /// Why validation rejected it
    pub reason: String,
}

/// Metadata attached to a successful generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationMetadata {
    /// Model identifier the rules were generated with
    pub model: String,

    /// Unix timestamp (seconds) of the generation
    pub generated_at: u64,

    /// Number of tables rendered into the prompt
    pub tables_analyzed: usize,

    /// Number of key-value pairs rendered into the prompt
    pub key_value_pairs_analyzed: usize,
}
