//! Prompt construction for rule generation
//!
//! The prompt pairs a fixed system role with a user prompt describing the
//! four extraction-rule shapes, the expected output schema, the bounded
//! document summary, and any user guidance. The response is untrusted and
//! goes through full rule validation before acceptance.

/// System prompt sent with every generation call
pub const SYSTEM_PROMPT: &str = "You are an expert at analyzing document structure and \
authoring field extraction rules. You respond with a single JSON object and no other text.";

/// Builds user prompts for the rule generation call
pub struct PromptBuilder {
    summary: String,
    guidance: Option<String>,
}

impl PromptBuilder {
    /// Create a builder around a rendered document summary
    pub fn new(summary: String) -> Self {
        Self {
            summary,
            guidance: None,
        }
    }

    /// Add the user's free-form guidance about the fields they want
    pub fn with_guidance(mut self, guidance: impl Into<String>) -> Self {
        self.guidance = Some(guidance.into());
        self
    }

    /// Build the complete user prompt
    pub fn build(&self) -> String {
        let mut prompt = String::new();

        // 1. Task and rule-shape specification
        prompt.push_str(RULE_INSTRUCTIONS);
        prompt.push_str("\n\n");

        // 2. User guidance, when given
        if let Some(guidance) = &self.guidance {
            prompt.push_str("User guidance:\n");
            prompt.push_str(guidance);
            prompt.push_str("\n\n");
        }

        // 3. The document to analyze
        prompt.push_str("Document to analyze:\n");
        prompt.push_str("---\n");
        prompt.push_str(&self.summary);
        prompt.push_str("---\n\n");

        // 4. Output format reminder
        prompt.push_str(OUTPUT_FORMAT_REMINDER);

        prompt
    }
}

const RULE_INSTRUCTIONS: &str = r#"Propose extraction rules for the structured fields in the following document.
Each rule has one of four extraction types, and its location shape depends on the type:

- "table": {"tableIndex": <int>, "searchStrategy": "header_match" | "position" | "find_cell_with_text",
  "headerName": <text>, "columnIndex": <int>, "rowRange": [start, end], "searchText": <text>,
  "columnMapping": {<fieldName>: <columnIndex>, ...}}
  Use columnMapping (and no searchStrategy) when the table holds one record per row.
- "keyValue": {"keyName": <exact key>} or {"keyPattern": <regex>}
- "position": {"page": <int>, "boundingBox": {"top": 0..1, "left": 0..1, "width": 0..1, "height": 0..1}}
- "pattern": {"searchText": <anchor text>, "pattern": <regex with exactly one capture group>}

Rules:
- Field names are snake_case and unique
- dataType is one of "string", "number", "date", "boolean", "array"
- Mark a field "required" only when the document clearly always carries it
- sampleValue is the value visible in this document
- confidence is your 0..1 estimate that the rule generalizes to sibling documents
- Prefer keyValue rules for labeled form fields, table rules for tabular data"#;

const OUTPUT_FORMAT_REMINDER: &str = r#"Output format (a single JSON object, no additional text):
{
  "fields": {
    "<field_name>": {
      "extractionType": "table" | "keyValue" | "position" | "pattern",
      "location": { ... },
      "dataType": "string",
      "required": false,
      "sampleValue": "example",
      "confidence": 0.9
    }
  }
}"#;
