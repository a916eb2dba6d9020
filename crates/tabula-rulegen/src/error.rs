//! Error types for rule generation

use thiserror::Error;

/// Errors that can occur during rule generation
///
/// Generation is a pure function of its input: on any of these failures the
/// caller may retry the whole call, and a failed generation is never
/// partially applied.
#[derive(Error, Debug)]
pub enum RuleGenerationError {
    /// Text-generation service unreachable or erroring
    #[error("Provider error: {0}")]
    Provider(String),

    /// Generation exceeded the configured timeout
    #[error("Generation timeout")]
    Timeout,

    /// No parseable JSON in the response
    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    /// Response JSON is missing the required `fields` mapping
    #[error("Response is missing the 'fields' mapping")]
    MissingFields,

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for RuleGenerationError {
    fn from(e: serde_json::Error) -> Self {
        RuleGenerationError::JsonParse(e.to_string())
    }
}
