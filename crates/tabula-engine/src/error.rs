//! Error types for the resolution engine

use thiserror::Error;

/// Errors that can occur during resolution, coercion, and template writes
///
/// "Not found" is never an error: resolvers return `None` for missing
/// values. Only structural problems (malformed rule locations), coercion
/// failures on required fields, and stale-version writes surface here.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed rule location - fatal for that field only
    #[error("resolution error: {0}")]
    Resolution(String),

    /// Type-coercion failure on a required field
    #[error("validation error: {0}")]
    Validation(String),

    /// Stale version on a template write; the caller must refetch
    #[error("version conflict: base version {base} does not match stored version {stored}")]
    Conflict {
        /// Version the caller based its write on
        base: u64,
        /// Version currently stored
        stored: u64,
    },

    /// Template id not present in the store
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    /// Insert of an id that already exists
    #[error("duplicate template id: {0}")]
    DuplicateTemplate(String),
}
