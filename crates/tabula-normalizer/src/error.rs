//! Error types for normalization

use thiserror::Error;

/// Errors that can occur while normalizing raw content
///
/// Normalization is all-or-nothing: no partial `DocumentModel` is ever
/// returned alongside an error.
#[derive(Error, Debug)]
pub enum NormalizationError {
    /// Input was empty or whitespace-only
    #[error("empty input")]
    Empty,

    /// Input could not be parsed as the declared kind
    #[error("unparsable {kind} content: {reason}")]
    Unparsable {
        /// Source kind that was being parsed
        kind: &'static str,
        /// What went wrong
        reason: String,
    },

    /// No normalizer is registered for the file extension
    #[error("no normalizer registered for extension '{0}'")]
    UnsupportedExtension(String),

    /// Input bytes were not valid text
    #[error("invalid text encoding: {0}")]
    Encoding(String),
}
