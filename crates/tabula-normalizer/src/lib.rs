//! Tabula Normalizer
//!
//! Converts heterogeneous raw documents into the canonical `DocumentModel`
//! consumed by the resolution engine.
//!
//! # Overview
//!
//! One normalizer per source kind:
//!
//! - **OCR**: pass-through of the upstream analysis schema (tables,
//!   key-value pairs, text blocks), each page- and bounding-box-tagged
//! - **HTML**: script/style stripping, a lightweight DOM tree, derived
//!   headings/paragraphs/lists/tables, and a flattened full-text string
//! - **Email**: RFC822/MIME headers (from/to/cc/bcc/subject/date), the
//!   HTML-preferred body, and attachment metadata
//! - **CSV**: one table per file
//! - **JSON**: scalar fields become key-value pairs, arrays of objects
//!   become tables
//!
//! Normalizer selection is by explicit [`SourceKind`], or by file extension
//! via [`normalize_path`], never by content sniffing. OCR analysis payloads
//! share the `.json` extension with plain JSON documents, so OCR is only
//! reachable through an explicit kind.
//!
//! # Errors
//!
//! Normalization fails with [`NormalizationError`] when content is empty,
//! unparsable, or of a kind with no registered normalizer. No partial
//! document model is ever produced.

#![warn(missing_docs)]

mod csv;
mod email;
mod error;
mod html;
mod json;
mod ocr;

use tabula_domain::DocumentModel;
use tracing::info;

pub use error::NormalizationError;

/// The raw source format of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Upstream OCR/analysis service output (fixed JSON schema)
    Ocr,
    /// An HTML page or fragment
    Html,
    /// An RFC822/MIME email message
    Email,
    /// Comma-separated tabular data
    Csv,
    /// A JSON document
    Json,
}

impl SourceKind {
    /// Map a file extension to a source kind
    ///
    /// Returns `None` for unrecognized extensions. OCR payloads are not
    /// reachable here; callers pass [`SourceKind::Ocr`] explicitly.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" => Some(SourceKind::Html),
            "eml" | "msg" => Some(SourceKind::Email),
            "csv" => Some(SourceKind::Csv),
            "json" => Some(SourceKind::Json),
            _ => None,
        }
    }

    /// Stable lowercase name for logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Ocr => "ocr",
            SourceKind::Html => "html",
            SourceKind::Email => "email",
            SourceKind::Csv => "csv",
            SourceKind::Json => "json",
        }
    }
}

/// Normalize raw content of a known kind into a `DocumentModel`
pub fn normalize(raw: &[u8], kind: SourceKind) -> Result<DocumentModel, NormalizationError> {
    if raw.iter().all(u8::is_ascii_whitespace) {
        return Err(NormalizationError::Empty);
    }

    let model = match kind {
        SourceKind::Ocr => ocr::normalize(raw)?,
        SourceKind::Html => html::normalize(raw)?,
        SourceKind::Email => email::normalize(raw)?,
        SourceKind::Csv => csv::normalize(raw)?,
        SourceKind::Json => json::normalize(raw)?,
    };

    info!(
        "Normalized {} input: {} tables, {} key-value pairs, {} text blocks",
        kind.as_str(),
        model.tables.len(),
        model.key_value_pairs.len(),
        model.text_blocks.len()
    );

    Ok(model)
}

/// Normalize raw content, selecting the normalizer by file extension
///
/// Selection is by extension only, never by content sniffing; an
/// unrecognized extension fails with
/// [`NormalizationError::UnsupportedExtension`].
pub fn normalize_path(raw: &[u8], filename: &str) -> Result<DocumentModel, NormalizationError> {
    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .unwrap_or_default();

    let kind = SourceKind::from_extension(ext)
        .ok_or_else(|| NormalizationError::UnsupportedExtension(ext.to_string()))?;

    normalize(raw, kind)
}

pub(crate) fn decode_text(raw: &[u8], kind: &'static str) -> Result<String, NormalizationError> {
    match std::str::from_utf8(raw) {
        Ok(s) => Ok(s.to_string()),
        Err(e) => Err(NormalizationError::Encoding(format!(
            "{} input is not valid UTF-8: {}",
            kind, e
        ))),
    }
}
