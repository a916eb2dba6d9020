//! Tabula Domain Layer
//!
//! This crate contains the canonical data model for the extraction engine.
//! It defines the document model produced by normalization, the extraction
//! rule and template types resolved against documents, and the trait
//! interfaces that all other layers depend upon.
//!
//! ## Key Concepts
//!
//! - **DocumentModel**: the canonical representation of a normalized document
//!   (tables, key-value pairs, text blocks, optional DOM tree)
//! - **ExtractionRule**: one field's strategy and location descriptor; the
//!   location shape is fully determined by the extraction type
//! - **Template**: a named, versioned mapping from field names to rules,
//!   reusable across documents of the same layout family
//! - **CorrectionRecord**: a user-supplied replacement value fed back into a
//!   template by the correction merge engine
//!
//! ## Architecture
//!
//! - Location/extraction-type mismatches are unrepresentable after parsing:
//!   the location is a tagged union with one case per extraction type
//! - Infrastructure implementations (providers, stores) live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod correction;
pub mod document;
pub mod rule;
pub mod template;
pub mod traits;
pub mod value;

// Re-exports for convenience
pub use correction::CorrectionRecord;
pub use document::{BlockType, BoundingBox, DocumentModel, DomNode, KeyValuePair, Table, TextBlock};
pub use rule::{
    DataType, ExtractionRule, KeyValueLocation, Location, PatternLocation, PositionLocation,
    SearchStrategy, TableLocation,
};
pub use template::{ExtractionMethod, Selector, Template, TemplateId, TemplateStatus};
pub use value::FieldValue;
