//! Tabula Engine
//!
//! The resolution core: pure, deterministic transformations from
//! `(Template, DocumentModel)` to structured records.
//!
//! # Overview
//!
//! - **Resolvers**: one per extraction type (`table`, `keyValue`,
//!   `position`, `pattern`), mapping a rule and a document to a candidate
//!   value; "not found" is `None`, never an error
//! - **Coercion**: raw strings to the rule's declared data type, degrading
//!   to the raw string on optional fields and reporting required fields
//! - **Table identification**: routes repeating tables in multi-entity
//!   documents to their target entities by header signature
//! - **Column mapping**: fuzzy header-to-field mapping with a positional
//!   fallback for empty or duplicated header rows
//! - **Correction merge**: folds user corrections back into a template
//!   without corrupting unrelated fields
//! - **Template store**: in-memory, version-checked writes
//!
//! # Concurrency
//!
//! Per-document resolution is synchronous and shares no mutable state;
//! [`resolve_batch`] fans independent documents out across a bounded worker
//! pool. Results within one document are deterministic given the same
//! template and document.
//!
//! # Example
//!
//! ```
//! use tabula_domain::{DocumentModel, ExtractionMethod, ExtractionRule,
//!     KeyValueLocation, KeyValuePair, Location, Template};
//! use tabula_engine::apply_template;
//!
//! let doc = DocumentModel {
//!     key_value_pairs: vec![KeyValuePair {
//!         key: "Report Month".into(),
//!         value: "2024-01".into(),
//!         confidence: None,
//!         page: 1,
//!     }],
//!     ..Default::default()
//! };
//!
//! let template = Template::new("monthly", ExtractionMethod::Selector)
//!     .with_field("month", ExtractionRule::new(Location::KeyValue(KeyValueLocation {
//!         key_name: Some("Report Month".into()),
//!         key_pattern: None,
//!     })));
//!
//! let run = apply_template(&template, &doc);
//! assert_eq!(run.records[0]["month"].as_text(), "2024-01");
//! ```

#![warn(missing_docs)]

mod coerce;
mod error;
mod identifier;
mod mapping;
mod merge;
mod resolver;
mod runner;
mod store;

pub use coerce::coerce;
pub use error::EngineError;
pub use identifier::{
    identify_tables, EntitySignature, IdentificationOutcome, IdentificationWarning,
    IdentifierConfig, TableAssignment,
};
pub use mapping::{
    auto_map_columns, extract_auto_mapped_records, merge_continuation_tables, similarity,
    FieldSpec,
};
pub use merge::{merge_corrections, MergeConfig, MergeOutcome};
pub use resolver::{detect_header_row, resolve, resolve_records};
pub use runner::{
    apply_template, resolve_batch, ExtractionRun, FailureKind, FieldFailure, Record,
};
pub use store::MemoryTemplateStore;
