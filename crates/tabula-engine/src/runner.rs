//! Template application
//!
//! Resolves every field of a template against one document, coerces values,
//! and reports per-field failures without ever discarding successfully
//! resolved fields. Field resolution order is deterministic (sorted field
//! names), so applying the same template to the same document twice yields
//! identical output.

use crate::coerce::coerce;
use crate::error::EngineError;
use crate::resolver::{resolve, resolve_records};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tabula_domain::{DataType, DocumentModel, FieldValue, Location, Template};
use tracing::{debug, info};

/// One extracted record: field name to coerced value
pub type Record = BTreeMap<String, FieldValue>;

/// Why a field produced no usable value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Malformed rule location
    Resolution,
    /// Type coercion failed on a required field
    Validation,
    /// A required field resolved to nothing
    MissingRequired,
}

/// A per-field, per-row failure report
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFailure {
    /// Field that failed
    pub field: String,

    /// Row the failure occurred in, when row-scoped
    pub row_index: Option<usize>,

    /// Failure classification
    pub kind: FailureKind,

    /// Human-readable reason
    pub reason: String,
}

/// Result of applying one template to one document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractionRun {
    /// Extracted records; one per repeating table row, or a single record
    /// for templates with only scalar fields
    pub records: Vec<Record>,

    /// Per-field failures; never causes other fields to be dropped
    pub failures: Vec<FieldFailure>,
}

impl ExtractionRun {
    /// True when every field resolved and coerced cleanly
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Apply a template to a document
///
/// Scalar fields resolve once and are merged into every record. Table rules
/// carrying a `columnMapping` emit one record per data row. Required fields
/// that resolve to no value are reported, never silently dropped.
pub fn apply_template(template: &Template, doc: &DocumentModel) -> ExtractionRun {
    let mut run = ExtractionRun::default();
    let mut scalars: Record = BTreeMap::new();

    let (repeating, scalar): (Vec<_>, Vec<_>) = template
        .fields
        .iter()
        .partition(|(_, rule)| is_repeating(rule));

    for (name, rule) in scalar {
        match resolve(rule, doc) {
            Ok(Some(raw)) => {
                apply_coercion(name, rule, &raw, None, &mut scalars, &mut run.failures);
            }
            Ok(None) => {
                if rule.required {
                    run.failures.push(FieldFailure {
                        field: name.clone(),
                        row_index: None,
                        kind: FailureKind::MissingRequired,
                        reason: "required field resolved to no value".to_string(),
                    });
                }
            }
            Err(e) => {
                run.failures.push(FieldFailure {
                    field: name.clone(),
                    row_index: None,
                    kind: FailureKind::Resolution,
                    reason: e.to_string(),
                });
            }
        }
    }

    if repeating.is_empty() {
        run.records.push(scalars);
        debug!("Applied template '{}': 1 record", template.name);
        return run;
    }

    for (name, rule) in repeating {
        let rows = match resolve_records(rule, doc) {
            Ok(rows) => rows,
            Err(e) => {
                run.failures.push(FieldFailure {
                    field: name.clone(),
                    row_index: None,
                    kind: FailureKind::Resolution,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        for row in rows {
            let row_index = run.records.len();
            let mut record = scalars.clone();

            for (sub_field, raw) in row {
                // The mapped field may itself be declared in the template;
                // its data type and required flag then apply
                let declared = template.fields.get(&sub_field);
                let data_type = declared.map(|r| r.data_type).unwrap_or(DataType::String);
                let required = declared.map(|r| r.required).unwrap_or(false);

                if raw.is_empty() {
                    if required {
                        run.failures.push(FieldFailure {
                            field: sub_field.clone(),
                            row_index: Some(row_index),
                            kind: FailureKind::MissingRequired,
                            reason: "required field resolved to no value".to_string(),
                        });
                    }
                    record.insert(sub_field, FieldValue::Text(String::new()));
                    continue;
                }

                match coerce(&raw, data_type) {
                    Ok(value) => {
                        record.insert(sub_field, value);
                    }
                    Err(e) if required => {
                        run.failures.push(FieldFailure {
                            field: sub_field.clone(),
                            row_index: Some(row_index),
                            kind: FailureKind::Validation,
                            reason: e.to_string(),
                        });
                    }
                    Err(_) => {
                        // Coercion failure on an optional field degrades to
                        // the raw string
                        record.insert(sub_field, FieldValue::Text(raw));
                    }
                }
            }

            run.records.push(record);
        }
    }

    info!(
        "Applied template '{}': {} records, {} failures",
        template.name,
        run.records.len(),
        run.failures.len()
    );

    run
}

fn is_repeating(rule: &tabula_domain::ExtractionRule) -> bool {
    matches!(
        &rule.location,
        Location::Table(loc)
            if loc.search_strategy.is_none()
                && loc.column_mapping.as_ref().map_or(false, |m| !m.is_empty())
    )
}

fn apply_coercion(
    name: &str,
    rule: &tabula_domain::ExtractionRule,
    raw: &str,
    row_index: Option<usize>,
    out: &mut Record,
    failures: &mut Vec<FieldFailure>,
) {
    if let Some(pattern) = rule.pattern.as_deref() {
        if let Ok(regex) = regex::Regex::new(pattern) {
            if !regex.is_match(raw) {
                if rule.required {
                    failures.push(FieldFailure {
                        field: name.to_string(),
                        row_index,
                        kind: FailureKind::Validation,
                        reason: format!("value '{}' does not match validation pattern", raw),
                    });
                    return;
                }
                // Optional field: keep the raw value anyway
            }
        }
    }

    match coerce(raw, rule.data_type) {
        Ok(value) => {
            out.insert(name.to_string(), value);
        }
        Err(e) if rule.required => {
            failures.push(FieldFailure {
                field: name.to_string(),
                row_index,
                kind: FailureKind::Validation,
                reason: e.to_string(),
            });
        }
        Err(_) => {
            out.insert(name.to_string(), FieldValue::Text(raw.to_string()));
        }
    }
}

/// Apply one template to a batch of independent documents with a bounded
/// worker pool
///
/// Per-document resolution is a pure-data transformation with no shared
/// mutable state, so documents are fanned out across workers freely. The
/// returned runs are index-aligned with the input slice.
pub fn resolve_batch(
    template: &Template,
    docs: &[DocumentModel],
    workers: usize,
) -> Vec<ExtractionRun> {
    if docs.is_empty() {
        return Vec::new();
    }
    let workers = workers.max(1).min(docs.len());

    let next = AtomicUsize::new(0);
    let slots: Vec<Mutex<Option<ExtractionRun>>> =
        (0..docs.len()).map(|_| Mutex::new(None)).collect();

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                if index >= docs.len() {
                    break;
                }
                let run = apply_template(template, &docs[index]);
                if let Ok(mut slot) = slots[index].lock() {
                    *slot = Some(run);
                }
            });
        }
    });

    slots
        .into_iter()
        .map(|slot| {
            slot.into_inner()
                .ok()
                .flatten()
                .unwrap_or_default()
        })
        .collect()
}
