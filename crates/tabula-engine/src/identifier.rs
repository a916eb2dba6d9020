//! Multi-entity table identification
//!
//! A single document can carry several distinct repeating table sections,
//! each belonging to a different target entity (one table per logical
//! section, repeated across pages). Each entity declares a header signature;
//! every table is scored against every signature and assigned to the best
//! entity above a minimum threshold. Nothing is dropped silently: tables
//! below threshold and entities with no table are surfaced as warnings.

use crate::resolver::detect_header_row;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabula_domain::{DocumentModel, Table};
use tracing::{debug, info};

/// A target entity's header signature
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySignature {
    /// Entity name tables are routed to
    pub entity: String,

    /// Header tokens expected in the table's header row, in display order
    pub header_tokens: Vec<String>,

    /// Label text expected in the nearest text block above the table
    pub anchor_text: Option<String>,
}

impl EntitySignature {
    /// Signature with header tokens only
    pub fn new(entity: impl Into<String>, header_tokens: &[&str]) -> Self {
        Self {
            entity: entity.into(),
            header_tokens: header_tokens.iter().map(|t| t.to_string()).collect(),
            anchor_text: None,
        }
    }

    /// Add an anchor label expected above the table
    pub fn with_anchor(mut self, anchor: impl Into<String>) -> Self {
        self.anchor_text = Some(anchor.into());
        self
    }
}

/// Tuning knobs for identification
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IdentifierConfig {
    /// Minimum score for a table to be assigned at all
    pub min_score: f64,

    /// Score added when the anchor text is found above the table
    pub anchor_bonus: f64,
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            min_score: 0.35,
            anchor_bonus: 0.25,
        }
    }
}

/// One table routed to one entity
#[derive(Debug, Clone, PartialEq)]
pub struct TableAssignment {
    /// Index into `DocumentModel.tables`
    pub table_index: usize,

    /// Entity the table was assigned to
    pub entity: String,

    /// Winning score
    pub score: f64,
}

/// Non-fatal identification findings, surfaced as metadata
#[derive(Debug, Clone, PartialEq)]
pub enum IdentificationWarning {
    /// A table scored below threshold against every signature
    UnassignedTable {
        /// Index into `DocumentModel.tables`
        table_index: usize,
        /// Best-scoring entity, for diagnostics
        best_entity: Option<String>,
        /// The best score observed
        best_score: f64,
    },
    /// An entity matched no table at all
    UnmatchedEntity {
        /// The entity with no table
        entity: String,
    },
}

impl fmt::Display for IdentificationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentificationWarning::UnassignedTable {
                table_index,
                best_entity,
                best_score,
            } => write!(
                f,
                "table {} unassigned (best: {} at {:.2})",
                table_index,
                best_entity.as_deref().unwrap_or("none"),
                best_score
            ),
            IdentificationWarning::UnmatchedEntity { entity } => {
                write!(f, "entity '{}' matched no table", entity)
            }
        }
    }
}

/// Result of identifying every table in a document
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IdentificationOutcome {
    /// Assignments in page-then-position order
    pub assignments: Vec<TableAssignment>,

    /// Below-threshold tables and unmatched entities
    pub warnings: Vec<IdentificationWarning>,
}

impl IdentificationOutcome {
    /// Indices of the tables assigned to the given entity
    pub fn tables_for(&self, entity: &str) -> Vec<usize> {
        self.assignments
            .iter()
            .filter(|a| a.entity == entity)
            .map(|a| a.table_index)
            .collect()
    }
}

/// Assign every table in the document to the best-matching entity
///
/// Scoring: the fraction of signature tokens found (case-insensitive
/// substring) among the table's header row cells, plus a bonus when the
/// signature's anchor text appears in the nearest preceding text block on
/// the same page. Tables are processed in page-then-position order so
/// repeated sections assign deterministically; a score tie between entities
/// goes to the signature declared first.
pub fn identify_tables(
    doc: &DocumentModel,
    signatures: &[EntitySignature],
    config: &IdentifierConfig,
) -> IdentificationOutcome {
    let mut outcome = IdentificationOutcome::default();
    if signatures.is_empty() {
        return outcome;
    }

    // Earliest page, then top-most position, then original order
    let mut order: Vec<usize> = (0..doc.tables.len()).collect();
    order.sort_by(|&a, &b| {
        let ta = &doc.tables[a];
        let tb = &doc.tables[b];
        ta.page
            .cmp(&tb.page)
            .then_with(|| {
                let top_a = ta.bounding_box.map(|bb| bb.top).unwrap_or(0.0);
                let top_b = tb.bounding_box.map(|bb| bb.top).unwrap_or(0.0);
                top_a.total_cmp(&top_b)
            })
            .then(a.cmp(&b))
    });

    for table_index in order {
        let table = &doc.tables[table_index];
        let mut best: Option<(&EntitySignature, f64)> = None;

        for signature in signatures {
            let score = score_table(table, signature, doc, config);
            debug!(
                "table {} vs entity '{}': {:.2}",
                table_index, signature.entity, score
            );
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((signature, score));
            }
        }

        match best {
            Some((signature, score)) if score >= config.min_score => {
                outcome.assignments.push(TableAssignment {
                    table_index,
                    entity: signature.entity.clone(),
                    score,
                });
            }
            Some((signature, score)) => {
                outcome.warnings.push(IdentificationWarning::UnassignedTable {
                    table_index,
                    best_entity: Some(signature.entity.clone()),
                    best_score: score,
                });
            }
            None => {}
        }
    }

    for signature in signatures {
        if !outcome.assignments.iter().any(|a| a.entity == signature.entity) {
            outcome.warnings.push(IdentificationWarning::UnmatchedEntity {
                entity: signature.entity.clone(),
            });
        }
    }

    info!(
        "Identified {} of {} tables across {} entities ({} warnings)",
        outcome.assignments.len(),
        doc.tables.len(),
        signatures.len(),
        outcome.warnings.len()
    );

    outcome
}

fn score_table(
    table: &Table,
    signature: &EntitySignature,
    doc: &DocumentModel,
    config: &IdentifierConfig,
) -> f64 {
    if signature.header_tokens.is_empty() {
        return 0.0;
    }

    let header_idx = detect_header_row(table);
    let header_cells: Vec<String> = table
        .data
        .get(header_idx)
        .map(|row| row.iter().map(|c| c.to_lowercase()).collect())
        .unwrap_or_default();

    let matched = signature
        .header_tokens
        .iter()
        .filter(|token| {
            let token = token.to_lowercase();
            header_cells.iter().any(|cell| cell.contains(&token))
        })
        .count();

    let mut score = matched as f64 / signature.header_tokens.len() as f64;

    if let Some(anchor) = &signature.anchor_text {
        if let Some(block) = nearest_preceding_block(table, doc) {
            if block.to_lowercase().contains(&anchor.to_lowercase()) {
                score += config.anchor_bonus;
            }
        }
    }

    score
}

/// The nearest text block above the table on the same page
///
/// With bounding boxes, "nearest" is the block with the greatest top edge
/// still above the table's; without them, the last block on the page wins.
fn nearest_preceding_block<'a>(table: &Table, doc: &'a DocumentModel) -> Option<&'a str> {
    let table_top = table.bounding_box.map(|bb| bb.top);

    doc.text_blocks
        .iter()
        .filter(|block| block.page == table.page)
        .filter(|block| match (block.bounding_box, table_top) {
            (Some(bb), Some(top)) => bb.top <= top,
            _ => true,
        })
        .max_by(|a, b| {
            let top_a = a.bounding_box.map(|bb| bb.top).unwrap_or(0.0);
            let top_b = b.bounding_box.map(|bb| bb.top).unwrap_or(0.0);
            top_a.total_cmp(&top_b)
        })
        .map(|block| block.text.as_str())
}
