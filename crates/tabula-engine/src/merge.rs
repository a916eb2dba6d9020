//! Correction merge engine
//!
//! Folds a batch of user corrections into a template without touching
//! unrelated fields. A correction updates the rule's sample value when the
//! template's current resolution disagrees, and lowers the rule's
//! confidence toward a floor in proportion to how often the field needed
//! correcting. Corrections to different fields are independent and
//! order-insensitive, and merging the same batch twice is a no-op the
//! second time.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tabula_domain::{CorrectionRecord, Template};
use tracing::{debug, warn};

/// Tuning knobs for the correction merge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// Confidence removed per correction
    pub confidence_step: f64,

    /// Confidence never drops below this floor
    pub confidence_floor: f64,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            confidence_step: 0.1,
            confidence_floor: 0.1,
        }
    }
}

/// Result of a correction merge
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The updated template; version is untouched, the store bumps it
    pub template: Template,

    /// Corrections referencing unknown fields, reported not applied
    pub warnings: Vec<String>,

    /// Number of fields whose rules were actually changed
    pub fields_updated: usize,
}

/// Merge a batch of corrections into a template
///
/// Never fails on well-formed corrections; a correction referencing an
/// unknown field name is ignored and reported as a warning. The merge is
/// idempotent: a field whose sample value already equals the batch's final
/// corrected value is left alone, confidence included.
pub fn merge_corrections(
    template: &Template,
    corrections: &[CorrectionRecord],
    config: &MergeConfig,
) -> MergeOutcome {
    let mut outcome = MergeOutcome {
        template: template.clone(),
        warnings: Vec::new(),
        fields_updated: 0,
    };

    // Group per field so fields stay independent and order-insensitive
    let mut by_field: BTreeMap<&str, Vec<&CorrectionRecord>> = BTreeMap::new();
    for correction in corrections {
        if !template.fields.contains_key(&correction.field_name) {
            let warning = format!(
                "correction for unknown field '{}' ignored",
                correction.field_name
            );
            warn!("{}", warning);
            outcome.warnings.push(warning);
            continue;
        }
        by_field
            .entry(correction.field_name.as_str())
            .or_default()
            .push(correction);
    }

    for (field_name, mut group) in by_field {
        group.sort_by_key(|c| c.row_index);
        let final_value = match group.last() {
            Some(c) => c.new_value.clone(),
            None => continue,
        };

        let rule = match outcome.template.fields.get_mut(field_name) {
            Some(r) => r,
            None => continue,
        };

        if rule.sample_value == final_value {
            // The template already reflects this batch; nothing disagrees
            debug!("field '{}' already merged, skipping", field_name);
            continue;
        }

        let corrections_applied = group.len();
        let current = rule.confidence.unwrap_or(1.0);
        let lowered = (current - config.confidence_step * corrections_applied as f64)
            .max(config.confidence_floor)
            .max(0.0);

        debug!(
            "field '{}': sample '{}' -> '{}', confidence {:.2} -> {:.2} ({} corrections)",
            field_name, rule.sample_value, final_value, current, lowered, corrections_applied
        );

        rule.sample_value = final_value;
        rule.confidence = Some(lowered);
        outcome.fields_updated += 1;
    }

    outcome
}
