//! User corrections fed back into templates

use serde::{Deserialize, Serialize};

/// A user-supplied replacement value for one extracted field in one row
///
/// A batch of corrections applies to one extraction run against one
/// template; the correction merge engine folds the batch into the
/// template's rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRecord {
    /// Row the correction applies to (0-based, within the run's records)
    pub row_index: usize,

    /// Field the correction applies to; must match a template field name
    pub field_name: String,

    /// Value the extraction produced
    pub old_value: String,

    /// Value the user supplied instead
    pub new_value: String,
}

impl CorrectionRecord {
    /// True when the user actually changed the value
    pub fn is_change(&self) -> bool {
        self.old_value != self.new_value
    }
}
