//! Configuration for the rule generator

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the rule generation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Maximum time for a single generation call (seconds)
    pub generation_timeout_secs: u64,

    /// Rows rendered per table in the document summary; rows beyond the cap
    /// are replaced by an explicit "...and N more rows" notice
    pub max_table_rows: usize,

    /// Text lines sampled into the document summary
    pub max_text_lines: usize,

    /// Characters a single summary cell is truncated to
    pub max_cell_chars: usize,
}

impl GeneratorConfig {
    /// Get the generation timeout as a Duration
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.generation_timeout_secs == 0 {
            return Err("generation_timeout_secs must be greater than 0".to_string());
        }
        if self.max_table_rows == 0 {
            return Err("max_table_rows must be greater than 0".to_string());
        }
        if self.max_cell_chars == 0 {
            return Err("max_cell_chars must be greater than 0".to_string());
        }
        Ok(())
    }

    /// Quick preset: shorter timeout, smaller summaries
    pub fn quick() -> Self {
        Self {
            generation_timeout_secs: 60,
            max_table_rows: 10,
            max_text_lines: 20,
            max_cell_chars: 40,
        }
    }

    /// Thorough preset: longer timeout, larger summaries
    pub fn thorough() -> Self {
        Self {
            generation_timeout_secs: 300,
            max_table_rows: 40,
            max_text_lines: 80,
            max_cell_chars: 120,
        }
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to a TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            generation_timeout_secs: 120,
            max_table_rows: 20,
            max_text_lines: 40,
            max_cell_chars: 80,
        }
    }
}
