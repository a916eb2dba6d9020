//! Bounded textual document summaries
//!
//! Rule generation sends the model a description of the document, not the
//! document itself: table rows are capped per table with an explicit
//! "...and N more rows" notice, key-value pairs go in full, and text lines
//! are sampled. The caps keep the prompt bounded regardless of document
//! size.

use crate::config::GeneratorConfig;
use tabula_domain::DocumentModel;

/// Render the bounded summary of a document
pub fn render(doc: &DocumentModel, config: &GeneratorConfig) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "Document: {} page(s), {} table(s), {} key-value pair(s), {} text block(s)\n",
        doc.page_count(),
        doc.tables.len(),
        doc.key_value_pairs.len(),
        doc.text_blocks.len()
    ));

    for (index, table) in doc.tables.iter().enumerate() {
        out.push_str(&format!(
            "\nTable {} (page {}, {} rows x {} columns):\n",
            index, table.page, table.rows, table.columns
        ));

        for row in table.data.iter().take(config.max_table_rows) {
            let cells: Vec<String> = row
                .iter()
                .map(|cell| truncate(cell, config.max_cell_chars))
                .collect();
            out.push_str(&format!("  | {} |\n", cells.join(" | ")));
        }

        if table.data.len() > config.max_table_rows {
            out.push_str(&format!(
                "  ...and {} more rows\n",
                table.data.len() - config.max_table_rows
            ));
        }
    }

    if !doc.key_value_pairs.is_empty() {
        out.push_str("\nKey-value pairs:\n");
        for pair in &doc.key_value_pairs {
            out.push_str(&format!(
                "  - {}: {}\n",
                truncate(&pair.key, config.max_cell_chars),
                truncate(&pair.value, config.max_cell_chars)
            ));
        }
    }

    if !doc.text_blocks.is_empty() {
        out.push_str("\nText sample:\n");
        for block in doc.text_blocks.iter().take(config.max_text_lines) {
            out.push_str(&format!(
                "  [{:?}] {}\n",
                block.block_type,
                truncate(&block.text, config.max_cell_chars * 2)
            ));
        }
        if doc.text_blocks.len() > config.max_text_lines {
            out.push_str(&format!(
                "  ...and {} more text blocks\n",
                doc.text_blocks.len() - config.max_text_lines
            ));
        }
    }

    out
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}...", truncated)
}
