//! CSV normalizer
//!
//! Parses RFC4180-style content (quoted fields, escaped quotes, CR/LF line
//! endings) into a single table. Header detection is left to the resolution
//! engine, which treats row 0 as a header candidate.

use crate::error::NormalizationError;
use tabula_domain::{DocumentModel, Table};

pub(crate) fn normalize(raw: &[u8]) -> Result<DocumentModel, NormalizationError> {
    let content = crate::decode_text(raw, "csv")?;
    let rows = parse(&content)?;

    if rows.is_empty() {
        return Err(NormalizationError::Unparsable {
            kind: "csv",
            reason: "no rows".to_string(),
        });
    }

    Ok(DocumentModel {
        tables: vec![Table::from_data(1, rows)],
        ..Default::default()
    })
}

fn parse(content: &str) -> Result<Vec<Vec<String>>, NormalizationError> {
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' => {
                    if chars.peek() == Some(&'"') {
                        chars.next();
                        field.push('"');
                    } else {
                        in_quotes = false;
                    }
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => {
                row.push(std::mem::take(&mut field));
            }
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                end_row(&mut rows, &mut row, &mut field);
            }
            '\n' => end_row(&mut rows, &mut row, &mut field),
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(NormalizationError::Unparsable {
            kind: "csv",
            reason: "unterminated quoted field".to_string(),
        });
    }

    end_row(&mut rows, &mut row, &mut field);
    Ok(rows)
}

fn end_row(rows: &mut Vec<Vec<String>>, row: &mut Vec<String>, field: &mut String) {
    // A trailing newline produces an empty single-field row; drop it
    if row.is_empty() && field.trim().is_empty() {
        field.clear();
        return;
    }
    row.push(std::mem::take(field));
    rows.push(std::mem::take(row));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_parsing() {
        let model = normalize(b"brand,cases\nAcme,120\nZenith,75\n").unwrap();
        let table = &model.tables[0];

        assert_eq!(table.rows, 3);
        assert_eq!(table.data[0], vec!["brand", "cases"]);
        assert_eq!(table.data[2], vec!["Zenith", "75"]);
    }

    #[test]
    fn test_quoted_fields_keep_commas() {
        let model = normalize(b"name,address\n\"Acme, Inc.\",\"12 Main St\"\n").unwrap();
        assert_eq!(model.tables[0].data[1][0], "Acme, Inc.");
    }

    #[test]
    fn test_escaped_quotes() {
        let model = normalize(b"note\n\"she said \"\"hi\"\"\"\n").unwrap();
        assert_eq!(model.tables[0].data[1][0], r#"she said "hi""#);
    }

    #[test]
    fn test_crlf_line_endings() {
        let model = normalize(b"a,b\r\n1,2\r\n").unwrap();
        assert_eq!(model.tables[0].rows, 2);
    }

    #[test]
    fn test_unterminated_quote_is_unparsable() {
        let err = normalize(b"a,b\n\"open,2\n").unwrap_err();
        assert!(matches!(
            err,
            NormalizationError::Unparsable { kind: "csv", .. }
        ));
    }

    #[test]
    fn test_ragged_rows_are_preserved() {
        let model = normalize(b"a,b,c\n1,2\n").unwrap();
        let table = &model.tables[0];
        assert_eq!(table.columns, 3);
        assert_eq!(table.data[1].len(), 2);
    }
}
