//! Email normalizer
//!
//! Parses RFC822/MIME messages: addressing headers become key-value pairs,
//! the body (HTML preferred over plain text) becomes text blocks and the
//! flattened full text, and attachment metadata is surfaced as key-value
//! pairs. Both supported extensions (`.eml`, `.msg`) route here; payloads
//! that are not MIME text fail as unparsable.

use crate::error::NormalizationError;
use crate::html;
use tabula_domain::{BlockType, DocumentModel, KeyValuePair, TextBlock};
use tracing::debug;

/// Addressing headers surfaced as key-value pairs, in this order
const ADDRESS_HEADERS: &[&str] = &["From", "To", "Cc", "Bcc", "Subject", "Date"];

pub(crate) fn normalize(raw: &[u8]) -> Result<DocumentModel, NormalizationError> {
    let content = String::from_utf8_lossy(raw);
    let message = Message::parse(&content)?;

    let mut key_value_pairs = Vec::new();
    for name in ADDRESS_HEADERS {
        if let Some(value) = message.header(name) {
            key_value_pairs.push(KeyValuePair {
                key: (*name).to_string(),
                value,
                confidence: None,
                page: 1,
            });
        }
    }

    let (body_text, attachments) = message.body_and_attachments();
    for attachment in &attachments {
        key_value_pairs.push(KeyValuePair {
            key: "Attachment".to_string(),
            value: attachment.clone(),
            confidence: None,
            page: 1,
        });
    }

    let text_blocks: Vec<TextBlock> = body_text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| TextBlock {
            text: html::collapse_whitespace(p),
            block_type: BlockType::Paragraph,
            page: 1,
            bounding_box: None,
        })
        .collect();

    let subject = message.header("Subject").unwrap_or_default();
    let full_text = html::collapse_whitespace(&format!("{} {}", subject, body_text));

    debug!(
        "Email normalized: {} headers, {} paragraphs, {} attachments",
        key_value_pairs.len(),
        text_blocks.len(),
        attachments.len()
    );

    Ok(DocumentModel {
        tables: Vec::new(),
        key_value_pairs,
        text_blocks,
        dom_tree: None,
        full_text,
    })
}

/// A parsed message or message part
struct Message {
    headers: Vec<(String, String)>,
    body: String,
}

impl Message {
    fn parse(content: &str) -> Result<Self, NormalizationError> {
        let message = Self::parse_part(content);
        if message.headers.is_empty() {
            return Err(NormalizationError::Unparsable {
                kind: "email",
                reason: "no RFC822 headers found".to_string(),
            });
        }
        Ok(message)
    }

    /// Split a part into unfolded headers and body at the first blank line
    fn parse_part(content: &str) -> Self {
        let normalized = content.replace("\r\n", "\n");
        let (header_text, body) = match normalized.find("\n\n") {
            Some(split) => (
                normalized[..split].to_string(),
                normalized[split + 2..].to_string(),
            ),
            None => (normalized, String::new()),
        };

        let mut headers: Vec<(String, String)> = Vec::new();
        for line in header_text.lines() {
            if line.starts_with(' ') || line.starts_with('\t') {
                // Folded continuation of the previous header
                if let Some((_, value)) = headers.last_mut() {
                    value.push(' ');
                    value.push_str(line.trim());
                }
                continue;
            }
            if let Some((name, value)) = line.split_once(':') {
                if !name.is_empty() && !name.contains(' ') {
                    headers.push((name.trim().to_string(), value.trim().to_string()));
                }
            }
        }

        Self { headers, body }
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    fn content_type(&self) -> String {
        self.header("Content-Type")
            .unwrap_or_else(|| "text/plain".to_string())
            .to_ascii_lowercase()
    }

    fn header_param(&self, header: &str, param: &str) -> Option<String> {
        let value = self.header(header)?;
        let needle = format!("{}=", param);
        let start = value
            .to_ascii_lowercase()
            .find(&needle.to_ascii_lowercase())?;
        let rest = &value[start + needle.len()..];
        let rest = rest.trim_start();
        let param_value = if let Some(stripped) = rest.strip_prefix('"') {
            stripped.split('"').next().unwrap_or_default()
        } else {
            rest.split(&[';', ' '][..]).next().unwrap_or_default()
        };
        Some(param_value.to_string())
    }

    /// Resolve the message body (HTML preferred) and attachment metadata
    fn body_and_attachments(&self) -> (String, Vec<String>) {
        let content_type = self.content_type();

        if !content_type.starts_with("multipart/") {
            return (self.decoded_body(), Vec::new());
        }

        let boundary = match self.header_param("Content-Type", "boundary") {
            Some(b) if !b.is_empty() => b,
            _ => return (self.decoded_body(), Vec::new()),
        };

        let mut html_body: Option<String> = None;
        let mut plain_body: Option<String> = None;
        let mut attachments = Vec::new();

        for part_text in split_multipart(&self.body, &boundary) {
            let part = Self::parse_part(&part_text);
            let part_type = part.content_type();

            if let Some(filename) = part
                .header_param("Content-Disposition", "filename")
                .or_else(|| part.header_param("Content-Type", "name"))
            {
                let mime = part_type.split(';').next().unwrap_or("").trim();
                attachments.push(format!(
                    "{} ({}, {} bytes)",
                    filename,
                    mime,
                    part.body.trim().len()
                ));
                continue;
            }

            if part_type.starts_with("multipart/") {
                // Nested alternative/related container
                let (nested_body, nested_attachments) = part.body_and_attachments();
                if html_body.is_none() && plain_body.is_none() {
                    plain_body = Some(nested_body);
                }
                attachments.extend(nested_attachments);
            } else if part_type.starts_with("text/html") && html_body.is_none() {
                html_body = Some(part.decoded_body());
            } else if part_type.starts_with("text/plain") && plain_body.is_none() {
                plain_body = Some(part.decoded_body());
            }
        }

        let body = html_body.or(plain_body).unwrap_or_default();
        (body, attachments)
    }

    /// Body with Content-Transfer-Encoding undone, markup stripped for HTML
    fn decoded_body(&self) -> String {
        let encoding = self
            .header("Content-Transfer-Encoding")
            .unwrap_or_default()
            .to_ascii_lowercase();

        let decoded = match encoding.trim() {
            "quoted-printable" => decode_quoted_printable(&self.body),
            "base64" => decode_base64(&self.body).unwrap_or_else(|| self.body.clone()),
            _ => self.body.clone(),
        };

        if self.content_type().starts_with("text/html") {
            html::strip_tags(&decoded)
        } else {
            decoded
        }
    }
}

/// Split a multipart body into its parts, dropping preamble and epilogue
fn split_multipart(body: &str, boundary: &str) -> Vec<String> {
    let delimiter = format!("--{}", boundary);
    let mut parts = Vec::new();

    for segment in body.split(&delimiter).skip(1) {
        if segment.starts_with("--") {
            break; // closing delimiter
        }
        let part = segment.trim_start_matches('\n').to_string();
        if !part.trim().is_empty() {
            parts.push(part);
        }
    }

    parts
}

fn decode_quoted_printable(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut lines = body.lines().peekable();

    while let Some(line) = lines.next() {
        let (line, soft_break) = match line.strip_suffix('=') {
            Some(stripped) => (stripped, true),
            None => (line, false),
        };

        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '=' {
                let hex: String = chars.by_ref().take(2).collect();
                if let Ok(byte) = u8::from_str_radix(&hex, 16) {
                    out.push(byte as char);
                } else {
                    out.push('=');
                    out.push_str(&hex);
                }
            } else {
                out.push(c);
            }
        }

        if !soft_break && lines.peek().is_some() {
            out.push('\n');
        }
    }

    out
}

/// Minimal base64 decoder for text bodies; non-UTF-8 output is rejected
fn decode_base64(body: &str) -> Option<String> {
    const ALPHABET: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

    let mut bits: u32 = 0;
    let mut bit_count = 0;
    let mut bytes = Vec::with_capacity(body.len() * 3 / 4);

    for c in body.bytes() {
        if c.is_ascii_whitespace() || c == b'=' {
            continue;
        }
        let value = ALPHABET.iter().position(|&a| a == c)? as u32;
        bits = (bits << 6) | value;
        bit_count += 6;
        if bit_count >= 8 {
            bit_count -= 8;
            bytes.push((bits >> bit_count) as u8);
        }
    }

    String::from_utf8(bytes).ok()
}
