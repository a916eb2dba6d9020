//! HTML normalizer
//!
//! Strips script/style, builds a lightweight DOM tree, derives headings,
//! paragraphs, list items, and tables as auxiliary structure, and produces
//! a flattened whitespace-collapsed full-text string.

use crate::error::NormalizationError;
use regex::Regex;
use std::sync::LazyLock;
use tabula_domain::{BlockType, DocumentModel, DomNode, KeyValuePair, Table, TextBlock};
use tracing::debug;

// Pre-compiled regexes shared across normalization calls
static SCRIPT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").unwrap());

static STYLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").unwrap());

static COMMENT_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static HEADING_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h[1-6][^>]*>(.*?)</h[1-6]>").unwrap());

static PARAGRAPH_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").unwrap());

static LIST_ITEM_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<li[^>]*>(.*?)</li>").unwrap());

static TABLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<table[^>]*>(.*?)</table>").unwrap());

static ROW_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").unwrap());

static CELL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<t[dh][^>]*>(.*?)</t[dh]>").unwrap());

static META_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<meta\s+name="([^"]*)"[^>]*content="([^"]*)"[^>]*/?>"#).unwrap()
});

static TITLE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());

static ATTR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([a-zA-Z][a-zA-Z0-9_:-]*)\s*=\s*"([^"]*)""#).unwrap());

/// Elements with no closing tag
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub(crate) fn normalize(raw: &[u8]) -> Result<DocumentModel, NormalizationError> {
    let content = crate::decode_text(raw, "html")?;
    let sanitized = sanitize(&content);

    let tables = extract_tables(&sanitized);
    let key_value_pairs = extract_meta_pairs(&sanitized);
    let text_blocks = extract_text_blocks(&sanitized);
    let full_text = collapse_whitespace(&strip_tags(&sanitized));

    if tables.is_empty() && text_blocks.is_empty() && full_text.is_empty() {
        return Err(NormalizationError::Unparsable {
            kind: "html",
            reason: "no extractable content".to_string(),
        });
    }

    let dom_tree = build_dom(&sanitized);
    debug!(
        "HTML normalized: {} tables, {} blocks, dom nodes {}",
        tables.len(),
        text_blocks.len(),
        dom_tree.as_ref().map(DomNode::len).unwrap_or(0)
    );

    Ok(DocumentModel {
        tables,
        key_value_pairs,
        text_blocks,
        dom_tree,
        full_text,
    })
}

/// Remove script, style, and comment regions
fn sanitize(content: &str) -> String {
    let no_script = SCRIPT_REGEX.replace_all(content, " ");
    let no_style = STYLE_REGEX.replace_all(&no_script, " ");
    COMMENT_REGEX.replace_all(&no_style, " ").into_owned()
}

/// Headings, paragraphs, and list items in document order
fn extract_text_blocks(html: &str) -> Vec<TextBlock> {
    let mut positioned: Vec<(usize, TextBlock)> = Vec::new();

    let mut push = |m_start: usize, text: String, block_type: BlockType| {
        let text = collapse_whitespace(&text);
        if !text.is_empty() {
            positioned.push((
                m_start,
                TextBlock {
                    text,
                    block_type,
                    page: 1,
                    bounding_box: None,
                },
            ));
        }
    };

    for cap in HEADING_REGEX.captures_iter(html) {
        let whole = cap.get(0).map(|m| m.start()).unwrap_or(0);
        push(whole, strip_tags(&cap[1]), BlockType::Heading);
    }
    for cap in PARAGRAPH_REGEX.captures_iter(html) {
        let whole = cap.get(0).map(|m| m.start()).unwrap_or(0);
        push(whole, strip_tags(&cap[1]), BlockType::Paragraph);
    }
    for cap in LIST_ITEM_REGEX.captures_iter(html) {
        let whole = cap.get(0).map(|m| m.start()).unwrap_or(0);
        push(whole, strip_tags(&cap[1]), BlockType::ListItem);
    }

    positioned.sort_by_key(|(start, _)| *start);
    positioned.into_iter().map(|(_, block)| block).collect()
}

/// All `<table>` elements, cell text stripped of markup
fn extract_tables(html: &str) -> Vec<Table> {
    let mut tables = Vec::new();

    for table_cap in TABLE_REGEX.captures_iter(html) {
        let body = &table_cap[1];
        let mut data = Vec::new();

        for row_cap in ROW_REGEX.captures_iter(body) {
            let row: Vec<String> = CELL_REGEX
                .captures_iter(&row_cap[1])
                .map(|cell| collapse_whitespace(&strip_tags(&cell[1])))
                .collect();
            if !row.is_empty() {
                data.push(row);
            }
        }

        if !data.is_empty() {
            tables.push(Table::from_data(1, data));
        }
    }

    tables
}

/// `<meta name content>` tags and the document title as key-value pairs
fn extract_meta_pairs(html: &str) -> Vec<KeyValuePair> {
    let mut pairs = Vec::new();

    if let Some(cap) = TITLE_REGEX.captures(html) {
        let title = collapse_whitespace(&strip_tags(&cap[1]));
        if !title.is_empty() {
            pairs.push(KeyValuePair {
                key: "title".to_string(),
                value: title,
                confidence: None,
                page: 1,
            });
        }
    }

    for cap in META_REGEX.captures_iter(html) {
        let key = cap[1].trim().to_string();
        let value = decode_entities(cap[2].trim());
        if !key.is_empty() && !value.is_empty() {
            pairs.push(KeyValuePair {
                key,
                value,
                confidence: None,
                page: 1,
            });
        }
    }

    pairs
}

/// Remove all markup and decode common entities
pub(crate) fn strip_tags(html: &str) -> String {
    decode_entities(&TAG_REGEX.replace_all(html, " "))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build a lightweight element tree with a single forward scan
///
/// Malformed nesting is tolerated: a close tag pops intervening elements,
/// and anything left open at end-of-input is folded into its parent.
fn build_dom(html: &str) -> Option<DomNode> {
    let mut stack: Vec<DomNode> = vec![DomNode::new("document")];
    let mut rest = html;

    while let Some(lt) = rest.find('<') {
        let text = &rest[..lt];
        if !text.trim().is_empty() {
            let node = stack.last_mut()?;
            if !node.text.is_empty() {
                node.text.push(' ');
            }
            node.text.push_str(&collapse_whitespace(&decode_entities(text)));
        }

        let after = &rest[lt + 1..];
        let gt = match after.find('>') {
            Some(i) => i,
            None => break,
        };
        let tag_body = &after[..gt];
        rest = &after[gt + 1..];

        if tag_body.starts_with('!') || tag_body.starts_with('?') {
            continue;
        }

        if let Some(name) = tag_body.strip_prefix('/') {
            let name = name.trim().to_ascii_lowercase();
            close_element(&mut stack, &name);
            continue;
        }

        let name: String = tag_body
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }

        let mut node = DomNode::new(name.clone());
        for attr in ATTR_REGEX.captures_iter(tag_body) {
            node.attributes
                .push((attr[1].to_ascii_lowercase(), decode_entities(&attr[2])));
        }

        if tag_body.ends_with('/') || VOID_TAGS.contains(&name.as_str()) {
            stack.last_mut()?.children.push(node);
        } else {
            stack.push(node);
        }
    }

    // Fold anything left open into its parent
    while stack.len() > 1 {
        let node = stack.pop()?;
        stack.last_mut()?.children.push(node);
    }

    stack.pop()
}

fn close_element(stack: &mut Vec<DomNode>, name: &str) {
    if let Some(open_at) = stack.iter().rposition(|n| n.tag == name) {
        if open_at == 0 {
            return;
        }
        while stack.len() > open_at {
            let node = match stack.pop() {
                Some(n) => n,
                None => return,
            };
            match stack.last_mut() {
                Some(parent) => parent.children.push(node),
                None => return,
            }
        }
    }
    // Unmatched close tags are ignored
}
