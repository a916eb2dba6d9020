//! Document model - the canonical, extraction-facing view of a normalized document

use serde::{Deserialize, Serialize};

/// Page-relative bounding box, normalized to the 0..1 range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Distance from the top edge of the page (0..1)
    pub top: f64,
    /// Distance from the left edge of the page (0..1)
    pub left: f64,
    /// Width as a fraction of page width (0..1)
    pub width: f64,
    /// Height as a fraction of page height (0..1)
    pub height: f64,
}

impl BoundingBox {
    /// Area of the box in normalized page units
    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    /// Whether this box lies entirely inside `other`
    pub fn contained_in(&self, other: &BoundingBox) -> bool {
        self.left >= other.left
            && self.top >= other.top
            && self.left + self.width <= other.left + other.width
            && self.top + self.height <= other.top + other.height
    }

    /// Area of the intersection between two boxes
    pub fn intersection_area(&self, other: &BoundingBox) -> f64 {
        let x_overlap = (self.left + self.width).min(other.left + other.width)
            - self.left.max(other.left);
        let y_overlap =
            (self.top + self.height).min(other.top + other.height) - self.top.max(other.top);
        if x_overlap <= 0.0 || y_overlap <= 0.0 {
            return 0.0;
        }
        x_overlap * y_overlap
    }

    /// Fraction of this box's area covered by `other` (0..1)
    pub fn overlap_ratio(&self, other: &BoundingBox) -> f64 {
        let area = self.area();
        if area <= 0.0 {
            return 0.0;
        }
        self.intersection_area(other) / area
    }

    /// Check all four components are inside the normalized 0..1 range
    pub fn is_normalized(&self) -> bool {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        in_unit(self.top)
            && in_unit(self.left)
            && in_unit(self.width)
            && in_unit(self.height)
            && self.left + self.width <= 1.0 + f64::EPSILON
            && self.top + self.height <= 1.0 + f64::EPSILON
    }
}

/// A table reconstructed from a document page
///
/// Row 0 may be a header row; this is not guaranteed by the upstream
/// analysis schema, so consumers detect headers themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    /// 1-based page the table appears on
    pub page: u32,

    /// Number of rows, including any header row
    pub rows: usize,

    /// Number of columns
    pub columns: usize,

    /// Page-relative position, when the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,

    /// Cell text in row-major order
    pub data: Vec<Vec<String>>,
}

impl Table {
    /// Build a table from raw cell data, deriving row/column counts
    pub fn from_data(page: u32, data: Vec<Vec<String>>) -> Self {
        let rows = data.len();
        let columns = data.iter().map(Vec::len).max().unwrap_or(0);
        Self {
            page,
            rows,
            columns,
            bounding_box: None,
            data,
        }
    }

    /// True when the table holds no cells at all
    pub fn is_empty(&self) -> bool {
        self.data.iter().all(|row| row.is_empty())
    }
}

/// A key-value pair detected in the document (form field, meta tag, header)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyValuePair {
    /// The label side of the pair
    pub key: String,

    /// The value side of the pair
    pub value: String,

    /// Detection confidence from the upstream analysis, when available
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    /// 1-based page the pair appears on
    pub page: u32,
}

/// Classification of a text block within the document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockType {
    /// A single line of text
    Line,
    /// A paragraph of body text
    Paragraph,
    /// A heading or section title
    Heading,
    /// An item inside an ordered or unordered list
    ListItem,
    /// Anything the normalizer could not classify further
    Other,
}

/// A positioned run of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextBlock {
    /// The block's text content
    pub text: String,

    /// Block classification
    pub block_type: BlockType,

    /// 1-based page the block appears on
    pub page: u32,

    /// Page-relative position, when the source provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
}

/// A node in the auxiliary DOM tree built for HTML sources
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DomNode {
    /// Lowercased tag name ("div", "table", ...)
    pub tag: String,

    /// Attribute name/value pairs in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<(String, String)>,

    /// Direct text content of this element (child element text excluded)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,

    /// Child elements in source order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DomNode>,
}

impl DomNode {
    /// Create an element node with no attributes or children
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Depth-first search for the first descendant with the given tag
    pub fn find(&self, tag: &str) -> Option<&DomNode> {
        if self.tag == tag {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(tag))
    }

    /// Count of nodes in this subtree, including this node
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(DomNode::len).sum::<usize>()
    }

    /// True when this node has no children
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}

/// The canonical document representation consumed by the resolution engine
///
/// Immutable once produced from a given input: the normalizer builds it in
/// one pass and nothing downstream mutates it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentModel {
    /// Tables in document order
    #[serde(default)]
    pub tables: Vec<Table>,

    /// Key-value pairs in document order
    #[serde(default)]
    pub key_value_pairs: Vec<KeyValuePair>,

    /// Text blocks in document order
    #[serde(default)]
    pub text_blocks: Vec<TextBlock>,

    /// Auxiliary DOM tree, present for HTML sources only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dom_tree: Option<DomNode>,

    /// Flattened, whitespace-collapsed full text of the document
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub full_text: String,
}

impl DocumentModel {
    /// Full text of the document, falling back to joined text blocks when the
    /// normalizer did not produce a flattened string
    pub fn text(&self) -> String {
        if !self.full_text.is_empty() {
            return self.full_text.clone();
        }
        self.text_blocks
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Highest page number seen across tables, pairs, and blocks
    pub fn page_count(&self) -> u32 {
        let tables = self.tables.iter().map(|t| t.page).max().unwrap_or(0);
        let pairs = self.key_value_pairs.iter().map(|p| p.page).max().unwrap_or(0);
        let blocks = self.text_blocks.iter().map(|b| b.page).max().unwrap_or(0);
        tables.max(pairs).max(blocks)
    }

    /// True when the document holds no extractable structure at all
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
            && self.key_value_pairs.is_empty()
            && self.text_blocks.is_empty()
            && self.full_text.is_empty()
    }
}
