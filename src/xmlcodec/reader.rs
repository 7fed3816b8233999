//! Parses a `MasterDataSet` document into a tag-indexed, owned element
//! cache, and projects cached elements into coerced-scalar records.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::schema::SchemaEntry;
use crate::value::{coerce, Value};

/// One parsed XML element, detached from the original document so the
/// cache can outlive the parse buffer.
#[derive(Debug, Clone, Default)]
pub struct XmlElement {
    pub tag: String,
    pub text: Option<String>,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    /// Render this element's record as `{child tag -> coerced scalar}`,
    /// matching the upstream convention of skipping the outer row tag
    /// itself and coercing every leaf child's text.
    pub fn to_record(&self) -> HashMap<String, Value> {
        self.children
            .iter()
            .map(|child| (child.tag.clone(), coerce(child.text.as_deref())))
            .collect()
    }
}

/// A parsed document plus its tag-indexed cache of top-level row elements.
pub struct XmlDataSet {
    cache: HashMap<String, Vec<XmlElement>>,
}

impl XmlDataSet {
    /// Parse `path`, stripping namespace prefixes (so cache keys are bare
    /// local names like `t_object`), and build the tag-indexed cache over
    /// the root's direct children.
    pub fn parse(path: &Path) -> Result<Self> {
        let bytes = fs::read(path)?;
        let text = strip_bom(&bytes);
        let doc = roxmltree::Document::parse(&text)?;
        let root = doc.root_element();

        let mut cache: HashMap<String, Vec<XmlElement>> = HashMap::new();
        for child in root.children().filter(|n| n.is_element()) {
            let element = to_owned_element(child);
            cache.entry(element.tag.clone()).or_default().push(element);
        }
        Ok(XmlDataSet { cache })
    }

    /// All cached elements for a schema entry's table tag, in document
    /// order.
    pub fn iter_all(&self, entry: SchemaEntry) -> &[XmlElement] {
        self.cache
            .get(entry.descriptor().table)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The element at 1-based position `id` within the cached group, the
    /// convention the original `label`-keyed lookup uses.
    pub fn by_one_based_id(&self, entry: SchemaEntry, id: usize) -> Option<&XmlElement> {
        if id == 0 {
            return None;
        }
        self.iter_all(entry).get(id - 1)
    }

    /// Project every cached element for `entry` into a coerced-scalar
    /// record map.
    pub fn get_records(&self, entry: SchemaEntry) -> Vec<HashMap<String, Value>> {
        self.iter_all(entry).iter().map(XmlElement::to_record).collect()
    }

    /// Every distinct top-level tag present in the document, used to drive
    /// `from_xml` import table-by-table.
    pub fn table_tags(&self) -> impl Iterator<Item = &str> {
        self.cache.keys().map(|s| s.as_str())
    }
}

fn to_owned_element(node: roxmltree::Node<'_, '_>) -> XmlElement {
    let children: Vec<XmlElement> = node
        .children()
        .filter(|n| n.is_element())
        .map(to_owned_element)
        .collect();
    let text = if children.is_empty() {
        node.text().map(|s| s.to_string())
    } else {
        None
    };
    XmlElement {
        tag: node.tag_name().name().to_string(),
        text,
        children,
    }
}

fn strip_bom(bytes: &[u8]) -> String {
    let stripped = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    String::from_utf8_lossy(stripped).into_owned()
}
