//! Structured document tree
//!
//! The cleaned document produced by extraction: a `doc` root whose attributes
//! hold document-level metadata, with element and text children below it.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::ExtractionError;

/// Name of the document root element
pub const ROOT_NAME: &str = "doc";

/// Child of a node: nested element or a run of text
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Element(Node),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub name: String,
    attributes: Vec<(String, String)>,
    pub children: Vec<Content>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(Content::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    /// Set an attribute, replacing any existing value for the key
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn push_child(&mut self, child: Node) {
        self.children.push(Content::Element(child));
    }

    /// Append text, merging with a trailing text run
    pub fn push_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        match self.children.last_mut() {
            Some(Content::Text(existing)) => existing.push_str(&text),
            _ => self.children.push(Content::Text(text)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.children.iter().all(|child| match child {
            Content::Element(node) => node.is_empty(),
            Content::Text(text) => text.trim().is_empty(),
        })
    }

    /// Element children, skipping text
    pub fn elements(&self) -> impl Iterator<Item = &Node> {
        self.children.iter().filter_map(|child| match child {
            Content::Element(node) => Some(node),
            Content::Text(_) => None,
        })
    }

    /// Concatenated text of this node and its descendants
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Serialize as markup. Childless elements are written self-closing.
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        write_node(self, &mut out);
        out
    }
}

fn collect_text(node: &Node, out: &mut String) {
    for child in &node.children {
        match child {
            Content::Element(inner) => collect_text(inner, out),
            Content::Text(text) => out.push_str(text),
        }
    }
}

fn write_node(node: &Node, out: &mut String) {
    out.push('<');
    out.push_str(&node.name);
    for (key, value) in &node.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }

    if node.children.is_empty() {
        out.push_str(" />");
        return;
    }

    out.push('>');
    for child in &node.children {
        match child {
            Content::Element(inner) => write_node(inner, out),
            Content::Text(text) => out.push_str(&escape(text.as_str())),
        }
    }
    out.push_str("</");
    out.push_str(&node.name);
    out.push('>');
}

/// Document tree rooted at a `doc` element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentTree {
    root: Node,
}

impl DocumentTree {
    pub fn new() -> Self {
        Self {
            root: Node::new(ROOT_NAME),
        }
    }

    pub fn from_root(root: Node) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    pub fn into_root(self) -> Node {
        self.root
    }

    /// Document-level attributes carried by the root
    pub fn root_attributes(&self) -> &[(String, String)] {
        self.root.attributes()
    }

    pub fn to_markup(&self) -> String {
        self.root.to_markup()
    }

    /// Parse an XML document. The root element must be `doc`.
    pub fn parse_xml(xml: &str) -> Result<Self, ExtractionError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(false);

        let mut stack: Vec<Node> = Vec::new();
        let mut root: Option<Node> = None;

        loop {
            match reader.read_event()? {
                Event::Start(e) => {
                    if root.is_some() {
                        return Err(ExtractionError::Xml("content after root element".into()));
                    }
                    stack.push(start_node(&e)?);
                }
                Event::Empty(e) => {
                    if root.is_some() {
                        return Err(ExtractionError::Xml("content after root element".into()));
                    }
                    let node = start_node(&e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.push_child(node),
                        None => root = Some(node),
                    }
                }
                Event::End(_) => {
                    let node = stack
                        .pop()
                        .ok_or_else(|| ExtractionError::Xml("unbalanced end tag".into()))?;
                    match stack.last_mut() {
                        Some(parent) => parent.push_child(node),
                        None => root = Some(node),
                    }
                }
                Event::Text(e) => {
                    let text = e.unescape()?;
                    match stack.last_mut() {
                        Some(parent) => parent.push_text(text.into_owned()),
                        None if text.trim().is_empty() => {}
                        None => {
                            return Err(ExtractionError::Xml("text outside root element".into()))
                        }
                    }
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                    if let Some(parent) = stack.last_mut() {
                        parent.push_text(text);
                    }
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctype
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(ExtractionError::Xml("unclosed element".into()));
        }

        let root = root.ok_or_else(|| ExtractionError::Xml("document has no root".into()))?;
        if root.name != ROOT_NAME {
            return Err(ExtractionError::Xml(format!(
                "expected <{}> root, found <{}>",
                ROOT_NAME, root.name
            )));
        }

        Ok(Self { root })
    }
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

fn start_node(e: &BytesStart<'_>) -> Result<Node, ExtractionError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let mut node = Node::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ExtractionError::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value()?.into_owned();
        node.set_attr(key, value);
    }
    Ok(node)
}
