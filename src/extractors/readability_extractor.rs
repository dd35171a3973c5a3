//! Readability-based content extractor
//!
//! Finds the main article with the readability algorithm and converts its
//! markup into the document vocabulary (`head`, `p`, `list`, `item`, `table`,
//! `row`, `cell`, `quote`, `hi`, `lb`, `code`) under a `main` node.

use std::borrow::Cow;
use std::io::Cursor;

use readability::extractor::{self, Product};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::{extract_metadata, ContentExtractor};
use crate::error::ExtractionError;
use crate::http::looks_like_markup;
use crate::tree::{Content, DocumentTree, Node, ROOT_NAME};

/// Readability needs a base URL to resolve links against
const PLACEHOLDER_URL: &str = "http://example.com";

const COMMENTS_SELECTOR: &str = "#comments, .comments, #disqus_thread";

/// Default extractor used by the command-line tool
#[derive(Debug, Clone)]
pub struct ReadabilityExtractor {
    base_url: String,
}

impl Default for ReadabilityExtractor {
    fn default() -> Self {
        Self {
            base_url: PLACEHOLDER_URL.to_string(),
        }
    }
}

impl ReadabilityExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn readability(&self, html: &str) -> Result<Product, ExtractionError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ExtractionError::Parse(format!("invalid base URL: {}", e)))?;

        let mut cursor = Cursor::new(html.as_bytes());
        extractor::extract(&mut cursor, &url).map_err(|e| {
            ExtractionError::Readability(format!("no article content found: {}", e))
        })
    }

    /// Main content converted under a `main` node, `None` when nothing is left
    fn main_content(&self, html: &str) -> Result<Option<Node>, ExtractionError> {
        let product = self.readability(html)?;

        let mut main = Node::new("main");
        let content = Html::parse_fragment(&product.content);
        convert_children(content.root_element(), &mut main, false);
        Ok(if main.is_empty() { None } else { Some(main) })
    }
}

/// Payload as text, `None` for blank input and anything that is not markup
fn markup_source(payload: &[u8]) -> Option<Cow<'_, str>> {
    looks_like_markup(payload).then(|| String::from_utf8_lossy(payload))
}

impl ContentExtractor for ReadabilityExtractor {
    fn extract_structured(
        &self,
        payload: &[u8],
    ) -> Result<Option<DocumentTree>, ExtractionError> {
        let html = match markup_source(payload) {
            Some(html) => html,
            None => return Ok(None),
        };
        let main = match self.main_content(&html)? {
            Some(main) => main,
            None => return Ok(None),
        };
        let document = Html::parse_document(&html);

        let mut root = Node::new(ROOT_NAME);
        for (key, value) in extract_metadata(&document).into_attributes() {
            root.set_attr(key, value);
        }

        root.push_child(main);

        if let Some(comments) = extract_comments(&document) {
            root.push_child(comments);
        }

        Ok(Some(DocumentTree::from_root(root)))
    }

    fn extract_text(&self, payload: &[u8]) -> Result<Option<String>, ExtractionError> {
        let html = match markup_source(payload) {
            Some(html) => html,
            None => return Ok(None),
        };

        let text = self
            .main_content(&html)?
            .map(|main| plain_text(&main))
            .unwrap_or_default();
        Ok(if text.is_empty() { None } else { Some(text) })
    }
}

/// Text of a converted node. Block boundaries become spaces so words of
/// adjacent paragraphs, headings or items never run together.
fn plain_text(node: &Node) -> String {
    let mut text = String::new();
    collect_text(node, &mut text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(node: &Node, text: &mut String) {
    for child in &node.children {
        match child {
            Content::Text(value) => text.push_str(value),
            Content::Element(element) if element.name == "hi" => collect_text(element, text),
            Content::Element(element) => {
                text.push(' ');
                collect_text(element, text);
                text.push(' ');
            }
        }
    }
}

/// How a source HTML element is carried into the tree
enum Conversion {
    Element {
        name: &'static str,
        attr: Option<(&'static str, &'static str)>,
    },
    /// Keep the children, drop the element itself
    Unwrap,
    Drop,
}

fn to_node(name: &'static str, attr: Option<(&'static str, &'static str)>) -> Conversion {
    Conversion::Element { name, attr }
}

fn conversion_for(tag: &str) -> Conversion {
    match tag {
        "h1" => to_node("head", Some(("rend", "h1"))),
        "h2" => to_node("head", Some(("rend", "h2"))),
        "h3" => to_node("head", Some(("rend", "h3"))),
        "h4" => to_node("head", Some(("rend", "h4"))),
        "h5" => to_node("head", Some(("rend", "h5"))),
        "h6" => to_node("head", Some(("rend", "h6"))),
        "p" => to_node("p", None),
        "blockquote" | "q" => to_node("quote", None),
        "ul" => to_node("list", Some(("rend", "ul"))),
        "ol" => to_node("list", Some(("rend", "ol"))),
        "dl" => to_node("list", Some(("rend", "dl"))),
        "li" | "dt" | "dd" => to_node("item", None),
        "table" => to_node("table", None),
        "tr" => to_node("row", None),
        "td" => to_node("cell", None),
        "th" => to_node("cell", Some(("role", "head"))),
        "pre" | "code" => to_node("code", None),
        "br" => to_node("lb", None),
        "b" | "strong" => to_node("hi", Some(("rend", "#b"))),
        "i" | "em" => to_node("hi", Some(("rend", "#i"))),
        "u" => to_node("hi", Some(("rend", "#u"))),
        "script" | "style" | "noscript" | "template" | "img" | "picture" | "svg" | "video"
        | "audio" | "iframe" | "form" | "input" | "button" | "select" | "textarea" | "nav"
        | "aside" | "footer" => Conversion::Drop,
        _ => Conversion::Unwrap,
    }
}

fn convert_children(element: ElementRef<'_>, parent: &mut Node, preserve: bool) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            push_text(parent, text, preserve);
        } else if let Some(child_element) = ElementRef::wrap(child) {
            convert_element(child_element, parent, preserve);
        }
    }
}

fn convert_element(element: ElementRef<'_>, parent: &mut Node, preserve: bool) {
    match conversion_for(element.value().name()) {
        Conversion::Drop => {}
        Conversion::Unwrap => convert_children(element, parent, preserve),
        Conversion::Element { name, attr } => {
            let mut node = Node::new(name);
            if let Some((key, value)) = attr {
                node.set_attr(key, value);
            }
            let preserve = preserve || name == "code";
            convert_children(element, &mut node, preserve);

            // Empty blocks carry nothing; line breaks are content by themselves
            if name == "lb" || !node.is_empty() {
                parent.push_child(node);
            }
        }
    }
}

/// Collapse whitespace runs outside code blocks
fn push_text(parent: &mut Node, text: &str, preserve: bool) {
    if preserve {
        parent.push_text(text);
        return;
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        // Keep a separating space only between inline runs
        if !text.is_empty() && follows_inline(parent) {
            parent.push_text(" ");
        }
        return;
    }

    let mut collapsed = String::new();
    if text.starts_with(char::is_whitespace) && follows_inline(parent) {
        collapsed.push(' ');
    }
    collapsed.push_str(&words.join(" "));
    if text.ends_with(char::is_whitespace) {
        collapsed.push(' ');
    }
    parent.push_text(collapsed);
}

fn follows_inline(parent: &Node) -> bool {
    match parent.children.last() {
        Some(Content::Text(text)) => !text.ends_with(' '),
        Some(Content::Element(node)) => node.name == "hi",
        None => false,
    }
}

/// Comment section of the full page, if it has one
fn extract_comments(document: &Html) -> Option<Node> {
    let selector = Selector::parse(COMMENTS_SELECTOR).ok()?;
    let element = document.select(&selector).next()?;

    let mut comments = Node::new("comments");
    convert_children(element, &mut comments, false);
    if comments.is_empty() {
        None
    } else {
        Some(comments)
    }
}
