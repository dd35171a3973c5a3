//! Tag remapping from extractor vocabulary to HTML
//!
//! The mapping is a static table. Every node below the root is looked up once
//! per pass, and a second pass over remapped output yields the same tree.

use crate::tree::{Content, DocumentTree, Node};

/// Attribute set on nodes whose mapping carries a classification
pub const CLASS_ATTR: &str = "class";

/// What a source tag turns into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMapping {
    Rename(&'static str),
    Classified {
        tag: &'static str,
        class: &'static str,
    },
}

impl TagMapping {
    pub fn tag(&self) -> &'static str {
        match *self {
            TagMapping::Rename(tag) => tag,
            TagMapping::Classified { tag, .. } => tag,
        }
    }

    pub fn class(&self) -> Option<&'static str> {
        match *self {
            TagMapping::Rename(_) => None,
            TagMapping::Classified { class, .. } => Some(class),
        }
    }

    fn apply(&self, node: &mut Node) {
        if let Some(class) = self.class() {
            node.set_attr(CLASS_ATTR, class);
        }
        node.name = self.tag().to_string();
    }
}

pub const TAG_MAP: &[(&str, TagMapping)] = &[
    ("head", TagMapping::Rename("h4")),
    ("quote", TagMapping::Rename("blockquote")),
    (
        "table",
        TagMapping::Classified {
            tag: "table",
            class: "trafilatura",
        },
    ),
    ("row", TagMapping::Rename("tr")),
    ("cell", TagMapping::Rename("td")),
    (
        "list",
        TagMapping::Classified {
            tag: "ul",
            class: "trafilatura",
        },
    ),
    ("item", TagMapping::Rename("li")),
    (
        "comments",
        TagMapping::Classified {
            tag: "section",
            class: "comments",
        },
    ),
    (
        "main",
        TagMapping::Classified {
            tag: "div",
            class: "trafilatura-content",
        },
    ),
];

/// Mapping for a source tag name, if it has one
pub fn lookup(name: &str) -> Option<TagMapping> {
    TAG_MAP
        .iter()
        .find(|(source, _)| *source == name)
        .map(|(_, mapping)| *mapping)
}

/// Rename every mapped node below the root, depth-first pre-order.
/// The root keeps its name and document attributes.
pub fn remap(mut tree: DocumentTree) -> DocumentTree {
    let mut stack: Vec<&mut Node> = Vec::new();
    push_element_children(tree.root_mut(), &mut stack);

    while let Some(node) = stack.pop() {
        if let Some(mapping) = lookup(&node.name) {
            mapping.apply(node);
        }
        push_element_children(node, &mut stack);
    }

    tree
}

/// Remap and render as markup
pub fn remap_to_html(tree: DocumentTree) -> String {
    remap(tree).to_markup()
}

// Children are pushed in reverse so they pop in document order
fn push_element_children<'a>(node: &'a mut Node, stack: &mut Vec<&'a mut Node>) {
    for child in node.children.iter_mut().rev() {
        if let Content::Element(inner) = child {
            stack.push(inner);
        }
    }
}
