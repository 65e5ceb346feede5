//! Immutable arena representation of a parsed HTML page.
//!
//! Pages are parsed with `scraper` (html5ever) and copied into a flat arena of
//! [`Node`]s linked by [`NodeId`] indices. Nothing here mutates a document after
//! construction: the normalizers in [`normalize`] build new documents instead,
//! so one parsed page can back any number of path computations.

pub mod normalize;

use scraper::Html;
use std::collections::HashMap;

pub use normalize::{keep_anchor_paths, strip_boilerplate};

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// The synthetic document root. Never part of a trace.
    Root,
    Element {
        name: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// An empty document holding only the synthetic root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Root,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Parse raw HTML. Comments, doctypes and processing instructions are dropped.
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut doc = Document::new();
        let tree_root = parsed.tree.root();
        let mut ids = HashMap::new();
        ids.insert(tree_root.id(), doc.root());

        // pre-order, so a kept parent is always mapped before its children
        for node in tree_root.descendants().skip(1) {
            let Some(parent) = node.parent().and_then(|p| ids.get(&p.id()).copied()) else {
                continue;
            };
            let kind = match node.value() {
                scraper::Node::Element(el) => NodeKind::Element {
                    name: el.name().to_ascii_lowercase(),
                    attrs: el
                        .attrs()
                        .map(|(k, v)| (k.to_string(), v.to_string()))
                        .collect(),
                },
                scraper::Node::Text(text) => {
                    let text: &str = text;
                    NodeKind::Text(text.to_string())
                }
                _ => continue,
            };
            let id = doc.push(kind, parent);
            ids.insert(node.id(), id);
        }
        doc
    }

    /// Append a node under `parent` and return its id.
    pub fn push(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn is_root(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Root)
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Tag name of an element node; `None` for the root and text.
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    pub fn attrs(&self, id: NodeId) -> &[(String, String)] {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => attrs,
            _ => &[],
        }
    }

    /// Direct element children of `id` named `name`, in document order.
    pub fn child_elements<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(id)
            .iter()
            .copied()
            .filter(move |c| self.tag_name(*c) == Some(name))
    }

    /// All nodes below `id` in pre-order (document order), excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// First element named `name` in document order.
    pub fn find_first(&self, name: &str) -> Option<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .find(|id| self.tag_name(*id) == Some(name))
    }

    /// All elements named `name` in document order.
    pub fn find_all(&self, name: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| self.tag_name(*id) == Some(name))
            .collect()
    }

    /// Concatenated descendant text with runs of whitespace collapsed.
    pub fn text(&self, id: NodeId) -> String {
        let mut raw = String::new();
        if let NodeKind::Text(t) = &self.nodes[id.0].kind {
            raw.push_str(t);
        }
        for d in self.descendants(id) {
            if let NodeKind::Text(t) = &self.nodes[d.0].kind {
                raw.push_str(t);
                raw.push(' ');
            }
        }
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
