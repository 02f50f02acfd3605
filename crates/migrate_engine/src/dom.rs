//! Mutable arena document built from a `scraper` parse.
//!
//! Nodes live in one `Vec` and are addressed by [`NodeId`]; parents hold ordered
//! child lists. CSS queries run through `scraper::Selector` against the parsed
//! snapshot and are mapped back into the arena, skipping nodes that have since
//! been detached. Attribute matching therefore sees attributes as parsed.

use std::collections::HashMap;

use ego_tree::iter::Edge;
use scraper::node::Node;
use scraper::{Html, Selector};

pub type NodeId = usize;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "xmp", "noembed", "noframes"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid selector {selector:?}: {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Arena-backed document. Structure, text and attributes are mutable in place.
///
/// CSS queries are evaluated against the document as parsed: they see parsed
/// elements that are still attached, with their parse-time attributes. Nodes
/// built with [`DomTree::create_element`] and later attribute edits are not
/// visible to selectors; walk them with [`DomTree::descendants`] instead.
pub struct DomTree {
    nodes: Vec<NodeData>,
    snapshot: Html,
    parsed_ids: HashMap<ego_tree::NodeId, NodeId>,
}

impl DomTree {
    pub const ROOT: NodeId = 0;

    /// Parse a full HTML document. Never fails; html5ever recovers from any markup.
    pub fn parse(html: &str) -> Self {
        let snapshot = Html::parse_document(html);
        let mut tree = Self {
            nodes: Vec::new(),
            snapshot: Html::new_document(),
            parsed_ids: HashMap::new(),
        };

        for edge in snapshot.tree.root().traverse() {
            let Edge::Open(node) = edge else {
                continue;
            };
            let kind = match node.value() {
                Node::Document | Node::Fragment => NodeKind::Document,
                Node::Element(element) => NodeKind::Element(ElementData {
                    name: element.name().to_ascii_lowercase(),
                    attrs: element
                        .attrs()
                        .map(|(key, value)| (key.to_string(), value.to_string()))
                        .collect(),
                }),
                Node::Text(text) => {
                    let text: &str = text;
                    NodeKind::Text(text.to_string())
                }
                Node::Comment(comment) => {
                    let comment: &str = comment;
                    NodeKind::Comment(comment.to_string())
                }
                _ => continue,
            };
            let parent = node
                .parent()
                .and_then(|parent| tree.parsed_ids.get(&parent.id()).copied());
            if node.parent().is_some() && parent.is_none() {
                continue;
            }
            let id = tree.push(kind);
            if let Some(parent) = parent {
                tree.append_child(parent, id);
            }
            tree.parsed_ids.insert(node.id(), id);
        }

        tree.snapshot = snapshot;
        tree
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        self.nodes.len() - 1
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.name.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|element| element.attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let NodeKind::Element(element) = &mut self.nodes[id].kind {
            let value = value.into();
            match element
                .attrs
                .iter_mut()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
            {
                Some((_, existing)) => *existing = value,
                None => element.attrs.push((name.to_string(), value)),
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let NodeKind::Element(element) = &mut self.nodes[id].kind {
            element.attrs.retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Element children only.
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .filter(|child| self.element(*child).is_some())
    }

    /// Pre-order descendants of `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next].children.iter().rev().copied());
        }
        out
    }

    pub fn is_attached(&self, id: NodeId) -> bool {
        self.is_inclusive_descendant(id, Self::ROOT)
    }

    /// True when `id` is `ancestor` or lies below it.
    pub fn is_inclusive_descendant(&self, id: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.nodes[node].parent;
        }
        false
    }

    /// All attached elements matching `css`, in document order.
    ///
    /// Matching uses parse-time names and attributes; see [`DomTree`].
    pub fn select(&self, css: &str) -> Result<Vec<NodeId>, SelectorError> {
        let selector = Selector::parse(css).map_err(|err| SelectorError {
            selector: css.to_string(),
            message: err.to_string(),
        })?;
        // Arena ids were assigned in traversal order, so sorting restores document order.
        let mut matches: Vec<NodeId> = self
            .snapshot
            .select(&selector)
            .filter_map(|element| self.parsed_ids.get(&element.id()).copied())
            .filter(|id| self.is_attached(*id))
            .collect();
        matches.sort_unstable();
        Ok(matches)
    }

    /// Like [`DomTree::select`] but only strict descendants of `scope`.
    pub fn select_within(&self, scope: NodeId, css: &str) -> Result<Vec<NodeId>, SelectorError> {
        Ok(self
            .select(css)?
            .into_iter()
            .filter(|id| *id != scope && self.is_inclusive_descendant(*id, scope))
            .collect())
    }

    /// First attached `<body>`, else the root element, else the document.
    pub fn body(&self) -> NodeId {
        let body = self
            .descendants(Self::ROOT)
            .into_iter()
            .find(|id| self.name(*id) == Some("body"));
        body.or_else(|| self.child_elements(Self::ROOT).next())
            .unwrap_or(Self::ROOT)
    }

    /// Concatenated text of every descendant text node.
    pub fn text(&self, id: NodeId) -> String {
        if let NodeKind::Text(text) = &self.nodes[id].kind {
            return text.clone();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|node| match &self.nodes[node].kind {
                NodeKind::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    /// Unlink `id` from its parent. The subtree stays in the arena but is no longer reachable.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].children.retain(|child| *child != id);
        }
    }

    /// Put `replacement` where `id` was and detach `id`.
    pub fn replace_with(&mut self, id: NodeId, replacement: NodeId) {
        let Some(parent) = self.nodes[id].parent else {
            return;
        };
        self.detach(replacement);
        if let Some(slot) = self.nodes[parent].children.iter().position(|c| *c == id) {
            self.nodes[parent].children[slot] = replacement;
            self.nodes[replacement].parent = Some(parent);
            self.nodes[id].parent = None;
        }
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        for child in &self.nodes[id].children {
            self.serialize(*child, &mut out);
        }
        out
    }

    pub fn outer_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.serialize(id, &mut out);
        out
    }

    fn serialize(&self, id: NodeId, out: &mut String) {
        let raw_text = self
            .parent(id)
            .and_then(|parent| self.name(parent))
            .is_some_and(|name| RAW_TEXT_ELEMENTS.contains(&name));
        match &self.nodes[id].kind {
            NodeKind::Document => {
                for child in &self.nodes[id].children {
                    self.serialize(*child, out);
                }
            }
            NodeKind::Text(text) if raw_text => out.push_str(text),
            NodeKind::Text(text) => escape_into(text, false, out),
            NodeKind::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            NodeKind::Element(element) => {
                out.push('<');
                out.push_str(&element.name);
                for (key, value) in &element.attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    escape_into(value, true, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&element.name.as_str()) {
                    return;
                }
                for child in &self.nodes[id].children {
                    self.serialize(*child, out);
                }
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
        }
    }
}

/// Escape text for HTML output, same rules as the html5ever serializer.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(text, false, &mut out);
    out
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if attribute => out.push_str("&quot;"),
            '<' if !attribute => out.push_str("&lt;"),
            '>' if !attribute => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
}
