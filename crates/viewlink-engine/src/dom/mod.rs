/*!
 * # Document Model
 *
 * An arena of nodes addressed by copyable [`NodeId`] handles. Everything else in
 * the engine works against this model: anchors describe elements by value and
 * are resolved fresh against a `Document`, and visibility plans are plain sets
 * of `NodeId`s that a renderer applies.
 *
 * Nodes are never removed, so a `NodeId` handed out by a document stays valid
 * for that document's lifetime. Handles from one document must not be used
 * with another.
 */

mod kind;
pub mod markup;
pub mod text;

pub use kind::ElementKind;
pub use markup::{MarkupError, parse_document};

/// Handle to a node inside a [`Document`].
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    const fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Payload of a single node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// The synthetic document root. There is exactly one per document.
    Document,
    /// An element with a lower-cased tag name and attributes in source order.
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    /// A run of character data.
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    data: NodeData,
}

/// Arena-backed document tree.
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
    /// Create an empty document holding only the root node.
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                data: NodeData::Document,
            }],
        }
    }

    /// The synthetic document root.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// The `<body>` element, or the document root when there is none.
    pub fn body(&self) -> NodeId {
        self.descendants(self.root())
            .find(|&id| self.tag(id) == Some("body"))
            .unwrap_or_else(|| self.root())
    }

    /// Total number of nodes, including the root and text nodes.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn alloc(&mut self, parent: NodeId, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            data,
        });
        id
    }

    fn element_data(tag: &str, attrs: &[(&str, &str)]) -> NodeData {
        NodeData::Element {
            tag: tag.to_ascii_lowercase(),
            attrs: attrs
                .iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), (*value).to_string()))
                .collect(),
        }
    }

    /// Append a new element as the last child of `parent`.
    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.alloc(parent, Self::element_data(tag, attrs));
        self.nodes[parent.idx()].children.push(id);
        id
    }

    /// Append a text node as the last child of `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.alloc(parent, NodeData::Text(text.to_string()));
        self.nodes[parent.idx()].children.push(id);
        id
    }

    /// Insert a new element immediately before `reference`, as its sibling.
    ///
    /// A parentless `reference` (the root) gets the element prepended to its
    /// own children instead.
    pub fn insert_element_before(
        &mut self,
        reference: NodeId,
        tag: &str,
        attrs: &[(&str, &str)],
    ) -> NodeId {
        let Some(parent) = self.parent(reference) else {
            let id = self.alloc(reference, Self::element_data(tag, attrs));
            self.nodes[reference.idx()].children.insert(0, id);
            return id;
        };
        let id = self.alloc(parent, Self::element_data(tag, attrs));
        let siblings = &mut self.nodes[parent.idx()].children;
        let position = siblings
            .iter()
            .position(|&sibling| sibling == reference)
            .unwrap_or(siblings.len());
        siblings.insert(position, id);
        id
    }

    pub(crate) fn replace_text(&mut self, id: NodeId, text: String) {
        if let NodeData::Text(existing) = &mut self.nodes[id.idx()].data {
            *existing = text;
        }
    }

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.idx()].data
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.idx()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.idx()].children
    }

    /// Child elements of `id` in document order, skipping text nodes.
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.data(id), NodeData::Element { .. })
    }

    /// Lower-cased tag name, `None` for the root and text nodes.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match self.data(id) {
            NodeData::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match self.data(id) {
            NodeData::Element { attrs, .. } => attrs
                .iter()
                .find(|(attr_name, _)| attr_name == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    /// The element's `id` attribute, ignoring empty values.
    pub fn element_id(&self, id: NodeId) -> Option<&str> {
        self.attr(id, "id").filter(|value| !value.is_empty())
    }

    pub fn has_class(&self, id: NodeId, class: &str) -> bool {
        self.attr(id, "class")
            .is_some_and(|classes| classes.split_ascii_whitespace().any(|c| c == class))
    }

    pub fn kind(&self, id: NodeId) -> Option<ElementKind> {
        self.tag(id).map(ElementKind::from_tag)
    }

    /// Ancestors of `id`, nearest first, ending with the document root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// All nodes below `id` in document (pre-)order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: self.children(id).iter().rev().copied().collect(),
        }
    }

    /// Whether `ancestor` is a strict ancestor of `node`.
    pub fn is_ancestor_of(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|id| id == ancestor)
    }

    /// Elements with the given tag below `scope`, in document order.
    pub fn elements_by_tag(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|&id| self.tag(id).is_some_and(|t| t.eq_ignore_ascii_case(tag)))
            .collect()
    }

    /// Every element in the document carrying `id`. Duplicate ids are
    /// returned together rather than rejected.
    pub fn elements_by_id(&self, id: &str) -> Vec<NodeId> {
        self.descendants(self.root())
            .filter(|&node| self.element_id(node) == Some(id))
            .collect()
    }

    /// First element carrying `id` at or below `scope`.
    pub fn find_by_id_within(&self, scope: NodeId, id: &str) -> Option<NodeId> {
        if self.element_id(scope) == Some(id) {
            return Some(scope);
        }
        self.descendants(scope)
            .find(|&node| self.element_id(node) == Some(id))
    }

    /// Raw concatenated text of every text node below (or at) `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        if let NodeData::Text(text) = self.data(id) {
            return text.clone();
        }
        let mut out = String::new();
        for node in self.descendants(id) {
            if let NodeData::Text(text) = self.data(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Whitespace-collapsed text content, as used for anchor matching.
    pub fn normalized_text(&self, id: NodeId) -> String {
        text::normalize_text(&self.text_content(id))
    }
}

/// Iterator returned by [`Document::ancestors`].
#[derive(Debug)]
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.parent(current);
        Some(current)
    }
}

/// Iterator returned by [`Document::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(current).iter().rev().copied());
        Some(current)
    }
}
