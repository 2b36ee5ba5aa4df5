//! Arena-backed document tree.
//!
//! This is the native node platform the wrappers sit on. Nodes live in a
//! `generational_arena::Arena` and are linked intrusively (parent, first/last
//! child, prev/next sibling), so parent lookups, appends and detaches are O(1).
//!
//! Nodes are never freed. A detached subtree stays in the arena and can be
//! appended again later, which is what keeps wrappers and their data valid
//! across `remove()` and reattachment.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use generational_arena::{Arena, Index};
use smallvec::SmallVec;
use string_cache::DefaultAtom;

use crate::layout::LayoutConfig;

pub type NodeId = Index;

/// Shared handle to a document. Wrappers and helpers hold one of these.
pub type DocumentRef = Rc<RefCell<Document>>;

static NEXT_DOCUMENT_SERIAL: AtomicUsize = AtomicUsize::new(0);

/// Failures raised by the tree when asked to do something that a real DOM
/// would reject with an exception.
#[derive(Debug, thiserror::Error)]
pub enum DomError {
    #[error("node {0:?} does not exist in this document")]
    UnknownNode(NodeId),

    #[error("node {0:?} is not an element")]
    NotAnElement(NodeId),

    #[error("node {0:?} cannot have children")]
    NotAContainer(NodeId),

    #[error("cannot insert {child:?} into {parent:?}: {reason}")]
    HierarchyRequest {
        parent: NodeId,
        child: NodeId,
        reason: &'static str,
    },

    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },

    #[error("nodes belong to different documents")]
    CrossDocument,

    #[error("layout failed: {0}")]
    Layout(#[from] taffy::TaffyError),
}

/// Border box of a node in document coordinates, as produced by the last
/// layout pass. All zero until layout has run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug)]
pub struct Node {
    pub data: NodeData,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub layout: LayoutBox,
}

#[derive(Debug)]
pub enum NodeData {
    Root,
    Element(ElementData),
    Text(String),
}

#[derive(Debug)]
pub struct ElementData {
    pub tag_name: DefaultAtom,
    pub attributes: Vec<(DefaultAtom, String)>,
    /// Tokens of the `class` attribute, kept in sync on every write.
    pub classes: SmallVec<[DefaultAtom; 4]>,
}

impl Node {
    fn new(data: NodeData) -> Self {
        Node {
            data,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            layout: LayoutBox::default(),
        }
    }

    pub fn as_element(&self) -> Option<&ElementData> {
        match &self.data {
            NodeData::Element(data) => Some(data),
            _ => None,
        }
    }
}

impl ElementData {
    pub fn new(tag_name: &str) -> Self {
        ElementData {
            tag_name: DefaultAtom::from(tag_name.to_ascii_lowercase()),
            attributes: Vec::new(),
            classes: SmallVec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| &**k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attribute(&mut self, name: &str, value: String) {
        if name == "class" {
            self.classes = tokenize_classes(&value);
        }
        if let Some(entry) = self.attributes.iter_mut().find(|(k, _)| &**k == name) {
            entry.1 = value;
        } else {
            self.attributes.push((DefaultAtom::from(name), value));
        }
    }

    pub fn remove_attribute(&mut self, name: &str) {
        if name == "class" {
            self.classes.clear();
        }
        self.attributes.retain(|(k, _)| &**k != name);
    }

    pub fn has_class(&self, name: &str) -> bool {
        self.classes.iter().any(|c| &**c == name)
    }
}

fn tokenize_classes(value: &str) -> SmallVec<[DefaultAtom; 4]> {
    let mut classes: SmallVec<[DefaultAtom; 4]> = SmallVec::new();
    for token in value.split_ascii_whitespace() {
        let atom = DefaultAtom::from(token);
        if !classes.contains(&atom) {
            classes.push(atom);
        }
    }
    classes
}

#[derive(Debug)]
pub struct Document {
    pub nodes: Arena<Node>,
    pub root_id: NodeId,
    serial: usize,
    layout_config: LayoutConfig,
    /// Set by every mutation that can move or resize a connected node.
    layout_dirty: bool,
}

impl Default for Document {
    fn default() -> Self {
        let mut nodes = Arena::new();
        let root_id = nodes.insert(Node::new(NodeData::Root));
        Document {
            nodes,
            root_id,
            serial: NEXT_DOCUMENT_SERIAL.fetch_add(1, Ordering::Relaxed),
            layout_config: LayoutConfig::default(),
            layout_dirty: true,
        }
    }
}

impl Document {
    /// An empty document holding only the root node.
    pub fn new() -> Self {
        Self::default()
    }

    /// A document with the `html > head + body` skeleton a browser starts with.
    pub fn blank() -> Self {
        let mut doc = Self::default();
        let html = doc.create_element("html");
        let head = doc.create_element("head");
        let body = doc.create_element("body");
        doc.link_last(doc.root_id, html);
        doc.link_last(html, head);
        doc.link_last(html, body);
        doc
    }

    pub fn into_ref(self) -> DocumentRef {
        Rc::new(RefCell::new(self))
    }

    /// Process-unique number identifying this document.
    pub fn serial(&self) -> usize {
        self.serial
    }

    /// Viewport and text metrics used when geometry is recomputed on read.
    pub fn layout_config(&self) -> &LayoutConfig {
        &self.layout_config
    }

    pub fn set_layout_config(&mut self, config: LayoutConfig) {
        if self.layout_config != config {
            self.layout_config = config;
            self.layout_dirty = true;
        }
    }

    /// Whether the stored layout boxes predate the latest mutation.
    pub fn needs_layout(&self) -> bool {
        self.layout_dirty
    }

    pub fn invalidate_layout(&mut self) {
        self.layout_dirty = true;
    }

    pub(crate) fn mark_laid_out(&mut self, config: LayoutConfig) {
        self.layout_config = config;
        self.layout_dirty = false;
    }

    pub fn add_node(&mut self, data: NodeData) -> NodeId {
        self.nodes.insert(Node::new(data))
    }

    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.add_node(NodeData::Element(ElementData::new(tag_name)))
    }

    pub fn create_text_node(&mut self, text: &str) -> NodeId {
        self.add_node(NodeData::Text(text.to_string()))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(id)
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(id).ok_or(DomError::UnknownNode(id))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        self.nodes.get(id).and_then(Node::as_element)
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match self.nodes.get_mut(id) {
            Some(Node { data: NodeData::Element(data), .. }) => Ok(data),
            Some(_) => Err(DomError::NotAnElement(id)),
            None => Err(DomError::UnknownNode(id)),
        }
    }

    #[inline]
    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    #[inline]
    pub fn first_child_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.first_child)
    }

    #[inline]
    pub fn last_child_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.last_child)
    }

    #[inline]
    pub fn next_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.next_sibling)
    }

    #[inline]
    pub fn prev_sibling_of(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.prev_sibling)
    }

    /// Direct children in document order, text nodes included.
    pub fn child_nodes(&self, id: NodeId) -> Vec<NodeId> {
        let mut children = Vec::new();
        let mut child = self.first_child_of(id);
        while let Some(c) = child {
            children.push(c);
            child = self.next_sibling_of(c);
        }
        children
    }

    /// Pre-order walk of everything below `scope`, excluding `scope` itself.
    pub fn descendants(&self, scope: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            scope,
            next: self.first_child_of(scope),
        }
    }

    pub fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent_of(id);
        }
        false
    }

    /// Whether `id` is reachable from the document root.
    pub fn is_connected(&self, id: NodeId) -> bool {
        self.is_inclusive_ancestor(self.root_id, id)
    }

    /// Appends `child` as the last child of `parent`, moving it out of its
    /// current parent first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if matches!(self.node(parent)?.data, NodeData::Text(_)) {
            return Err(DomError::NotAContainer(parent));
        }
        if matches!(self.node(child)?.data, NodeData::Root) {
            return Err(DomError::HierarchyRequest {
                parent,
                child,
                reason: "the document root cannot be inserted",
            });
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(DomError::HierarchyRequest {
                parent,
                child,
                reason: "the new child is an ancestor of the parent",
            });
        }

        self.detach(child);
        self.link_last(parent, child);
        self.layout_dirty = true;
        Ok(())
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        if self.parent_of(child) != Some(parent) {
            return Err(DomError::NotAChild { parent, child });
        }
        self.detach(child);
        Ok(())
    }

    /// Unlinks `id` from its parent and siblings. The node and its subtree
    /// stay in the arena.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.parent_of(id) else {
            return;
        };
        let prev = self.prev_sibling_of(id);
        let next = self.next_sibling_of(id);
        self.layout_dirty = true;

        match prev {
            Some(p) => {
                if let Some(node) = self.nodes.get_mut(p) {
                    node.next_sibling = next;
                }
            }
            None => {
                if let Some(node) = self.nodes.get_mut(parent) {
                    node.first_child = next;
                }
            }
        }
        match next {
            Some(n) => {
                if let Some(node) = self.nodes.get_mut(n) {
                    node.prev_sibling = prev;
                }
            }
            None => {
                if let Some(node) = self.nodes.get_mut(parent) {
                    node.last_child = prev;
                }
            }
        }
        if let Some(node) = self.nodes.get_mut(id) {
            node.parent = None;
            node.prev_sibling = None;
            node.next_sibling = None;
        }
    }

    fn link_last(&mut self, parent: NodeId, child: NodeId) {
        let old_last = self.last_child_of(parent);
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
            node.prev_sibling = old_last;
            node.next_sibling = None;
        }
        if let Some(last) = old_last {
            if let Some(node) = self.nodes.get_mut(last) {
                node.next_sibling = Some(child);
            }
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            if node.first_child.is_none() {
                node.first_child = Some(child);
            }
            node.last_child = Some(child);
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| &*e.tag_name)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.nodes.get(id).map(|n| &n.data) {
            Some(NodeData::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attribute(name))
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: String) -> Result<(), DomError> {
        self.element_mut(id)?.set_attribute(name, value);
        self.layout_dirty = true;
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<(), DomError> {
        self.element_mut(id)?.remove_attribute(name);
        self.layout_dirty = true;
        Ok(())
    }

    /// Raw `class` attribute, empty when unset.
    pub fn class_name(&self, id: NodeId) -> &str {
        self.attribute(id, "class").unwrap_or("")
    }

    pub fn set_class_name(&mut self, id: NodeId, value: String) -> Result<(), DomError> {
        self.set_attribute(id, "class", value)
    }

    /// Descendants of `scope` carrying every class in the space-separated
    /// `names`, in tree order.
    pub fn elements_by_class_name(&self, scope: NodeId, names: &str) -> Vec<NodeId> {
        let wanted: SmallVec<[&str; 4]> = names.split_ascii_whitespace().collect();
        if wanted.is_empty() {
            return Vec::new();
        }
        self.descendants(scope)
            .filter(|&id| {
                self.element(id)
                    .is_some_and(|e| wanted.iter().all(|w| e.has_class(w)))
            })
            .collect()
    }

    /// Descendants of `scope` with the given tag, in tree order. `*` matches
    /// every element.
    pub fn elements_by_tag_name(&self, scope: NodeId, tag_name: &str) -> Vec<NodeId> {
        self.descendants(scope)
            .filter(|&id| {
                self.element(id).is_some_and(|e| {
                    tag_name == "*" || (*e.tag_name).eq_ignore_ascii_case(tag_name)
                })
            })
            .collect()
    }

    /// First connected element whose `id` attribute equals `id_value`.
    pub fn element_by_id(&self, id_value: &str) -> Option<NodeId> {
        if id_value.is_empty() {
            return None;
        }
        self.descendants(self.root_id)
            .find(|&id| self.attribute(id, "id") == Some(id_value))
    }

    pub fn inner_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        crate::html::serialize_children(self, id, &mut out);
        out
    }

    /// Replaces every child of `id` with the nodes parsed from `markup`.
    /// The old children are detached, not destroyed.
    pub fn set_inner_html(&mut self, id: NodeId, markup: &str) -> Result<(), DomError> {
        if matches!(self.node(id)?.data, NodeData::Text(_)) {
            return Err(DomError::NotAContainer(id));
        }
        while let Some(child) = self.first_child_of(id) {
            self.detach(child);
        }
        crate::html::parse_fragment(self, id, markup);
        self.layout_dirty = true;
        Ok(())
    }

    pub fn layout_box(&self, id: NodeId) -> LayoutBox {
        self.nodes.get(id).map(|n| n.layout).unwrap_or_default()
    }

    pub fn set_layout_box(&mut self, id: NodeId, layout: LayoutBox) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.layout = layout;
        }
    }
}

pub struct Descendants<'a> {
    doc: &'a Document,
    scope: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        let (doc, scope) = (self.doc, self.scope);

        self.next = doc.first_child_of(current).or_else(|| {
            let mut node = current;
            loop {
                if node == scope {
                    return None;
                }
                if let Some(sibling) = doc.next_sibling_of(node) {
                    return Some(sibling);
                }
                node = doc.parent_of(node)?;
            }
        });

        Some(current)
    }
}
