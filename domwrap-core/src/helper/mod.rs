//! Factory helpers bound to one document.
//!
//! Thin dispatch over the document's query primitives and the wrapper
//! registry. Lookups that find nothing return `None`.

use std::cell::RefCell;
use std::rc::Rc;

use crate::dom::{Document, DocumentRef, DomError, NodeId};
use crate::element::{DomElement, DomElementList, registry};
use crate::html;
use crate::layout::{self, LayoutConfig};

#[derive(Clone)]
pub struct DomHelper {
    document: DocumentRef,
}

impl Default for DomHelper {
    fn default() -> Self {
        Self::new()
    }
}

impl DomHelper {
    /// Helper over a fresh `html > head + body` document.
    pub fn new() -> Self {
        Self::with_document(Document::blank())
    }

    /// Parses `markup` as a whole document.
    pub fn from_html(markup: &str) -> Self {
        Self::with_document(html::parse_html(markup))
    }

    pub fn with_document(document: Document) -> Self {
        DomHelper {
            document: Rc::new(RefCell::new(document)),
        }
    }

    pub fn document(&self) -> &DocumentRef {
        &self.document
    }

    /// The first `body` element, if the document has one.
    pub fn body(&self) -> Option<DomElement> {
        self.get_element_by_tag_name("body")
    }

    /// Wraps `node`. `None` in gives `None` out; a stale id is an error.
    pub fn create_from_element(&self, node: Option<NodeId>) -> Result<Option<DomElement>, DomError> {
        node.map(|node| DomElement::new(&self.document, node)).transpose()
    }

    pub fn create_from_element_list(&self, nodes: &[NodeId]) -> Result<DomElementList, DomError> {
        {
            let doc = self.document.borrow();
            if let Some(&stale) = nodes.iter().find(|&&node| !doc.contains(node)) {
                return Err(DomError::UnknownNode(stale));
            }
        }
        Ok(DomElementList::from_nodes(&self.document, nodes.iter().copied()))
    }

    /// Creates a detached element and wraps it.
    pub fn create(&self, tag_name: &str) -> DomElement {
        let node = self.document.borrow_mut().create_element(tag_name);
        registry::wrap(&self.document, node)
    }

    /// Creates a detached text node and wraps it.
    pub fn create_text(&self, text: &str) -> DomElement {
        let node = self.document.borrow_mut().create_text_node(text);
        registry::wrap(&self.document, node)
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<DomElement> {
        let found = self.document.borrow().element_by_id(id);
        found.map(|node| registry::wrap(&self.document, node))
    }

    pub fn get_element_by_class_name(&self, name: &str) -> Option<DomElement> {
        let found = {
            let doc = self.document.borrow();
            doc.elements_by_class_name(doc.root_id, name).first().copied()
        };
        found.map(|node| registry::wrap(&self.document, node))
    }

    pub fn get_element_by_tag_name(&self, tag_name: &str) -> Option<DomElement> {
        let found = {
            let doc = self.document.borrow();
            doc.elements_by_tag_name(doc.root_id, tag_name).first().copied()
        };
        found.map(|node| registry::wrap(&self.document, node))
    }

    pub fn get_elements_by_class_name(&self, name: &str) -> DomElementList {
        let nodes = {
            let doc = self.document.borrow();
            doc.elements_by_class_name(doc.root_id, name)
        };
        DomElementList::from_nodes(&self.document, nodes)
    }

    pub fn get_elements_by_tag_name(&self, tag_name: &str) -> DomElementList {
        let nodes = {
            let doc = self.document.borrow();
            doc.elements_by_tag_name(doc.root_id, tag_name)
        };
        DomElementList::from_nodes(&self.document, nodes)
    }

    /// Lays the document out with `config` and keeps it for the automatic
    /// passes that geometry reads trigger after later mutations.
    pub fn layout(&self, config: &LayoutConfig) -> Result<(), DomError> {
        layout::compute_layout(&mut self.document.borrow_mut(), config)
    }
}
