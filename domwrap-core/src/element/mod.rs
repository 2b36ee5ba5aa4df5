//! Node wrappers.
//!
//! A [`DomElement`] is the single convenience object attached to one native
//! node. Wrapping the same node twice hands back the same `Rc`, so wrappers
//! compare by identity and share their private data store. The mapping lives
//! in [`registry`].

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use serde_json::Value;

use crate::dom::{Document, DocumentRef, DomError, LayoutBox, NodeId};
use crate::layout;
use crate::style::{self, StyleMap};

mod list;
pub mod registry;

pub use list::DomElementList;

/// Argument of [`DomElement::set_attribute`].
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    /// Leave the attribute untouched.
    Unset,
    /// Remove the attribute if present.
    Remove,
    Value(String),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Value(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Value(value)
    }
}

impl From<&String> for AttributeValue {
    fn from(value: &String) -> Self {
        AttributeValue::Value(value.clone())
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        AttributeValue::Value(value.to_string())
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        AttributeValue::Value(value.to_string())
    }
}

/// `false` removes the attribute; `true` sets it to `"true"`.
impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        if value {
            AttributeValue::Value("true".to_string())
        } else {
            AttributeValue::Remove
        }
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(AttributeValue::Unset, Into::into)
    }
}

/// One step of [`DomElement::bulk_edit`]. Each variant carries exactly the
/// arguments of the operation it names.
#[derive(Debug, Clone)]
pub enum BulkEdit {
    Remove,
    AddClass(String),
    AddClasses(Vec<String>),
    RemoveClass(String),
    RemoveClasses(Vec<String>),
    SetAttribute(String, AttributeValue),
    SetAttributes(Vec<(String, AttributeValue)>),
    RemoveAttribute(String),
    SetHtml(String),
    SetData(String, Value),
    SetDatas(Vec<(String, Value)>),
    RemoveData(String),
    SetStyle(StyleMap),
    SetStyleForce(StyleMap),
    Append(DomElement),
    AppendTo(DomElement),
    AppendList(Vec<DomElement>),
}

#[derive(Clone)]
pub struct DomElement(Rc<ElementInner>);

struct ElementInner {
    id: usize,
    node: NodeId,
    document: DocumentRef,
    /// Cleared keys keep an entry holding `None`.
    data: RefCell<HashMap<String, Option<Value>>>,
}

impl DomElement {
    /// Wraps `node`, returning the existing wrapper if there is one.
    pub fn new(document: &DocumentRef, node: NodeId) -> Result<Self, DomError> {
        if !document.borrow().contains(node) {
            return Err(DomError::UnknownNode(node));
        }
        Ok(registry::wrap(document, node))
    }

    pub(crate) fn allocate(id: usize, document: &DocumentRef, node: NodeId) -> Self {
        DomElement(Rc::new(ElementInner {
            id,
            node,
            document: Rc::clone(document),
            data: RefCell::new(HashMap::new()),
        }))
    }

    fn doc(&self) -> Ref<'_, Document> {
        self.0.document.borrow()
    }

    fn doc_mut(&self) -> RefMut<'_, Document> {
        self.0.document.borrow_mut()
    }

    fn wrap(&self, node: NodeId) -> DomElement {
        registry::wrap(&self.0.document, node)
    }

    /// Registry slot assigned when the node was first wrapped.
    pub fn id(&self) -> usize {
        self.0.id
    }

    /// The wrapped native node.
    pub fn node_id(&self) -> NodeId {
        self.0.node
    }

    pub fn document(&self) -> &DocumentRef {
        &self.0.document
    }

    pub fn tag_name(&self) -> Option<String> {
        self.doc().tag_name(self.0.node).map(str::to_string)
    }

    /// Whether both wrappers are the one instance cached for a node.
    pub fn same_node(&self, other: &DomElement) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Current border box, laying the document out again first if it changed.
    /// Nodes outside the tree have an empty box.
    fn layout_box(&self) -> LayoutBox {
        let mut doc = self.doc_mut();
        if !doc.is_connected(self.0.node) {
            return LayoutBox::default();
        }
        if let Err(err) = layout::refresh(&mut doc) {
            tracing::warn!(id = self.0.id, %err, "layout failed, reporting last known box");
        }
        doc.layout_box(self.0.node)
    }

    pub fn size_x(&self) -> f32 {
        self.layout_box().width
    }

    pub fn size_y(&self) -> f32 {
        self.layout_box().height
    }

    pub fn pos_x(&self) -> f32 {
        self.layout_box().x
    }

    pub fn pos_y(&self) -> f32 {
        self.layout_box().y
    }

    // ---------------------------------------------------------------------
    // Classes
    // ---------------------------------------------------------------------

    /// Adds every space-separated name not already present, keeping order.
    pub fn add_class(&self, names: &str) -> Result<(), DomError> {
        self.add_classes(names.split_ascii_whitespace())
    }

    pub fn add_classes<I, S>(&self, names: I) -> Result<(), DomError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut doc = self.doc_mut();
        let mut tokens = class_tokens(doc.class_name(self.0.node));
        for name in names {
            let name = name.as_ref();
            if !name.is_empty() && !tokens.iter().any(|t| t == name) {
                tokens.push(name.to_string());
            }
        }
        doc.set_class_name(self.0.node, tokens.join(" "))
    }

    pub fn remove_class(&self, names: &str) -> Result<(), DomError> {
        self.remove_classes(names.split_ascii_whitespace())
    }

    pub fn remove_classes<I, S>(&self, names: I) -> Result<(), DomError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut doc = self.doc_mut();
        let current = doc.class_name(self.0.node);
        if current.is_empty() {
            return Ok(());
        }
        let mut tokens = class_tokens(current);
        for name in names {
            let name = name.as_ref();
            tokens.retain(|t| t != name);
        }
        doc.set_class_name(self.0.node, tokens.join(" "))
    }

    /// Exact token test against the node's parsed class list.
    pub fn has_class(&self, name: &str) -> bool {
        self.doc()
            .element(self.0.node)
            .is_some_and(|e| e.has_class(name))
    }

    // ---------------------------------------------------------------------
    // Attributes and content
    // ---------------------------------------------------------------------

    pub fn set_attribute(&self, name: &str, value: impl Into<AttributeValue>) -> Result<(), DomError> {
        match value.into() {
            AttributeValue::Unset => Ok(()),
            AttributeValue::Remove => self.remove_attribute(name),
            AttributeValue::Value(value) => self.doc_mut().set_attribute(self.0.node, name, value),
        }
    }

    pub fn get_attribute(&self, name: &str) -> Option<String> {
        self.doc().attribute(self.0.node, name).map(str::to_string)
    }

    pub fn remove_attribute(&self, name: &str) -> Result<(), DomError> {
        self.doc_mut().remove_attribute(self.0.node, name)
    }

    /// Applies [`DomElement::set_attribute`] once per entry, in order.
    pub fn set_attributes<I, K, V>(&self, attributes: I) -> Result<(), DomError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<AttributeValue>,
    {
        for (name, value) in attributes {
            self.set_attribute(name.as_ref(), value)?;
        }
        Ok(())
    }

    /// Replaces the children with parsed `markup`. Not sanitized.
    pub fn set_html(&self, markup: &str) -> Result<(), DomError> {
        self.doc_mut().set_inner_html(self.0.node, markup)
    }

    pub fn get_html(&self) -> String {
        self.doc().inner_html(self.0.node)
    }

    // ---------------------------------------------------------------------
    // Private data
    // ---------------------------------------------------------------------

    pub fn set_data(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.data.borrow_mut().insert(key.into(), Some(value.into()));
    }

    pub fn get_data(&self, key: &str) -> Option<Value> {
        self.0.data.borrow().get(key).cloned().flatten()
    }

    pub fn remove_data(&self, key: impl Into<String>) {
        self.0.data.borrow_mut().insert(key.into(), None);
    }

    pub fn set_datas<I, K, V>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        for (key, value) in entries {
            self.set_data(key, value);
        }
    }

    // ---------------------------------------------------------------------
    // Inline style
    // ---------------------------------------------------------------------

    /// Current `style` attribute as a map.
    pub fn get_style(&self) -> StyleMap {
        style::decode(self.doc().attribute(self.0.node, "style"))
    }

    /// Merges `partial` into the current inline style.
    pub fn set_style(&self, partial: &StyleMap) -> Result<(), DomError> {
        let mut current = self.get_style();
        current.merge(partial);
        self.set_style_force(&current)
    }

    /// Replaces the inline style with `full`.
    pub fn set_style_force(&self, full: &StyleMap) -> Result<(), DomError> {
        let encoded = style::encode(full);
        tracing::trace!(id = self.0.id, style = %encoded, "writing inline style");
        self.doc_mut().set_attribute(self.0.node, "style", encoded)
    }

    // ---------------------------------------------------------------------
    // Search
    // ---------------------------------------------------------------------

    pub fn get_element_by_class_name(&self, name: &str) -> Option<DomElement> {
        let found = self.doc().elements_by_class_name(self.0.node, name).first().copied();
        found.map(|node| self.wrap(node))
    }

    pub fn get_element_by_tag_name(&self, tag_name: &str) -> Option<DomElement> {
        let found = self.doc().elements_by_tag_name(self.0.node, tag_name).first().copied();
        found.map(|node| self.wrap(node))
    }

    pub fn get_elements_by_class_name(&self, name: &str) -> DomElementList {
        let nodes = self.doc().elements_by_class_name(self.0.node, name);
        DomElementList::from_nodes(&self.0.document, nodes)
    }

    pub fn get_elements_by_tag_name(&self, tag_name: &str) -> DomElementList {
        let nodes = self.doc().elements_by_tag_name(self.0.node, tag_name);
        DomElementList::from_nodes(&self.0.document, nodes)
    }

    // ---------------------------------------------------------------------
    // Tree
    // ---------------------------------------------------------------------

    /// Detaches the node from its parent. No-op without a parent.
    pub fn remove(&self) {
        let mut doc = self.doc_mut();
        let Some(parent) = doc.parent_of(self.0.node) else {
            return;
        };
        if let Err(err) = doc.remove_child(parent, self.0.node) {
            tracing::warn!(id = self.0.id, %err, "remove rejected");
        }
    }

    pub fn append(&self, child: &DomElement) -> Result<(), DomError> {
        if !Rc::ptr_eq(&self.0.document, &child.0.document) {
            tracing::warn!(parent = self.0.id, child = child.0.id, "append across documents");
            return Err(DomError::CrossDocument);
        }
        let result = self.doc_mut().append_child(self.0.node, child.0.node);
        if let Err(err) = &result {
            tracing::warn!(parent = self.0.id, child = child.0.id, %err, "append rejected");
        }
        result
    }

    pub fn append_to(&self, parent: &DomElement) -> Result<(), DomError> {
        parent.append(self)
    }

    /// Appends each child in order after the existing children.
    pub fn append_list<I>(&self, children: I) -> Result<(), DomError>
    where
        I: IntoIterator,
        I::Item: std::borrow::Borrow<DomElement>,
    {
        for child in children {
            self.append(std::borrow::Borrow::borrow(&child))?;
        }
        Ok(())
    }

    pub fn parent(&self) -> Option<DomElement> {
        let parent = self.doc().parent_of(self.0.node);
        parent.map(|node| self.wrap(node))
    }

    /// Snapshot of all child nodes, text nodes included.
    pub fn children(&self) -> DomElementList {
        let nodes = self.doc().child_nodes(self.0.node);
        DomElementList::from_nodes(&self.0.document, nodes)
    }

    // ---------------------------------------------------------------------
    // Bulk configuration
    // ---------------------------------------------------------------------

    /// Applies each edit in order. `None` entries are skipped; the first
    /// failing edit stops the run.
    pub fn bulk_edit<I, E>(&self, edits: I) -> Result<(), DomError>
    where
        I: IntoIterator<Item = E>,
        E: Into<Option<BulkEdit>>,
    {
        for edit in edits {
            if let Some(edit) = edit.into() {
                self.apply(edit)?;
            }
        }
        Ok(())
    }

    fn apply(&self, edit: BulkEdit) -> Result<(), DomError> {
        match edit {
            BulkEdit::Remove => {
                self.remove();
                Ok(())
            }
            BulkEdit::AddClass(names) => self.add_class(&names),
            BulkEdit::AddClasses(names) => self.add_classes(names),
            BulkEdit::RemoveClass(names) => self.remove_class(&names),
            BulkEdit::RemoveClasses(names) => self.remove_classes(names),
            BulkEdit::SetAttribute(name, value) => self.set_attribute(&name, value),
            BulkEdit::SetAttributes(attributes) => self.set_attributes(attributes),
            BulkEdit::RemoveAttribute(name) => self.remove_attribute(&name),
            BulkEdit::SetHtml(markup) => self.set_html(&markup),
            BulkEdit::SetData(key, value) => {
                self.set_data(key, value);
                Ok(())
            }
            BulkEdit::SetDatas(entries) => {
                self.set_datas(entries);
                Ok(())
            }
            BulkEdit::RemoveData(key) => {
                self.remove_data(key);
                Ok(())
            }
            BulkEdit::SetStyle(partial) => self.set_style(&partial),
            BulkEdit::SetStyleForce(full) => self.set_style_force(&full),
            BulkEdit::Append(child) => self.append(&child),
            BulkEdit::AppendTo(parent) => self.append_to(&parent),
            BulkEdit::AppendList(children) => self.append_list(children),
        }
    }
}

fn class_tokens(class_name: &str) -> Vec<String> {
    class_name
        .split_ascii_whitespace()
        .map(str::to_string)
        .collect()
}

impl PartialEq for DomElement {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for DomElement {}

impl Hash for DomElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        Rc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for DomElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomElement")
            .field("id", &self.0.id)
            .field("node", &self.0.node)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::style::StyleMap;
    use proptest::prelude::*;
    use serde_json::json;

    fn div() -> (DocumentRef, DomElement) {
        let document = Document::blank().into_ref();
        let node = document.borrow_mut().create_element("div");
        let element = DomElement::new(&document, node).unwrap();
        (document, element)
    }

    fn class_attr(element: &DomElement) -> String {
        element.get_attribute("class").unwrap_or_default()
    }

    #[test]
    fn test_wrapping_twice_returns_same_instance() {
        let (document, element) = div();
        let again = DomElement::new(&document, element.node_id()).unwrap();
        assert_eq!(element, again);
        assert!(Rc::ptr_eq(&element.0, &again.0));
        assert_eq!(element.id(), again.id());
    }

    #[test]
    fn test_distinct_nodes_get_increasing_ids() {
        let (document, first) = div();
        let node = document.borrow_mut().create_element("span");
        let second = DomElement::new(&document, node).unwrap();
        assert_ne!(first, second);
        assert!(second.id() > first.id());
    }

    #[test]
    fn test_unknown_node_is_rejected() {
        let (document, _) = div();
        let before = registry::len();
        let bogus = NodeId::from_raw_parts(999, 0);
        assert!(matches!(
            DomElement::new(&document, bogus),
            Err(DomError::UnknownNode(_))
        ));
        assert_eq!(registry::len(), before);
    }

    fn body(document: &DocumentRef) -> DomElement {
        let body = document.borrow().elements_by_tag_name(document.borrow().root_id, "body")[0];
        DomElement::new(document, body).unwrap()
    }

    #[test]
    fn test_geometry_is_zero_outside_the_tree() {
        let (document, element) = div();
        element.set_style(&StyleMap::new().with("width", "100px").with("height", "20px")).unwrap();
        assert_eq!(element.size_x(), 0.0);
        assert_eq!(element.pos_y(), 0.0);

        body(&document).append(&element).unwrap();
        assert_eq!(element.size_x(), 100.0);

        element.remove();
        assert_eq!(element.size_x(), 0.0);
    }

    #[test]
    fn test_geometry_follows_style_changes_without_explicit_layout() {
        let (document, element) = div();
        body(&document).append(&element).unwrap();
        element
            .set_style(&StyleMap::new().with("width", "120px").with("height", "200px"))
            .unwrap();
        assert_eq!(element.size_x(), 120.0);
        assert_eq!(element.size_y(), 200.0);

        element.set_style(&StyleMap::new().with("width", "300px")).unwrap();
        assert_eq!(element.size_x(), 300.0);

        element
            .set_style(&StyleMap::new().with("margin-left", "300px").with("margin-top", "400px"))
            .unwrap();
        assert_eq!(element.pos_x(), 300.0);
        assert_eq!(element.pos_y(), 400.0);
    }

    #[test]
    fn test_geometry_of_newly_appended_sibling() {
        let (document, first) = div();
        let body = body(&document);
        first.set_style(&StyleMap::new().with("height", "30px")).unwrap();
        body.append(&first).unwrap();
        assert_eq!(first.size_y(), 30.0);

        let node = document.borrow_mut().create_element("div");
        let second = DomElement::new(&document, node).unwrap();
        second.set_style(&StyleMap::new().with("width", "50px").with("height", "10px")).unwrap();
        body.append(&second).unwrap();
        assert_eq!(second.size_x(), 50.0);
        assert_eq!(second.pos_y(), 30.0);
    }

    #[test]
    fn test_same_node() {
        let (document, element) = div();
        let again = DomElement::new(&document, element.node_id()).unwrap();
        assert!(element.same_node(&again));
        assert!(!element.same_node(&body(&document)));
    }

    #[test]
    fn test_add_class() {
        let (_, element) = div();
        element.add_class("testClassName").unwrap();
        assert_eq!(class_attr(&element), "testClassName");

        element.add_class("testClassName anotherTestClassName").unwrap();
        assert_eq!(class_attr(&element), "testClassName anotherTestClassName");

        element.add_class("testClassName").unwrap();
        assert_eq!(class_attr(&element), "testClassName anotherTestClassName");
    }

    #[test]
    fn test_add_classes_from_list() {
        let (_, element) = div();
        element.add_classes(["a", "b"]).unwrap();
        element.add_classes(vec!["b".to_string(), "c".to_string()]).unwrap();
        assert_eq!(class_attr(&element), "a b c");
    }

    #[test]
    fn test_remove_class() {
        let (_, element) = div();
        element.add_class("keep drop alsoDrop").unwrap();
        element.remove_class("drop alsoDrop").unwrap();
        assert_eq!(class_attr(&element), "keep");

        element.remove_class("missing").unwrap();
        assert_eq!(class_attr(&element), "keep");

        element.remove_classes(["keep"]).unwrap();
        assert_eq!(class_attr(&element), "");
    }

    #[test]
    fn test_remove_class_without_class_attribute_is_noop() {
        let (_, element) = div();
        element.remove_class("anything").unwrap();
        assert_eq!(element.get_attribute("class"), None);
    }

    #[test]
    fn test_has_class() {
        let (_, element) = div();
        assert!(!element.has_class("existing"));
        element.add_class("a existing b").unwrap();
        assert!(element.has_class("existing"));
        assert!(!element.has_class("exist"));
        assert!(!element.has_class(""));
    }

    #[test]
    fn test_class_tokens_agree_with_class_queries() {
        let (document, element) = div();
        body(&document).append(&element).unwrap();
        element.set_attribute("class", "first\tsecond").unwrap();
        assert!(element.has_class("second"));
        assert!(!element.has_class("first\tsecond"));
        let found = body(&document).get_elements_by_class_name("second");
        assert_eq!(found.get_list(), &[element.clone()]);

        element.add_class("third").unwrap();
        assert_eq!(class_attr(&element), "first second third");
        element.remove_class("first").unwrap();
        assert_eq!(class_attr(&element), "second third");
    }

    #[test]
    fn test_set_attribute_variants() {
        let (_, element) = div();
        element.set_attribute("title", "first").unwrap();
        element.set_attribute("title", "latest").unwrap();
        assert_eq!(element.get_attribute("title").as_deref(), Some("latest"));

        element.set_attribute("title", AttributeValue::Unset).unwrap();
        element.set_attribute("title", None::<&str>).unwrap();
        assert_eq!(element.get_attribute("title").as_deref(), Some("latest"));

        element.set_attribute("title", false).unwrap();
        assert_eq!(element.get_attribute("title"), None);

        element.set_attribute("title", false).unwrap();
        assert_eq!(element.get_attribute("title"), None);

        element.set_attribute("tabindex", 3i64).unwrap();
        assert_eq!(element.get_attribute("tabindex").as_deref(), Some("3"));
    }

    #[test]
    fn test_set_attributes_applies_each_entry() {
        let (_, element) = div();
        element.set_attribute("removedAttribute", "x").unwrap();
        element
            .set_attributes([
                ("testAttribute1", AttributeValue::from("testValue1")),
                ("testAttribute2", AttributeValue::from("testValue2")),
                ("removedAttribute", AttributeValue::from(false)),
            ])
            .unwrap();
        assert_eq!(element.get_attribute("testAttribute1").as_deref(), Some("testValue1"));
        assert_eq!(element.get_attribute("testAttribute2").as_deref(), Some("testValue2"));
        assert_eq!(element.get_attribute("removedAttribute"), None);
    }

    #[test]
    fn test_html_round_trip() {
        let (_, element) = div();
        element.set_html("existing HTML Content").unwrap();
        element.set_html("<b>HTML</b> Content").unwrap();
        assert_eq!(element.get_html(), "<b>HTML</b> Content");
        assert_eq!(element.children().len(), 2);
    }

    #[test]
    fn test_data_store() {
        let (_, element) = div();
        assert_eq!(element.get_data("missing"), None);

        element.set_data("testData", "testDataContent");
        element.set_data("object", json!({ "foo": "bar" }));
        element.set_data("list", json!([1, 2, 3]));
        assert_eq!(element.get_data("testData"), Some(json!("testDataContent")));
        assert_eq!(element.get_data("object"), Some(json!({ "foo": "bar" })));
        assert_eq!(element.get_data("list"), Some(json!([1, 2, 3])));

        element.remove_data("testData");
        assert_eq!(element.get_data("testData"), None);

        element.set_datas([("a", 1), ("b", 2)]);
        assert_eq!(element.get_data("b"), Some(json!(2)));
    }

    #[test]
    fn test_data_is_not_written_to_the_node() {
        let (_, element) = div();
        element.set_data("key", "value");
        assert_eq!(element.get_attribute("key"), None);
        assert_eq!(element.get_attribute("data-key"), None);
    }

    #[test]
    fn test_set_style_merges() {
        let (_, element) = div();
        element.set_attribute("style", "color:green;font-size:12px").unwrap();
        element
            .set_style(&StyleMap::new().with("font-size", false).with("text-align", "left"))
            .unwrap();
        assert_eq!(element.get_attribute("style").as_deref(), Some("color:green;text-align:left"));
    }

    #[test]
    fn test_set_style_removing_last_property_leaves_empty_style() {
        let (_, element) = div();
        element.set_attribute("style", "color:green").unwrap();
        element.set_style(&StyleMap::new().with("color", false)).unwrap();
        assert_eq!(element.get_attribute("style").as_deref(), Some(""));
    }

    #[test]
    fn test_set_style_force_replaces() {
        let (_, element) = div();
        element.set_attribute("style", "color:green").unwrap();
        element.set_style_force(&StyleMap::new().with("font-size", "12px")).unwrap();
        assert_eq!(element.get_attribute("style").as_deref(), Some("font-size:12px"));
    }

    #[test]
    fn test_search_wraps_through_the_cache() {
        let (_, element) = div();
        element
            .set_html("<p class=\"hit\">a</p><span><p class=\"hit\">b</p></span>")
            .unwrap();

        let first = element.get_element_by_class_name("hit").unwrap();
        assert_eq!(first.get_html(), "a");
        assert_eq!(element.get_element_by_class_name("hit"), Some(first.clone()));
        assert_eq!(element.get_elements_by_class_name("hit").len(), 2);
        assert_eq!(element.get_elements_by_tag_name("p").get_list()[0], first);
        assert_eq!(element.get_element_by_tag_name("span").and_then(|s| s.tag_name()).as_deref(), Some("span"));

        assert!(element.get_element_by_class_name("miss").is_none());
        assert!(element.get_element_by_tag_name("table").is_none());
        assert!(element.get_elements_by_tag_name("table").is_empty());
    }

    #[test]
    fn test_remove_without_parent_is_noop() {
        let (_, element) = div();
        element.remove();
        assert!(element.parent().is_none());
    }

    #[test]
    fn test_append_variants_and_parent() {
        let (document, parent) = div();
        let make = |tag: &str| {
            let node = document.borrow_mut().create_element(tag);
            DomElement::new(&document, node).unwrap()
        };
        let a = make("a");
        let b = make("b");
        let c = make("c");

        parent.append(&a).unwrap();
        b.append_to(&parent).unwrap();
        parent.append_list([c.clone()]).unwrap();

        let children = parent.children();
        assert_eq!(children.get_list(), &[a.clone(), b.clone(), c.clone()]);
        assert_eq!(a.parent(), Some(parent.clone()));

        c.remove();
        assert_eq!(parent.children().len(), 2);
        assert!(c.parent().is_none());
    }

    #[test]
    fn test_append_rejections() {
        let (document, parent) = div();
        let child_node = document.borrow_mut().create_element("span");
        let child = DomElement::new(&document, child_node).unwrap();
        parent.append(&child).unwrap();
        assert!(matches!(child.append(&parent), Err(DomError::HierarchyRequest { .. })));

        let (_, foreign) = div();
        assert!(matches!(parent.append(&foreign), Err(DomError::CrossDocument)));
    }

    #[test]
    fn test_children_of_empty_node_is_empty_list() {
        let (_, element) = div();
        let children = element.children();
        assert!(children.is_empty());
        assert!(children.get_list().is_empty());
    }

    #[test]
    fn test_bulk_edit_dispatch() {
        let (document, parent) = div();
        let node = document.borrow_mut().create_element("span");
        let element = DomElement::new(&document, node).unwrap();

        element
            .bulk_edit([
                Some(BulkEdit::AddClass("a b".into())),
                Some(BulkEdit::SetAttribute("title".into(), "hello".into())),
                None,
                Some(BulkEdit::SetData("key".into(), json!("value"))),
                Some(BulkEdit::SetStyle(StyleMap::new().with("color", "red"))),
                Some(BulkEdit::AppendTo(parent.clone())),
            ])
            .unwrap();

        assert_eq!(class_attr(&element), "a b");
        assert_eq!(element.get_attribute("title").as_deref(), Some("hello"));
        assert_eq!(element.get_data("key"), Some(json!("value")));
        assert_eq!(element.get_attribute("style").as_deref(), Some("color:red"));
        assert_eq!(element.parent(), Some(parent.clone()));

        element.bulk_edit(vec![BulkEdit::Remove]).unwrap();
        assert!(element.parent().is_none());
    }

    #[test]
    fn test_bulk_edit_stops_at_first_error() {
        let (document, element) = div();
        let text = document.borrow_mut().create_text_node("t");
        let text = DomElement::new(&document, text).unwrap();

        let result = text.bulk_edit([
            BulkEdit::SetData("seen".into(), json!(true)),
            BulkEdit::Append(element.clone()),
            BulkEdit::SetData("after".into(), json!(true)),
        ]);
        assert!(matches!(result, Err(DomError::NotAContainer(_))));
        assert_eq!(text.get_data("seen"), Some(json!(true)));
        assert_eq!(text.get_data("after"), None);
    }

    proptest! {
        #[test]
        fn prop_add_class_is_idempotent(names in proptest::collection::vec("[a-z]{1,6}", 1..6)) {
            let (_, once) = div();
            let (_, twice) = div();
            let joined = names.join(" ");

            once.add_class(&joined).unwrap();
            twice.add_class(&joined).unwrap();
            twice.add_class(&joined).unwrap();

            prop_assert_eq!(class_attr(&once), class_attr(&twice));

            let mut first_seen: Vec<&str> = Vec::new();
            for name in &names {
                if !first_seen.contains(&name.as_str()) {
                    first_seen.push(name);
                }
            }
            prop_assert_eq!(class_attr(&once), first_seen.join(" "));
        }
    }
}
