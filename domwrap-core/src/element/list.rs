use std::ops::Index;

use super::{DomElement, registry};
use crate::dom::{DocumentRef, NodeId};

/// Fixed snapshot of wrappers taken from a node list. Later changes to the
/// tree are not reflected.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomElementList {
    elements: Vec<DomElement>,
}

impl DomElementList {
    pub(crate) fn from_nodes(document: &DocumentRef, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        DomElementList {
            elements: nodes
                .into_iter()
                .map(|node| registry::wrap(document, node))
                .collect(),
        }
    }

    pub fn get_list(&self) -> &[DomElement] {
        &self.elements
    }

    pub fn get(&self, index: usize) -> Option<&DomElement> {
        self.elements.get(index)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DomElement> {
        self.elements.iter()
    }
}

impl Index<usize> for DomElementList {
    type Output = DomElement;

    fn index(&self, index: usize) -> &DomElement {
        &self.elements[index]
    }
}

impl<'a> IntoIterator for &'a DomElementList {
    type Item = &'a DomElement;
    type IntoIter = std::slice::Iter<'a, DomElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl IntoIterator for DomElementList {
    type Item = DomElement;
    type IntoIter = std::vec::IntoIter<DomElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}
