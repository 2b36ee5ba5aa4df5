//! Identity cache mapping native nodes to their one wrapper.
//!
//! The registry is an insertion-ordered list of every wrapper ever created
//! on this thread plus a side table from `(document serial, node id)` to the
//! wrapper's slot in that list. A wrapper's id is its slot.
//!
//! Entries are never pruned. Each wrapper keeps its document alive, so a
//! document that has been wrapped once lives until the thread exits.

use std::cell::RefCell;
use std::collections::HashMap;

use super::DomElement;
use crate::dom::{DocumentRef, NodeId};

#[derive(Default)]
struct Registry {
    elements: Vec<DomElement>,
    slots: HashMap<(usize, NodeId), usize>,
}

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::default());
}

/// Returns the wrapper for `node`, creating it on first use. The caller
/// guarantees `node` is live in `document`.
pub(crate) fn wrap(document: &DocumentRef, node: NodeId) -> DomElement {
    let serial = document.borrow().serial();

    REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        if let Some(&slot) = registry.slots.get(&(serial, node)) {
            return registry.elements[slot].clone();
        }

        let slot = registry.elements.len();
        let element = DomElement::allocate(slot, document, node);
        registry.slots.insert((serial, node), slot);
        registry.elements.push(element.clone());
        tracing::debug!(slot, document = serial, ?node, "allocated wrapper");
        element
    })
}

/// Number of wrappers created on this thread so far.
pub fn len() -> usize {
    REGISTRY.with(|registry| registry.borrow().elements.len())
}
