//! domwrap-core: identity-stable wrappers over an arena DOM.
//!
//! Parses HTML into an intrusive linked list arena-based DOM and hands out
//! exactly one `DomElement` wrapper per native node. Wrappers carry a private
//! data store, manipulate classes, attributes and markup, and read and write
//! inline styles through an ordered codec that understands composite values
//! like `transform`. Geometry getters report boxes computed via Taffy.
//!
//! Everything is single-threaded: documents are shared as
//! `Rc<RefCell<Document>>` and the wrapper registry is thread-local.

pub mod dom;
pub mod element;
pub mod helper;
pub mod html;
pub mod layout;
pub mod style;

pub use dom::{Document, DocumentRef, DomError, NodeId};
pub use element::{AttributeValue, BulkEdit, DomElement, DomElementList};
pub use helper::DomHelper;
pub use layout::LayoutConfig;
pub use style::{StyleFunctions, StyleMap, StyleValue};
