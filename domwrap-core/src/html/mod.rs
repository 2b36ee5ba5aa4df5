//! Markup parsing and serialization.
//!
//! Uses `html5gum` to stream tokens into the arena `Document` in a single
//! pass. Implicit tag auto-closing walks up the ancestor chain to find the
//! matching tag before block-level boundaries. Content inside `<script>` and
//! `<style>` is kept as raw text.
//!
//! `parse_fragment` runs the same tokenizer against an existing parent node,
//! which is how `innerHTML` assignment is implemented. `serialize_children`
//! is the reverse direction.

use html5gum::{Token, Tokenizer};
use string_cache::DefaultAtom;

use crate::dom::{Document, NodeData, NodeId};

static VOID_ELEMENTS: phf::Set<&'static str> = phf::phf_set! {
    "area", "base", "br", "col", "embed", "hr", "img", "input",
    "link", "meta", "param", "source", "track", "wbr",
};

fn is_raw_text(tag_name: &str) -> bool {
    matches!(tag_name, "script" | "style")
}

/// Parses a complete document.
pub fn parse_html(html: &str) -> Document {
    let mut doc = Document::default();
    let root = doc.root_id;
    parse_into(&mut doc, root, html);
    tracing::debug!(nodes = doc.nodes.len(), "parsed document");
    doc
}

/// Parses `html` and appends the resulting nodes to `context`.
pub fn parse_fragment(doc: &mut Document, context: NodeId, html: &str) {
    parse_into(doc, context, html);
}

fn parse_into(doc: &mut Document, context: NodeId, html: &str) {
    let mut current_parent = context;
    let mut inside_raw_tag: Option<DefaultAtom> = None;
    let mut raw_text = String::new();

    for token in Tokenizer::new(html).infallible() {
        match token {
            Token::StartTag(tag) => {
                let tag_name_str = std::str::from_utf8(&tag.name).unwrap_or("");

                if inside_raw_tag.is_some() {
                    raw_text.push('<');
                    raw_text.push_str(tag_name_str);
                    for (k, v) in tag.attributes.iter() {
                        raw_text.push(' ');
                        raw_text.push_str(std::str::from_utf8(k).unwrap_or(""));
                        raw_text.push_str("=\"");
                        raw_text.push_str(std::str::from_utf8(v).unwrap_or(""));
                        raw_text.push('"');
                    }
                    raw_text.push_str(if tag.self_closing { "/>" } else { ">" });
                    continue;
                }

                let tag_name = DefaultAtom::from(tag_name_str.to_ascii_lowercase());
                current_parent = close_implied(doc, context, current_parent, &tag_name);

                let node_id = doc.create_element(&tag_name);
                for (key, value) in tag.attributes {
                    if let (Ok(k), Ok(v)) = (std::str::from_utf8(&key), std::str::from_utf8(&value)) {
                        let _ = doc.set_attribute(node_id, k, v.to_string());
                    }
                }

                if doc.append_child(current_parent, node_id).is_err() {
                    continue;
                }

                if is_raw_text(&tag_name) {
                    inside_raw_tag = Some(tag_name.clone());
                }
                if !VOID_ELEMENTS.contains(&*tag_name) && !tag.self_closing {
                    current_parent = node_id;
                }
            }
            Token::EndTag(tag) => {
                let tag_name_str = std::str::from_utf8(&tag.name).unwrap_or("");
                let tag_name = DefaultAtom::from(tag_name_str.to_ascii_lowercase());

                if let Some(raw) = &inside_raw_tag {
                    if *raw != tag_name {
                        raw_text.push_str("</");
                        raw_text.push_str(tag_name_str);
                        raw_text.push('>');
                        continue;
                    }
                    if !raw_text.is_empty() {
                        let text = doc.create_text_node(&std::mem::take(&mut raw_text));
                        let _ = doc.append_child(current_parent, text);
                    }
                    inside_raw_tag = None;
                }

                let mut p = Some(current_parent);
                while let Some(pid) = p {
                    if pid == context {
                        break;
                    }
                    if doc.tag_name(pid) == Some(&*tag_name) {
                        current_parent = doc.parent_of(pid).unwrap_or(context);
                        break;
                    }
                    p = doc.parent_of(pid);
                }
            }
            Token::String(s) => {
                let text_str = std::str::from_utf8(&s).unwrap_or("");
                if text_str.is_empty() {
                    continue;
                }
                if inside_raw_tag.is_some() {
                    raw_text.push_str(text_str);
                    continue;
                }

                let merged = match doc.last_child_of(current_parent) {
                    Some(last) => match doc.nodes.get_mut(last).map(|n| &mut n.data) {
                        Some(NodeData::Text(existing)) => {
                            existing.push_str(text_str);
                            true
                        }
                        _ => false,
                    },
                    None => false,
                };
                if !merged {
                    let id = doc.create_text_node(text_str);
                    let _ = doc.append_child(current_parent, id);
                }
            }
            Token::Comment(_) | Token::Doctype(_) | Token::Error(_) => {}
        }
    }

    // Unterminated script/style: keep what was collected.
    if !raw_text.is_empty() {
        let text = doc.create_text_node(&raw_text);
        let _ = doc.append_child(current_parent, text);
    }
}

/// Finds the parent a new `tag_name` element should be inserted into,
/// closing an open `p`, `li`, `td`/`th` or `tr` the new tag implicitly ends.
fn close_implied(doc: &Document, context: NodeId, current_parent: NodeId, tag_name: &str) -> NodeId {
    let mut check_node = current_parent;

    while check_node != context {
        let Some(p_tag) = doc.tag_name(check_node) else {
            break;
        };
        let should_close = match tag_name {
            "li" => p_tag == "li",
            "td" | "th" => p_tag == "td" || p_tag == "th",
            "tr" => p_tag == "tr",
            "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "ul" | "ol" | "table" => {
                p_tag == "p"
            }
            _ => false,
        };
        if should_close {
            return doc.parent_of(check_node).unwrap_or(context);
        }
        if matches!(p_tag, "div" | "body" | "td" | "th" | "table") {
            break;
        }
        check_node = match doc.parent_of(check_node) {
            Some(parent) => parent,
            None => break,
        };
    }

    current_parent
}

/// Appends the markup of every child of `id` to `out`.
pub fn serialize_children(doc: &Document, id: NodeId, out: &mut String) {
    let raw = doc.tag_name(id).is_some_and(is_raw_text);
    let mut child = doc.first_child_of(id);
    while let Some(c) = child {
        serialize_node(doc, c, raw, out);
        child = doc.next_sibling_of(c);
    }
}

fn serialize_node(doc: &Document, id: NodeId, raw_parent: bool, out: &mut String) {
    let Some(node) = doc.nodes.get(id) else {
        return;
    };
    match &node.data {
        NodeData::Text(text) => {
            if raw_parent {
                out.push_str(text);
            } else {
                escape_text(text, out);
            }
        }
        NodeData::Element(data) => {
            out.push('<');
            out.push_str(&data.tag_name);
            for (name, value) in &data.attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attribute(value, out);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&*data.tag_name) {
                return;
            }
            serialize_children(doc, id, out);
            out.push_str("</");
            out.push_str(&data.tag_name);
            out.push('>');
        }
        NodeData::Root => serialize_children(doc, id, out),
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
}
