//! Markup serialization and a small selector engine.

use crate::document::{Document, Inner, NodeData};
use crate::NodeId;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Compound selector: an optional tag plus any number of classes and an id,
/// e.g. `li`, `.container`, `button.primary#submit`.
#[derive(Debug, Default, PartialEq)]
struct Selector<'s> {
    tag: Option<&'s str>,
    id: Option<&'s str>,
    classes: Vec<&'s str>,
}

impl<'s> Selector<'s> {
    fn parse(input: &'s str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        let mut selector = Selector::default();
        let mut rest = input;
        let tag_end = rest.find(['.', '#']).unwrap_or(rest.len());
        if tag_end > 0 {
            selector.tag = Some(&rest[..tag_end]);
        }
        rest = &rest[tag_end..];

        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let end = body.find(['.', '#']).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() {
                return None;
            }
            match marker {
                '.' => selector.classes.push(name),
                _ => selector.id = Some(name),
            }
            rest = &body[end..];
        }
        Some(selector)
    }

    fn matches(&self, inner: &Inner, node: NodeId) -> bool {
        let NodeData::Element(el) = &inner.nodes[node].data else {
            return false;
        };
        if let Some(tag) = self.tag
            && !el.tag.eq_ignore_ascii_case(tag)
        {
            return false;
        }
        if let Some(id) = self.id
            && el.attrs.get("id").map(String::as_str) != Some(id)
        {
            return false;
        }
        let class = el.attrs.get("class").map(String::as_str).unwrap_or("");
        self.classes
            .iter()
            .all(|wanted| class.split_ascii_whitespace().any(|c| c == *wanted))
    }
}

fn escape_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(out: &mut String, value: &str) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

fn write_node(inner: &Inner, node: NodeId, out: &mut String) {
    let entry = &inner.nodes[node];
    match &entry.data {
        NodeData::Text(text) => escape_text(out, text),
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::Element(el) => {
            out.push('<');
            out.push_str(&el.tag);
            for (name, value) in &el.attrs {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                escape_attr(out, value);
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.contains(&el.tag.as_str()) {
                return;
            }
            write_children(inner, node, out);
            out.push_str("</");
            out.push_str(&el.tag);
            out.push('>');
        }
    }
}

fn write_children(inner: &Inner, node: NodeId, out: &mut String) {
    for child in &inner.nodes[node].children {
        write_node(inner, *child, out);
    }
}

fn collect_text(inner: &Inner, node: NodeId, out: &mut String) {
    let entry = &inner.nodes[node];
    match &entry.data {
        NodeData::Text(text) => out.push_str(text),
        NodeData::Comment(_) => {}
        NodeData::Element(_) => {
            for child in &entry.children {
                collect_text(inner, *child, out);
            }
        }
    }
}

/// Descendants of `node` in document order, `node` excluded.
fn descendants(inner: &Inner, node: NodeId) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = inner.nodes[node].children.iter().rev().copied().collect();
    while let Some(next) = stack.pop() {
        out.push(next);
        stack.extend(inner.nodes[next].children.iter().rev().copied());
    }
    out
}

impl Document {
    pub fn outer_html(&self, node: NodeId) -> String {
        let inner = self.inner.borrow();
        let mut out = String::new();
        if inner.nodes.contains_key(node) {
            write_node(&inner, node, &mut out);
        }
        out
    }

    pub fn inner_html(&self, node: NodeId) -> String {
        let inner = self.inner.borrow();
        let mut out = String::new();
        if inner.nodes.contains_key(node) {
            write_children(&inner, node, &mut out);
        }
        out
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let inner = self.inner.borrow();
        let mut out = String::new();
        if inner.nodes.contains_key(node) {
            collect_text(&inner, node, &mut out);
        }
        out
    }

    /// First descendant of `scope` matching `selector`. Unsupported selectors
    /// match nothing.
    pub fn query_selector(&self, scope: NodeId, selector: &str) -> Option<NodeId> {
        self.query_selector_all(scope, selector).into_iter().next()
    }

    pub fn query_selector_all(&self, scope: NodeId, selector: &str) -> Vec<NodeId> {
        let Some(selector) = Selector::parse(selector) else {
            log::warn!("unsupported selector {selector:?}");
            return Vec::new();
        };
        let inner = self.inner.borrow();
        if !inner.nodes.contains_key(scope) {
            return Vec::new();
        }
        descendants(&inner, scope)
            .into_iter()
            .filter(|node| selector.matches(&inner, *node))
            .collect()
    }
}
