use std::collections::BTreeMap;
use std::fmt::Write;

use serde::Serialize;
use twig_core::{Node, PropValue};

/// Serializable copy of a virtual tree. Handlers become `"<handler>"`.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeSnapshot {
    Text {
        value: String,
    },
    Element {
        tag: String,
        #[serde(skip_serializing_if = "BTreeMap::is_empty")]
        props: BTreeMap<String, String>,
        children: Vec<Option<TreeSnapshot>>,
    },
    Component {
        name: String,
        result: Option<Box<TreeSnapshot>>,
    },
}

fn prop_text(value: &PropValue) -> String {
    match value {
        PropValue::Str(s) => format!("{s:?}"),
        PropValue::Number(n) => n.to_string(),
        PropValue::Bool(b) => b.to_string(),
        PropValue::Handler(_) => "<handler>".to_string(),
        PropValue::Undefined => "undefined".to_string(),
    }
}

/// Short component name: the last path segment of its type name.
fn short_name(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

pub fn snapshot(node: &Node) -> TreeSnapshot {
    match node {
        Node::Text(t) => TreeSnapshot::Text {
            value: t.value().to_string(),
        },
        Node::Element(el) => TreeSnapshot::Element {
            tag: el.tag.clone(),
            props: el
                .props
                .iter()
                .map(|(k, v)| (k.clone(), prop_text(v)))
                .collect(),
            children: el
                .children
                .iter()
                .map(|c| c.as_ref().map(snapshot))
                .collect(),
        },
        Node::Component(c) => TreeSnapshot::Component {
            name: short_name(c.name()).to_string(),
            result: c.result().map(|r| Box::new(snapshot(r))),
        },
    }
}

/// Indented outline of a virtual tree, one node per line.
pub fn dump_tree(node: &Node) -> String {
    let mut out = String::new();
    write_outline(&mut out, node, 0);
    out
}

fn write_outline(out: &mut String, node: &Node, depth: usize) {
    let pad = "  ".repeat(depth);
    match node {
        Node::Text(t) => {
            let _ = writeln!(out, "{pad}{:?}", t.value());
        }
        Node::Element(el) => {
            let _ = write!(out, "{pad}<{}", el.tag);
            for (name, value) in &el.props {
                let _ = write!(out, " {name}={}", prop_text(value));
            }
            let _ = writeln!(out, ">");
            for child in &el.children {
                match child {
                    Some(child) => write_outline(out, child, depth + 1),
                    None => {
                        let _ = writeln!(out, "{pad}  (hole)");
                    }
                }
            }
        }
        Node::Component(c) => {
            let _ = writeln!(out, "{pad}{}()", short_name(c.name()));
            match c.result() {
                Some(result) => write_outline(out, result, depth + 1),
                None => {
                    let _ = writeln!(out, "{pad}  (not mounted)");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use twig_core::{component, element, text};
    use twig_dom::Document;

    use super::*;
    use crate::Inspector;

    fn greeting(name: &&'static str) -> Node {
        element("p").text(format!("hi {name}")).into()
    }

    #[test]
    fn test_dump_unmounted_tree() {
        let tree: Node = element("ul")
            .attr("className", "list")
            .child(element("li").text("a"))
            .hole()
            .child(component(greeting, "bo"))
            .into();

        insta::assert_snapshot!(dump_tree(&tree), @r#"
        <ul className="list">
          <li>
            "a"
          (hole)
          greeting()
            (not mounted)
        "#);
    }

    #[test]
    fn test_snapshot_of_rendered_tree() {
        let doc = Document::new();
        let root = doc.create_root();
        root.render(element("main").on("onClick", |_| {}).child(component(greeting, "bo")))
            .unwrap();

        let snap = Inspector::new().tree(&root);
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["type"], "element");
        assert_eq!(json["tag"], "div");
        let main = &json["children"][0];
        assert_eq!(main["props"]["onClick"], "<handler>");
        let comp = &main["children"][0];
        assert_eq!(comp["name"], "greeting");
        assert_eq!(comp["result"]["children"][0]["value"], "hi bo");
    }

    #[test]
    fn test_text_snapshot() {
        assert_eq!(
            snapshot(&text("x")),
            TreeSnapshot::Text {
                value: "x".to_string()
            }
        );
    }
}
