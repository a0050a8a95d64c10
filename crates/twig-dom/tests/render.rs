use std::cell::Cell;
use std::rc::Rc;

use twig_core::{Error, Handler, Node, Presentation, RenderOptions, element, text};
use twig_dom::{Document, MutationKinds, MutationLog};

fn list(items: &[Option<&str>]) -> Node {
    element("ol")
        .with_children(
            items
                .iter()
                .map(|item| item.map(|t| element("li").text(t).into())),
        )
        .into()
}

fn ol(doc: &Document) -> twig_dom::NodeId {
    doc.query_selector(doc.body(), "ol").expect("list rendered")
}

fn items(doc: &Document) -> Vec<String> {
    doc.element_children(ol(doc))
        .into_iter()
        .map(|li| doc.text_content(li))
        .collect()
}

#[test]
fn renders_into_body() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(
        element("div")
            .attr("className", "container")
            .text("Hello World"),
    )
    .unwrap();

    let container = doc.query_selector(doc.body(), ".container").unwrap();
    assert_eq!(doc.inner_html(container), "Hello World");
    insta::assert_snapshot!(
        doc.inner_html(doc.body()),
        @r#"<div class="container">Hello World</div>"#
    );
}

#[test]
fn removing_first_item_is_one_removal() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(list(&[Some("A"), Some("B"), Some("C")])).unwrap();
    let before = doc.element_children(ol(&doc));
    doc.take_mutations();

    let stats = root.render(list(&[Some("B"), Some("C")])).unwrap();

    assert_eq!(items(&doc), ["B", "C"]);
    let mutations = doc.take_mutations();
    assert_eq!(mutations.removed_count(), 1);
    assert_eq!(mutations.added_count(), 0);
    assert_eq!(stats.removed, 1);
    assert_eq!(stats.text_updates, 2);
    // Positional matching: the first two live items are kept and patched.
    assert_eq!(doc.element_children(ol(&doc)), before[..2]);
}

#[test]
fn rendering_same_tree_twice_is_a_no_op() {
    let doc = Document::new();
    let root = doc.create_root();
    let tree = || {
        element("form")
            .attr("className", "signup")
            .attr("method", "post")
            .attr("novalidate", true)
            .child(element("input").attr("value", "x").attr("tabindex", 2))
            .child(element("p").text("fine print"))
    };
    root.render(tree()).unwrap();
    let markup = doc.inner_html(doc.body());
    doc.take_mutations();

    let stats = root.render(tree()).unwrap();
    assert_eq!(stats.mutations(), 0);
    assert_eq!(doc.inner_html(doc.body()), markup);
    assert!(
        doc.take_mutations_of(MutationKinds::CHILD_LIST | MutationKinds::CHARACTER_DATA)
            .is_empty()
    );
    insta::assert_snapshot!(
        markup,
        @r#"<form class="signup" method="post" novalidate=""><input tabindex="2"><p>fine print</p></form>"#
    );
}

#[test]
fn holes_render_nothing() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(list(&[Some("A"), None, Some("C")])).unwrap();
    assert_eq!(items(&doc), ["A", "C"]);
}

#[test]
fn filling_a_hole_inserts_before_the_next_live_child() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(list(&[Some("A"), None, Some("C")])).unwrap();
    let c = doc.element_children(ol(&doc))[1];
    doc.take_mutations();

    let stats = root.render(list(&[Some("A"), Some("B"), Some("C")])).unwrap();
    assert_eq!(items(&doc), ["A", "B", "C"]);
    assert_eq!(stats.inserted, 1);
    assert_eq!(stats.text_updates, 0);
    assert_eq!(doc.element_children(ol(&doc))[2], c);
    assert_eq!(doc.take_mutations().added_count(), 1);
}

#[test]
fn opening_a_hole_removes_only_that_child() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(list(&[Some("A"), Some("B"), Some("C")])).unwrap();
    let stats = root.render(list(&[Some("A"), None, Some("C")])).unwrap();
    assert_eq!(items(&doc), ["A", "C"]);
    assert_eq!(stats.removed, 1);
    assert_eq!(stats.text_updates, 0);
}

#[test]
fn hole_to_hole_keeps_alignment() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(list(&[None, Some("B"), None, Some("D")])).unwrap();
    let stats = root
        .render(list(&[None, Some("b"), None, Some("d"), Some("e")]))
        .unwrap();
    assert_eq!(items(&doc), ["b", "d", "e"]);
    assert_eq!(stats.text_updates, 2);
    assert_eq!(stats.inserted, 1);
}

#[test]
fn growing_and_shrinking_lists() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(list(&[Some("A")])).unwrap();
    root.render(list(&[Some("A"), Some("B"), Some("C")])).unwrap();
    assert_eq!(items(&doc), ["A", "B", "C"]);
    let stats = root.render(list(&[])).unwrap();
    assert!(items(&doc).is_empty());
    assert_eq!(stats.removed, 3);
}

#[test]
fn text_changes_patch_in_place() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(element("p").text("before")).unwrap();
    let p = doc.query_selector(doc.body(), "p").unwrap();
    let node = doc.children(p)[0];

    root.render(element("p").text("after")).unwrap();
    assert_eq!(doc.children(p), vec![node]);
    assert_eq!(doc.data(node).as_deref(), Some("after"));
}

#[test]
fn changing_tag_replaces_the_node() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(element("p").text("x")).unwrap();
    let stats = root.render(element("section").text("x")).unwrap();
    assert_eq!(stats.replaced, 1);
    assert!(doc.query_selector(doc.body(), "p").is_none());
    assert!(doc.query_selector(doc.body(), "section").is_some());
}

#[test]
fn text_and_element_swap() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(element("div").text("plain")).unwrap();
    root.render(element("div").child(element("b").text("bold")))
        .unwrap();
    insta::assert_snapshot!(doc.inner_html(doc.body()), @"<div><b>bold</b></div>");
    root.render(element("div").child(text("plain"))).unwrap();
    insta::assert_snapshot!(doc.inner_html(doc.body()), @"<div>plain</div>");
}

#[test]
fn boolean_and_numeric_attributes() {
    let doc = Document::new();
    let root = doc.create_root();
    let button = |disabled: bool| {
        element("button")
            .attr("disabled", disabled)
            .attr("data-count", 1.5)
            .text("go")
    };
    root.render(button(false)).unwrap();
    let b = doc.query_selector(doc.body(), "button").unwrap();
    assert!(!doc.has_attribute(b, "disabled"));
    assert_eq!(doc.attribute(b, "data-count").as_deref(), Some("1.5"));

    root.render(button(true)).unwrap();
    assert_eq!(doc.attribute(b, "disabled").as_deref(), Some(""));

    root.render(button(false)).unwrap();
    assert!(!doc.has_attribute(b, "disabled"));
}

#[test]
fn removed_props_are_cleared() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(element("a").attr("href", "/home").attr("className", "nav"))
        .unwrap();
    let a = doc.query_selector(doc.body(), "a").unwrap();
    root.render(element("a")).unwrap();
    assert!(!doc.has_attribute(a, "href"));
    assert_eq!(doc.property(&a, "className").as_deref(), Some(""));
}

#[test]
fn element_state_is_rewritten_after_drift() {
    let doc = Document::new();
    let root = doc.create_root();
    let form = || element("input").attr("value", "draft");
    root.render(form()).unwrap();
    let input = doc.query_selector(doc.body(), "input").unwrap();
    assert_eq!(doc.property(&input, "value").as_deref(), Some("draft"));

    doc.type_text(input, "user typed").unwrap();
    let stats = root.render(form()).unwrap();
    assert_eq!(doc.property(&input, "value").as_deref(), Some("draft"));
    assert_eq!(stats.property_writes, 1);
    assert_eq!(stats.mutations(), 0);
}

#[test]
fn handlers_are_swapped_by_identity() {
    let doc = Document::new();
    let root = doc.create_root();
    let first = Rc::new(Cell::new(0));
    let second = Rc::new(Cell::new(0));
    let h1 = {
        let first = first.clone();
        Handler::new(move |_| first.set(first.get() + 1))
    };
    let h2 = {
        let second = second.clone();
        Handler::new(move |_| second.set(second.get() + 1))
    };
    let button = |h: Option<&Handler>| {
        let el = element("button").text("go");
        match h {
            Some(h) => el.handler("onClick", h.clone()),
            None => el,
        }
    };

    root.render(button(Some(&h1))).unwrap();
    let b = doc.query_selector(doc.body(), "button").unwrap();

    let stats = root.render(button(Some(&h1))).unwrap();
    assert_eq!(stats.listener_changes, 0);

    root.render(button(Some(&h2))).unwrap();
    assert_eq!(doc.listener_count(b, "click"), 1);
    doc.click(b);
    assert_eq!((first.get(), second.get()), (0, 1));

    root.render(button(None)).unwrap();
    assert_eq!(doc.listener_count(b, "click"), 0);
    doc.click(b);
    assert_eq!(second.get(), 1);
}

#[test]
fn handler_under_plain_prop_is_ignored() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(element("div").on("onHover", |_| {})).unwrap();
    let div = doc.query_selector(doc.body(), "div").unwrap();
    assert!(!doc.has_attribute(div, "onHover"));
    assert_eq!(doc.listener_count(div, "hover"), 0);
}

#[test]
fn custom_event_table() {
    let doc = Document::new();
    let root = doc.create_root_with(RenderOptions::new().with_event("onChange", "change"));
    let changed = Rc::new(Cell::new(false));
    {
        let changed = changed.clone();
        root.render(element("select").on("onChange", move |_| changed.set(true)))
            .unwrap();
    }
    let select = doc.query_selector(doc.body(), "select").unwrap();
    doc.dispatch(select, "change");
    assert!(changed.get());
}

#[test]
fn comments_are_skipped_by_the_child_walk() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(list(&[Some("A"), Some("B")])).unwrap();
    let list_node = ol(&doc);
    let marker = doc.create_comment("keep me");
    let first = doc.children(list_node)[0];
    doc.insert_before(&list_node, &marker, &first).unwrap();

    root.render(list(&[Some("A"), Some("b")])).unwrap();
    insta::assert_snapshot!(
        doc.inner_html(list_node),
        @"<!--keep me--><li>A</li><li>b</li>"
    );
}

#[test]
fn tampered_text_node_is_rebuilt() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(element("p").text("hello")).unwrap();
    let p = doc.query_selector(doc.body(), "p").unwrap();
    let original = doc.children(p)[0];
    let intruder = doc.create_element("em").unwrap();
    doc.replace(&original, &intruder).unwrap();

    let stats = root.render(element("p").text("bye")).unwrap();
    assert_eq!(stats.recovered, 1);
    assert_eq!(doc.inner_html(p), "bye");
}

#[test]
fn empty_tag_fails_the_render() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(element("p").text("ok")).unwrap();
    assert_eq!(
        root.render(element("div").child(element(""))).unwrap_err(),
        Error::MissingTag
    );
    assert!(root.render(element("p").text("still ok")).is_ok());
}

#[test]
fn unmount_clears_the_container() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(list(&[Some("A"), Some("B")])).unwrap();
    root.unmount().unwrap();
    assert!(doc.children(doc.body()).is_empty());
    root.render(list(&[Some("C")])).unwrap();
    assert_eq!(items(&doc), ["C"]);
}

#[test]
fn independent_roots() {
    let doc = Document::new();
    let left = doc.create_element("main").unwrap();
    let right = doc.create_element("aside").unwrap();
    doc.append_child(&doc.body(), &left).unwrap();
    doc.append_child(&doc.body(), &right).unwrap();

    let a = twig_core::Root::new(doc.clone(), left, Rc::new(doc.clone()));
    let b = twig_core::Root::new(doc.clone(), right, Rc::new(doc.clone()));
    a.render(text("left")).unwrap();
    b.render(text("right")).unwrap();
    a.render(text("left again")).unwrap();

    insta::assert_snapshot!(
        doc.inner_html(doc.body()),
        @"<main>left again</main><aside>right</aside>"
    );
}

#[test]
fn commit_observers_see_stats() {
    let doc = Document::new();
    let root = doc.create_root();
    let commits = Rc::new(Cell::new(0));
    {
        let commits = commits.clone();
        root.on_commit(move |stats| {
            assert!(stats.created > 0 || stats.mutations() == 0);
            commits.set(commits.get() + 1);
        });
    }
    root.render(element("p")).unwrap();
    root.render(element("p")).unwrap();
    assert_eq!(commits.get(), 2);
    assert_eq!(root.last_stats().mutations(), 0);
}

#[test]
fn replaced_and_removed_nodes_are_released() {
    let doc = Document::new();
    let root = doc.create_root();
    let clicks = Rc::new(Cell::new(0));
    let button = {
        let clicks = clicks.clone();
        element("button")
            .on("onClick", move |_| clicks.set(clicks.get() + 1))
            .text("go")
    };
    let baseline = doc.node_count();

    root.render(element("main").child(button)).unwrap();
    let b = doc.query_selector(doc.body(), "button").unwrap();
    assert_eq!(Rc::strong_count(&clicks), 2);

    root.render(element("main").child(element("span"))).unwrap();
    assert!(!doc.contains(b));
    assert_eq!(Rc::strong_count(&clicks), 1);
    assert_eq!(doc.node_count(), baseline + 2);

    root.unmount().unwrap();
    assert_eq!(doc.node_count(), baseline);
}

#[test]
fn failed_render_keeps_the_previous_tree() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(element("section").child(element("p").text("ok")))
        .unwrap();

    let err = root
        .render(
            element("section")
                .child(element("p").text("patched"))
                .child(element("")),
        )
        .unwrap_err();
    assert_eq!(err, Error::MissingTag);
    // The text patch went through before the failure.
    assert_eq!(doc.text_content(doc.body()), "patched");
    let kept = root.with_tree(|tree| format!("{tree:?}"));
    assert!(kept.contains("\"ok\""));
    assert!(!kept.contains("patched"));

    root.render(element("section").child(element("p").text("final")))
        .unwrap();
    assert_eq!(doc.inner_html(doc.body()), "<section><p>final</p></section>");
}
