use std::cell::{Cell, RefCell};
use std::rc::Rc;

use twig_core::{
    Error, Node, Root, component, deps, element, on_cleanup, text, use_effect, use_state,
};
use twig_dom::Document;

type Log = Rc<RefCell<Vec<String>>>;

fn submit_button(_: &()) -> Node {
    let (is_disabled, set_is_disabled) = use_state(false);
    element("button")
        .attr("disabled", is_disabled)
        .on("onClick", move |_| set_is_disabled.set(true))
        .text("Submit")
        .into()
}

#[test]
fn set_state_rerenders_on_idle() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(component(submit_button, ())).unwrap();
    let button = doc.query_selector(doc.body(), "button").unwrap();
    assert!(!doc.has_attribute(button, "disabled"));

    doc.click(button);
    // Never synchronous.
    assert!(!doc.has_attribute(button, "disabled"));
    assert!(root.is_render_pending());

    doc.take_mutations();
    doc.run_until_idle();
    assert!(doc.attribute_changed(button, "disabled"));
    assert!(doc.has_attribute(button, "disabled"));
    assert!(!root.is_render_pending());
}

fn counter(label: &&'static str) -> Node {
    let (count, set_count) = use_state(0);
    element("li")
        .on("onClick", move |_| set_count.set(count + 1))
        .text(format!("{label}: {count}"))
        .into()
}

fn texts(doc: &Document) -> Vec<String> {
    doc.query_selector_all(doc.body(), "li")
        .into_iter()
        .map(|li| doc.text_content(li))
        .collect()
}

#[test]
fn sibling_instances_keep_separate_state() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(
        element("ul")
            .child(component(counter, "a"))
            .child(component(counter, "b")),
    )
    .unwrap();
    assert_eq!(root.instance_count(), 2);

    let second = doc.query_selector_all(doc.body(), "li")[1];
    doc.click(second);
    doc.run_until_idle();
    doc.click(second);
    doc.run_until_idle();

    assert_eq!(texts(&doc), ["a: 0", "b: 2"]);
}

#[test]
fn state_survives_parent_rerenders() {
    let doc = Document::new();
    let root = doc.create_root();
    let tree = |title: &str| {
        element("section")
            .child(element("h1").text(title))
            .child(element("ul").child(component(counter, "n")))
    };
    root.render(tree("one")).unwrap();
    let li = doc.query_selector(doc.body(), "li").unwrap();
    doc.click(li);
    doc.run_until_idle();

    root.render(tree("two")).unwrap();
    assert_eq!(texts(&doc), ["n: 1"]);
    assert_eq!(doc.query_selector(doc.body(), "li"), Some(li));
}

#[test]
fn updates_before_the_render_coalesce() {
    let doc = Document::new();
    let root = doc.create_root();
    let commits = Rc::new(Cell::new(0));
    {
        let commits = commits.clone();
        root.on_commit(move |_| commits.set(commits.get() + 1));
    }
    let setter = Rc::new(RefCell::new(None));
    let app = {
        let setter = setter.clone();
        move |_: &()| -> Node {
            let (n, set_n) = use_state(0u32);
            *setter.borrow_mut() = Some(set_n);
            text(n.to_string())
        }
    };
    root.render(component(app, ())).unwrap();
    assert_eq!(commits.get(), 1);

    {
        let setter = setter.borrow();
        let set_n = setter.as_ref().unwrap();
        set_n.set(1);
        set_n.set(2);
        set_n.update(|n| n + 1);
    }
    assert_eq!(doc.idle().len(), 1);
    doc.run_until_idle();

    assert_eq!(commits.get(), 2);
    assert_eq!(doc.text_content(doc.body()), "3");
}

#[test]
fn setting_an_equal_value_does_not_render() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(component(submit_button, ())).unwrap();
    let button = doc.query_selector(doc.body(), "button").unwrap();
    doc.click(button);
    doc.run_until_idle();

    doc.click(button);
    assert!(!root.is_render_pending());
    assert!(doc.idle().is_empty());
}

#[test]
fn effects_follow_their_deps() {
    let doc = Document::new();
    let root = doc.create_root();
    let log: Log = Rc::default();
    let app = {
        let log = log.clone();
        move |page: &u32| -> Node {
            let page = *page;
            let log = log.clone();
            use_effect(
                move || {
                    log.borrow_mut().push(format!("open {page}"));
                    on_cleanup(move || log.borrow_mut().push(format!("close {page}")))
                },
                deps![page],
            );
            text(format!("page {page}"))
        }
    };

    root.render(component(app.clone(), 1)).unwrap();
    root.render(component(app.clone(), 1)).unwrap();
    assert_eq!(*log.borrow(), ["open 1"]);

    root.render(component(app.clone(), 2)).unwrap();
    assert_eq!(*log.borrow(), ["open 1", "close 1", "open 2"]);

    root.unmount().unwrap();
    assert_eq!(*log.borrow(), ["open 1", "close 1", "open 2", "close 2"]);
    assert_eq!(root.instance_count(), 0);
}

#[test]
fn effect_without_deps_runs_once() {
    let doc = Document::new();
    let root = doc.create_root();
    let runs = Rc::new(Cell::new(0));
    let app = {
        let runs = runs.clone();
        move |_: &()| -> Node {
            let runs = runs.clone();
            use_effect(move || runs.set(runs.get() + 1), deps![]);
            element("p").into()
        }
    };
    for _ in 0..3 {
        root.render(component(app.clone(), ())).unwrap();
    }
    assert_eq!(runs.get(), 1);
}

fn child(log: &Log) -> Node {
    let log = log.clone();
    use_effect(
        || on_cleanup(move || log.borrow_mut().push("child".into())),
        deps![],
    );
    text("child")
}

fn parent(log: &Log) -> Node {
    let cleanup_log = log.clone();
    use_effect(
        || on_cleanup(move || cleanup_log.borrow_mut().push("parent".into())),
        deps![],
    );
    element("div")
        .child(element("span").child(component(child, log.clone())))
        .into()
}

#[test]
fn replacing_a_component_unmounts_descendants_innermost_first() {
    let doc = Document::new();
    let root = doc.create_root();
    let log: Log = Rc::default();

    root.render(component(parent, log.clone())).unwrap();
    assert_eq!(root.instance_count(), 2);

    root.render(element("p").text("gone")).unwrap();
    assert_eq!(*log.borrow(), ["child", "parent"]);
    assert_eq!(root.instance_count(), 0);
}

#[test]
fn removed_child_component_is_unmounted() {
    let doc = Document::new();
    let root = doc.create_root();
    let log: Log = Rc::default();

    root.render(
        element("main")
            .child(element("header"))
            .child(component(child, log.clone())),
    )
    .unwrap();
    root.render(element("main").child(element("header"))).unwrap();
    assert_eq!(*log.borrow(), ["child"]);
    assert_eq!(root.instance_count(), 0);
}

#[test]
fn remount_starts_with_fresh_state() {
    let doc = Document::new();
    let root = doc.create_root();
    let app = || element("ul").child(component(counter, "x"));
    root.render(app()).unwrap();
    let li = doc.query_selector(doc.body(), "li").unwrap();
    doc.click(li);
    doc.run_until_idle();
    assert_eq!(texts(&doc), ["x: 1"]);

    root.render(element("ul").child(text("placeholder"))).unwrap();
    root.render(app()).unwrap();
    assert_eq!(texts(&doc), ["x: 0"]);
}

#[test]
fn state_only_components_release_state_on_unmount() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(component(submit_button, ())).unwrap();
    assert_eq!(root.instance_count(), 1);
    root.unmount().unwrap();
    assert_eq!(root.instance_count(), 0);
}

#[test]
fn hook_order_change_rebuilds_the_instance() {
    let doc = Document::new();
    let root = doc.create_root();
    let extra = Rc::new(Cell::new(false));
    let cleaned = Rc::new(Cell::new(false));
    let app = {
        let extra = extra.clone();
        let cleaned = cleaned.clone();
        move |_: &()| -> Node {
            let cleaned = cleaned.clone();
            use_effect(move || on_cleanup(move || cleaned.set(true)), deps![]);
            if extra.get() {
                let _ = use_state("surprise");
            }
            let (n, set_n) = use_state(5);
            element("output")
                .on("onClick", move |_| set_n.set(n * 2))
                .text(n.to_string())
                .into()
        }
    };

    root.render(component(app.clone(), ())).unwrap();
    let output = doc.query_selector(doc.body(), "output").unwrap();
    doc.click(output);
    doc.run_until_idle();
    assert_eq!(doc.text_content(output), "10");

    extra.set(true);
    let stats = root.render(component(app.clone(), ())).unwrap();
    assert_eq!(stats.recovered, 1);
    assert!(cleaned.get());
    let rebuilt = doc.query_selector(doc.body(), "output").unwrap();
    assert_ne!(rebuilt, output);
    assert_eq!(doc.text_content(rebuilt), "5");
}

#[test]
fn effects_may_request_renders() {
    let doc = Document::new();
    let root = doc.create_root();
    let commits = Rc::new(Cell::new(0));
    {
        let commits = commits.clone();
        root.on_commit(move |_| commits.set(commits.get() + 1));
    }
    let settle = |_: &()| -> Node {
        let (n, set_n) = use_state(0);
        use_effect(
            move || {
                if n < 3 {
                    set_n.set(n + 1);
                }
            },
            deps![n],
        );
        text(n.to_string())
    };

    root.render(component(settle, ())).unwrap();
    doc.run_until_idle();
    assert_eq!(doc.text_content(doc.body()), "3");
    assert_eq!(commits.get(), 4);
}

#[test]
fn rendering_from_inside_a_render_is_refused() {
    let doc = Document::new();
    let root = doc.create_root();
    let slot: Rc<RefCell<Option<Root<Document>>>> = Rc::default();
    let seen: Rc<RefCell<Option<Error>>> = Rc::default();
    let app = {
        let slot = slot.clone();
        let seen = seen.clone();
        move |_: &()| -> Node {
            let slot = slot.clone();
            let seen = seen.clone();
            use_effect(
                move || {
                    if let Some(root) = slot.borrow().as_ref() {
                        *seen.borrow_mut() = root.rerender().err();
                    }
                },
                deps![],
            );
            text("x")
        }
    };
    *slot.borrow_mut() = Some(root.clone());

    root.render(component(app, ())).unwrap();
    assert_eq!(*seen.borrow(), Some(Error::RenderInProgress));
    slot.borrow_mut().take();
}

#[test]
fn dropping_the_root_cancels_pending_renders() {
    let doc = Document::new();
    let root = doc.create_root();
    root.render(component(submit_button, ())).unwrap();
    let button = doc.query_selector(doc.body(), "button").unwrap();
    doc.click(button);
    drop(root);
    assert_eq!(doc.run_until_idle(), 1);
    assert!(!doc.has_attribute(button, "disabled"));
}

fn tracked(log: &Log, name: &'static str, initial: i32) -> Node {
    let (n, _) = use_state(initial);
    let log = log.clone();
    use_effect(
        move || {
            log.borrow_mut().push(format!("{name} mount"));
            on_cleanup(move || log.borrow_mut().push(format!("{name} unmount")))
        },
        deps![],
    );
    element("span").text(format!("{name}{n}")).into()
}

fn alpha(log: &Log) -> Node {
    tracked(log, "alpha", 1)
}

fn beta(log: &Log) -> Node {
    tracked(log, "beta", 2)
}

#[test]
fn swapping_fn_pointers_swaps_components() {
    type Body = fn(&Log) -> Node;
    let doc = Document::new();
    let root = doc.create_root();
    let log: Log = Rc::default();

    root.render(component(alpha as Body, log.clone())).unwrap();
    root.render(component(alpha as Body, log.clone())).unwrap();
    assert_eq!(*log.borrow(), ["alpha mount"]);

    root.render(component(beta as Body, log.clone())).unwrap();
    assert_eq!(doc.inner_html(doc.body()), "<span>beta2</span>");
    assert_eq!(*log.borrow(), ["alpha mount", "alpha unmount", "beta mount"]);
    assert_eq!(root.instance_count(), 1);
}

#[test]
fn each_boxed_component_is_a_new_instance() {
    type Boxed = Box<dyn Fn(&Log) -> Node>;
    let doc = Document::new();
    let root = doc.create_root();
    let log: Log = Rc::default();

    root.render(component(Box::new(alpha) as Boxed, log.clone()))
        .unwrap();
    root.rerender().unwrap();
    assert_eq!(*log.borrow(), ["alpha mount"]);

    root.render(component(Box::new(beta) as Boxed, log.clone()))
        .unwrap();
    assert_eq!(doc.inner_html(doc.body()), "<span>beta2</span>");
    assert_eq!(*log.borrow(), ["alpha mount", "alpha unmount", "beta mount"]);

    root.render(component(Box::new(beta) as Boxed, log.clone()))
        .unwrap();
    assert_eq!(log.borrow().len(), 5);
    assert_eq!(root.instance_count(), 1);
}
