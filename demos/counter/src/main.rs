use twig_core::prelude::*;
use twig_devtools::{Inspector, dump_tree};
use twig_dom::{Document, MutationKinds, MutationLog};

fn counter(label: &&'static str) -> Node {
    let (count, set_count) = use_state(0i32);
    use_effect(
        move || log::info!("count is now {count}"),
        deps![count],
    );

    element("div")
        .attr("className", "counter")
        .child(element("span").text(format!("{label}: {count}")))
        .child(
            element("button")
                .attr("id", "inc")
                .on("onClick", {
                    let set_count = set_count.clone();
                    move |_| set_count.update(|c| c + 1)
                })
                .text("Increment"),
        )
        .child(
            element("button")
                .attr("id", "dec")
                .attr("disabled", count == 0)
                .on("onClick", move |_| set_count.update(|c| c - 1))
                .text("Decrement"),
        )
        .into()
}

fn todo_list(_: &()) -> Node {
    let (items, set_items) = use_state(Vec::<String>::new());
    let (draft, set_draft) = use_state(String::new());

    let add = {
        let draft = draft.clone();
        let set_draft = set_draft.clone();
        move |e: &Event| {
            e.prevent_default();
            if draft.is_empty() {
                return;
            }
            set_items.update(|items| {
                let mut items = items.clone();
                items.push(draft.clone());
                items
            });
            set_draft.set(String::new());
        }
    };

    element("form")
        .on("onSubmit", add)
        .child(
            element("input")
                .attr("value", draft.clone())
                .on("onInput", move |e| {
                    set_draft.set(e.value().unwrap_or_default().to_string())
                }),
        )
        .child(
            element("ul").with_children(
                items
                    .iter()
                    .map(|item| Some(element("li").text(item.clone()).into())),
            ),
        )
        .maybe_child(items.is_empty().then(|| element("em").text("nothing yet")))
        .into()
}

fn app(_: &()) -> Node {
    element("main")
        .child(element("h1").text("twig"))
        .child(component(counter, "clicks"))
        .child(component(todo_list, ()))
        .into()
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let doc = Document::new();
    let root = doc.create_root();
    let inspector = Inspector::attach(&root);

    root.render(component(app, ()))?;
    println!("{}", doc.outer_html(doc.body()));

    let inc = doc
        .query_selector(doc.body(), "#inc")
        .ok_or_else(|| anyhow::anyhow!("increment button not rendered"))?;
    for _ in 0..3 {
        doc.click(inc);
    }
    doc.run_until_idle();

    let input = doc
        .query_selector(doc.body(), "input")
        .ok_or_else(|| anyhow::anyhow!("input not rendered"))?;
    let form = doc
        .query_selector(doc.body(), "form")
        .ok_or_else(|| anyhow::anyhow!("form not rendered"))?;
    for item in ["milk", "eggs"] {
        doc.type_text(input, item)?;
        doc.run_until_idle();
        doc.dispatch(form, "submit");
        doc.run_until_idle();
    }

    let changes = doc.take_mutations();
    println!(
        "{} mutations ({} child list)",
        changes.len(),
        changes.of_kind(MutationKinds::CHILD_LIST).len()
    );
    println!("{}", doc.outer_html(doc.body()));
    root.with_tree(|tree| print!("{}", dump_tree(tree)));
    println!("{}", inspector.summary());
    println!("{}", inspector.metrics_json()?);

    root.unmount()?;
    Ok(())
}
