use std::cell::RefCell;
use std::rc::Rc;

use js_sys::{Function, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;

use twig_core::{
    Error, Event, Handler, IdleScheduler, NodeKind, Presentation, RenderOptions, Result, Root,
    Task,
};

fn js_err(e: JsValue) -> Error {
    Error::Backend(format!("{e:?}"))
}

pub fn to_js(e: Error) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Installs the panic hook and routes `log` to the browser console.
pub fn init_logging(level: log::Level) {
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));
    let _ = console_log::init_with_level(level);
}

/// Root rendering into the element with id `container_id`.
pub fn create_root(container_id: &str) -> std::result::Result<Root<WebDocument>, JsValue> {
    create_root_with(container_id, RenderOptions::default())
}

pub fn create_root_with(
    container_id: &str,
    options: RenderOptions,
) -> std::result::Result<Root<WebDocument>, JsValue> {
    let doc = WebDocument::new()?;
    let container = doc
        .document
        .get_element_by_id(container_id)
        .ok_or_else(|| JsValue::from_str(&format!("no element with id `{container_id}`")))?;
    let idle = Rc::new(BrowserIdle {
        window: doc.window.clone(),
    });
    Ok(Root::with_options(doc, container.into(), idle, options))
}

struct Registered {
    node: web_sys::Node,
    event: String,
    handler: Handler,
    closure: Closure<dyn FnMut(web_sys::Event)>,
}

/// The page's document, seen through [`Presentation`].
///
/// Native listeners are wrapped closures; the registry keeps them alive and
/// maps each back to the [`Handler`] it was made from, so removal works by
/// handler identity.
#[derive(Clone)]
pub struct WebDocument {
    window: web_sys::Window,
    document: web_sys::Document,
    listeners: Rc<RefCell<Vec<Registered>>>,
}

impl WebDocument {
    pub fn new() -> std::result::Result<Self, JsValue> {
        let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
        let document = window
            .document()
            .ok_or_else(|| JsValue::from_str("no document"))?;
        Ok(Self {
            window,
            document,
            listeners: Rc::new(RefCell::new(Vec::new())),
        })
    }

    pub fn document(&self) -> &web_sys::Document {
        &self.document
    }

    fn element<'n>(&self, node: &'n web_sys::Node) -> Result<&'n web_sys::Element> {
        node.dyn_ref::<web_sys::Element>()
            .ok_or(Error::IncompatiblePresentationNode {
                expected: NodeKind::Element,
                found: self.kind(node),
            })
    }
}

fn event_from(native: &web_sys::Event) -> Event {
    let value = native
        .target()
        .and_then(|t| Reflect::get(&t, &JsValue::from_str("value")).ok())
        .and_then(|v| v.as_string());
    match value {
        Some(value) => Event::new(native.type_()).with_value(value),
        None => Event::new(native.type_()),
    }
}

impl Presentation for WebDocument {
    type Node = web_sys::Node;

    fn create_element(&self, tag: &str) -> Result<web_sys::Node> {
        if tag.is_empty() {
            return Err(Error::MissingTag);
        }
        self.document
            .create_element(tag)
            .map(Into::into)
            .map_err(js_err)
    }

    fn create_text(&self, value: &str) -> Result<web_sys::Node> {
        Ok(self.document.create_text_node(value).into())
    }

    fn kind(&self, node: &web_sys::Node) -> NodeKind {
        match node.node_type() {
            web_sys::Node::ELEMENT_NODE => NodeKind::Element,
            web_sys::Node::TEXT_NODE => NodeKind::Text,
            _ => NodeKind::Other,
        }
    }

    fn child_nodes(&self, node: &web_sys::Node) -> Vec<web_sys::Node> {
        let list = node.child_nodes();
        (0..list.length()).filter_map(|i| list.item(i)).collect()
    }

    fn append_child(&self, parent: &web_sys::Node, child: &web_sys::Node) -> Result<()> {
        parent.append_child(child).map(|_| ()).map_err(js_err)
    }

    fn insert_before(
        &self,
        parent: &web_sys::Node,
        child: &web_sys::Node,
        reference: &web_sys::Node,
    ) -> Result<()> {
        parent
            .insert_before(child, Some(reference))
            .map(|_| ())
            .map_err(js_err)
    }

    fn replace(&self, old: &web_sys::Node, new: &web_sys::Node) -> Result<()> {
        let parent = old.parent_node().ok_or(Error::MissingPresentationNode)?;
        parent.replace_child(new, old).map(|_| ()).map_err(js_err)
    }

    fn remove(&self, node: &web_sys::Node) -> Result<()> {
        let parent = node.parent_node().ok_or(Error::MissingPresentationNode)?;
        parent.remove_child(node).map(|_| ()).map_err(js_err)
    }

    fn set_attribute(&self, node: &web_sys::Node, name: &str, value: &str) -> Result<()> {
        self.element(node)?
            .set_attribute(name, value)
            .map_err(js_err)
    }

    fn remove_attribute(&self, node: &web_sys::Node, name: &str) -> Result<()> {
        self.element(node)?.remove_attribute(name).map_err(js_err)
    }

    fn property(&self, node: &web_sys::Node, name: &str) -> Option<String> {
        Reflect::get(node, &JsValue::from_str(name))
            .ok()
            .and_then(|v| v.as_string())
    }

    fn set_property(&self, node: &web_sys::Node, name: &str, value: &str) -> Result<()> {
        Reflect::set(node, &JsValue::from_str(name), &JsValue::from_str(value))
            .map(|_| ())
            .map_err(js_err)
    }

    fn add_listener(&self, node: &web_sys::Node, event: &str, handler: &Handler) -> Result<()> {
        let mut listeners = self.listeners.borrow_mut();
        if listeners
            .iter()
            .any(|l| &l.node == node && l.event == event && l.handler.ptr_eq(handler))
        {
            return Ok(());
        }

        let callback = handler.clone();
        let closure = Closure::wrap(Box::new(move |native: web_sys::Event| {
            let event = event_from(&native);
            callback.call(&event);
            if event.is_default_prevented() {
                native.prevent_default();
            }
        }) as Box<dyn FnMut(web_sys::Event)>);

        node.add_event_listener_with_callback(event, closure.as_ref().unchecked_ref())
            .map_err(js_err)?;
        listeners.push(Registered {
            node: node.clone(),
            event: event.to_string(),
            handler: handler.clone(),
            closure,
        });
        Ok(())
    }

    fn remove_listener(&self, node: &web_sys::Node, event: &str, handler: &Handler) -> Result<()> {
        let mut listeners = self.listeners.borrow_mut();
        let Some(index) = listeners
            .iter()
            .position(|l| &l.node == node && l.event == event && l.handler.ptr_eq(handler))
        else {
            return Ok(());
        };
        let registered = listeners.swap_remove(index);
        node.remove_event_listener_with_callback(event, registered.closure.as_ref().unchecked_ref())
            .map_err(js_err)
    }

    fn set_text(&self, node: &web_sys::Node, value: &str) -> Result<()> {
        match self.kind(node) {
            NodeKind::Text => {
                node.set_node_value(Some(value));
                Ok(())
            }
            found => Err(Error::IncompatiblePresentationNode {
                expected: NodeKind::Text,
                found,
            }),
        }
    }

    /// Unhooks and drops the closures registered on `node` or inside it.
    fn release(&self, node: &web_sys::Node) {
        let released: Vec<Registered> = {
            let mut listeners = self.listeners.borrow_mut();
            let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *listeners)
                .into_iter()
                .partition(|l| node.contains(Some(&l.node)));
            *listeners = kept;
            gone
        };
        for l in &released {
            let _ = l
                .node
                .remove_event_listener_with_callback(&l.event, l.closure.as_ref().unchecked_ref());
        }
        log::trace!("released {} listener(s)", released.len());
    }
}

/// `requestIdleCallback`, or a zero-delay timeout where the browser lacks it.
pub struct BrowserIdle {
    window: web_sys::Window,
}

impl BrowserIdle {
    pub fn new(window: web_sys::Window) -> Self {
        Self { window }
    }
}

impl IdleScheduler for BrowserIdle {
    fn request_idle(&self, task: Task) {
        let callback: Function = Closure::once_into_js(move || task()).unchecked_into();
        let native = Reflect::get(&self.window, &JsValue::from_str("requestIdleCallback"))
            .ok()
            .and_then(|f| f.dyn_into::<Function>().ok());

        let scheduled = match native {
            Some(request_idle_callback) => request_idle_callback
                .call1(&self.window, &callback)
                .map(|_| ()),
            None => self
                .window
                .set_timeout_with_callback_and_timeout_and_arguments_0(&callback, 0)
                .map(|_| ()),
        };
        if let Err(e) = scheduled {
            log::error!("failed to schedule idle task: {e:?}");
        }
    }
}
