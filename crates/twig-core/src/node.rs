//! # Virtual tree
//!
//! A [`Node`] is a cheap description of what the presentation tree should look
//! like. There are exactly three shapes:
//!
//! - [`Text`]: a string leaf.
//! - [`Element`]: a native element: tag, props and positional children.
//!   A `None` child is a hole ("no node here"), not an empty node.
//! - [`Component`]: a function plus its props. The function runs during
//!   reconciliation and its output is stored in the node's `result`.
//!
//! ```rust
//! use twig_core::*;
//!
//! let list = element("ol")
//!     .attr("className", "todo")
//!     .child(element("li").text("A"))
//!     .hole()
//!     .child(element("li").text("B"));
//!
//! assert_eq!(list.children.len(), 3);
//! assert!(list.children[1].is_none());
//! ```

use std::any::{Any, TypeId};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

#[derive(Clone, Debug)]
pub enum Node {
    Text(Text),
    Element(Element),
    Component(Component),
}

/// Discriminant used to decide whether two nodes may be patched in place.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType<'a> {
    Text,
    Tag(&'a str),
    Component(ComponentId),
}

impl Node {
    pub fn node_type(&self) -> NodeType<'_> {
        match self {
            Node::Text(_) => NodeType::Text,
            Node::Element(el) => NodeType::Tag(&el.tag),
            Node::Component(c) => NodeType::Component(c.id),
        }
    }

    pub fn is_compatible(&self, other: &Node) -> bool {
        self.node_type() == other.node_type()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Text {
    value: String,
}

impl Text {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

#[derive(Clone, Debug, Default)]
pub struct Element {
    pub tag: String,
    pub props: BTreeMap<String, PropValue>,
    pub children: Vec<Option<Node>>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            props: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn prop(&self, name: &str) -> Option<&PropValue> {
        self.props.get(name)
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Binds an event prop (e.g. `onClick`) to a fresh handler.
    pub fn on(self, name: impl Into<String>, f: impl Fn(&Event) + 'static) -> Self {
        self.handler(name, Handler::new(f))
    }

    /// Binds an event prop to an existing handler, keeping its identity.
    pub fn handler(self, name: impl Into<String>, handler: Handler) -> Self {
        self.attr(name, PropValue::Handler(handler))
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(Some(node.into()));
        self
    }

    pub fn maybe_child(mut self, node: Option<impl Into<Node>>) -> Self {
        self.children.push(node.map(Into::into));
        self
    }

    pub fn hole(mut self) -> Self {
        self.children.push(None);
        self
    }

    pub fn text(self, value: impl Into<String>) -> Self {
        self.child(Text::new(value))
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Option<Node>>) -> Self {
        self.children.extend(children);
        self
    }
}

/// Identity of a component function.
///
/// A `fn` item or closure expression has a type of its own, so the type alone
/// names it: every call site naming the same function yields the same id, and
/// clones of one closure are one component. Callables whose type is shared by
/// many functions are told apart by reference instead:
///
/// - `fn(&P) -> Node` pointers by the address they point to;
/// - `Box<dyn Fn(&P) -> Node>` and `&dyn Fn(&P) -> Node` get a fresh id per
///   [`Component`], kept by its clones. Passing a new trait object mounts a
///   new instance.
#[derive(Clone, Copy)]
pub struct ComponentId {
    type_id: TypeId,
    origin: Origin,
    name: &'static str,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
enum Origin {
    Type,
    Address(usize),
    Unique(u64),
}

thread_local! {
    static NEXT_UNIQUE: Cell<u64> = const { Cell::new(0) };
}

fn unique_origin() -> Origin {
    NEXT_UNIQUE.with(|next| {
        let id = next.get();
        next.set(id + 1);
        Origin::Unique(id)
    })
}

impl ComponentId {
    /// Identity shared by every value of `F`.
    pub fn of<F: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<F>(),
            origin: Origin::Type,
            name: std::any::type_name::<F>(),
        }
    }

    /// Identity of the callable `f`.
    pub fn of_val<P, F>(f: &F) -> Self
    where
        P: 'static,
        F: Fn(&P) -> Node + 'static,
    {
        let any: &dyn Any = f;
        let origin = if let Some(ptr) = any.downcast_ref::<fn(&P) -> Node>() {
            Origin::Address(*ptr as usize)
        } else if any.is::<Box<dyn Fn(&P) -> Node>>()
            || any.is::<&'static dyn Fn(&P) -> Node>()
        {
            unique_origin()
        } else {
            Origin::Type
        };
        Self {
            origin,
            ..Self::of::<F>()
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ComponentId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.origin == other.origin
    }
}

impl Eq for ComponentId {}

impl std::hash::Hash for ComponentId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.origin.hash(state);
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            Origin::Type => f.write_str(self.name),
            Origin::Address(addr) => write!(f, "{}@{addr:#x}", self.name),
            Origin::Unique(id) => write!(f, "{}#{id}", self.name),
        }
    }
}

#[derive(Clone)]
pub struct Component {
    id: ComponentId,
    props: Rc<dyn Any>,
    body: Rc<dyn Fn() -> Node>,
    pub(crate) result: Option<Box<Node>>,
}

impl Component {
    pub fn new<P, F>(f: F, props: P) -> Self
    where
        P: 'static,
        F: Fn(&P) -> Node + 'static,
    {
        let id = ComponentId::of_val::<P, F>(&f);
        let props = Rc::new(props);
        let body = {
            let props = props.clone();
            move || f(props.as_ref())
        };
        Self {
            id,
            props,
            body: Rc::new(body),
            result: None,
        }
    }

    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.id.name
    }

    pub fn props<P: 'static>(&self) -> Option<&P> {
        self.props.downcast_ref()
    }

    /// Output of the last evaluation; `None` until the component has been mounted.
    pub fn result(&self) -> Option<&Node> {
        self.result.as_deref()
    }

    pub(crate) fn invoke(&self) -> Node {
        (self.body)()
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("id", &self.id)
            .field("result", &self.result)
            .finish()
    }
}

#[derive(Clone)]
pub struct Handler(Rc<dyn Fn(&Event)>);

impl Handler {
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self(Rc::new(f))
    }

    pub fn call(&self, event: &Event) {
        (self.0)(event)
    }

    /// Reference identity; two handlers built from the same closure value
    /// are still different handlers.
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        std::ptr::addr_eq(Rc::as_ptr(&self.0), Rc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handler({:p})", Rc::as_ptr(&self.0))
    }
}

/// Event delivered to a [`Handler`].
#[derive(Clone, Debug, Default)]
pub struct Event {
    kind: String,
    value: Option<String>,
    default_prevented: Cell<bool>,
}

impl Event {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ..Self::default()
        }
    }

    /// Current `value` of the event target (form fields).
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn prevent_default(&self) {
        self.default_prevented.set(true);
    }

    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented.get()
    }
}

#[derive(Clone, Debug, Default)]
pub enum PropValue {
    Str(String),
    Number(f64),
    Bool(bool),
    Handler(Handler),
    #[default]
    Undefined,
}

impl PropValue {
    pub fn as_handler(&self) -> Option<&Handler> {
        match self {
            PropValue::Handler(h) => Some(h),
            _ => None,
        }
    }

    /// String written when this value lands on an element-state property.
    pub fn to_property_string(&self) -> String {
        match self {
            PropValue::Str(s) => s.clone(),
            PropValue::Number(n) => n.to_string(),
            PropValue::Bool(b) => b.to_string(),
            PropValue::Handler(_) | PropValue::Undefined => String::new(),
        }
    }
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Number(a), PropValue::Number(b)) => a == b,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Handler(a), PropValue::Handler(b)) => a.ptr_eq(b),
            (PropValue::Undefined, PropValue::Undefined) => true,
            _ => false,
        }
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Str(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::Str(v)
    }
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

impl From<f64> for PropValue {
    fn from(v: f64) -> Self {
        PropValue::Number(v)
    }
}

impl From<i32> for PropValue {
    fn from(v: i32) -> Self {
        PropValue::Number(f64::from(v))
    }
}

impl From<u32> for PropValue {
    fn from(v: u32) -> Self {
        PropValue::Number(f64::from(v))
    }
}

impl From<Handler> for PropValue {
    fn from(v: Handler) -> Self {
        PropValue::Handler(v)
    }
}

impl<T: Into<PropValue>> From<Option<T>> for PropValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(PropValue::Undefined, Into::into)
    }
}

impl From<Text> for Node {
    fn from(v: Text) -> Self {
        Node::Text(v)
    }
}

impl From<Element> for Node {
    fn from(v: Element) -> Self {
        Node::Element(v)
    }
}

impl From<Component> for Node {
    fn from(v: Component) -> Self {
        Node::Component(v)
    }
}

impl From<&str> for Node {
    fn from(v: &str) -> Self {
        Node::Text(Text::new(v))
    }
}

impl From<String> for Node {
    fn from(v: String) -> Self {
        Node::Text(Text::new(v))
    }
}

pub fn element(tag: impl Into<String>) -> Element {
    Element::new(tag)
}

pub fn text(value: impl Into<String>) -> Node {
    Node::Text(Text::new(value))
}

/// Function element: `f` runs with `props` whenever the node is reconciled.
pub fn component<P, F>(f: F, props: P) -> Node
where
    P: 'static,
    F: Fn(&P) -> Node + 'static,
{
    Node::Component(Component::new(f, props))
}
