use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};
use smallvec::smallvec;
use twig_core::{
    Error, Event, Handler, IdleQueue, IdleScheduler, NodeKind, Presentation, RenderOptions,
    Result, Root, Task,
};

use crate::mutation::{Mutation, MutationKinds, MutationLog};

new_key_type! {
    pub struct NodeId;
}

pub(crate) enum NodeData {
    Element(ElementData),
    Text(String),
    Comment(String),
}

pub(crate) struct ElementData {
    pub(crate) tag: String,
    pub(crate) attrs: BTreeMap<String, String>,
    pub(crate) props: HashMap<String, String>,
    pub(crate) listeners: Vec<(String, Handler)>,
}

pub(crate) struct DomNode {
    pub(crate) data: NodeData,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
}

pub(crate) struct Inner {
    pub(crate) nodes: SlotMap<NodeId, DomNode>,
    pub(crate) body: NodeId,
    mutations: Vec<Mutation>,
}

/// Single-threaded in-memory document.
///
/// Nodes live in an arena and are addressed by [`NodeId`]. Detached nodes stay
/// valid until a root releases them after removing or replacing them; their
/// ids then stop resolving. Changes to nodes attached to the body are recorded
/// in a mutation log, the way a subtree mutation observer on the body would
/// see them (plus property writes and listener changes).
///
/// The document doubles as the idle scheduler for roots rendered into it:
/// nothing deferred runs until [`Document::run_idle`] or
/// [`Document::run_until_idle`] is called.
#[derive(Clone)]
pub struct Document {
    pub(crate) inner: Rc<RefCell<Inner>>,
    idle: IdleQueue,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let body = nodes.insert(DomNode {
            data: NodeData::Element(ElementData::new("body")),
            parent: None,
            children: Vec::new(),
        });
        Self {
            inner: Rc::new(RefCell::new(Inner {
                nodes,
                body,
                mutations: Vec::new(),
            })),
            idle: IdleQueue::new(),
        }
    }

    pub fn body(&self) -> NodeId {
        self.inner.borrow().body
    }

    /// Root rendering into the body, scheduled on this document's idle queue.
    pub fn create_root(&self) -> Root<Document> {
        self.create_root_with(RenderOptions::default())
    }

    pub fn create_root_with(&self, options: RenderOptions) -> Root<Document> {
        Root::with_options(self.clone(), self.body(), Rc::new(self.clone()), options)
    }

    pub fn idle(&self) -> &IdleQueue {
        &self.idle
    }

    /// Runs one idle turn; returns how many tasks ran.
    pub fn run_idle(&self) -> usize {
        self.idle.run_pending()
    }

    pub fn run_until_idle(&self) -> usize {
        self.idle.run_until_idle()
    }

    pub fn create_comment(&self, data: impl Into<String>) -> NodeId {
        self.inner.borrow_mut().nodes.insert(DomNode {
            data: NodeData::Comment(data.into()),
            parent: None,
            children: Vec::new(),
        })
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.inner.borrow().nodes.contains_key(node)
    }

    /// Number of nodes in the arena, detached ones included.
    pub fn node_count(&self) -> usize {
        self.inner.borrow().nodes.len()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.borrow().nodes.get(node).and_then(|n| n.parent)
    }

    /// Every child, comments included.
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner
            .borrow()
            .nodes
            .get(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Element children only.
    pub fn element_children(&self, node: NodeId) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        inner
            .nodes
            .get(node)
            .map(|n| {
                n.children
                    .iter()
                    .copied()
                    .filter(|c| matches!(inner.nodes[*c].data, NodeData::Element(_)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn tag_name(&self, node: NodeId) -> Option<String> {
        self.with_element(node, |el| el.tag.clone()).ok()
    }

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.with_element(node, |el| el.attrs.get(name).cloned())
            .ok()
            .flatten()
    }

    pub fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.attribute(node, name).is_some()
    }

    /// Data of a text or comment node.
    pub fn data(&self, node: NodeId) -> Option<String> {
        match &self.inner.borrow().nodes.get(node)?.data {
            NodeData::Text(s) | NodeData::Comment(s) => Some(s.clone()),
            NodeData::Element(_) => None,
        }
    }

    pub fn listener_count(&self, node: NodeId, event: &str) -> usize {
        self.with_element(node, |el| {
            el.listeners.iter().filter(|(e, _)| e == event).count()
        })
        .unwrap_or(0)
    }

    /// Whether `node` is the body or one of its descendants.
    pub fn is_connected(&self, node: NodeId) -> bool {
        self.inner.borrow().is_connected(node)
    }

    pub fn take_mutations(&self) -> Vec<Mutation> {
        std::mem::take(&mut self.inner.borrow_mut().mutations)
    }

    pub fn take_mutations_of(&self, kinds: MutationKinds) -> Vec<Mutation> {
        self.take_mutations()
            .into_iter()
            .filter(|m| kinds.contains(m.kind()))
            .collect()
    }

    pub fn mutation_count(&self) -> usize {
        self.inner.borrow().mutations.len()
    }

    /// True when an attribute mutation for `name` on `node` is waiting in the
    /// log.
    pub fn attribute_changed(&self, node: NodeId, name: &str) -> bool {
        self.inner
            .borrow()
            .mutations
            .as_slice()
            .touches_attribute(node, name)
    }

    /// Fires `kind` at `node`. The event carries the node's current `value`
    /// property, if it has one. Listeners run in registration order, with the
    /// document unborrowed so they may touch it.
    pub fn dispatch(&self, node: NodeId, kind: &str) -> Event {
        let (handlers, value) = {
            let inner = self.inner.borrow();
            match inner.nodes.get(node).map(|n| &n.data) {
                Some(NodeData::Element(el)) => (
                    el.listeners
                        .iter()
                        .filter(|(e, _)| e == kind)
                        .map(|(_, h)| h.clone())
                        .collect::<Vec<_>>(),
                    el.props.get("value").cloned(),
                ),
                _ => (Vec::new(), None),
            }
        };

        let event = match value {
            Some(value) => Event::new(kind).with_value(value),
            None => Event::new(kind),
        };
        log::trace!("dispatching {kind} to {node:?} ({} listeners)", handlers.len());
        for handler in handlers {
            handler.call(&event);
        }
        event
    }

    pub fn click(&self, node: NodeId) -> Event {
        self.dispatch(node, "click")
    }

    /// Simulates typing: replaces the `value` property, then fires `input`.
    pub fn type_text(&self, node: NodeId, value: &str) -> Result<Event> {
        self.set_property(&node, "value", value)?;
        Ok(self.dispatch(node, "input"))
    }

    fn node_err(node: NodeId) -> Error {
        Error::Backend(format!("unknown node {node:?}"))
    }

    pub(crate) fn with_element<R>(
        &self,
        node: NodeId,
        f: impl FnOnce(&ElementData) -> R,
    ) -> Result<R> {
        let inner = self.inner.borrow();
        match &inner.nodes.get(node).ok_or_else(|| Self::node_err(node))?.data {
            NodeData::Element(el) => Ok(f(el)),
            other => Err(Error::IncompatiblePresentationNode {
                expected: NodeKind::Element,
                found: other.kind(),
            }),
        }
    }

    fn with_element_mut<R>(
        &self,
        node: NodeId,
        f: impl FnOnce(&mut ElementData) -> R,
    ) -> Result<(R, bool)> {
        let mut inner = self.inner.borrow_mut();
        let connected = inner.is_connected(node);
        match &mut inner
            .nodes
            .get_mut(node)
            .ok_or_else(|| Self::node_err(node))?
            .data
        {
            NodeData::Element(el) => Ok((f(el), connected)),
            other => Err(Error::IncompatiblePresentationNode {
                expected: NodeKind::Element,
                found: other.kind(),
            }),
        }
    }

    fn record(&self, connected: bool, mutation: Mutation) {
        if connected {
            self.inner.borrow_mut().mutations.push(mutation);
        }
    }

    fn insert_node(&self, data: NodeData) -> NodeId {
        self.inner.borrow_mut().nodes.insert(DomNode {
            data,
            parent: None,
            children: Vec::new(),
        })
    }

    /// Attaches `child` under `parent`, before `reference` or at the end,
    /// detaching it from its current parent first.
    fn attach(&self, parent: NodeId, child: NodeId, reference: Option<NodeId>) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if !inner.nodes.contains_key(child) {
            return Err(Self::node_err(child));
        }
        match inner.nodes.get(parent).map(|n| &n.data) {
            Some(NodeData::Element(_)) => {}
            Some(other) => {
                return Err(Error::IncompatiblePresentationNode {
                    expected: NodeKind::Element,
                    found: other.kind(),
                });
            }
            None => return Err(Self::node_err(parent)),
        }
        if inner.is_inclusive_ancestor(child, parent) {
            return Err(Error::Backend(format!(
                "cannot insert {child:?} into its own subtree"
            )));
        }
        if let Some(reference) = reference
            && inner.nodes[reference].parent != Some(parent)
        {
            return Err(Error::Backend(format!(
                "{reference:?} is not a child of {parent:?}"
            )));
        }

        inner.detach(child);
        let siblings = &mut inner.nodes[parent].children;
        let index = reference
            .and_then(|r| siblings.iter().position(|c| *c == r))
            .unwrap_or(siblings.len());
        siblings.insert(index, child);
        inner.nodes[child].parent = Some(parent);

        if inner.is_connected(parent) {
            inner.mutations.push(Mutation::ChildList {
                target: parent,
                added: smallvec![child],
                removed: smallvec![],
            });
        }
        Ok(())
    }
}

impl NodeData {
    fn kind(&self) -> NodeKind {
        match self {
            NodeData::Element(_) => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Comment(_) => NodeKind::Other,
        }
    }
}

impl ElementData {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            props: HashMap::new(),
            listeners: Vec::new(),
        }
    }
}

impl Inner {
    fn is_connected(&self, node: NodeId) -> bool {
        self.is_inclusive_ancestor(self.body, node)
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut cursor = Some(node);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.nodes.get(current).and_then(|n| n.parent);
        }
        false
    }

    /// Unlinks `node` from its parent, recording the removal when the parent
    /// was connected. Returns the former parent.
    fn detach(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.nodes.get_mut(node)?.parent.take()?;
        self.nodes[parent].children.retain(|c| *c != node);
        if self.is_connected(parent) {
            self.mutations.push(Mutation::ChildList {
                target: parent,
                added: smallvec![],
                removed: smallvec![node],
            });
        }
        Some(parent)
    }
}

impl Presentation for Document {
    type Node = NodeId;

    fn create_element(&self, tag: &str) -> Result<NodeId> {
        if tag.is_empty() {
            return Err(Error::MissingTag);
        }
        Ok(self.insert_node(NodeData::Element(ElementData::new(tag))))
    }

    fn create_text(&self, value: &str) -> Result<NodeId> {
        Ok(self.insert_node(NodeData::Text(value.to_string())))
    }

    fn kind(&self, node: &NodeId) -> NodeKind {
        self.inner
            .borrow()
            .nodes
            .get(*node)
            .map_or(NodeKind::Other, |n| n.data.kind())
    }

    fn child_nodes(&self, node: &NodeId) -> Vec<NodeId> {
        self.children(*node)
    }

    fn append_child(&self, parent: &NodeId, child: &NodeId) -> Result<()> {
        self.attach(*parent, *child, None)
    }

    fn insert_before(&self, parent: &NodeId, child: &NodeId, reference: &NodeId) -> Result<()> {
        self.attach(*parent, *child, Some(*reference))
    }

    fn replace(&self, old: &NodeId, new: &NodeId) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if !inner.nodes.contains_key(*new) {
            return Err(Self::node_err(*new));
        }
        let parent = inner
            .nodes
            .get(*old)
            .ok_or_else(|| Self::node_err(*old))?
            .parent
            .ok_or(Error::MissingPresentationNode)?;
        if inner.is_inclusive_ancestor(*new, parent) {
            return Err(Error::Backend(format!(
                "cannot insert {new:?} into its own subtree"
            )));
        }

        // Detaching `new` first keeps the index of `old` stable.
        let new_was_attached = inner.nodes[*new].parent.is_some();
        if new_was_attached {
            inner.detach(*new);
        }
        let siblings = &mut inner.nodes[parent].children;
        let Some(index) = siblings.iter().position(|c| c == old) else {
            return Err(Error::MissingPresentationNode);
        };
        siblings[index] = *new;
        inner.nodes[*old].parent = None;
        inner.nodes[*new].parent = Some(parent);

        if inner.is_connected(parent) {
            inner.mutations.push(Mutation::ChildList {
                target: parent,
                added: smallvec![*new],
                removed: smallvec![*old],
            });
        }
        Ok(())
    }

    fn remove(&self, node: &NodeId) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        if !inner.nodes.contains_key(*node) {
            return Err(Self::node_err(*node));
        }
        inner
            .detach(*node)
            .map(|_| ())
            .ok_or(Error::MissingPresentationNode)
    }

    fn set_attribute(&self, node: &NodeId, name: &str, value: &str) -> Result<()> {
        let (old, connected) =
            self.with_element_mut(*node, |el| el.attrs.insert(name.to_string(), value.to_string()))?;
        self.record(
            connected,
            Mutation::Attribute {
                target: *node,
                name: name.to_string(),
                old,
            },
        );
        Ok(())
    }

    fn remove_attribute(&self, node: &NodeId, name: &str) -> Result<()> {
        let (old, connected) = self.with_element_mut(*node, |el| el.attrs.remove(name))?;
        if old.is_some() {
            self.record(
                connected,
                Mutation::Attribute {
                    target: *node,
                    name: name.to_string(),
                    old,
                },
            );
        }
        Ok(())
    }

    fn property(&self, node: &NodeId, name: &str) -> Option<String> {
        self.with_element(*node, |el| match name {
            "className" => Some(el.attrs.get("class").cloned().unwrap_or_default()),
            "value" => Some(el.props.get(name).cloned().unwrap_or_default()),
            _ => el.props.get(name).cloned(),
        })
        .ok()
        .flatten()
    }

    /// `className` reflects to the `class` attribute; every other property is
    /// stored on the node only.
    fn set_property(&self, node: &NodeId, name: &str, value: &str) -> Result<()> {
        if name == "className" {
            return self.set_attribute(node, "class", value);
        }
        let ((), connected) = self.with_element_mut(*node, |el| {
            el.props.insert(name.to_string(), value.to_string());
        })?;
        self.record(
            connected,
            Mutation::Property {
                target: *node,
                name: name.to_string(),
            },
        );
        Ok(())
    }

    fn add_listener(&self, node: &NodeId, event: &str, handler: &Handler) -> Result<()> {
        let (added, connected) = self.with_element_mut(*node, |el| {
            let present = el
                .listeners
                .iter()
                .any(|(e, h)| e == event && h.ptr_eq(handler));
            if !present {
                el.listeners.push((event.to_string(), handler.clone()));
            }
            !present
        })?;
        if added {
            self.record(
                connected,
                Mutation::Listener {
                    target: *node,
                    event: event.to_string(),
                    added: true,
                },
            );
        }
        Ok(())
    }

    fn remove_listener(&self, node: &NodeId, event: &str, handler: &Handler) -> Result<()> {
        let (removed, connected) = self.with_element_mut(*node, |el| {
            let before = el.listeners.len();
            el.listeners
                .retain(|(e, h)| !(e == event && h.ptr_eq(handler)));
            before != el.listeners.len()
        })?;
        if removed {
            self.record(
                connected,
                Mutation::Listener {
                    target: *node,
                    event: event.to_string(),
                    added: false,
                },
            );
        }
        Ok(())
    }

    fn set_text(&self, node: &NodeId, value: &str) -> Result<()> {
        let mut inner = self.inner.borrow_mut();
        let connected = inner.is_connected(*node);
        let entry = inner.nodes.get_mut(*node).ok_or_else(|| Self::node_err(*node))?;
        let old = match &mut entry.data {
            NodeData::Text(data) => std::mem::replace(data, value.to_string()),
            other => {
                return Err(Error::IncompatiblePresentationNode {
                    expected: NodeKind::Text,
                    found: other.kind(),
                });
            }
        };
        if connected {
            inner.mutations.push(Mutation::CharacterData {
                target: *node,
                old,
            });
        }
        Ok(())
    }

    /// Frees `node` and its subtree from the arena, unless something
    /// re-attached it in the meantime.
    fn release(&self, node: &NodeId) {
        self.free_detached(*node);
    }
}

impl Document {
    fn free_detached(&self, node: NodeId) {
        let mut inner = self.inner.borrow_mut();
        let detached = inner.nodes.get(node).is_some_and(|n| n.parent.is_none());
        if !detached || node == inner.body {
            return;
        }
        let mut stack = vec![node];
        let mut freed = 0;
        while let Some(current) = stack.pop() {
            if let Some(entry) = inner.nodes.remove(current) {
                stack.extend(entry.children);
                freed += 1;
            }
        }
        log::trace!("freed {freed} node(s) under {node:?}");
    }
}

impl IdleScheduler for Document {
    fn request_idle(&self, task: Task) {
        self.idle.request_idle(task);
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(inner) => f
                .debug_struct("Document")
                .field("nodes", &inner.nodes.len())
                .field("mutations", &inner.mutations.len())
                .field("idle", &self.idle)
                .finish(),
            Err(_) => f.write_str("Document { <borrowed> }"),
        }
    }
}
