//! Boundary to the live presentation tree (a DOM or an equivalent).
//!
//! The reconciler only ever talks to the tree through [`Presentation`]; it
//! never keeps its own copy of live nodes beyond a single render pass.

use crate::error::Result;
use crate::node::Handler;

/// Coarse node kind, used to filter children during reconciliation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Element,
    Text,
    /// Comments, processing instructions and the like; skipped by the
    /// positional child walk.
    Other,
}

pub trait Presentation {
    /// Cheap handle to a live node.
    type Node: Clone + 'static;

    fn create_element(&self, tag: &str) -> Result<Self::Node>;
    fn create_text(&self, value: &str) -> Result<Self::Node>;

    fn kind(&self, node: &Self::Node) -> NodeKind;
    fn child_nodes(&self, node: &Self::Node) -> Vec<Self::Node>;

    fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> Result<()>;
    fn insert_before(
        &self,
        parent: &Self::Node,
        child: &Self::Node,
        reference: &Self::Node,
    ) -> Result<()>;
    /// Puts `new` where `old` is in `old`'s parent.
    fn replace(&self, old: &Self::Node, new: &Self::Node) -> Result<()>;
    /// Detaches `node`; fails with `MissingPresentationNode` when it has no parent.
    fn remove(&self, node: &Self::Node) -> Result<()>;

    fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> Result<()>;
    fn remove_attribute(&self, node: &Self::Node, name: &str) -> Result<()>;

    fn property(&self, node: &Self::Node, name: &str) -> Option<String>;
    fn set_property(&self, node: &Self::Node, name: &str, value: &str) -> Result<()>;

    /// Adding a handler that is already attached for `event` is a no-op.
    fn add_listener(&self, node: &Self::Node, event: &str, handler: &Handler) -> Result<()>;
    /// Removes exactly `handler` (by identity) for `event`.
    fn remove_listener(&self, node: &Self::Node, event: &str, handler: &Handler) -> Result<()>;

    /// Replaces the data of a text node in place.
    fn set_text(&self, node: &Self::Node, value: &str) -> Result<()>;

    /// Called after `node` was removed or replaced during reconciliation; it
    /// and its descendants are never handed back to the backend. Anything kept
    /// on their behalf (listener closures, arena slots) can go.
    fn release(&self, _node: &Self::Node) {}
}
