//! Tree reconciliation.
//!
//! [`Reconciler::reconcile`] compares a previous virtual node with a new one
//! and patches the live node that mirrors the previous one:
//!
//! 1. no new node: the live node is removed;
//! 2. no previous node, or a different node type: a fresh subtree replaces
//!    the live node;
//! 3. two text nodes: the text data is rewritten in place when it changed;
//! 4. two instances of one component: the new one is evaluated and its output
//!    reconciled against the previous output, on the same live node;
//! 5. two elements with the same tag: props are patched, then children are
//!    walked by position.
//!
//! Whenever a virtual subtree goes away, every component inside it is
//! unmounted first, innermost first.

use crate::error::{Error, Result};
use crate::hooks::{HookRegistry, InstanceKey, InstancePath};
use crate::node::{Component, Element, Node, Text};
use crate::options::{RenderOptions, RenderStats};
use crate::presentation::{NodeKind, Presentation};
use crate::schedule::RenderRequest;

pub(crate) struct Reconciler<'a, D: Presentation> {
    pub(crate) doc: &'a D,
    pub(crate) hooks: &'a mut HookRegistry,
    pub(crate) request: &'a RenderRequest,
    pub(crate) options: &'a RenderOptions,
    pub(crate) stats: &'a mut RenderStats,
}

impl<D: Presentation> Reconciler<'_, D> {
    pub(crate) fn reconcile(
        &mut self,
        live: &D::Node,
        prev: Option<&Node>,
        new: Option<&mut Node>,
        path: &InstancePath,
    ) -> Result<()> {
        let Some(new) = new else {
            if let Some(prev) = prev {
                self.unmount_subtree(prev, path);
            }
            return self.remove(live);
        };
        let Some(prev) = prev.filter(|prev| prev.is_compatible(new)) else {
            return self.replace(live, prev, new, path);
        };

        let outcome = match (prev, &mut *new) {
            (Node::Text(p), Node::Text(n)) => self.patch_text(live, p, n),
            (Node::Component(p), Node::Component(n)) => self.patch_component(live, p, n, path),
            (Node::Element(p), Node::Element(n)) => self.patch_element(live, p, n, path),
            _ => Ok(()),
        };

        match outcome {
            Err(err) if err.is_recoverable() => {
                log::warn!("{err}; rebuilding subtree at {path:?}");
                self.stats.recovered += 1;
                self.replace(live, Some(prev), new, path)
            }
            other => other,
        }
    }

    fn patch_text(&mut self, live: &D::Node, prev: &Text, next: &Text) -> Result<()> {
        if prev.value() == next.value() {
            return Ok(());
        }
        match self.doc.kind(live) {
            NodeKind::Text => {
                self.doc.set_text(live, next.value())?;
                self.stats.text_updates += 1;
                Ok(())
            }
            found => Err(Error::IncompatiblePresentationNode {
                expected: NodeKind::Text,
                found,
            }),
        }
    }

    fn patch_component(
        &mut self,
        live: &D::Node,
        prev: &Component,
        next: &mut Component,
        path: &InstancePath,
    ) -> Result<()> {
        let key = InstanceKey::new(next.id(), path.clone());
        self.stats.evaluated += 1;
        let output = self.hooks.mount(next, &key, self.request)?;
        self.reconcile(live, prev.result(), Some(output), &path.result())
    }

    fn patch_element(
        &mut self,
        live: &D::Node,
        prev: &Element,
        next: &mut Element,
        path: &InstancePath,
    ) -> Result<()> {
        match self.doc.kind(live) {
            NodeKind::Element => {}
            found => {
                return Err(Error::IncompatiblePresentationNode {
                    expected: NodeKind::Element,
                    found,
                });
            }
        }
        self.patch_props(live, Some(prev), next)?;
        self.patch_children(live, prev, next, path)
    }

    /// Positional child walk. `cursor` indexes the live children snapshot
    /// and only moves when a virtual index consumed a live node.
    fn patch_children(
        &mut self,
        live: &D::Node,
        prev: &Element,
        next: &mut Element,
        path: &InstancePath,
    ) -> Result<()> {
        let live_children: Vec<D::Node> = self
            .doc
            .child_nodes(live)
            .into_iter()
            .filter(|child| matches!(self.doc.kind(child), NodeKind::Element | NodeKind::Text))
            .collect();

        let len = prev.children.len().max(next.children.len());
        let mut cursor = 0;

        for index in 0..len {
            let prev_child = prev.children.get(index).and_then(Option::as_ref);
            let next_child = next.children.get_mut(index).and_then(Option::as_mut);
            let child_path = path.child(index);

            match live_children.get(cursor) {
                Some(live_child) => match (prev_child, next_child) {
                    (Some(p), Some(n)) => self.reconcile(live_child, Some(p), Some(n), &child_path)?,
                    (Some(p), None) => {
                        self.unmount_subtree(p, &child_path);
                        self.remove(live_child)?;
                    }
                    (None, Some(n)) => {
                        let created = self.create(n, &child_path)?;
                        self.doc.insert_before(live, &created, live_child)?;
                        self.stats.inserted += 1;
                        continue;
                    }
                    (None, None) => continue,
                },
                None => {
                    if let Some(n) = next_child {
                        let created = self.create(n, &child_path)?;
                        self.doc.append_child(live, &created)?;
                        self.stats.inserted += 1;
                    }
                }
            }
            cursor += 1;
        }
        Ok(())
    }

    fn replace(
        &mut self,
        live: &D::Node,
        prev: Option<&Node>,
        new: &mut Node,
        path: &InstancePath,
    ) -> Result<()> {
        if let Some(prev) = prev {
            self.unmount_subtree(prev, path);
        }
        let created = self.create(new, path)?;
        self.doc.replace(live, &created)?;
        self.doc.release(live);
        self.stats.replaced += 1;
        Ok(())
    }

    fn remove(&mut self, live: &D::Node) -> Result<()> {
        match self.doc.remove(live) {
            Ok(()) => {
                self.doc.release(live);
                self.stats.removed += 1;
                Ok(())
            }
            Err(Error::MissingPresentationNode) => {
                log::debug!("skipping removal of a detached node");
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Builds a detached presentation subtree for `node`, evaluating the
    /// components inside it.
    pub(crate) fn create(&mut self, node: &mut Node, path: &InstancePath) -> Result<D::Node> {
        match node {
            Node::Text(text) => {
                let created = self.doc.create_text(text.value())?;
                self.stats.created += 1;
                Ok(created)
            }
            Node::Component(component) => {
                self.evaluate_fresh(component, path)?;
                let name = component.name();
                let output = component.result.as_deref_mut().ok_or(Error::NotMounted(name))?;
                self.create(output, &path.result())
            }
            Node::Element(el) => {
                if el.tag.is_empty() {
                    return Err(Error::MissingTag);
                }
                let created = self.doc.create_element(&el.tag)?;
                self.stats.created += 1;
                self.patch_props(&created, None, el)?;

                for (index, child) in el.children.iter_mut().enumerate() {
                    let Some(child) = child else {
                        continue;
                    };
                    let child_node = self.create(child, &path.child(index))?;
                    self.doc.append_child(&created, &child_node)?;
                }
                Ok(created)
            }
        }
    }

    /// Mounts a component that has no live counterpart. Leftover state that
    /// no longer fits its hooks is discarded and the evaluation retried.
    fn evaluate_fresh(&mut self, component: &mut Component, path: &InstancePath) -> Result<()> {
        let key = InstanceKey::new(component.id(), path.clone());
        self.stats.evaluated += 1;
        match self.hooks.mount(component, &key, self.request) {
            Ok(_) => Ok(()),
            Err(err) if err.is_recoverable() => {
                log::warn!("{err}; remounting {}", component.name());
                self.stats.recovered += 1;
                self.stats.evaluated += 1;
                self.hooks.unmount(component, &key);
                self.hooks.mount(component, &key, self.request).map(|_| ())
            }
            Err(err) => Err(err),
        }
    }

    fn unmount_subtree(&mut self, node: &Node, path: &InstancePath) {
        match node {
            Node::Text(_) => {}
            Node::Element(el) => {
                for (index, child) in el.children.iter().enumerate() {
                    if let Some(child) = child {
                        self.unmount_subtree(child, &path.child(index));
                    }
                }
            }
            Node::Component(component) => {
                if let Some(output) = component.result() {
                    self.unmount_subtree(output, &path.result());
                }
                let key = InstanceKey::new(component.id(), path.clone());
                if self.hooks.is_mounted(&key) {
                    self.stats.unmounted += 1;
                }
                self.hooks.unmount(component, &key);
            }
        }
    }
}
