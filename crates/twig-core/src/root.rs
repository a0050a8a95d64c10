//! Render binding: one virtual tree rendered into one container.
//!
//! A [`Root`] owns everything a tree needs between renders: the previous
//! virtual tree, the hook registry and the re-render request its setters
//! schedule through. Several roots can coexist; they share nothing.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use web_time::Instant;

use crate::error::{Error, Result};
use crate::hooks::{HookRegistry, InstancePath};
use crate::node::{Element, Node};
use crate::options::{RenderOptions, RenderStats};
use crate::presentation::Presentation;
use crate::reconcile::Reconciler;
use crate::schedule::{IdleScheduler, RenderRequest};

type Observer = Box<dyn FnMut(&RenderStats)>;

pub struct Root<D: Presentation> {
    shared: Rc<Shared<D>>,
}

struct Shared<D: Presentation> {
    state: RefCell<RootState<D>>,
    observers: RefCell<Vec<Observer>>,
    request: RenderRequest,
}

struct RootState<D: Presentation> {
    doc: D,
    container: D::Node,
    /// Virtual tree the container currently mirrors, wrapped in the
    /// implicit root element.
    previous: Node,
    /// Last node handed to `render`; re-evaluated by deferred renders.
    template: Option<Node>,
    hooks: HookRegistry,
    options: RenderOptions,
    last_stats: RenderStats,
}

impl<D: Presentation + 'static> Root<D> {
    /// Binds `container` as the live counterpart of the implicit root
    /// element. State setters schedule re-renders on `scheduler`.
    pub fn new(doc: D, container: D::Node, scheduler: Rc<dyn IdleScheduler>) -> Self {
        Self::with_options(doc, container, scheduler, RenderOptions::default())
    }

    pub fn with_options(
        doc: D,
        container: D::Node,
        scheduler: Rc<dyn IdleScheduler>,
        options: RenderOptions,
    ) -> Self {
        let previous = Node::Element(Element::new(options.root_tag()));
        let shared = Rc::new(Shared {
            state: RefCell::new(RootState {
                doc,
                container,
                previous,
                template: None,
                hooks: HookRegistry::new(),
                options,
                last_stats: RenderStats::default(),
            }),
            observers: RefCell::new(Vec::new()),
            request: RenderRequest::new(scheduler),
        });

        let weak: Weak<Shared<D>> = Rc::downgrade(&shared);
        shared.request.bind(move || {
            if let Some(shared) = weak.upgrade() {
                shared.deferred_render();
            }
        });
        Self { shared }
    }

    /// Renders `node` into the container, patching whatever the previous
    /// render left there.
    ///
    /// A hard error ([`Error::MissingTag`], [`Error::Backend`]) aborts the pass
    /// midway. Mutations and mounts applied before it stay, but the previous
    /// virtual tree is kept, so the next render diffs against the tree from
    /// before the failed one.
    pub fn render(&self, node: impl Into<Node>) -> Result<RenderStats> {
        {
            let mut state = self
                .shared
                .state
                .try_borrow_mut()
                .map_err(|_| Error::RenderInProgress)?;
            state.template = Some(node.into());
        }
        self.shared.rerender()
    }

    /// Renders the last template again. This is what state setters end up
    /// calling, one idle turn later.
    pub fn rerender(&self) -> Result<RenderStats> {
        self.shared.rerender()
    }

    /// Removes every rendered node and runs every pending cleanup.
    pub fn unmount(&self) -> Result<RenderStats> {
        {
            let mut state = self
                .shared
                .state
                .try_borrow_mut()
                .map_err(|_| Error::RenderInProgress)?;
            state.template = None;
        }
        self.shared.rerender()
    }

    /// Registers an observer called after every commit.
    pub fn on_commit(&self, f: impl FnMut(&RenderStats) + 'static) {
        self.shared.observers.borrow_mut().push(Box::new(f));
    }

    pub fn container(&self) -> D::Node {
        self.shared.state.borrow().container.clone()
    }

    pub fn last_stats(&self) -> RenderStats {
        self.shared.state.borrow().last_stats
    }

    /// Number of component instances currently holding hook state.
    pub fn instance_count(&self) -> usize {
        self.shared.state.borrow().hooks.instance_count()
    }

    pub fn is_render_pending(&self) -> bool {
        self.shared.request.is_pending()
    }

    /// Runs `f` with the virtual tree the container currently mirrors.
    pub fn with_tree<R>(&self, f: impl FnOnce(&Node) -> R) -> R {
        f(&self.shared.state.borrow().previous)
    }
}

impl<D: Presentation> Shared<D> {
    fn rerender(&self) -> Result<RenderStats> {
        let stats = {
            let mut state = self
                .state
                .try_borrow_mut()
                .map_err(|_| Error::RenderInProgress)?;
            state.commit(&self.request)?
        };

        // Taken out so an observer may register another observer.
        let mut observers = std::mem::take(&mut *self.observers.borrow_mut());
        for observer in &mut observers {
            observer(&stats);
        }
        let mut slot = self.observers.borrow_mut();
        observers.append(&mut slot);
        *slot = observers;

        Ok(stats)
    }

    fn deferred_render(&self) {
        match self.rerender() {
            Ok(stats) => log::debug!("deferred render: {} mutations", stats.mutations()),
            Err(Error::RenderInProgress) => {
                log::debug!("render in progress; rescheduling");
                self.request.schedule();
            }
            Err(err) => log::error!("deferred render failed: {err}"),
        }
    }
}

impl<D: Presentation> RootState<D> {
    fn commit(&mut self, request: &RenderRequest) -> Result<RenderStats> {
        let started = Instant::now();
        let mut next = Element::new(self.options.root_tag());
        if let Some(template) = &self.template {
            next.children.push(Some(template.clone()));
        }
        let mut next = Node::Element(next);

        let mut stats = RenderStats::default();
        Reconciler {
            doc: &self.doc,
            hooks: &mut self.hooks,
            request,
            options: &self.options,
            stats: &mut stats,
        }
        .reconcile(
            &self.container,
            Some(&self.previous),
            Some(&mut next),
            &InstancePath::root(),
        )?;

        self.previous = next;
        stats.duration = started.elapsed();
        self.last_stats = stats;
        Ok(stats)
    }
}

impl<D: Presentation> Clone for Root<D> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<D: Presentation> fmt::Debug for Root<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Root");
        match self.shared.state.try_borrow() {
            Ok(state) => s
                .field("hooks", &state.hooks)
                .field("last_stats", &state.last_stats),
            Err(_) => s.field("rendering", &true),
        };
        s.field("request", &self.shared.request).finish()
    }
}
