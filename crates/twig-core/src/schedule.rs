//! Deferred re-rendering.
//!
//! The only asynchronous boundary in twig: a state setter never renders
//! synchronously, it asks the root's [`RenderRequest`] to post a task to an
//! [`IdleScheduler`]. Requests made before that task runs are absorbed into it.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

pub type Task = Box<dyn FnOnce()>;

/// Runs a callback once, at a later idle point; never synchronously.
pub trait IdleScheduler {
    fn request_idle(&self, task: Task);
}

impl<S: IdleScheduler + ?Sized> IdleScheduler for Rc<S> {
    fn request_idle(&self, task: Task) {
        (**self).request_idle(task)
    }
}

/// FIFO of idle tasks, drained explicitly by the host loop.
#[derive(Clone, Default)]
pub struct IdleQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl IdleQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Runs the tasks that were queued when the turn started. Tasks queued by
    /// those tasks wait for the next turn.
    pub fn run_pending(&self) -> usize {
        let turn = self.tasks.borrow().len();
        for _ in 0..turn {
            // Popped one at a time so a task may push without a borrow conflict.
            let task = self.tasks.borrow_mut().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
        turn
    }

    /// Runs turns until no task is left.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while !self.is_empty() {
            ran += self.run_pending();
        }
        ran
    }
}

impl IdleScheduler for IdleQueue {
    fn request_idle(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for IdleQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdleQueue").field("len", &self.len()).finish()
    }
}

/// Handle through which state setters ask their root to render again.
#[derive(Clone)]
pub struct RenderRequest(Rc<RequestInner>);

struct RequestInner {
    pending: Cell<bool>,
    scheduler: Option<Rc<dyn IdleScheduler>>,
    render: RefCell<Option<Rc<dyn Fn()>>>,
}

impl RenderRequest {
    pub(crate) fn new(scheduler: Rc<dyn IdleScheduler>) -> Self {
        Self(Rc::new(RequestInner {
            pending: Cell::new(false),
            scheduler: Some(scheduler),
            render: RefCell::new(None),
        }))
    }

    /// A request that never renders; for driving components outside a root.
    pub fn detached() -> Self {
        Self(Rc::new(RequestInner {
            pending: Cell::new(false),
            scheduler: None,
            render: RefCell::new(None),
        }))
    }

    pub(crate) fn bind(&self, render: impl Fn() + 'static) {
        *self.0.render.borrow_mut() = Some(Rc::new(render));
    }

    pub fn is_pending(&self) -> bool {
        self.0.pending.get()
    }

    /// Posts one deferred render, unless one is already waiting.
    pub fn schedule(&self) {
        let Some(scheduler) = &self.0.scheduler else {
            log::trace!("render requested on a detached handle; ignoring");
            return;
        };
        if self.0.pending.replace(true) {
            log::trace!("render already pending; coalescing");
            return;
        }

        let inner: Weak<RequestInner> = Rc::downgrade(&self.0);
        scheduler.request_idle(Box::new(move || {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            inner.pending.set(false);
            let render = inner.render.borrow().clone();
            if let Some(render) = render {
                render();
            }
        }));
    }
}

impl fmt::Debug for RenderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderRequest")
            .field("pending", &self.is_pending())
            .field("detached", &self.0.scheduler.is_none())
            .finish()
    }
}
