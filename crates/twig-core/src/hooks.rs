//! # Hooks
//!
//! Components keep state between renders through two hooks:
//!
//! - [`use_state`]: an order-based state slot plus a [`SetState`] setter.
//! - [`use_effect`]: a side effect that runs after the component body
//!   returns, and again only when its dependencies change.
//!
//! ```rust,ignore
//! fn Toggle(_: &()) -> Node {
//!     let (on, set_on) = use_state(false);
//!
//!     use_effect(move || {
//!         log::info!("toggle is now {on}");
//!         on_cleanup(|| log::info!("toggle changed or went away"))
//!     }, deps![on]);
//!
//!     element("button")
//!         .attr("aria-pressed", on)
//!         .on("onClick", move |_| set_on.set(!on))
//!         .text("Toggle")
//!         .into()
//! }
//! ```
//!
//! Hooks are identified by call order, so a component must call the same
//! hooks in the same order on every evaluation. Any deviation is reported as
//! [`Error::HookOrderViolation`] and the instance is rebuilt from scratch.
//!
//! Slots live in the [`HookRegistry`] owned by each root; the registry is
//! keyed by [`InstanceKey`] (component identity plus tree position), so two
//! sibling instances of one component do not share state.

use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::effects::{Dispose, IntoCleanup};
use crate::error::{Error, Result};
use crate::node::ComponentId;
use crate::schedule::RenderRequest;

thread_local! {
    static CURRENT_FRAME: RefCell<Option<Frame>> = const { RefCell::new(None) };
}

/// Primitive effect dependency, compared by value.
#[derive(Clone, Debug, PartialEq)]
pub enum Dep {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
}

pub type Deps = SmallVec<[Dep; 4]>;

/// Builds a [`Deps`] list: `deps![count, "label", enabled]`.
#[macro_export]
macro_rules! deps {
    () => {
        $crate::Deps::new()
    };
    ($($dep:expr),+ $(,)?) => {{
        let mut deps = $crate::Deps::new();
        $(deps.push($crate::Dep::from($dep));)+
        deps
    }};
}

impl From<()> for Dep {
    fn from(_: ()) -> Self {
        Dep::Null
    }
}

impl From<bool> for Dep {
    fn from(v: bool) -> Self {
        Dep::Bool(v)
    }
}

impl From<i32> for Dep {
    fn from(v: i32) -> Self {
        Dep::Int(i64::from(v))
    }
}

impl From<u32> for Dep {
    fn from(v: u32) -> Self {
        Dep::Int(i64::from(v))
    }
}

impl From<i64> for Dep {
    fn from(v: i64) -> Self {
        Dep::Int(v)
    }
}

impl From<usize> for Dep {
    fn from(v: usize) -> Self {
        i64::try_from(v).map_or(Dep::Float(v as f64), Dep::Int)
    }
}

impl From<f32> for Dep {
    fn from(v: f32) -> Self {
        Dep::Float(f64::from(v))
    }
}

impl From<f64> for Dep {
    fn from(v: f64) -> Self {
        Dep::Float(v)
    }
}

impl From<&str> for Dep {
    fn from(v: &str) -> Self {
        Dep::Str(Rc::from(v))
    }
}

impl From<String> for Dep {
    fn from(v: String) -> Self {
        Dep::Str(Rc::from(v))
    }
}

impl<T: Into<Dep>> From<Option<T>> for Dep {
    fn from(v: Option<T>) -> Self {
        v.map_or(Dep::Null, Into::into)
    }
}

const RESULT_SEGMENT: u32 = u32::MAX;

/// Position of a node in the virtual tree: child indices from the root, with
/// a marker segment for "output of a component".
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct InstancePath(SmallVec<[u32; 8]>);

impl InstancePath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn child(&self, index: usize) -> Self {
        let mut path = self.clone();
        path.0.push(u32::try_from(index).unwrap_or(RESULT_SEGMENT - 1));
        path
    }

    pub fn result(&self) -> Self {
        let mut path = self.clone();
        path.0.push(RESULT_SEGMENT);
        path
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }
}

impl fmt::Debug for InstancePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("/")?;
        for (i, seg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            if *seg == RESULT_SEGMENT {
                f.write_str("@")?;
            } else {
                write!(f, "{seg}")?;
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstanceKey {
    pub component: ComponentId,
    pub path: InstancePath,
}

impl InstanceKey {
    pub fn new(component: ComponentId, path: InstancePath) -> Self {
        Self { component, path }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum HookKind {
    State(TypeId),
    Effect,
}

pub(crate) struct PendingEffect {
    pub(crate) callback: Box<dyn FnOnce() -> Option<Dispose>>,
    pub(crate) deps: Deps,
}

pub(crate) struct EffectRecord {
    pub(crate) deps: Deps,
    pub(crate) cleanup: Option<Dispose>,
}

impl EffectRecord {
    pub(crate) fn run_cleanup(self) {
        if let Some(cleanup) = self.cleanup {
            cleanup.run();
        }
    }
}

/// Per-root storage for state slots and effects.
#[derive(Default)]
pub struct HookRegistry {
    pub(crate) states: HashMap<InstanceKey, Vec<Box<dyn Any>>>,
    pub(crate) effects: HashMap<InstanceKey, Vec<EffectRecord>>,
    pub(crate) signatures: HashMap<InstanceKey, Vec<HookKind>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_mounted(&self, key: &InstanceKey) -> bool {
        self.signatures.contains_key(key)
            || self.states.contains_key(key)
            || self.effects.contains_key(key)
    }

    /// Number of live component instances.
    pub fn instance_count(&self) -> usize {
        self.signatures.len()
    }

    pub fn state_count(&self, key: &InstanceKey) -> usize {
        self.states.get(key).map_or(0, Vec::len)
    }

    pub fn effect_count(&self, key: &InstanceKey) -> usize {
        self.effects.get(key).map_or(0, Vec::len)
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("instances", &self.signatures.len())
            .field("states", &self.states.len())
            .field("effects", &self.effects.len())
            .finish()
    }
}

/// Evaluation state of the component currently running.
pub(crate) struct Frame {
    pub(crate) component: &'static str,
    pub(crate) slots: Vec<Box<dyn Any>>,
    pub(crate) state_cursor: usize,
    pub(crate) expected: Option<Vec<HookKind>>,
    pub(crate) signature: Vec<HookKind>,
    pub(crate) effects: Vec<PendingEffect>,
    pub(crate) violation: Option<usize>,
    pub(crate) request: RenderRequest,
}

impl Frame {
    pub(crate) fn new(
        component: &'static str,
        slots: Vec<Box<dyn Any>>,
        expected: Option<Vec<HookKind>>,
        request: RenderRequest,
    ) -> Self {
        Self {
            component,
            slots,
            state_cursor: 0,
            expected,
            signature: Vec::new(),
            effects: Vec::new(),
            violation: None,
            request,
        }
    }

    /// Records a hook call; false once the call order no longer matches the
    /// previous evaluation.
    fn record(&mut self, kind: HookKind) -> bool {
        let index = self.signature.len();
        self.signature.push(kind);
        if self.violation.is_some() {
            return false;
        }
        if let Some(expected) = &self.expected
            && expected.get(index) != Some(&kind)
        {
            log::warn!(
                "{}: hook #{} is {:?}, previous render had {:?}",
                self.component,
                index,
                kind,
                expected.get(index)
            );
            self.violation = Some(index);
            return false;
        }
        true
    }

    /// Flags evaluations that called fewer hooks than the previous one.
    pub(crate) fn finish(&mut self) {
        if self.violation.is_none()
            && let Some(expected) = &self.expected
            && expected.len() != self.signature.len()
        {
            log::warn!(
                "{}: called {} hooks, previous render called {}",
                self.component,
                self.signature.len(),
                expected.len()
            );
            self.violation = Some(self.signature.len().min(expected.len()));
        }
    }
}

/// Installs a frame as the current one; restores the previous frame on exit
/// or unwind.
pub(crate) struct FrameGuard {
    previous: Option<Frame>,
    active: bool,
}

impl FrameGuard {
    pub(crate) fn enter(frame: Frame) -> Self {
        let previous = CURRENT_FRAME.with(|current| current.replace(Some(frame)));
        Self {
            previous,
            active: true,
        }
    }

    pub(crate) fn exit(mut self) -> Option<Frame> {
        self.active = false;
        let previous = self.previous.take();
        CURRENT_FRAME.with(|current| current.replace(previous))
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        if self.active {
            let previous = self.previous.take();
            CURRENT_FRAME.with(|current| {
                current.replace(previous);
            });
        }
    }
}

/// Setter returned by [`use_state`].
pub struct SetState<T> {
    slot: Rc<RefCell<T>>,
    request: RenderRequest,
}

impl<T> Clone for SetState<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
            request: self.request.clone(),
        }
    }
}

impl<T: PartialEq> SetState<T> {
    /// Stores `value` and schedules a re-render, unless it equals the current value.
    pub fn set(&self, value: T) {
        {
            let mut current = self.slot.borrow_mut();
            if *current == value {
                return;
            }
            *current = value;
        }
        self.request.schedule();
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.slot.borrow());
        self.set(next);
    }
}

impl<T: Clone> SetState<T> {
    /// Latest stored value, including writes not yet rendered.
    pub fn get(&self) -> T {
        self.slot.borrow().clone()
    }
}

impl<T: fmt::Debug> fmt::Debug for SetState<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetState")
            .field("value", &self.slot.borrow())
            .finish()
    }
}

fn detached_state<T: Clone>(initial: T) -> (T, SetState<T>) {
    let setter = SetState {
        slot: Rc::new(RefCell::new(initial.clone())),
        request: RenderRequest::detached(),
    };
    (initial, setter)
}

/// Declares a state slot; fails outside a component evaluation.
pub fn try_use_state<T>(initial: T) -> Result<(T, SetState<T>)>
where
    T: Clone + PartialEq + 'static,
{
    CURRENT_FRAME.with(|current| {
        let mut current = current.borrow_mut();
        let frame = current.as_mut().ok_or(Error::InvalidHookContext)?;

        let index = frame.state_cursor;
        frame.state_cursor += 1;
        if !frame.record(HookKind::State(TypeId::of::<T>())) {
            return Ok(detached_state(initial));
        }

        let existing = frame
            .slots
            .get(index)
            .and_then(|slot| slot.downcast_ref::<Rc<RefCell<T>>>())
            .cloned();
        let slot = match existing {
            Some(slot) => slot,
            None => {
                let slot = Rc::new(RefCell::new(initial));
                if index < frame.slots.len() {
                    frame.slots[index] = Box::new(slot.clone());
                } else {
                    frame.slots.push(Box::new(slot.clone()));
                }
                slot
            }
        };

        let value = slot.borrow().clone();
        Ok((
            value,
            SetState {
                slot,
                request: frame.request.clone(),
            },
        ))
    })
}

/// Declares a state slot.
///
/// # Panics
///
/// When called outside a component evaluation; see [`try_use_state`].
pub fn use_state<T>(initial: T) -> (T, SetState<T>)
where
    T: Clone + PartialEq + 'static,
{
    try_use_state(initial).unwrap_or_else(|err| panic!("use_state: {err}"))
}

/// Registers an effect for this evaluation; fails outside a component
/// evaluation.
pub fn try_use_effect<F, R>(callback: F, deps: Deps) -> Result<()>
where
    F: FnOnce() -> R + 'static,
    R: IntoCleanup,
{
    CURRENT_FRAME.with(|current| {
        let mut current = current.borrow_mut();
        let frame = current.as_mut().ok_or(Error::InvalidHookContext)?;
        if frame.record(HookKind::Effect) {
            frame.effects.push(PendingEffect {
                callback: Box::new(move || callback().into_cleanup()),
                deps,
            });
        }
        Ok(())
    })
}

/// Registers an effect. It runs right after the component body returns, and
/// on later evaluations only when `deps` differ from the previous ones.
///
/// # Panics
///
/// When called outside a component evaluation; see [`try_use_effect`].
pub fn use_effect<F, R>(callback: F, deps: Deps)
where
    F: FnOnce() -> R + 'static,
    R: IntoCleanup,
{
    try_use_effect(callback, deps).unwrap_or_else(|err| panic!("use_effect: {err}"))
}
