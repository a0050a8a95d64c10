//! # Virtual tree, hooks and reconciliation
//!
//! Twig keeps a lightweight description of the UI (the virtual tree), compares
//! each new version with the previous one, and applies the smallest patch it
//! can find to a live presentation tree. The pieces:
//!
//! - [`Node`]: text leaves, native elements and function components.
//! - [`use_state`] / [`use_effect`]: per-instance state and post-render side
//!   effects, callable while a component is being evaluated.
//! - [`Presentation`]: the boundary to the live tree (a DOM, or the in-memory
//!   document in `twig-dom`).
//! - [`Root`]: binds one virtual tree to one container and re-renders it when
//!   state changes.
//!
//! ## Components
//!
//! A component is a plain function from props to a [`Node`]:
//!
//! ```rust
//! use twig_core::*;
//!
//! struct Greeting {
//!     name: &'static str,
//! }
//!
//! fn greeting(props: &Greeting) -> Node {
//!     element("p")
//!         .attr("className", "greeting")
//!         .text(format!("Hello, {}!", props.name))
//!         .into()
//! }
//!
//! let tree = element("main").child(component(greeting, Greeting { name: "twig" }));
//! assert_eq!(tree.children.len(), 1);
//! ```
//!
//! Components are identified by their function type and their position in the
//! tree, so siblings rendered from the same function keep separate state.
//!
//! ## Rendering
//!
//! State setters never render synchronously. They schedule one deferred render
//! on the root's [`IdleScheduler`]; further updates made before it runs are
//! folded into the same render.
//!
//! ```rust,ignore
//! let queue = IdleQueue::new();
//! let root = Root::new(doc, container, Rc::new(queue.clone()));
//! root.render(component(counter, ()))?;
//!
//! // ...a click handler calls `set_count.set(1)`...
//! queue.run_until_idle();
//! ```

pub mod effects;
pub mod error;
pub mod hooks;
mod lifecycle;
pub mod node;
pub mod options;
pub mod prelude;
pub mod presentation;
mod props;
mod reconcile;
pub mod root;
pub mod schedule;

pub use effects::*;
pub use error::{Error, Result};
pub use hooks::*;
pub use node::*;
pub use options::*;
pub use presentation::*;
pub use root::*;
pub use schedule::*;
